//! Exact collision checks between moving convex shapes.
//!
//! Two shapes `A` at `a(t)` and `B` at `b(t)` overlap iff the relative
//! position `a(t) − b(t)` lies in the interior of `B ⊕ (−A)`.  Between the
//! merged breakpoints of both trajectories the relative position moves on a
//! straight line, so each piece is a single segment-versus-convex-polygon
//! test.  Touching (overlap depth at most `tol`) is not a collision.

use fleet_geom::{EPSILON, Point, Polygon};

use crate::Trajectory;

/// `true` if `shape_a` following `traj_a` and `shape_b` following `traj_b`
/// overlap by more than `tol` at some common instant.
pub fn trajectories_collide(
    shape_a: &Polygon,
    traj_a: &Trajectory,
    shape_b: &Polygon,
    traj_b: &Trajectory,
    tol: f64,
) -> bool {
    let lo = traj_a.start_time().max(traj_b.start_time());
    let hi = traj_a.end_time().min(traj_b.end_time());
    if lo > hi {
        return false;
    }
    let c = shape_b.minkowski_sum(&shape_a.reflect());
    let relative = |t: f64| traj_a.position_clamped(t) - traj_b.position_clamped(t);

    if hi - lo <= EPSILON {
        return c.contains_point_strict(relative(lo), tol);
    }

    let mut breaks: Vec<f64> = traj_a
        .times()
        .iter()
        .chain(traj_b.times())
        .copied()
        .filter(|&t| t > lo && t < hi)
        .collect();
    breaks.push(lo);
    breaks.push(hi);
    breaks.sort_by(f64::total_cmp);
    breaks.dedup_by(|a, b| (*a - *b).abs() <= EPSILON);

    breaks
        .windows(2)
        .any(|w| enters_interior(&c, relative(w[0]), relative(w[1]), tol))
}

/// The clipped chord of a convex polygon has its depth maximum no deeper than
/// twice the depth at its midpoint, so the midpoint decides.
fn enters_interior(c: &Polygon, a: Point, b: Point, tol: f64) -> bool {
    match c.clip_segment(a, b) {
        Some((t0, t1)) => c.contains_point_strict(a.lerp(b, 0.5 * (t0 + t1)), tol),
        None => false,
    }
}

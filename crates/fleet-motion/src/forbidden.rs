//! Forbidden regions on the arc-time plane.
//!
//! # Construction
//!
//! Let the agent (shape `A`) sit at arc `s` of the route, at world position
//! `w(s)`, and let an obstacle (shape `B`) be at `q(t)`.  They overlap iff
//! `w(s) − q(t)` lies in the interior of `C = B ⊕ (−A)`.  On the cell
//! spanned by one route segment `[s_k, s_k+1]` and one obstacle segment
//! `[t_j, t_j+1]` both `w` and `q` are linear, so every supporting
//! half-plane `n · x ≤ c` of `C` becomes a half-plane in `(s, t)`:
//!
//! ```text
//! (n·u) s − (n·v) t ≤ c − n·(w_k − q_j) + (n·u) s_k − (n·v) t_j
//! ```
//!
//! with `u` the route direction and `v` the obstacle velocity.  Clipping the
//! cell rectangle by all of them yields one convex piece.  Pieces of one
//! obstacle meet along cell boundaries (route bends, obstacle turns); those
//! boundary edges are flagged *solid* so that a motion running along them is
//! still treated as inside the union.
//!
//! A stationary route (length zero) has no arc extent; its forbidden set is
//! a list of merged time intervals, emitted as two-vertex pieces at `s = 0`.

use fleet_core::ObstacleId;
use fleet_geom::{Envelope, Point, Polygon, EPSILON};
use fleet_world::DynamicObstacle;

use crate::SpatialPath;

/// Area below which a clipped cell is considered empty.
const MIN_PIECE_AREA: f64 = 1e-12;

// ── RegionPiece ───────────────────────────────────────────────────────────────

/// One convex forbidden piece in arc-time coordinates (`x = s`, `y = t`).
///
/// Vertices are counter-clockwise.  `solid[i]` flags the edge from vertex
/// `i` to vertex `i + 1` as a cut through the obstacle's forbidden set
/// rather than its boundary.  Two-vertex pieces are time intervals of a
/// stationary route.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionPiece {
    vertices: Vec<Point>,
    solid: Vec<bool>,
    /// `(outward unit normal, offset)` per edge; empty for two-vertex pieces.
    planes: Vec<(Point, f64)>,
}

impl RegionPiece {
    fn new(vertices: Vec<Point>, solid: Vec<bool>) -> RegionPiece {
        let n = vertices.len();
        let planes = if n >= 3 {
            (0..n)
                .filter_map(|i| {
                    let (a, b) = (vertices[i], vertices[(i + 1) % n]);
                    let normal = Point::new(b.y - a.y, a.x - b.x).normalized()?;
                    Some((normal, normal.dot(a)))
                })
                .collect()
        } else {
            Vec::new()
        };
        RegionPiece { vertices, solid, planes }
    }

    /// The time interval `[t0, t1]` at arc `s`, as a degenerate piece.
    fn interval(s: f64, t0: f64, t1: f64) -> RegionPiece {
        RegionPiece::new(vec![Point::new(s, t0), Point::new(s, t1)], vec![true, true])
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn solid_edges(&self) -> &[bool] {
        &self.solid
    }

    pub fn is_interval(&self) -> bool {
        self.vertices.len() == 2
    }

    pub fn envelope(&self) -> Envelope {
        Envelope::from_points(self.vertices.iter().copied())
    }

    /// `(min t, max t)` covered by the piece.
    pub fn time_extent(&self) -> (f64, f64) {
        let e = self.envelope();
        (e.min.y, e.max.y)
    }

    /// `(min s, max s)` covered by the piece.
    pub fn arc_extent(&self) -> (f64, f64) {
        let e = self.envelope();
        (e.min.x, e.max.x)
    }

    /// The piece as a kernel polygon (`None` for intervals).
    pub fn to_polygon(&self) -> Option<Polygon> {
        if self.is_interval() {
            return None;
        }
        Polygon::new(self.vertices.iter().copied()).ok()
    }

    fn depth(&self, p: Point) -> f64 {
        self.planes
            .iter()
            .map(|&(n, c)| c - n.dot(p))
            .fold(f64::INFINITY, f64::min)
    }

    /// `true` if occupying `p` collides: strictly inside, or in the relative
    /// interior of a solid edge.
    pub fn forbids(&self, p: Point) -> bool {
        if self.is_interval() {
            let (a, b) = (self.vertices[0], self.vertices[1]);
            return (p.x - a.x).abs() <= EPSILON
                && p.y > a.y.min(b.y) + EPSILON
                && p.y < a.y.max(b.y) - EPSILON;
        }
        let d = self.depth(p);
        if d > EPSILON {
            return true;
        }
        if d < -EPSILON {
            return false;
        }
        let n = self.vertices.len();
        (0..n).any(|i| {
            self.solid[i] && on_edge_interior(p, self.vertices[i], self.vertices[(i + 1) % n])
        })
    }

    /// `true` if the arc-time segment `a`–`b` collides with this piece.
    /// Touching a boundary that is not solid, or crossing a single point,
    /// does not count.
    pub fn blocks(&self, a: Point, b: Point) -> bool {
        if self.is_interval() {
            let (p, q) = (self.vertices[0], self.vertices[1]);
            let on_line = (a.x - p.x).abs() <= EPSILON && (b.x - p.x).abs() <= EPSILON;
            let overlap = a.y.max(b.y).min(p.y.max(q.y)) - a.y.min(b.y).max(p.y.min(q.y));
            return on_line && overlap > EPSILON;
        }
        let Some((lo, hi)) = self.clip(a, b) else {
            return false;
        };
        if (hi - lo) * a.distance(b) <= EPSILON {
            // A single shared point, or a stationary query point.
            return a.approx_eq(b, EPSILON) && self.forbids(a);
        }
        self.forbids(a.lerp(b, 0.5 * (lo + hi)))
    }

    /// Cyrus–Beck parameter interval of `a + λ(b − a)` inside the closed
    /// piece.
    fn clip(&self, a: Point, b: Point) -> Option<(f64, f64)> {
        let d = b - a;
        let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
        for &(n, c) in &self.planes {
            let denom = n.dot(d);
            let slack = c - n.dot(a);
            if denom.abs() <= EPSILON * EPSILON {
                if slack < -EPSILON {
                    return None;
                }
                continue;
            }
            let t = slack / denom;
            if denom > 0.0 {
                hi = hi.min(t);
            } else {
                lo = lo.max(t);
            }
            if lo > hi + EPSILON {
                return None;
            }
        }
        Some((lo, hi.max(lo)))
    }
}

fn on_edge_interior(p: Point, a: Point, b: Point) -> bool {
    let ab = b - a;
    let len2 = ab.dot(ab);
    if len2 <= EPSILON * EPSILON {
        return false;
    }
    let lambda = (p - a).dot(ab) / len2;
    let off = (p - a).cross(ab).abs() / len2.sqrt();
    off <= EPSILON && lambda > EPSILON && lambda < 1.0 - EPSILON
}

// ── ForbiddenRegion ───────────────────────────────────────────────────────────

/// All forbidden pieces of one obstacle along one route.
#[derive(Clone, Debug, PartialEq)]
pub struct ForbiddenRegion {
    pub obstacle: ObstacleId,
    pub pieces: Vec<RegionPiece>,
}

impl ForbiddenRegion {
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Earliest and latest time the obstacle forbids anything on the route.
    pub fn time_extent(&self) -> Option<(f64, f64)> {
        self.pieces
            .iter()
            .map(RegionPiece::time_extent)
            .reduce(|(a0, a1), (b0, b1)| (a0.min(b0), a1.max(b1)))
    }

    pub fn forbids(&self, p: Point) -> bool {
        self.pieces.iter().any(|piece| piece.forbids(p))
    }
}

// ── ForbiddenRegionBuilder ────────────────────────────────────────────────────

/// Builds the forbidden region of each obstacle along one route.
///
/// Without an agent shape the agent is a point and `C = B`.
pub struct ForbiddenRegionBuilder<'a> {
    path: &'a SpatialPath,
    agent: Option<&'a Polygon>,
}

impl<'a> ForbiddenRegionBuilder<'a> {
    pub fn new(path: &'a SpatialPath) -> Self {
        Self { path, agent: None }
    }

    /// Account for the agent's own footprint (relative to its reference
    /// point).
    pub fn with_agent_shape(mut self, shape: &'a Polygon) -> Self {
        self.agent = Some(shape);
        self
    }

    pub fn build(&self, obstacle: &DynamicObstacle) -> ForbiddenRegion {
        if !self.route_envelope().intersects(&reach(obstacle, self.agent)) {
            return ForbiddenRegion { obstacle: obstacle.id, pieces: Vec::new() };
        }
        let c = configuration_obstacle(&obstacle.shape, self.agent);
        let pieces = if self.path.is_stationary() {
            point_intervals(self.path.start(), &c, obstacle)
                .into_iter()
                .map(|(t0, t1)| RegionPiece::interval(0.0, t0, t1))
                .collect()
        } else {
            self.cell_pieces(&c, obstacle)
        };
        ForbiddenRegion { obstacle: obstacle.id, pieces }
    }

    /// One region per obstacle, in input order.  Regions are independent, so
    /// with the `parallel` feature they are built on the Rayon pool.
    pub fn build_all(&self, obstacles: &[DynamicObstacle]) -> Vec<ForbiddenRegion> {
        #[cfg(not(feature = "parallel"))]
        {
            obstacles.iter().map(|o| self.build(o)).collect()
        }

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            obstacles.par_iter().map(|o| self.build(o)).collect()
        }
    }

    fn route_envelope(&self) -> Envelope {
        Envelope::from_points(self.path.points().iter().copied())
    }

    fn cell_pieces(&self, c: &Polygon, obstacle: &DynamicObstacle) -> Vec<RegionPiece> {
        let c_env = c.envelope();
        let planes = c.halfplanes();
        let mut pieces = Vec::new();

        for seg in self.path.segments() {
            let u = seg.direction();
            let route_env = Envelope::of_segment(seg.from, seg.to);

            for ob in obstacle.trajectory.segments() {
                // w ∈ q + C for some q on the obstacle segment.
                let swept = Envelope::of_segment(ob.from, ob.to);
                let reach = Envelope { min: swept.min + c_env.min, max: swept.max + c_env.max };
                if !route_env.intersects(&reach) {
                    continue;
                }

                let v = ob.velocity();
                let d = seg.from - ob.from;
                let mut cell = vec![
                    (Point::new(seg.s0, ob.t0), true),
                    (Point::new(seg.s1, ob.t0), true),
                    (Point::new(seg.s1, ob.t1), true),
                    (Point::new(seg.s0, ob.t1), true),
                ];
                for h in &planes {
                    let a = Point::new(h.normal.dot(u), -h.normal.dot(v));
                    let rhs = h.offset - h.normal.dot(d) + a.x * seg.s0 + a.y * ob.t0;
                    cell = clip_cell(cell, a, rhs);
                    if cell.len() < 3 {
                        break;
                    }
                }
                if cell.len() < 3 {
                    continue;
                }
                let (vertices, solid): (Vec<Point>, Vec<bool>) = cell.into_iter().unzip();
                if signed_area(&vertices) > MIN_PIECE_AREA {
                    pieces.push(RegionPiece::new(vertices, solid));
                }
            }
        }
        pieces
    }
}

fn configuration_obstacle(obstacle: &Polygon, agent: Option<&Polygon>) -> Polygon {
    match agent {
        Some(a) => obstacle.minkowski_sum(&a.reflect()),
        None => obstacle.clone(),
    }
}

/// Sutherland–Hodgman step against `a · p ≤ rhs`, carrying per-edge solid
/// flags.  New edges along the clip line are not solid.
fn clip_cell(poly: Vec<(Point, bool)>, a: Point, rhs: f64) -> Vec<(Point, bool)> {
    if a.norm() <= EPSILON {
        return if rhs > EPSILON { poly } else { Vec::new() };
    }
    let f = |p: Point| rhs - a.dot(p);
    let n = poly.len();
    let mut out: Vec<(Point, bool)> = Vec::with_capacity(n + 1);
    for i in 0..n {
        let (p, solid) = poly[i];
        let (q, _) = poly[(i + 1) % n];
        let (fp, fq) = (f(p), f(q));
        match (fp >= 0.0, fq >= 0.0) {
            (true, true) => out.push((p, solid)),
            (true, false) => {
                out.push((p, solid));
                out.push((p.lerp(q, fp / (fp - fq)), false));
            }
            (false, true) => out.push((p.lerp(q, fp / (fp - fq)), solid)),
            (false, false) => {}
        }
    }
    dedup_cyclic(out)
}

/// Drop zero-length edges; the surviving vertex takes the flag of the edge
/// that follows the removed one.
fn dedup_cyclic(mut poly: Vec<(Point, bool)>) -> Vec<(Point, bool)> {
    let mut i = 0;
    while poly.len() > 1 && i < poly.len() {
        let j = (i + 1) % poly.len();
        if poly[i].0.approx_eq(poly[j].0, EPSILON) {
            poly[i].1 = poly[j].1;
            poly.remove(j);
            if j < i {
                i -= 1;
            }
        } else {
            i += 1;
        }
    }
    poly
}

fn signed_area(vertices: &[Point]) -> f64 {
    let n = vertices.len();
    0.5 * (0..n).map(|i| vertices[i].cross(vertices[(i + 1) % n])).sum::<f64>()
}

// ── Stationary queries ────────────────────────────────────────────────────────

/// Merged time intervals during which an agent parked at `point` overlaps
/// the obstacle whose configuration shape is `c`.
fn point_intervals(point: Point, c: &Polygon, obstacle: &DynamicObstacle) -> Vec<(f64, f64)> {
    let mut out: Vec<(f64, f64)> = Vec::new();
    for ob in obstacle.trajectory.segments() {
        let r0 = point - ob.from;
        let r1 = point - ob.to;
        let Some((l0, l1)) = c.clip_segment(r0, r1) else {
            continue;
        };
        if !c.contains_point_strict(r0.lerp(r1, 0.5 * (l0 + l1)), EPSILON) {
            continue;
        }
        let dt = ob.duration();
        let (t0, t1) = (ob.t0 + l0 * dt, ob.t0 + l1 * dt);
        if t1 - t0 <= EPSILON {
            continue;
        }
        match out.last_mut() {
            Some(last) if t0 <= last.1 + EPSILON => last.1 = last.1.max(t1),
            _ => out.push((t0, t1)),
        }
    }
    out
}

/// Everywhere an agent's reference point could be while overlapping
/// `obstacle`.
fn reach(obstacle: &DynamicObstacle, agent: Option<&Polygon>) -> Envelope {
    obstacle.swept_envelope().expanded(agent.map_or(0.0, Polygon::radius) + EPSILON)
}

/// Time intervals during which an agent of shape `agent` (a point if
/// `None`) parked at `point` would overlap any of `obstacles`, sorted and
/// merged.
pub fn forbidden_intervals_at(
    point: Point,
    agent: Option<&Polygon>,
    obstacles: &[DynamicObstacle],
) -> Vec<(f64, f64)> {
    let at = Envelope { min: point, max: point };
    let mut all: Vec<(f64, f64)> = obstacles
        .iter()
        .filter(|o| at.intersects(&reach(o, agent)))
        .flat_map(|o| point_intervals(point, &configuration_obstacle(&o.shape, agent), o))
        .collect();
    all.sort_by(|a, b| a.0.total_cmp(&b.0));
    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(all.len());
    for (t0, t1) in all {
        match merged.last_mut() {
            Some(last) if t0 <= last.1 + EPSILON => last.1 = last.1.max(t1),
            _ => merged.push((t0, t1)),
        }
    }
    merged
}

//! Piecewise-linear motion in space and time.
//!
//! A [`Trajectory`] is an ordered list of waypoints paired with strictly
//! increasing timestamps.  Between consecutive waypoints the position is
//! linear in time.  A single waypoint is a valid trajectory describing an
//! instant.

use fleet_geom::{EPSILON, Point};

use crate::{WorldError, WorldResult};

/// One linear piece of a trajectory: `from` at `t0` to `to` at `t1`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TrajectorySegment {
    pub from: Point,
    pub to: Point,
    pub t0: f64,
    pub t1: f64,
}

impl TrajectorySegment {
    pub fn duration(&self) -> f64 {
        self.t1 - self.t0
    }

    /// Constant velocity over the piece.
    pub fn velocity(&self) -> Point {
        (self.to - self.from) / self.duration()
    }

    /// Position at `t`, extrapolating linearly outside `[t0, t1]`.
    pub fn position_at(&self, t: f64) -> Point {
        self.from + self.velocity() * (t - self.t0)
    }

    pub fn speed(&self) -> f64 {
        self.velocity().norm()
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Trajectory {
    points: Vec<Point>,
    times: Vec<f64>,
}

impl Trajectory {
    /// # Errors
    ///
    /// [`WorldError::LengthMismatch`], [`WorldError::Empty`],
    /// [`WorldError::NonFinite`] and [`WorldError::NonMonotonicTime`].
    pub fn new(points: Vec<Point>, times: Vec<f64>) -> WorldResult<Trajectory> {
        if points.len() != times.len() {
            return Err(WorldError::LengthMismatch { points: points.len(), times: times.len() });
        }
        if points.is_empty() {
            return Err(WorldError::Empty);
        }
        for (index, (p, t)) in points.iter().zip(&times).enumerate() {
            if !p.is_finite() || !t.is_finite() {
                return Err(WorldError::NonFinite { index });
            }
        }
        for (i, w) in times.windows(2).enumerate() {
            if w[1] <= w[0] {
                return Err(WorldError::NonMonotonicTime { index: i + 1, prev: w[0], next: w[1] });
            }
        }
        Ok(Trajectory { points, times })
    }

    /// A single waypoint at `t`.
    pub fn at(point: Point, t: f64) -> Trajectory {
        Trajectory { points: vec![point], times: vec![t] }
    }

    /// Stay at `point` from `t0` until `t1`.  `t1 <= t0` yields the instant
    /// `t0`.
    pub fn hold(point: Point, t0: f64, t1: f64) -> Trajectory {
        if t1 > t0 {
            Trajectory { points: vec![point, point], times: vec![t0, t1] }
        } else {
            Trajectory::at(point, t0)
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`; a trajectory has at least one waypoint.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start_time(&self) -> f64 {
        self.times[0]
    }

    pub fn end_time(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    pub fn start_point(&self) -> Point {
        self.points[0]
    }

    pub fn end_point(&self) -> Point {
        self.points[self.points.len() - 1]
    }

    pub fn duration(&self) -> f64 {
        self.end_time() - self.start_time()
    }

    /// Position at `t`, or `None` outside the trajectory's time span.
    pub fn position_at(&self, t: f64) -> Option<Point> {
        if !(self.start_time() <= t && t <= self.end_time()) {
            return None;
        }
        Some(self.interpolate(t))
    }

    /// Position at `t`, holding the first/last waypoint outside the span.
    pub fn position_clamped(&self, t: f64) -> Point {
        if t <= self.start_time() {
            self.start_point()
        } else if t >= self.end_time() {
            self.end_point()
        } else {
            self.interpolate(t)
        }
    }

    fn interpolate(&self, t: f64) -> Point {
        let i = self.times.partition_point(|&x| x <= t);
        if i == 0 {
            return self.start_point();
        }
        if i >= self.times.len() {
            return self.end_point();
        }
        let (ta, tb) = (self.times[i - 1], self.times[i]);
        self.points[i - 1].lerp(self.points[i], (t - ta) / (tb - ta))
    }

    pub fn segments(&self) -> impl Iterator<Item = TrajectorySegment> + '_ {
        (1..self.points.len()).map(move |i| TrajectorySegment {
            from: self.points[i - 1],
            to: self.points[i],
            t0: self.times[i - 1],
            t1: self.times[i],
        })
    }

    /// Total distance travelled.
    pub fn spatial_length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    /// Highest speed over any piece; zero for an instant.
    pub fn max_speed(&self) -> f64 {
        self.segments().map(|s| s.speed()).fold(0.0, f64::max)
    }

    /// Append a waypoint after the current end.
    ///
    /// # Errors
    ///
    /// [`WorldError::NonMonotonicTime`] unless `t` is later than the end.
    pub fn append(&mut self, point: Point, t: f64) -> WorldResult<()> {
        if !point.is_finite() || !t.is_finite() {
            return Err(WorldError::NonFinite { index: self.len() });
        }
        let prev = self.end_time();
        if t <= prev {
            return Err(WorldError::NonMonotonicTime { index: self.len(), prev, next: t });
        }
        self.points.push(point);
        self.times.push(t);
        Ok(())
    }

    /// `self` followed by `other`.
    ///
    /// When `other` starts exactly where and when `self` ends the shared
    /// waypoint is stored once; a later start is bridged by linear motion.
    ///
    /// # Errors
    ///
    /// [`WorldError::Discontinuous`] if both meet at the same time in
    /// different places, [`WorldError::NonMonotonicTime`] if `other` starts
    /// before `self` ends.
    pub fn concat(&self, other: &Trajectory) -> WorldResult<Trajectory> {
        let mut out = self.clone();
        let mut rest = other.points.iter().zip(&other.times).peekable();
        if let Some(&(&p, &t)) = rest.peek() {
            if (t - self.end_time()).abs() <= EPSILON {
                if !p.approx_eq(self.end_point(), 1e-6) {
                    return Err(WorldError::Discontinuous { at: t });
                }
                rest.next();
            }
        }
        for (&p, &t) in rest {
            out.append(p, t)?;
        }
        Ok(out)
    }

    /// Hold the last waypoint until `until` (no-op if already later).
    pub fn extended_to(&self, until: f64) -> Trajectory {
        let mut out = self.clone();
        if until > out.end_time() {
            out.points.push(out.end_point());
            out.times.push(until);
        }
        out
    }

    /// The part of the trajectory within `[t0, t1]`, with interpolated end
    /// points, or `None` when the windows do not overlap.
    pub fn slice(&self, t0: f64, t1: f64) -> Option<Trajectory> {
        let lo = t0.max(self.start_time());
        let hi = t1.min(self.end_time());
        if lo > hi {
            return None;
        }
        let mut points = vec![self.interpolate(lo)];
        let mut times = vec![lo];
        for (&p, &t) in self.points.iter().zip(&self.times) {
            if t > lo && t < hi {
                points.push(p);
                times.push(t);
            }
        }
        if hi > lo {
            points.push(self.interpolate(hi));
            times.push(hi);
        }
        Some(Trajectory { points, times })
    }

    /// Flat `[x0, y0, t0, x1, y1, t1, …]` encoding.
    pub fn to_ordinates(&self) -> Vec<f64> {
        self.points.iter().zip(&self.times).flat_map(|(p, &t)| [p.x, p.y, t]).collect()
    }

    pub fn from_ordinates(ordinates: &[f64]) -> WorldResult<Trajectory> {
        if ordinates.len() % 3 != 0 {
            return Err(WorldError::OrdinateCount(ordinates.len()));
        }
        let (points, times) = ordinates
            .chunks_exact(3)
            .map(|c| (Point::new(c[0], c[1]), c[2]))
            .unzip();
        Trajectory::new(points, times)
    }
}

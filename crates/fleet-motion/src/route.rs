//! Spatial routes.

use fleet_geom::{Point, EPSILON};

use crate::{MotionError, MotionResult};

/// One straight piece of a route, `from` at arc `s0` to `to` at arc `s1`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PathSegment {
    pub from: Point,
    pub to: Point,
    pub s0: f64,
    pub s1: f64,
}

impl PathSegment {
    pub fn length(&self) -> f64 {
        self.s1 - self.s0
    }

    /// Unit direction of travel.
    pub fn direction(&self) -> Point {
        (self.to - self.from) / self.length()
    }
}

/// A polyline through the workspace with cumulative arc length.
///
/// Consecutive duplicate waypoints are dropped, so every segment has
/// positive length.  A single waypoint is a valid (stationary) path of
/// length zero.
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialPath {
    points: Vec<Point>,
    arcs: Vec<f64>,
}

impl SpatialPath {
    pub fn new(points: impl IntoIterator<Item = Point>) -> MotionResult<SpatialPath> {
        let mut pts: Vec<Point> = Vec::new();
        for p in points {
            if pts.last().is_none_or(|q: &Point| !q.approx_eq(p, EPSILON)) {
                pts.push(p);
            }
        }
        if pts.is_empty() {
            return Err(MotionError::EmptyPath);
        }
        let mut arcs = Vec::with_capacity(pts.len());
        let mut acc = 0.0;
        arcs.push(0.0);
        for w in pts.windows(2) {
            acc += w[0].distance(w[1]);
            arcs.push(acc);
        }
        Ok(SpatialPath { points: pts, arcs })
    }

    pub fn stationary(p: Point) -> SpatialPath {
        SpatialPath { points: vec![p], arcs: vec![0.0] }
    }

    pub fn straight(a: Point, b: Point) -> SpatialPath {
        if a.approx_eq(b, EPSILON) {
            SpatialPath::stationary(a)
        } else {
            SpatialPath { points: vec![a, b], arcs: vec![0.0, a.distance(b)] }
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Cumulative arc length at each waypoint.
    pub fn arcs(&self) -> &[f64] {
        &self.arcs
    }

    pub fn length(&self) -> f64 {
        self.arcs[self.arcs.len() - 1]
    }

    pub fn is_stationary(&self) -> bool {
        self.points.len() == 1
    }

    pub fn start(&self) -> Point {
        self.points[0]
    }

    pub fn end(&self) -> Point {
        self.points[self.points.len() - 1]
    }

    pub fn segments(&self) -> impl Iterator<Item = PathSegment> + '_ {
        (1..self.points.len()).map(move |i| PathSegment {
            from: self.points[i - 1],
            to: self.points[i],
            s0: self.arcs[i - 1],
            s1: self.arcs[i],
        })
    }

    /// Position at arc length `s`, clamped to the path.
    pub fn point_at(&self, s: f64) -> Point {
        if s <= 0.0 {
            return self.start();
        }
        if s >= self.length() {
            return self.end();
        }
        let i = self.arcs.partition_point(|&a| a <= s);
        let (a0, a1) = (self.arcs[i - 1], self.arcs[i]);
        self.points[i - 1].lerp(self.points[i], (s - a0) / (a1 - a0))
    }

    /// `self` then `other`, joined by a straight piece if they do not meet.
    pub fn concat(&self, other: &SpatialPath) -> SpatialPath {
        let joined = self.points.iter().chain(other.points.iter()).copied();
        // Never empty: both inputs have at least one waypoint.
        SpatialPath::new(joined).unwrap_or_else(|_| self.clone())
    }

    pub fn reversed(&self) -> SpatialPath {
        SpatialPath::new(self.points.iter().rev().copied()).unwrap_or_else(|_| self.clone())
    }
}

//! The capability surface the planner consumes, plus convenience
//! constructors layered on top of it as free functions.
//!
//! The planner depends on exactly the operations of [`Geometry`]
//! (`contains`, `intersects`, `distance`, `buffer`, `envelope`) and on the
//! convex-specific helpers of [`Polygon`].  Nothing mutates a shape in place.

use rstar::AABB;

use crate::polygon::regular_vertices;
use crate::{EPSILON, GeomError, GeomResult, Point, Polygon};

/// Edge count of the disc approximation used by [`Geometry::buffer`].
pub const DEFAULT_BUFFER_SEGMENTS: usize = 16;

// ── Envelope ──────────────────────────────────────────────────────────────────

/// Axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Envelope {
    pub min: Point,
    pub max: Point,
}

impl Envelope {
    /// Bounding box of `points`.  An empty iterator yields an inverted box
    /// that intersects nothing.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Envelope {
        let inf = f64::INFINITY;
        points.into_iter().fold(
            Envelope { min: Point::new(inf, inf), max: Point::new(-inf, -inf) },
            |e, p| Envelope {
                min: Point::new(e.min.x.min(p.x), e.min.y.min(p.y)),
                max: Point::new(e.max.x.max(p.x), e.max.y.max(p.y)),
            },
        )
    }

    pub fn of_segment(a: Point, b: Point) -> Envelope {
        Envelope::from_points([a, b])
    }

    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Grow every side by `d`.
    pub fn expanded(&self, d: f64) -> Envelope {
        Envelope {
            min: Point::new(self.min.x - d, self.min.y - d),
            max: Point::new(self.max.x + d, self.max.y + d),
        }
    }

    /// The smallest box containing both.
    pub fn merged(&self, other: &Envelope) -> Envelope {
        Envelope::from_points([self.min, self.max, other.min, other.max])
    }

    /// Conversion for `rstar` spatial indexes.
    pub fn to_aabb(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.min.x, self.min.y], [self.max.x, self.max.y])
    }
}

// ── Geometry trait ────────────────────────────────────────────────────────────

/// Capability-based geometry kernel.
///
/// Implemented by [`Polygon`] and [`MultiPolygon`].  Swapping in another
/// kernel means implementing this trait; no planner code depends on how the
/// operations are computed.
pub trait Geometry {
    /// Closed point containment.
    fn contains(&self, p: Point) -> bool;

    /// Closed intersection with a convex polygon (touching counts).
    fn intersects(&self, other: &Polygon) -> bool;

    /// Euclidean distance from `p`; zero inside.
    fn distance(&self, p: Point) -> f64;

    /// The shape grown by `radius` (conservatively, see
    /// [`Polygon::buffer_by`]).
    fn buffer(&self, radius: f64) -> Self
    where
        Self: Sized;

    fn envelope(&self) -> Envelope;
}

impl Geometry for Polygon {
    fn contains(&self, p: Point) -> bool {
        self.contains_point(p)
    }

    fn intersects(&self, other: &Polygon) -> bool {
        self.intersects_polygon(other)
    }

    fn distance(&self, p: Point) -> f64 {
        self.distance_to_point(p)
    }

    fn buffer(&self, radius: f64) -> Polygon {
        self.buffer_by(radius, DEFAULT_BUFFER_SEGMENTS)
    }

    fn envelope(&self) -> Envelope {
        Polygon::envelope(self)
    }
}

// ── MultiPolygon ──────────────────────────────────────────────────────────────

/// A union of convex parts.  Parts may overlap.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MultiPolygon {
    parts: Vec<Polygon>,
}

impl MultiPolygon {
    pub fn new(parts: Vec<Polygon>) -> Self {
        Self { parts }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn parts(&self) -> &[Polygon] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Set union.  The result covers exactly the points covered by either
    /// operand.  A part lying entirely inside one part of the other operand is
    /// dropped, everything else is kept as-is, so parts of the result may
    /// still overlap.
    pub fn union(&self, other: &MultiPolygon) -> MultiPolygon {
        let covered = |p: &Polygon, by: &[Polygon]| {
            by.iter().any(|q| p.vertices().iter().all(|&v| q.contains_point(v)))
        };
        let mut parts: Vec<Polygon> = self
            .parts
            .iter()
            .filter(|p| !covered(p, &other.parts))
            .cloned()
            .collect();
        let extra: Vec<Polygon> = other
            .parts
            .iter()
            .filter(|p| !covered(p, &parts))
            .cloned()
            .collect();
        parts.extend(extra);
        MultiPolygon { parts }
    }

    /// Every part grown by `radius` with a `segments`-gon disc.
    pub fn buffer_by(&self, radius: f64, segments: usize) -> MultiPolygon {
        MultiPolygon { parts: self.parts.iter().map(|q| q.buffer_by(radius, segments)).collect() }
    }

    /// `true` if `p` is inside the union by more than `tol`.
    ///
    /// A point on an edge shared by two touching parts is interior to the
    /// union although it is on the boundary of both; it is detected by
    /// stepping off `p` in the eight compass directions.
    pub fn contains_point_strict(&self, p: Point, tol: f64) -> bool {
        if self.parts.iter().any(|q| q.contains_point_strict(p, tol)) {
            return true;
        }
        if self.parts.len() < 2 {
            return false;
        }
        let step = 2.0 * (tol + EPSILON);
        (-1..=1)
            .flat_map(|dx| (-1..=1).map(move |dy| (dx, dy)))
            .filter(|&d| d != (0, 0))
            .all(|(dx, dy)| self.contains(p + Point::new(f64::from(dx) * step, f64::from(dy) * step)))
    }

    /// `true` if the segment `a`–`b` passes through the interior of the
    /// union deeper than `tol`, including along a seam between parts.
    pub fn segment_crosses_interior(&self, a: Point, b: Point, tol: f64) -> bool {
        if self.parts.iter().any(|q| q.segment_crosses_interior(a, b, tol)) {
            return true;
        }
        if self.parts.len() < 2 {
            return false;
        }
        let length = a.distance(b);
        self.parts
            .iter()
            .filter_map(|q| q.clip_segment(a, b))
            .filter(|&(t0, t1)| (t1 - t0) * length > tol)
            .any(|(t0, t1)| self.contains_point_strict(a.lerp(b, 0.5 * (t0 + t1)), tol))
    }

    /// Every vertex of every part.
    pub fn vertices(&self) -> impl Iterator<Item = Point> + '_ {
        self.parts.iter().flat_map(|q| q.vertices().iter().copied())
    }
}

impl From<Polygon> for MultiPolygon {
    fn from(p: Polygon) -> Self {
        MultiPolygon { parts: vec![p] }
    }
}

impl Geometry for MultiPolygon {
    fn contains(&self, p: Point) -> bool {
        self.parts.iter().any(|q| q.contains_point(p))
    }

    fn intersects(&self, other: &Polygon) -> bool {
        self.parts.iter().any(|q| q.intersects_polygon(other))
    }

    fn distance(&self, p: Point) -> f64 {
        self.parts
            .iter()
            .map(|q| q.distance_to_point(p))
            .fold(f64::INFINITY, f64::min)
    }

    fn buffer(&self, radius: f64) -> MultiPolygon {
        MultiPolygon { parts: self.parts.iter().map(|q| q.buffer(radius)).collect() }
    }

    fn envelope(&self) -> Envelope {
        Envelope::from_points(self.parts.iter().flat_map(|q| q.vertices().iter().copied()))
    }
}

// ── Constructors ──────────────────────────────────────────────────────────────

/// Axis-aligned rectangle.
pub fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> GeomResult<Polygon> {
    if min_x >= max_x || min_y >= max_y {
        return Err(GeomError::InvalidRect { min_x, min_y, max_x, max_y });
    }
    Polygon::new([
        Point::new(min_x, min_y),
        Point::new(max_x, min_y),
        Point::new(max_x, max_y),
        Point::new(min_x, max_y),
    ])
}

/// Regular `n`-gon with circumradius `radius` around `center`.
pub fn regular_polygon(center: Point, radius: f64, n: usize) -> GeomResult<Polygon> {
    if n < 3 || radius <= 0.0 {
        return Err(GeomError::Degenerate(format!("regular polygon n={n} radius={radius}")));
    }
    Polygon::new(regular_vertices(center, radius, n))
}

/// Decode a flat `[x0, y0, x1, y1, …]` list (the array-of-doubles encoding
/// used by visualization and offline validation bridges).
pub fn polygon_from_ordinates(ordinates: &[f64]) -> GeomResult<Polygon> {
    if ordinates.len() % 2 != 0 {
        return Err(GeomError::OddOrdinates(ordinates.len()));
    }
    Polygon::new(ordinates.chunks_exact(2).map(|c| Point::new(c[0], c[1])))
}

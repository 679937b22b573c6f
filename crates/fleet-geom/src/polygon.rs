//! Convex polygons.
//!
//! # Representation
//!
//! A `Polygon` stores its vertices counter-clockwise with no repeated and no
//! collinear vertices.  The constructor accepts any point cloud and keeps its
//! convex hull, so `Polygon::new(vec![…])` never produces a self-intersecting
//! or clockwise shape.
//!
//! Shapes of moving agents and obstacles are expressed relative to the
//! agent's reference point (usually the origin); [`Polygon::translate`] places
//! them in the world.

use crate::{Envelope, GeomError, GeomResult, Point, EPSILON};

// ── HalfPlane ─────────────────────────────────────────────────────────────────

/// The closed half-plane `normal · p <= offset`.
///
/// `normal` is the unit outward normal of the polygon edge it came from.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HalfPlane {
    pub normal: Point,
    pub offset: f64,
}

impl HalfPlane {
    /// Signed slack of `p`: positive inside, zero on the boundary line.
    #[inline]
    pub fn slack(&self, p: Point) -> f64 {
        self.offset - self.normal.dot(p)
    }
}

// ── Polygon ───────────────────────────────────────────────────────────────────

/// A convex polygon with counter-clockwise vertices and non-zero area.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    /// Build the convex hull of `points`.
    ///
    /// # Errors
    ///
    /// [`GeomError::NonFinite`] for NaN/infinite coordinates and
    /// [`GeomError::Degenerate`] when the hull has no area (fewer than three
    /// distinct points, or all of them collinear).
    pub fn new(points: impl IntoIterator<Item = Point>) -> GeomResult<Polygon> {
        let mut pts: Vec<Point> = points.into_iter().collect();
        if let Some(bad) = pts.iter().find(|p| !p.is_finite()) {
            return Err(GeomError::NonFinite { x: bad.x, y: bad.y });
        }
        let vertices = convex_hull(&mut pts);
        if vertices.len() < 3 {
            return Err(GeomError::Degenerate(format!(
                "convex hull has {} vertices",
                vertices.len()
            )));
        }
        let poly = Polygon { vertices };
        if poly.area() <= EPSILON {
            return Err(GeomError::Degenerate("zero area".into()));
        }
        Ok(poly)
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// Always `false`: a polygon has at least three vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Directed edges `(v[i], v[i+1])`, wrapping around.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    pub fn area(&self) -> f64 {
        0.5 * self.edges().map(|(a, b)| a.cross(b)).sum::<f64>()
    }

    pub fn centroid(&self) -> Point {
        let a6 = 6.0 * self.area();
        let (cx, cy) = self.edges().fold((0.0, 0.0), |(cx, cy), (a, b)| {
            let k = a.cross(b);
            (cx + (a.x + b.x) * k, cy + (a.y + b.y) * k)
        });
        Point::new(cx / a6, cy / a6)
    }

    pub fn envelope(&self) -> Envelope {
        Envelope::from_points(self.vertices.iter().copied())
    }

    /// Largest distance from the origin to any vertex.  For a shape given
    /// relative to an agent's reference point this is the agent's radius.
    pub fn radius(&self) -> f64 {
        self.vertices.iter().map(|v| v.norm()).fold(0.0, f64::max)
    }

    pub fn translate(&self, d: Point) -> Polygon {
        Polygon { vertices: self.vertices.iter().map(|&v| v + d).collect() }
    }

    /// Point reflection through the origin (`-P`).  Negation is a half-turn,
    /// so the vertex order stays counter-clockwise.
    pub fn reflect(&self) -> Polygon {
        Polygon { vertices: self.vertices.iter().map(|&v| -v).collect() }
    }

    /// Minkowski sum `self ⊕ other`.
    pub fn minkowski_sum(&self, other: &Polygon) -> Polygon {
        let mut sums: Vec<Point> = Vec::with_capacity(self.len() * other.len());
        for &a in &self.vertices {
            for &b in &other.vertices {
                sums.push(a + b);
            }
        }
        // The sum of two polygons with area always has area.
        Polygon { vertices: convex_hull(&mut sums) }
    }

    /// Grow the polygon by `radius`, approximating the disc by a regular
    /// `segments`-gon that circumscribes it (the result always contains the
    /// exact buffer).
    pub fn buffer_by(&self, radius: f64, segments: usize) -> Polygon {
        if radius <= 0.0 {
            return self.clone();
        }
        let n = segments.max(3);
        let circum = radius / (std::f64::consts::PI / n as f64).cos();
        let disc = Polygon { vertices: regular_vertices(Point::ORIGIN, circum, n) };
        self.minkowski_sum(&disc)
    }

    /// The supporting half-planes of every edge.
    pub fn halfplanes(&self) -> Vec<HalfPlane> {
        self.edges()
            .filter_map(|(a, b)| {
                let normal = Point::new(b.y - a.y, a.x - b.x).normalized()?;
                Some(HalfPlane { normal, offset: normal.dot(a) })
            })
            .collect()
    }

    /// Minimum slack of `p` over all edges: positive strictly inside,
    /// negative outside.
    pub fn depth(&self, p: Point) -> f64 {
        self.halfplanes()
            .iter()
            .map(|h| h.slack(p))
            .fold(f64::INFINITY, f64::min)
    }

    /// Closed containment with tolerance [`EPSILON`].
    pub fn contains_point(&self, p: Point) -> bool {
        self.depth(p) >= -EPSILON
    }

    /// `true` if `p` is inside by more than `tol`.
    pub fn contains_point_strict(&self, p: Point, tol: f64) -> bool {
        self.depth(p) > tol
    }

    /// Parameter interval `[t0, t1] ⊆ [0, 1]` of the segment `a + t(b − a)`
    /// that lies inside the closed polygon (Cyrus–Beck), or `None`.
    pub fn clip_segment(&self, a: Point, b: Point) -> Option<(f64, f64)> {
        let d = b - a;
        let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
        for h in self.halfplanes() {
            let denom = h.normal.dot(d);
            let num = h.slack(a);
            if denom.abs() <= EPSILON * EPSILON {
                if num < -EPSILON {
                    return None;
                }
                continue;
            }
            let t = num / denom;
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

    /// `true` if the segment `a`–`b` passes through the interior deeper than
    /// `tol`.  Running along an edge or touching a vertex is not a crossing.
    pub fn segment_crosses_interior(&self, a: Point, b: Point, tol: f64) -> bool {
        if a.approx_eq(b, EPSILON) {
            return self.contains_point_strict(a, tol);
        }
        let Some((t0, t1)) = self.clip_segment(a, b) else {
            return false;
        };
        if (t1 - t0) * a.distance(b) <= tol {
            return false;
        }
        self.contains_point_strict(a.lerp(b, 0.5 * (t0 + t1)), tol)
    }

    /// Nearest point of the closed polygon to `p` (`p` itself when inside).
    pub fn closest_point(&self, p: Point) -> Point {
        if self.contains_point(p) {
            return p;
        }
        self.edges()
            .map(|(a, b)| crate::closest_on_segment(p, a, b))
            .min_by(|x, y| x.distance(p).total_cmp(&y.distance(p)))
            .unwrap_or(p)
    }

    pub fn distance_to_point(&self, p: Point) -> f64 {
        p.distance(self.closest_point(p))
    }

    /// Closed intersection test (touching counts).
    pub fn intersects_polygon(&self, other: &Polygon) -> bool {
        self.penetration(other) >= -EPSILON
    }

    /// Interior overlap deeper than `tol` (touching does not count).
    pub fn overlaps(&self, other: &Polygon, tol: f64) -> bool {
        self.penetration(other) > tol
    }

    /// Separating-axis penetration depth: the smallest projection overlap over
    /// all edge normals of both polygons.  Negative when separated.
    fn penetration(&self, other: &Polygon) -> f64 {
        let mut depth = f64::INFINITY;
        for h in self.halfplanes().into_iter().chain(other.halfplanes()) {
            let (a_lo, a_hi) = project(&self.vertices, h.normal);
            let (b_lo, b_hi) = project(&other.vertices, h.normal);
            depth = depth.min(a_hi.min(b_hi) - a_lo.max(b_lo));
        }
        depth
    }

    /// Vertex-wise equality up to `tol`, independent of the starting vertex.
    pub fn approx_eq(&self, other: &Polygon, tol: f64) -> bool {
        let n = self.len();
        if n != other.len() {
            return false;
        }
        (0..n).any(|shift| {
            (0..n).all(|i| self.vertices[i].approx_eq(other.vertices[(i + shift) % n], tol))
        })
    }

    /// Flat `[x0, y0, x1, y1, …]` encoding used by visualization bridges.
    pub fn to_ordinates(&self) -> Vec<f64> {
        self.vertices.iter().flat_map(|p| [p.x, p.y]).collect()
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn project(points: &[Point], axis: Point) -> (f64, f64) {
    points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        let d = p.dot(axis);
        (lo.min(d), hi.max(d))
    })
}

pub(crate) fn regular_vertices(center: Point, radius: f64, n: usize) -> Vec<Point> {
    (0..n)
        .map(|k| {
            let a = std::f64::consts::TAU * k as f64 / n as f64;
            center + Point::new(a.cos(), a.sin()) * radius
        })
        .collect()
}

/// Andrew's monotone chain.  Returns the hull counter-clockwise without
/// collinear vertices.  Sorts `pts` in place.
fn convex_hull(pts: &mut [Point]) -> Vec<Point> {
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    let mut hull: Vec<Point> = Vec::with_capacity(pts.len() + 1);

    // Lower hull, then upper hull.
    for pass in 0..2 {
        let start = hull.len();
        let iter: Box<dyn Iterator<Item = &Point>> = if pass == 0 {
            Box::new(pts.iter())
        } else {
            Box::new(pts.iter().rev())
        };
        for &p in iter {
            while hull.len() >= start + 2 {
                let a = hull[hull.len() - 2];
                let b = hull[hull.len() - 1];
                if (b - a).cross(p - a) <= EPSILON * (1.0 + (b - a).norm() * (p - a).norm()) {
                    hull.pop();
                } else {
                    break;
                }
            }
            hull.push(p);
        }
        // The last point of each chain is the first of the next.
        hull.pop();
    }

    hull.dedup_by(|a, b| a.approx_eq(*b, EPSILON));
    if hull.len() > 1 && hull[0].approx_eq(hull[hull.len() - 1], EPSILON) {
        hull.pop();
    }
    hull
}

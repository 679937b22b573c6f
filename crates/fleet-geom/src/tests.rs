//! Unit tests for fleet-geom.

#[cfg(test)]
mod helpers {
    use crate::{rect, Point, Polygon};

    pub fn unit_square() -> Polygon {
        rect(0.0, 0.0, 1.0, 1.0).unwrap()
    }

    /// Rhombus with vertices on the axes at distance 1.
    pub fn rhombus() -> Polygon {
        Polygon::new([
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(-1.0, 0.0),
            Point::new(0.0, -1.0),
        ])
        .unwrap()
    }
}

// ── Point ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod point {
    use crate::{closest_on_segment, distance_to_polyline, Point};

    #[test]
    fn arithmetic() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(3.0, -1.0);
        assert_eq!(a + b, Point::new(4.0, 1.0));
        assert_eq!(a - b, Point::new(-2.0, 3.0));
        assert_eq!(-a, Point::new(-1.0, -2.0));
        assert_eq!(a * 2.0, Point::new(2.0, 4.0));
        assert_eq!(a.dot(b), 1.0);
        assert_eq!(a.cross(b), -7.0);
    }

    #[test]
    fn normalized_zero_is_none() {
        assert!(Point::ORIGIN.normalized().is_none());
        let u = Point::new(3.0, 4.0).normalized().unwrap();
        assert!((u.norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn segment_projection_clamps() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert_eq!(closest_on_segment(Point::new(5.0, 3.0), a, b), Point::new(5.0, 0.0));
        assert_eq!(closest_on_segment(Point::new(-5.0, 3.0), a, b), a);
        assert_eq!(closest_on_segment(Point::new(15.0, 3.0), a, b), b);
    }

    #[test]
    fn polyline_distance() {
        let line = [Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)];
        assert!((distance_to_polyline(Point::new(12.0, 5.0), &line) - 2.0).abs() < 1e-12);
        assert!((distance_to_polyline(Point::new(3.0, 0.0), &[Point::ORIGIN]) - 3.0).abs() < 1e-12);
        assert!(distance_to_polyline(Point::ORIGIN, &[]).is_infinite());
    }
}

// ── Polygon ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod polygon {
    use super::helpers::{rhombus, unit_square};
    use crate::{GeomError, Point, Polygon};

    #[test]
    fn hull_drops_interior_and_collinear_points() {
        let p = Polygon::new([
            Point::new(0.0, 0.0),
            Point::new(0.5, 0.0), // collinear
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.5, 0.5), // interior
            Point::new(0.0, 1.0),
        ])
        .unwrap();
        assert_eq!(p.len(), 4);
        assert!((p.area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn vertices_are_counter_clockwise() {
        // Supplied clockwise.
        let p = Polygon::new([
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 0.0),
        ])
        .unwrap();
        assert!(p.area() > 0.0);
    }

    #[test]
    fn degenerate_inputs_error() {
        let line = Polygon::new([Point::new(0.0, 0.0), Point::new(1.0, 1.0), Point::new(2.0, 2.0)]);
        assert!(matches!(line, Err(GeomError::Degenerate(_))));
        let nan = Polygon::new([Point::new(f64::NAN, 0.0), Point::new(1.0, 0.0), Point::new(0.0, 1.0)]);
        assert!(matches!(nan, Err(GeomError::NonFinite { .. })));
    }

    #[test]
    fn centroid_of_square() {
        assert!(unit_square().centroid().approx_eq(Point::new(0.5, 0.5), 1e-12));
    }

    #[test]
    fn containment_is_closed() {
        let sq = unit_square();
        assert!(sq.contains_point(Point::new(0.5, 0.5)));
        assert!(sq.contains_point(Point::new(1.0, 0.5))); // on edge
        assert!(!sq.contains_point(Point::new(1.1, 0.5)));
        assert!(!sq.contains_point_strict(Point::new(1.0, 0.5), 1e-9));
    }

    #[test]
    fn minkowski_of_squares_doubles_side() {
        let sq = unit_square();
        let sum = sq.minkowski_sum(&sq);
        assert!(sum.approx_eq(&crate::rect(0.0, 0.0, 2.0, 2.0).unwrap(), 1e-12));
    }

    #[test]
    fn reflect_is_point_symmetric() {
        let r = unit_square().reflect();
        assert!(r.approx_eq(&crate::rect(-1.0, -1.0, 0.0, 0.0).unwrap(), 1e-12));
        assert!(r.area() > 0.0);
    }

    #[test]
    fn buffer_contains_exact_offset() {
        let b = unit_square().buffer_by(0.5, 8);
        // Every point at distance 0.5 from the square must be covered.
        for k in 0..32 {
            let a = std::f64::consts::TAU * k as f64 / 32.0;
            let p = Point::new(1.0, 1.0) + Point::new(a.cos(), a.sin()) * 0.5;
            assert!(b.contains_point(p), "{p} not covered");
        }
        assert!(!b.contains_point(Point::new(2.0, 2.0)));
    }

    #[test]
    fn clip_segment_through_square() {
        let sq = unit_square();
        let (t0, t1) = sq.clip_segment(Point::new(-1.0, 0.5), Point::new(3.0, 0.5)).unwrap();
        assert!((t0 - 0.25).abs() < 1e-12);
        assert!((t1 - 0.5).abs() < 1e-12);
        assert!(sq.clip_segment(Point::new(-1.0, 2.0), Point::new(3.0, 2.0)).is_none());
    }

    #[test]
    fn edge_runs_are_not_crossings() {
        let sq = unit_square();
        assert!(sq.segment_crosses_interior(Point::new(-1.0, 0.5), Point::new(3.0, 0.5), 1e-9));
        // Along the bottom edge.
        assert!(!sq.segment_crosses_interior(Point::new(-1.0, 0.0), Point::new(3.0, 0.0), 1e-9));
        // Through a single vertex.
        assert!(!sq.segment_crosses_interior(Point::new(0.0, 2.0), Point::new(2.0, 0.0), 1e-9));
    }

    #[test]
    fn overlap_vs_touch() {
        let a = unit_square();
        let touching = a.translate(Point::new(1.0, 0.0));
        let overlapping = a.translate(Point::new(0.5, 0.5));
        let apart = a.translate(Point::new(3.0, 0.0));
        assert!(a.intersects_polygon(&touching));
        assert!(!a.overlaps(&touching, 1e-9));
        assert!(a.overlaps(&overlapping, 1e-9));
        assert!(!a.intersects_polygon(&apart));
    }

    #[test]
    fn distance_and_closest_point() {
        let r = rhombus();
        assert_eq!(r.distance_to_point(Point::ORIGIN), 0.0);
        assert!((r.distance_to_point(Point::new(3.0, 0.0)) - 2.0).abs() < 1e-12);
        assert!(r.closest_point(Point::new(0.0, 5.0)).approx_eq(Point::new(0.0, 1.0), 1e-12));
    }

    #[test]
    fn radius_about_origin() {
        assert!((rhombus().radius() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn approx_eq_ignores_start_vertex() {
        let a = rhombus();
        let b = Polygon::new([
            Point::new(0.0, -1.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(-1.0, 0.0),
        ])
        .unwrap();
        assert!(a.approx_eq(&b, 1e-12));
        assert!(!a.approx_eq(&unit_square(), 1e-12));
    }
}

// ── Kernel ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod kernel {
    use super::helpers::unit_square;
    use crate::{
        polygon_from_ordinates, rect, regular_polygon, Envelope, GeomError, Geometry,
        MultiPolygon, Point, EPSILON,
    };

    #[test]
    fn ordinates_roundtrip() {
        let sq = unit_square();
        let back = polygon_from_ordinates(&sq.to_ordinates()).unwrap();
        assert!(back.approx_eq(&sq, 0.0));
        assert_eq!(polygon_from_ordinates(&[0.0, 1.0, 2.0]), Err(GeomError::OddOrdinates(3)));
    }

    #[test]
    fn rect_rejects_inverted_bounds() {
        assert!(matches!(rect(1.0, 0.0, 0.0, 1.0), Err(GeomError::InvalidRect { .. })));
    }

    #[test]
    fn regular_polygon_radius() {
        let hex = regular_polygon(Point::ORIGIN, 2.0, 6).unwrap();
        assert_eq!(hex.len(), 6);
        assert!((hex.radius() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn union_drops_covered_parts() {
        let big: MultiPolygon = rect(0.0, 0.0, 4.0, 4.0).unwrap().into();
        let small: MultiPolygon = unit_square().translate(Point::new(1.0, 1.0)).into();
        let far: MultiPolygon = unit_square().translate(Point::new(10.0, 10.0)).into();
        assert_eq!(big.union(&small).len(), 1);
        let u = big.union(&far);
        assert_eq!(u.len(), 2);
        assert!(u.contains(Point::new(10.5, 10.5)));
        assert!(!u.contains(Point::new(7.0, 7.0)));
    }

    #[test]
    fn union_covers_both_operands() {
        let a = MultiPolygon::new(vec![rect(0.0, 0.0, 2.0, 2.0).unwrap(), rect(5.0, 0.0, 6.0, 1.0).unwrap()]);
        let b = MultiPolygon::new(vec![rect(1.0, 1.0, 3.0, 3.0).unwrap(), rect(5.2, 0.2, 5.8, 0.8).unwrap()]);
        let u = a.union(&b);
        assert_eq!(u.len(), 3);
        for q in [Point::new(0.5, 0.5), Point::new(2.5, 2.5), Point::new(5.9, 0.9), Point::new(1.5, 1.5)] {
            assert_eq!(u.contains(q), a.contains(q) || b.contains(q));
        }
        assert!(!u.contains(Point::new(2.5, 0.5)));
    }

    #[test]
    fn strict_containment_sees_across_seams() {
        let l = MultiPolygon::new(vec![rect(0.0, 0.0, 1.0, 4.0).unwrap(), rect(1.0, 0.0, 4.0, 1.0).unwrap()]);
        assert!(l.contains_point_strict(Point::new(1.0, 0.5), EPSILON));
        assert!(!l.contains_point_strict(Point::new(1.0, 1.0), EPSILON));
        assert!(!l.contains_point_strict(Point::new(0.0, 2.0), EPSILON));
        assert!(l.segment_crosses_interior(Point::new(1.0, -1.0), Point::new(1.0, 0.5), EPSILON));
        assert!(!l.segment_crosses_interior(Point::new(1.0, 1.0), Point::new(1.0, 5.0), EPSILON));
        assert_eq!(l.vertices().count(), 8);
        assert!(l.buffer_by(0.5, 8).contains(Point::new(1.4, 1.4)));
    }

    #[test]
    fn multipolygon_distance_and_buffer() {
        let m = MultiPolygon::new(vec![unit_square(), unit_square().translate(Point::new(5.0, 0.0))]);
        assert!((m.distance(Point::new(3.0, 0.5)) - 2.0).abs() < 1e-12);
        let grown = m.buffer(0.5);
        assert!(grown.contains(Point::new(1.4, 0.5)));
        assert!(grown.intersects(&rect(1.2, 0.0, 1.3, 1.0).unwrap()));
    }

    #[test]
    fn envelope_queries() {
        let e = Envelope::of_segment(Point::new(2.0, 3.0), Point::new(-1.0, 0.0));
        assert_eq!(e.min, Point::new(-1.0, 0.0));
        assert_eq!(e.max, Point::new(2.0, 3.0));
        assert!(e.contains_point(Point::new(0.0, 1.0)));
        let far = Envelope::of_segment(Point::new(10.0, 10.0), Point::new(11.0, 11.0));
        assert!(!e.intersects(&far));
        assert!(e.merged(&far).intersects(&far));
        assert!(unit_square().envelope().expanded(0.5).contains_point(Point::new(-0.4, 1.4)));
    }
}

//! `fleet-geom` — the geometry kernel consumed by the planner.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                   |
//! |-------------|------------------------------------------------------------|
//! | [`point`]   | `Point`, segment / polyline distance helpers               |
//! | [`polygon`] | `Polygon` (convex, CCW), `HalfPlane`, clipping, Minkowski  |
//! | [`kernel`]  | `Geometry` capability trait, `MultiPolygon`, `Envelope`, constructors |
//! | [`error`]   | `GeomError`, `GeomResult<T>`                               |
//!
//! # Convexity
//!
//! Every `Polygon` is convex.  Concave shapes are modelled as a
//! [`MultiPolygon`] of convex parts.  Its strict containment and
//! segment-crossing queries look across the seams between touching parts.
//!
//! All values are immutable: every operation returns a new shape.
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on public types.           |

pub mod error;
pub mod kernel;
pub mod point;
pub mod polygon;

#[cfg(test)]
mod tests;

pub use error::{GeomError, GeomResult};
pub use kernel::{
    polygon_from_ordinates, rect, regular_polygon, Envelope, Geometry, MultiPolygon,
    DEFAULT_BUFFER_SEGMENTS,
};
pub use point::{closest_on_segment, distance_to_polyline, Point};
pub use polygon::{HalfPlane, Polygon};

/// Absolute tolerance used by the geometric predicates.
pub const EPSILON: f64 = 1e-9;

//! `fleet-motion` — getting one node from A to B without hitting anything.
//!
//! Motion planning is split the classic way: a purely spatial route through
//! the static obstacles first, then timing along that fixed route against
//! the moving ones.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`route`]       | `SpatialPath` (polyline with cumulative arc length)        |
//! | [`spatial`]     | `SpatialPlanner` trait, `VisibilityGraphPlanner`           |
//! | [`forbidden`]   | `ForbiddenRegionBuilder`, `ForbiddenRegion`, `RegionPiece` |
//! | [`mesh`]        | `ArcTimePlanner`, `Goal`, `ArcTimePath`                    |
//! | [`perspective`] | `PerspectiveCache`, `Perspective` (per-radius worlds)      |
//! | [`error`]       | `MotionError`, `MotionResult<T>`                           |
//!
//! # The arc-time plane
//!
//! Along a fixed route of length `L` a node's state is its arc length `s`
//! at time `t`.  Arc-time coordinates are carried in [`fleet_geom::Point`]
//! with `x = s` and `y = t`.  A moving obstacle becomes a set of convex
//! forbidden pieces in that plane; a speed-bounded motion is a polyline whose
//! slope `ds/dt` stays within `[-v_max, v_max]` (or `[0, v_max]` without
//! reverse motion) and that never enters a forbidden piece.
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                    |
//! |------------|-----------------------------------------------------------|
//! | `parallel` | Builds per-obstacle forbidden regions on the Rayon pool.  |

pub mod cost;
pub mod error;
pub mod forbidden;
pub mod mesh;
pub mod perspective;
pub mod route;
pub mod spatial;


pub use error::{MotionError, MotionResult};
pub use forbidden::{forbidden_intervals_at, ForbiddenRegion, ForbiddenRegionBuilder, RegionPiece};
pub use mesh::{ArcTimePath, ArcTimePlanner, Goal};
pub use perspective::{Perspective, PerspectiveCache, RELEASE_HISTORY};
pub use route::{PathSegment, SpatialPath};
pub use spatial::{SpatialPlanner, VisibilityGraphPlanner};

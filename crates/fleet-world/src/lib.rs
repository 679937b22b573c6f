//! `fleet-world` — the environment nodes move through.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                  |
//! |----------------|-----------------------------------------------------------|
//! | [`trajectory`] | `Trajectory`, `TrajectorySegment`                         |
//! | [`obstacle`]   | `StaticObstacle`, `DynamicObstacle`                       |
//! | [`world`]      | `World` (R-tree indexed), `WorldBuilder`                  |
//! | [`collision`]  | exact continuous collision check between moving shapes    |
//! | [`loader`]     | `load_world_csv`, `load_world_reader`                     |
//! | [`error`]      | `WorldError`, `WorldResult<T>`                            |
//!
//! # Conventions
//!
//! Times are `f64` seconds since a caller-chosen epoch.  The shape of a
//! dynamic obstacle (and of a node) is given relative to its reference
//! point; the trajectory moves the reference point.  A dynamic obstacle
//! exists only during its trajectory's time span.  A static obstacle is a
//! `MultiPolygon` in world coordinates, so it may be concave.
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on trajectories and obstacles. |

pub mod collision;
pub mod error;
pub mod loader;
pub mod obstacle;
pub mod trajectory;
pub mod world;


pub use collision::trajectories_collide;
pub use error::{WorldError, WorldResult};
pub use loader::{load_world_csv, load_world_reader};
pub use obstacle::{DynamicObstacle, StaticObstacle};
pub use trajectory::{Trajectory, TrajectorySegment};
pub use world::{World, WorldBuilder};

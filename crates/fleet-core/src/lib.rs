//! `fleet-core` — foundational types for the `fleet` task planner.
//!
//! This crate is a dependency of every other `fleet-*` crate.  It has no
//! `fleet-*` dependencies and a single required external one (`thiserror`,
//! plus optional `serde`).
//!
//! # What lives here
//!
//! | Module     | Contents                                              |
//! |------------|-------------------------------------------------------|
//! | [`ids`]    | `NodeId`, `JobId`, `ObstacleId`, `TransactionId`      |
//! | [`config`] | `PlannerConfig`                                       |
//! | [`error`]  | `CoreError`, `CoreResult`                             |
//!
//! # Time
//!
//! All timestamps in the planner are `f64` seconds since a caller-chosen base
//! epoch.  The core never converts to wall-clock time; that belongs to the
//! ingestion and visualization layers.
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod config;
pub mod error;
pub mod ids;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::PlannerConfig;
pub use error::{CoreError, CoreResult};
pub use ids::{JobId, NodeId, ObstacleId, TransactionId};

//! `fleet-schedule` — assigning jobs to nodes without collisions.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                   |
//! |-----------------|------------------------------------------------------------|
//! | [`job`]         | `JobSpecification`, `Job`                                  |
//! | [`node`]        | `NodeSpecification`, `Node`, `Movement`, `IdleSlot`        |
//! | [`schedule`]    | `Schedule` (authoritative state, revisioned)               |
//! | [`alternative`] | `ScheduleAlternative`, `SealedAlternative`, `Conflict`     |
//! | [`planner`]     | `TaskPlanner` (slot search, visits, evasion), `Candidate`  |
//! | [`scheduler`]   | `Scheduler`, `NodeReference`, `ScheduleResult`             |
//! | [`error`]       | `SchedulerError`, `SchedulerResult<T>`                     |
//!
//! # Request flow
//!
//! ```text
//! schedule(job) ──► TaskPlanner ──► ScheduleAlternative ──seal──► SealedAlternative
//!                                                                   │ (pending)
//! commit(tx) ─────────────────────────────► Schedule::integrate ◄───┘
//! ```
//!
//! Requests are processed one at a time against a single `Schedule`.
//!
//! # Feature flags
//!
//! | Flag       | Effect                                                   |
//! |------------|----------------------------------------------------------|
//! | `parallel` | Builds forbidden regions on the Rayon pool.              |
//! | `fx-hash`  | FxHash instead of SipHash for job and transaction tables. |

pub mod alternative;
pub mod error;
pub mod job;
pub mod node;
pub mod planner;
pub mod schedule;
pub mod scheduler;

#[cfg(test)]
mod tests;

pub use alternative::{Conflict, ScheduleAlternative, SealedAlternative};
pub use error::{SchedulerError, SchedulerResult};
pub use job::{Job, JobSpecification};
pub use node::{IdleSlot, Movement, MovementKind, Node, NodeSpecification};
pub use planner::{Candidate, TaskPlanner};
pub use schedule::Schedule;
pub use scheduler::{NodeReference, ScheduleResult, Scheduler};

#[cfg(feature = "fx-hash")]
pub(crate) type Map<K, V> = rustc_hash::FxHashMap<K, V>;

#[cfg(not(feature = "fx-hash"))]
pub(crate) type Map<K, V> = std::collections::HashMap<K, V>;

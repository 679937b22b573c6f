//! Scheduler error type.
//!
//! An unschedulable job is not an error: it is reported as
//! `ScheduleResult { feasible: false, .. }`.

use thiserror::Error;

use fleet_constraint::ConstraintError;
use fleet_core::{CoreError, JobId, NodeId, TransactionId};
use fleet_motion::MotionError;
use fleet_world::WorldError;

/// Errors produced by `fleet-schedule`.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid job {0}: {1}")]
    InvalidJob(JobId, String),

    #[error("invalid node {0}: {1}")]
    InvalidNode(NodeId, String),

    #[error("node {0} already exists")]
    DuplicateNode(NodeId),

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("unknown transaction {0}")]
    UnknownTransaction(TransactionId),

    #[error("alternative was built against schedule revision {built}, schedule is at {current}")]
    StaleTransaction { built: u64, current: u64 },

    #[error("constraint error: {0}")]
    Constraint(#[from] ConstraintError),

    #[error("motion error: {0}")]
    Motion(#[from] MotionError),

    #[error("configuration error: {0}")]
    Core(#[from] CoreError),

    #[error("world error: {0}")]
    World(#[from] WorldError),
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

//! Motion-planning error type.
//!
//! Failing to find a *timing* along a route is not an error: the arc-time
//! planner returns `None`.  These variants cover spatial impossibility and
//! misuse.

use thiserror::Error;

use fleet_core::NodeId;
use fleet_geom::Point;
use fleet_world::WorldError;

/// Errors produced by `fleet-motion`.
#[derive(Debug, Error)]
pub enum MotionError {
    #[error("no route from {from} to {to}")]
    NoRoute { from: Point, to: Point },

    #[error("{0} lies inside a static obstacle")]
    BlockedEndpoint(Point),

    #[error("a spatial path needs at least one waypoint")]
    EmptyPath,

    #[error("max speed must be finite and positive, got {0}")]
    InvalidSpeed(f64),

    #[error("node {0} holds no world perspective")]
    UnknownNode(NodeId),

    #[error("world error: {0}")]
    World(#[from] WorldError),
}

pub type MotionResult<T> = Result<T, MotionError>;

//! World-model error type.

use thiserror::Error;

use fleet_core::ObstacleId;
use fleet_geom::GeomError;

/// Errors produced by `fleet-world`.
#[derive(Debug, Error)]
pub enum WorldError {
    #[error("trajectory has {points} waypoints but {times} timestamps")]
    LengthMismatch { points: usize, times: usize },

    #[error("trajectory has no waypoints")]
    Empty,

    #[error("timestamps must be strictly increasing: t[{index}] = {next} after {prev}")]
    NonMonotonicTime { index: usize, prev: f64, next: f64 },

    #[error("waypoint {index} has a non-finite coordinate or timestamp")]
    NonFinite { index: usize },

    #[error("trajectories meet at t = {at} in two different places")]
    Discontinuous { at: f64 },

    #[error("ordinate list length {0} is not a multiple of 3")]
    OrdinateCount(usize),

    #[error("obstacle {0}: {1}")]
    Obstacle(ObstacleId, String),

    #[error("geometry error: {0}")]
    Geom(#[from] GeomError),

    #[error("CSV parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type WorldResult<T> = Result<T, WorldError>;

//! Geometry error type.

use thiserror::Error;

/// Errors produced while constructing geometry.  All of them indicate a
/// malformed input shape, never a runtime condition.
#[derive(Debug, Error, PartialEq)]
pub enum GeomError {
    #[error("polygon is degenerate: {0}")]
    Degenerate(String),

    #[error("coordinate is not finite: ({x}, {y})")]
    NonFinite { x: f64, y: f64 },

    #[error("ordinate list has odd length {0}")]
    OddOrdinates(usize),

    #[error("invalid rectangle: min ({min_x}, {min_y}) exceeds max ({max_x}, {max_y})")]
    InvalidRect { min_x: f64, min_y: f64, max_x: f64, max_y: f64 },
}

pub type GeomResult<T> = Result<T, GeomError>;

use thiserror::Error;

use crate::VarId;

/// Misuse of the constraint API.  Every variant is a programming error in the
/// caller; infeasibility is expressed as [`RealSet::Empty`](crate::RealSet).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConstraintError {
    #[error("variable {0} is sealed and accepts no further constraints")]
    Sealed(VarId),

    #[error("variable {0} must be sealed with ready() before evaluation")]
    NotSealed(VarId),

    #[error("variable {0} does not belong to this graph")]
    UnknownVariable(VarId),

    #[error("variable {0} could not be resolved")]
    Unresolved(VarId),
}

pub type ConstraintResult<T> = Result<T, ConstraintError>;

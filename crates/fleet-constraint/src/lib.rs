//! `fleet-constraint` — interval domains for scheduling unknowns.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                  |
//! |--------------|-----------------------------------------------------------|
//! | [`realset`]  | `RealSet` algebra over the extended reals                 |
//! | [`variable`] | `Constraint`, `VarId`, `VariableGraph` (build → seal → evaluate) |
//! | [`error`]    | `ConstraintError`, `ConstraintResult<T>`                  |
//!
//! # Model
//!
//! A variable's domain is the intersection of its constraints.  A constraint
//! is either a concrete [`RealSet`] or a *relation* `reference + offset`
//! meaning "the resolved domain of another variable, shifted by `offset`".
//! Relations may form cycles; [`VariableGraph::evaluate`] eliminates them by
//! substitution around the cycle (see the module docs of [`variable`]).
//!
//! An `Empty` domain is an ordinary answer ("nothing satisfies this"), not an
//! error.  Errors are reserved for misuse: constraining a sealed variable or
//! evaluating an unsealed one.

pub mod error;
pub mod realset;
pub mod variable;


pub use error::{ConstraintError, ConstraintResult};
pub use realset::RealSet;
pub use variable::{Constraint, VarId, VariableGraph};

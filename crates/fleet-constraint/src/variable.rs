//! Variables, constraints and cyclic evaluation.
//!
//! # Lifecycle
//!
//! ```text
//! variable()  ──constrain()*──▶  ready()  ──evaluate()──▶  resolved RealSet
//! ```
//!
//! A variable accepts constraints until it is sealed with
//! [`VariableGraph::ready`].  Evaluation requires every variable it reaches to
//! be sealed, and caches the resolved domain on each variable it finishes.
//!
//! # Cycle elimination
//!
//! Evaluation is a depth-first walk carrying the chain of variables currently
//! being expanded (the *trace*).  For a variable `v`:
//!
//! 1. set constraints are kept as-is;
//! 2. a relation to a resolved variable becomes `Set(resolved + offset)`;
//! 3. a relation to a variable on the trace is a back edge and is handed to
//!    the caller unchanged;
//! 4. any other relation is expanded recursively, and every constraint the
//!    recursion hands back is shifted by the relation's offset.
//!
//! Back edges that reach `v` itself arrive as *self-relations* `v ∈ v + O`.
//! Such a relation is satisfiable iff `0 ∈ O`: if it is, it carries no
//! information and is dropped; if not, `v` resolves to `Empty`.  Once only set
//! constraints remain, `v` resolves to their intersection (or `Full` when
//! there are none).  Otherwise the remaining back edges are returned for an
//! ancestor on the trace to close.

use std::collections::VecDeque;
use std::fmt;

use crate::{ConstraintError, ConstraintResult, RealSet};

/// Handle to a variable inside one [`VariableGraph`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub u32);

impl VarId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VarId({})", self.0)
    }
}

// ── Constraint ────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// The variable lies in this set.
    Set(RealSet),
    /// The variable lies in `domain(reference) + offset`.
    Relation { reference: VarId, offset: RealSet },
}

impl Constraint {
    pub fn relation(reference: VarId, offset: RealSet) -> Constraint {
        Constraint::Relation { reference, offset }
    }

    /// Shift the constraint by `offset` (Minkowski sum on the set or on the
    /// relation's offset).
    pub fn offset_by(&self, offset: &RealSet) -> Constraint {
        match self {
            Constraint::Set(s) => Constraint::Set(s.add(offset)),
            Constraint::Relation { reference, offset: o } => {
                Constraint::Relation { reference: *reference, offset: o.add(offset) }
            }
        }
    }

    /// Canonical form against `graph`: sets are normalized and a relation to
    /// an already resolved variable is replaced by the concrete set.
    pub fn normalize(&self, graph: &VariableGraph) -> Constraint {
        match self {
            Constraint::Set(s) => Constraint::Set(s.normalize()),
            Constraint::Relation { reference, offset } => match graph.resolved(*reference) {
                Some(r) => Constraint::Set(r.add(offset).normalize()),
                None => Constraint::Relation { reference: *reference, offset: offset.normalize() },
            },
        }
    }

    /// `true` if both constraints normalize to the same value.
    pub fn equivalent(&self, other: &Constraint, graph: &VariableGraph) -> bool {
        self.normalize(graph) == other.normalize(graph)
    }
}

impl From<RealSet> for Constraint {
    fn from(s: RealSet) -> Self {
        Constraint::Set(s)
    }
}

// ── VariableGraph ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, Default)]
struct VariableData {
    name: String,
    constraints: Vec<Constraint>,
    sealed: bool,
    resolved: Option<RealSet>,
}

/// Arena owning a set of mutually constrained variables.
#[derive(Clone, Debug, Default)]
pub struct VariableGraph {
    vars: Vec<VariableData>,
}

impl VariableGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Create a new, unsealed, unconstrained variable.
    pub fn variable(&mut self, name: impl Into<String>) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(VariableData { name: name.into(), ..VariableData::default() });
        id
    }

    pub fn name(&self, var: VarId) -> Option<&str> {
        self.vars.get(var.index()).map(|d| d.name.as_str())
    }

    /// Attach a constraint.
    ///
    /// # Errors
    ///
    /// [`ConstraintError::Sealed`] once the variable is sealed, and
    /// [`ConstraintError::UnknownVariable`] if `var` or a relation's reference
    /// is not part of this graph.
    pub fn constrain(&mut self, var: VarId, c: impl Into<Constraint>) -> ConstraintResult<()> {
        let c = c.into();
        if let Constraint::Relation { reference, .. } = c {
            self.data(reference)?;
        }
        let data = self.data_mut(var)?;
        if data.sealed {
            return Err(ConstraintError::Sealed(var));
        }
        data.constraints.push(c);
        Ok(())
    }

    /// Seal `var`.  Sealing twice is a no-op.
    pub fn ready(&mut self, var: VarId) -> ConstraintResult<()> {
        self.data_mut(var)?.sealed = true;
        Ok(())
    }

    /// Seal every variable in the graph.
    pub fn ready_all(&mut self) {
        for d in &mut self.vars {
            d.sealed = true;
        }
    }

    pub fn is_sealed(&self, var: VarId) -> bool {
        self.vars.get(var.index()).is_some_and(|d| d.sealed)
    }

    pub fn constraints(&self, var: VarId) -> &[Constraint] {
        self.vars.get(var.index()).map(|d| d.constraints.as_slice()).unwrap_or(&[])
    }

    /// The cached domain of `var`, if it has been resolved.
    pub fn resolved(&self, var: VarId) -> Option<RealSet> {
        self.vars.get(var.index()).and_then(|d| d.resolved)
    }

    /// Resolve the domain of `var`, eliminating relation cycles.
    ///
    /// The answer is cached on `var` and on every variable whose domain was
    /// fully determined along the way; later calls are lookups.
    ///
    /// # Errors
    ///
    /// [`ConstraintError::NotSealed`] if `var` or any variable it reaches has
    /// not been sealed.
    pub fn evaluate(&mut self, var: VarId) -> ConstraintResult<RealSet> {
        if let Some(r) = self.data(var)?.resolved {
            return Ok(r);
        }
        let mut trace = Vec::new();
        self.evaluate_impl(var, &mut trace)?;
        // With an empty trace there is nobody to hand a back edge to, so the
        // walk always resolves `var`.
        self.resolved(var).ok_or(ConstraintError::Unresolved(var))
    }

    fn evaluate_impl(
        &mut self,
        var: VarId,
        trace: &mut Vec<VarId>,
    ) -> ConstraintResult<Vec<Constraint>> {
        let data = self.data(var)?;
        if let Some(r) = data.resolved {
            return Ok(vec![Constraint::Set(r)]);
        }
        if !data.sealed {
            return Err(ConstraintError::NotSealed(var));
        }

        let mut pending: VecDeque<Constraint> = data.constraints.iter().copied().collect();
        let mut expanded: Vec<Constraint> = Vec::with_capacity(pending.len());

        trace.push(var);
        while let Some(c) = pending.pop_front() {
            let Constraint::Relation { reference, offset } = c else {
                expanded.push(c);
                continue;
            };
            if reference == var || trace.contains(&reference) {
                expanded.push(c);
            } else if let Some(r) = self.resolved(reference) {
                expanded.push(Constraint::Set(r.add(&offset)));
            } else {
                let inner = self.evaluate_impl(reference, trace)?;
                pending.extend(inner.iter().map(|ic| ic.offset_by(&offset)));
            }
        }
        trace.pop();

        let mut rest = Vec::with_capacity(expanded.len());
        for c in expanded {
            match c {
                Constraint::Relation { reference, offset } if reference == var => {
                    if !offset.contains(0.0) {
                        return Ok(self.resolve(var, RealSet::Empty));
                    }
                }
                other => rest.push(other),
            }
        }

        if rest.iter().all(|c| matches!(c, Constraint::Set(_))) {
            let domain = rest.iter().fold(RealSet::Full, |acc, c| match c {
                Constraint::Set(s) => acc.intersect(s),
                Constraint::Relation { .. } => acc,
            });
            return Ok(self.resolve(var, domain.normalize()));
        }
        Ok(rest)
    }

    fn resolve(&mut self, var: VarId, domain: RealSet) -> Vec<Constraint> {
        if let Some(d) = self.vars.get_mut(var.index()) {
            d.resolved = Some(domain);
        }
        vec![Constraint::Set(domain)]
    }

    fn data(&self, var: VarId) -> ConstraintResult<&VariableData> {
        self.vars.get(var.index()).ok_or(ConstraintError::UnknownVariable(var))
    }

    fn data_mut(&mut self, var: VarId) -> ConstraintResult<&mut VariableData> {
        self.vars.get_mut(var.index()).ok_or(ConstraintError::UnknownVariable(var))
    }
}

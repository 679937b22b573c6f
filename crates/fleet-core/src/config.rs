//! Planner configuration.
//!
//! `PlannerConfig` is passed explicitly to the scheduler; there are no global
//! factories or singletons.  Applications typically load it from a TOML/JSON
//! file (with the `serde` feature) and call [`PlannerConfig::validate`] once.

use crate::{CoreError, CoreResult};

/// Tuning knobs for slot search, arc-time planning, and evasion.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlannerConfig {
    /// Allow motion backwards along a route (`d(arc)/dt ≥ -max_speed`).
    /// Default: `false` (arc length is monotonically non-decreasing).
    pub allow_reverse: bool,

    /// Seconds added past the latest known motion when an open-ended parked
    /// interval has to be checked or represented as an obstacle.
    pub horizon_margin_secs: f64,

    /// Extra clearance (world units) between an evading node and the path it
    /// is getting out of the way of.
    pub evasion_margin: f64,

    /// Maximum number of parked nodes a single job may displace.
    pub max_evasions: usize,

    /// Maximum number of distinct job start times tried per candidate slot.
    pub max_start_candidates: usize,

    /// Maximum number of (node, idle slot) candidates examined per job.
    /// `None` examines every candidate.
    pub max_candidates: Option<usize>,

    /// Number of edges of the polygon used to approximate a disc when static
    /// obstacles are buffered by an agent radius.
    pub buffer_segments: usize,

    /// Penetration depth (world units) below which two shapes are considered
    /// touching rather than colliding during validation.
    pub collision_tolerance: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            allow_reverse:        false,
            horizon_margin_secs:  60.0,
            evasion_margin:       0.1,
            max_evasions:         2,
            max_start_candidates: 16,
            max_candidates:       None,
            buffer_segments:      16,
            collision_tolerance:  1e-6,
        }
    }
}

impl PlannerConfig {
    /// Check the configuration for values the planner cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.horizon_margin_secs.is_finite() && self.horizon_margin_secs >= 0.0) {
            return Err(CoreError::Config(format!(
                "horizon_margin_secs must be finite and >= 0, got {}",
                self.horizon_margin_secs
            )));
        }
        if !(self.evasion_margin.is_finite() && self.evasion_margin >= 0.0) {
            return Err(CoreError::Config(format!(
                "evasion_margin must be finite and >= 0, got {}",
                self.evasion_margin
            )));
        }
        if self.buffer_segments < 3 {
            return Err(CoreError::Config(format!(
                "buffer_segments must be >= 3, got {}",
                self.buffer_segments
            )));
        }
        if self.max_start_candidates == 0 {
            return Err(CoreError::Config("max_start_candidates must be >= 1".into()));
        }
        if !(self.collision_tolerance.is_finite() && self.collision_tolerance >= 0.0) {
            return Err(CoreError::Config(format!(
                "collision_tolerance must be finite and >= 0, got {}",
                self.collision_tolerance
            )));
        }
        Ok(())
    }
}

//! Job requests and committed job assignments.

use fleet_core::JobId;
use fleet_geom::{Point, Polygon};

use crate::{SchedulerError, SchedulerResult};

/// A request to have some node stay inside `region` for `duration` seconds,
/// starting between `earliest_start` and `latest_start`.
#[derive(Clone, Debug, PartialEq)]
pub struct JobSpecification {
    pub id: JobId,
    pub region: Polygon,
    pub earliest_start: f64,
    pub latest_start: f64,
    pub duration: f64,
}

impl JobSpecification {
    pub fn new(
        id: JobId,
        region: Polygon,
        earliest_start: f64,
        latest_start: f64,
        duration: f64,
    ) -> Self {
        Self { id, region, earliest_start, latest_start, duration }
    }

    /// # Errors
    ///
    /// [`SchedulerError::InvalidJob`] for non-finite times, an empty start
    /// window, or a negative duration.
    pub fn validate(&self) -> SchedulerResult<()> {
        let invalid = |msg: String| Err(SchedulerError::InvalidJob(self.id, msg));
        if !(self.earliest_start.is_finite()
            && self.latest_start.is_finite()
            && self.duration.is_finite())
        {
            return invalid("times must be finite".into());
        }
        if self.earliest_start > self.latest_start {
            return invalid(format!(
                "earliest start {} is after latest start {}",
                self.earliest_start, self.latest_start
            ));
        }
        if self.duration < 0.0 {
            return invalid(format!("negative duration {}", self.duration));
        }
        Ok(())
    }
}

/// A job placed on a node's timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct Job {
    pub spec: JobSpecification,
    /// Where inside the region the node's reference point stays.
    pub location: Point,
    pub start: f64,
}

impl Job {
    pub fn id(&self) -> JobId {
        self.spec.id
    }

    pub fn finish(&self) -> f64 {
        self.start + self.spec.duration
    }
}

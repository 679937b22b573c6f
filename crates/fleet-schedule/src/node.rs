//! Nodes and their timelines.
//!
//! # Timeline model
//!
//! A node's timeline is an ordered list of [`Movement`]s (job visits and
//! detours).  Between two movements, and after the last one, the node is
//! parked where the previous movement ended.  Those parked stretches are the
//! node's [`IdleSlot`]s: they are derived from the movements on demand and
//! never stored.
//!
//! ```text
//!  initial ──park── [movement 0] ──park── [movement 1] ──park── … (open)
//!          slot 0                 slot 1                 slot 2
//! ```

use fleet_core::{JobId, NodeId};
use fleet_geom::{Point, Polygon, EPSILON};
use fleet_world::{Trajectory, WorldResult};

use crate::{Job, SchedulerError, SchedulerResult};

// ── NodeSpecification ─────────────────────────────────────────────────────────

/// Everything needed to add a node to the scheduler.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeSpecification {
    pub id: NodeId,
    /// Footprint relative to the node's reference point.
    pub shape: Polygon,
    pub max_speed: f64,
    pub initial_location: Point,
    pub initial_time: f64,
}

impl NodeSpecification {
    pub fn new(
        id: NodeId,
        shape: Polygon,
        max_speed: f64,
        initial_location: Point,
        initial_time: f64,
    ) -> Self {
        Self { id, shape, max_speed, initial_location, initial_time }
    }

    /// Radius of the smallest disc around the reference point covering the
    /// shape.
    pub fn radius(&self) -> f64 {
        self.shape.radius()
    }

    pub fn validate(&self) -> SchedulerResult<()> {
        let invalid = |msg: String| Err(SchedulerError::InvalidNode(self.id, msg));
        if !(self.max_speed.is_finite() && self.max_speed > 0.0) {
            return invalid(format!("max speed must be finite and positive, got {}", self.max_speed));
        }
        if !(self.initial_location.is_finite() && self.initial_time.is_finite()) {
            return invalid("initial placement must be finite".into());
        }
        Ok(())
    }
}

// ── Movement ──────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MovementKind {
    /// Approach, hold, and (inside a bounded slot) return for a job.
    Job(JobId),
    /// Getting out of another node's way.
    Detour,
}

/// One committed motion on a node's timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct Movement {
    pub kind: MovementKind,
    pub trajectory: Trajectory,
}

impl Movement {
    pub fn start_time(&self) -> f64 {
        self.trajectory.start_time()
    }

    pub fn end_time(&self) -> f64 {
        self.trajectory.end_time()
    }

    pub fn start_point(&self) -> Point {
        self.trajectory.start_point()
    }

    pub fn end_point(&self) -> Point {
        self.trajectory.end_point()
    }
}

// ── IdleSlot ──────────────────────────────────────────────────────────────────

/// A stretch of time during which a node is parked and uncommitted.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IdleSlot {
    /// Position a movement filling this slot takes in the movement list.
    pub index: usize,
    pub start_time: f64,
    pub location: Point,
    /// When and where the next movement starts; `None` for the open slot
    /// after the last movement.
    pub end: Option<(f64, Point)>,
}

impl IdleSlot {
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    pub fn end_time(&self) -> Option<f64> {
        self.end.map(|(t, _)| t)
    }

    /// Where the node has to be when the slot ends.
    pub fn end_location(&self) -> Point {
        self.end.map_or(self.location, |(_, p)| p)
    }
}

// ── Node ──────────────────────────────────────────────────────────────────────

/// A mobile agent and its committed timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    spec: NodeSpecification,
    /// Sorted by start time, non-overlapping.
    movements: Vec<Movement>,
    /// Sorted by start time.
    jobs: Vec<Job>,
}

impl Node {
    pub fn new(spec: NodeSpecification) -> Self {
        Self { spec, movements: Vec::new(), jobs: Vec::new() }
    }

    pub fn id(&self) -> NodeId {
        self.spec.id
    }

    pub fn spec(&self) -> &NodeSpecification {
        &self.spec
    }

    pub fn shape(&self) -> &Polygon {
        &self.spec.shape
    }

    pub fn movements(&self) -> &[Movement] {
        &self.movements
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id() == id)
    }

    /// Idle slots in timeline order.  Bounded slots of zero length are
    /// omitted.
    pub fn idle_slots(&self) -> Vec<IdleSlot> {
        let mut slots = Vec::with_capacity(self.movements.len() + 1);
        let mut t = self.spec.initial_time;
        let mut p = self.spec.initial_location;
        for (index, m) in self.movements.iter().enumerate() {
            if m.start_time() - t > EPSILON {
                slots.push(IdleSlot {
                    index,
                    start_time: t,
                    location: p,
                    end: Some((m.start_time(), m.start_point())),
                });
            }
            t = m.end_time();
            p = m.end_point();
        }
        slots.push(IdleSlot { index: self.movements.len(), start_time: t, location: p, end: None });
        slots
    }

    /// Time the last commitment ends (the initial time if there is none).
    pub fn last_event_time(&self) -> f64 {
        self.movements.last().map_or(self.spec.initial_time, Movement::end_time)
    }

    /// Place a movement (and the job it serves) on the timeline.  The caller
    /// guarantees it fits inside one idle slot.
    pub fn insert(&mut self, movement: Movement, job: Option<Job>) {
        let at = self.movements.partition_point(|m| m.start_time() < movement.start_time());
        self.movements.insert(at, movement);
        if let Some(job) = job {
            let at = self.jobs.partition_point(|j| j.start < job.start);
            self.jobs.insert(at, job);
        }
    }

    /// The full motion from the initial placement through the last
    /// commitment, parked in between.
    pub fn trajectory(&self) -> WorldResult<Trajectory> {
        let mut traj = Trajectory::at(self.spec.initial_location, self.spec.initial_time);
        for m in &self.movements {
            traj = traj.concat(&m.trajectory)?;
        }
        Ok(traj)
    }

    /// [`trajectory`](Self::trajectory), parked at the end until `horizon`.
    pub fn trajectory_until(&self, horizon: f64) -> WorldResult<Trajectory> {
        Ok(self.trajectory()?.extended_to(horizon))
    }
}

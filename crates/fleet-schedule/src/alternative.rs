//! Two-phase schedule changes.
//!
//! A [`ScheduleAlternative`] is a copy-on-write overlay of proposed node
//! states on top of a [`Schedule`].  It is checked for collisions, then
//! [`seal`](ScheduleAlternative::seal)ed into an immutable
//! [`SealedAlternative`] that [`Schedule::integrate`] consumes exactly once.

use std::collections::BTreeMap;

use fleet_core::{JobId, NodeId, ObstacleId};
use fleet_world::{trajectories_collide, DynamicObstacle, Trajectory};

use crate::{Node, Schedule, SchedulerResult};

/// Why an alternative cannot be sealed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Conflict {
    Nodes(NodeId, NodeId),
    Obstacle(NodeId, ObstacleId),
}

/// Proposed, uncommitted node states for one job.
#[derive(Clone, Debug)]
pub struct ScheduleAlternative {
    revision: u64,
    job: JobId,
    node: NodeId,
    updated: BTreeMap<NodeId, Node>,
}

impl ScheduleAlternative {
    /// An empty overlay on `base` for placing `job` on `node`.
    pub fn new(base: &Schedule, job: JobId, node: NodeId) -> Self {
        Self { revision: base.revision(), job, node, updated: BTreeMap::new() }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn job(&self) -> JobId {
        self.job
    }

    /// The node the job goes to.
    pub fn job_node(&self) -> NodeId {
        self.node
    }

    /// Replace (or add) a proposed node state.
    pub fn update(&mut self, node: Node) {
        self.updated.insert(node.id(), node);
    }

    pub fn updated(&self) -> impl Iterator<Item = &Node> + '_ {
        self.updated.values()
    }

    /// `id`'s state with this alternative applied.
    pub fn node<'a>(&'a self, base: &'a Schedule, id: NodeId) -> Option<&'a Node> {
        self.updated.get(&id).or_else(|| base.node(id))
    }

    /// Every node of `base` with this alternative applied.
    pub fn view<'a>(&'a self, base: &'a Schedule) -> impl Iterator<Item = &'a Node> + 'a {
        base.nodes().map(move |n| self.updated.get(&n.id()).unwrap_or(n))
    }

    /// First collision between a changed node and anything else, checked
    /// exactly over full trajectories parked until `horizon`.
    pub fn find_conflict(
        &self,
        base: &Schedule,
        obstacles: &[DynamicObstacle],
        horizon: f64,
        tol: f64,
    ) -> SchedulerResult<Option<Conflict>> {
        let others: Vec<(&Node, Trajectory)> = self
            .view(base)
            .map(|n| n.trajectory_until(horizon).map(|t| (n, t)))
            .collect::<Result<_, _>>()?;

        for node in self.updated.values() {
            let traj = node.trajectory_until(horizon)?;
            for (other, other_traj) in &others {
                // Pairs of changed nodes are checked once.
                if other.id() == node.id()
                    || (self.updated.contains_key(&other.id()) && other.id() < node.id())
                {
                    continue;
                }
                if trajectories_collide(node.shape(), &traj, other.shape(), other_traj, tol) {
                    return Ok(Some(Conflict::Nodes(node.id(), other.id())));
                }
            }
            for ob in obstacles {
                if trajectories_collide(node.shape(), &traj, &ob.shape, &ob.trajectory, tol) {
                    return Ok(Some(Conflict::Obstacle(node.id(), ob.id)));
                }
            }
        }
        Ok(None)
    }

    /// Freeze the proposal.
    pub fn seal(self) -> SealedAlternative {
        SealedAlternative {
            revision: self.revision,
            job: self.job,
            node: self.node,
            nodes: self.updated.into_values().collect(),
        }
    }
}

/// An immutable, validated proposal waiting to be committed.
#[derive(Clone, Debug)]
pub struct SealedAlternative {
    revision: u64,
    job: JobId,
    node: NodeId,
    nodes: Vec<Node>,
}

impl SealedAlternative {
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn job(&self) -> JobId {
        self.job
    }

    pub fn job_node(&self) -> NodeId {
        self.node
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    pub(crate) fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }
}

//! The authoritative schedule.

use std::collections::BTreeMap;

use tracing::debug;

use fleet_core::{JobId, NodeId};

use crate::{Map, Node, SealedAlternative, SchedulerError, SchedulerResult};

/// All nodes and their committed timelines.
///
/// Every mutation bumps [`revision`](Self::revision); an alternative built
/// against an older revision can no longer be integrated.
#[derive(Clone, Debug, Default)]
pub struct Schedule {
    nodes: BTreeMap<NodeId, Node>,
    owners: Map<JobId, NodeId>,
    revision: u64,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node a committed job was assigned to.
    pub fn owner_of(&self, job: JobId) -> Option<NodeId> {
        self.owners.get(&job).copied()
    }

    /// Latest time any node has a commitment, or its initial time.
    pub fn last_event_time(&self) -> Option<f64> {
        self.nodes.values().map(Node::last_event_time).reduce(f64::max)
    }

    pub(crate) fn add_node(&mut self, node: Node) -> SchedulerResult<()> {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            return Err(SchedulerError::DuplicateNode(id));
        }
        self.nodes.insert(id, node);
        self.revision += 1;
        Ok(())
    }

    pub(crate) fn remove_node(&mut self, id: NodeId) -> SchedulerResult<Node> {
        let node = self.nodes.remove(&id).ok_or(SchedulerError::UnknownNode(id))?;
        self.owners.retain(|_, owner| *owner != id);
        self.revision += 1;
        Ok(node)
    }

    /// Apply a sealed alternative.  All of its node states replace the
    /// current ones at once, or nothing changes.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::StaleTransaction`] if the schedule changed since the
    /// alternative was built; [`SchedulerError::UnknownNode`] if it names a
    /// node that is not here.
    pub fn integrate(&mut self, sealed: SealedAlternative) -> SchedulerResult<()> {
        if sealed.revision() != self.revision {
            return Err(SchedulerError::StaleTransaction {
                built: sealed.revision(),
                current: self.revision,
            });
        }
        if let Some(missing) = sealed.nodes().iter().find(|n| !self.nodes.contains_key(&n.id())) {
            return Err(SchedulerError::UnknownNode(missing.id()));
        }
        for node in sealed.into_nodes() {
            for job in node.jobs() {
                self.owners.insert(job.id(), node.id());
            }
            self.nodes.insert(node.id(), node);
        }
        self.revision += 1;
        debug!(revision = self.revision, "alternative integrated");
        Ok(())
    }
}

//! The `Scheduler` façade.

use tracing::debug;

use fleet_core::{NodeId, PlannerConfig, TransactionId};
use fleet_motion::PerspectiveCache;
use fleet_world::{trajectories_collide, Trajectory, World};

use crate::planner::TaskPlanner;
use crate::{
    IdleSlot, Job, JobSpecification, Map, Movement, Node, NodeSpecification, Schedule,
    SealedAlternative, SchedulerError, SchedulerResult,
};

// ── ScheduleResult ────────────────────────────────────────────────────────────

/// Outcome of [`Scheduler::schedule`].
///
/// A feasible result carries the transaction to commit (absent when the job
/// was already committed earlier) and the full trajectory of the node that
/// takes the job.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduleResult {
    pub feasible: bool,
    pub transaction: Option<TransactionId>,
    pub node: Option<NodeId>,
    pub trajectory: Option<Trajectory>,
}

impl ScheduleResult {
    pub fn infeasible() -> Self {
        Self { feasible: false, transaction: None, node: None, trajectory: None }
    }
}

// ── NodeReference ─────────────────────────────────────────────────────────────

/// Read access to one node's committed state.
#[derive(Copy, Clone, Debug)]
pub struct NodeReference<'a> {
    node: &'a Node,
}

impl<'a> NodeReference<'a> {
    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    pub fn spec(&self) -> &'a NodeSpecification {
        self.node.spec()
    }

    pub fn jobs(&self) -> &'a [Job] {
        self.node.jobs()
    }

    pub fn movements(&self) -> &'a [Movement] {
        self.node.movements()
    }

    pub fn idle_slots(&self) -> Vec<IdleSlot> {
        self.node.idle_slots()
    }

    /// Committed motion from the initial placement through the last
    /// commitment.
    pub fn calc_trajectory(&self) -> SchedulerResult<Trajectory> {
        Ok(self.node.trajectory()?)
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

struct Pending {
    sealed: SealedAlternative,
    result: ScheduleResult,
}

/// Owns the schedule and processes requests one at a time.
///
/// `schedule` only proposes: the returned transaction changes nothing until
/// it is committed.  Committing succeeds only if nothing else was committed
/// (or no node added or removed) since the proposal was made.
pub struct Scheduler {
    config: PlannerConfig,
    world: World,
    perspectives: PerspectiveCache,
    schedule: Schedule,
    pending: Map<TransactionId, Pending>,
    next_transaction: TransactionId,
}

impl Scheduler {
    /// # Errors
    ///
    /// [`SchedulerError::Core`] if `config` does not validate.
    pub fn new(world: World, config: PlannerConfig) -> SchedulerResult<Self> {
        config.validate()?;
        let perspectives = PerspectiveCache::with_segments(world.clone(), config.buffer_segments);
        Ok(Self {
            config,
            world,
            perspectives,
            schedule: Schedule::new(),
            pending: Map::default(),
            next_transaction: TransactionId(0),
        })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// The committed schedule.
    pub fn committed(&self) -> &Schedule {
        &self.schedule
    }

    pub fn perspectives(&self) -> &PerspectiveCache {
        &self.perspectives
    }

    /// Register a node, parked at its initial location from its initial
    /// time on.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::DuplicateNode`], or [`SchedulerError::InvalidNode`]
    /// for a bad specification or an initial placement that is blocked by a
    /// static obstacle, collides with a committed node, or is swept by a
    /// dynamic obstacle.
    pub fn add_node(&mut self, spec: NodeSpecification) -> SchedulerResult<NodeReference<'_>> {
        spec.validate()?;
        let id = spec.id;
        if self.schedule.node(id).is_some() {
            return Err(SchedulerError::DuplicateNode(id));
        }
        let radius = spec.radius();
        let perspective = self.perspectives.acquire(id, radius);
        let node = Node::new(spec);
        let blocked = if perspective.world().is_free(node.spec().initial_location) {
            self.placement_conflict(&node)
        } else {
            Ok(Some("a static obstacle".to_string()))
        };
        match blocked {
            Ok(None) => {}
            Ok(Some(by)) => {
                self.perspectives.release(id)?;
                return Err(SchedulerError::InvalidNode(
                    id,
                    format!("initial location {} is blocked by {by}", node.spec().initial_location),
                ));
            }
            Err(e) => {
                self.perspectives.release(id)?;
                return Err(e);
            }
        }
        self.schedule.add_node(node)?;
        debug!(node = %id, radius, "node added");
        self.node(id)
    }

    /// What a node parked at its initial placement would collide with.
    fn placement_conflict(&self, node: &Node) -> SchedulerResult<Option<String>> {
        let horizon = self
            .schedule
            .last_event_time()
            .into_iter()
            .chain(self.world.horizon())
            .fold(node.spec().initial_time, f64::max)
            + self.config.horizon_margin_secs;
        let tol = self.config.collision_tolerance;
        let parked = node.trajectory_until(horizon)?;
        for other in self.schedule.nodes() {
            let traj = other.trajectory_until(horizon)?;
            if trajectories_collide(node.shape(), &parked, other.shape(), &traj, tol) {
                return Ok(Some(format!("node {}", other.id())));
            }
        }
        Ok(self
            .world
            .dynamic_obstacles()
            .iter()
            .find(|ob| trajectories_collide(node.shape(), &parked, &ob.shape, &ob.trajectory, tol))
            .map(|ob| format!("obstacle {}", ob.id)))
    }

    /// Drop a node with everything committed to it.  Pending transactions
    /// that touch it are discarded.
    pub fn remove_node(&mut self, id: NodeId) -> SchedulerResult<Node> {
        let node = self.schedule.remove_node(id)?;
        self.perspectives.release(id)?;
        self.pending.retain(|_, p| p.sealed.node(id).is_none());
        debug!(node = %id, "node removed");
        Ok(node)
    }

    pub fn node(&self, id: NodeId) -> SchedulerResult<NodeReference<'_>> {
        self.schedule
            .node(id)
            .map(|node| NodeReference { node })
            .ok_or(SchedulerError::UnknownNode(id))
    }

    /// Find a node and start time for `job` and propose it as a transaction.
    ///
    /// Re-submitting a job that is already committed reports its existing
    /// assignment; re-submitting one that is pending returns the pending
    /// proposal.  Neither inserts it twice.
    pub fn schedule(&mut self, job: JobSpecification) -> SchedulerResult<ScheduleResult> {
        job.validate()?;

        if let Some(owner) = self.schedule.owner_of(job.id) {
            debug!(job = %job.id, node = %owner, "job already committed");
            let trajectory = self.node(owner)?.calc_trajectory()?;
            return Ok(ScheduleResult {
                feasible: true,
                transaction: None,
                node: Some(owner),
                trajectory: Some(trajectory),
            });
        }
        if let Some(p) = self.pending.values().find(|p| p.sealed.job() == job.id) {
            return Ok(p.result.clone());
        }

        let planner =
            TaskPlanner::new(&self.config, &self.world, &self.schedule, &self.perspectives, &job);
        let Some(alt) = planner.plan(&job)? else {
            debug!(job = %job.id, "job infeasible");
            return Ok(ScheduleResult::infeasible());
        };

        let node = alt.job_node();
        let sealed = alt.seal();
        let trajectory = sealed.node(node).ok_or(SchedulerError::UnknownNode(node))?.trajectory()?;
        let tx = self.next_transaction;
        self.next_transaction = tx.next();

        let result = ScheduleResult {
            feasible: true,
            transaction: Some(tx),
            node: Some(node),
            trajectory: Some(trajectory),
        };
        debug!(job = %job.id, node = %node, transaction = %tx, "transaction pending");
        self.pending.insert(tx, Pending { sealed, result: result.clone() });
        Ok(result)
    }

    /// Integrate a pending transaction.  The transaction is consumed even if
    /// it turns out to be stale.
    pub fn commit(&mut self, tx: TransactionId) -> SchedulerResult<()> {
        let pending = self.pending.remove(&tx).ok_or(SchedulerError::UnknownTransaction(tx))?;
        self.schedule.integrate(pending.sealed)?;
        debug!(transaction = %tx, "transaction committed");
        Ok(())
    }

    pub fn discard(&mut self, tx: TransactionId) -> SchedulerResult<()> {
        self.pending.remove(&tx).map(|_| ()).ok_or(SchedulerError::UnknownTransaction(tx))
    }

    /// Pending transaction ids, ascending.
    pub fn pending(&self) -> Vec<TransactionId> {
        let mut ids: Vec<TransactionId> = self.pending.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn pending_result(&self, tx: TransactionId) -> Option<&ScheduleResult> {
        self.pending.get(&tx).map(|p| &p.result)
    }
}

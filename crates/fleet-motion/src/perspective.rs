//! Per-radius views of the static world.
//!
//! Reducing a finite agent to a point means growing every static obstacle by
//! the agent's radius and rebuilding the visibility graph over the result.
//! Both are expensive and identical for agents of equal radius, so they are
//! built once per distinct radius and shared.  A perspective lives as long as
//! at least one node holds it.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tracing::debug;

use fleet_core::NodeId;
use fleet_geom::DEFAULT_BUFFER_SEGMENTS;
use fleet_world::World;

use crate::{MotionError, MotionResult, VisibilityGraphPlanner};

/// How many released identities are remembered for the repeated-release
/// check.  Older ones are forgotten first.
pub const RELEASE_HISTORY: usize = 1024;

/// The world as seen by an agent of one radius.
pub struct Perspective {
    radius: f64,
    world: Arc<World>,
    planner: VisibilityGraphPlanner,
}

impl Perspective {
    pub fn new(base: &World, radius: f64, segments: usize) -> Self {
        let world = Arc::new(base.buffer_with(radius, segments));
        let planner = VisibilityGraphPlanner::new(Arc::clone(&world));
        Self { radius, world, planner }
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Static obstacles grown by [`radius`](Self::radius).
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn planner(&self) -> &VisibilityGraphPlanner {
        &self.planner
    }
}

struct Entry {
    perspective: Arc<Perspective>,
    holders: BTreeSet<NodeId>,
}

/// Reference-counted cache of [`Perspective`]s keyed by radius.
pub struct PerspectiveCache {
    base: World,
    segments: usize,
    /// Keyed by the bit pattern of the radius.
    entries: HashMap<u64, Entry>,
    owners: HashMap<NodeId, u64>,
    /// Recently released identities, oldest first; `released` mirrors
    /// `release_order` for lookups.
    released: HashSet<NodeId>,
    release_order: VecDeque<NodeId>,
}

impl PerspectiveCache {
    pub fn new(base: World) -> Self {
        Self::with_segments(base, DEFAULT_BUFFER_SEGMENTS)
    }

    /// `segments` is the arc resolution used when growing obstacles.
    pub fn with_segments(base: World, segments: usize) -> Self {
        Self {
            base,
            segments,
            entries: HashMap::new(),
            owners: HashMap::new(),
            released: HashSet::new(),
            release_order: VecDeque::new(),
        }
    }

    pub fn base(&self) -> &World {
        &self.base
    }

    /// The perspective for `radius`, building it on first use, and record
    /// `node` as a holder.  A node holds at most one perspective; acquiring a
    /// different radius drops the previous one.
    pub fn acquire(&mut self, node: NodeId, radius: f64) -> Arc<Perspective> {
        let key = radius_key(radius);
        if let Some(old) = self.owners.get(&node).copied() {
            if old != key {
                self.drop_holder(node, old);
            }
        }
        if self.released.remove(&node) {
            self.release_order.retain(|&n| n != node);
        }
        self.owners.insert(node, key);

        let (base, segments) = (&self.base, self.segments);
        let entry = self.entries.entry(key).or_insert_with(|| {
            debug!(radius, "building perspective");
            Entry {
                perspective: Arc::new(Perspective::new(base, radius, segments)),
                holders: BTreeSet::new(),
            }
        });
        entry.holders.insert(node);
        Arc::clone(&entry.perspective)
    }

    /// The perspective `node` currently holds.
    pub fn get(&self, node: NodeId) -> Option<Arc<Perspective>> {
        let key = self.owners.get(&node)?;
        self.entries.get(key).map(|e| Arc::clone(&e.perspective))
    }

    /// Drop `node`'s hold.  The perspective is discarded with its last
    /// holder.  Releasing twice is a no-op as long as `node` is among the
    /// last [`RELEASE_HISTORY`] released identities.
    ///
    /// # Errors
    ///
    /// [`MotionError::UnknownNode`] if `node` holds no perspective and was
    /// not released recently.
    pub fn release(&mut self, node: NodeId) -> MotionResult<()> {
        match self.owners.remove(&node) {
            Some(key) => {
                self.drop_holder(node, key);
                self.remember_release(node);
                Ok(())
            }
            None if self.released.contains(&node) => Ok(()),
            None => Err(MotionError::UnknownNode(node)),
        }
    }

    fn remember_release(&mut self, node: NodeId) {
        if self.release_order.len() == RELEASE_HISTORY {
            if let Some(oldest) = self.release_order.pop_front() {
                self.released.remove(&oldest);
            }
        }
        self.released.insert(node);
        self.release_order.push_back(node);
    }

    fn drop_holder(&mut self, node: NodeId, key: u64) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.holders.remove(&node);
            if entry.holders.is_empty() {
                debug!(radius = entry.perspective.radius, "dropping perspective");
                self.entries.remove(&key);
            }
        }
    }

    /// Number of live perspectives.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of nodes holding the perspective for `radius`.
    pub fn holders(&self, radius: f64) -> usize {
        self.entries.get(&radius_key(radius)).map_or(0, |e| e.holders.len())
    }
}

fn radius_key(radius: f64) -> u64 {
    // Fold -0.0 into 0.0.
    (radius + 0.0).to_bits()
}

//! The immutable world value and its builder.
//!
//! # Spatial index
//!
//! Static obstacle envelopes are bulk-loaded into an R-tree (`rstar`) when
//! the world is built, so point and segment queries only test the polygons
//! whose boxes they touch.  Dynamic obstacles are few and time-dependent and
//! are kept in a plain list.

use rstar::{RTree, RTreeObject, AABB};

use fleet_core::ObstacleId;
use fleet_geom::{EPSILON, Envelope, Geometry, MultiPolygon, Point, Polygon};

use crate::{DynamicObstacle, StaticObstacle, Trajectory};

// ── R-tree entry ──────────────────────────────────────────────────────────────

/// Envelope of one static obstacle, tagged with its position in
/// `World::statics`.
#[derive(Clone, Debug)]
struct ObstacleEntry {
    envelope: AABB<[f64; 2]>,
    slot: usize,
}

impl RTreeObject for ObstacleEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn build_index(statics: &[StaticObstacle]) -> RTree<ObstacleEntry> {
    let entries: Vec<ObstacleEntry> = statics
        .iter()
        .enumerate()
        .map(|(slot, o)| ObstacleEntry { envelope: o.shape.envelope().to_aabb(), slot })
        .collect();
    RTree::bulk_load(entries)
}

// ── World ─────────────────────────────────────────────────────────────────────

/// Static and dynamic obstacles.  Every "modifier" returns a new `World`.
#[derive(Clone, Debug)]
pub struct World {
    statics: Vec<StaticObstacle>,
    dynamics: Vec<DynamicObstacle>,
    index: RTree<ObstacleEntry>,
}

impl Default for World {
    fn default() -> Self {
        World::empty()
    }
}

impl World {
    pub fn empty() -> Self {
        WorldBuilder::new().build()
    }

    pub fn builder() -> WorldBuilder {
        WorldBuilder::new()
    }

    pub fn static_obstacles(&self) -> &[StaticObstacle] {
        &self.statics
    }

    pub fn dynamic_obstacles(&self) -> &[DynamicObstacle] {
        &self.dynamics
    }

    /// Static obstacles grown by `radius` with the default disc
    /// approximation.  Dynamic obstacles are unchanged.
    pub fn buffer(&self, radius: f64) -> World {
        self.map_statics(|shape| shape.buffer(radius))
    }

    pub fn buffer_with(&self, radius: f64, segments: usize) -> World {
        self.map_statics(|shape| shape.buffer_by(radius, segments))
    }

    fn map_statics(&self, f: impl Fn(&MultiPolygon) -> MultiPolygon) -> World {
        let statics: Vec<StaticObstacle> = self
            .statics
            .iter()
            .map(|o| StaticObstacle { id: o.id, shape: f(&o.shape) })
            .collect();
        let index = build_index(&statics);
        World { statics, dynamics: self.dynamics.clone(), index }
    }

    /// Same statics, dynamic obstacles replaced by `dynamics`.
    pub fn with_dynamic_obstacles(
        &self,
        dynamics: impl IntoIterator<Item = DynamicObstacle>,
    ) -> World {
        World {
            statics: self.statics.clone(),
            dynamics: dynamics.into_iter().collect(),
            index: self.index.clone(),
        }
    }

    /// Static obstacles whose envelope touches `env`.
    pub fn statics_near(&self, env: &Envelope) -> impl Iterator<Item = &StaticObstacle> + '_ {
        self.index
            .locate_in_envelope_intersecting(&env.to_aabb())
            .map(move |e| &self.statics[e.slot])
    }

    /// `true` unless `p` lies strictly inside a static obstacle.  Boundaries
    /// are free.
    pub fn is_free(&self, p: Point) -> bool {
        let env = Envelope { min: p, max: p };
        self.statics_near(&env).all(|o| !o.shape.contains_point_strict(p, EPSILON))
    }

    /// `true` unless the segment passes through the interior of a static
    /// obstacle.  Sliding along an edge or touching a vertex is allowed.
    pub fn segment_is_free(&self, a: Point, b: Point) -> bool {
        let env = Envelope::of_segment(a, b);
        self.statics_near(&env).all(|o| !o.shape.segment_crosses_interior(a, b, EPSILON))
    }

    /// `true` if `region` touches a static obstacle.
    pub fn touches_statics(&self, region: &Polygon) -> bool {
        self.statics_near(&region.envelope()).any(|o| o.shape.intersects(region))
    }

    /// Latest time any dynamic obstacle is defined, if there are any.
    pub fn horizon(&self) -> Option<f64> {
        self.dynamics.iter().map(|d| d.span().1).reduce(f64::max)
    }
}

// ── WorldBuilder ──────────────────────────────────────────────────────────────

/// Incremental construction of a [`World`].  Obstacle IDs are handed out in
/// insertion order unless given explicitly.
#[derive(Default)]
pub struct WorldBuilder {
    statics: Vec<StaticObstacle>,
    dynamics: Vec<DynamicObstacle>,
    next_id: u32,
}

impl WorldBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn claim(&mut self, id: ObstacleId) -> ObstacleId {
        self.next_id = self.next_id.max(id.next().0);
        id
    }

    /// A convex polygon, or a concave obstacle given as a [`MultiPolygon`]
    /// of convex parts.
    pub fn add_static(&mut self, shape: impl Into<MultiPolygon>) -> ObstacleId {
        let id = self.claim(ObstacleId(self.next_id));
        self.statics.push(StaticObstacle { id, shape: shape.into() });
        id
    }

    /// Adding again under an existing ID merges the shapes.
    pub fn add_static_with_id(
        &mut self,
        id: ObstacleId,
        shape: impl Into<MultiPolygon>,
    ) -> &mut Self {
        let id = self.claim(id);
        let shape = shape.into();
        match self.statics.iter_mut().find(|o| o.id == id) {
            Some(existing) => existing.shape = existing.shape.union(&shape),
            None => self.statics.push(StaticObstacle { id, shape }),
        }
        self
    }

    pub fn add_dynamic(&mut self, shape: Polygon, trajectory: Trajectory) -> ObstacleId {
        let id = self.claim(ObstacleId(self.next_id));
        self.dynamics.push(DynamicObstacle::new(id, shape, trajectory));
        id
    }

    pub fn add_dynamic_with_id(
        &mut self,
        id: ObstacleId,
        shape: Polygon,
        trajectory: Trajectory,
    ) -> &mut Self {
        let id = self.claim(id);
        self.dynamics.push(DynamicObstacle::new(id, shape, trajectory));
        self
    }

    pub fn static_count(&self) -> usize {
        self.statics.len()
    }

    pub fn dynamic_count(&self) -> usize {
        self.dynamics.len()
    }

    /// Freeze into an immutable [`World`], bulk-loading the R-tree.
    pub fn build(self) -> World {
        let index = build_index(&self.statics);
        World { statics: self.statics, dynamics: self.dynamics, index }
    }
}

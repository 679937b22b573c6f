//! Speed-bounded search on the arc-time plane.
//!
//! # Mesh
//!
//! Vertices are the start `(0, t_start)`, every corner of every forbidden
//! piece inside the window `[0, L] × [t_start, t_max]` that is not itself
//! forbidden, and the goal.  An edge `a → b` is admissible iff it moves
//! forward in time, respects the speed bound, and does not collide with any
//! piece.  Edges are generated lazily when a vertex is settled; candidate
//! pieces come from an R-tree over piece envelopes.
//!
//! # Search
//!
//! Every vertex has a fixed time coordinate, so ordering the frontier by
//! time settles vertices in the order they can be reached.  The goal is a
//! virtual vertex: from each settled vertex the planner tries to finish
//! directly (at full speed for [`Goal::EarliestFinish`], or arriving exactly
//! at the deadline for [`Goal::FixedFinish`], possibly waiting at either
//! end), and the first goal entry popped from the heap is the earliest
//! finish.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rstar::{RTree, RTreeObject, AABB};
use tracing::trace;

use fleet_geom::{Envelope, Point, Polygon, EPSILON};
use fleet_world::{DynamicObstacle, Trajectory};

use crate::cost::Cost;
use crate::{ForbiddenRegion, ForbiddenRegionBuilder, MotionError, MotionResult, SpatialPath};

/// What the search must achieve at the end of the route.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Goal {
    /// Arrive at the end of the route exactly at this time.
    FixedFinish(f64),
    /// Arrive as early as possible, but no later than `latest`.
    EarliestFinish { latest: f64 },
}

impl Goal {
    fn deadline(&self) -> f64 {
        match *self {
            Goal::FixedFinish(t) => t,
            Goal::EarliestFinish { latest } => latest,
        }
    }
}

// ── ArcTimePath ───────────────────────────────────────────────────────────────

/// A feasible motion along a route: arc-time samples (`x = s`, `y = t`)
/// with strictly increasing time, linear in between.
#[derive(Clone, Debug, PartialEq)]
pub struct ArcTimePath {
    samples: Vec<Point>,
}

impl ArcTimePath {
    pub fn samples(&self) -> &[Point] {
        &self.samples
    }

    pub fn start_time(&self) -> f64 {
        self.samples[0].y
    }

    pub fn finish_time(&self) -> f64 {
        self.samples[self.samples.len() - 1].y
    }

    /// Map the motion back into the workspace.  A sample is inserted
    /// wherever the motion passes a bend of `path`, so the result is exact.
    pub fn to_trajectory(&self, path: &SpatialPath) -> MotionResult<Trajectory> {
        let first = self.samples[0];
        let mut traj = Trajectory::at(path.point_at(first.x), first.y);
        for w in self.samples.windows(2) {
            let (a, b) = (w[0], w[1]);
            let (lo, hi) = (a.x.min(b.x), a.x.max(b.x));
            let mut bends: Vec<f64> = path
                .arcs()
                .iter()
                .copied()
                .filter(|&s| s > lo + EPSILON && s < hi - EPSILON)
                .collect();
            if b.x < a.x {
                bends.reverse();
            }
            for s in bends {
                let t = a.y + (s - a.x) / (b.x - a.x) * (b.y - a.y);
                traj.append(path.point_at(s), t)?;
            }
            traj.append(path.point_at(b.x), b.y)?;
        }
        Ok(traj)
    }
}

// ── R-tree entry ──────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct PieceEntry {
    envelope: AABB<[f64; 2]>,
    region: usize,
    piece: usize,
}

impl RTreeObject for PieceEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

// ── ArcTimePlanner ────────────────────────────────────────────────────────────

/// Timing search along one fixed route against a set of moving obstacles.
pub struct ArcTimePlanner {
    path: SpatialPath,
    max_speed: f64,
    allow_reverse: bool,
    regions: Vec<ForbiddenRegion>,
    index: RTree<PieceEntry>,
}

impl ArcTimePlanner {
    /// Build the forbidden regions of `obstacles` along `path` for an agent
    /// of shape `agent` (a point if `None`).
    ///
    /// # Errors
    ///
    /// [`MotionError::InvalidSpeed`] unless `max_speed` is finite and
    /// positive.
    pub fn new(
        path: SpatialPath,
        agent: Option<&Polygon>,
        obstacles: &[DynamicObstacle],
        max_speed: f64,
    ) -> MotionResult<ArcTimePlanner> {
        if !(max_speed.is_finite() && max_speed > 0.0) {
            return Err(MotionError::InvalidSpeed(max_speed));
        }
        let mut builder = ForbiddenRegionBuilder::new(&path);
        if let Some(shape) = agent {
            builder = builder.with_agent_shape(shape);
        }
        let regions = builder.build_all(obstacles);

        let entries: Vec<PieceEntry> = regions
            .iter()
            .enumerate()
            .flat_map(|(r, region)| {
                region.pieces.iter().enumerate().map(move |(p, piece)| PieceEntry {
                    envelope: piece.envelope().to_aabb(),
                    region: r,
                    piece: p,
                })
            })
            .collect();
        trace!(
            obstacles = obstacles.len(),
            pieces = entries.len(),
            route_length = path.length(),
            "forbidden regions built"
        );
        let index = RTree::bulk_load(entries);

        Ok(ArcTimePlanner { path, max_speed, allow_reverse: false, regions, index })
    }

    /// Permit motion backwards along the route (`ds/dt ≥ −v_max`).
    pub fn allow_reverse(mut self, allow: bool) -> Self {
        self.allow_reverse = allow;
        self
    }

    pub fn path(&self) -> &SpatialPath {
        &self.path
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    pub fn regions(&self) -> &[ForbiddenRegion] {
        &self.regions
    }

    fn pieces_near(&self, env: &Envelope) -> impl Iterator<Item = &crate::RegionPiece> + '_ {
        self.index
            .locate_in_envelope_intersecting(&env.to_aabb())
            .map(move |e| &self.regions[e.region].pieces[e.piece])
    }

    /// `true` unless occupying arc-time point `p` collides.
    pub fn is_free(&self, p: Point) -> bool {
        let env = Envelope { min: p, max: p };
        self.pieces_near(&env).all(|piece| !piece.forbids(p))
    }

    /// `true` unless the straight arc-time motion `a → b` collides.  Speed
    /// and direction are not checked here.
    pub fn segment_is_free(&self, a: Point, b: Point) -> bool {
        self.pieces_near(&Envelope::of_segment(a, b)).all(|piece| !piece.blocks(a, b))
    }

    fn admissible(&self, a: Point, b: Point) -> bool {
        let dt = b.y - a.y;
        let ds = b.x - a.x;
        if dt <= EPSILON {
            return false;
        }
        if !self.allow_reverse && ds < -EPSILON {
            return false;
        }
        if ds.abs() > self.max_speed * dt + EPSILON {
            return false;
        }
        self.segment_is_free(a, b)
    }

    /// Search for a motion from arc 0 at `start_time` to the end of the route
    /// satisfying `goal`.  `None` means no such motion exists in the mesh.
    pub fn plan(&self, start_time: f64, goal: Goal) -> Option<ArcTimePath> {
        let t_max = goal.deadline();
        if !(start_time.is_finite() && t_max >= start_time - EPSILON) {
            return None;
        }
        let start = Point::new(0.0, start_time);
        if !self.is_free(start) {
            trace!(start_time, "start point is forbidden");
            return None;
        }
        if self.path.is_stationary() {
            return self.plan_in_place(start, goal);
        }

        let vertices = self.mesh_vertices(start_time, t_max);
        let m = vertices.len();
        // 0 = start, 1..=m = corners, m + 1 = goal.
        let goal_node = m + 1;
        let point = |v: usize| if v == 0 { start } else { vertices[v - 1] };

        let mut reached = vec![false; m + 1];
        let mut settled = vec![false; m + 1];
        let mut prev = vec![usize::MAX; m + 1];
        let mut best: Option<(f64, usize, Vec<Point>)> = None;
        reached[0] = true;

        // Min-heap: (time, vertex).  Reverse makes BinaryHeap (max) behave as
        // min-heap.
        let mut heap: BinaryHeap<Reverse<(Cost, usize)>> = BinaryHeap::new();
        heap.push(Reverse((Cost(start_time), 0)));

        while let Some(Reverse((_, v))) = heap.pop() {
            if v == goal_node {
                let (_, last, tail) = best?;
                let mut chain = vec![];
                let mut cur = last;
                while cur != usize::MAX {
                    chain.push(point(cur));
                    cur = prev[cur];
                }
                chain.reverse();
                chain.extend(tail);
                trace!(vertices = m, finish = chain[chain.len() - 1].y, "arc-time path found");
                return Some(ArcTimePath { samples: chain });
            }
            if settled[v] {
                continue;
            }
            settled[v] = true;
            let pv = point(v);

            if let Some(tail) = self.finish_from(pv, goal) {
                let finish = tail.last().map_or(pv.y, |q| q.y);
                if best.as_ref().is_none_or(|(f, _, _)| finish < *f) {
                    best = Some((finish, v, tail));
                    heap.push(Reverse((Cost(finish), goal_node)));
                }
            }

            for w in 1..=m {
                if reached[w] {
                    continue;
                }
                let pw = vertices[w - 1];
                if pw.y > pv.y && self.admissible(pv, pw) {
                    reached[w] = true;
                    prev[w] = v;
                    heap.push(Reverse((Cost(pw.y), w)));
                }
            }
        }

        trace!(vertices = m, "arc-time search exhausted");
        None
    }

    /// Free piece corners strictly after `start_time` and no later than
    /// `t_max`, ordered by time.
    fn mesh_vertices(&self, start_time: f64, t_max: f64) -> Vec<Point> {
        let l = self.path.length();
        let mut vertices: Vec<Point> = self
            .regions
            .iter()
            .flat_map(|r| r.pieces.iter())
            .flat_map(|piece| piece.vertices().iter().copied())
            .filter(|p| {
                p.y > start_time + EPSILON
                    && p.y <= t_max + EPSILON
                    && p.x >= -EPSILON
                    && p.x <= l + EPSILON
            })
            .collect();
        vertices.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));
        vertices.dedup_by(|a, b| a.approx_eq(*b, EPSILON));
        vertices.retain(|&p| self.is_free(p));
        vertices
    }

    /// Ways to reach the goal from `pv`, as the samples after `pv`.
    fn finish_from(&self, pv: Point, goal: Goal) -> Option<Vec<Point>> {
        let l = self.path.length();
        let ds = l - pv.x;
        if ds < -EPSILON && !self.allow_reverse {
            return None;
        }
        let travel = ds.abs() / self.max_speed;

        match goal {
            Goal::EarliestFinish { latest } => {
                if ds.abs() <= EPSILON {
                    return Some(vec![]);
                }
                let q = Point::new(l, pv.y + travel);
                (q.y <= latest + EPSILON && self.segment_is_free(pv, q)).then(|| vec![q])
            }
            Goal::FixedFinish(tf) => {
                let q = Point::new(l, tf);
                if tf < pv.y + travel - EPSILON {
                    return None;
                }
                if ds.abs() <= EPSILON && tf - pv.y <= EPSILON {
                    return Some(vec![]);
                }
                // Wait in place, then leave just in time.
                let late = Point::new(pv.x, tf - travel);
                if late.y - pv.y > EPSILON
                    && self.segment_is_free(pv, late)
                    && self.segment_is_free(late, q)
                {
                    return Some(vec![late, q]);
                }
                if self.segment_is_free(pv, q) {
                    return Some(vec![q]);
                }
                // Arrive early and wait at the end.
                let early = Point::new(l, pv.y + travel);
                if tf - early.y > EPSILON
                    && self.segment_is_free(pv, early)
                    && self.segment_is_free(early, q)
                {
                    return Some(vec![early, q]);
                }
                None
            }
        }
    }

    fn plan_in_place(&self, start: Point, goal: Goal) -> Option<ArcTimePath> {
        match goal {
            Goal::EarliestFinish { .. } => Some(ArcTimePath { samples: vec![start] }),
            Goal::FixedFinish(tf) => {
                if tf - start.y <= EPSILON {
                    return Some(ArcTimePath { samples: vec![start] });
                }
                let q = Point::new(0.0, tf);
                self.segment_is_free(start, q)
                    .then(|| ArcTimePath { samples: vec![start, q] })
            }
        }
    }
}

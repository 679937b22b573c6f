//! Spatial pathfinding trait and default visibility-graph implementation.
//!
//! # Pluggability
//!
//! The scheduler routes through the [`SpatialPlanner`] trait, so a
//! roadmap, grid or sampling planner can replace the default
//! [`VisibilityGraphPlanner`] without touching the arc-time or scheduling
//! code.
//!
//! # Point agents
//!
//! Planners work on a world whose static obstacles have already been
//! buffered by the agent radius (see [`PerspectiveCache`](crate::PerspectiveCache)),
//! so the agent is a point and a route is free iff none of its segments
//! enters an obstacle interior.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

use fleet_geom::Point;
use fleet_world::World;

use crate::cost::Cost;
use crate::{MotionError, MotionResult, SpatialPath};

// ── SpatialPlanner trait ──────────────────────────────────────────────────────

/// Pluggable spatial pathfinder.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync` so perspectives can be shared
/// between threads.
pub trait SpatialPlanner: Send + Sync {
    /// A collision-free route from `from` to `to` for a point agent.
    ///
    /// `from == to` yields a stationary path rather than an error.
    fn plan(&self, from: Point, to: Point) -> MotionResult<SpatialPath>;
}

// ── VisibilityGraphPlanner ────────────────────────────────────────────────────

/// Shortest paths over the visibility graph of the static obstacle vertices.
///
/// The vertex-to-vertex visibility is computed once at construction; a query
/// only adds edges from the two endpoints and runs Dijkstra.  Routes are
/// shortest among paths bending at obstacle corners.
pub struct VisibilityGraphPlanner {
    world: Arc<World>,
    vertices: Vec<Point>,
    /// `adjacency[i]` lists `(j, length)` for every vertex visible from `i`.
    adjacency: Vec<Vec<(usize, f64)>>,
}

impl VisibilityGraphPlanner {
    pub fn new(world: Arc<World>) -> Self {
        let vertices: Vec<Point> = world
            .static_obstacles()
            .iter()
            .flat_map(|o| o.shape.vertices())
            .filter(|&v| world.is_free(v))
            .collect();

        let n = vertices.len();
        let mut adjacency = vec![Vec::new(); n];
        for i in 0..n {
            for j in (i + 1)..n {
                if world.segment_is_free(vertices[i], vertices[j]) {
                    let d = vertices[i].distance(vertices[j]);
                    adjacency[i].push((j, d));
                    adjacency[j].push((i, d));
                }
            }
        }
        Self { world, vertices, adjacency }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }
}

impl SpatialPlanner for VisibilityGraphPlanner {
    fn plan(&self, from: Point, to: Point) -> MotionResult<SpatialPath> {
        for p in [from, to] {
            if !self.world.is_free(p) {
                return Err(MotionError::BlockedEndpoint(p));
            }
        }
        if self.world.segment_is_free(from, to) {
            return Ok(SpatialPath::straight(from, to));
        }
        dijkstra(self, from, to)
    }
}

// ── Dijkstra internals ────────────────────────────────────────────────────────

fn dijkstra(g: &VisibilityGraphPlanner, from: Point, to: Point) -> MotionResult<SpatialPath> {
    let n = g.vertices.len();
    // Graph vertices 0..n, then the query endpoints.
    let (src, dst) = (n, n + 1);
    let position = |v: usize| match v {
        v if v == src => from,
        v if v == dst => to,
        v => g.vertices[v],
    };

    let mut dist = vec![f64::INFINITY; n + 2];
    let mut prev = vec![usize::MAX; n + 2];
    dist[src] = 0.0;

    // Endpoint visibility, computed once per query.
    let from_edges: Vec<(usize, f64)> = (0..n)
        .filter(|&j| g.world.segment_is_free(from, g.vertices[j]))
        .map(|j| (j, from.distance(g.vertices[j])))
        .collect();
    let sees_goal: Vec<bool> =
        (0..n).map(|j| g.world.segment_is_free(g.vertices[j], to)).collect();

    // Min-heap: (cost, vertex).  Reverse makes BinaryHeap (max) behave as
    // min-heap; the vertex index breaks ties deterministically.
    let mut heap: BinaryHeap<Reverse<(Cost, usize)>> = BinaryHeap::new();
    heap.push(Reverse((Cost(0.0), src)));

    while let Some(Reverse((Cost(cost), v))) = heap.pop() {
        if v == dst {
            return Ok(reconstruct(&prev, dst, position));
        }
        // Skip stale heap entries.
        if cost > dist[v] {
            continue;
        }

        let edges: &[(usize, f64)] = if v == src { &from_edges } else { &g.adjacency[v] };
        let goal_edge = (v != src && sees_goal[v]).then(|| (dst, g.vertices[v].distance(to)));

        for &(w, len) in edges.iter().chain(goal_edge.iter()) {
            let next = cost + len;
            if next < dist[w] {
                dist[w] = next;
                prev[w] = v;
                heap.push(Reverse((Cost(next), w)));
            }
        }
    }

    Err(MotionError::NoRoute { from, to })
}

fn reconstruct(prev: &[usize], dst: usize, position: impl Fn(usize) -> Point) -> SpatialPath {
    let mut points = vec![position(dst)];
    let mut cur = dst;
    while prev[cur] != usize::MAX {
        cur = prev[cur];
        points.push(position(cur));
    }
    points.reverse();
    SpatialPath::new(points).unwrap_or_else(|_| SpatialPath::stationary(position(dst)))
}

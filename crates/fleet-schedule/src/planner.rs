//! Slot search, visit planning, and evasion.
//!
//! # Slot search
//!
//! Every (node, idle slot) pair is a candidate.  For each, the job's
//! arrival `A`, start `S`, and finish `F` are linked in a small constraint
//! graph:
//!
//! ```text
//! A ∈ [slot start + τ_in, ∞)          ∩ (S + (−∞, 0])
//! S ∈ [earliest start, latest start]  ∩ (A + [0, ∞))  ∩ (F − d)
//! F ∈ (−∞, slot end − τ_out]          ∩ (S + d)
//! ```
//!
//! where `τ_in` and `τ_out` are straight-line travel lower bounds.  Pairs
//! whose start domain resolves empty are dropped; the rest are tried in
//! order of their earliest possible start, then distance, then node id, then
//! slot position.
//!
//! # Visits
//!
//! A visit is approach → hold for the job's duration → (inside a bounded
//! slot) return to where the slot ends, each leg timed on the arc-time plane
//! against everything the other nodes and the world occupy.
//!
//! # Evasion
//!
//! Parked nodes are obstacles that can move.  When no visit works, the job is
//! re-planned ignoring parked holds, and every node whose hold the new motion
//! hits is sent on a detour to a nearby free spot and, for a bounded slot,
//! back again.  Every resulting alternative is checked with the exact
//! collision test before it is handed out.

use std::sync::Arc;

use tracing::{debug, trace};

use fleet_constraint::{Constraint, RealSet, VariableGraph};
use fleet_core::{NodeId, ObstacleId, PlannerConfig};
use fleet_geom::{distance_to_polyline, Point, Polygon, EPSILON};
use fleet_motion::{
    forbidden_intervals_at, ArcTimePlanner, Goal, MotionError, Perspective, PerspectiveCache,
    SpatialPath, SpatialPlanner,
};
use fleet_world::{trajectories_collide, DynamicObstacle, Trajectory, World};

use crate::{
    IdleSlot, Job, JobSpecification, Movement, MovementKind, Node, Schedule,
    ScheduleAlternative, SchedulerError, SchedulerResult,
};

/// Subdivisions per edge and per ring when searching a job region for a
/// free point.
const REGION_SAMPLE_STEPS: usize = 8;

/// One (node, idle slot) pairing worth trying.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Candidate {
    pub node: NodeId,
    pub slot: IdleSlot,
    /// Where inside the job region the node would stay.
    pub location: Point,
    /// Resolved bounds of the job start.
    pub window: (f64, f64),
    /// Straight-line distance from the slot location to `location`.
    pub distance: f64,
}

/// Space-time another node (or the world) occupies.
struct Occupancy {
    owner: Option<NodeId>,
    /// Set when this is a node parked during an idle slot.
    parked: Option<IdleSlot>,
    obstacle: DynamicObstacle,
}

/// Plans one job against a fixed schedule snapshot.
pub struct TaskPlanner<'a> {
    config: &'a PlannerConfig,
    world: &'a World,
    schedule: &'a Schedule,
    perspectives: &'a PerspectiveCache,
    horizon: f64,
}

impl<'a> TaskPlanner<'a> {
    pub fn new(
        config: &'a PlannerConfig,
        world: &'a World,
        schedule: &'a Schedule,
        perspectives: &'a PerspectiveCache,
        job: &JobSpecification,
    ) -> Self {
        let latest = [
            schedule.last_event_time(),
            world.horizon(),
            Some(job.latest_start + job.duration),
        ]
        .into_iter()
        .flatten()
        .fold(f64::NEG_INFINITY, f64::max);
        let horizon = latest + config.horizon_margin_secs;
        Self { config, world, schedule, perspectives, horizon }
    }

    /// Time until which open-ended parking is represented.
    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    /// Place `job` on some node, or `None` if no candidate works.
    pub fn plan(&self, job: &JobSpecification) -> SchedulerResult<Option<ScheduleAlternative>> {
        let mut candidates = self.candidates(job)?;
        if let Some(max) = self.config.max_candidates {
            candidates.truncate(max);
        }
        debug!(job = %job.id, candidates = candidates.len(), "slot search");
        for c in &candidates {
            if let Some(alt) = self.try_candidate(job, c)? {
                debug!(job = %job.id, node = %c.node, slot = c.slot.index, "job placed");
                return Ok(Some(alt));
            }
        }
        Ok(None)
    }

    /// All candidates with a non-empty start window, best first.
    pub fn candidates(&self, job: &JobSpecification) -> SchedulerResult<Vec<Candidate>> {
        let mut out = Vec::new();
        for node in self.schedule.nodes() {
            let perspective = self.perspective(node.id())?;
            let vmax = node.spec().max_speed;
            for slot in node.idle_slots() {
                let Some(location) = pick_location(&job.region, slot.location, perspective.world())
                else {
                    trace!(node = %node.id(), "no free point in job region");
                    continue;
                };
                let distance = slot.location.distance(location);
                let tau_in = distance / vmax;
                let tau_out = slot.end.map(|(_, p)| location.distance(p) / vmax);
                let window = start_window(&slot, job, tau_in, tau_out)?;
                let Some(bounds) = window.bounds() else {
                    trace!(node = %node.id(), slot = slot.index, "start window empty");
                    continue;
                };
                out.push(Candidate { node: node.id(), slot, location, window: bounds, distance });
            }
        }
        out.sort_by(|a, b| {
            a.window
                .0
                .total_cmp(&b.window.0)
                .then(a.distance.total_cmp(&b.distance))
                .then(a.node.cmp(&b.node))
                .then(a.slot.index.cmp(&b.slot.index))
        });
        Ok(out)
    }

    fn perspective(&self, node: NodeId) -> SchedulerResult<Arc<Perspective>> {
        self.perspectives.get(node).ok_or(SchedulerError::UnknownNode(node))
    }

    fn node(&self, id: NodeId) -> SchedulerResult<&'a Node> {
        self.schedule.node(id).ok_or(SchedulerError::UnknownNode(id))
    }

    fn try_candidate(
        &self,
        job: &JobSpecification,
        c: &Candidate,
    ) -> SchedulerResult<Option<ScheduleAlternative>> {
        let node = self.node(c.node)?;
        let occupancies = self.occupancies(self.schedule.nodes(), c.node);
        let all: Vec<DynamicObstacle> = occupancies.iter().map(|o| o.obstacle.clone()).collect();

        for start in self.start_times(node, c, job.duration, &all) {
            let Some(traj) = self.plan_visit(node, c, start, job.duration, &all)? else {
                continue;
            };
            let alt = self.visit_alternative(job, node, c, start, traj);
            if self.accept(&alt)? {
                return Ok(Some(alt));
            }
        }

        if self.config.max_evasions == 0 || occupancies.iter().all(|o| o.parked.is_none()) {
            return Ok(None);
        }
        let moving: Vec<DynamicObstacle> = occupancies
            .iter()
            .filter(|o| o.parked.is_none())
            .map(|o| o.obstacle.clone())
            .collect();
        for start in self.start_times(node, c, job.duration, &moving) {
            let Some(traj) = self.plan_visit(node, c, start, job.duration, &moving)? else {
                continue;
            };
            let alt = self.visit_alternative(job, node, c, start, traj);
            if let Some(alt) = self.evade(alt, &occupancies)? {
                return Ok(Some(alt));
            }
        }
        Ok(None)
    }

    /// Candidate job starts inside the window: its lower end, the ends of
    /// blocked stretches at the job location, and an even spread, keeping
    /// only those whose hold is clear.
    fn start_times(
        &self,
        node: &Node,
        c: &Candidate,
        duration: f64,
        obstacles: &[DynamicObstacle],
    ) -> Vec<f64> {
        let (lo, hi) = c.window;
        let n = self.config.max_start_candidates;
        let blocked = forbidden_intervals_at(c.location, Some(node.shape()), obstacles);

        let mut times = vec![lo];
        times.extend(blocked.iter().map(|&(_, end)| end).filter(|&t| t > lo && t <= hi));
        if n > 1 && hi > lo {
            times.extend((1..n).map(|k| lo + (hi - lo) * k as f64 / (n - 1) as f64));
        }
        times.sort_by(f64::total_cmp);
        times.dedup_by(|a, b| (*a - *b).abs() <= EPSILON);

        // A job in the open slot keeps the node parked there for good.
        let open = c.slot.is_open();
        times.retain(|&s| {
            let until = if open { f64::INFINITY } else { s + duration };
            blocked.iter().all(|&(b0, b1)| b1 <= s + EPSILON || b0 >= until - EPSILON)
        });
        times.truncate(n);
        times
    }

    fn arc_planner(
        &self,
        path: SpatialPath,
        node: &Node,
        obstacles: &[DynamicObstacle],
    ) -> SchedulerResult<ArcTimePlanner> {
        Ok(ArcTimePlanner::new(path, Some(node.shape()), obstacles, node.spec().max_speed)?
            .allow_reverse(self.config.allow_reverse))
    }

    /// Approach, hold, and return for one start time.
    fn plan_visit(
        &self,
        node: &Node,
        c: &Candidate,
        start: f64,
        duration: f64,
        obstacles: &[DynamicObstacle],
    ) -> SchedulerResult<Option<Trajectory>> {
        let perspective = self.perspective(node.id())?;
        let Some(in_path) = route(perspective.planner(), c.slot.location, c.location)? else {
            return Ok(None);
        };
        let approach = self
            .arc_planner(in_path.clone(), node, obstacles)?
            .plan(c.slot.start_time, Goal::FixedFinish(start));
        let Some(approach) = approach else {
            trace!(node = %node.id(), start, "approach infeasible");
            return Ok(None);
        };
        let mut traj = trim_leading_wait(approach.to_trajectory(&in_path)?);
        let finish = start + duration;
        if duration > EPSILON {
            traj.append(c.location, finish)?;
        }

        if let Some((end, back_to)) = c.slot.end {
            let Some(out_path) = route(perspective.planner(), c.location, back_to)? else {
                return Ok(None);
            };
            let Some(back) = self.plan_return(out_path, node, obstacles, finish, end)? else {
                trace!(node = %node.id(), start, "return infeasible");
                return Ok(None);
            };
            traj = traj.concat(&back)?;
        }
        Ok(Some(traj))
    }

    /// Leg back to where a bounded slot ends, arriving by `end`.  Going back
    /// at once and waiting there is preferred over lingering at the far end.
    fn plan_return(
        &self,
        path: SpatialPath,
        node: &Node,
        obstacles: &[DynamicObstacle],
        depart: f64,
        end: f64,
    ) -> SchedulerResult<Option<Trajectory>> {
        let planner = self.arc_planner(path.clone(), node, obstacles)?;
        if let Some(found) = planner.plan(depart, Goal::EarliestFinish { latest: end }) {
            let parked = self
                .arc_planner(SpatialPath::stationary(path.end()), node, obstacles)?
                .plan(found.finish_time(), Goal::FixedFinish(end));
            if parked.is_some() {
                return Ok(Some(found.to_trajectory(&path)?));
            }
        }
        match planner.plan(depart, Goal::FixedFinish(end)) {
            Some(found) => Ok(Some(trim_trailing_wait(found.to_trajectory(&path)?))),
            None => Ok(None),
        }
    }

    fn visit_alternative(
        &self,
        job: &JobSpecification,
        node: &Node,
        c: &Candidate,
        start: f64,
        trajectory: Trajectory,
    ) -> ScheduleAlternative {
        let mut updated = node.clone();
        updated.insert(
            Movement { kind: MovementKind::Job(job.id), trajectory },
            Some(Job { spec: job.clone(), location: c.location, start }),
        );
        let mut alt = ScheduleAlternative::new(self.schedule, job.id, node.id());
        alt.update(updated);
        alt
    }

    fn accept(&self, alt: &ScheduleAlternative) -> SchedulerResult<bool> {
        let conflict = alt.find_conflict(
            self.schedule,
            self.world.dynamic_obstacles(),
            self.horizon,
            self.config.collision_tolerance,
        )?;
        if let Some(conflict) = conflict {
            debug!(?conflict, "alternative rejected");
        }
        Ok(conflict.is_none())
    }

    // ── Evasion ───────────────────────────────────────────────────────────────

    fn evade(
        &self,
        mut alt: ScheduleAlternative,
        occupancies: &[Occupancy],
    ) -> SchedulerResult<Option<ScheduleAlternative>> {
        let mover = alt
            .node(self.schedule, alt.job_node())
            .ok_or(SchedulerError::UnknownNode(alt.job_node()))?;
        let mover_traj = mover.trajectory_until(self.horizon)?;
        let tol = self.config.collision_tolerance;

        let blocking: Vec<(NodeId, IdleSlot)> = occupancies
            .iter()
            .filter_map(|o| {
                let (owner, slot) = (o.owner?, o.parked?);
                trajectories_collide(
                    mover.shape(),
                    &mover_traj,
                    &o.obstacle.shape,
                    &o.obstacle.trajectory,
                    tol,
                )
                .then_some((owner, slot))
            })
            .collect();
        if blocking.is_empty() || blocking.len() > self.config.max_evasions {
            trace!(blocking = blocking.len(), "evasion not attempted");
            return Ok(None);
        }

        let (mover_shape, mover_points) = (mover.shape().clone(), mover_traj.points().to_vec());
        for (owner, slot) in blocking {
            debug!(node = %owner, slot_start = slot.start_time, "planning evasion");
            let Some(detour) = self.plan_detour(&alt, owner, &slot, &mover_shape, &mover_points)?
            else {
                debug!(node = %owner, "evasion failed");
                return Ok(None);
            };
            let mut evader = alt
                .node(self.schedule, owner)
                .cloned()
                .ok_or(SchedulerError::UnknownNode(owner))?;
            evader.insert(detour, None);
            alt.update(evader);
        }
        Ok(self.accept(&alt)?.then_some(alt))
    }

    /// Out of the way of `mover` and, for a bounded slot, back in time.
    fn plan_detour(
        &self,
        alt: &ScheduleAlternative,
        owner: NodeId,
        slot: &IdleSlot,
        mover_shape: &Polygon,
        mover_points: &[Point],
    ) -> SchedulerResult<Option<Movement>> {
        let evader = alt.node(self.schedule, owner).ok_or(SchedulerError::UnknownNode(owner))?;
        let perspective = self.perspective(owner)?;
        let obstacles: Vec<DynamicObstacle> = self
            .occupancies(alt.view(self.schedule), owner)
            .into_iter()
            .map(|o| o.obstacle)
            .collect();

        let clearance = evader.spec().radius() + mover_shape.radius() + self.config.evasion_margin;
        let home = slot.location;
        let latest = slot.end_time().unwrap_or(self.horizon);

        for spot in evasion_spots(home, clearance, mover_points) {
            if !perspective.world().is_free(spot) {
                continue;
            }
            let Some(out_path) = route(perspective.planner(), home, spot)? else {
                continue;
            };
            let out = self
                .arc_planner(out_path.clone(), evader, &obstacles)?
                .plan(slot.start_time, Goal::EarliestFinish { latest });
            let Some(out) = out else {
                continue;
            };
            let out_traj = trim_leading_wait(out.to_trajectory(&out_path)?);
            let arrived = out.finish_time();

            let trajectory = match slot.end {
                Some((end, _)) => {
                    let back_path = out_path.reversed();
                    let Some(back) = self.plan_return(back_path, evader, &obstacles, arrived, end)?
                    else {
                        continue;
                    };
                    out_traj.concat(&back)?
                }
                None => {
                    let parked = self
                        .arc_planner(SpatialPath::stationary(spot), evader, &obstacles)?
                        .plan(arrived, Goal::FixedFinish(self.horizon));
                    if parked.is_none() {
                        continue;
                    }
                    out_traj
                }
            };
            return Ok(Some(Movement { kind: MovementKind::Detour, trajectory }));
        }
        Ok(None)
    }

    // ── Occupancy ─────────────────────────────────────────────────────────────

    /// World obstacles plus every node except `exclude`: one obstacle per
    /// movement and one per parked stretch.
    fn occupancies<'n>(
        &self,
        nodes: impl Iterator<Item = &'n Node>,
        exclude: NodeId,
    ) -> Vec<Occupancy> {
        let mut out: Vec<Occupancy> = self
            .world
            .dynamic_obstacles()
            .iter()
            .map(|d| Occupancy { owner: None, parked: None, obstacle: d.clone() })
            .collect();
        let mut next = ObstacleId(
            out.iter().map(|o| o.obstacle.id.0.saturating_add(1)).max().unwrap_or(0),
        );
        let mut id = || {
            let current = next;
            next = next.next();
            current
        };

        for node in nodes.filter(|n| n.id() != exclude) {
            let shape = node.shape();
            for m in node.movements() {
                out.push(Occupancy {
                    owner: Some(node.id()),
                    parked: None,
                    obstacle: DynamicObstacle::new(id(), shape.clone(), m.trajectory.clone()),
                });
            }
            for slot in node.idle_slots() {
                let until = slot.end_time().unwrap_or(self.horizon);
                if until - slot.start_time <= EPSILON {
                    continue;
                }
                out.push(Occupancy {
                    owner: Some(node.id()),
                    parked: Some(slot),
                    obstacle: DynamicObstacle::new(
                        id(),
                        shape.clone(),
                        Trajectory::hold(slot.location, slot.start_time, until),
                    ),
                });
            }
        }
        out
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Resolve the job start domain for one slot.
fn start_window(
    slot: &IdleSlot,
    job: &JobSpecification,
    tau_in: f64,
    tau_out: Option<f64>,
) -> SchedulerResult<RealSet> {
    let d = job.duration;
    let mut g = VariableGraph::new();
    let arrival = g.variable("arrival");
    let start = g.variable("start");
    let finish = g.variable("finish");

    g.constrain(arrival, RealSet::at_least(slot.start_time + tau_in))?;
    g.constrain(arrival, Constraint::relation(start, RealSet::at_most(0.0)))?;

    g.constrain(start, RealSet::interval(job.earliest_start, job.latest_start))?;
    g.constrain(start, Constraint::relation(arrival, RealSet::at_least(0.0)))?;
    g.constrain(start, Constraint::relation(finish, RealSet::singleton(-d)))?;

    if let (Some(end), Some(tau)) = (slot.end_time(), tau_out) {
        g.constrain(finish, RealSet::at_most(end - tau))?;
    }
    g.constrain(finish, Constraint::relation(start, RealSet::singleton(d)))?;

    g.ready_all();
    Ok(g.evaluate(start)?)
}

/// Where in `region` to stand: the point nearest `from`, else the centroid,
/// else the free sample of the region nearest `from`.
fn pick_location(region: &Polygon, from: Point, world: &World) -> Option<Point> {
    let closest = region.closest_point(from);
    if !world.touches_statics(region) {
        return Some(closest);
    }
    if let Some(p) = [closest, region.centroid()].into_iter().find(|&p| world.is_free(p)) {
        return Some(p);
    }
    region_samples(region)
        .filter(|&p| world.is_free(p))
        .min_by(|a, b| a.distance(from).total_cmp(&b.distance(from)))
}

/// Points along every edge of `region`, each also pulled towards the
/// centroid in steps, so the samples cover the interior in rings.
fn region_samples(region: &Polygon) -> impl Iterator<Item = Point> + '_ {
    let centroid = region.centroid();
    let vertices = region.vertices();
    let steps = REGION_SAMPLE_STEPS;
    (0..vertices.len())
        .flat_map(move |i| {
            let (a, b) = (vertices[i], vertices[(i + 1) % vertices.len()]);
            (0..steps).map(move |k| a.lerp(b, k as f64 / steps as f64))
        })
        .flat_map(move |q| (1..=steps).map(move |k| centroid.lerp(q, k as f64 / steps as f64)))
}

/// Spots at one and two clearances around `home` in eight directions,
/// farthest from the mover's path first.
fn evasion_spots(home: Point, clearance: f64, mover_points: &[Point]) -> Vec<Point> {
    let mut spots: Vec<(f64, Point)> = (1..=2)
        .flat_map(|k| {
            (0..8).map(move |i| {
                let angle = std::f64::consts::FRAC_PI_4 * i as f64;
                home + Point::new(angle.cos(), angle.sin()) * (clearance * k as f64)
            })
        })
        .map(|p| (distance_to_polyline(p, mover_points), p))
        .filter(|&(gap, _)| gap >= clearance)
        .collect();
    spots.sort_by(|a, b| b.0.total_cmp(&a.0));
    spots.into_iter().map(|(_, p)| p).collect()
}

fn route(
    planner: &dyn SpatialPlanner,
    from: Point,
    to: Point,
) -> SchedulerResult<Option<SpatialPath>> {
    match planner.plan(from, to) {
        Ok(path) => Ok(Some(path)),
        Err(MotionError::NoRoute { .. } | MotionError::BlockedEndpoint(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Drop an initial stretch spent standing still.
fn trim_leading_wait(traj: Trajectory) -> Trajectory {
    let first = traj.start_point();
    let still = traj.points().iter().take_while(|p| p.approx_eq(first, EPSILON)).count();
    if still <= 1 {
        return traj;
    }
    let from = traj.times()[still - 1];
    traj.slice(from, traj.end_time()).unwrap_or(traj)
}

/// Drop a final stretch spent standing still.
fn trim_trailing_wait(traj: Trajectory) -> Trajectory {
    let last = traj.end_point();
    let still = traj.points().iter().rev().take_while(|p| p.approx_eq(last, EPSILON)).count();
    if still <= 1 {
        return traj;
    }
    let until = traj.times()[traj.len() - still];
    traj.slice(traj.start_time(), until).unwrap_or(traj)
}

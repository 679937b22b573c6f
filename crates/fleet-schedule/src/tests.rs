//! Unit tests for fleet-schedule.

use fleet_core::{JobId, NodeId, PlannerConfig, TransactionId};
use fleet_geom::{rect, Point, Polygon};
use fleet_world::{trajectories_collide, Trajectory, World};

use crate::*;

// ── Helpers ───────────────────────────────────────────────────────────────────

fn p(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn square(h: f64) -> Polygon {
    rect(-h, -h, h, h).unwrap()
}

fn node_spec(id: u32, at: Point, max_speed: f64) -> NodeSpecification {
    NodeSpecification::new(NodeId(id), square(0.5), max_speed, at, 0.0)
}

/// A 2 × 2 job region with its lower-left corner at `(x, y)`.
fn job(id: u64, x: f64, y: f64, window: (f64, f64), duration: f64) -> JobSpecification {
    JobSpecification::new(JobId(id), rect(x, y, x + 2.0, y + 2.0).unwrap(), window.0, window.1, duration)
}

fn scheduler(world: World) -> Scheduler {
    Scheduler::new(world, PlannerConfig::default()).unwrap()
}

/// Node 0 at the origin and node 1 ten units above it, both at unit speed.
fn two_nodes() -> Scheduler {
    let mut s = scheduler(World::empty());
    s.add_node(node_spec(0, p(0.0, 0.0), 1.0)).unwrap();
    s.add_node(node_spec(1, p(0.0, 10.0), 1.0)).unwrap();
    s
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

fn assert_no_collisions(s: &Scheduler) {
    let trajs: Vec<(NodeId, Trajectory)> = s
        .committed()
        .nodes()
        .map(|n| (n.id(), n.trajectory().unwrap()))
        .collect();
    for (i, (a, ta)) in trajs.iter().enumerate() {
        let shape_a = s.committed().node(*a).unwrap().shape();
        for (b, tb) in &trajs[i + 1..] {
            let shape_b = s.committed().node(*b).unwrap().shape();
            assert!(!trajectories_collide(shape_a, ta, shape_b, tb, 1e-6), "{a} hits {b}");
        }
        for ob in s.world().dynamic_obstacles() {
            assert!(!trajectories_collide(shape_a, ta, &ob.shape, &ob.trajectory, 1e-6));
        }
    }
}

// ── Specifications ────────────────────────────────────────────────────────────

#[cfg(test)]
mod specs {
    use super::*;

    #[test]
    fn job_validation() {
        assert!(job(0, 0.0, 0.0, (0.0, 10.0), 1.0).validate().is_ok());
        assert!(job(0, 0.0, 0.0, (5.0, 5.0), 0.0).validate().is_ok());
        assert!(matches!(
            job(1, 0.0, 0.0, (10.0, 5.0), 1.0).validate(),
            Err(SchedulerError::InvalidJob(JobId(1), _))
        ));
        assert!(job(2, 0.0, 0.0, (0.0, 5.0), -1.0).validate().is_err());
        assert!(job(3, 0.0, 0.0, (0.0, f64::INFINITY), 1.0).validate().is_err());
    }

    #[test]
    fn node_validation() {
        assert!(node_spec(0, p(0.0, 0.0), 1.0).validate().is_ok());
        assert!(matches!(
            node_spec(4, p(0.0, 0.0), 0.0).validate(),
            Err(SchedulerError::InvalidNode(NodeId(4), _))
        ));
        assert!(node_spec(5, p(f64::NAN, 0.0), 1.0).validate().is_err());
        assert!((node_spec(0, p(0.0, 0.0), 1.0).radius() - 0.5f64.hypot(0.5)).abs() < 1e-12);
    }
}

// ── Node timeline ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod timeline {
    use super::*;

    fn visit(id: u64, path: &[(f64, f64, f64)]) -> Movement {
        Movement {
            kind: MovementKind::Job(JobId(id)),
            trajectory: Trajectory::new(
                path.iter().map(|&(x, y, _)| p(x, y)).collect(),
                path.iter().map(|&(_, _, t)| t).collect(),
            )
            .unwrap(),
        }
    }

    #[test]
    fn fresh_node_has_one_open_slot() {
        let node = Node::new(node_spec(0, p(1.0, 2.0), 1.0));
        let slots = node.idle_slots();
        assert_eq!(slots.len(), 1);
        assert!(slots[0].is_open());
        assert_eq!(slots[0].location, p(1.0, 2.0));
        assert_eq!(slots[0].start_time, 0.0);
        assert_eq!(node.last_event_time(), 0.0);
        assert_eq!(node.trajectory().unwrap().len(), 1);
    }

    #[test]
    fn slots_between_movements() {
        let mut node = Node::new(node_spec(0, p(0.0, 0.0), 1.0));
        node.insert(visit(1, &[(0.0, 0.0, 10.0), (5.0, 0.0, 15.0), (5.0, 0.0, 20.0)]), None);
        // Inserted out of order; lands first.
        node.insert(visit(2, &[(0.0, 0.0, 2.0), (0.0, 1.0, 3.0), (0.0, 0.0, 4.0)]), None);

        let slots = node.idle_slots();
        assert_eq!(slots.len(), 3);
        assert_eq!((slots[0].index, slots[0].end), (0, Some((2.0, p(0.0, 0.0)))));
        assert_eq!((slots[1].index, slots[1].start_time), (1, 4.0));
        assert_eq!(slots[1].end_time(), Some(10.0));
        assert_eq!((slots[2].index, slots[2].location), (2, p(5.0, 0.0)));
        assert!(slots[2].is_open());
        assert_eq!(node.last_event_time(), 20.0);

        let traj = node.trajectory().unwrap();
        assert_eq!(traj.position_at(7.0), Some(p(0.0, 0.0)));
        assert_eq!(traj.position_at(12.5), Some(p(2.5, 0.0)));
        assert_eq!(node.trajectory_until(50.0).unwrap().end_time(), 50.0);
    }

    #[test]
    fn back_to_back_movements_leave_no_slot() {
        let mut node = Node::new(node_spec(0, p(0.0, 0.0), 1.0));
        node.insert(visit(1, &[(0.0, 0.0, 0.0), (1.0, 0.0, 1.0)]), None);
        node.insert(visit(2, &[(1.0, 0.0, 1.0), (2.0, 0.0, 2.0)]), None);
        let slots = node.idle_slots();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].location, p(2.0, 0.0));
    }
}

// ── Slot search ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod candidates {
    use super::*;

    fn candidates(s: &Scheduler, j: &JobSpecification) -> Vec<Candidate> {
        TaskPlanner::new(s.config(), s.world(), s.committed(), s.perspectives(), j)
            .candidates(j)
            .unwrap()
    }

    #[test]
    fn ordered_by_earliest_start() {
        let s = two_nodes();
        // Closest to node 0 at (20, 0); node 1 needs √(20² + 9²).
        let j = job(0, 20.0, -1.0, (0.0, 100.0), 5.0);
        let found = candidates(&s, &j);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].node, NodeId(0));
        assert_eq!(found[0].location, p(20.0, 0.0));
        assert!(approx(found[0].window.0, 20.0));
        assert!(approx(found[0].window.1, 100.0));
        assert_eq!(found[1].node, NodeId(1));
        assert!(approx(found[1].window.0, 481f64.sqrt()));
    }

    #[test]
    fn unreachable_window_drops_candidate() {
        let s = two_nodes();
        let j = job(0, 99.0, -1.0, (0.0, 10.0), 1.0);
        assert!(candidates(&s, &j).is_empty());
    }

    #[test]
    fn bounded_slot_window_respects_return() {
        let mut s = scheduler(World::empty());
        s.add_node(node_spec(0, p(0.0, 0.0), 1.0)).unwrap();
        // Pinned at (9, 0) at t = 50; the node leaves as late as it can.
        let late = job(0, 9.0, -1.0, (50.0, 50.0), 5.0);
        let tx = s.schedule(late).unwrap().transaction.unwrap();
        s.commit(tx).unwrap();

        let node = s.node(NodeId(0)).unwrap();
        let slots = node.idle_slots();
        assert_eq!(slots.len(), 2);
        assert!(approx(slots[0].end_time().unwrap(), 41.0));

        // Region at (0, 4): 4 out, 4 back, so the job must start in [4, 30].
        let early = job(1, -1.0, 4.0, (0.0, 30.0), 5.0);
        let found = candidates(&s, &early);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].slot.index, 0);
        assert_eq!(found[0].location, p(0.0, 4.0));
        assert!(approx(found[0].window.0, 4.0));
        assert!(approx(found[0].window.1, 30.0));
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod scheduler {
    use super::*;

    #[test]
    fn rejects_bad_config() {
        let config = PlannerConfig { max_start_candidates: 0, ..PlannerConfig::default() };
        assert!(matches!(Scheduler::new(World::empty(), config), Err(SchedulerError::Core(_))));
    }

    #[test]
    fn node_registration() {
        let mut s = two_nodes();
        assert_eq!(s.committed().len(), 2);
        // Same shape, one shared perspective.
        assert_eq!(s.perspectives().len(), 1);
        let radius = s.node(NodeId(0)).unwrap().spec().radius();
        assert_eq!(s.perspectives().holders(radius), 2);

        assert!(matches!(
            s.add_node(node_spec(1, p(5.0, 5.0), 1.0)),
            Err(SchedulerError::DuplicateNode(NodeId(1)))
        ));
        assert!(matches!(
            s.add_node(node_spec(2, p(5.0, 5.0), -1.0)),
            Err(SchedulerError::InvalidNode(NodeId(2), _))
        ));

        let removed = s.remove_node(NodeId(0)).unwrap();
        assert_eq!(removed.id(), NodeId(0));
        assert_eq!(s.perspectives().len(), 1);
        s.remove_node(NodeId(1)).unwrap();
        assert!(s.perspectives().is_empty());
        assert!(matches!(s.remove_node(NodeId(1)), Err(SchedulerError::UnknownNode(_))));
        assert!(matches!(s.node(NodeId(7)), Err(SchedulerError::UnknownNode(NodeId(7)))));
    }

    #[test]
    fn node_inside_obstacle_is_rejected() {
        let mut b = World::builder();
        b.add_static(rect(-1.0, -1.0, 1.0, 1.0).unwrap());
        let mut s = scheduler(b.build());
        let err = s.add_node(node_spec(0, p(0.0, 0.0), 1.0));
        assert!(matches!(err, Err(SchedulerError::InvalidNode(NodeId(0), _))));
        assert!(s.perspectives().is_empty());
        assert!(s.committed().is_empty());
    }

    #[test]
    fn node_on_a_committed_route_is_rejected() {
        let mut s = scheduler(World::empty());
        s.add_node(node_spec(0, p(0.0, 0.0), 1.0)).unwrap();
        let result = s.schedule(job(0, 20.0, -1.0, (20.0, 20.0), 1.0)).unwrap();
        s.commit(result.transaction.unwrap()).unwrap();

        // Node 0 passes (10, 0) at t = 10.
        let err = s.add_node(node_spec(1, p(10.0, 0.0), 1.0));
        assert!(matches!(err, Err(SchedulerError::InvalidNode(NodeId(1), _))));
        assert_eq!(s.committed().len(), 1);
        let radius = s.node(NodeId(0)).unwrap().spec().radius();
        assert_eq!(s.perspectives().holders(radius), 1);

        s.add_node(node_spec(1, p(10.0, 5.0), 1.0)).unwrap();
        assert_no_collisions(&s);
    }

    #[test]
    fn node_in_a_dynamic_obstacle_is_rejected_while_it_lasts() {
        let mut b = World::builder();
        b.add_dynamic(square(0.5), Trajectory::hold(p(10.0, 0.0), 0.0, 30.0));
        let mut s = scheduler(b.build());
        let err = s.add_node(node_spec(0, p(10.5, 0.0), 1.0));
        assert!(matches!(err, Err(SchedulerError::InvalidNode(NodeId(0), _))));
        assert!(s.perspectives().is_empty());

        let mut later = node_spec(0, p(10.5, 0.0), 1.0);
        later.initial_time = 40.0;
        s.add_node(later).unwrap();
    }

    #[test]
    fn job_region_mostly_behind_a_wall() {
        // Only x > 6.9 of the region is clear of the buffered wall.
        let mut b = World::builder();
        b.add_static(rect(4.0, -6.0, 6.2, 6.0).unwrap());
        let mut s = scheduler(b.build());
        s.add_node(node_spec(0, p(0.0, 0.0), 1.0)).unwrap();

        let region = rect(5.0, -5.0, 7.5, 5.0).unwrap();
        let spec = JobSpecification::new(JobId(0), region.clone(), 0.0, 200.0, 1.0);
        let result = s.schedule(spec).unwrap();
        assert!(result.feasible);
        s.commit(result.transaction.unwrap()).unwrap();

        let placed = &s.node(NodeId(0)).unwrap().jobs()[0];
        assert!(region.contains_point(placed.location));
        assert!(placed.location.x > 6.9, "location {}", placed.location);
        assert_no_collisions(&s);
    }

    #[test]
    fn candidate_cap_stops_at_the_first() {
        // Node 0 ranks first but a parked obstacle shuts its route; node 1
        // can take the job.
        let world = || {
            let mut b = World::builder();
            b.add_dynamic(square(0.5), Trajectory::hold(p(10.0, 0.0), 0.0, 100.0));
            b.build()
        };
        let setup = |config: PlannerConfig| {
            let mut s = Scheduler::new(world(), config).unwrap();
            s.add_node(node_spec(0, p(0.0, 0.0), 1.0)).unwrap();
            s.add_node(node_spec(1, p(0.0, 10.0), 1.0)).unwrap();
            s
        };
        let spec = || job(0, 20.0, -1.0, (20.0, 25.0), 1.0);

        let mut uncapped = setup(PlannerConfig::default());
        let result = uncapped.schedule(spec()).unwrap();
        assert!(result.feasible);
        assert_eq!(result.node, Some(NodeId(1)));

        let config = PlannerConfig { max_candidates: Some(1), ..PlannerConfig::default() };
        let mut capped = setup(config);
        assert!(!capped.schedule(spec()).unwrap().feasible);
    }

    #[test]
    fn two_jobs_two_nodes() {
        let mut s = two_nodes();

        let a = s.schedule(job(0, 20.0, -1.0, (0.0, 100.0), 5.0)).unwrap();
        assert!(a.feasible);
        assert_eq!(a.node, Some(NodeId(0)));
        let traj = a.trajectory.clone().unwrap();
        assert_eq!(traj.position_at(20.0), Some(p(20.0, 0.0)));
        assert_eq!(traj.position_at(25.0), Some(p(20.0, 0.0)));
        // Nothing changes before the commit.
        assert!(s.node(NodeId(0)).unwrap().jobs().is_empty());
        s.commit(a.transaction.unwrap()).unwrap();

        let b = s.schedule(job(1, 20.0, 9.0, (0.0, 100.0), 5.0)).unwrap();
        assert!(b.feasible);
        assert_eq!(b.node, Some(NodeId(1)));
        s.commit(b.transaction.unwrap()).unwrap();

        let n0 = s.node(NodeId(0)).unwrap();
        assert_eq!(n0.jobs().len(), 1);
        assert_eq!(n0.jobs()[0].location, p(20.0, 0.0));
        assert!(approx(n0.jobs()[0].start, 20.0));
        assert_eq!(s.committed().owner_of(JobId(1)), Some(NodeId(1)));
        assert_eq!(s.node(NodeId(1)).unwrap().calc_trajectory().unwrap().end_point(), p(20.0, 10.0));
        assert!(s.pending().is_empty());
        assert_no_collisions(&s);
    }

    #[test]
    fn resubmitting_is_idempotent() {
        let mut s = two_nodes();
        let a = job(0, 20.0, -1.0, (0.0, 100.0), 5.0);

        let first = s.schedule(a.clone()).unwrap();
        let again = s.schedule(a.clone()).unwrap();
        assert_eq!(first, again);
        assert_eq!(s.pending(), vec![first.transaction.unwrap()]);

        s.commit(first.transaction.unwrap()).unwrap();
        let committed = s.schedule(a).unwrap();
        assert!(committed.feasible);
        assert_eq!(committed.transaction, None);
        assert_eq!(committed.node, Some(NodeId(0)));
        assert_eq!(s.node(NodeId(0)).unwrap().jobs().len(), 1);
        assert_eq!(s.node(NodeId(0)).unwrap().movements().len(), 1);
    }

    #[test]
    fn infeasible_job_changes_nothing() {
        let mut s = two_nodes();
        let revision = s.committed().revision();
        let result = s.schedule(job(0, 99.0, -1.0, (0.0, 10.0), 1.0)).unwrap();
        assert_eq!(result, ScheduleResult::infeasible());
        assert_eq!(s.committed().revision(), revision);
        assert!(s.pending().is_empty());
    }

    #[test]
    fn invalid_job_is_an_error() {
        let mut s = two_nodes();
        assert!(matches!(
            s.schedule(job(3, 0.0, 0.0, (5.0, 1.0), 1.0)),
            Err(SchedulerError::InvalidJob(JobId(3), _))
        ));
    }

    #[test]
    fn stale_transaction_is_refused() {
        let mut s = two_nodes();
        let revision = s.committed().revision();
        let a = s.schedule(job(0, 20.0, -1.0, (0.0, 100.0), 5.0)).unwrap();
        let b = s.schedule(job(1, 20.0, 9.0, (0.0, 100.0), 5.0)).unwrap();
        assert_eq!(s.pending().len(), 2);

        s.commit(a.transaction.unwrap()).unwrap();
        let err = s.commit(b.transaction.unwrap()).unwrap_err();
        assert!(matches!(
            err,
            SchedulerError::StaleTransaction { built, current }
                if built == revision && current == revision + 1
        ));
        // Consumed either way.
        assert!(s.pending().is_empty());
        assert!(s.node(NodeId(1)).unwrap().jobs().is_empty());

        // Planned again against the new state.
        let retry = s.schedule(job(1, 20.0, 9.0, (0.0, 100.0), 5.0)).unwrap();
        assert!(retry.feasible);
        s.commit(retry.transaction.unwrap()).unwrap();
        assert_no_collisions(&s);
    }

    #[test]
    fn discard_and_unknown_transactions() {
        let mut s = two_nodes();
        let a = s.schedule(job(0, 20.0, -1.0, (0.0, 100.0), 5.0)).unwrap();
        let tx = a.transaction.unwrap();
        assert_eq!(s.pending_result(tx), Some(&a));

        s.discard(tx).unwrap();
        assert!(s.pending_result(tx).is_none());
        assert!(matches!(s.commit(tx), Err(SchedulerError::UnknownTransaction(t)) if t == tx));
        assert!(matches!(
            s.discard(TransactionId(99)),
            Err(SchedulerError::UnknownTransaction(TransactionId(99)))
        ));
        assert!(s.node(NodeId(0)).unwrap().jobs().is_empty());
    }

    #[test]
    fn removing_a_node_drops_its_pending_transactions() {
        let mut s = two_nodes();
        let a = s.schedule(job(0, 20.0, -1.0, (0.0, 100.0), 5.0)).unwrap();
        assert_eq!(a.node, Some(NodeId(0)));
        s.remove_node(NodeId(0)).unwrap();
        assert!(s.pending().is_empty());
        assert_eq!(s.committed().owner_of(JobId(0)), None);
    }

    #[test]
    fn job_inside_a_bounded_slot_returns_in_time() {
        let mut s = scheduler(World::empty());
        s.add_node(node_spec(0, p(0.0, 0.0), 1.0)).unwrap();
        let late = s.schedule(job(0, 9.0, -1.0, (50.0, 50.0), 5.0)).unwrap();
        s.commit(late.transaction.unwrap()).unwrap();

        let early = s.schedule(job(1, -1.0, 4.0, (0.0, 30.0), 5.0)).unwrap();
        assert!(early.feasible);
        s.commit(early.transaction.unwrap()).unwrap();

        let node = s.node(NodeId(0)).unwrap();
        let ids: Vec<JobId> = node.jobs().iter().map(Job::id).collect();
        assert_eq!(ids, vec![JobId(1), JobId(0)]);
        assert!(approx(node.jobs()[0].start, 4.0));

        let traj = node.calc_trajectory().unwrap();
        assert_eq!(traj.position_at(6.0), Some(p(0.0, 4.0)));
        // Back home straight after the job, then parked until leaving.
        assert_eq!(traj.position_at(13.0), Some(p(0.0, 0.0)));
        assert_eq!(traj.position_at(41.0), Some(p(0.0, 0.0)));
        assert_eq!(traj.position_at(50.0), Some(p(9.0, 0.0)));
        assert_eq!(node.idle_slots().len(), 2);
    }

    #[test]
    fn waits_for_dynamic_obstacle() {
        let mut b = World::builder();
        b.add_dynamic(square(0.5), Trajectory::hold(p(10.0, 0.0), 0.0, 30.0));
        let mut s = scheduler(b.build());
        s.add_node(node_spec(0, p(0.0, 0.0), 1.0)).unwrap();

        let result = s.schedule(job(0, 20.0, -1.0, (20.0, 60.0), 1.0)).unwrap();
        assert!(result.feasible);
        s.commit(result.transaction.unwrap()).unwrap();

        // The corridor is shut until t = 30, so x = 9 can't be passed earlier.
        let start = s.node(NodeId(0)).unwrap().jobs()[0].start;
        assert!(start >= 41.0 - 1e-6, "start {start}");
        assert!(start <= 60.0);
        assert_no_collisions(&s);
    }
}

// ── Evasion ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod evasion {
    use super::*;

    /// Node 1 is parked on node 0's only way to a job that node 1 is too slow
    /// to take itself.
    fn blocked(config: PlannerConfig) -> Scheduler {
        let mut s = Scheduler::new(World::empty(), config).unwrap();
        s.add_node(node_spec(0, p(0.0, 0.0), 1.0)).unwrap();
        s.add_node(node_spec(1, p(10.0, 0.0), 0.4)).unwrap();
        s
    }

    fn pinned_job() -> JobSpecification {
        job(0, 20.0, -1.0, (20.0, 20.0), 1.0)
    }

    #[test]
    fn parked_node_steps_aside() {
        let mut s = blocked(PlannerConfig::default());
        let result = s.schedule(pinned_job()).unwrap();
        assert!(result.feasible);
        assert_eq!(result.node, Some(NodeId(0)));
        s.commit(result.transaction.unwrap()).unwrap();

        let evader = s.node(NodeId(1)).unwrap();
        assert!(evader.jobs().is_empty());
        assert_eq!(evader.movements().len(), 1);
        assert_eq!(evader.movements()[0].kind, MovementKind::Detour);
        let spot = evader.calc_trajectory().unwrap().end_point();
        assert!(spot.distance(p(10.0, 0.0)) > 1.0);
        assert!(spot.y.abs() > 1.0);

        let mover = s.node(NodeId(0)).unwrap();
        assert!(approx(mover.jobs()[0].start, 20.0));
        assert_eq!(mover.calc_trajectory().unwrap().position_at(10.0), Some(p(10.0, 0.0)));
        assert_no_collisions(&s);
    }

    #[test]
    fn disabled_evasion_is_infeasible() {
        let config = PlannerConfig { max_evasions: 0, ..PlannerConfig::default() };
        let mut s = blocked(config);
        assert!(!s.schedule(pinned_job()).unwrap().feasible);
    }
}

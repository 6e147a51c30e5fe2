//! Path relinking between members of a Pareto front.
//!
//! A path from a source to a target solution is built one node at a time:
//! the tours of the target are scanned in order and every node that does
//! not follow its target predecessor yet is moved there. Nodes served by
//! the source only are removed last. Every feasible intermediate solution
//! is offered to an output front.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::pareto::ParetoFront;
use super::thread_pool::ThreadPool;
use crate::constraints::ConstraintHandler;
use crate::error::{Result, TrspError};
use crate::solution::Solution;

/// Settings of the relinking phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelinkConfig {
    /// Number of relinking tasks.
    pub tasks: usize,
    /// Time to wait for all tasks before cancelling the remaining ones.
    pub timeout: Duration,
}

impl Default for RelinkConfig {
    fn default() -> Self {
        Self {
            tasks: 4,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Result of [`PathRelinking::relink_front`].
#[derive(Debug)]
pub struct RelinkOutcome {
    /// The input front extended with feasible intermediate solutions.
    pub front: Arc<ParetoFront>,
    /// Number of ordered pairs relinked.
    pub pairs: usize,
    /// Number of intermediate solutions that joined the front.
    pub added: usize,
    pub timed_out: bool,
}

/// Builds relinking paths and feeds feasible steps into a Pareto front.
#[derive(Debug, Clone)]
pub struct PathRelinking {
    constraints: Arc<ConstraintHandler>,
    config: RelinkConfig,
}

impl PathRelinking {
    pub fn new(constraints: Arc<ConstraintHandler>, config: RelinkConfig) -> Self {
        Self {
            constraints,
            config,
        }
    }

    pub fn config(&self) -> &RelinkConfig {
        &self.config
    }

    /// Intermediate solutions from `source` to `target`, the last one having
    /// the routes of `target`.
    pub fn path(&self, source: &Solution, target: &Solution) -> Result<Vec<Solution>> {
        if !source.shares_instance(target) {
            return Err(TrspError::InstanceMismatch);
        }
        let instance = source.instance();
        let cost = source.cost_delegate();
        let mut routes = source.to_routes();
        let goal = target.to_routes();
        let mut path = Vec::new();
        let mut push = |routes: &[Vec<usize>]| -> Result<()> {
            let step = Solution::from_routes(Arc::clone(instance), Arc::clone(cost), routes)?
                .with_hasher(Arc::clone(source.hasher()));
            path.push(step);
            Ok(())
        };

        for (t, goal_route) in goal.iter().enumerate() {
            for pos in 1..goal_route.len().saturating_sub(1) {
                let node = goal_route[pos];
                let pred = goal_route[pos - 1];
                let placed = routes[t]
                    .iter()
                    .position(|&n| n == node)
                    .is_some_and(|i| i > 0 && routes[t][i - 1] == pred);
                if placed {
                    continue;
                }
                for route in routes.iter_mut() {
                    route.retain(|&n| n != node);
                }
                let at = routes[t]
                    .iter()
                    .position(|&n| n == pred)
                    .map_or(1, |i| i + 1);
                routes[t].insert(at, node);
                push(&routes)?;
            }
        }

        // nodes the target does not visit
        for (t, goal_route) in goal.iter().enumerate() {
            while let Some(pos) = routes[t]
                .iter()
                .position(|n| !goal_route.contains(n))
            {
                routes[t].remove(pos);
                push(&routes)?;
            }
        }
        Ok(path)
    }

    /// Offers the feasible intermediate solutions of the path from `source`
    /// to `target` to `front`; returns how many joined it.
    pub fn relink(&self, source: &Solution, target: &Solution, front: &ParetoFront) -> Result<usize> {
        let steps = self.path(source, target)?;
        let mut added = 0;
        for step in &steps {
            if step.tours().iter().all(|t| self.constraints.is_feasible(t)) && front.add(step) {
                added += 1;
            }
        }
        debug!(
            "relinked {:.3} -> {:.3} in {} steps, {added} added",
            source.objective(),
            target.objective(),
            steps.len()
        );
        Ok(added)
    }

    /// Relinks every ordered pair of members of `front` on `pool`.
    ///
    /// Pairs are split across the configured number of tasks. Tasks still
    /// running when the timeout expires are cancelled between two pairs, and
    /// the front built so far is returned.
    pub fn relink_front(&self, front: &ParetoFront, pool: &ThreadPool) -> Result<RelinkOutcome> {
        let members = Arc::new(front.solutions());
        let output = Arc::new(front.empty_like());
        for solution in members.iter() {
            output.add(solution);
        }
        let pairs: Vec<(usize, usize)> = (0..members.len())
            .flat_map(|i| (0..members.len()).filter(move |&j| j != i).map(move |j| (i, j)))
            .collect();
        let total = pairs.len();
        if pairs.is_empty() {
            return Ok(RelinkOutcome {
                front: output,
                pairs: 0,
                added: 0,
                timed_out: false,
            });
        }

        let tasks = self.config.tasks.clamp(1, total);
        let abort = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel::<Result<usize>>();
        for k in 0..tasks {
            let share: Vec<(usize, usize)> = pairs.iter().copied().skip(k).step_by(tasks).collect();
            let relinking = self.clone();
            let members = Arc::clone(&members);
            let output = Arc::clone(&output);
            let abort = Arc::clone(&abort);
            let tx = tx.clone();
            pool.spawn(move || {
                let mut added = 0;
                for (i, j) in share {
                    if abort.load(Ordering::Relaxed) {
                        break;
                    }
                    match relinking.relink(&members[i], &members[j], &output) {
                        Ok(n) => added += n,
                        Err(err) => {
                            let _ = tx.send(Err(err));
                            return;
                        }
                    }
                }
                let _ = tx.send(Ok(added));
            });
        }
        drop(tx);

        let deadline = Instant::now() + self.config.timeout;
        let mut added = 0;
        let mut timed_out = false;
        for _ in 0..tasks {
            match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(Ok(n)) => added += n,
                Ok(Err(err)) => {
                    abort.store(true, Ordering::Relaxed);
                    return Err(err);
                }
                Err(RecvTimeoutError::Timeout) => {
                    abort.store(true, Ordering::Relaxed);
                    warn!(
                        "path relinking did not complete within {:.1}s, cancelling remaining tasks",
                        self.config.timeout.as_secs_f64()
                    );
                    timed_out = true;
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(TrspError::WorkerFailed {
                        worker: 0,
                        reason: "a path relinking task terminated without reporting".into(),
                    });
                }
            }
        }
        info!(
            "path relinking: {total} pairs, {added} solutions added, front size {}",
            output.len()
        );
        Ok(RelinkOutcome {
            front: output,
            pairs: total,
            added,
            timed_out,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{CostObjective, RouteConsistency, TravelDistance};
    use crate::models::{Depot, Instance, Request, Technician, TimeWindow};

    fn instance() -> Arc<Instance> {
        let day = TimeWindow::new(0.0, 1000.0).expect("valid");
        Arc::new(
            Instance::new(
                "relink",
                Depot::new(0.0, 0.0, day),
                vec![
                    Technician::new(0.0, 0.0, day),
                    Technician::new(10.0, 0.0, day),
                ],
                vec![
                    Request::new(1.0, 1.0, 1.0),
                    Request::new(2.0, 3.0, 1.0),
                    Request::new(8.0, 1.0, 1.0),
                    Request::new(9.0, 4.0, 1.0),
                ],
            )
            .expect("valid instance"),
        )
    }

    fn solution(ins: &Arc<Instance>, routes: &[Vec<usize>]) -> Solution {
        Solution::from_routes(Arc::clone(ins), Arc::new(TravelDistance::new()), routes)
            .expect("valid routes")
    }

    fn relinking(ins: &Instance) -> PathRelinking {
        PathRelinking::new(
            Arc::new(ConstraintHandler::for_instance(ins)),
            RelinkConfig::default(),
        )
    }

    // homes 1, 2; requests 3..=6; home duplicates 7, 8
    #[test]
    fn test_path_ends_at_target() {
        let ins = instance();
        let source = solution(&ins, &[vec![1, 3, 4, 7], vec![2, 5, 6, 8]]);
        let target = solution(&ins, &[vec![1, 4, 5, 3, 7], vec![2, 6, 8]]);
        let path = relinking(&ins).path(&source, &target).expect("path");

        assert!(!path.is_empty());
        let last = path.last().expect("non-empty");
        assert_eq!(last.to_routes(), target.to_routes());
        assert!(path.iter().all(|s| s.is_complete()));
    }

    #[test]
    fn test_path_removes_nodes_missing_from_target() {
        let ins = instance();
        let source = solution(&ins, &[vec![1, 3, 4, 7], vec![2, 5, 6, 8]]);
        let target = solution(&ins, &[vec![1, 3, 4, 7], vec![2, 5, 8]]);
        let path = relinking(&ins).path(&source, &target).expect("path");
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].unserved().iter().copied().collect::<Vec<_>>(), vec![6]);
    }

    #[test]
    fn test_identical_solutions_give_empty_path() {
        let ins = instance();
        let s = solution(&ins, &[vec![1, 3, 4, 7], vec![2, 5, 6, 8]]);
        assert!(relinking(&ins).path(&s, &s.clone()).expect("path").is_empty());
    }

    #[test]
    fn test_relink_front() {
        let ins = instance();
        let planned = solution(&ins, &[vec![1, 5, 3, 7], vec![2, 4, 6, 8]]);
        let good = solution(&ins, &[vec![1, 3, 4, 7], vec![2, 5, 6, 8]]);
        let front = ParetoFront::bi_objective(
            Arc::new(CostObjective),
            Arc::new(RouteConsistency::from_solution(&planned)),
        );
        front.add(&planned);
        front.add(&good);
        let members = front.len();

        let pool = ThreadPool::new(2).expect("pool");
        let outcome = relinking(&ins)
            .relink_front(&front, &pool)
            .expect("relinking");
        assert!(!outcome.timed_out);
        assert_eq!(outcome.pairs, members * (members - 1));
        assert!(outcome.front.len() >= 1);
        assert!(outcome.front.is_consistent());
    }
}

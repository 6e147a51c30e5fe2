//! Post-optimization over the tour pool.
//!
//! A [`PostOptimizer`] selects one pooled tour per technician so that the
//! selected tours cover the requests, typically by solving a set-covering
//! model. [`post_optimize`] hands it the pool and the incumbent, releases the
//! pooled tours and falls back to the incumbent when the optimizer fails or
//! finds nothing better.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::alns::is_better;
use crate::error::Result;
use crate::evaluation::SolutionChecker;
use crate::pool::{HashTourPool, PooledTour};
use crate::solution::Solution;

/// Answer of a post-optimizer.
#[derive(Debug, Clone)]
pub enum PostOptOutcome {
    /// A covering solution built from pooled tours.
    Improved(Solution),
    /// The pool cannot cover the requests.
    Infeasible,
    /// No conclusion, for instance on a time limit.
    Unknown,
}

/// Selects a covering subset of pooled tours.
pub trait PostOptimizer: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn optimize(&self, tours: &[PooledTour], incumbent: &Solution) -> Result<PostOptOutcome>;
}

/// How [`post_optimize`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostOptStatus {
    Improved,
    NotImproved,
    Infeasible,
    Unknown,
    Failed,
}

/// Solution kept after post-optimization.
#[derive(Debug, Clone)]
pub struct PostOptReport {
    pub solution: Solution,
    pub status: PostOptStatus,
    /// Number of pooled tours handed to the optimizer.
    pub tours: usize,
}

/// Runs `optimizer` on the tours of `pool` and keeps the better of its
/// answer and `incumbent`.
///
/// The pool is emptied. Errors are logged and never propagated: the
/// incumbent is returned instead.
pub fn post_optimize(
    optimizer: &dyn PostOptimizer,
    pool: &mut HashTourPool,
    incumbent: &Solution,
) -> PostOptReport {
    let tours = pool.drain();
    let count = tours.len();
    let keep = |status| PostOptReport {
        solution: incumbent.clone(),
        status,
        tours: count,
    };

    match optimizer.optimize(&tours, incumbent) {
        Ok(PostOptOutcome::Improved(candidate)) => {
            let report = SolutionChecker::new(candidate.instance()).check_solution(&candidate);
            if !report.is_empty() {
                warn!(
                    "{} returned an inconsistent solution, keeping the incumbent: {}",
                    optimizer.name(),
                    report.join("; ")
                );
                keep(PostOptStatus::Failed)
            } else if is_better(&candidate, incumbent) {
                info!(
                    "{} improved {:.3} to {:.3} from {count} tours",
                    optimizer.name(),
                    incumbent.objective(),
                    candidate.objective()
                );
                PostOptReport {
                    solution: candidate,
                    status: PostOptStatus::Improved,
                    tours: count,
                }
            } else {
                keep(PostOptStatus::NotImproved)
            }
        }
        Ok(PostOptOutcome::Infeasible) => {
            info!("{}: the pool of {count} tours has no covering", optimizer.name());
            keep(PostOptStatus::Infeasible)
        }
        Ok(PostOptOutcome::Unknown) => keep(PostOptStatus::Unknown),
        Err(err) => {
            warn!("{} failed, keeping the incumbent: {err}", optimizer.name());
            keep(PostOptStatus::Failed)
        }
    }
}

/// Greedy set covering: tours are taken by increasing cost per request as
/// long as their technician is free and their requests are not covered yet.
///
/// A cheap stand-in for an exact covering model.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyCover;

impl PostOptimizer for GreedyCover {
    fn name(&self) -> &'static str {
        "greedy cover"
    }

    fn optimize(&self, tours: &[PooledTour], incumbent: &Solution) -> Result<PostOptOutcome> {
        let instance = incumbent.instance();
        let ratio = |t: &PooledTour| t.cost / t.requests(instance).count().max(1) as f64;
        let mut order: Vec<&PooledTour> = tours.iter().collect();
        order.sort_by(|a, b| ratio(a).total_cmp(&ratio(b)).then(a.hash.cmp(&b.hash)));

        let mut routes: Vec<Vec<usize>> = Vec::new();
        let mut used = vec![false; instance.technician_count()];
        let mut covered = HashSet::new();
        for tour in order {
            let Some(free) = used.get_mut(tour.technician) else {
                continue;
            };
            if *free || tour.requests(instance).any(|r| covered.contains(&r)) {
                continue;
            }
            *free = true;
            covered.extend(tour.requests(instance));
            if routes.len() <= tour.technician {
                routes.resize(tour.technician + 1, Vec::new());
            }
            routes[tour.technician] = tour.nodes.clone();
        }
        if instance.request_count() - covered.len() > incumbent.unserved_count() {
            return Ok(PostOptOutcome::Infeasible);
        }
        // technicians without a selected tour stay home
        for (t, route) in routes.iter_mut().enumerate() {
            if route.is_empty() {
                *route = vec![instance.home(t), instance.home_duplicate(t)];
            }
        }
        let solution = Solution::from_routes(
            Arc::clone(instance),
            Arc::clone(incumbent.cost_delegate()),
            &routes,
        )?
        .with_hasher(Arc::clone(incumbent.hasher()));
        Ok(PostOptOutcome::Improved(solution))
    }
}

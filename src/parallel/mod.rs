//! Parallel and bi-objective search.
//!
//! - [`ParallelAlns`]: independent ALNS workers sharing an elite pool
//! - [`ParetoFront`]: lock-guarded front of non-dominated solutions
//! - [`PathRelinking`]: relinking between front members on a thread pool
//! - [`HierarchicalSelector`]: picks one solution of a front
//! - [`BiObjectiveSearch`]: parallel ALNS, relinking and selection chained
//!   for cost versus route consistency

mod parallel_alns;
mod pareto;
mod path_relinking;
mod selector;
mod thread_pool;

pub use parallel_alns::{ParallelAlns, ParallelConfig, ParallelResult, WorkerSummary};
pub use pareto::{ParetoEntry, ParetoFront};
pub use path_relinking::{PathRelinking, RelinkConfig, RelinkOutcome};
pub use selector::HierarchicalSelector;
pub use thread_pool::ThreadPool;

use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use crate::constraints::ConstraintHandler;
use crate::cost::{CostObjective, RouteConsistency};
use crate::error::Result;
use crate::solution::Solution;

/// Settings of [`BiObjectiveSearch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiObjectiveConfig {
    pub parallel: ParallelConfig,
    pub relinking: RelinkConfig,
    /// Skips the relinking phase when `false`.
    pub relink: bool,
    pub selector: HierarchicalSelector,
}

impl Default for BiObjectiveConfig {
    fn default() -> Self {
        Self {
            parallel: ParallelConfig::default(),
            relinking: RelinkConfig::default(),
            relink: true,
            selector: HierarchicalSelector::new(1.1),
        }
    }
}

/// Outcome of [`BiObjectiveSearch::run`].
#[derive(Debug)]
pub struct BiObjectiveResult {
    pub selected: Solution,
    pub front: Arc<ParetoFront>,
    pub search: ParallelResult,
    pub relinking: Option<RelinkOutcome>,
}

/// Trades cost against consistency with a reference plan.
///
/// The parallel search fills a front on (cost, route consistency), path
/// relinking densifies it and the selector returns one plan.
#[derive(Debug, Clone)]
pub struct BiObjectiveSearch {
    config: BiObjectiveConfig,
}

impl BiObjectiveSearch {
    pub fn new(config: BiObjectiveConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BiObjectiveConfig {
        &self.config
    }

    /// Searches from `initial`, measuring consistency against `reference`
    /// (`reference[t]` being the planned sequence of technician `t`).
    pub fn run(&self, initial: &Solution, reference: Vec<Vec<usize>>) -> Result<BiObjectiveResult> {
        let front = ParetoFront::bi_objective(
            Arc::new(CostObjective),
            Arc::new(RouteConsistency::new(reference)),
        );
        let search = ParallelAlns::new(self.config.parallel.clone())?.run_pareto(initial, &front)?;
        front.add(&search.best);

        let (front, relinking) = if self.config.relink {
            let constraints = Arc::new(ConstraintHandler::from_config(
                initial.instance(),
                &self.config.parallel.alns.constraints,
            ));
            let pool = ThreadPool::new(self.config.parallel.threads)?;
            let outcome = PathRelinking::new(constraints, self.config.relinking)
                .relink_front(&front, &pool)?;
            (Arc::clone(&outcome.front), Some(outcome))
        } else {
            (Arc::new(front), None)
        };

        let selected = self
            .config
            .selector
            .select(&front)
            .unwrap_or_else(|| search.best.clone());
        info!(
            "bi-objective search: front of {} solutions, selected {:.3} ({} unserved)",
            front.len(),
            selected.objective(),
            selected.unserved_count()
        );
        Ok(BiObjectiveResult {
            selected,
            front,
            search,
            relinking,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::alns::AlnsConfig;
    use crate::constructive::initial_solution;
    use crate::cost::TravelDistance;
    use crate::models::{Depot, Instance, Request, Technician, TimeWindow};

    #[test]
    fn test_bi_objective_search() {
        let day = TimeWindow::new(0.0, 1000.0).expect("valid");
        let ins = Arc::new(
            Instance::new(
                "biobj",
                Depot::new(5.0, 5.0, day),
                vec![
                    Technician::new(0.0, 0.0, day),
                    Technician::new(10.0, 10.0, day),
                ],
                (0..8)
                    .map(|i| Request::new(((i * 3) % 10) as f64, ((i * 7) % 10) as f64, 1.0))
                    .collect(),
            )
            .expect("valid instance"),
        );
        let mut rng = StdRng::seed_from_u64(1);
        let initial = initial_solution(
            Arc::clone(&ins),
            Arc::new(TravelDistance::new()),
            &ConstraintHandler::for_instance(&ins),
            1,
            &mut rng,
        )
        .expect("initial");
        let reference = initial.to_routes();

        let config = BiObjectiveConfig {
            parallel: ParallelConfig::default()
                .with_threads(2)
                .with_alns(AlnsConfig::default().with_max_iterations(40)),
            ..BiObjectiveConfig::default()
        };
        let result = BiObjectiveSearch::new(config)
            .run(&initial, reference)
            .expect("search");
        assert!(result.selected.is_complete());
        assert!(result.front.is_consistent());
        assert!(result.relinking.is_some_and(|r| !r.timed_out));
    }
}

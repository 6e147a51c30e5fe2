//! Independent ALNS searches sharing an elite pool.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::pareto::ParetoFront;
use super::thread_pool::ThreadPool;
use crate::alns::{is_better, Alns, AlnsConfig, AlnsResult};
use crate::constraints::ConstraintHandler;
use crate::constructive::{initial_solution, RandomizedConstructive, RchConfig};
use crate::cost::CostDelegate;
use crate::error::{Result, TrspError};
use crate::models::Instance;
use crate::pool::{DiversifiedPool, HashTourPool};
use crate::solution::Solution;

/// Settings of [`ParallelAlns`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Number of concurrent searches; worker `k` uses seed `alns.seed + k`.
    pub threads: usize,
    /// Settings of every worker.
    pub alns: AlnsConfig,
    /// Capacity of the shared elite pool.
    pub pool_size: usize,
    /// Initial weight of diversity in the elite pool.
    pub pool_alpha: f64,
    /// Adds randomized constructive tours to the collected tour pool.
    pub randomized_tours: Option<RchConfig>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            alns: AlnsConfig::default(),
            pool_size: 10,
            pool_alpha: 0.5,
            randomized_tours: None,
        }
    }
}

impl ParallelConfig {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_alns(mut self, alns: AlnsConfig) -> Self {
        self.alns = alns;
        self
    }

    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    pub fn with_randomized_tours(mut self, rch: RchConfig) -> Self {
        self.randomized_tours = Some(rch);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(TrspError::InvalidParameter {
                name: "threads",
                reason: "at least one worker is required".into(),
            });
        }
        if self.pool_size == 0 {
            return Err(TrspError::InvalidParameter {
                name: "pool_size",
                reason: "the elite pool must hold at least one solution".into(),
            });
        }
        if let Some(rch) = &self.randomized_tours {
            rch.validate()?;
        }
        self.alns.validate()
    }
}

/// Summary of one worker's search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSummary {
    pub worker: usize,
    pub seed: u64,
    pub best_cost: f64,
    pub unserved: usize,
    pub iterations: usize,
    pub improvements: usize,
    pub cancelled: bool,
}

/// Outcome of a parallel run.
#[derive(Debug)]
pub struct ParallelResult {
    pub best: Solution,
    pub best_cost: f64,
    pub workers: Vec<WorkerSummary>,
    /// Members of the shared elite pool at the end of the run.
    pub elite: Vec<Solution>,
    /// Tours collected by every worker, when collection is enabled.
    pub tour_pool: Option<HashTourPool>,
    pub cancelled: bool,
    pub elapsed: Duration,
}

/// Runs `threads` sequential ALNS searches from the same initial solution.
///
/// Each worker keeps its own operator weights and annealing schedule. New
/// best solutions of every worker are offered to a shared
/// [`DiversifiedPool`] (and optionally a [`ParetoFront`]) under a lock that
/// only covers the insertion. The final answer is never worse than the best
/// worker.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use trsp_alns::alns::AlnsConfig;
/// use trsp_alns::cost::TravelDistance;
/// use trsp_alns::models::{Depot, Instance, Request, Technician, TimeWindow};
/// use trsp_alns::parallel::{ParallelAlns, ParallelConfig};
///
/// let day = TimeWindow::new(0.0, 500.0).unwrap();
/// let instance = Arc::new(
///     Instance::new(
///         "doc",
///         Depot::new(0.0, 0.0, day),
///         vec![Technician::new(0.0, 0.0, day)],
///         (0..6).map(|i| Request::new(i as f64, (i % 3) as f64, 1.0)).collect(),
///     )
///     .unwrap(),
/// );
/// let config = ParallelConfig::default()
///     .with_threads(2)
///     .with_alns(AlnsConfig::default().with_max_iterations(30));
/// let result = ParallelAlns::new(config)
///     .unwrap()
///     .solve(instance, Arc::new(TravelDistance::new()))
///     .unwrap();
/// assert_eq!(result.workers.len(), 2);
/// assert!(result.best.is_complete());
/// ```
#[derive(Debug)]
pub struct ParallelAlns {
    config: ParallelConfig,
    cancel: Arc<AtomicBool>,
}

impl ParallelAlns {
    pub fn new(config: ParallelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Raising this flag stops every worker at its next iteration.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Builds the initial solution with regret insertion, then runs.
    pub fn solve(&self, instance: Arc<Instance>, cost: Arc<dyn CostDelegate>) -> Result<ParallelResult> {
        let alns = &self.config.alns;
        let constraints = ConstraintHandler::from_config(&instance, &alns.constraints);
        let mut rng = StdRng::seed_from_u64(alns.seed);
        let initial = initial_solution(
            instance,
            cost,
            &constraints,
            alns.initial_regret_level,
            &mut rng,
        )?;
        self.run(&initial)
    }

    /// Runs the workers from `initial`.
    pub fn run(&self, initial: &Solution) -> Result<ParallelResult> {
        self.run_into(initial, None)
    }

    /// Runs the workers from `initial`, also offering every new best
    /// solution to `front`.
    pub fn run_pareto(&self, initial: &Solution, front: &ParetoFront) -> Result<ParallelResult> {
        front.add(initial);
        self.run_into(initial, Some(front))
    }

    fn run_into(&self, initial: &Solution, front: Option<&ParetoFront>) -> Result<ParallelResult> {
        let started = Instant::now();
        let threads = self.config.threads;
        let elite = Mutex::new(
            DiversifiedPool::new(self.config.pool_size).with_alpha(self.config.pool_alpha),
        );
        elite
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add(initial);

        info!(
            "parallel ALNS on {}: {threads} workers, initial {:.3} ({} unserved)",
            initial.instance().name(),
            initial.objective(),
            initial.unserved_count()
        );

        let pool = ThreadPool::new(threads)?;
        let results: Vec<Result<AlnsResult>> = pool.execute(|| {
            (0..threads)
                .into_par_iter()
                .map(|k| {
                    let config = self.config.alns.clone().with_seed(self.config.alns.seed + k as u64);
                    let mut alns = Alns::new(initial.instance(), config)?
                        .with_cancel_flag(Arc::clone(&self.cancel));
                    alns.run_with(initial.clone(), |best, _| {
                        elite
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .add(best);
                        if let Some(front) = front {
                            front.add(best);
                        }
                    })
                    .map_err(|err| TrspError::WorkerFailed {
                        worker: k,
                        reason: err.to_string(),
                    })
                })
                .collect()
        });

        let elite = elite.into_inner().unwrap_or_else(PoisonError::into_inner);
        let mut best = initial.clone();
        let mut workers = Vec::with_capacity(threads);
        let mut tour_pool: Option<HashTourPool> = None;
        let mut cancelled = false;
        for (k, result) in results.into_iter().enumerate() {
            let result = result?;
            workers.push(WorkerSummary {
                worker: k,
                seed: self.config.alns.seed + k as u64,
                best_cost: result.best_cost,
                unserved: result.best.unserved_count(),
                iterations: result.iterations,
                improvements: result.improvements,
                cancelled: result.cancelled,
            });
            cancelled |= result.cancelled;
            if is_better(&result.best, &best) {
                best = result.best;
            }
            if let Some(worker_pool) = result.tour_pool {
                match tour_pool.as_mut() {
                    Some(merged) => {
                        merged.merge(worker_pool);
                    }
                    None => tour_pool = Some(worker_pool),
                }
            }
        }
        if let (Some(rch), Some(pool)) = (&self.config.randomized_tours, tour_pool.as_mut()) {
            let constraints =
                ConstraintHandler::from_config(initial.instance(), &self.config.alns.constraints);
            RandomizedConstructive::new(
                Arc::clone(initial.instance()),
                Arc::clone(initial.cost_delegate()),
                rch.clone(),
            )?
            .fill_pool(
                &constraints,
                pool,
                &mut StdRng::seed_from_u64(self.config.alns.seed),
            )?;
        }
        for member in elite.solutions() {
            if is_better(member, &best) {
                best = member.clone();
            }
        }

        info!(
            "parallel ALNS on {}: best {:.3} ({} unserved), elite pool {}, {:.2?}",
            best.instance().name(),
            best.objective(),
            best.unserved_count(),
            elite.len(),
            started.elapsed()
        );
        Ok(ParallelResult {
            best_cost: best.objective(),
            best,
            workers,
            elite: elite.solutions().to_vec(),
            tour_pool,
            cancelled,
            elapsed: started.elapsed(),
        })
    }
}

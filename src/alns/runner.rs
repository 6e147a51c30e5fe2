//! Sequential ALNS main loop.

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::acceptance::SimulatedAnnealing;
use super::components::{ComponentHandler, Outcome};
use super::config::AlnsConfig;
use super::destroy::{
    CriticalDestroy, DestroyOperator, RandomDestroy, StaticRelatedDestroy, TimeRelatedDestroy,
};
use super::repair::{RegretRepair, RepairOperator};
use super::stopping::StoppingCriterion;
use crate::constraints::ConstraintHandler;
use crate::constructive::initial_solution;
use crate::cost::CostDelegate;
use crate::error::{Result, TrspError};
use crate::evaluation::SolutionChecker;
use crate::models::Instance;
use crate::moves::IMPROVEMENT_EPSILON;
use crate::pool::HashTourPool;
use crate::solution::Solution;

/// Cooling horizon used when only a time budget is given.
const DEFAULT_COOLING_HORIZON: usize = 10_000;

/// Life cycle of an [`Alns`] instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlnsState {
    Initialized,
    Running,
    Terminated,
    Exception,
}

/// Outcome of [`Alns::run`].
#[derive(Debug)]
pub struct AlnsResult {
    pub best: Solution,
    pub best_cost: f64,
    pub iterations: usize,
    /// Number of new best solutions found.
    pub improvements: usize,
    pub final_temperature: f64,
    /// `true` if the run was stopped through the cancellation flag.
    pub cancelled: bool,
    pub destroy_weights: Vec<(String, f64)>,
    pub repair_weights: Vec<(String, f64)>,
    pub elapsed: Duration,
    pub state: AlnsState,
    /// Tours of every accepted solution, when collection is enabled.
    pub tour_pool: Option<HashTourPool>,
}

/// Returns `true` if `a` is strictly better than `b`: fewer unserved
/// requests first, then a lower objective.
pub fn is_better(a: &Solution, b: &Solution) -> bool {
    match a.unserved_count().cmp(&b.unserved_count()) {
        std::cmp::Ordering::Less => true,
        std::cmp::Ordering::Greater => false,
        std::cmp::Ordering::Equal => a.objective() < b.objective() - IMPROVEMENT_EPSILON,
    }
}

/// The default destroy set: random, static-related, time-related and
/// critical removal.
pub fn default_destroy_operators(
    instance: &Instance,
    config: &AlnsConfig,
) -> Vec<Box<dyn DestroyOperator>> {
    let p = config.destroy_randomization;
    vec![
        Box::new(RandomDestroy),
        Box::new(StaticRelatedDestroy::new(instance, p, config.relatedness_weights)),
        Box::new(TimeRelatedDestroy::new(p)),
        Box::new(CriticalDestroy::new(p)),
    ]
}

/// One regret operator per configured level, plus noisy copies when noise
/// is enabled.
pub fn default_repair_operators(
    constraints: &Arc<ConstraintHandler>,
    config: &AlnsConfig,
) -> Vec<Box<dyn RepairOperator>> {
    let mut repairs: Vec<Box<dyn RepairOperator>> = config
        .regret_levels
        .iter()
        .map(|&k| Box::new(RegretRepair::new(k, Arc::clone(constraints))) as Box<dyn RepairOperator>)
        .collect();
    if config.noise {
        repairs.extend(config.regret_levels.iter().map(|&k| {
            Box::new(RegretRepair::new(k, Arc::clone(constraints)).with_noise(config.noise_eta))
                as Box<dyn RepairOperator>
        }));
    }
    repairs
}

/// Adaptive large neighborhood search over TRSP solutions.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use trsp_alns::alns::{Alns, AlnsConfig, AlnsState};
/// use trsp_alns::cost::TravelDistance;
/// use trsp_alns::models::{Depot, Instance, Request, Technician, TimeWindow};
///
/// let day = TimeWindow::new(0.0, 500.0).unwrap();
/// let instance = Arc::new(
///     Instance::new(
///         "doc",
///         Depot::new(0.0, 0.0, day),
///         vec![Technician::new(0.0, 0.0, day), Technician::new(10.0, 10.0, day)],
///         (0..8)
///             .map(|i| Request::new(i as f64, (i * 3 % 7) as f64, 1.0))
///             .collect(),
///     )
///     .unwrap(),
/// );
/// let config = AlnsConfig::default().with_max_iterations(50).with_seed(1);
/// let mut alns = Alns::new(&instance, config).unwrap();
/// let result = alns.solve(instance, Arc::new(TravelDistance::new())).unwrap();
///
/// assert_eq!(result.state, AlnsState::Terminated);
/// assert!(result.best.is_complete());
/// assert_eq!(result.iterations, 50);
/// ```
pub struct Alns {
    config: AlnsConfig,
    constraints: Arc<ConstraintHandler>,
    destroy: Vec<Box<dyn DestroyOperator>>,
    repair: Vec<Box<dyn RepairOperator>>,
    checker: Option<SolutionChecker>,
    cancel: Arc<AtomicBool>,
    state: AlnsState,
}

impl Alns {
    /// Creates a search with the default operator sets.
    pub fn new(instance: &Instance, config: AlnsConfig) -> Result<Self> {
        let constraints = Arc::new(ConstraintHandler::from_config(instance, &config.constraints));
        let destroy = default_destroy_operators(instance, &config);
        let repair = default_repair_operators(&constraints, &config);
        let checker = config
            .check_solutions
            .then(|| SolutionChecker::with_config(instance, &config.constraints));
        Self::with_operators(config, constraints, destroy, repair).map(|mut alns| {
            alns.checker = checker;
            alns
        })
    }

    /// Creates a search with explicit operators.
    pub fn with_operators(
        config: AlnsConfig,
        constraints: Arc<ConstraintHandler>,
        destroy: Vec<Box<dyn DestroyOperator>>,
        repair: Vec<Box<dyn RepairOperator>>,
    ) -> Result<Self> {
        config.validate()?;
        if destroy.is_empty() || repair.is_empty() {
            return Err(TrspError::InvalidParameter {
                name: "operators",
                reason: format!(
                    "{} destroy and {} repair operators, at least one of each is required",
                    destroy.len(),
                    repair.len()
                ),
            });
        }
        Ok(Self {
            config,
            constraints,
            destroy,
            repair,
            checker: None,
            cancel: Arc::new(AtomicBool::new(false)),
            state: AlnsState::Initialized,
        })
    }

    /// Checks every neighbor with `checker` and logs inconsistencies.
    pub fn with_checker(mut self, checker: SolutionChecker) -> Self {
        self.checker = Some(checker);
        self
    }

    /// Polls `flag` to stop the search early.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn config(&self) -> &AlnsConfig {
        &self.config
    }

    pub fn constraints(&self) -> &Arc<ConstraintHandler> {
        &self.constraints
    }

    pub fn state(&self) -> AlnsState {
        self.state
    }

    /// Builds an initial solution with regret insertion, then runs.
    pub fn solve(
        &mut self,
        instance: Arc<Instance>,
        cost: Arc<dyn CostDelegate>,
    ) -> Result<AlnsResult> {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let initial = initial_solution(
            instance,
            cost,
            &self.constraints,
            self.config.initial_regret_level,
            &mut rng,
        )?;
        self.run(initial)
    }

    /// Runs the search from `initial`.
    pub fn run(&mut self, initial: Solution) -> Result<AlnsResult> {
        self.run_with(initial, |_, _| {})
    }

    /// Runs the search from `initial`, calling `on_best` with every new best
    /// solution and the iteration it was found at.
    pub fn run_with(
        &mut self,
        initial: Solution,
        on_best: impl FnMut(&Solution, usize),
    ) -> Result<AlnsResult> {
        self.state = AlnsState::Running;
        match self.iterate(initial, on_best) {
            Ok(result) => {
                self.state = AlnsState::Terminated;
                Ok(AlnsResult {
                    state: AlnsState::Terminated,
                    ..result
                })
            }
            Err(err) => {
                self.state = AlnsState::Exception;
                warn!("ALNS aborted: {err}");
                Err(err)
            }
        }
    }

    fn iterate(
        &mut self,
        initial: Solution,
        mut on_best: impl FnMut(&Solution, usize),
    ) -> Result<AlnsResult> {
        let config = &self.config;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut params = config.adaptive_params;
        if !config.adaptive {
            params.reaction = 0.0;
        }
        let mut destroy_handler = ComponentHandler::new(self.destroy.len(), params);
        let mut repair_handler = ComponentHandler::new(self.repair.len(), params);
        let horizon = config.max_iterations.unwrap_or(DEFAULT_COOLING_HORIZON);
        let mut annealing =
            SimulatedAnnealing::from_initial_cost(initial.objective(), horizon, &config.annealing)?;
        let mut stop = StoppingCriterion::new(config.max_iterations, config.max_time)
            .with_cancel_flag(Arc::clone(&self.cancel));
        let mut tour_pool = config.collect_tours.then(|| {
            HashTourPool::new(
                initial.instance(),
                Arc::clone(initial.hasher()),
                config.pool,
            )
        });

        info!(
            "ALNS on {}: initial {:.3} ({} unserved), {} destroy / {} repair operators, T0 {:.3}",
            initial.instance().name(),
            initial.objective(),
            initial.unserved_count(),
            self.destroy.len(),
            self.repair.len(),
            annealing.temperature()
        );

        let mut current = initial;
        let mut best = current.clone();
        if let Some(pool) = tour_pool.as_mut() {
            pool.add_solution(&current);
        }
        let mut improvements = 0;
        let (size_min, size_max) = config.destroy_size;

        stop.start();
        while !stop.is_met() {
            let iteration = stop.iterations() + 1;
            let mut candidate = current.clone();

            let d = destroy_handler.select(&mut rng);
            let size = size_min + rng.random::<f64>() * (size_max - size_min);
            let removed = self.destroy[d].destroy(&mut candidate, size, &mut rng)?;

            let r = repair_handler.select(&mut rng);
            self.repair[r].repair(&mut candidate, &mut rng)?;

            if let Some(checker) = &self.checker {
                let report = checker.check_solution(&candidate);
                if !report.is_empty() {
                    warn!(
                        "iteration {iteration}: {} + {} produced an inconsistent solution: {}",
                        self.destroy[d].name(),
                        self.repair[r].name(),
                        report.join("; ")
                    );
                }
            }

            let improvement = current.objective() - candidate.objective();
            let accepted = match candidate.unserved_count().cmp(&current.unserved_count()) {
                std::cmp::Ordering::Greater => false,
                std::cmp::Ordering::Less => true,
                std::cmp::Ordering::Equal if annealing.is_rejecting_visited() => {
                    annealing.accept_solution(improvement, candidate.hash(), &mut rng)
                }
                std::cmp::Ordering::Equal => annealing.accept(improvement, &mut rng),
            };
            let outcome = if accepted && is_better(&candidate, &best) {
                Outcome::NewBest
            } else if accepted {
                Outcome::Accepted
            } else {
                Outcome::Rejected
            };
            trace!(
                "iteration {iteration}: {} removed {}, {} -> {:.3} ({:?})",
                self.destroy[d].name(),
                removed.len(),
                self.repair[r].name(),
                candidate.objective(),
                outcome
            );

            stop.update();
            destroy_handler.update(d, improvement, iteration, outcome);
            repair_handler.update(r, improvement, iteration, outcome);

            if accepted {
                if let Some(pool) = tour_pool.as_mut() {
                    pool.add_solution(&candidate);
                }
            }
            match outcome {
                Outcome::NewBest => {
                    improvements += 1;
                    debug!(
                        "iteration {iteration}: new best {:.3} ({} unserved) with {} + {}",
                        candidate.objective(),
                        candidate.unserved_count(),
                        self.destroy[d].name(),
                        self.repair[r].name()
                    );
                    best = candidate.clone();
                    on_best(&best, iteration);
                    current = candidate;
                }
                Outcome::Accepted => current = candidate,
                Outcome::Rejected => {}
            }
        }

        let cancelled = stop.is_cancelled();
        info!(
            "ALNS on {}: best {:.3} ({} unserved) after {} iterations, {} improvements, {:.2?}{}",
            best.instance().name(),
            best.objective(),
            best.unserved_count(),
            stop.iterations(),
            improvements,
            stop.elapsed(),
            if cancelled { " (cancelled)" } else { "" }
        );

        Ok(AlnsResult {
            best_cost: best.objective(),
            best,
            iterations: stop.iterations(),
            improvements,
            final_temperature: annealing.temperature(),
            cancelled,
            destroy_weights: self
                .destroy
                .iter()
                .map(|op| op.name())
                .zip(destroy_handler.weights())
                .collect(),
            repair_weights: self
                .repair
                .iter()
                .map(|op| op.name())
                .zip(repair_handler.weights())
                .collect(),
            elapsed: stop.elapsed(),
            state: AlnsState::Running,
            tour_pool,
        })
    }
}

impl fmt::Debug for Alns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alns")
            .field("config", &self.config)
            .field("constraints", &self.constraints.names())
            .field(
                "destroy",
                &self.destroy.iter().map(|d| d.name()).collect::<Vec<_>>(),
            )
            .field(
                "repair",
                &self.repair.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::cost::TravelDistance;
    use crate::models::{AttributeSet, Depot, Request, Technician, TimeWindow};

    fn instance() -> Arc<Instance> {
        let day = TimeWindow::new(0.0, 1000.0).expect("valid");
        let welding = AttributeSet::from_ids(&[0]).expect("valid");
        let requests = (0..12)
            .map(|i| {
                let x = ((i * 37) % 23) as f64;
                let y = ((i * 11) % 17) as f64;
                let r = Request::new(x, y, 2.0);
                if i % 4 == 0 {
                    r.with_skills(welding)
                } else {
                    r
                }
            })
            .collect();
        Arc::new(
            Instance::new(
                "runner",
                Depot::new(10.0, 10.0, day),
                vec![
                    Technician::new(0.0, 0.0, day).with_skills(welding),
                    Technician::new(20.0, 15.0, day),
                ],
                requests,
            )
            .expect("valid instance"),
        )
    }

    fn run(config: AlnsConfig) -> AlnsResult {
        let ins = instance();
        let mut alns = Alns::new(&ins, config).expect("valid config");
        alns.solve(ins, Arc::new(TravelDistance::new())).expect("run")
    }

    #[test]
    fn test_fixed_seed_is_deterministic() {
        let config = AlnsConfig::default().with_max_iterations(200).with_seed(5);
        let a = run(config.clone());
        let b = run(config);
        assert_eq!(a.best.to_routes(), b.best.to_routes());
        assert_eq!(a.best_cost, b.best_cost);
        assert_eq!(a.destroy_weights, b.destroy_weights);
    }

    #[test]
    fn test_best_never_worse_than_initial() {
        let ins = instance();
        let config = AlnsConfig::default()
            .with_max_iterations(150)
            .with_seed(3)
            .with_solution_checks(true);
        let mut alns = Alns::new(&ins, config).expect("valid config");
        let handler = Arc::clone(alns.constraints());
        let mut rng = StdRng::seed_from_u64(3);
        let initial = initial_solution(
            Arc::clone(&ins),
            Arc::new(TravelDistance::new()),
            &handler,
            1,
            &mut rng,
        )
        .expect("initial");
        let initial_cost = initial.objective();

        let mut seen = Vec::new();
        let result = alns
            .run_with(initial, |s, it| seen.push((it, s.objective())))
            .expect("run");
        assert!(result.best_cost <= initial_cost + 1e-9);
        assert_eq!(seen.len(), result.improvements);
        assert!(seen.windows(2).all(|w| w[1].1 <= w[0].1 && w[1].0 > w[0].0));
        assert!(SolutionChecker::new(&ins).is_valid(&result.best));
        assert_eq!(alns.state(), AlnsState::Terminated);
    }

    #[test]
    fn test_cancelled_before_start() {
        let ins = instance();
        let mut alns = Alns::new(&ins, AlnsConfig::default()).expect("valid config");
        alns.cancel_handle().store(true, Ordering::Relaxed);
        let result = alns
            .solve(Arc::clone(&ins), Arc::new(TravelDistance::new()))
            .expect("run");
        assert!(result.cancelled);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.state, AlnsState::Terminated);
    }

    #[test]
    fn test_tour_collection() {
        let result = run(
            AlnsConfig::default()
                .with_max_iterations(50)
                .with_tour_collection(true),
        );
        let pool = result.tour_pool.expect("collected");
        assert!(!pool.is_empty());
    }

    #[test]
    fn test_operator_sets() {
        let ins = instance();
        let alns = Alns::new(&ins, AlnsConfig::default().with_noise(false)).expect("valid");
        let debug = format!("{alns:?}");
        assert!(debug.contains("rel-time"));
        assert!(debug.contains("regret-3"));
        assert!(!debug.contains("-n\""));

        let err = Alns::with_operators(
            AlnsConfig::default(),
            Arc::clone(alns.constraints()),
            Vec::new(),
            Vec::new(),
        )
        .expect_err("no operators");
        assert!(matches!(err, TrspError::InvalidParameter { .. }));
    }

    #[test]
    fn test_is_better_prefers_served_requests() {
        let ins = instance();
        let cost: Arc<dyn CostDelegate> = Arc::new(TravelDistance::new());
        let empty = Solution::new(Arc::clone(&ins), Arc::clone(&cost));
        let mut rng = StdRng::seed_from_u64(0);
        let full = initial_solution(
            Arc::clone(&ins),
            cost,
            &ConstraintHandler::for_instance(&ins),
            2,
            &mut rng,
        )
        .expect("initial");
        assert!(full.objective() > empty.objective());
        assert!(is_better(&full, &empty));
        assert!(!is_better(&empty, &full));
    }
}

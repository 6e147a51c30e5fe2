//! Configuration of a sequential ALNS run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::acceptance::AnnealingParams;
use super::components::AdaptiveParams;
use crate::constraints::ConstraintConfig;
use crate::error::{Result, TrspError};
use crate::pool::PoolConfig;

/// Parameters of [`Alns`](super::Alns).
///
/// Every field has a default, so partial JSON documents are accepted.
///
/// # Examples
///
/// ```
/// use trsp_alns::alns::AlnsConfig;
///
/// let config = AlnsConfig::default()
///     .with_max_iterations(500)
///     .with_seed(7)
///     .with_destroy_size(0.2, 0.3);
/// assert!(config.validate().is_ok());
///
/// let json = r#"{ "max_iterations": 200, "regret_levels": [2] }"#;
/// let config: AlnsConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(config.max_iterations, Some(200));
/// assert_eq!(config.destroy_size, (0.1, 0.4));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlnsConfig {
    pub max_iterations: Option<usize>,
    pub max_time: Option<Duration>,
    pub seed: u64,
    /// Range of the share of removable requests destroyed per iteration.
    pub destroy_size: (f64, f64),
    /// Adaptive weights; when `false` operators are drawn uniformly.
    pub adaptive: bool,
    pub adaptive_params: AdaptiveParams,
    /// Exponent `p` of the randomized selection in related and critical
    /// destroy operators.
    pub destroy_randomization: f64,
    /// Exponents of distance, window end and technician terms of the static
    /// relatedness.
    pub relatedness_weights: (f64, f64, f64),
    /// Regret levels of the repair operators, 1 being greedy.
    pub regret_levels: Vec<usize>,
    /// Adds a noisy copy of every repair operator.
    pub noise: bool,
    pub noise_eta: f64,
    pub annealing: AnnealingParams,
    /// Regret level of the initial solution.
    pub initial_regret_level: usize,
    /// Checks every neighbor and logs inconsistencies.
    pub check_solutions: bool,
    /// Collects the tours of accepted solutions in a [`HashTourPool`](crate::pool::HashTourPool).
    pub collect_tours: bool,
    pub pool: PoolConfig,
    pub constraints: ConstraintConfig,
}

impl Default for AlnsConfig {
    fn default() -> Self {
        Self {
            max_iterations: Some(1000),
            max_time: None,
            seed: 42,
            destroy_size: (0.1, 0.4),
            adaptive: true,
            adaptive_params: AdaptiveParams::default(),
            destroy_randomization: 8.0,
            relatedness_weights: (1.0, 1.0, 1.0),
            regret_levels: vec![1, 2, 3],
            noise: true,
            noise_eta: 0.025,
            annealing: AnnealingParams::default(),
            initial_regret_level: 2,
            check_solutions: false,
            collect_tours: false,
            pool: PoolConfig::default(),
            constraints: ConstraintConfig::default(),
        }
    }
}

impl AlnsConfig {
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    pub fn with_max_time(mut self, max: Duration) -> Self {
        self.max_time = Some(max);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_destroy_size(mut self, min: f64, max: f64) -> Self {
        self.destroy_size = (min, max);
        self
    }

    pub fn with_adaptive(mut self, adaptive: bool) -> Self {
        self.adaptive = adaptive;
        self
    }

    pub fn with_adaptive_params(mut self, params: AdaptiveParams) -> Self {
        self.adaptive_params = params;
        self
    }

    pub fn with_regret_levels(mut self, levels: Vec<usize>) -> Self {
        self.regret_levels = levels;
        self
    }

    pub fn with_noise(mut self, enabled: bool) -> Self {
        self.noise = enabled;
        self
    }

    pub fn with_annealing(mut self, annealing: AnnealingParams) -> Self {
        self.annealing = annealing;
        self
    }

    pub fn with_solution_checks(mut self, enabled: bool) -> Self {
        self.check_solutions = enabled;
        self
    }

    pub fn with_tour_collection(mut self, enabled: bool) -> Self {
        self.collect_tours = enabled;
        self
    }

    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_constraints(mut self, constraints: ConstraintConfig) -> Self {
        self.constraints = constraints;
        self
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        let (min, max) = self.destroy_size;
        if !(0.0..=1.0).contains(&min) || !(0.0..=1.0).contains(&max) || min > max {
            return Err(TrspError::InvalidParameter {
                name: "destroy_size",
                reason: format!("({min}, {max}) is not a range within [0, 1]"),
            });
        }
        if self.max_iterations.is_none() && self.max_time.is_none() {
            return Err(TrspError::InvalidParameter {
                name: "max_iterations",
                reason: "either an iteration or a time budget is required".into(),
            });
        }
        if self.regret_levels.is_empty() || self.regret_levels.contains(&0) {
            return Err(TrspError::InvalidParameter {
                name: "regret_levels",
                reason: format!("{:?} must be non-empty and positive", self.regret_levels),
            });
        }
        let reaction = self.adaptive_params.reaction;
        if !(0.0..=1.0).contains(&reaction) {
            return Err(TrspError::InvalidParameter {
                name: "reaction",
                reason: format!("{reaction} is not in [0, 1]"),
            });
        }
        if self.adaptive_params.segment_length == 0 {
            return Err(TrspError::InvalidParameter {
                name: "segment_length",
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ranges() {
        assert!(AlnsConfig::default().validate().is_ok());
        assert!(AlnsConfig::default()
            .with_destroy_size(0.5, 0.2)
            .validate()
            .is_err());
        assert!(AlnsConfig::default()
            .with_regret_levels(vec![])
            .validate()
            .is_err());

        let unbounded = AlnsConfig {
            max_iterations: None,
            ..AlnsConfig::default()
        };
        assert!(unbounded.validate().is_err());
        assert!(unbounded
            .with_max_time(Duration::from_secs(1))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_json_roundtrip_keeps_fields() {
        let config = AlnsConfig::default().with_seed(9).with_tour_collection(true);
        let json = serde_json::to_string(&config).expect("serialize");
        let back: AlnsConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, config);
    }
}

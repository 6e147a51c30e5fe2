//! Simulated annealing acceptance.
//!
//! A neighbor with improvement `Δ` (positive when better) is accepted when
//! `u < exp(Δ / T)`, so improving neighbors are always accepted. The
//! temperature is multiplied by the cooling rate after every decision.
//!
//! The temperature can be derived from the initial objective `z` so that a
//! solution `w` times worse than `z` is accepted with probability `p`:
//! `T0 = -w z / ln p`. A cooling rate of `alpha^(1/n)` brings the
//! temperature to `alpha T0` after `n` iterations.

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrspError};

/// Parameters of the temperature schedule derived from the initial cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnealingParams {
    /// Relative degradation `w` accepted with probability `p` at start.
    pub w: f64,
    pub p: f64,
    /// Final temperature as a fraction of the initial one.
    pub alpha: f64,
    /// Rejects solutions whose hash was already accepted.
    pub reject_visited: bool,
}

impl Default for AnnealingParams {
    fn default() -> Self {
        Self {
            w: 0.05,
            p: 0.5,
            alpha: 0.002,
            reject_visited: false,
        }
    }
}

/// Simulated annealing acceptance criterion.
///
/// # Examples
///
/// ```
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use trsp_alns::alns::SimulatedAnnealing;
///
/// let mut sa = SimulatedAnnealing::new(10.0, 0.5).unwrap();
/// let mut rng = StdRng::seed_from_u64(0);
/// assert!(sa.accept(1.0, &mut rng));
/// assert!((sa.temperature() - 5.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct SimulatedAnnealing {
    initial_temperature: f64,
    temperature: f64,
    cooling_rate: f64,
    visited: Option<HashSet<u64>>,
}

impl SimulatedAnnealing {
    /// Creates a schedule from an explicit temperature and cooling rate.
    pub fn new(temperature: f64, cooling_rate: f64) -> Result<Self> {
        if !temperature.is_finite() || temperature <= 0.0 {
            return Err(TrspError::InvalidParameter {
                name: "temperature",
                reason: format!("{temperature} is not a positive number"),
            });
        }
        if !(cooling_rate > 0.0 && cooling_rate <= 1.0) {
            return Err(TrspError::InvalidParameter {
                name: "cooling_rate",
                reason: format!("{cooling_rate} is not in (0, 1]"),
            });
        }
        Ok(Self {
            initial_temperature: temperature,
            temperature,
            cooling_rate,
            visited: None,
        })
    }

    /// Derives the schedule from the initial objective `z` and an iteration
    /// budget `iterations`.
    pub fn from_initial_cost(z: f64, iterations: usize, params: &AnnealingParams) -> Result<Self> {
        if !(params.p > 0.0 && params.p < 1.0) {
            return Err(TrspError::InvalidParameter {
                name: "p",
                reason: format!("{} is not in (0, 1)", params.p),
            });
        }
        // an empty solution has no scale, any positive temperature will do
        let scale = if z > 0.0 { z } else { 1.0 };
        let temperature = -params.w * scale / params.p.ln();
        let cooling = params.alpha.powf(1.0 / iterations.max(1) as f64);
        let sa = Self::new(temperature, cooling)?;
        Ok(if params.reject_visited {
            sa.rejecting_visited()
        } else {
            sa
        })
    }

    /// Rejects any solution whose hash was accepted before.
    pub fn rejecting_visited(mut self) -> Self {
        self.visited = Some(HashSet::new());
        self
    }

    pub fn is_rejecting_visited(&self) -> bool {
        self.visited.is_some()
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn initial_temperature(&self) -> f64 {
        self.initial_temperature
    }

    pub fn cooling_rate(&self) -> f64 {
        self.cooling_rate
    }

    /// Restores the initial temperature and forgets visited solutions.
    pub fn reset(&mut self) {
        self.temperature = self.initial_temperature;
        if let Some(visited) = &mut self.visited {
            visited.clear();
        }
    }

    /// Decides on a neighbor with the given improvement, then cools down.
    pub fn accept<R: Rng>(&mut self, improvement: f64, rng: &mut R) -> bool {
        let u: f64 = rng.random();
        let accept = u < (improvement / self.temperature).exp();
        self.temperature *= self.cooling_rate;
        accept
    }

    /// Like [`accept`](Self::accept), also rejecting already visited
    /// solutions when enabled. Accepted hashes are remembered.
    pub fn accept_solution<R: Rng>(&mut self, improvement: f64, hash: u64, rng: &mut R) -> bool {
        if self.visited.as_ref().is_some_and(|v| v.contains(&hash)) {
            self.temperature *= self.cooling_rate;
            return false;
        }
        let accept = self.accept(improvement, rng);
        if accept {
            if let Some(visited) = &mut self.visited {
                visited.insert(hash);
            }
        }
        accept
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(SimulatedAnnealing::new(0.0, 0.5).is_err());
        assert!(SimulatedAnnealing::new(1.0, 1.5).is_err());
        let params = AnnealingParams {
            p: 1.0,
            ..AnnealingParams::default()
        };
        assert!(SimulatedAnnealing::from_initial_cost(100.0, 10, &params).is_err());
    }

    #[test]
    fn test_derived_schedule() {
        let params = AnnealingParams::default();
        let sa = SimulatedAnnealing::from_initial_cost(100.0, 1000, &params).expect("valid");
        let t0 = -0.05 * 100.0 / 0.5_f64.ln();
        assert!((sa.initial_temperature() - t0).abs() < 1e-9);
        assert!((sa.cooling_rate().powi(1000) - 0.002).abs() < 1e-9);
    }

    #[test]
    fn test_temperature_decreases_on_every_call() {
        let mut sa = SimulatedAnnealing::new(8.0, 0.5).expect("valid");
        let mut rng = StdRng::seed_from_u64(1);
        sa.accept(-1.0, &mut rng);
        sa.accept(1.0, &mut rng);
        assert!((sa.temperature() - 2.0).abs() < 1e-12);
        sa.reset();
        assert_eq!(sa.temperature(), 8.0);
    }

    #[test]
    fn test_large_degradation_is_rejected_when_cold() {
        let mut sa = SimulatedAnnealing::new(1e-6, 1.0).expect("valid");
        let mut rng = StdRng::seed_from_u64(2);
        assert!((0..100).all(|_| !sa.accept(-1.0, &mut rng)));
        assert!((0..100).all(|_| sa.accept(0.5, &mut rng)));
    }

    #[test]
    fn test_visited_solutions_are_rejected() {
        let mut sa = SimulatedAnnealing::new(1.0, 1.0)
            .expect("valid")
            .rejecting_visited();
        let mut rng = StdRng::seed_from_u64(3);
        assert!(sa.accept_solution(1.0, 42, &mut rng));
        assert!(!sa.accept_solution(1.0, 42, &mut rng));
        assert!(sa.accept_solution(1.0, 43, &mut rng));
    }
}

//! Adaptive selection of destroy and repair operators.
//!
//! # Algorithm
//!
//! Operators are drawn with a roulette wheel proportional to their weight,
//! starting from `1/n`. During a segment each operator accumulates a score
//! from the outcome of the iterations it took part in: `sigma1` for a new
//! best solution, `sigma2` for an accepted improving solution and `sigma3`
//! for an accepted non-improving one. At the end of a segment the weights of
//! the operators used in the segment are smoothed with the reaction factor
//! `r`, then scores and counts are reset.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Outcome of an ALNS iteration, used to score the operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The neighbor is a new global best.
    NewBest,
    /// The neighbor was accepted as the current solution.
    Accepted,
    /// The neighbor was rejected.
    Rejected,
}

/// How segment scores turn into new weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeightUpdate {
    /// `w = (1 - r) w + r * score / uses`, for operators used in the segment.
    #[default]
    ScorePerUse,
    /// `w = (1 - r) w + r * score / total score`, for every operator.
    ShareOfScore,
}

/// Scoring parameters of the adaptive layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveParams {
    pub sigma1: f64,
    pub sigma2: f64,
    pub sigma3: f64,
    /// Reaction factor `r` in `[0, 1]`.
    pub reaction: f64,
    /// Number of iterations per segment.
    pub segment_length: usize,
    pub weight_update: WeightUpdate,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            sigma1: 33.0,
            sigma2: 9.0,
            sigma3: 13.0,
            reaction: 0.1,
            segment_length: 100,
            weight_update: WeightUpdate::ScorePerUse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Stats {
    weight: f64,
    score: f64,
    count: usize,
}

/// Roulette-wheel selector over `n` operators with segment-based weights.
///
/// # Examples
///
/// ```
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use trsp_alns::alns::{AdaptiveParams, ComponentHandler, Outcome};
///
/// let params = AdaptiveParams { segment_length: 2, ..AdaptiveParams::default() };
/// let mut handler = ComponentHandler::new(2, params);
/// assert_eq!(handler.weights(), vec![0.5, 0.5]);
///
/// handler.update(0, 1.0, 1, Outcome::NewBest);
/// handler.update(1, 0.0, 2, Outcome::Rejected);
/// assert!(handler.weight(0) > handler.weight(1));
///
/// let mut rng = StdRng::seed_from_u64(3);
/// assert!(handler.select(&mut rng) < 2);
/// ```
#[derive(Debug, Clone)]
pub struct ComponentHandler {
    params: AdaptiveParams,
    stats: Vec<Stats>,
}

impl ComponentHandler {
    pub fn new(count: usize, params: AdaptiveParams) -> Self {
        let mut handler = Self {
            params,
            stats: Vec::with_capacity(count),
        };
        handler.stats = vec![
            Stats {
                weight: 0.0,
                score: 0.0,
                count: 0,
            };
            count
        ];
        handler.reset();
        handler
    }

    /// Restores the initial weights and clears the scores.
    pub fn reset(&mut self) {
        let initial = if self.stats.is_empty() {
            0.0
        } else {
            1.0 / self.stats.len() as f64
        };
        for s in &mut self.stats {
            *s = Stats {
                weight: initial,
                score: 0.0,
                count: 0,
            };
        }
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn params(&self) -> &AdaptiveParams {
        &self.params
    }

    pub fn weight(&self, component: usize) -> f64 {
        self.stats[component].weight
    }

    pub fn weights(&self) -> Vec<f64> {
        self.stats.iter().map(|s| s.weight).collect()
    }

    /// Score accumulated in the current segment.
    pub fn score(&self, component: usize) -> f64 {
        self.stats[component].score
    }

    /// Number of uses in the current segment.
    pub fn uses(&self, component: usize) -> usize {
        self.stats[component].count
    }

    /// Draws an operator index proportionally to the weights.
    ///
    /// Falls back to a uniform draw when every weight is zero.
    pub fn select<R: Rng>(&self, rng: &mut R) -> usize {
        let total: f64 = self.stats.iter().map(|s| s.weight).sum();
        if total <= 0.0 || !total.is_finite() {
            return rng.random_range(0..self.stats.len());
        }
        let mut target = rng.random::<f64>() * total;
        for (i, s) in self.stats.iter().enumerate() {
            if target < s.weight {
                return i;
            }
            target -= s.weight;
        }
        self.stats.len() - 1
    }

    /// Records the outcome of `component` at `iteration`.
    ///
    /// The boundary iteration of a segment still counts toward it: its score
    /// is recorded, then the weights are updated and the segment statistics
    /// reset. Returns `true` if the weights changed.
    pub fn update(
        &mut self,
        component: usize,
        improvement: f64,
        iteration: usize,
        outcome: Outcome,
    ) -> bool {
        let score = match outcome {
            Outcome::NewBest => self.params.sigma1,
            Outcome::Accepted if improvement > 0.0 => self.params.sigma2,
            Outcome::Accepted => self.params.sigma3,
            Outcome::Rejected => 0.0,
        };
        let stats = &mut self.stats[component];
        stats.score += score;
        stats.count += 1;

        let boundary =
            self.params.segment_length > 0 && iteration % self.params.segment_length == 0;
        if boundary {
            self.update_weights();
        }
        boundary
    }

    fn update_weights(&mut self) {
        let r = self.params.reaction;
        match self.params.weight_update {
            WeightUpdate::ScorePerUse => {
                for s in self.stats.iter_mut().filter(|s| s.count > 0) {
                    s.weight = (1.0 - r) * s.weight + r * s.score / s.count as f64;
                }
            }
            WeightUpdate::ShareOfScore => {
                let mut total: f64 = self.stats.iter().map(|s| s.score).sum();
                if total == 0.0 {
                    total = 1.0;
                }
                for s in &mut self.stats {
                    s.weight = (1.0 - r) * s.weight + r * s.score / total;
                }
            }
        }
        for s in &mut self.stats {
            s.score = 0.0;
            s.count = 0;
        }
    }
}

//! Elite pool balancing solution quality and diversity.
//!
//! # Algorithm
//!
//! Each member gets two ranks: its objective rank (0 = best) and its
//! diversity rank (0 = largest average distance to the other members). The
//! fitness of a member is
//!
//! ```text
//! fitness = ((1 - alpha) * obj_rank + alpha * div_rank) / size
//! ```
//!
//! except for the best and the most diverse members whose fitness is 0.
//! When the pool overflows, the member with the largest fitness leaves.
//! `alpha` is multiplied by the cooling rate at every insertion attempt, so
//! the pool gradually favours quality over diversity.
//!
//! # Reference
//!
//! Vidal, T., Crainic, T.G., Gendreau, M. & Prins, C. (2012). "A Hybrid
//! Genetic Algorithm for Multidepot and Periodic Vehicle Routing Problems",
//! *Operations Research* 60(3), 611-624.

use std::collections::HashSet;
use std::fmt;

use crate::cost::levenshtein;
use crate::solution::Solution;

/// Distance between two solutions.
pub trait DiversityMetric: Send + Sync + fmt::Debug {
    fn distance(&self, a: &Solution, b: &Solution) -> f64;
}

/// Sum over technicians of the edit distance between their tours.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevenshteinDiversity;

impl DiversityMetric for LevenshteinDiversity {
    fn distance(&self, a: &Solution, b: &Solution) -> f64 {
        a.tours()
            .iter()
            .zip(b.tours())
            .map(|(x, y)| levenshtein(&x.to_vec(), &y.to_vec()))
            .sum::<usize>() as f64
    }
}

/// Bounded pool of elite solutions.
#[derive(Debug)]
pub struct DiversifiedPool {
    capacity: usize,
    alpha: f64,
    cooling_rate: f64,
    metric: Box<dyn DiversityMetric>,
    members: Vec<Solution>,
    hashes: HashSet<u64>,
    /// Pairwise distances, `distances[i][j]` between members `i` and `j`.
    distances: Vec<Vec<f64>>,
}

impl DiversifiedPool {
    /// Creates a pool holding at most `capacity` solutions (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            alpha: 0.5,
            cooling_rate: 1.0,
            metric: Box::new(LevenshteinDiversity),
            members: Vec::new(),
            hashes: HashSet::new(),
            distances: Vec::new(),
        }
    }

    /// Initial weight of the diversity rank.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    pub fn with_cooling_rate(mut self, rate: f64) -> Self {
        self.cooling_rate = rate;
        self
    }

    pub fn with_metric(mut self, metric: impl DiversityMetric + 'static) -> Self {
        self.metric = Box::new(metric);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn solutions(&self) -> &[Solution] {
        &self.members
    }

    /// Member with the lowest objective.
    pub fn best(&self) -> Option<&Solution> {
        self.members
            .iter()
            .min_by(|a, b| a.objective().total_cmp(&b.objective()))
    }

    /// Offers a solution to the pool.
    ///
    /// Returns `true` if the solution is a member afterwards.
    pub fn add(&mut self, solution: &Solution) -> bool {
        self.alpha *= self.cooling_rate;
        let hash = solution.hash();
        if self.hashes.contains(&hash) {
            return false;
        }

        let row: Vec<f64> = self
            .members
            .iter()
            .map(|m| self.metric.distance(solution, m))
            .collect();
        for (existing, &d) in self.distances.iter_mut().zip(&row) {
            existing.push(d);
        }
        let mut row = row;
        row.push(0.0);
        self.distances.push(row);
        self.members.push(solution.clone());
        self.hashes.insert(hash);

        if self.members.len() <= self.capacity {
            return true;
        }
        let worst = self.worst();
        self.remove(worst);
        worst != self.members.len()
    }

    pub fn clear(&mut self) {
        self.members.clear();
        self.hashes.clear();
        self.distances.clear();
    }

    /// Fitness of every member, lower is better.
    pub fn fitness(&self) -> Vec<f64> {
        let n = self.members.len();
        if n == 0 {
            return Vec::new();
        }
        let diversity: Vec<f64> = (0..n)
            .map(|i| {
                if n == 1 {
                    0.0
                } else {
                    self.distances[i].iter().sum::<f64>() / (n - 1) as f64
                }
            })
            .collect();

        let mut by_objective: Vec<usize> = (0..n).collect();
        by_objective.sort_by(|&a, &b| {
            self.members[a]
                .objective()
                .total_cmp(&self.members[b].objective())
        });
        let mut by_diversity: Vec<usize> = (0..n).collect();
        by_diversity.sort_by(|&a, &b| diversity[b].total_cmp(&diversity[a]));

        let mut obj_rank = vec![0; n];
        let mut div_rank = vec![0; n];
        for (rank, &i) in by_objective.iter().enumerate() {
            obj_rank[i] = rank;
        }
        for (rank, &i) in by_diversity.iter().enumerate() {
            div_rank[i] = rank;
        }

        (0..n)
            .map(|i| {
                if obj_rank[i] == 0 || div_rank[i] == 0 {
                    0.0
                } else {
                    ((1.0 - self.alpha) * obj_rank[i] as f64 + self.alpha * div_rank[i] as f64)
                        / n as f64
                }
            })
            .collect()
    }

    /// Index of the member to evict: largest fitness, then worst objective.
    fn worst(&self) -> usize {
        let fitness = self.fitness();
        (0..self.members.len())
            .max_by(|&a, &b| {
                fitness[a].total_cmp(&fitness[b]).then(
                    self.members[a]
                        .objective()
                        .total_cmp(&self.members[b].objective()),
                )
            })
            .unwrap_or(0)
    }

    fn remove(&mut self, index: usize) {
        let removed = self.members.remove(index);
        self.hashes.remove(&removed.hash());
        self.distances.remove(index);
        for row in &mut self.distances {
            row.remove(index);
        }
    }
}

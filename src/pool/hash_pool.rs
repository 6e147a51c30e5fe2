//! Tour pool keyed by technician and structural hash.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::SolutionHasher;
use crate::error::{Result, TrspError};
use crate::evaluation::SolutionChecker;
use crate::models::Instance;
use crate::solution::Solution;
use crate::tour::Tour;

/// Settings of a [`HashTourPool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Compare the sequences of tours sharing a hash and count mismatches.
    pub count_collisions: bool,
    /// Tours shorter than this (homes included) are not stored.
    pub min_tour_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            count_collisions: false,
            min_tour_size: 3,
        }
    }
}

impl PoolConfig {
    pub fn with_collision_count(mut self, enabled: bool) -> Self {
        self.count_collisions = enabled;
        self
    }

    pub fn with_min_tour_size(mut self, size: usize) -> Self {
        self.min_tour_size = size;
        self
    }
}

/// Snapshot of a tour stored in the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PooledTour {
    pub technician: usize,
    pub nodes: Vec<usize>,
    pub cost: f64,
    pub hash: u64,
}

impl PooledTour {
    /// Requests served by the tour, given the instance it was built on.
    pub fn requests<'a>(&'a self, instance: &'a Instance) -> impl Iterator<Item = usize> + 'a {
        self.nodes.iter().copied().filter(|&n| instance.is_request(n))
    }
}

/// Deduplicated collection of feasible tours.
///
/// A tour whose hash is already present replaces the stored one only if it
/// is cheaper. Infeasible tours are ignored with a warning.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use trsp_alns::cost::TravelDistance;
/// use trsp_alns::models::{Depot, Instance, Request, Technician, TimeWindow};
/// use trsp_alns::pool::{GroerHasher, HashTourPool, PoolConfig};
/// use trsp_alns::solution::Solution;
///
/// let day = TimeWindow::new(0.0, 100.0).unwrap();
/// let instance = Arc::new(
///     Instance::new(
///         "doc",
///         Depot::new(0.0, 0.0, day),
///         vec![Technician::new(0.0, 0.0, day)],
///         vec![Request::new(3.0, 4.0, 0.0)],
///     )
///     .unwrap(),
/// );
/// let solution = Solution::from_routes(
///     Arc::clone(&instance),
///     Arc::new(TravelDistance::new()),
///     &[vec![1, 2, 3]],
/// )
/// .unwrap();
///
/// let hasher = Arc::new(GroerHasher::new(instance.max_id(), 0));
/// let mut pool = HashTourPool::new(&instance, hasher, PoolConfig::default());
/// assert_eq!(pool.add_solution(&solution), 1);
/// assert_eq!(pool.add_solution(&solution), 0);
/// assert_eq!(pool.len(), 1);
/// ```
#[derive(Debug)]
pub struct HashTourPool {
    pools: Vec<HashMap<u64, PooledTour>>,
    hasher: Arc<dyn SolutionHasher>,
    checker: SolutionChecker,
    config: PoolConfig,
    size: usize,
    collisions: usize,
}

impl HashTourPool {
    pub fn new(instance: &Instance, hasher: Arc<dyn SolutionHasher>, config: PoolConfig) -> Self {
        Self {
            pools: vec![HashMap::new(); instance.technician_count()],
            hasher,
            checker: SolutionChecker::new(instance),
            config,
            size: 0,
            collisions: 0,
        }
    }

    pub fn config(&self) -> PoolConfig {
        self.config
    }

    pub fn hasher(&self) -> &Arc<dyn SolutionHasher> {
        &self.hasher
    }

    /// Adds tours to the pool; returns the number of new entries.
    pub fn add<'a>(&mut self, tours: impl IntoIterator<Item = &'a Tour>) -> usize {
        let mut added = 0;
        for tour in tours {
            if tour.len() < self.config.min_tour_size {
                continue;
            }
            if let Some(explanation) = self.checker.check_tour(tour) {
                warn!(
                    "ignoring infeasible tour of technician {}: {explanation}",
                    tour.technician()
                );
                continue;
            }
            let Some(pool) = self.pools.get_mut(tour.technician()) else {
                warn!("ignoring tour of unknown technician {}", tour.technician());
                continue;
            };
            let hash = self.hasher.hash_tour(tour);
            match pool.get_mut(&hash) {
                Some(stored) => {
                    if self.config.count_collisions
                        && !stored.nodes.iter().copied().eq(tour.iter())
                    {
                        self.collisions += 1;
                        debug!("hash collision on {hash:#x} for technician {}", tour.technician());
                    }
                    if tour.total_cost() < stored.cost {
                        *stored = Self::snapshot(tour, hash);
                    }
                }
                None => {
                    pool.insert(hash, Self::snapshot(tour, hash));
                    self.size += 1;
                    added += 1;
                }
            }
        }
        added
    }

    /// Adds the tours of a solution.
    pub fn add_solution(&mut self, solution: &Solution) -> usize {
        self.add(solution.tours())
    }

    /// Moves the tours of `other` into this pool; returns the number of new
    /// entries. Both pools must use the same hasher.
    pub fn merge(&mut self, mut other: HashTourPool) -> usize {
        let mut added = 0;
        for tour in other.drain() {
            let Some(pool) = self.pools.get_mut(tour.technician) else {
                continue;
            };
            match pool.get_mut(&tour.hash) {
                Some(stored) => {
                    if self.config.count_collisions && stored.nodes != tour.nodes {
                        self.collisions += 1;
                    }
                    if tour.cost < stored.cost {
                        *stored = tour;
                    }
                }
                None => {
                    pool.insert(tour.hash, tour);
                    self.size += 1;
                    added += 1;
                }
            }
        }
        added
    }

    /// Number of stored tours.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of hash collisions between different sequences.
    pub fn collision_count(&self) -> Result<usize> {
        if self.config.count_collisions {
            Ok(self.collisions)
        } else {
            Err(TrspError::NotSupported {
                component: "hash tour pool",
                operation: "collision count without collision counting enabled",
            })
        }
    }

    /// Stored tours, ordered by technician then hash.
    pub fn tours(&self) -> Vec<&PooledTour> {
        let mut tours: Vec<&PooledTour> = self.pools.iter().flat_map(|p| p.values()).collect();
        tours.sort_by_key(|t| (t.technician, t.hash));
        tours
    }

    /// Empties the pool and returns its tours, ordered as in [`Self::tours`].
    pub fn drain(&mut self) -> Vec<PooledTour> {
        let mut tours: Vec<PooledTour> = self
            .pools
            .iter_mut()
            .flat_map(|p| p.drain().map(|(_, t)| t))
            .collect();
        tours.sort_by_key(|t| (t.technician, t.hash));
        self.size = 0;
        tours
    }

    pub fn clear(&mut self) {
        for pool in &mut self.pools {
            pool.clear();
        }
        self.size = 0;
    }

    fn snapshot(tour: &Tour, hash: u64) -> PooledTour {
        PooledTour {
            technician: tour.technician(),
            nodes: tour.to_vec(),
            cost: tour.total_cost(),
            hash,
        }
    }
}

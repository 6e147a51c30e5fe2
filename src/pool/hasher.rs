//! Structural hashing of tours.
//!
//! # Algorithm
//!
//! A table of random integers is drawn once. The hash of a visiting
//! sequence XORs the entry indexed by `prev + node` for every edge, starting
//! from the entry of the technician. Two tours with the same edges in the
//! same order hash identically; the XOR of tour hashes identifies a
//! solution.
//!
//! # Reference
//!
//! Groër, C., Golden, B. & Wasil, E. (2011). "A parallel algorithm for the
//! vehicle routing problem", *INFORMS Journal on Computing* 23(2), 315-330.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::solution::Solution;
use crate::tour::Tour;

/// Hash function over tours and solutions.
pub trait SolutionHasher: Send + Sync + fmt::Debug {
    /// Hash of a visiting sequence of `technician`.
    fn hash_sequence(&self, technician: usize, sequence: &[usize]) -> u64;

    fn hash_tour(&self, tour: &Tour) -> u64 {
        self.hash_sequence(tour.technician(), &tour.to_vec())
    }

    fn hash_solution(&self, solution: &Solution) -> u64 {
        solution
            .tours()
            .iter()
            .fold(0, |h, tour| h ^ self.hash_tour(tour))
    }
}

/// Random-table hasher.
///
/// # Examples
///
/// ```
/// use trsp_alns::pool::{GroerHasher, SolutionHasher};
///
/// let hasher = GroerHasher::new(16, 42);
/// let a = hasher.hash_sequence(0, &[1, 5, 7, 9]);
/// assert_eq!(a, hasher.hash_sequence(0, &[1, 5, 7, 9]));
/// assert_ne!(a, hasher.hash_sequence(0, &[1, 7, 5, 9]));
/// ```
#[derive(Debug, Clone)]
pub struct GroerHasher {
    table: Vec<u64>,
}

impl GroerHasher {
    /// Draws a table of `size` random integers from `seed`.
    pub fn new(size: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let table = (0..size.max(1)).map(|_| rng.random::<u64>()).collect();
        Self { table }
    }

    fn entry(&self, index: usize) -> u64 {
        self.table[index % self.table.len()]
    }
}

impl SolutionHasher for GroerHasher {
    fn hash_sequence(&self, technician: usize, sequence: &[usize]) -> u64 {
        sequence
            .windows(2)
            .fold(self.entry(technician), |h, w| h ^ self.entry(w[0] + w[1]))
    }

    fn hash_tour(&self, tour: &Tour) -> u64 {
        let mut h = self.entry(tour.technician());
        let mut nodes = tour.iter();
        if let Some(mut prev) = nodes.next() {
            for node in nodes {
                h ^= self.entry(prev + node);
                prev = node;
            }
        }
        h
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::moves::test_support::open_instance;

    #[test]
    fn test_tour_and_sequence_agree() {
        let ins = open_instance(&[(1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        let hasher = GroerHasher::new(ins.max_id(), 7);
        let tour = Tour::from_sequence(Arc::clone(&ins), 0, &[1, 3, 2, 4, 5]).expect("valid");
        assert_eq!(hasher.hash_tour(&tour), hasher.hash_sequence(0, &tour.to_vec()));
    }

    #[test]
    fn test_seed_changes_table() {
        let a = GroerHasher::new(32, 1);
        let b = GroerHasher::new(32, 2);
        assert_ne!(a.hash_sequence(0, &[1, 2, 3]), b.hash_sequence(0, &[1, 2, 3]));
        assert_eq!(
            GroerHasher::new(32, 1).hash_sequence(3, &[4, 9]),
            a.hash_sequence(3, &[4, 9])
        );
    }
}

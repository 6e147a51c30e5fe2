//! Intra-tour 2-opt.
//!
//! # Algorithm
//!
//! Removing the edges `(i, succ(i))` and `(m, succ(m))` and reconnecting
//! `i -> m` and `succ(i) -> succ(m)` reverses the sub-path
//! `succ(i) ..= m`. A move is identified by the two ends of that sub-path.
//!
//! ```text
//! before:  i  f  x  y  m  j
//! after:   i  m  y  x  f  j
//! ```
//!
//! Time windows and resources cannot be updated with an arithmetic delta
//! through a reversed sub-path, so cost delegates refresh the whole tour
//! after execution.
//!
//! # Complexity
//!
//! O(n²) candidates per tour.
//!
//! # Reference
//!
//! Croes, G.A. (1958). "A method for solving traveling salesman problems",
//! *Operations Research* 6(6), 791-812.

use crate::constraints::ConstraintHandler;
use crate::cost::CostDelegate;
use crate::error::Result;
use crate::tour::{Tour, UNDEFINED};

use super::{keep_best, unsupported, ExplorationStrategy, Move, TourNeighborhood};

/// Reverses the sub-path `first ..= second`.
#[derive(Debug, Clone, PartialEq)]
pub struct TwoOptMove {
    technician: usize,
    first: usize,
    second: usize,
    improvement: f64,
}

impl TwoOptMove {
    /// `first` must be visited before `second`.
    pub fn new(technician: usize, first: usize, second: usize) -> Self {
        Self {
            technician,
            first,
            second,
            improvement: 0.0,
        }
    }

    pub fn technician(&self) -> usize {
        self.technician
    }

    pub fn first(&self) -> usize {
        self.first
    }

    pub fn second(&self) -> usize {
        self.second
    }

    pub fn improvement(&self) -> f64 {
        self.improvement
    }

    pub fn set_improvement(&mut self, improvement: f64) {
        self.improvement = improvement;
    }

    /// Nodes of the reversed sub-path, in their new order.
    pub fn reversed_segment(&self, tour: &Tour) -> Vec<usize> {
        let mut segment = Vec::new();
        let mut node = self.first;
        while node != UNDEFINED {
            segment.push(node);
            if node == self.second {
                break;
            }
            node = tour.succ(node);
        }
        segment.reverse();
        segment
    }

    pub fn resulting_sequence(&self, tour: &Tour) -> Vec<usize> {
        let mut seq = Vec::with_capacity(tour.len());
        let mut node = tour.first();
        while node != UNDEFINED {
            if node == self.first {
                seq.extend(self.reversed_segment(tour));
                node = tour.succ(self.second);
                continue;
            }
            seq.push(node);
            node = tour.succ(node);
        }
        seq
    }

    pub fn execute(&self, tour: &mut Tour) -> Result<()> {
        tour.reverse_subtour(self.first, self.second)
    }
}

/// Explores every 2-opt move of a tour.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoOptNeighborhood;

impl TourNeighborhood for TwoOptNeighborhood {
    fn name(&self) -> &'static str {
        "2-opt"
    }

    fn explore(
        &self,
        tour: &Tour,
        cost: &dyn CostDelegate,
        constraints: &ConstraintHandler,
        strategy: ExplorationStrategy,
    ) -> Result<Option<Move>> {
        if !self.supports(strategy) {
            return Err(unsupported("2-opt neighborhood", strategy));
        }
        if tour.len() < 4 {
            return Ok(None);
        }
        let first_improvement = strategy.is_first_improvement();
        let technician = tour.technician();
        let mut best: Option<Move> = None;

        let mut i = tour.first();
        while i != UNDEFINED {
            let first = tour.succ(i);
            if first == UNDEFINED {
                break;
            }
            let mut second = tour.succ(first);
            // the reversed sub-path never includes the last node
            while second != UNDEFINED && tour.succ(second) != UNDEFINED {
                let mut mv = Move::TwoOpt(TwoOptMove::new(technician, first, second));
                cost.evaluate_move(tour, &mut mv);
                if mv.is_improving() {
                    let code = constraints.check_move(tour, &mv);
                    if !code.is_feasible() {
                        break;
                    }
                    if first_improvement {
                        return Ok(Some(mv));
                    }
                    keep_best(&mut best, mv);
                }
                second = tour.succ(second);
            }
            i = first;
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::constraints::ConstraintHandler;
    use crate::cost::{CostDelegate, TravelDistance};
    use crate::moves::test_support::open_instance;

    #[test]
    fn test_reverse_inner_pair() {
        // home, A, B, C, D, home'
        let ins = open_instance(&[(1.0, 0.0), (3.0, 1.0), (2.0, 1.0), (4.0, 0.0)]);
        let (a, b, c, d) = (2, 3, 4, 5);
        let cost = TravelDistance::new();
        let mut tour = Tour::from_sequence(Arc::clone(&ins), 0, &[1, a, b, c, d, 6]).expect("valid");
        let before = cost.evaluate_tour(&mut tour);

        let mut mv = Move::TwoOpt(TwoOptMove::new(0, b, c));
        let improvement = cost.evaluate_move(&tour, &mut mv);
        mv.execute(&mut tour).expect("execute");
        cost.move_executed(&mut tour, &mv, improvement);

        assert_eq!(tour.to_vec(), vec![1, a, c, b, d, 6]);
        let expected = before - ins.distance(a, b) - ins.distance(c, d)
            + ins.distance(a, c)
            + ins.distance(b, d);
        assert!((tour.total_cost() - expected).abs() < 1e-3);
        assert!((before - improvement - expected).abs() < 1e-3);
    }

    #[test]
    fn test_explore_untangles_crossing() {
        let ins = open_instance(&[(1.0, 0.0), (3.0, 1.0), (2.0, 1.0), (4.0, 0.0)]);
        let handler = ConstraintHandler::for_instance(&ins);
        let cost = TravelDistance::new();
        let mut tour = Tour::from_sequence(Arc::clone(&ins), 0, &[1, 2, 3, 4, 5, 6]).expect("valid");
        cost.evaluate_tour(&mut tour);

        let mv = TwoOptNeighborhood
            .explore(&tour, &cost, &handler, ExplorationStrategy::DeterministicFirstImprovement)
            .expect("supported")
            .expect("improving");
        assert!(mv.is_improving());
        let before = tour.total_cost();
        mv.execute(&mut tour).expect("execute");
        cost.move_executed(&mut tour, &mv, mv.improvement());
        assert!(tour.total_cost() < before);
        assert_eq!(tour.first(), 1);
        assert_eq!(tour.last(), 6);
    }

    #[test]
    fn test_short_tour_has_no_move() {
        let ins = open_instance(&[(1.0, 0.0)]);
        let handler = ConstraintHandler::for_instance(&ins);
        let tour = Tour::from_sequence(Arc::clone(&ins), 0, &[1, 2, 3]).expect("valid");
        let found = TwoOptNeighborhood
            .explore(&tour, &TravelDistance::new(), &handler, ExplorationStrategy::DeterministicBestImprovement)
            .expect("supported");
        assert!(found.is_none());
    }
}

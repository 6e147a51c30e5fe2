//! Cost delegates and objectives.
//!
//! A [`CostDelegate`] prices tours and moves. It is the only component that
//! turns travel data into cost: tours, neighborhoods and operators never sum
//! distances themselves.
//!
//! - [`TravelDistance`]: total Euclidean travel distance
//! - [`WorkingTime`]: minimal working time of each technician
//! - [`TourBalance`]: spread of the tour costs between technicians
//! - [`Objective`]: solution-level measure used by bi-objective drivers,
//!   with [`CostObjective`] and [`RouteConsistency`]

mod balance;
mod distance;
mod objective;
mod working_time;

pub use balance::{DeviationMeasure, TourBalance};
pub use distance::TravelDistance;
pub use objective::{levenshtein, CostObjective, Objective, RouteConsistency};
pub use working_time::{sequence_working_time, WorkingTime};

use std::fmt;

use crate::models::Instance;
use crate::moves::{InsertionMove, Move, ShiftMove};
use crate::solution::Solution;
use crate::tour::{Tour, UNDEFINED};

/// Pluggable cost strategy.
///
/// Implementations are shared between threads behind an
/// [`Arc`](std::sync::Arc) and must not hold mutable state.
pub trait CostDelegate: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Cost of visiting `sequence` with the given technician.
    fn sequence_cost(&self, instance: &Instance, technician: usize, sequence: &[usize]) -> f64;

    /// Cost of a tour, ignoring the stored value.
    fn tour_cost(&self, tour: &Tour) -> f64 {
        self.sequence_cost(tour.instance(), tour.technician(), &tour.to_vec())
    }

    /// Re-evaluates a tour and stores its cost.
    fn evaluate_tour(&self, tour: &mut Tour) -> f64 {
        let cost = self.tour_cost(tour);
        tour.set_total_cost(cost);
        cost
    }

    /// Cost increase of serving `node` between `pred` and `succ`.
    ///
    /// Either neighbour may be [`UNDEFINED`].
    fn evaluate_detour(&self, tour: &Tour, pred: usize, node: usize, succ: usize) -> f64 {
        let mut seq = Vec::with_capacity(tour.len() + 1);
        let before_succ = pred == UNDEFINED;
        if before_succ && succ == UNDEFINED {
            seq.push(node);
        }
        for n in tour {
            if before_succ && n == succ {
                seq.push(node);
            }
            seq.push(n);
            if n == pred {
                seq.push(node);
            }
        }
        self.sequence_cost(tour.instance(), tour.technician(), &seq) - self.tour_cost(tour)
    }

    /// Cost increase of an insertion, depot trip included.
    fn insertion_cost(&self, tour: &Tour, mv: &InsertionMove) -> f64 {
        let seq = mv.resulting_sequence(tour);
        self.sequence_cost(tour.instance(), tour.technician(), &seq) - self.tour_cost(tour)
    }

    /// Improvement of `mv` on `tour`, positive when the cost decreases.
    ///
    /// For a relocate, `tour` is the destination tour and the removal part
    /// keeps its stored improvement.
    fn move_improvement(&self, tour: &Tour, mv: &Move) -> f64 {
        match mv {
            Move::Insertion(m) => -self.insertion_cost(tour, m),
            Move::Relocate(r) => r.removal().improvement() - self.insertion_cost(tour, r.insertion()),
            _ => {
                let seq = mv.resulting_sequence(tour);
                self.tour_cost(tour) - self.sequence_cost(tour.instance(), tour.technician(), &seq)
            }
        }
    }

    /// Evaluates a move and stores its improvement.
    fn evaluate_move(&self, tour: &Tour, mv: &mut Move) -> f64 {
        let improvement = self.move_improvement(tour, mv);
        mv.set_improvement(improvement);
        improvement
    }

    /// Updates the stored cost after `shift` was executed.
    fn node_shifted(&self, tour: &mut Tour, shift: &ShiftMove, improvement: f64) {
        let _ = (shift, improvement);
        self.evaluate_tour(tour);
    }

    /// Updates the stored cost after `mv` was executed on `tour`.
    ///
    /// `improvement` was computed right before execution.
    fn move_executed(&self, tour: &mut Tour, mv: &Move, improvement: f64) {
        match mv {
            Move::Shift(s) => self.node_shifted(tour, s, improvement),
            _ => {
                self.evaluate_tour(tour);
            }
        }
    }

    /// Penalty per unserved request.
    fn unserved_penalty(&self) -> f64 {
        0.0
    }

    /// Sum of the stored tour costs plus the unserved penalty.
    fn evaluate_solution(&self, solution: &Solution) -> f64 {
        let tours: f64 = solution.tours().iter().map(Tour::total_cost).sum();
        tours + self.unserved_penalty() * solution.unserved_count() as f64
    }
}

//! Travel distance cost with closed-form move deltas.

use serde::{Deserialize, Serialize};

use super::CostDelegate;
use crate::models::Instance;
use crate::moves::{InsertionMove, Move, ShiftMove};
use crate::tour::{Tour, UNDEFINED};

/// Total Euclidean travel distance of the tours.
///
/// Insertion, removal and shift deltas are computed from the distances of
/// the edges they add and remove. 2-opt relies on symmetric distances for
/// its estimate and the tour is re-evaluated after execution.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use trsp_alns::cost::{CostDelegate, TravelDistance};
/// use trsp_alns::models::{Depot, Instance, Request, Technician, TimeWindow};
/// use trsp_alns::tour::Tour;
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
/// let mut tour = Tour::from_sequence(instance, 0, &[1, 2, 3]).unwrap();
/// assert!((TravelDistance::new().evaluate_tour(&mut tour) - 10.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TravelDistance {
    unserved_penalty: f64,
}

impl TravelDistance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the penalty charged per unserved request.
    pub fn with_unserved_penalty(mut self, penalty: f64) -> Self {
        self.unserved_penalty = penalty;
        self
    }

    fn edge(instance: &Instance, from: usize, to: usize) -> f64 {
        if from == UNDEFINED || to == UNDEFINED {
            0.0
        } else {
            instance.distance(from, to)
        }
    }

    fn removal_saving(tour: &Tour, node: usize) -> f64 {
        let ins = tour.instance();
        let pred = tour.pred(node);
        let succ = tour.succ(node);
        Self::edge(ins, pred, node) + Self::edge(ins, node, succ) - Self::edge(ins, pred, succ)
    }

    fn shift_improvement(tour: &Tour, shift: &ShiftMove) -> f64 {
        let node = shift.node();
        let q = shift.new_succ();
        let a = if tour.pred(q) == node {
            tour.pred(node)
        } else {
            tour.pred(q)
        };
        let ins = tour.instance();
        let insertion =
            Self::edge(ins, a, node) + Self::edge(ins, node, q) - Self::edge(ins, a, q);
        Self::removal_saving(tour, node) - insertion
    }
}

impl CostDelegate for TravelDistance {
    fn name(&self) -> &'static str {
        "travel distance"
    }

    fn sequence_cost(&self, instance: &Instance, _technician: usize, sequence: &[usize]) -> f64 {
        sequence
            .windows(2)
            .map(|w| instance.distance(w[0], w[1]))
            .sum()
    }

    fn tour_cost(&self, tour: &Tour) -> f64 {
        let ins = tour.instance();
        tour.iter()
            .map(|n| Self::edge(ins, n, tour.succ(n)))
            .sum()
    }

    fn evaluate_detour(&self, tour: &Tour, pred: usize, node: usize, succ: usize) -> f64 {
        let ins = tour.instance();
        Self::edge(ins, pred, node) + Self::edge(ins, node, succ) - Self::edge(ins, pred, succ)
    }

    fn insertion_cost(&self, tour: &Tour, mv: &InsertionMove) -> f64 {
        let (pred, node, succ) = (mv.pred(), mv.node(), mv.succ());
        let Some(trip) = mv.depot_trip() else {
            return self.evaluate_detour(tour, pred, node, succ);
        };
        let ins = tour.instance();
        let depot = ins.main_depot_duplicate(tour.technician());
        if trip.pred == pred {
            Self::edge(ins, pred, depot) + Self::edge(ins, depot, node) + Self::edge(ins, node, succ)
                - Self::edge(ins, pred, succ)
        } else {
            self.evaluate_detour(tour, trip.pred, depot, trip.succ)
                + self.evaluate_detour(tour, pred, node, succ)
        }
    }

    fn move_improvement(&self, tour: &Tour, mv: &Move) -> f64 {
        match mv {
            Move::Insertion(m) => -self.insertion_cost(tour, m),
            Move::Removal(m) => Self::removal_saving(tour, m.node()),
            Move::Shift(m) => Self::shift_improvement(tour, m),
            Move::TwoOpt(m) => {
                let ins = tour.instance();
                let before = tour.pred(m.first());
                let after = tour.succ(m.second());
                Self::edge(ins, before, m.first()) + Self::edge(ins, m.second(), after)
                    - Self::edge(ins, before, m.second())
                    - Self::edge(ins, m.first(), after)
            }
            Move::Relocate(r) => r.removal().improvement() - self.insertion_cost(tour, r.insertion()),
        }
    }

    fn node_shifted(&self, tour: &mut Tour, _shift: &ShiftMove, improvement: f64) {
        let cost = tour.total_cost() - improvement;
        tour.set_total_cost(cost);
    }

    fn move_executed(&self, tour: &mut Tour, mv: &Move, improvement: f64) {
        match mv {
            Move::Insertion(_) | Move::Removal(_) => {
                let cost = tour.total_cost() - improvement;
                tour.set_total_cost(cost);
            }
            Move::Shift(s) => self.node_shifted(tour, s, improvement),
            Move::TwoOpt(_) | Move::Relocate(_) => {
                self.evaluate_tour(tour);
            }
        }
    }

    fn unserved_penalty(&self) -> f64 {
        self.unserved_penalty
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::moves::test_support::open_instance;
    use crate::moves::{RemovalMove, TwoOptMove};

    fn points() -> Vec<(f64, f64)> {
        vec![(1.0, 2.0), (4.0, 1.0), (3.0, 5.0), (6.0, 2.0), (2.0, 7.0), (5.0, 5.0)]
    }

    #[test]
    fn test_depot_trip_cost() {
        let ins = open_instance(&[(3.0, 0.0), (6.0, 0.0)]);
        let depot = ins.main_depot_duplicate(0);
        let cost = TravelDistance::new();
        let tour = Tour::from_sequence(Arc::clone(&ins), 0, &[1, 2, 4]).expect("valid");

        for mv in [
            InsertionMove::new(0, 3, 2, 4).with_depot_trip(2, 4),
            InsertionMove::new(0, 3, 2, 4).with_depot_trip(1, 2),
        ] {
            let seq = mv.resulting_sequence(&tour);
            let expected = cost.sequence_cost(&ins, 0, &seq) - cost.tour_cost(&tour);
            assert!((cost.insertion_cost(&tour, &mv) - expected).abs() < 1e-10);
            assert_eq!(seq.iter().filter(|&&n| n == depot).count(), 1);
        }
    }

    #[test]
    fn test_closed_forms_match_sequences() {
        let ins = open_instance(&points());
        let cost = TravelDistance::new();
        let tour = Tour::from_sequence(Arc::clone(&ins), 0, &[1, 2, 3, 4, 5, 6, 7, 8]).expect("valid");
        let generic = |mv: &Move| {
            cost.tour_cost(&tour) - cost.sequence_cost(&ins, 0, &mv.resulting_sequence(&tour))
        };

        let moves = [
            Move::Removal(RemovalMove::new(0, 4)),
            Move::Shift(ShiftMove::new(0, 3, 7, true)),
            Move::Shift(ShiftMove::new(0, 6, 2, false)),
            Move::TwoOpt(TwoOptMove::new(0, 3, 6)),
        ];
        for mv in &moves {
            assert!(
                (cost.move_improvement(&tour, mv) - generic(mv)).abs() < 1e-9,
                "{} delta mismatch",
                mv.name()
            );
        }
    }

    #[test]
    fn test_penalty() {
        let cost = TravelDistance::new().with_unserved_penalty(50.0);
        assert_eq!(cost.unserved_penalty(), 50.0);
        assert_eq!(TravelDistance::new().unserved_penalty(), 0.0);
    }

    proptest! {
        #[test]
        fn prop_incremental_cost_matches(ops in proptest::collection::vec((0usize..3, 0usize..6, 0usize..8), 1..30)) {
            let ins = open_instance(&points());
            let cost = TravelDistance::new();
            let mut tour = Tour::with_home(Arc::clone(&ins), 0);
            cost.evaluate_tour(&mut tour);
            let requests: Vec<usize> = ins.request_ids().collect();

            for (op, a, b) in ops {
                let node = requests[a];
                let order = tour.to_vec();
                let mv = match op {
                    0 if !tour.is_visited(node) => {
                        let pred = order[b % (order.len() - 1)];
                        Move::Insertion(InsertionMove::new(0, node, pred, tour.succ(pred)))
                    }
                    1 if tour.is_visited(node) => Move::Removal(RemovalMove::new(0, node)),
                    2 if tour.is_visited(node) => {
                        let q = order[1 + b % (order.len() - 1)];
                        if q == node || q == tour.succ(node) {
                            continue;
                        }
                        let forward = order.iter().position(|&n| n == q)
                            > order.iter().position(|&n| n == node);
                        Move::Shift(ShiftMove::new(0, node, q, forward))
                    }
                    _ => continue,
                };
                let improvement = cost.move_improvement(&tour, &mv);
                mv.execute(&mut tour).expect("valid move");
                cost.move_executed(&mut tour, &mv, improvement);
                prop_assert!((tour.total_cost() - cost.tour_cost(&tour)).abs() < 1e-3);
            }
        }
    }
}

use super::{FeasibilityCode, TourConstraint, Violation};
use crate::cost::{sequence_working_time, CostDelegate, WorkingTime};
use crate::moves::{InsertionMove, Move, RemovalMove, ShiftMove, TwoOptMove};
use crate::tour::Tour;

const TOLERANCE: f64 = 1e-6;

/// Working time of a tour stays within a bound.
///
/// The working time is measured with [`WorkingTime`]; moves are checked by
/// simulating the resulting sequence.
#[derive(Debug, Clone, Copy)]
pub struct MaxDurationConstraint {
    max_duration: f64,
    measure: WorkingTime,
}

impl MaxDurationConstraint {
    pub fn new(max_duration: f64) -> Self {
        Self {
            max_duration,
            measure: WorkingTime::new(),
        }
    }

    pub fn max_duration(&self) -> f64 {
        self.max_duration
    }

    fn check_sequence(&self, tour: &Tour, mv: Move) -> FeasibilityCode {
        let sequence = mv.resulting_sequence(tour);
        let duration = sequence_working_time(tour.instance(), &sequence);
        FeasibilityCode::from_feasible(duration <= self.max_duration + TOLERANCE)
    }
}

impl TourConstraint for MaxDurationConstraint {
    fn name(&self) -> &'static str {
        "max duration"
    }

    fn check_tour(&self, tour: &Tour) -> Option<Violation> {
        let duration = self.measure.tour_cost(tour);
        (duration > self.max_duration + TOLERANCE).then(|| Violation {
            node: tour.last(),
            reason: format!(
                "working time {duration:.2} exceeds the bound of {:.2}",
                self.max_duration
            ),
        })
    }

    fn check_insertion(&self, tour: &Tour, mv: &InsertionMove) -> FeasibilityCode {
        self.check_sequence(tour, Move::Insertion(mv.clone()))
    }

    fn check_removal(&self, tour: &Tour, mv: &RemovalMove) -> FeasibilityCode {
        self.check_sequence(tour, Move::Removal(mv.clone()))
    }

    fn check_shift(&self, tour: &Tour, mv: &ShiftMove) -> FeasibilityCode {
        self.check_sequence(tour, Move::Shift(mv.clone()))
    }

    fn check_two_opt(&self, tour: &Tour, mv: &TwoOptMove) -> FeasibilityCode {
        self.check_sequence(tour, Move::TwoOpt(mv.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::moves::test_support::open_instance;

    #[test]
    fn test_long_detour_exceeds_the_bound() {
        let ins = open_instance(&[(10.0, 0.0), (40.0, 0.0)]);
        let constraint = MaxDurationConstraint::new(30.0);
        let tour = Tour::from_sequence(Arc::clone(&ins), 0, &[1, 2, 4]).expect("valid");
        assert!(constraint.is_feasible(&tour));

        let far = InsertionMove::new(0, 3, 2, 4);
        assert_eq!(
            constraint.check_insertion(&tour, &far),
            FeasibilityCode::INFEASIBLE_CONTINUE
        );

        let long = Tour::from_sequence(ins, 0, &[1, 3, 4]).expect("valid");
        assert_eq!(constraint.first_infeasible_node(&long), 4);
        assert!(constraint.check_removal(&long, &RemovalMove::new(0, 3)).is_feasible());
    }
}

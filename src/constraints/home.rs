use super::{FeasibilityCode, TourConstraint, Violation};
use crate::moves::{InsertionMove, RemovalMove, ShiftMove, TwoOptMove};
use crate::tour::{Tour, UNDEFINED};

/// Tours start at the technician's home and end at its duplicate.
#[derive(Debug, Clone, Copy, Default)]
pub struct HomeConstraint;

impl HomeConstraint {
    fn is_bracket(tour: &Tour, node: usize) -> bool {
        let ins = tour.instance();
        node == ins.home(tour.technician()) || node == ins.home_duplicate(tour.technician())
    }
}

impl TourConstraint for HomeConstraint {
    fn name(&self) -> &'static str {
        "home"
    }

    fn check_tour(&self, tour: &Tour) -> Option<Violation> {
        if tour.is_empty() {
            return None;
        }
        let ins = tour.instance();
        let t = tour.technician();
        if tour.first() != ins.home(t) {
            return Some(Violation {
                node: tour.first(),
                reason: format!("tour starts at {} instead of home {}", tour.first(), ins.home(t)),
            });
        }
        if tour.last() != ins.home_duplicate(t) {
            return Some(Violation {
                node: tour.last(),
                reason: format!(
                    "tour ends at {} instead of home {}",
                    tour.last(),
                    ins.home_duplicate(t)
                ),
            });
        }
        None
    }

    fn check_insertion(&self, tour: &Tour, mv: &InsertionMove) -> FeasibilityCode {
        if mv.succ() == UNDEFINED {
            return FeasibilityCode::INFEASIBLE;
        }
        if mv.pred() == UNDEFINED || Self::is_bracket(tour, mv.node()) {
            return FeasibilityCode::INFEASIBLE_CONTINUE;
        }
        match mv.depot_trip() {
            Some(trip) if trip.pred == UNDEFINED || trip.succ == UNDEFINED => {
                FeasibilityCode::INFEASIBLE_CONTINUE
            }
            _ => FeasibilityCode::FEASIBLE,
        }
    }

    fn check_removal(&self, tour: &Tour, mv: &RemovalMove) -> FeasibilityCode {
        FeasibilityCode::from_feasible(!Self::is_bracket(tour, mv.node()))
    }

    fn check_shift(&self, tour: &Tour, mv: &ShiftMove) -> FeasibilityCode {
        let feasible = !Self::is_bracket(tour, mv.node())
            && mv.new_succ() != tour.first()
            && mv.new_succ() != UNDEFINED;
        FeasibilityCode::from_feasible(feasible)
    }

    fn check_two_opt(&self, tour: &Tour, mv: &TwoOptMove) -> FeasibilityCode {
        FeasibilityCode::from_feasible(mv.first() != tour.first() && mv.second() != tour.last())
    }
}

use super::{FeasibilityCode, TourConstraint, Violation};
use crate::moves::{InsertionMove, ShiftMove, TwoOptMove};
use crate::tour::{Tour, UNDEFINED};

/// Every visit starts before its time window closes.
///
/// Move checks replay the arrival times of the modified region only and
/// compare the arrival at the first unchanged node with its cached latest
/// feasible arrival.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeWindowConstraint;

impl TimeWindowConstraint {
    fn check_depot_trip(tour: &Tour, mv: &InsertionMove, pred: usize, succ: usize) -> FeasibilityCode {
        let depot = tour.instance().main_depot_duplicate(tour.technician());
        let feasible = if pred == mv.pred() {
            tour.is_time_feasible_sequence(mv.pred(), &[depot, mv.node()], mv.succ())
        } else {
            // depot first, then the unchanged nodes up to the request
            let mut sequence = vec![depot];
            let mut node = succ;
            while node != UNDEFINED && node != mv.succ() {
                sequence.push(node);
                if node == mv.pred() {
                    sequence.push(mv.node());
                }
                node = tour.succ(node);
            }
            tour.is_time_feasible_sequence(pred, &sequence, mv.succ())
        };
        FeasibilityCode::from_feasible(feasible)
    }
}

impl TourConstraint for TimeWindowConstraint {
    fn name(&self) -> &'static str {
        "time windows"
    }

    fn check_tour(&self, tour: &Tour) -> Option<Violation> {
        let ins = tour.instance();
        tour.iter()
            .find(|&n| ins.time_window(n).is_violated(tour.earliest_arrival(n)))
            .map(|node| Violation {
                node,
                reason: format!(
                    "arrival at {:.2} after the window closes at {:.2}",
                    tour.earliest_arrival(node),
                    ins.time_window(node).end()
                ),
            })
    }

    fn check_insertion(&self, tour: &Tour, mv: &InsertionMove) -> FeasibilityCode {
        if let Some(trip) = mv.depot_trip() {
            return Self::check_depot_trip(tour, mv, trip.pred, trip.succ);
        }
        if mv.pred() == UNDEFINED {
            return FeasibilityCode::from_feasible(tour.is_time_feasible_sequence(
                UNDEFINED,
                &[mv.node()],
                mv.succ(),
            ));
        }
        let ins = tour.instance();
        let arrival = ins.arrival_time(mv.node(), mv.pred(), tour.earliest_arrival(mv.pred()));
        if ins.time_window(mv.node()).is_violated(arrival) {
            // later predecessors only arrive later
            return FeasibilityCode::INFEASIBLE;
        }
        if mv.succ() == UNDEFINED {
            return FeasibilityCode::FEASIBLE;
        }
        let next = ins.arrival_time(mv.succ(), mv.node(), arrival);
        FeasibilityCode::from_feasible(next <= tour.latest_feasible_arrival(mv.succ()))
    }

    fn check_shift(&self, tour: &Tour, mv: &ShiftMove) -> FeasibilityCode {
        let changed = mv.changed_sequence(tour);
        FeasibilityCode::from_feasible(tour.is_time_feasible_sequence(
            changed.before,
            &changed.sequence,
            changed.after,
        ))
    }

    fn check_two_opt(&self, tour: &Tour, mv: &TwoOptMove) -> FeasibilityCode {
        let segment = mv.reversed_segment(tour);
        FeasibilityCode::from_feasible(tour.is_time_feasible_sequence(
            tour.pred(mv.first()),
            &segment,
            tour.succ(mv.second()),
        ))
    }
}

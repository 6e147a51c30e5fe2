use super::{FeasibilityCode, TourConstraint, Violation};
use crate::moves::{InsertionMove, RelocateMove, RemovalMove, ShiftMove, TwoOptMove};
use crate::tour::{Tour, UNDEFINED};

/// Committed visits stay where the simulator put them.
///
/// In a dynamic setting every technician starts with a committed prefix of
/// visits that were already served or assigned. Those visits keep their
/// technician and their order right after the home node, and nothing can be
/// inserted in between.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServicedRequestsConstraint;

impl ServicedRequestsConstraint {
    fn is_committed(tour: &Tour, node: usize) -> bool {
        node != UNDEFINED && tour.instance().is_committed(node)
    }
}

impl TourConstraint for ServicedRequestsConstraint {
    fn name(&self) -> &'static str {
        "serviced requests"
    }

    fn check_tour(&self, tour: &Tour) -> Option<Violation> {
        let ins = tour.instance();
        let committed = ins.committed(tour.technician());
        let mut visits = tour.iter().skip(1);
        for (i, &expected) in committed.iter().enumerate() {
            match visits.next() {
                Some(node) if node == expected => {}
                found => {
                    return Some(Violation {
                        node: found.unwrap_or(UNDEFINED),
                        reason: format!("committed visit #{i} should be node {expected}"),
                    })
                }
            }
        }
        visits
            .find(|&n| ins.is_committed(n))
            .map(|node| Violation {
                node,
                reason: format!("node {node} is committed elsewhere"),
            })
    }

    fn check_insertion(&self, tour: &Tour, mv: &InsertionMove) -> FeasibilityCode {
        if Self::is_committed(tour, mv.node()) {
            return FeasibilityCode::INFEASIBLE;
        }
        let trip_ok = mv
            .depot_trip()
            .map_or(true, |trip| !Self::is_committed(tour, trip.succ));
        FeasibilityCode::from_feasible(!Self::is_committed(tour, mv.succ()) && trip_ok)
    }

    fn check_removal(&self, tour: &Tour, mv: &RemovalMove) -> FeasibilityCode {
        FeasibilityCode::from_feasible(!Self::is_committed(tour, mv.node()))
    }

    fn check_shift(&self, tour: &Tour, mv: &ShiftMove) -> FeasibilityCode {
        FeasibilityCode::from_feasible(
            !Self::is_committed(tour, mv.node()) && !Self::is_committed(tour, mv.new_succ()),
        )
    }

    fn check_two_opt(&self, tour: &Tour, mv: &TwoOptMove) -> FeasibilityCode {
        FeasibilityCode::from_feasible(
            !Self::is_committed(tour, mv.first()) && !Self::is_committed(tour, mv.second()),
        )
    }

    fn check_relocate(&self, tour: &Tour, mv: &RelocateMove) -> FeasibilityCode {
        if Self::is_committed(tour, mv.node()) {
            return FeasibilityCode::INFEASIBLE_CONTINUE;
        }
        self.check_insertion(tour, mv.insertion())
    }
}

use super::{depot_visited_after, FeasibilityCode, TourConstraint, Violation};
use crate::models::{AttributeSet, Instance};
use crate::moves::{InsertionMove, Move, RemovalMove, ShiftMove, TwoOptMove};
use crate::tour::Tour;

/// Requests are served with their tools, either carried from home or
/// picked up at a main-depot visit earlier in the tour.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolsConstraint;

/// First node of `sequence` whose tools are missing.
fn first_missing_tool(instance: &Instance, technician: usize, sequence: &[usize]) -> Option<usize> {
    let mut tools = instance.technician(technician).tools();
    for &node in sequence {
        if instance.is_main_depot(node) {
            tools = AttributeSet::all();
        } else if !tools.contains_all(instance.required_tools(node)) {
            return Some(node);
        }
    }
    None
}

impl ToolsConstraint {
    fn replay(tour: &Tour, mv: Move) -> FeasibilityCode {
        let sequence = mv.resulting_sequence(tour);
        FeasibilityCode::from_feasible(
            first_missing_tool(tour.instance(), tour.technician(), &sequence).is_none(),
        )
    }
}

impl TourConstraint for ToolsConstraint {
    fn name(&self) -> &'static str {
        "tools"
    }

    fn check_tour(&self, tour: &Tour) -> Option<Violation> {
        let ins = tour.instance();
        tour.requests()
            .find(|&r| !tour.available_tools(r).contains_all(ins.required_tools(r)))
            .map(|node| Violation {
                node,
                reason: format!("tools required by request {node} are not available"),
            })
    }

    fn check_insertion(&self, tour: &Tour, mv: &InsertionMove) -> FeasibilityCode {
        let ins = tour.instance();
        if mv.depot_trip().is_some() {
            // the request always follows the new depot visit
            return FeasibilityCode::from_feasible(tour.main_depot_visit().is_none());
        }
        let required = ins.required_tools(mv.node());
        if required.is_empty() || ins.is_main_depot(mv.node()) {
            return FeasibilityCode::FEASIBLE;
        }
        let available = if tour.is_visited(mv.pred()) {
            tour.available_tools(mv.pred())
        } else {
            ins.technician(tour.technician()).tools()
        };
        if available.contains_all(required) {
            FeasibilityCode::FEASIBLE
        } else if tour.is_visited(mv.pred()) && depot_visited_after(tour, mv.pred()) {
            FeasibilityCode::INFEASIBLE_CONTINUE
        } else {
            FeasibilityCode::INFEASIBLE
        }
    }

    fn check_removal(&self, tour: &Tour, mv: &RemovalMove) -> FeasibilityCode {
        if !tour.instance().is_main_depot(mv.node()) {
            return FeasibilityCode::FEASIBLE;
        }
        Self::replay(tour, Move::Removal(mv.clone()))
    }

    fn check_shift(&self, tour: &Tour, mv: &ShiftMove) -> FeasibilityCode {
        let ins = tour.instance();
        if ins.is_main_depot(mv.node()) {
            return Self::replay(tour, Move::Shift(mv.clone()));
        }
        let new_pred = tour.pred(mv.new_succ());
        let available = if tour.is_visited(new_pred) {
            tour.available_tools(new_pred)
        } else {
            ins.technician(tour.technician()).tools()
        };
        FeasibilityCode::from_feasible(available.contains_all(ins.required_tools(mv.node())))
    }

    fn check_two_opt(&self, tour: &Tour, mv: &TwoOptMove) -> FeasibilityCode {
        let ins = tour.instance();
        let segment = mv.reversed_segment(tour);
        if !segment.iter().any(|&n| ins.is_main_depot(n)) {
            return FeasibilityCode::FEASIBLE;
        }
        Self::replay(tour, Move::TwoOpt(mv.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{Depot, Instance, Request, Technician, TimeWindow};

    /// Request 2 needs a drill the technician does not carry.
    fn instance() -> Arc<Instance> {
        let day = TimeWindow::new(0.0, 1000.0).expect("valid");
        let drill = AttributeSet::from_ids(&[0]).expect("valid");
        Arc::new(
            Instance::new(
                "tools",
                Depot::new(5.0, 5.0, day),
                vec![Technician::new(0.0, 0.0, day)],
                vec![
                    Request::new(10.0, 0.0, 1.0).with_tools(drill),
                    Request::new(20.0, 0.0, 1.0),
                ],
            )
            .expect("valid instance"),
        )
    }

    #[test]
    fn test_tool_requires_depot_before_request() {
        let ins = instance();
        let depot = ins.main_depot_duplicate(0);
        let tour = Tour::from_sequence(Arc::clone(&ins), 0, &[1, 3, depot, 4]).expect("valid");

        let before_depot = InsertionMove::new(0, 2, 1, 3);
        assert_eq!(
            ToolsConstraint.check_insertion(&tour, &before_depot),
            FeasibilityCode::INFEASIBLE_CONTINUE
        );
        let after_depot = InsertionMove::new(0, 2, depot, 4);
        assert_eq!(ToolsConstraint.check_insertion(&tour, &after_depot), FeasibilityCode::FEASIBLE);

        let bare = Tour::from_sequence(Arc::clone(&ins), 0, &[1, 3, 4]).expect("valid");
        assert_eq!(
            ToolsConstraint.check_insertion(&bare, &InsertionMove::new(0, 2, 1, 3)),
            FeasibilityCode::INFEASIBLE
        );
        let trip = InsertionMove::new(0, 2, 1, 3).with_depot_trip(1, 3);
        assert!(ToolsConstraint.check_insertion(&bare, &trip).is_feasible());
    }

    #[test]
    fn test_required_depot_cannot_be_removed_or_passed() {
        let ins = instance();
        let depot = ins.main_depot_duplicate(0);
        let tour = Tour::from_sequence(Arc::clone(&ins), 0, &[1, depot, 2, 3, 4]).expect("valid");
        assert!(ToolsConstraint.is_feasible(&tour));

        assert!(!ToolsConstraint
            .check_removal(&tour, &RemovalMove::new(0, depot))
            .is_feasible());
        // shifting the request in front of the depot
        assert!(!ToolsConstraint
            .check_shift(&tour, &ShiftMove::new(0, 2, depot, false))
            .is_feasible());
        assert!(ToolsConstraint
            .check_shift(&tour, &ShiftMove::new(0, 2, 4, true))
            .is_feasible());
        // reversing depot and request puts the request first
        assert!(!ToolsConstraint
            .check_two_opt(&tour, &TwoOptMove::new(0, depot, 2))
            .is_feasible());
        assert!(ToolsConstraint
            .check_two_opt(&tour, &TwoOptMove::new(0, 2, 3))
            .is_feasible());
    }
}

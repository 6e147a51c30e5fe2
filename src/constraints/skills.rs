use super::{FeasibilityCode, TourConstraint, Violation};
use crate::moves::{InsertionMove, ShiftMove, TwoOptMove};
use crate::tour::Tour;

/// Technicians hold every skill required by the requests they serve.
///
/// Skills are intrinsic to the request, so reordering a tour never changes
/// its feasibility.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkillsConstraint;

impl TourConstraint for SkillsConstraint {
    fn name(&self) -> &'static str {
        "skills"
    }

    fn check_tour(&self, tour: &Tour) -> Option<Violation> {
        let ins = tour.instance();
        let skills = ins.technician(tour.technician()).skills();
        tour.requests()
            .find(|&r| !skills.contains_all(ins.required_skills(r)))
            .map(|node| Violation {
                node,
                reason: format!(
                    "technician {} lacks a skill required by request {node}",
                    tour.technician()
                ),
            })
    }

    fn check_insertion(&self, tour: &Tour, mv: &InsertionMove) -> FeasibilityCode {
        let ins = tour.instance();
        let skills = ins.technician(tour.technician()).skills();
        if skills.contains_all(ins.required_skills(mv.node())) {
            FeasibilityCode::FEASIBLE
        } else {
            FeasibilityCode::INFEASIBLE
        }
    }

    fn check_shift(&self, _tour: &Tour, _mv: &ShiftMove) -> FeasibilityCode {
        FeasibilityCode::FEASIBLE
    }

    fn check_two_opt(&self, _tour: &Tour, _mv: &TwoOptMove) -> FeasibilityCode {
        FeasibilityCode::FEASIBLE
    }
}

//! Solution checker that re-derives everything from scratch.

use std::collections::HashMap;

use crate::constraints::{ConstraintConfig, ConstraintHandler};
use crate::models::Instance;
use crate::solution::Solution;
use crate::tour::Tour;

const COST_TOLERANCE: f64 = 1e-6;

/// Checks tours and solutions against the constraints, the partition of
/// requests and the cached costs.
///
/// Every check walks the tour again instead of trusting the move-level
/// feasibility codes, which makes the checker suitable for catching bugs in
/// incremental code.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use trsp_alns::cost::TravelDistance;
/// use trsp_alns::evaluation::SolutionChecker;
/// use trsp_alns::models::{Depot, Instance, Request, Technician, TimeWindow};
/// use trsp_alns::solution::Solution;
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
/// let solution =
///     Solution::from_routes(Arc::clone(&instance), Arc::new(TravelDistance::new()), &[vec![1, 2, 3]])
///         .unwrap();
///
/// let checker = SolutionChecker::new(&instance);
/// assert!(checker.is_valid(&solution));
/// assert_eq!(checker.report(&solution), "");
/// ```
#[derive(Debug)]
pub struct SolutionChecker {
    constraints: ConstraintHandler,
}

impl SolutionChecker {
    pub fn new(instance: &Instance) -> Self {
        Self {
            constraints: ConstraintHandler::for_instance(instance),
        }
    }

    pub fn with_config(instance: &Instance, config: &ConstraintConfig) -> Self {
        Self {
            constraints: ConstraintHandler::from_config(instance, config),
        }
    }

    pub fn constraints(&self) -> &ConstraintHandler {
        &self.constraints
    }

    /// Explanation of the constraint violations of a tour.
    pub fn check_tour(&self, tour: &Tour) -> Option<String> {
        self.constraints.infeasibility_explanation(tour)
    }

    /// Every inconsistency found in a solution, empty when it is valid.
    pub fn check_solution(&self, solution: &Solution) -> Vec<String> {
        let instance = solution.instance();
        let mut problems = Vec::new();

        let mut owner: HashMap<usize, usize> = HashMap::new();
        for tour in solution.tours() {
            let t = tour.technician();
            if let Some(explanation) = self.check_tour(tour) {
                problems.push(format!("t{t}: {explanation}"));
            }
            for r in tour.requests() {
                if let Some(other) = owner.insert(r, t) {
                    problems.push(format!("request {r} is visited by t{other} and t{t}"));
                }
                if solution.unserved().contains(&r) {
                    problems.push(format!("request {r} is served by t{t} and marked unserved"));
                }
            }
            let cost = solution.cost_delegate().tour_cost(tour);
            if (cost - tour.total_cost()).abs() > COST_TOLERANCE {
                problems.push(format!(
                    "t{t}: cached cost {:.6} differs from {cost:.6}",
                    tour.total_cost()
                ));
            }
        }
        for r in instance.request_ids() {
            if !owner.contains_key(&r) && !solution.unserved().contains(&r) {
                problems.push(format!("request {r} is neither served nor unserved"));
            }
        }

        let objective = solution.cost_delegate().evaluate_solution(solution);
        if (objective - solution.objective()).abs() > COST_TOLERANCE {
            problems.push(format!(
                "cached objective {:.6} differs from {objective:.6}",
                solution.objective()
            ));
        }
        problems
    }

    pub fn is_valid(&self, solution: &Solution) -> bool {
        self.check_solution(solution).is_empty()
    }

    /// All inconsistencies joined in a single line, empty when valid.
    pub fn report(&self, solution: &Solution) -> String {
        self.check_solution(solution).join("; ")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cost::TravelDistance;
    use crate::models::{Depot, Request, Technician, TimeWindow};

    fn instance() -> Arc<Instance> {
        let day = TimeWindow::new(0.0, 100.0).expect("valid");
        Arc::new(
            Instance::new(
                "checker",
                Depot::new(0.0, 0.0, day),
                vec![Technician::new(0.0, 0.0, day)],
                vec![
                    Request::new(10.0, 0.0, 0.0)
                        .with_time_window(TimeWindow::new(0.0, 15.0).expect("valid")),
                    Request::new(20.0, 0.0, 0.0),
                ],
            )
            .expect("valid instance"),
        )
    }

    #[test]
    fn test_valid_solution() {
        let ins = instance();
        let checker = SolutionChecker::new(&ins);
        let solution =
            Solution::from_routes(Arc::clone(&ins), Arc::new(TravelDistance::new()), &[vec![1, 2, 4]])
                .expect("valid routes");
        assert!(checker.check_solution(&solution).is_empty());
        assert!(checker.check_tour(solution.tour(0)).is_none());
    }

    #[test]
    fn test_infeasible_tour_and_partition() {
        let ins = instance();
        let checker = SolutionChecker::new(&ins);
        let mut solution = Solution::from_routes(
            Arc::clone(&ins),
            Arc::new(TravelDistance::new()),
            &[vec![1, 3, 2, 4]],
        )
        .expect("valid routes");

        let report = checker.report(&solution);
        assert!(report.contains("time windows"));

        solution.mark_unserved(3);
        let problems = checker.check_solution(&solution);
        assert!(problems.iter().any(|p| p.contains("marked unserved")));
    }
}

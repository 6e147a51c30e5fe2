//! Regret-k insertion of unserved requests.
//!
//! # Algorithm
//!
//! For every pending request the cheapest feasible insertion into each tour
//! is stored in a `request x tour` matrix. Each round ranks the pending
//! requests by their regret and inserts the one with the largest regret at
//! its best position. Only the column of the modified tour is re-evaluated
//! afterwards, since the other tours did not change.
//!
//! With level `k`, the regret of a request is the sum of the gaps between
//! its `k - 1` next-best tours and its best one. Level 1 is the plain
//! greedy heuristic: the regret is the opposite of the best cost. Requests
//! with fewer than `k` feasible tours only sum the gaps they have.
//!
//! # Complexity
//!
//! O(n · m) insertion searches to fill the matrix, then O(n) searches per
//! inserted request.
//!
//! # Reference
//!
//! Ropke, S. & Pisinger, D. (2006). "An Adaptive Large Neighborhood Search
//! Heuristic for the Pickup and Delivery Problem with Time Windows",
//! *Transportation Science* 40(4), 455-472.

use std::sync::Arc;

use log::trace;
use rand::Rng;
use rayon::prelude::*;

use crate::constraints::ConstraintHandler;
use crate::cost::CostDelegate;
use crate::error::{Result, TrspError};
use crate::moves::{find_insertion, InsertionMove, Move};
use crate::solution::Solution;
use crate::tour::Tour;

/// Best insertion of one request into one tour, with its ranking cost.
#[derive(Debug, Clone)]
struct Candidate {
    mv: InsertionMove,
    cost: f64,
}

/// Regret-k insertion heuristic.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use trsp_alns::constraints::ConstraintHandler;
/// use trsp_alns::constructive::RegretInsertion;
/// use trsp_alns::cost::TravelDistance;
/// use trsp_alns::models::{Depot, Instance, Request, Technician, TimeWindow};
/// use trsp_alns::solution::Solution;
///
/// let day = TimeWindow::new(0.0, 100.0).unwrap();
/// let instance = Arc::new(
///     Instance::new(
///         "doc",
///         Depot::new(0.0, 0.0, day),
///         vec![Technician::new(0.0, 0.0, day)],
///         vec![Request::new(1.0, 0.0, 0.0), Request::new(2.0, 0.0, 0.0)],
///     )
///     .unwrap(),
/// );
/// let handler = ConstraintHandler::for_instance(&instance);
/// let mut solution = Solution::new(Arc::clone(&instance), Arc::new(TravelDistance::new()));
///
/// let regret = RegretInsertion::new(2);
/// assert_eq!(regret.name(), "regret-2");
/// let complete = regret
///     .insert(&mut solution, &handler, &mut StdRng::seed_from_u64(1))
///     .unwrap();
/// assert!(complete);
/// assert!((solution.objective() - 4.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct RegretInsertion {
    level: usize,
    allow_depot_trips: bool,
    noise: Option<f64>,
}

impl RegretInsertion {
    /// Creates a regret-`level` heuristic. Levels below 1 are raised to 1.
    pub fn new(level: usize) -> Self {
        Self {
            level: level.max(1),
            allow_depot_trips: true,
            noise: None,
        }
    }

    /// Allows insertions that add a replenishment trip to the main depot.
    pub fn with_depot_trips(mut self, allow: bool) -> Self {
        self.allow_depot_trips = allow;
        self
    }

    /// Perturbs every insertion cost by `eta * max_distance * (2u - 1)`.
    pub fn with_noise(mut self, eta: f64) -> Self {
        self.noise = Some(eta);
        self
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn noise(&self) -> Option<f64> {
        self.noise
    }

    /// `regret-k`, with a `-n` suffix when noise is enabled.
    pub fn name(&self) -> String {
        match self.noise {
            Some(_) => format!("regret-{}-n", self.level),
            None => format!("regret-{}", self.level),
        }
    }

    /// Inserts the unserved requests of `solution` until none is left or
    /// none can be inserted feasibly.
    ///
    /// Returns `true` if every request is served afterwards.
    pub fn insert<R: Rng>(
        &self,
        solution: &mut Solution,
        constraints: &ConstraintHandler,
        rng: &mut R,
    ) -> Result<bool> {
        let cost = Arc::clone(solution.cost_delegate());
        let amplitude = self
            .noise
            .map(|eta| eta * solution.instance().max_distance());

        let mut pending: Vec<usize> = solution.unserved().iter().copied().collect();
        let tours = solution.tours();
        let mut matrix: Vec<Vec<Option<Candidate>>> = pending
            .par_iter()
            .map(|&request| {
                tours
                    .iter()
                    .map(|tour| self.evaluate(request, tour, &*cost, constraints))
                    .collect()
            })
            .collect();
        if let Some(amplitude) = amplitude {
            for row in &mut matrix {
                for candidate in row.iter_mut().flatten() {
                    candidate.cost += amplitude * (2.0 * rng.random::<f64>() - 1.0);
                }
            }
        }

        while !pending.is_empty() {
            let Some(index) = self.select(&matrix) else {
                break;
            };
            let best = matrix[index]
                .iter()
                .flatten()
                .min_by(|a, b| a.cost.total_cmp(&b.cost))
                .map(|c| c.mv.clone())
                .ok_or(TrspError::InvalidParameter {
                    name: "regret",
                    reason: "selected request has no insertion".into(),
                })?;
            let technician = best.technician();
            trace!(
                "{}: insert {} in tour {technician} ({:.3})",
                self.name(),
                best.node(),
                best.cost()
            );
            solution.execute_move(&Move::Insertion(best))?;
            pending.swap_remove(index);
            matrix.swap_remove(index);

            let tour = solution.tour(technician);
            for (row, &request) in matrix.iter_mut().zip(&pending) {
                row[technician] = self.evaluate(request, tour, &*cost, constraints);
                if let (Some(amplitude), Some(candidate)) = (amplitude, row[technician].as_mut()) {
                    candidate.cost += amplitude * (2.0 * rng.random::<f64>() - 1.0);
                }
            }
        }
        Ok(solution.is_complete())
    }

    fn evaluate(
        &self,
        request: usize,
        tour: &Tour,
        cost: &dyn CostDelegate,
        constraints: &ConstraintHandler,
    ) -> Option<Candidate> {
        find_insertion(request, tour, cost, constraints, self.allow_depot_trips).map(|mv| {
            Candidate {
                cost: mv.cost(),
                mv,
            }
        })
    }

    /// Row with the highest regret, ties broken by the lower best cost.
    fn select(&self, matrix: &[Vec<Option<Candidate>>]) -> Option<usize> {
        let mut selected: Option<(usize, f64, f64)> = None;
        for (index, row) in matrix.iter().enumerate() {
            let mut costs: Vec<f64> = row.iter().flatten().map(|c| c.cost).collect();
            if costs.is_empty() {
                continue;
            }
            costs.sort_by(f64::total_cmp);
            costs.truncate(self.level);
            let best = costs[0];
            let regret = if self.level == 1 {
                -best
            } else {
                costs[1..].iter().map(|c| c - best).sum()
            };
            let better = selected.map_or(true, |(_, r, b)| {
                regret > r || (regret == r && best < b)
            });
            if better {
                selected = Some((index, regret, best));
            }
        }
        selected.map(|(index, _, _)| index)
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::cost::TravelDistance;
    use crate::evaluation::SolutionChecker;
    use crate::models::{AttributeSet, Depot, Instance, Request, Technician, TimeWindow};
    use crate::moves::test_support::open_instance;

    fn two_technicians() -> Arc<Instance> {
        let day = TimeWindow::new(0.0, 1000.0).expect("valid");
        let welding = AttributeSet::from_ids(&[1]).expect("valid");
        Arc::new(
            Instance::new(
                "regret",
                Depot::new(0.0, 0.0, day),
                vec![
                    Technician::new(0.0, 0.0, day),
                    Technician::new(10.0, 0.0, day).with_skills(welding),
                ],
                vec![
                    Request::new(1.0, 0.0, 0.0),
                    Request::new(9.0, 0.0, 0.0).with_skills(welding),
                    Request::new(8.0, 0.0, 0.0),
                ],
            )
            .expect("valid instance"),
        )
    }

    #[test]
    fn test_greedy_serves_everything() {
        let ins = open_instance(&[(1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        let handler = ConstraintHandler::for_instance(&ins);
        let mut solution = Solution::new(Arc::clone(&ins), Arc::new(TravelDistance::new()));
        let mut rng = StdRng::seed_from_u64(7);

        let complete = RegretInsertion::new(1)
            .insert(&mut solution, &handler, &mut rng)
            .expect("insert");
        assert!(complete);
        // ties between positions of equal cost may order the line either way
        let mut served: Vec<usize> = solution.tour(0).requests().collect();
        served.sort_unstable();
        assert_eq!(served, vec![2, 3, 4]);
        assert_eq!(solution.tour(0).first(), 1);
        assert_eq!(solution.tour(0).last(), 5);
        assert!((solution.objective() - 6.0).abs() < 1e-10);
    }

    #[test]
    fn test_regret_respects_constraints() {
        let ins = two_technicians();
        let handler = ConstraintHandler::for_instance(&ins);
        let mut solution = Solution::new(Arc::clone(&ins), Arc::new(TravelDistance::new()));
        let mut rng = StdRng::seed_from_u64(7);

        let complete = RegretInsertion::new(2)
            .insert(&mut solution, &handler, &mut rng)
            .expect("insert");
        assert!(complete);
        // request 4 needs welding, only technician 1 has it
        assert_eq!(solution.visiting_tour(4), Some(1));
        assert!(SolutionChecker::new(&ins).is_valid(&solution));
    }

    #[test]
    fn test_infeasible_request_stays_unserved() {
        let day = TimeWindow::new(0.0, 1000.0).expect("valid");
        let welding = AttributeSet::from_ids(&[1]).expect("valid");
        let ins = Arc::new(
            Instance::new(
                "unserved",
                Depot::new(0.0, 0.0, day),
                vec![Technician::new(0.0, 0.0, day)],
                vec![
                    Request::new(1.0, 0.0, 0.0),
                    Request::new(2.0, 0.0, 0.0).with_skills(welding),
                ],
            )
            .expect("valid instance"),
        );
        let handler = ConstraintHandler::for_instance(&ins);
        let mut solution = Solution::new(Arc::clone(&ins), Arc::new(TravelDistance::new()));
        let complete = RegretInsertion::new(3)
            .insert(&mut solution, &handler, &mut StdRng::seed_from_u64(1))
            .expect("insert");
        assert!(!complete);
        assert_eq!(solution.unserved().iter().copied().collect::<Vec<_>>(), vec![3]);
        assert!(solution.is_served(2));
    }

    #[test]
    fn test_noise_keeps_solution_valid() {
        let ins = two_technicians();
        let handler = ConstraintHandler::for_instance(&ins);
        let regret = RegretInsertion::new(2).with_noise(0.5);
        assert_eq!(regret.name(), "regret-2-n");

        let run = |seed| {
            let mut solution = Solution::new(Arc::clone(&ins), Arc::new(TravelDistance::new()));
            regret
                .insert(&mut solution, &handler, &mut StdRng::seed_from_u64(seed))
                .expect("insert");
            solution
        };
        let a = run(3);
        assert!(a.is_complete());
        assert!(SolutionChecker::new(&ins).is_valid(&a));
        assert_eq!(a.to_routes(), run(3).to_routes());
    }
}

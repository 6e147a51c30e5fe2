//! Inter-tour relocate: a removal from a source tour followed by an
//! insertion in a destination tour.

use crate::constraints::ConstraintHandler;
use crate::error::Result;
use crate::solution::Solution;

use super::{
    find_insertion, keep_best, unsupported, ExplorationStrategy, InsertionMove, Move, RemovalMove,
};

/// Moves a request from the tour of `removal.technician()` to the tour of
/// `insertion.technician()`.
///
/// The improvement is the sum of the improvements of both parts.
#[derive(Debug, Clone, PartialEq)]
pub struct RelocateMove {
    removal: RemovalMove,
    insertion: InsertionMove,
    improvement: f64,
}

impl RelocateMove {
    pub fn new(removal: RemovalMove, insertion: InsertionMove) -> Self {
        let improvement = removal.improvement() + insertion.improvement();
        Self {
            removal,
            insertion,
            improvement,
        }
    }

    pub fn removal(&self) -> &RemovalMove {
        &self.removal
    }

    pub fn insertion(&self) -> &InsertionMove {
        &self.insertion
    }

    pub fn source(&self) -> usize {
        self.removal.technician()
    }

    pub fn destination(&self) -> usize {
        self.insertion.technician()
    }

    pub fn node(&self) -> usize {
        self.insertion.node()
    }

    pub fn improvement(&self) -> f64 {
        self.improvement
    }

    pub fn set_improvement(&mut self, improvement: f64) {
        self.improvement = improvement;
    }
}

/// Explores the relocation of every served request to every other tour.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelocateNeighborhood {
    allow_depot_trip: bool,
}

impl RelocateNeighborhood {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allows insertions that add a depot trip to the destination tour.
    pub fn with_depot_trips(mut self, allow: bool) -> Self {
        self.allow_depot_trip = allow;
        self
    }

    pub fn supports(&self, strategy: ExplorationStrategy) -> bool {
        matches!(
            strategy,
            ExplorationStrategy::DeterministicFirstImprovement
                | ExplorationStrategy::DeterministicBestImprovement
        )
    }

    /// Searches the relocate neighborhood of `solution`.
    pub fn explore(
        &self,
        solution: &Solution,
        constraints: &ConstraintHandler,
        strategy: ExplorationStrategy,
    ) -> Result<Option<Move>> {
        if !self.supports(strategy) {
            return Err(unsupported("relocate neighborhood", strategy));
        }
        let first_improvement = strategy.is_first_improvement();
        let cost = solution.cost_delegate();
        let mut best: Option<Move> = None;

        for source in solution.tours() {
            for node in source.requests() {
                let mut removal = Move::Removal(RemovalMove::new(source.technician(), node));
                if !constraints.check_move(source, &removal).is_feasible() {
                    continue;
                }
                cost.evaluate_move(source, &mut removal);
                let Move::Removal(removal) = removal else {
                    continue;
                };

                for dest in solution.tours() {
                    if dest.technician() == source.technician() {
                        continue;
                    }
                    let Some(insertion) = find_insertion(
                        node,
                        dest,
                        cost.as_ref(),
                        constraints,
                        self.allow_depot_trip,
                    ) else {
                        continue;
                    };
                    let mv = Move::Relocate(RelocateMove::new(removal.clone(), insertion));
                    if !mv.is_improving() {
                        continue;
                    }
                    if first_improvement {
                        return Ok(Some(mv));
                    }
                    keep_best(&mut best, mv);
                }
            }
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::constraints::ConstraintHandler;
    use crate::cost::TravelDistance;
    use crate::models::{Depot, Instance, Request, Technician, TimeWindow};

    fn two_technicians() -> Arc<Instance> {
        let day = TimeWindow::new(0.0, 1000.0).expect("valid");
        Arc::new(
            Instance::new(
                "relocate",
                Depot::new(0.0, 0.0, day),
                vec![
                    Technician::new(0.0, 0.0, day),
                    Technician::new(100.0, 0.0, day),
                ],
                vec![Request::new(1.0, 0.0, 0.0), Request::new(99.0, 0.0, 0.0)],
            )
            .expect("valid instance"),
        )
    }

    #[test]
    fn test_relocate_to_closer_technician() {
        let ins = two_technicians();
        let handler = ConstraintHandler::for_instance(&ins);
        // request 4 (near technician 1) served by technician 0
        let solution = Solution::from_routes(
            Arc::clone(&ins),
            Arc::new(TravelDistance::new()),
            &[vec![1, 3, 4, 5], vec![2, 6]],
        )
        .expect("valid routes");

        let mv = RelocateNeighborhood::new()
            .explore(&solution, &handler, ExplorationStrategy::DeterministicBestImprovement)
            .expect("supported")
            .expect("improving");
        let Move::Relocate(relocate) = &mv else {
            panic!("expected a relocate, got {}", mv.name());
        };
        assert_eq!(relocate.node(), 4);
        assert_eq!((relocate.source(), relocate.destination()), (0, 1));

        let mut solution = solution;
        let before = solution.objective();
        solution.execute_move(&mv).expect("execute");
        assert_eq!(solution.visiting_tour(4), Some(1));
        assert!((before - mv.improvement() - solution.objective()).abs() < 1e-6);
    }
}

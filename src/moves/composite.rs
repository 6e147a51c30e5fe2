//! Solution-level exploration of single-tour neighborhoods.

use log::trace;

use crate::constraints::ConstraintHandler;
use crate::error::Result;
use crate::solution::Solution;

use super::{
    keep_best, ExplorationStrategy, Move, RelocateNeighborhood, ShiftNeighborhood,
    TourNeighborhood, TwoOptNeighborhood,
};

/// Lifts tour neighborhoods to a whole solution.
///
/// Every tour of the solution is explored with every neighborhood; the
/// returned move carries the index of the tour it applies to. An optional
/// [`RelocateNeighborhood`] adds inter-tour moves.
pub struct CompositeNeighborhood {
    neighborhoods: Vec<Box<dyn TourNeighborhood>>,
    relocate: Option<RelocateNeighborhood>,
}

impl std::fmt::Debug for CompositeNeighborhood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.neighborhoods.iter().map(|n| n.name()).collect();
        f.debug_struct("CompositeNeighborhood")
            .field("neighborhoods", &names)
            .field("relocate", &self.relocate)
            .finish()
    }
}

impl Default for CompositeNeighborhood {
    /// Shift, 2-opt and relocate.
    fn default() -> Self {
        Self::new()
            .with(ShiftNeighborhood)
            .with(TwoOptNeighborhood)
            .with_relocate(RelocateNeighborhood::new())
    }
}

impl CompositeNeighborhood {
    /// Creates an empty composite.
    pub fn new() -> Self {
        Self {
            neighborhoods: Vec::new(),
            relocate: None,
        }
    }

    pub fn with(mut self, neighborhood: impl TourNeighborhood + 'static) -> Self {
        self.neighborhoods.push(Box::new(neighborhood));
        self
    }

    pub fn with_relocate(mut self, relocate: RelocateNeighborhood) -> Self {
        self.relocate = Some(relocate);
        self
    }

    /// Returns `true` if every component implements `strategy`.
    pub fn supports(&self, strategy: ExplorationStrategy) -> bool {
        self.neighborhoods.iter().all(|n| n.supports(strategy))
            && self.relocate.map_or(true, |r| r.supports(strategy))
    }

    /// Finds an improving move over all tours of `solution`.
    pub fn explore(
        &self,
        solution: &Solution,
        constraints: &ConstraintHandler,
        strategy: ExplorationStrategy,
    ) -> Result<Option<Move>> {
        let first_improvement = strategy.is_first_improvement();
        let cost = solution.cost_delegate();
        let mut best: Option<Move> = None;

        for tour in solution.tours() {
            for neighborhood in &self.neighborhoods {
                if let Some(mv) = neighborhood.explore(tour, cost.as_ref(), constraints, strategy)? {
                    if first_improvement {
                        return Ok(Some(mv));
                    }
                    keep_best(&mut best, mv);
                }
            }
        }
        if let Some(relocate) = &self.relocate {
            if let Some(mv) = relocate.explore(solution, constraints, strategy)? {
                keep_best(&mut best, mv);
            }
        }
        Ok(best)
    }

    /// Applies improving moves until a local optimum is reached.
    ///
    /// Returns the number of executed moves.
    pub fn local_search(
        &self,
        solution: &mut Solution,
        constraints: &ConstraintHandler,
        strategy: ExplorationStrategy,
    ) -> Result<usize> {
        let mut moves = 0;
        while let Some(mv) = self.explore(solution, constraints, strategy)? {
            trace!(
                "local search: {} on tour {} improves by {:.3}",
                mv.name(),
                mv.technician(),
                mv.improvement()
            );
            solution.execute_move(&mv)?;
            moves += 1;
        }
        Ok(moves)
    }
}

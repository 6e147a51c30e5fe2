//! Moves and neighborhoods.
//!
//! A [`Move`] is a transient value: it is evaluated by a
//! [`CostDelegate`](crate::cost::CostDelegate), checked by the
//! [`ConstraintHandler`](crate::constraints::ConstraintHandler), then either
//! executed or dropped. The improvement is signed, positive values improve
//! the solution.
//!
//! - [`InsertionMove`]: insert an unserved request, optionally together with
//!   a depot trip
//! - [`RemovalMove`]: remove a visit from a tour
//! - [`ShiftMove`]: move one node elsewhere in the same tour
//! - [`TwoOptMove`]: reverse a sub-path of a tour
//! - [`RelocateMove`]: remove a request from one tour and insert it in another
//! - [`CompositeNeighborhood`]: explores single-tour neighborhoods over every
//!   tour of a solution

mod composite;
mod insertion;
mod relocate;
mod removal;
mod shift;
mod two_opt;

pub use composite::CompositeNeighborhood;
pub use insertion::{find_insertion, DepotTrip, InsertionMove};
pub use relocate::{RelocateMove, RelocateNeighborhood};
pub use removal::RemovalMove;
pub use shift::{ChangedSequence, ShiftMove, ShiftNeighborhood};
pub use two_opt::{TwoOptMove, TwoOptNeighborhood};

use serde::{Deserialize, Serialize};

use crate::constraints::ConstraintHandler;
use crate::cost::CostDelegate;
use crate::error::{Result, TrspError};
use crate::tour::Tour;

/// Improvements below this threshold are treated as zero.
pub const IMPROVEMENT_EPSILON: f64 = 1e-6;

/// A move on one or two tours.
#[derive(Debug, Clone)]
pub enum Move {
    Insertion(InsertionMove),
    Removal(RemovalMove),
    Shift(ShiftMove),
    TwoOpt(TwoOptMove),
    Relocate(RelocateMove),
}

impl Move {
    /// Short name of the move kind.
    pub fn name(&self) -> &'static str {
        match self {
            Move::Insertion(_) => "insertion",
            Move::Removal(_) => "removal",
            Move::Shift(_) => "shift",
            Move::TwoOpt(_) => "2-opt",
            Move::Relocate(_) => "relocate",
        }
    }

    /// Technician whose tour is modified; the destination tour for a relocate.
    pub fn technician(&self) -> usize {
        match self {
            Move::Insertion(m) => m.technician(),
            Move::Removal(m) => m.technician(),
            Move::Shift(m) => m.technician(),
            Move::TwoOpt(m) => m.technician(),
            Move::Relocate(m) => m.insertion().technician(),
        }
    }

    /// Signed improvement, positive when the move lowers the cost.
    pub fn improvement(&self) -> f64 {
        match self {
            Move::Insertion(m) => m.improvement(),
            Move::Removal(m) => m.improvement(),
            Move::Shift(m) => m.improvement(),
            Move::TwoOpt(m) => m.improvement(),
            Move::Relocate(m) => m.improvement(),
        }
    }

    pub fn set_improvement(&mut self, improvement: f64) {
        match self {
            Move::Insertion(m) => m.set_improvement(improvement),
            Move::Removal(m) => m.set_improvement(improvement),
            Move::Shift(m) => m.set_improvement(improvement),
            Move::TwoOpt(m) => m.set_improvement(improvement),
            Move::Relocate(m) => m.set_improvement(improvement),
        }
    }

    /// Returns `true` if the improvement is strictly positive.
    pub fn is_improving(&self) -> bool {
        self.improvement() > IMPROVEMENT_EPSILON
    }

    /// Sequence of `tour` once the move is applied, without modifying it.
    ///
    /// For a relocate, `tour` is the destination tour.
    pub fn resulting_sequence(&self, tour: &Tour) -> Vec<usize> {
        match self {
            Move::Insertion(m) => m.resulting_sequence(tour),
            Move::Removal(m) => m.resulting_sequence(tour),
            Move::Shift(m) => m.resulting_sequence(tour),
            Move::TwoOpt(m) => m.resulting_sequence(tour),
            Move::Relocate(m) => m.insertion().resulting_sequence(tour),
        }
    }

    /// Applies a single-tour move to `tour`.
    ///
    /// Relocate moves span two tours and must be executed through
    /// [`Solution::execute_move`](crate::solution::Solution::execute_move).
    pub fn execute(&self, tour: &mut Tour) -> Result<()> {
        match self {
            Move::Insertion(m) => m.execute(tour),
            Move::Removal(m) => m.execute(tour),
            Move::Shift(m) => m.execute(tour),
            Move::TwoOpt(m) => m.execute(tour),
            Move::Relocate(_) => Err(TrspError::NotSupported {
                component: "tour",
                operation: "single-tour execution of a relocate",
            }),
        }
    }
}

/// How a neighborhood is explored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExplorationStrategy {
    /// Return the first improving feasible move, scanning in a fixed order.
    DeterministicFirstImprovement,
    /// Return the feasible move with the largest improvement.
    DeterministicBestImprovement,
    /// Scan in random order and return the first improving move.
    RandomFirstImprovement,
    /// Sample a random feasible move.
    RandomNeighbor,
}

impl ExplorationStrategy {
    pub fn is_first_improvement(self) -> bool {
        matches!(
            self,
            ExplorationStrategy::DeterministicFirstImprovement
                | ExplorationStrategy::RandomFirstImprovement
        )
    }
}

/// A neighborhood over the moves of a single tour.
pub trait TourNeighborhood: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns `true` if `explore` implements `strategy`.
    fn supports(&self, strategy: ExplorationStrategy) -> bool {
        matches!(
            strategy,
            ExplorationStrategy::DeterministicFirstImprovement
                | ExplorationStrategy::DeterministicBestImprovement
        )
    }

    /// Searches the neighborhood of `tour`.
    ///
    /// Returns the selected feasible move, `None` if no improving feasible
    /// move exists, or [`TrspError::NotSupported`] for an unsupported
    /// strategy.
    fn explore(
        &self,
        tour: &Tour,
        cost: &dyn CostDelegate,
        constraints: &ConstraintHandler,
        strategy: ExplorationStrategy,
    ) -> Result<Option<Move>>;
}

/// Error returned by neighborhoods for a strategy they do not implement.
pub(crate) fn unsupported(component: &'static str, strategy: ExplorationStrategy) -> TrspError {
    TrspError::NotSupported {
        component,
        operation: match strategy {
            ExplorationStrategy::DeterministicFirstImprovement => {
                "deterministic first-improvement exploration"
            }
            ExplorationStrategy::DeterministicBestImprovement => {
                "deterministic best-improvement exploration"
            }
            ExplorationStrategy::RandomFirstImprovement => "random first-improvement exploration",
            ExplorationStrategy::RandomNeighbor => "random neighbor exploration",
        },
    }
}

/// Keeps the better of two candidate moves.
pub(crate) fn keep_best(best: &mut Option<Move>, candidate: Move) {
    let better = best
        .as_ref()
        .map_or(true, |b| candidate.improvement() > b.improvement());
    if better {
        *best = Some(candidate);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::models::{Depot, Instance, Request, Technician, TimeWindow};

    /// One technician at the origin and `n` requests, wide time windows.
    pub fn open_instance(points: &[(f64, f64)]) -> Arc<Instance> {
        let day = TimeWindow::new(0.0, 10_000.0).expect("valid");
        let requests = points
            .iter()
            .map(|&(x, y)| Request::new(x, y, 0.0))
            .collect();
        Arc::new(
            Instance::new(
                "moves",
                Depot::new(0.0, 0.0, day),
                vec![Technician::new(0.0, 0.0, day)],
                requests,
            )
            .expect("valid instance"),
        )
    }
}

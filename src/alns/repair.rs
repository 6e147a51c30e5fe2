//! Repair operators for the TRSP ALNS.
//!
//! The only family is regret-k insertion ([`RegretRepair`]), with levels
//! from 1 (greedy) upwards and an optional noise on insertion costs.

use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;

use crate::constraints::ConstraintHandler;
use crate::constructive::RegretInsertion;
use crate::error::Result;
use crate::solution::Solution;

/// Reinserts unserved requests into a solution.
pub trait RepairOperator: Send + Sync + fmt::Debug {
    fn name(&self) -> String;

    /// Inserts as many unserved requests as possible.
    ///
    /// Returns `true` if the solution is complete afterwards.
    fn repair(&self, solution: &mut Solution, rng: &mut StdRng) -> Result<bool>;
}

/// Regret-k insertion as a repair operator.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use trsp_alns::alns::repair::{RegretRepair, RepairOperator};
/// use trsp_alns::constraints::ConstraintHandler;
/// use trsp_alns::models::{Depot, Instance, Technician, TimeWindow};
///
/// let day = TimeWindow::new(0.0, 100.0).unwrap();
/// let instance = Instance::new(
///     "doc",
///     Depot::new(0.0, 0.0, day),
///     vec![Technician::new(0.0, 0.0, day)],
///     vec![],
/// )
/// .unwrap();
/// let handler = Arc::new(ConstraintHandler::for_instance(&instance));
///
/// assert_eq!(RegretRepair::new(3, Arc::clone(&handler)).name(), "regret-3");
/// assert_eq!(RegretRepair::new(1, handler).with_noise(0.025).name(), "regret-1-n");
/// ```
#[derive(Debug, Clone)]
pub struct RegretRepair {
    insertion: RegretInsertion,
    constraints: Arc<ConstraintHandler>,
}

impl RegretRepair {
    pub fn new(level: usize, constraints: Arc<ConstraintHandler>) -> Self {
        Self {
            insertion: RegretInsertion::new(level),
            constraints,
        }
    }

    /// Enables noise with amplitude `eta * max_distance`.
    pub fn with_noise(mut self, eta: f64) -> Self {
        self.insertion = self.insertion.with_noise(eta);
        self
    }

    pub fn level(&self) -> usize {
        self.insertion.level()
    }
}

impl RepairOperator for RegretRepair {
    fn name(&self) -> String {
        self.insertion.name()
    }

    fn repair(&self, solution: &mut Solution, rng: &mut StdRng) -> Result<bool> {
        self.insertion.insert(solution, &self.constraints, rng)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::alns::destroy::{DestroyOperator, RandomDestroy};
    use crate::cost::TravelDistance;
    use crate::evaluation::SolutionChecker;
    use crate::moves::test_support::open_instance;

    #[test]
    fn test_destroy_then_repair_restores_completeness() {
        let ins = open_instance(&[(1.0, 0.0), (2.0, 0.0), (3.0, 0.0), (4.0, 0.0)]);
        let handler = Arc::new(ConstraintHandler::for_instance(&ins));
        let mut solution = Solution::from_routes(
            Arc::clone(&ins),
            Arc::new(TravelDistance::new()),
            &[vec![1, 2, 3, 4, 5, 6]],
        )
        .expect("valid");
        let mut rng = StdRng::seed_from_u64(9);

        RandomDestroy.destroy(&mut solution, 0.5, &mut rng).expect("destroy");
        assert_eq!(solution.unserved_count(), 2);

        let repair = RegretRepair::new(2, handler).with_noise(0.1);
        assert!(repair.repair(&mut solution, &mut rng).expect("repair"));
        assert!(SolutionChecker::new(&ins).is_valid(&solution));
    }
}

//! Constructive heuristics for building initial TRSP solutions.
//!
//! - [`RegretInsertion`]: regret-k insertion of unserved requests, also used
//!   as the ALNS repair operator
//! - [`initial_solution`]: committed prefixes followed by regret insertion
//! - [`RandomizedConstructive`]: randomized nearest neighbor, insertion and
//!   savings heuristics generating tours for the set-covering pool
//! - [`GiantTourSplit`]: shortest-path split of a giant tour into feasible
//!   tours of one technician

mod rch;
mod regret;
mod split;

pub use rch::{RandomizedConstructive, RchConfig, RchKind};
pub use regret::RegretInsertion;
pub use split::{GiantTourSplit, SplitResult};

use std::sync::Arc;

use log::{info, warn};
use rand::Rng;

use crate::constraints::ConstraintHandler;
use crate::cost::CostDelegate;
use crate::error::Result;
use crate::models::Instance;
use crate::solution::Solution;

/// Builds an initial solution with regret-`level` insertion.
///
/// Every tour starts with the technician's committed visits, if any, so
/// dynamic instances keep their already-executed prefix. Requests that
/// cannot be inserted feasibly stay unserved.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use trsp_alns::constraints::ConstraintHandler;
/// use trsp_alns::constructive::initial_solution;
/// use trsp_alns::cost::TravelDistance;
/// use trsp_alns::models::{Depot, Instance, Request, Technician, TimeWindow};
///
/// let day = TimeWindow::new(0.0, 100.0).unwrap();
/// let instance = Arc::new(
///     Instance::new(
///         "doc",
///         Depot::new(0.0, 0.0, day),
///         vec![Technician::new(0.0, 0.0, day), Technician::new(5.0, 0.0, day)],
///         vec![Request::new(1.0, 0.0, 0.0), Request::new(4.0, 0.0, 0.0)],
///     )
///     .unwrap(),
/// );
/// let handler = ConstraintHandler::for_instance(&instance);
/// let solution = initial_solution(
///     instance,
///     Arc::new(TravelDistance::new()),
///     &handler,
///     2,
///     &mut StdRng::seed_from_u64(0),
/// )
/// .unwrap();
/// assert!(solution.is_complete());
/// assert!((solution.objective() - 4.0).abs() < 1e-10);
/// ```
pub fn initial_solution<R: Rng>(
    instance: Arc<Instance>,
    cost: Arc<dyn CostDelegate>,
    constraints: &ConstraintHandler,
    level: usize,
    rng: &mut R,
) -> Result<Solution> {
    let routes: Vec<Vec<usize>> = (0..instance.technician_count())
        .map(|t| {
            let mut route = Vec::with_capacity(instance.committed(t).len() + 2);
            route.push(instance.home(t));
            route.extend_from_slice(instance.committed(t));
            route.push(instance.home_duplicate(t));
            route
        })
        .collect();
    let mut solution = Solution::from_routes(Arc::clone(&instance), cost, &routes)?;

    let regret = RegretInsertion::new(level);
    let complete = regret.insert(&mut solution, constraints, rng)?;
    if complete {
        info!(
            "{}: initial solution {:.3} ({})",
            instance.name(),
            solution.objective(),
            regret.name()
        );
    } else {
        warn!(
            "{}: initial solution leaves {} requests unserved",
            instance.name(),
            solution.unserved_count()
        );
    }
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::cost::TravelDistance;
    use crate::evaluation::SolutionChecker;
    use crate::moves::test_support::open_instance;

    #[test]
    fn test_committed_prefix_is_kept() {
        let ins = Arc::new(
            Instance::clone(&open_instance(&[(1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]))
                .with_committed(0, vec![4])
                .expect("valid"),
        );
        let handler = ConstraintHandler::for_instance(&ins);
        let solution = initial_solution(
            Arc::clone(&ins),
            Arc::new(TravelDistance::new()),
            &handler,
            2,
            &mut StdRng::seed_from_u64(0),
        )
        .expect("initial");

        assert!(solution.is_complete());
        let route = solution.tour(0).to_vec();
        assert_eq!(&route[..2], &[1, 4]);
        assert!(SolutionChecker::new(&ins).is_valid(&solution));
    }
}

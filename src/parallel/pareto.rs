//! Thread-safe Pareto front over solution objectives.

use std::cmp::Ordering;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::cost::Objective;
use crate::error::{Result, TrspError};
use crate::solution::Solution;

/// A member of a [`ParetoFront`] with its objective values.
#[derive(Debug, Clone)]
pub struct ParetoEntry {
    pub solution: Solution,
    pub values: Vec<f64>,
}

impl ParetoEntry {
    pub fn unserved(&self) -> usize {
        self.solution.unserved_count()
    }

    /// Value of the `i`-th objective, falling back to the last one.
    pub fn value(&self, i: usize) -> f64 {
        self.values
            .get(i)
            .or_else(|| self.values.last())
            .copied()
            .unwrap_or(f64::INFINITY)
    }

    /// Returns `true` if `self` strictly dominates `other`.
    ///
    /// Fewer unserved requests always dominate, so a complete solution is
    /// never dominated by an incomplete one. Otherwise `self` must be no
    /// worse on every objective and better on at least one.
    pub fn dominates(&self, other: &ParetoEntry) -> bool {
        match self.unserved().cmp(&other.unserved()) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => {
                let mut strictly = false;
                for (a, b) in self.values.iter().zip(&other.values) {
                    if a > b {
                        return false;
                    }
                    strictly |= a < b;
                }
                strictly
            }
        }
    }

    fn same_point(&self, other: &ParetoEntry) -> bool {
        self.unserved() == other.unserved() && self.values == other.values
    }
}

/// Mutually non-dominated solutions, sorted by the first objective.
///
/// Objectives are evaluated outside the lock; only the dominance check and
/// the insertion run under the guard.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use trsp_alns::cost::{CostObjective, RouteConsistency, TravelDistance};
/// use trsp_alns::models::{Depot, Instance, Request, Technician, TimeWindow};
/// use trsp_alns::parallel::ParetoFront;
/// use trsp_alns::solution::Solution;
///
/// let day = TimeWindow::new(0.0, 100.0).unwrap();
/// let instance = Arc::new(
///     Instance::new(
///         "doc",
///         Depot::new(0.0, 0.0, day),
///         vec![Technician::new(0.0, 0.0, day)],
///         vec![
///             Request::new(1.0, 0.0, 0.0),
///             Request::new(2.0, 0.0, 0.0),
///             Request::new(1.0, 5.0, 0.0),
///         ],
///     )
///     .unwrap(),
/// );
/// let cost = Arc::new(TravelDistance::new());
/// let planned =
///     Solution::from_routes(Arc::clone(&instance), cost.clone(), &[vec![1, 2, 4, 3, 5]]).unwrap();
/// let cheaper =
///     Solution::from_routes(Arc::clone(&instance), cost, &[vec![1, 2, 3, 4, 5]]).unwrap();
/// assert!(cheaper.objective() < planned.objective());
///
/// let front = ParetoFront::bi_objective(
///     Arc::new(CostObjective),
///     Arc::new(RouteConsistency::from_solution(&planned)),
/// );
/// assert!(front.add(&planned));
/// assert!(front.add(&cheaper));
/// assert_eq!(front.len(), 2);
/// assert!(!front.add(&planned));
/// ```
pub struct ParetoFront {
    objectives: Vec<Arc<dyn Objective>>,
    entries: Mutex<Vec<ParetoEntry>>,
}

impl ParetoFront {
    pub fn new(objectives: Vec<Arc<dyn Objective>>) -> Result<Self> {
        if objectives.is_empty() {
            return Err(TrspError::InvalidParameter {
                name: "objectives",
                reason: "a Pareto front needs at least one objective".into(),
            });
        }
        Ok(Self {
            objectives,
            entries: Mutex::new(Vec::new()),
        })
    }

    pub fn bi_objective(first: Arc<dyn Objective>, second: Arc<dyn Objective>) -> Self {
        Self {
            objectives: vec![first, second],
            entries: Mutex::new(Vec::new()),
        }
    }

    /// An empty front on the same objectives.
    pub fn empty_like(&self) -> Self {
        Self {
            objectives: self.objectives.clone(),
            entries: Mutex::new(Vec::new()),
        }
    }

    pub fn objectives(&self) -> &[Arc<dyn Objective>] {
        &self.objectives
    }

    pub fn evaluate(&self, solution: &Solution) -> Vec<f64> {
        self.objectives.iter().map(|o| o.evaluate(solution)).collect()
    }

    /// Offers a solution; returns `true` if it joined the front.
    pub fn add(&self, solution: &Solution) -> bool {
        let candidate = ParetoEntry {
            values: self.evaluate(solution),
            solution: solution.clone(),
        };
        self.insert(candidate)
    }

    fn insert(&self, candidate: ParetoEntry) -> bool {
        let mut entries = self.lock();
        if entries
            .iter()
            .any(|e| e.dominates(&candidate) || e.same_point(&candidate))
        {
            return false;
        }
        entries.retain(|e| !candidate.dominates(e));
        let at = entries.partition_point(|e| e.value(0) <= candidate.value(0));
        entries.insert(at, candidate);
        true
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of the members, sorted by the first objective.
    pub fn entries(&self) -> Vec<ParetoEntry> {
        self.lock().clone()
    }

    pub fn solutions(&self) -> Vec<Solution> {
        self.lock().iter().map(|e| e.solution.clone()).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Returns `true` if no member dominates another.
    pub fn is_consistent(&self) -> bool {
        let entries = self.lock();
        entries.iter().enumerate().all(|(i, a)| {
            entries
                .iter()
                .enumerate()
                .all(|(j, b)| i == j || !a.dominates(b))
        })
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ParetoEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ParetoFront {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let points: Vec<(usize, Vec<f64>)> = self
            .lock()
            .iter()
            .map(|e| (e.unserved(), e.values.clone()))
            .collect();
        f.debug_struct("ParetoFront")
            .field(
                "objectives",
                &self.objectives.iter().map(|o| o.name()).collect::<Vec<_>>(),
            )
            .field("points", &points)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::cost::{CostObjective, TravelDistance};
    use crate::moves::test_support::open_instance;

    /// Number of requests served by technician 0, a second objective that
    /// conflicts with nothing in particular.
    #[derive(Debug)]
    struct FirstTourLength;

    impl Objective for FirstTourLength {
        fn name(&self) -> &'static str {
            "first tour length"
        }

        fn evaluate(&self, solution: &Solution) -> f64 {
            solution.tour(0).requests().count() as f64
        }
    }

    fn entry(unserved: &[usize], values: Vec<f64>) -> ParetoEntry {
        let ins = open_instance(&[(1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        let served: Vec<usize> = ins.request_ids().filter(|r| !unserved.contains(r)).collect();
        let mut route = vec![1];
        route.extend(served);
        route.push(ins.home_duplicate(0));
        let solution = Solution::from_routes(ins, Arc::new(TravelDistance::new()), &[route])
            .expect("valid routes");
        ParetoEntry { solution, values }
    }

    #[test]
    fn test_dominance() {
        let a = entry(&[], vec![1.0, 2.0]);
        let b = entry(&[], vec![2.0, 2.0]);
        let c = entry(&[], vec![0.5, 3.0]);
        assert!(a.dominates(&b));
        assert!(!b.dominates(&a));
        assert!(!a.dominates(&c) && !c.dominates(&a));
        assert!(!a.dominates(&a));

        let incomplete = entry(&[2], vec![0.0, 0.0]);
        assert!(b.dominates(&incomplete));
        assert!(!incomplete.dominates(&b));
    }

    #[test]
    fn test_front_keeps_non_dominated_sorted() {
        let front = ParetoFront::bi_objective(Arc::new(CostObjective), Arc::new(FirstTourLength));
        assert!(front.insert(entry(&[], vec![3.0, 1.0])));
        assert!(front.insert(entry(&[], vec![1.0, 3.0])));
        assert!(front.insert(entry(&[], vec![2.0, 2.0])));
        assert!(!front.insert(entry(&[], vec![2.5, 2.5])));
        assert!(!front.insert(entry(&[], vec![2.0, 2.0])));
        // dominates every point
        assert!(front.insert(entry(&[], vec![0.5, 1.0])));
        let firsts: Vec<f64> = front.entries().iter().map(|e| e.value(0)).collect();
        assert_eq!(firsts, vec![0.5]);
        assert!(front.is_consistent());
    }

    #[test]
    fn test_concurrent_inserts() {
        let front = Arc::new(ParetoFront::bi_objective(
            Arc::new(CostObjective),
            Arc::new(FirstTourLength),
        ));
        let handles: Vec<_> = (0..4)
            .map(|k| {
                let front = Arc::clone(&front);
                thread::spawn(move || {
                    for i in 0..10 {
                        let x = (k * 10 + i) as f64;
                        front.insert(entry(&[], vec![x, 40.0 - x]));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("worker");
        }
        assert_eq!(front.len(), 40);
        assert!(front.is_consistent());
        let firsts: Vec<f64> = front.entries().iter().map(|e| e.value(0)).collect();
        assert!(firsts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_requires_objective() {
        assert!(ParetoFront::new(Vec::new()).is_err());
    }
}

use serde::{Deserialize, Serialize};

use super::pareto::{ParetoEntry, ParetoFront};
use crate::solution::Solution;

/// Picks one solution of a front: the best second objective among complete
/// solutions whose first objective is within an allowed degradation of the
/// best one.
///
/// The degradation is a factor: `1.0` keeps the best first objective,
/// `1.1` allows 10% more and `f64::INFINITY` ignores the first objective.
/// Without complete solutions the one with the fewest unserved requests
/// wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HierarchicalSelector {
    allowed_degradation: f64,
}

impl Default for HierarchicalSelector {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl HierarchicalSelector {
    pub fn new(allowed_degradation: f64) -> Self {
        Self {
            allowed_degradation: allowed_degradation.max(1.0),
        }
    }

    pub fn allowed_degradation(&self) -> f64 {
        self.allowed_degradation
    }

    /// Selects among `entries`, in any order.
    pub fn select_entry<'a>(&self, entries: &'a [ParetoEntry]) -> Option<&'a ParetoEntry> {
        let complete: Vec<&ParetoEntry> = entries.iter().filter(|e| e.unserved() == 0).collect();
        let Some(best_first) = complete.iter().map(|e| e.value(0)).min_by(f64::total_cmp) else {
            return entries.iter().min_by(|a, b| {
                a.unserved()
                    .cmp(&b.unserved())
                    .then(a.value(0).total_cmp(&b.value(0)))
            });
        };
        let threshold = if self.allowed_degradation.is_infinite() {
            f64::INFINITY
        } else if best_first >= 0.0 {
            best_first * self.allowed_degradation
        } else {
            best_first / self.allowed_degradation
        };
        complete
            .into_iter()
            .filter(|e| e.value(0) <= threshold)
            .min_by(|a, b| {
                a.value(1)
                    .total_cmp(&b.value(1))
                    .then(a.value(0).total_cmp(&b.value(0)))
            })
    }

    /// Selects a solution of `front`.
    pub fn select(&self, front: &ParetoFront) -> Option<Solution> {
        let entries = front.entries();
        self.select_entry(&entries).map(|e| e.solution.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cost::TravelDistance;
    use crate::moves::test_support::open_instance;

    fn entry(unserved: usize, first: f64, second: f64) -> ParetoEntry {
        let ins = open_instance(&[(1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        let served: Vec<usize> = ins.request_ids().skip(unserved).collect();
        let mut route = vec![ins.home(0)];
        route.extend(served);
        route.push(ins.home_duplicate(0));
        ParetoEntry {
            solution: Solution::from_routes(ins, Arc::new(TravelDistance::new()), &[route])
                .expect("valid routes"),
            values: vec![first, second],
        }
    }

    fn front() -> Vec<ParetoEntry> {
        vec![
            entry(0, 100.0, 9.0),
            entry(0, 104.0, 5.0),
            entry(0, 112.0, 1.0),
            entry(1, 50.0, 0.0),
        ]
    }

    #[test]
    fn test_no_degradation_keeps_best_first() {
        let entries = front();
        let s = HierarchicalSelector::new(1.0).select_entry(&entries).expect("selected");
        assert_eq!(s.values, vec![100.0, 9.0]);
    }

    #[test]
    fn test_degradation_trades_first_for_second() {
        let entries = front();
        let s = HierarchicalSelector::new(1.05).select_entry(&entries).expect("selected");
        assert_eq!(s.values, vec![104.0, 5.0]);
        let s = HierarchicalSelector::new(f64::INFINITY)
            .select_entry(&entries)
            .expect("selected");
        assert_eq!(s.values, vec![112.0, 1.0]);
    }

    #[test]
    fn test_incomplete_fallback() {
        let entries = vec![entry(2, 10.0, 1.0), entry(1, 30.0, 3.0), entry(1, 20.0, 4.0)];
        let s = HierarchicalSelector::default().select_entry(&entries).expect("selected");
        assert_eq!(s.values, vec![20.0, 4.0]);
        assert!(HierarchicalSelector::default().select_entry(&[]).is_none());
    }
}

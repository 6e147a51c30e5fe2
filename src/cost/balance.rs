//! Workload balance between technicians.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{CostDelegate, WorkingTime};
use crate::models::Instance;
use crate::moves::{InsertionMove, Move, ShiftMove};
use crate::solution::Solution;
use crate::tour::Tour;

/// Spread of a set of tour costs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationMeasure {
    /// Largest distance to the mean.
    #[default]
    MaxAbsDev,
    /// Average distance to the mean.
    AvgAbsDev,
    /// Square root of the summed squared distances to the mean.
    StdDev,
    /// Largest minus smallest value.
    MaxMinGap,
    Min,
    Max,
}

impl DeviationMeasure {
    /// Spread of `values`, zero when empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use trsp_alns::cost::DeviationMeasure;
    ///
    /// let costs = [2.0, 4.0, 9.0];
    /// assert_eq!(DeviationMeasure::MaxAbsDev.deviation(&costs), 4.0);
    /// assert_eq!(DeviationMeasure::MaxMinGap.deviation(&costs), 7.0);
    /// assert_eq!(DeviationMeasure::Max.deviation(&[]), 0.0);
    /// ```
    pub fn deviation(self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        match self {
            DeviationMeasure::MaxAbsDev => {
                values.iter().map(|v| (v - mean).abs()).fold(0.0, f64::max)
            }
            DeviationMeasure::AvgAbsDev => {
                values.iter().map(|v| (v - mean).abs()).sum::<f64>() / values.len() as f64
            }
            DeviationMeasure::StdDev => {
                values.iter().map(|v| (v - mean).powi(2)).sum::<f64>().sqrt()
            }
            DeviationMeasure::MaxMinGap => max - min,
            DeviationMeasure::Min => min,
            DeviationMeasure::Max => max,
        }
    }
}

/// Cost delegate whose solution cost is the imbalance of the tour costs.
///
/// Tours and moves are priced by a base delegate, working time unless
/// specified, so insertion heuristics and neighborhoods keep optimizing
/// tours individually. Only [`CostDelegate::evaluate_solution`] measures
/// the spread of the tour costs. With a penalty weight the solution cost
/// becomes `sum(tour costs) + weight * spread`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use trsp_alns::cost::{DeviationMeasure, TourBalance, TravelDistance};
/// use trsp_alns::models::{Depot, Instance, Request, Technician, TimeWindow};
/// use trsp_alns::solution::Solution;
///
/// let day = TimeWindow::new(0.0, 100.0).unwrap();
/// let instance = Arc::new(
///     Instance::new(
///         "doc",
///         Depot::new(0.0, 0.0, day),
///         vec![Technician::new(0.0, 0.0, day), Technician::new(0.0, 0.0, day)],
///         vec![Request::new(1.0, 0.0, 0.0), Request::new(4.0, 0.0, 0.0)],
///     )
///     .unwrap(),
/// );
/// let balance = Arc::new(
///     TourBalance::new(Arc::new(TravelDistance::new()), DeviationMeasure::MaxMinGap),
/// );
/// // tour costs 2 and 8
/// let routes = [vec![1, 3, 5], vec![2, 4, 6]];
/// let solution = Solution::from_routes(instance, balance, &routes).unwrap();
/// assert!((solution.objective() - 6.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone)]
pub struct TourBalance {
    base: Arc<dyn CostDelegate>,
    measure: DeviationMeasure,
    penalty_weight: Option<f64>,
}

impl Default for TourBalance {
    fn default() -> Self {
        Self::new(Arc::new(WorkingTime::new()), DeviationMeasure::MaxAbsDev)
    }
}

impl TourBalance {
    pub fn new(base: Arc<dyn CostDelegate>, measure: DeviationMeasure) -> Self {
        Self {
            base,
            measure,
            penalty_weight: None,
        }
    }

    /// Adds the tour costs to the objective, the spread being weighted.
    pub fn with_penalty_weight(mut self, weight: f64) -> Self {
        self.penalty_weight = Some(weight);
        self
    }

    pub fn base(&self) -> &Arc<dyn CostDelegate> {
        &self.base
    }

    pub fn measure(&self) -> DeviationMeasure {
        self.measure
    }

    /// Balance cost of the given tour costs.
    pub fn balance(&self, costs: &[f64]) -> f64 {
        let spread = self.measure.deviation(costs);
        match self.penalty_weight {
            Some(weight) => costs.iter().sum::<f64>() + weight * spread,
            None => spread,
        }
    }
}

impl CostDelegate for TourBalance {
    fn name(&self) -> &'static str {
        "tour balance"
    }

    fn sequence_cost(&self, instance: &Instance, technician: usize, sequence: &[usize]) -> f64 {
        self.base.sequence_cost(instance, technician, sequence)
    }

    fn tour_cost(&self, tour: &Tour) -> f64 {
        self.base.tour_cost(tour)
    }

    fn evaluate_detour(&self, tour: &Tour, pred: usize, node: usize, succ: usize) -> f64 {
        self.base.evaluate_detour(tour, pred, node, succ)
    }

    fn insertion_cost(&self, tour: &Tour, mv: &InsertionMove) -> f64 {
        self.base.insertion_cost(tour, mv)
    }

    fn move_improvement(&self, tour: &Tour, mv: &Move) -> f64 {
        self.base.move_improvement(tour, mv)
    }

    fn node_shifted(&self, tour: &mut Tour, shift: &ShiftMove, improvement: f64) {
        self.base.node_shifted(tour, shift, improvement);
    }

    fn move_executed(&self, tour: &mut Tour, mv: &Move, improvement: f64) {
        self.base.move_executed(tour, mv, improvement);
    }

    fn unserved_penalty(&self) -> f64 {
        self.base.unserved_penalty()
    }

    fn evaluate_solution(&self, solution: &Solution) -> f64 {
        let costs: Vec<f64> = solution.tours().iter().map(Tour::total_cost).collect();
        self.balance(&costs) + self.unserved_penalty() * solution.unserved_count() as f64
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::cost::TravelDistance;
    use crate::models::{Depot, Request, Technician, TimeWindow};

    fn instance() -> Arc<Instance> {
        let day = TimeWindow::new(0.0, 100.0).expect("valid");
        Arc::new(
            Instance::new(
                "balance",
                Depot::new(0.0, 0.0, day),
                vec![
                    Technician::new(0.0, 0.0, day),
                    Technician::new(0.0, 0.0, day),
                    Technician::new(0.0, 0.0, day),
                ],
                vec![
                    Request::new(1.0, 0.0, 0.0),
                    Request::new(2.0, 0.0, 0.0),
                    Request::new(5.0, 0.0, 0.0),
                ],
            )
            .expect("valid"),
        )
    }

    #[test]
    fn test_measures() {
        let costs = [1.0, 3.0, 8.0];
        assert_eq!(DeviationMeasure::MaxAbsDev.deviation(&costs), 4.0);
        assert!((DeviationMeasure::AvgAbsDev.deviation(&costs) - 8.0 / 3.0).abs() < 1e-10);
        assert!((DeviationMeasure::StdDev.deviation(&costs) - 26f64.sqrt()).abs() < 1e-10);
        assert_eq!(DeviationMeasure::MaxMinGap.deviation(&costs), 7.0);
        assert_eq!(DeviationMeasure::Min.deviation(&costs), 1.0);
        assert_eq!(DeviationMeasure::Max.deviation(&costs), 8.0);
    }

    #[test]
    fn test_solution_cost_is_the_spread() {
        // ids: homes 1..=3, requests 4..=6, home duplicates 7..=9
        let ins = instance();
        let routes = [vec![1, 4, 7], vec![2, 5, 8], vec![3, 6, 9]];
        let spread = Solution::from_routes(
            Arc::clone(&ins),
            Arc::new(TourBalance::new(
                Arc::new(TravelDistance::new()),
                DeviationMeasure::MaxMinGap,
            )),
            &routes,
        )
        .expect("valid routes");
        assert!((spread.objective() - 8.0).abs() < 1e-10);

        let weighted = Solution::from_routes(
            Arc::clone(&ins),
            Arc::new(
                TourBalance::new(Arc::new(TravelDistance::new()), DeviationMeasure::MaxMinGap)
                    .with_penalty_weight(0.5),
            ),
            &routes,
        )
        .expect("valid routes");
        assert!((weighted.objective() - 20.0).abs() < 1e-10);
    }

    #[test]
    fn test_tours_priced_by_base() {
        let ins = instance();
        let base = TravelDistance::new();
        let balance = TourBalance::new(Arc::new(base), DeviationMeasure::StdDev);
        let tour = Tour::from_sequence(Arc::clone(&ins), 0, &[1, 4, 5, 7]).expect("valid");
        assert_eq!(balance.tour_cost(&tour), base.tour_cost(&tour));
        assert_eq!(balance.evaluate_detour(&tour, 4, 6, 5), base.evaluate_detour(&tour, 4, 6, 5));
        assert_eq!(TourBalance::default().base().name(), "working time");
    }

    proptest! {
        #[test]
        fn prop_spread_ignores_shifts(
            costs in prop::collection::vec(0.0f64..100.0, 1..8),
            shift in -50.0f64..50.0,
        ) {
            let shifted: Vec<f64> = costs.iter().map(|c| c + shift).collect();
            let measures = [
                DeviationMeasure::MaxAbsDev,
                DeviationMeasure::AvgAbsDev,
                DeviationMeasure::MaxMinGap,
            ];
            for m in measures {
                prop_assert!((m.deviation(&costs) - m.deviation(&shifted)).abs() < 1e-9);
                prop_assert!(m.deviation(&costs) >= 0.0);
            }
        }
    }
}

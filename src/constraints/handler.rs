use log::trace;
use serde::{Deserialize, Serialize};

use super::{
    FeasibilityCode, HomeConstraint, MaxDurationConstraint, ServicedRequestsConstraint,
    SkillsConstraint, SparePartsConstraint, TimeWindowConstraint, ToolsConstraint,
    TourConstraint, Violation,
};
use crate::models::Instance;
use crate::moves::{InsertionMove, Move};
use crate::tour::{Tour, UNDEFINED};

/// Selects the optional constraints of a [`ConstraintHandler`].
///
/// Home and skills constraints are always enforced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintConfig {
    pub time_windows: bool,
    pub tools: bool,
    pub spare_parts: bool,
    /// Bound on the working time, overriding the instance bound when set.
    pub max_working_time: Option<f64>,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            time_windows: true,
            tools: true,
            spare_parts: true,
            max_working_time: None,
        }
    }
}

impl ConstraintConfig {
    pub fn with_time_windows(mut self, enabled: bool) -> Self {
        self.time_windows = enabled;
        self
    }

    pub fn with_tools(mut self, enabled: bool) -> Self {
        self.tools = enabled;
        self
    }

    pub fn with_spare_parts(mut self, enabled: bool) -> Self {
        self.spare_parts = enabled;
        self
    }

    pub fn with_max_working_time(mut self, max: f64) -> Self {
        self.max_working_time = Some(max);
        self
    }
}

/// Ordered chain of constraints.
///
/// Move codes are combined with a bitwise AND; the chain stops as soon as
/// both bits are cleared, so cheap structural constraints come first.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use trsp_alns::constraints::ConstraintHandler;
/// use trsp_alns::models::{Depot, Instance, Request, Technician, TimeWindow};
/// use trsp_alns::moves::InsertionMove;
/// use trsp_alns::tour::Tour;
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
/// let handler = ConstraintHandler::for_instance(&instance);
/// assert_eq!(handler.names(), vec!["home", "skills", "time windows", "tools", "spare parts"]);
///
/// let tour = Tour::with_home(Arc::clone(&instance), 0);
/// assert!(handler.is_feasible(&tour));
/// assert!(handler.check_insertion(&tour, &InsertionMove::new(0, 2, 1, 3)).is_feasible());
/// ```
#[derive(Debug, Default)]
pub struct ConstraintHandler {
    constraints: Vec<Box<dyn TourConstraint>>,
}

impl ConstraintHandler {
    /// Creates an empty handler that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a constraint at the end of the chain.
    pub fn with(mut self, constraint: impl TourConstraint + 'static) -> Self {
        self.constraints.push(Box::new(constraint));
        self
    }

    /// Standard chain for an instance.
    pub fn for_instance(instance: &Instance) -> Self {
        Self::from_config(instance, &ConstraintConfig::default())
    }

    /// Chain for an instance with optional constraints selected by `config`.
    ///
    /// The serviced-requests constraint is only added for dynamic instances
    /// and the duration constraint only for a finite bound.
    pub fn from_config(instance: &Instance, config: &ConstraintConfig) -> Self {
        let mut handler = Self::new();
        if instance.is_dynamic() {
            handler = handler.with(ServicedRequestsConstraint);
        }
        handler = handler.with(HomeConstraint).with(SkillsConstraint);
        if config.time_windows {
            handler = handler.with(TimeWindowConstraint);
        }
        if config.tools {
            handler = handler.with(ToolsConstraint);
        }
        let max = config
            .max_working_time
            .unwrap_or_else(|| instance.max_working_time());
        if max.is_finite() {
            handler = handler.with(MaxDurationConstraint::new(max));
        }
        if config.spare_parts {
            handler = handler.with(SparePartsConstraint);
        }
        handler
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.constraints.iter().map(|c| c.name()).collect()
    }

    fn combine(&self, check: impl Fn(&dyn TourConstraint) -> FeasibilityCode) -> FeasibilityCode {
        let mut code = FeasibilityCode::FEASIBLE;
        for constraint in &self.constraints {
            code = code & check(constraint.as_ref());
            if code.is_hopeless() {
                trace!("{} rejected the move", constraint.name());
                break;
            }
        }
        code
    }

    /// Combined feasibility code of a move.
    pub fn check_move(&self, tour: &Tour, mv: &Move) -> FeasibilityCode {
        self.combine(|c| c.check_move(tour, mv))
    }

    /// Combined feasibility code of an insertion.
    pub fn check_insertion(&self, tour: &Tour, mv: &InsertionMove) -> FeasibilityCode {
        self.combine(|c| c.check_insertion(tour, mv))
    }

    /// First violation found, along with the name of the violated constraint.
    pub fn check_tour(&self, tour: &Tour) -> Option<(&'static str, Violation)> {
        self.constraints
            .iter()
            .find_map(|c| c.check_tour(tour).map(|v| (c.name(), v)))
    }

    pub fn is_feasible(&self, tour: &Tour) -> bool {
        self.constraints.iter().all(|c| c.is_feasible(tour))
    }

    /// Earliest infeasible node over all constraints, [`UNDEFINED`] when the
    /// tour is feasible.
    pub fn first_infeasible_node(&self, tour: &Tour) -> usize {
        let violated: Vec<usize> = self
            .constraints
            .iter()
            .map(|c| c.first_infeasible_node(tour))
            .filter(|&n| n != UNDEFINED)
            .collect();
        tour.iter()
            .find(|n| violated.contains(n))
            .or_else(|| violated.first().copied())
            .unwrap_or(UNDEFINED)
    }

    /// Explanations of every violated constraint, `None` for a feasible tour.
    pub fn infeasibility_explanation(&self, tour: &Tour) -> Option<String> {
        let explanations: Vec<String> = self
            .constraints
            .iter()
            .filter_map(|c| c.infeasibility_explanation(tour))
            .collect();
        (!explanations.is_empty()).then(|| explanations.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::cost::TravelDistance;
    use crate::models::{AttributeSet, Depot, Request, Technician, TimeWindow};
    use crate::moves::{find_insertion, RemovalMove, ShiftMove, TwoOptMove};

    fn instance(max_working_time: f64) -> Arc<Instance> {
        let day = TimeWindow::new(0.0, 100.0).expect("valid");
        let drill = AttributeSet::from_ids(&[1]).expect("valid");
        Arc::new(
            Instance::new(
                "handler",
                Depot::new(0.0, 0.0, day),
                vec![Technician::new(0.0, 0.0, day).with_spare_parts(vec![1])],
                vec![
                    Request::new(10.0, 0.0, 0.0).with_spare_parts(vec![1]),
                    Request::new(0.0, 10.0, 0.0).with_tools(drill),
                ],
            )
            .expect("valid instance")
            .with_max_working_time(max_working_time),
        )
    }

    #[test]
    fn test_chain_order_and_config() {
        let ins = instance(f64::INFINITY);
        assert_eq!(ConstraintHandler::for_instance(&ins).len(), 5);

        let ins = instance(50.0);
        let handler = ConstraintHandler::for_instance(&ins);
        assert_eq!(
            handler.names(),
            vec!["home", "skills", "time windows", "tools", "max duration", "spare parts"]
        );

        let config = ConstraintConfig::default()
            .with_tools(false)
            .with_spare_parts(false)
            .with_time_windows(false);
        assert_eq!(ConstraintHandler::from_config(&ins, &config).len(), 3);
        assert!(ConstraintHandler::new().is_empty());
    }

    #[test]
    fn test_codes_are_combined() {
        let ins = instance(f64::INFINITY);
        let handler = ConstraintHandler::for_instance(&ins);
        let tour = Tour::from_sequence(Arc::clone(&ins), 0, &[1, 2, 4]).expect("valid");

        // tool missing and no depot visit later on
        let code = handler.check_insertion(&tour, &InsertionMove::new(0, 3, 1, 2));
        assert_eq!(code, FeasibilityCode::INFEASIBLE);

        let code = handler.check_move(&tour, &Move::Removal(RemovalMove::new(0, 1)));
        assert_eq!(code, FeasibilityCode::INFEASIBLE_CONTINUE);
        let code = handler.check_move(&tour, &Move::TwoOpt(TwoOptMove::new(0, 2, 2)));
        assert!(code.is_feasible());
    }

    #[test]
    fn test_explanations() {
        let ins = instance(f64::INFINITY);
        let handler = ConstraintHandler::for_instance(&ins);
        let tour = Tour::from_sequence(Arc::clone(&ins), 0, &[1, 3, 4]).expect("valid");
        assert!(!handler.is_feasible(&tour));
        assert_eq!(handler.first_infeasible_node(&tour), 3);
        let (name, violation) = handler.check_tour(&tour).expect("violation");
        assert_eq!((name, violation.node), ("tools", 3));
        assert!(handler
            .infeasibility_explanation(&tour)
            .is_some_and(|e| e.starts_with("tools")));

        let fine = Tour::from_sequence(ins, 0, &[1, 2, 4]).expect("valid");
        assert!(handler.infeasibility_explanation(&fine).is_none());
        assert_eq!(handler.first_infeasible_node(&fine), UNDEFINED);
    }

    fn tw(start: f64, end: f64) -> TimeWindow {
        TimeWindow::new(start, end).expect("valid")
    }

    fn tools(rng: &mut StdRng, p: f64) -> AttributeSet {
        let ids: Vec<usize> = (1..=3).filter(|_| rng.random_bool(p)).collect();
        AttributeSet::from_ids(&ids).expect("valid ids")
    }

    /// Two technicians and six requests with windows, skills, tools and
    /// spare parts. The first request has no requirement and is committed to
    /// technician 0 when `dynamic` is set.
    fn random_instance(seed: u64, dynamic: bool, bounded: bool) -> Arc<Instance> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut technicians = Vec::new();
        for t in 0..2 {
            let skills: &[usize] = if t == 0 { &[1] } else { &[1, 2] };
            let (x, y) = (rng.random_range(0.0..20.0), rng.random_range(0.0..20.0));
            let capacity = vec![rng.random_range(1..4), rng.random_range(1..4)];
            let carried = tools(&mut rng, 0.5);
            technicians.push(
                Technician::new(x, y, tw(0.0, 600.0))
                    .with_skills(AttributeSet::from_ids(skills).expect("valid ids"))
                    .with_tools(carried)
                    .with_spare_parts(capacity),
            );
        }
        let mut requests = Vec::new();
        for i in 0..6 {
            let (x, y) = (rng.random_range(0.0..20.0), rng.random_range(0.0..20.0));
            if i == 0 {
                requests.push(Request::new(x, y, 5.0));
                continue;
            }
            let start = rng.random_range(0.0..300.0);
            let width = rng.random_range(40.0..300.0);
            let skill: &[usize] = if rng.random_bool(0.2) { &[2] } else { &[1] };
            let needed = tools(&mut rng, 0.25);
            let parts = vec![rng.random_range(0..2), rng.random_range(0..2)];
            requests.push(
                Request::new(x, y, rng.random_range(0.0..10.0))
                    .with_time_window(tw(start, start + width))
                    .with_skills(AttributeSet::from_ids(skill).expect("valid ids"))
                    .with_tools(needed)
                    .with_spare_parts(parts),
            );
        }
        let depot = Depot::new(10.0, 10.0, tw(0.0, 1000.0)).with_service_time(5.0);
        let mut ins = Instance::new("random", depot, technicians, requests).expect("valid instance");
        if bounded {
            ins = ins.with_max_working_time(rng.random_range(150.0..400.0));
        }
        if dynamic {
            let first = ins.request_ids().start;
            ins = ins.with_committed(0, vec![first]).expect("valid commitment");
        }
        Arc::new(ins)
    }

    /// Every insertion (with and without depot trip), removal, shift and
    /// 2-opt move of a tour.
    fn all_moves(tour: &Tour) -> Vec<Move> {
        let ins = tour.instance();
        let order = tour.to_vec();
        let depot = ins.main_depot_duplicate(0);
        let mut moves = Vec::new();
        for r in ins.request_ids().filter(|&r| !tour.is_visited(r)) {
            for k in 0..order.len() - 1 {
                let plain = InsertionMove::new(0, r, order[k], order[k + 1]);
                if !tour.is_visited(depot) {
                    for j in 0..=k {
                        let trip = plain.clone().with_depot_trip(order[j], order[j + 1]);
                        moves.push(Move::Insertion(trip));
                    }
                }
                moves.push(Move::Insertion(plain));
            }
        }
        for &n in &order[1..order.len() - 1] {
            moves.push(Move::Removal(RemovalMove::new(0, n)));
        }
        for i in 1..order.len() - 1 {
            if !ins.is_request(order[i]) {
                continue;
            }
            for (j, &q) in order.iter().enumerate().skip(1) {
                if j != i && j != i + 1 {
                    moves.push(Move::Shift(ShiftMove::new(0, order[i], q, j > i)));
                }
            }
        }
        for i in 1..order.len() - 1 {
            for j in i + 1..order.len() - 1 {
                moves.push(Move::TwoOpt(TwoOptMove::new(0, order[i], order[j])));
            }
        }
        moves
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_feasible_codes_keep_tours_feasible(
            seed in any::<u64>(),
            dynamic in any::<bool>(),
            bounded in any::<bool>(),
        ) {
            let ins = random_instance(seed, dynamic, bounded);
            let handler = ConstraintHandler::for_instance(&ins);
            let cost = TravelDistance::new();

            let mut sequence = vec![ins.home(0)];
            sequence.extend_from_slice(ins.committed(0));
            sequence.push(ins.home_duplicate(0));
            let mut tour = Tour::from_sequence(Arc::clone(&ins), 0, &sequence).expect("valid");
            for r in ins.request_ids() {
                if tour.is_visited(r) {
                    continue;
                }
                if let Some(mv) = find_insertion(r, &tour, &cost, &handler, true) {
                    mv.execute(&mut tour).expect("insert");
                }
            }
            prop_assume!(handler.is_feasible(&tour));

            for mv in all_moves(&tour) {
                if !handler.check_move(&tour, &mv).is_feasible() {
                    continue;
                }
                let mut after = tour.clone();
                prop_assert!(mv.execute(&mut after).is_ok(), "{:?} cannot be executed", mv);
                prop_assert!(
                    handler.is_feasible(&after),
                    "{:?} on {:?} gives {:?}: {:?}",
                    mv,
                    tour.to_vec(),
                    after.to_vec(),
                    handler.infeasibility_explanation(&after)
                );
            }
        }
    }
}

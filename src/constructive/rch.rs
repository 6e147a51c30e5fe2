//! Randomized constructive heuristics feeding the tour pool.
//!
//! # Algorithm
//!
//! Each heuristic is a classic greedy construction in which the greedy
//! choice is replaced by a uniform draw among the `k_max` best candidates,
//! so repeated runs produce different tours:
//!
//! - nearest neighbor: append one of the nearest unserved requests to the
//!   last visited node, preferring arcs that can respect time windows
//! - best insertion: insert one of the requests with the cheapest detour
//! - nearest / furthest insertion: insert, at its cheapest position, one of
//!   the requests closest to (furthest from) the nodes already routed
//! - Clarke-Wright: merge route ends along one of the largest savings
//!
//! In giant-tour mode, every technician gets an ordered list of all the
//! requests it can serve, ignoring the constraints except for a detour
//! through the home on arcs that cannot respect time windows. The list is
//! then split into feasible tours of that technician (see
//! [`GiantTourSplit`]). In feasible-tour mode, one complete solution is
//! built with constraint checks at every step; only nearest neighbor and
//! best insertion support it.
//!
//! The tours produced are stored in a [`HashTourPool`] whose content is
//! later recombined by the set-covering post-optimizer.
//!
//! # Complexity
//!
//! Giant tours cost O(n²) for nearest neighbor, O(n³) for the insertion
//! heuristics and Clarke-Wright, plus the O(n²) split.
//!
//! # Reference
//!
//! Pillac, V., Guéret, C. & Medaglia, A.L. (2013). "A parallel matheuristic
//! for the technician routing and scheduling problem", *Optimization
//! Letters* 7(7), 1525-1535.
//!
//! Clarke, G. & Wright, J.W. (1964). "Scheduling of Vehicles from a Central
//! Depot to a Number of Delivery Points", *Operations Research* 12(4), 568-581.

use std::sync::Arc;

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::split::GiantTourSplit;
use crate::constraints::ConstraintHandler;
use crate::cost::CostDelegate;
use crate::error::{Result, TrspError};
use crate::models::Instance;
use crate::moves::{find_insertion, InsertionMove, Move};
use crate::pool::HashTourPool;
use crate::solution::Solution;
use crate::tour::Tour;

/// Randomized constructive heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RchKind {
    NearestNeighbor,
    BestInsertion,
    NearestInsertion,
    FurthestInsertion,
    ClarkeWright,
}

impl RchKind {
    pub const ALL: [RchKind; 5] = [
        RchKind::NearestNeighbor,
        RchKind::BestInsertion,
        RchKind::NearestInsertion,
        RchKind::FurthestInsertion,
        RchKind::ClarkeWright,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RchKind::NearestNeighbor => "RNN",
            RchKind::BestInsertion => "RBI",
            RchKind::NearestInsertion => "RNI",
            RchKind::FurthestInsertion => "RFI",
            RchKind::ClarkeWright => "RCW",
        }
    }

    /// Returns `true` if the heuristic can build feasible tours directly.
    pub fn supports_feasible_tours(self) -> bool {
        matches!(self, RchKind::NearestNeighbor | RchKind::BestInsertion)
    }
}

/// Parameters of [`RandomizedConstructive`].
///
/// # Examples
///
/// ```
/// use trsp_alns::constructive::{RchConfig, RchKind};
///
/// let json = r#"{ "heuristics": ["clarke_wright"], "k_max": 2 }"#;
/// let config: RchConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(config.heuristics, vec![RchKind::ClarkeWright]);
/// assert!(config.giant_tours);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RchConfig {
    pub heuristics: Vec<RchKind>,
    /// Number of best candidates among which each choice is drawn; 1 makes
    /// the heuristics deterministic.
    pub k_max: usize,
    /// Runs of every heuristic.
    pub iterations: usize,
    /// Builds giant tours and splits them instead of building feasible
    /// tours directly.
    pub giant_tours: bool,
    /// Prices time-window-infeasible arcs of giant tours as a detour
    /// through the home.
    pub time_window_check: bool,
}

impl Default for RchConfig {
    fn default() -> Self {
        Self {
            heuristics: RchKind::ALL.to_vec(),
            k_max: 3,
            iterations: 25,
            giant_tours: true,
            time_window_check: true,
        }
    }
}

impl RchConfig {
    pub fn with_heuristics(mut self, heuristics: Vec<RchKind>) -> Self {
        self.heuristics = heuristics;
        self
    }

    pub fn with_k_max(mut self, k_max: usize) -> Self {
        self.k_max = k_max;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_giant_tours(mut self, enabled: bool) -> Self {
        self.giant_tours = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.k_max == 0 {
            return Err(TrspError::InvalidParameter {
                name: "k_max",
                reason: "at least one candidate is required".into(),
            });
        }
        if self.heuristics.is_empty() {
            return Err(TrspError::InvalidParameter {
                name: "heuristics",
                reason: "no heuristic selected".into(),
            });
        }
        if !self.giant_tours {
            if let Some(kind) = self.heuristics.iter().find(|k| !k.supports_feasible_tours()) {
                return Err(TrspError::InvalidParameter {
                    name: "giant_tours",
                    reason: format!("{} only builds giant tours", kind.name()),
                });
            }
        }
        Ok(())
    }
}

/// Savings of joining `i` (end of a route) to `j` (start of another).
#[derive(Debug, Clone, Copy)]
struct Saving {
    i: usize,
    j: usize,
    value: f64,
}

/// Generator of randomized tours for the tour pool.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use trsp_alns::constraints::ConstraintHandler;
/// use trsp_alns::constructive::{RandomizedConstructive, RchConfig};
/// use trsp_alns::cost::TravelDistance;
/// use trsp_alns::models::{Depot, Instance, Request, Technician, TimeWindow};
/// use trsp_alns::pool::{GroerHasher, HashTourPool, PoolConfig};
///
/// let day = TimeWindow::new(0.0, 100.0).unwrap();
/// let instance = Arc::new(
///     Instance::new(
///         "doc",
///         Depot::new(0.0, 0.0, day),
///         vec![Technician::new(0.0, 0.0, day)],
///         vec![Request::new(1.0, 0.0, 0.0), Request::new(0.0, 1.0, 0.0)],
///     )
///     .unwrap(),
/// );
/// let handler = ConstraintHandler::for_instance(&instance);
/// let rch = RandomizedConstructive::new(
///     Arc::clone(&instance),
///     Arc::new(TravelDistance::new()),
///     RchConfig::default().with_iterations(2),
/// )
/// .unwrap();
/// let mut pool = HashTourPool::new(
///     &instance,
///     Arc::new(GroerHasher::new(instance.max_id(), 7)),
///     PoolConfig::default(),
/// );
/// let added = rch
///     .fill_pool(&handler, &mut pool, &mut StdRng::seed_from_u64(3))
///     .unwrap();
/// assert!(added >= 1);
/// assert_eq!(added, pool.len());
/// ```
#[derive(Debug, Clone)]
pub struct RandomizedConstructive {
    instance: Arc<Instance>,
    cost: Arc<dyn CostDelegate>,
    config: RchConfig,
    /// Requests committed to some technician.
    committed: Vec<bool>,
}

impl RandomizedConstructive {
    pub fn new(
        instance: Arc<Instance>,
        cost: Arc<dyn CostDelegate>,
        config: RchConfig,
    ) -> Result<Self> {
        config.validate()?;
        let mut committed = vec![false; instance.max_id()];
        for t in 0..instance.technician_count() {
            for &node in instance.committed(t) {
                committed[node] = true;
            }
        }
        Ok(Self {
            instance,
            cost,
            config,
            committed,
        })
    }

    pub fn config(&self) -> &RchConfig {
        &self.config
    }

    /// Runs every configured heuristic `iterations` times and stores the
    /// tours produced in `pool`. Returns the number of new pool entries.
    pub fn fill_pool<R: Rng>(
        &self,
        constraints: &ConstraintHandler,
        pool: &mut HashTourPool,
        rng: &mut R,
    ) -> Result<usize> {
        let split = GiantTourSplit::new(&*self.cost, constraints);
        let mut added = 0;
        for &kind in &self.config.heuristics {
            let before = added;
            for _ in 0..self.config.iterations {
                if self.config.giant_tours {
                    for t in 0..self.instance.technician_count() {
                        let giant = self.giant_tour(kind, t, rng);
                        if let Some(result) = split.split(&self.instance, t, &giant)? {
                            added += pool.add(&result.tours);
                        }
                    }
                } else {
                    let solution = self.feasible_solution(kind, constraints, rng)?;
                    added += pool.add_solution(&solution);
                }
            }
            debug!("{}: {} new tours", kind.name(), added - before);
        }
        info!(
            "{}: randomized heuristics added {added} tours, pool holds {}",
            self.instance.name(),
            pool.len()
        );
        Ok(added)
    }

    /// Ordered list of the open requests compatible with `technician`.
    pub fn giant_tour<R: Rng>(&self, kind: RchKind, technician: usize, rng: &mut R) -> Vec<usize> {
        let requests = self.open_requests(technician);
        if requests.is_empty() {
            return requests;
        }
        match kind {
            RchKind::NearestNeighbor => self.nearest_neighbor(technician, requests, rng),
            RchKind::BestInsertion => self.best_insertion(technician, requests, rng),
            RchKind::NearestInsertion => self.distance_insertion(technician, requests, false, rng),
            RchKind::FurthestInsertion => self.distance_insertion(technician, requests, true, rng),
            RchKind::ClarkeWright => self.clarke_wright(technician, requests, rng),
        }
    }

    /// Builds a complete solution with feasibility checks at every step.
    ///
    /// Requests that cannot be inserted stay unserved.
    pub fn feasible_solution<R: Rng>(
        &self,
        kind: RchKind,
        constraints: &ConstraintHandler,
        rng: &mut R,
    ) -> Result<Solution> {
        let mut tours = (0..self.instance.technician_count())
            .map(|t| {
                let committed = self.instance.committed(t);
                let mut route = Vec::with_capacity(committed.len() + 2);
                route.push(self.instance.home(t));
                route.extend_from_slice(committed);
                route.push(self.instance.home_duplicate(t));
                Tour::from_sequence(Arc::clone(&self.instance), t, &route)
            })
            .collect::<Result<Vec<_>>>()?;
        let mut unserved: Vec<usize> = self
            .instance
            .request_ids()
            .filter(|&r| !self.committed[r])
            .collect();

        match kind {
            RchKind::NearestNeighbor => {
                self.feasible_nearest_neighbor(&mut tours, &mut unserved, constraints, rng)?
            }
            RchKind::BestInsertion => {
                self.feasible_best_insertion(&mut tours, &mut unserved, constraints, rng)?
            }
            other => {
                return Err(TrspError::NotSupported {
                    component: other.name(),
                    operation: "feasible tour construction",
                })
            }
        }

        let routes: Vec<Vec<usize>> = tours.iter().map(Tour::to_vec).collect();
        Solution::from_routes(Arc::clone(&self.instance), Arc::clone(&self.cost), &routes)
    }

    fn open_requests(&self, technician: usize) -> Vec<usize> {
        self.instance
            .request_ids()
            .filter(|&r| !self.committed[r] && self.instance.is_compatible(technician, r))
            .collect()
    }

    /// Uniform index among the `k_max` first of `len` ranked candidates.
    fn next_index<R: Rng>(&self, len: usize, rng: &mut R) -> usize {
        rng.random_range(0..len.min(self.config.k_max).max(1))
    }

    /// Cost of arc `a → b` in a giant tour of `technician`.
    fn arc_cost(&self, technician: usize, a: usize, b: usize) -> f64 {
        let ins = &self.instance;
        if self.config.time_window_check && !ins.is_arc_feasible(a, b) {
            let home = ins.home(technician);
            ins.distance(a, home) + ins.distance(home, b)
        } else {
            ins.distance(a, b)
        }
    }

    /// Cheapest detour of `node` in `giant` and the index to insert it at.
    fn cheapest_position(&self, technician: usize, giant: &[usize], node: usize) -> (f64, usize) {
        let home = self.instance.home(technician);
        let home_dup = self.instance.home_duplicate(technician);
        (0..=giant.len())
            .map(|pos| {
                let pred = if pos == 0 { home } else { giant[pos - 1] };
                let succ = giant.get(pos).copied().unwrap_or(home_dup);
                let detour = self.arc_cost(technician, pred, node)
                    + self.arc_cost(technician, node, succ)
                    - self.arc_cost(technician, pred, succ);
                (detour, pos)
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .unwrap_or((0.0, giant.len()))
    }

    fn nearest_neighbor<R: Rng>(
        &self,
        technician: usize,
        mut remaining: Vec<usize>,
        rng: &mut R,
    ) -> Vec<usize> {
        let ins = &self.instance;
        let check = self.config.time_window_check;
        let mut giant = Vec::with_capacity(remaining.len());
        let mut last = ins.home(technician);
        while !remaining.is_empty() {
            remaining.sort_by(|&a, &b| {
                let late_a = check && !ins.is_arc_feasible(last, a);
                let late_b = check && !ins.is_arc_feasible(last, b);
                late_a
                    .cmp(&late_b)
                    .then(ins.distance(last, a).total_cmp(&ins.distance(last, b)))
            });
            last = remaining.remove(self.next_index(remaining.len(), rng));
            giant.push(last);
        }
        giant
    }

    fn best_insertion<R: Rng>(
        &self,
        technician: usize,
        mut remaining: Vec<usize>,
        rng: &mut R,
    ) -> Vec<usize> {
        let seed = remaining.swap_remove(rng.random_range(0..remaining.len()));
        let mut giant = Vec::with_capacity(remaining.len() + 1);
        giant.push(seed);
        while !remaining.is_empty() {
            let mut ranked: Vec<(f64, usize, usize)> = remaining
                .iter()
                .enumerate()
                .map(|(index, &r)| {
                    let (detour, pos) = self.cheapest_position(technician, &giant, r);
                    (detour, index, pos)
                })
                .collect();
            ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
            let (_, index, pos) = ranked[self.next_index(ranked.len(), rng)];
            giant.insert(pos, remaining.swap_remove(index));
        }
        giant
    }

    /// Nearest (or furthest) insertion: requests are ranked by their
    /// distance to the closest routed node, the home included.
    fn distance_insertion<R: Rng>(
        &self,
        technician: usize,
        mut remaining: Vec<usize>,
        furthest: bool,
        rng: &mut R,
    ) -> Vec<usize> {
        let ins = &self.instance;
        let home = ins.home(technician);
        let mut closeness: Vec<f64> = remaining.iter().map(|&r| ins.distance(home, r)).collect();
        let mut giant = Vec::with_capacity(remaining.len());
        while !remaining.is_empty() {
            let mut order: Vec<usize> = (0..remaining.len()).collect();
            order.sort_by(|&a, &b| {
                let ord = closeness[a].total_cmp(&closeness[b]);
                if furthest {
                    ord.reverse()
                } else {
                    ord
                }
            });
            let index = order[self.next_index(order.len(), rng)];
            let node = remaining.swap_remove(index);
            closeness.swap_remove(index);

            let (_, pos) = self.cheapest_position(technician, &giant, node);
            giant.insert(pos, node);
            for (c, &r) in closeness.iter_mut().zip(&remaining) {
                *c = c.min(ins.distance(node, r));
            }
        }
        giant
    }

    /// Randomized savings: routes are merged along one of the best savings
    /// until none applies, then the remaining routes are chained in random
    /// order.
    fn clarke_wright<R: Rng>(&self, technician: usize, requests: Vec<usize>, rng: &mut R) -> Vec<usize> {
        let ins = &self.instance;
        let home = ins.home(technician);
        let mut savings: Vec<Saving> = Vec::with_capacity(requests.len() * requests.len());
        for &i in &requests {
            for &j in &requests {
                if i == j || (self.config.time_window_check && !ins.is_arc_feasible(i, j)) {
                    continue;
                }
                savings.push(Saving {
                    i,
                    j,
                    value: ins.distance(i, home) + ins.distance(home, j) - ins.distance(i, j),
                });
            }
        }
        savings.sort_by(|a, b| b.value.total_cmp(&a.value));

        // route index of every routed node
        let mut owner = vec![usize::MAX; ins.max_id()];
        let mut routes: Vec<Vec<usize>> = requests.iter().map(|&r| vec![r]).collect();
        for (index, &r) in requests.iter().enumerate() {
            owner[r] = index;
        }

        loop {
            savings.retain(|s| {
                let (a, b) = (owner[s.i], owner[s.j]);
                a != b && routes[a].last() == Some(&s.i) && routes[b].first() == Some(&s.j)
            });
            if savings.is_empty() {
                break;
            }
            let saving = savings.remove(self.next_index(savings.len(), rng));
            let (a, b) = (owner[saving.i], owner[saving.j]);
            let tail = std::mem::take(&mut routes[b]);
            for &n in &tail {
                owner[n] = a;
            }
            routes[a].extend(tail);
        }

        let mut routes: Vec<Vec<usize>> = routes.into_iter().filter(|r| !r.is_empty()).collect();
        routes.shuffle(rng);
        routes.concat()
    }

    /// Round robin over the technicians in random order: each appends one of
    /// its nearest requests that can be served before returning home, or
    /// opens a trip to the main depot when none can. Technicians that can
    /// add nothing leave the rotation.
    fn feasible_nearest_neighbor<R: Rng>(
        &self,
        tours: &mut [Tour],
        unserved: &mut Vec<usize>,
        constraints: &ConstraintHandler,
        rng: &mut R,
    ) -> Result<()> {
        let ins = &self.instance;
        let mut active: Vec<usize> = (0..tours.len()).collect();
        active.shuffle(rng);
        while !unserved.is_empty() && !active.is_empty() {
            let mut still_active = Vec::with_capacity(active.len());
            for &t in &active {
                let tour = &tours[t];
                let home_dup = ins.home_duplicate(t);
                let last = tour.pred(home_dup);
                let mut candidates: Vec<usize> = unserved
                    .iter()
                    .copied()
                    .filter(|&r| ins.is_compatible(t, r))
                    .collect();
                candidates
                    .sort_by(|&a, &b| ins.distance(last, a).total_cmp(&ins.distance(last, b)));

                let feasible: Vec<InsertionMove> = candidates
                    .iter()
                    .map(|&r| InsertionMove::new(t, r, last, home_dup))
                    .filter(|mv| constraints.check_insertion(tour, mv).is_feasible())
                    .take(self.config.k_max)
                    .collect();
                let chosen = if feasible.is_empty() {
                    self.depot_trip_insertion(tour, &candidates, constraints)
                } else {
                    let index = self.next_index(feasible.len(), rng);
                    feasible.into_iter().nth(index)
                };
                let Some(mv) = chosen else {
                    continue;
                };
                let tour = &mut tours[t];
                Move::Insertion(mv.clone()).execute(tour)?;
                self.cost.evaluate_tour(tour);
                unserved.retain(|&r| r != mv.node());
                still_active.push(t);
            }
            active = still_active;
        }
        Ok(())
    }

    /// Cheapest insertion of the nearest candidate that only fits with a
    /// replenishment trip to the main depot.
    fn depot_trip_insertion(
        &self,
        tour: &Tour,
        candidates: &[usize],
        constraints: &ConstraintHandler,
    ) -> Option<InsertionMove> {
        if tour.main_depot_visit().is_some() {
            return None;
        }
        candidates.iter().find_map(|&r| {
            find_insertion(r, tour, &*self.cost, constraints, true)
                .filter(|mv| mv.depot_trip().is_some())
        })
    }

    /// Inserts one of the requests with the cheapest feasible insertion
    /// over all tours until none fits.
    fn feasible_best_insertion<R: Rng>(
        &self,
        tours: &mut [Tour],
        unserved: &mut Vec<usize>,
        constraints: &ConstraintHandler,
        rng: &mut R,
    ) -> Result<()> {
        loop {
            let snapshot = &*tours;
            let mut ranked: Vec<InsertionMove> = unserved
                .par_iter()
                .filter_map(|&r| {
                    snapshot
                        .iter()
                        .filter_map(|tour| find_insertion(r, tour, &*self.cost, constraints, true))
                        .min_by(|a, b| a.cost().total_cmp(&b.cost()))
                })
                .collect();
            if ranked.is_empty() {
                return Ok(());
            }
            ranked.sort_by(|a, b| a.cost().total_cmp(&b.cost()));
            let mv = ranked.swap_remove(self.next_index(ranked.len(), rng));
            let tour = &mut tours[mv.technician()];
            Move::Insertion(mv.clone()).execute(tour)?;
            self.cost.evaluate_tour(tour);
            unserved.retain(|&r| r != mv.node());
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::cost::TravelDistance;
    use crate::evaluation::SolutionChecker;
    use crate::models::{AttributeSet, Depot, Request, Technician, TimeWindow};
    use crate::moves::test_support::open_instance;
    use crate::pool::{GroerHasher, PoolConfig};

    fn generator(ins: &Arc<Instance>, config: RchConfig) -> RandomizedConstructive {
        RandomizedConstructive::new(Arc::clone(ins), Arc::new(TravelDistance::new()), config)
            .expect("valid config")
    }

    /// Two technicians, the second one alone able to serve the last request.
    fn skilled_instance() -> Arc<Instance> {
        let day = TimeWindow::new(0.0, 1000.0).expect("valid");
        let skill = AttributeSet::from_ids(&[1]).expect("valid");
        Arc::new(
            Instance::new(
                "rch",
                Depot::new(0.0, 0.0, day),
                vec![
                    Technician::new(0.0, 0.0, day),
                    Technician::new(10.0, 0.0, day).with_skills(skill),
                ],
                vec![
                    Request::new(1.0, 0.0, 1.0),
                    Request::new(2.0, 3.0, 1.0),
                    Request::new(8.0, 1.0, 1.0),
                    Request::new(9.0, 4.0, 1.0).with_skills(skill),
                ],
            )
            .expect("valid"),
        )
    }

    #[test]
    fn test_config_validation() {
        assert!(RchConfig::default().validate().is_ok());
        assert!(RchConfig::default().with_k_max(0).validate().is_err());
        assert!(RchConfig::default().with_heuristics(vec![]).validate().is_err());
        let direct = RchConfig::default().with_giant_tours(false);
        assert!(direct.validate().is_err());
        assert!(direct
            .with_heuristics(vec![RchKind::NearestNeighbor, RchKind::BestInsertion])
            .validate()
            .is_ok());
    }

    #[test]
    fn test_greedy_nearest_neighbor_follows_the_line() {
        let ins = open_instance(&[(3.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        let rch = generator(&ins, RchConfig::default().with_k_max(1));
        let giant = rch.giant_tour(RchKind::NearestNeighbor, 0, &mut StdRng::seed_from_u64(0));
        assert_eq!(giant, vec![3, 4, 2]);
    }

    #[test]
    fn test_furthest_insertion_starts_far_away() {
        let ins = open_instance(&[(1.0, 0.0), (5.0, 0.0), (2.0, 0.0)]);
        let rch = generator(&ins, RchConfig::default().with_k_max(1));
        let giant = rch.giant_tour(RchKind::FurthestInsertion, 0, &mut StdRng::seed_from_u64(0));
        // the furthest request is routed first, the others fit on the way
        let mut sorted = giant.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![2, 3, 4]);
        let detour: f64 = std::iter::once(1)
            .chain(giant.iter().copied())
            .chain(std::iter::once(5))
            .collect::<Vec<_>>()
            .windows(2)
            .map(|w| ins.distance(w[0], w[1]))
            .sum();
        assert!((detour - 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_giant_tours_skip_incompatible_requests() {
        let ins = skilled_instance();
        let mut rng = StdRng::seed_from_u64(11);
        for kind in RchKind::ALL {
            let rch = generator(&ins, RchConfig::default());
            let first = rch.giant_tour(kind, 0, &mut rng);
            assert!(!first.contains(&6), "{}: {first:?}", kind.name());
            assert_eq!(first.len(), 3);
            let second = rch.giant_tour(kind, 1, &mut rng);
            assert_eq!(second.len(), 4);
        }
    }

    #[test]
    fn test_committed_requests_are_left_out() {
        let ins = Arc::new(
            Instance::clone(&open_instance(&[(1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]))
                .with_committed(0, vec![2])
                .expect("valid"),
        );
        let rch = generator(&ins, RchConfig::default());
        let mut rng = StdRng::seed_from_u64(5);
        for kind in RchKind::ALL {
            let giant = rch.giant_tour(kind, 0, &mut rng);
            assert!(!giant.contains(&2));
        }
        let handler = ConstraintHandler::for_instance(&ins);
        let solution = rch
            .feasible_solution(RchKind::BestInsertion, &handler, &mut rng)
            .expect("supported");
        assert_eq!(&solution.tour(0).to_vec()[..2], &[1, 2]);
        assert!(solution.is_complete());
    }

    #[test]
    fn test_feasible_mode_rejects_giant_only_heuristics() {
        let ins = open_instance(&[(1.0, 0.0)]);
        let handler = ConstraintHandler::for_instance(&ins);
        let rch = generator(&ins, RchConfig::default());
        let err = rch
            .feasible_solution(RchKind::ClarkeWright, &handler, &mut StdRng::seed_from_u64(0))
            .expect_err("giant tours only");
        assert!(matches!(err, TrspError::NotSupported { .. }));
    }

    #[test]
    fn test_fill_pool_stores_valid_tours() {
        let ins = skilled_instance();
        let handler = ConstraintHandler::for_instance(&ins);
        let rch = generator(&ins, RchConfig::default().with_iterations(3));
        let mut pool = HashTourPool::new(
            &ins,
            Arc::new(GroerHasher::new(ins.max_id(), 1)),
            PoolConfig::default(),
        );
        let added = rch
            .fill_pool(&handler, &mut pool, &mut StdRng::seed_from_u64(2))
            .expect("fill");
        assert!(added > 0);
        assert_eq!(added, pool.len());
        for tour in pool.tours() {
            assert!(tour.requests(&ins).all(|r| ins.is_compatible(tour.technician, r)));
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_giant_tours_are_permutations(seed in any::<u64>(), k_max in 1usize..5) {
            let ins = open_instance(&[(1.0, 2.0), (4.0, 1.0), (3.0, 3.0), (0.0, 5.0), (2.0, 2.0)]);
            let rch = generator(&ins, RchConfig::default().with_k_max(k_max));
            let mut rng = StdRng::seed_from_u64(seed);
            for kind in RchKind::ALL {
                let mut giant = rch.giant_tour(kind, 0, &mut rng);
                giant.sort_unstable();
                prop_assert_eq!(giant, (2..=6).collect::<Vec<_>>());
            }
        }

        #[test]
        fn prop_feasible_solutions_are_valid(seed in any::<u64>()) {
            let ins = skilled_instance();
            let handler = ConstraintHandler::for_instance(&ins);
            let rch = generator(&ins, RchConfig::default().with_giant_tours(false)
                .with_heuristics(vec![RchKind::NearestNeighbor, RchKind::BestInsertion]));
            let mut rng = StdRng::seed_from_u64(seed);
            for kind in [RchKind::NearestNeighbor, RchKind::BestInsertion] {
                let solution = rch.feasible_solution(kind, &handler, &mut rng).expect("supported");
                prop_assert!(solution.is_complete());
                prop_assert!(SolutionChecker::new(&ins).is_valid(&solution));
            }
        }
    }
}

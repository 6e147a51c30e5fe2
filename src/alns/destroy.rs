//! Destroy operators for the TRSP ALNS.
//!
//! # Operators
//!
//! - [`RandomDestroy`]: removes random requests
//! - [`StaticRelatedDestroy`]: removes requests related by distance, window
//!   end and compatible technicians
//! - [`TimeRelatedDestroy`]: removes requests visited at similar times
//! - [`CriticalDestroy`]: removes the requests whose removal saves the most
//!
//! Every operator removes `floor(size * |removable|)` requests, where the
//! removable requests are the served ones that are not committed. Main
//! depot visits that are no longer needed are dropped afterwards.
//!
//! # Reference
//!
//! Ropke, S. & Pisinger, D. (2006). "An Adaptive Large Neighborhood Search
//! Heuristic for the Pickup and Delivery Problem with Time Windows",
//! *Transportation Science* 40(4), 455-472.

use std::fmt;

use log::trace;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{Result, TrspError};
use crate::models::Instance;
use crate::moves::{Move, RemovalMove};
use crate::solution::Solution;

/// Removes requests from a solution.
pub trait DestroyOperator: Send + Sync + fmt::Debug {
    fn name(&self) -> String;

    /// Removes a share `size` of the removable requests of `solution`.
    ///
    /// Returns the removed requests in removal order.
    fn destroy(&self, solution: &mut Solution, size: f64, rng: &mut StdRng) -> Result<Vec<usize>>;
}

/// Served requests that the search may remove.
pub fn removable_requests(solution: &Solution) -> Vec<usize> {
    let instance = solution.instance();
    instance
        .request_ids()
        .filter(|&r| solution.is_served(r) && !instance.is_committed(r))
        .collect()
}

fn removal_count(size: f64, removable: usize) -> usize {
    ((size.clamp(0.0, 1.0) * removable as f64).floor() as usize).min(removable)
}

fn remove_request(solution: &mut Solution, request: usize) -> Result<usize> {
    let technician = solution
        .visiting_tour(request)
        .ok_or(TrspError::NodeNotVisited {
            node: request,
            technician: usize::MAX,
        })?;
    solution.execute_move(&Move::Removal(RemovalMove::new(technician, request)))?;
    Ok(technician)
}

/// Drops the main depot visits that no remaining request needs.
pub fn remove_unneeded_depot_visits(solution: &mut Solution) -> Result<()> {
    let instance = std::sync::Arc::clone(solution.instance());
    for technician in 0..solution.tour_count() {
        let tour = solution.tour(technician);
        let Some(depot) = tour.main_depot_visit() else {
            continue;
        };
        if !tour.is_visit_to_main_depot_required() && !instance.is_committed(depot) {
            trace!("destroy: drop depot visit {depot} of tour {technician}");
            solution.execute_move(&Move::Removal(RemovalMove::new(technician, depot)))?;
        }
    }
    Ok(())
}

/// Sorts `values` by increasing key and draws the position
/// `floor(u^p * len)`, so that larger `p` favours the first entries.
fn draw_ranked(values: &mut [(usize, f64)], randomization: f64, rng: &mut StdRng) -> Option<usize> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    let u: f64 = rng.random();
    let k = (u.powf(randomization) * values.len() as f64).floor() as usize;
    Some(values[k.min(values.len() - 1)].0)
}

/// Shared skeleton: removable set, count, operator body, depot cleanup.
fn run_destroy(
    name: &str,
    solution: &mut Solution,
    size: f64,
    body: impl FnOnce(&mut Solution, Vec<usize>, usize) -> Result<Vec<usize>>,
) -> Result<Vec<usize>> {
    let removable = removable_requests(solution);
    if removable.is_empty() {
        return Ok(Vec::new());
    }
    let count = removal_count(size, removable.len());
    let removed = body(solution, removable, count)?;
    remove_unneeded_depot_visits(solution)?;
    trace!("{name}: removed {removed:?}");
    Ok(removed)
}

/// Removes requests uniformly at random.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use trsp_alns::alns::destroy::{DestroyOperator, RandomDestroy};
/// use trsp_alns::cost::TravelDistance;
/// use trsp_alns::models::{Depot, Instance, Request, Technician, TimeWindow};
/// use trsp_alns::solution::Solution;
///
/// let day = TimeWindow::new(0.0, 100.0).unwrap();
/// let instance = Arc::new(
///     Instance::new(
///         "doc",
///         Depot::new(0.0, 0.0, day),
///         vec![Technician::new(0.0, 0.0, day)],
///         vec![Request::new(1.0, 0.0, 0.0), Request::new(2.0, 0.0, 0.0)],
///     )
///     .unwrap(),
/// );
/// let mut solution =
///     Solution::from_routes(instance, Arc::new(TravelDistance::new()), &[vec![1, 2, 3, 4]])
///         .unwrap();
///
/// let removed = RandomDestroy
///     .destroy(&mut solution, 0.5, &mut StdRng::seed_from_u64(42))
///     .unwrap();
/// assert_eq!(removed.len(), 1);
/// assert_eq!(solution.unserved_count(), 1);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDestroy;

impl DestroyOperator for RandomDestroy {
    fn name(&self) -> String {
        "random".into()
    }

    fn destroy(&self, solution: &mut Solution, size: f64, rng: &mut StdRng) -> Result<Vec<usize>> {
        run_destroy("random", solution, size, |solution, mut removable, count| {
            removable.shuffle(rng);
            removable.truncate(count);
            for &request in &removable {
                remove_request(solution, request)?;
            }
            Ok(removable)
        })
    }
}

/// Removes a random seed request, then repeatedly the k-th most related
/// candidate to a random already-removed request.
fn related_destroy(
    solution: &mut Solution,
    removable: Vec<usize>,
    count: usize,
    randomization: f64,
    rng: &mut StdRng,
    relatedness: impl Fn(usize, usize) -> f64,
) -> Result<Vec<usize>> {
    let mut removed = Vec::with_capacity(count);
    if count == 0 {
        return Ok(removed);
    }
    let mut candidates = removable;
    let seed = candidates.swap_remove(rng.random_range(0..candidates.len()));
    remove_request(solution, seed)?;
    removed.push(seed);

    while removed.len() < count && !candidates.is_empty() {
        let seed = removed[rng.random_range(0..removed.len())];
        let mut values: Vec<(usize, f64)> = candidates
            .iter()
            .map(|&c| (c, relatedness(seed, c)))
            .collect();
        let Some(request) = draw_ranked(&mut values, randomization, rng) else {
            break;
        };
        candidates.retain(|&c| c != request);
        remove_request(solution, request)?;
        removed.push(request);
    }
    Ok(removed)
}

/// Relatedness from distance, time window end and shared technicians.
///
/// `r(i, j) = (1 + d)^gd * (1 + t)^gt * (1 + s)^gs` where `d` and `t` are
/// the distance and the window-end gap scaled by their maximum over all
/// request pairs, and `s = 1 - |Ki ∩ Kj| / min(|Ki|, |Kj|)` measures how
/// different the compatible technician sets are. Lower is more related.
#[derive(Debug, Clone)]
pub struct StaticRelatedDestroy {
    randomization: f64,
    gammas: (f64, f64, f64),
    first_request: usize,
    request_count: usize,
    matrix: Vec<f64>,
}

impl StaticRelatedDestroy {
    /// Precomputes the relatedness of every pair of requests of `instance`.
    pub fn new(instance: &Instance, randomization: f64, gammas: (f64, f64, f64)) -> Self {
        let requests: Vec<usize> = instance.request_ids().collect();
        let n = requests.len();
        let (mut max_distance, mut max_gap) = (0.0_f64, 0.0_f64);
        for &i in &requests {
            for &j in &requests {
                max_distance = max_distance.max(instance.distance(i, j));
                max_gap = max_gap.max(window_gap(instance, i, j));
            }
        }
        if max_distance == 0.0 {
            max_distance = 1.0;
        }
        if max_gap == 0.0 {
            max_gap = 1.0;
        }

        let (gd, gt, gs) = gammas;
        let mut matrix = vec![0.0; n * n];
        for (a, &i) in requests.iter().enumerate() {
            for (b, &j) in requests.iter().enumerate() {
                if a == b {
                    continue;
                }
                let d = instance.distance(i, j) / max_distance;
                let t = window_gap(instance, i, j) / max_gap;
                let s = technician_dissimilarity(instance, i, j);
                matrix[a * n + b] = (1.0 + d).powf(gd) * (1.0 + t).powf(gt) * (1.0 + s).powf(gs);
            }
        }
        Self {
            randomization,
            gammas,
            first_request: requests.first().copied().unwrap_or(0),
            request_count: n,
            matrix,
        }
    }

    /// Relatedness of requests `i` and `j`.
    pub fn relatedness(&self, i: usize, j: usize) -> f64 {
        let a = i - self.first_request;
        let b = j - self.first_request;
        self.matrix[a * self.request_count + b]
    }
}

fn window_gap(instance: &Instance, i: usize, j: usize) -> f64 {
    (instance.time_window(i).end() - instance.time_window(j).end()).abs()
}

fn technician_dissimilarity(instance: &Instance, i: usize, j: usize) -> f64 {
    let ki = instance.compatible_technicians(i);
    let kj = instance.compatible_technicians(j);
    let smallest = ki.len().min(kj.len());
    if smallest == 0 {
        return 1.0;
    }
    let shared = ki.iter().filter(|t| kj.contains(t)).count();
    1.0 - shared as f64 / smallest as f64
}

impl DestroyOperator for StaticRelatedDestroy {
    fn name(&self) -> String {
        let (gd, gt, gs) = self.gammas;
        format!("rel-stat-({gd},{gt},{gs})")
    }

    fn destroy(&self, solution: &mut Solution, size: f64, rng: &mut StdRng) -> Result<Vec<usize>> {
        let name = self.name();
        run_destroy(&name, solution, size, |solution, removable, count| {
            related_destroy(solution, removable, count, self.randomization, rng, |i, j| {
                self.relatedness(i, j)
            })
        })
    }
}

/// Relatedness by earliest arrival time, measured before any removal.
///
/// Requests without a common compatible technician are unrelated.
#[derive(Debug, Clone, Copy)]
pub struct TimeRelatedDestroy {
    randomization: f64,
}

impl TimeRelatedDestroy {
    pub fn new(randomization: f64) -> Self {
        Self { randomization }
    }
}

impl DestroyOperator for TimeRelatedDestroy {
    fn name(&self) -> String {
        "rel-time".into()
    }

    fn destroy(&self, solution: &mut Solution, size: f64, rng: &mut StdRng) -> Result<Vec<usize>> {
        let instance = std::sync::Arc::clone(solution.instance());
        let mut arrivals = vec![f64::INFINITY; instance.max_id()];
        for tour in solution.tours() {
            for request in tour.requests() {
                arrivals[request] = tour.earliest_arrival(request);
            }
        }
        run_destroy("rel-time", solution, size, |solution, removable, count| {
            related_destroy(solution, removable, count, self.randomization, rng, |i, j| {
                let ki = instance.compatible_technicians(i);
                let shared = instance
                    .compatible_technicians(j)
                    .iter()
                    .any(|t| ki.contains(t));
                if shared {
                    (arrivals[i] - arrivals[j]).abs()
                } else {
                    f64::INFINITY
                }
            })
        })
    }
}

/// Removes the requests with the largest removal savings, randomized by
/// drawing the `floor(u^p * n)`-th best candidate.
#[derive(Debug, Clone, Copy)]
pub struct CriticalDestroy {
    randomization: f64,
}

impl CriticalDestroy {
    pub fn new(randomization: f64) -> Self {
        Self { randomization }
    }
}

fn removal_saving(solution: &Solution, technician: usize, request: usize) -> f64 {
    let tour = solution.tour(technician);
    let mv = Move::Removal(RemovalMove::new(technician, request));
    solution.cost_delegate().move_improvement(tour, &mv)
}

impl DestroyOperator for CriticalDestroy {
    fn name(&self) -> String {
        "critical".into()
    }

    fn destroy(&self, solution: &mut Solution, size: f64, rng: &mut StdRng) -> Result<Vec<usize>> {
        run_destroy("critical", solution, size, |solution, removable, count| {
            // (request, technician, negated saving) so that the best comes first
            let mut candidates: Vec<(usize, usize, f64)> = removable
                .into_iter()
                .filter_map(|r| {
                    let t = solution.visiting_tour(r)?;
                    Some((r, t, -removal_saving(solution, t, r)))
                })
                .collect();
            let mut removed = Vec::with_capacity(count);
            while removed.len() < count {
                let mut values: Vec<(usize, f64)> =
                    candidates.iter().map(|&(r, _, v)| (r, v)).collect();
                let Some(request) = draw_ranked(&mut values, self.randomization, rng) else {
                    break;
                };
                candidates.retain(|c| c.0 != request);
                let technician = remove_request(solution, request)?;
                removed.push(request);
                for candidate in candidates.iter_mut().filter(|c| c.1 == technician) {
                    candidate.2 = -removal_saving(solution, technician, candidate.0);
                }
            }
            Ok(removed)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::SeedableRng;

    use super::*;
    use crate::cost::{CostDelegate, TravelDistance};
    use crate::evaluation::SolutionChecker;
    use crate::models::{AttributeSet, Depot, Request, Technician, TimeWindow};
    use crate::moves::test_support::open_instance;

    fn line_solution() -> Solution {
        // requests 2..=6 at x = 1..=5, home duplicate 7
        let ins = open_instance(&[(1.0, 0.0), (2.0, 0.0), (3.0, 0.0), (4.0, 0.0), (5.0, 0.0)]);
        Solution::from_routes(ins, Arc::new(TravelDistance::new()), &[vec![1, 2, 3, 4, 5, 6, 7]])
            .expect("valid")
    }

    #[test]
    fn test_removal_count() {
        assert_eq!(removal_count(0.5, 5), 2);
        assert_eq!(removal_count(1.0, 5), 5);
        assert_eq!(removal_count(0.1, 5), 0);
        assert_eq!(removal_count(2.0, 3), 3);
    }

    #[test]
    fn test_random_destroy_keeps_partition() {
        let mut solution = line_solution();
        let mut rng = StdRng::seed_from_u64(1);
        let removed = RandomDestroy.destroy(&mut solution, 0.6, &mut rng).expect("destroy");
        assert_eq!(removed.len(), 3);
        for r in &removed {
            assert!(solution.unserved().contains(r));
            assert_eq!(solution.visiting_tour(*r), None);
        }
        assert!(SolutionChecker::new(solution.instance()).is_valid(&solution));
    }

    #[test]
    fn test_empty_solution_is_untouched() {
        let ins = open_instance(&[(1.0, 0.0)]);
        let mut solution = Solution::new(ins, Arc::new(TravelDistance::new()));
        let mut rng = StdRng::seed_from_u64(1);
        assert!(CriticalDestroy::new(6.0)
            .destroy(&mut solution, 1.0, &mut rng)
            .expect("destroy")
            .is_empty());
    }

    #[test]
    fn test_committed_requests_are_kept() {
        let ins = Arc::new(
            Instance::clone(&open_instance(&[(1.0, 0.0), (2.0, 0.0)]))
                .with_committed(0, vec![2])
                .expect("valid"),
        );
        let mut solution =
            Solution::from_routes(ins, Arc::new(TravelDistance::new()), &[vec![1, 2, 3, 4]])
                .expect("valid");
        assert_eq!(removable_requests(&solution), vec![3]);
        let removed = RandomDestroy
            .destroy(&mut solution, 1.0, &mut StdRng::seed_from_u64(3))
            .expect("destroy");
        assert_eq!(removed, vec![3]);
        assert!(solution.is_served(2));
    }

    #[test]
    fn test_critical_destroy_prefers_largest_saving() {
        // request 3 is a long detour, removing it saves the most
        let ins = open_instance(&[(1.0, 0.0), (1.0, 50.0), (2.0, 0.0)]);
        let mut solution =
            Solution::from_routes(ins, Arc::new(TravelDistance::new()), &[vec![1, 2, 3, 4, 5]])
                .expect("valid");
        let removed = CriticalDestroy::new(f64::INFINITY)
            .destroy(&mut solution, 0.4, &mut StdRng::seed_from_u64(5))
            .expect("destroy");
        assert_eq!(removed, vec![3]);
    }

    #[test]
    fn test_static_relatedness_prefers_neighbours() {
        let ins = open_instance(&[(0.0, 1.0), (0.0, 2.0), (30.0, 0.0)]);
        let op = StaticRelatedDestroy::new(&ins, 6.0, (1.0, 1.0, 1.0));
        assert!(op.relatedness(2, 3) < op.relatedness(2, 4));
        assert_eq!(op.relatedness(2, 3), op.relatedness(3, 2));
        assert_eq!(op.name(), "rel-stat-(1,1,1)");

        let mut solution =
            Solution::from_routes(ins, Arc::new(TravelDistance::new()), &[vec![1, 2, 3, 4, 5]])
                .expect("valid");
        let removed = op
            .destroy(&mut solution, 0.7, &mut StdRng::seed_from_u64(11))
            .expect("destroy");
        assert_eq!(removed.len(), 2);
        assert!(SolutionChecker::new(solution.instance()).is_valid(&solution));
    }

    #[test]
    fn test_unneeded_depot_visit_is_dropped() {
        let day = TimeWindow::new(0.0, 1000.0).expect("valid");
        let drill = AttributeSet::from_ids(&[2]).expect("valid");
        let ins = Arc::new(
            Instance::new(
                "depot",
                Depot::new(0.0, 5.0, day),
                vec![Technician::new(0.0, 0.0, day)],
                vec![Request::new(10.0, 0.0, 1.0).with_tools(drill)],
            )
            .expect("valid instance"),
        );
        // home 1, request 2, home duplicate 3, depot duplicate 4
        let cost: Arc<dyn CostDelegate> = Arc::new(TravelDistance::new());
        let mut solution =
            Solution::from_routes(Arc::clone(&ins), cost, &[vec![1, 4, 2, 3]]).expect("valid");
        let removed = TimeRelatedDestroy::new(6.0)
            .destroy(&mut solution, 1.0, &mut StdRng::seed_from_u64(2))
            .expect("destroy");
        assert_eq!(removed, vec![2]);
        assert_eq!(solution.tour(0).to_vec(), vec![1, 3]);
        assert!(solution.objective().abs() < 1e-10);
    }
}

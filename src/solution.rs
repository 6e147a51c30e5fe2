//! A complete assignment of requests to technician tours.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use crate::cost::CostDelegate;
use crate::error::{Result, TrspError};
use crate::models::Instance;
use crate::moves::{Move, RemovalMove};
use crate::pool::{GroerHasher, SolutionHasher};
use crate::tour::Tour;

/// Tours of every technician, the set of unserved requests and the
/// objective value computed by a cost delegate.
///
/// Every request is either visited by exactly one tour or listed as
/// unserved. Tours are indexed by technician.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use trsp_alns::cost::TravelDistance;
/// use trsp_alns::models::{Depot, Instance, Request, Technician, TimeWindow};
/// use trsp_alns::moves::{InsertionMove, Move};
/// use trsp_alns::solution::Solution;
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
/// let mut solution = Solution::new(instance, Arc::new(TravelDistance::new()));
/// assert_eq!(solution.unserved_count(), 1);
///
/// solution
///     .execute_move(&Move::Insertion(InsertionMove::new(0, 2, 1, 3)))
///     .unwrap();
/// assert!(solution.is_complete());
/// assert_eq!(solution.visiting_tour(2), Some(0));
/// assert!((solution.objective() - 10.0).abs() < 1e-10);
/// ```
#[derive(Clone)]
pub struct Solution {
    instance: Arc<Instance>,
    tours: Vec<Tour>,
    unserved: BTreeSet<usize>,
    cost: Arc<dyn CostDelegate>,
    hasher: Arc<dyn SolutionHasher>,
    objective: f64,
}

impl Solution {
    /// Creates a solution where every technician stays home.
    pub fn new(instance: Arc<Instance>, cost: Arc<dyn CostDelegate>) -> Self {
        let tours = (0..instance.technician_count())
            .map(|t| Tour::with_home(Arc::clone(&instance), t))
            .collect();
        let unserved = instance.request_ids().collect();
        let hasher = Arc::new(GroerHasher::new(instance.max_id(), 0));
        let mut solution = Self {
            instance,
            tours,
            unserved,
            cost,
            hasher,
            objective: 0.0,
        };
        solution.evaluate();
        solution
    }

    /// Builds a solution from complete visiting sequences, `routes[t]` for
    /// technician `t`. Missing technicians stay home.
    pub fn from_routes(
        instance: Arc<Instance>,
        cost: Arc<dyn CostDelegate>,
        routes: &[Vec<usize>],
    ) -> Result<Self> {
        if routes.len() > instance.technician_count() {
            return Err(TrspError::InvalidParameter {
                name: "routes",
                reason: format!(
                    "{} routes for {} technicians",
                    routes.len(),
                    instance.technician_count()
                ),
            });
        }
        let mut solution = Self::new(Arc::clone(&instance), cost);
        let mut seen = vec![false; instance.max_id()];
        for (t, route) in routes.iter().enumerate() {
            for &node in route {
                if node >= seen.len() {
                    return Err(TrspError::UnknownNode {
                        node,
                        max_id: seen.len(),
                    });
                }
                if std::mem::replace(&mut seen[node], true) {
                    return Err(TrspError::NodeAlreadyVisited {
                        node,
                        technician: t,
                    });
                }
            }
            solution.tours[t] = Tour::from_sequence(Arc::clone(&instance), t, route)?;
        }
        solution.unserved = instance.request_ids().filter(|&r| !seen[r]).collect();
        solution.evaluate();
        Ok(solution)
    }

    /// Replaces the hasher used by [`Solution::hash`].
    pub fn with_hasher(mut self, hasher: Arc<dyn SolutionHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    /// Returns `true` if both solutions refer to the same instance.
    pub fn shares_instance(&self, other: &Solution) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }

    pub fn tours(&self) -> &[Tour] {
        &self.tours
    }

    pub fn tour(&self, technician: usize) -> &Tour {
        &self.tours[technician]
    }

    pub fn tour_count(&self) -> usize {
        self.tours.len()
    }

    /// Number of tours serving at least one request.
    pub fn active_tour_count(&self) -> usize {
        self.tours
            .iter()
            .filter(|t| t.requests().next().is_some())
            .count()
    }

    /// Technician whose tour visits `node`.
    pub fn visiting_tour(&self, node: usize) -> Option<usize> {
        self.tours.iter().position(|t| t.is_visited(node))
    }

    pub fn unserved(&self) -> &BTreeSet<usize> {
        &self.unserved
    }

    pub fn unserved_count(&self) -> usize {
        self.unserved.len()
    }

    pub fn served_count(&self) -> usize {
        self.instance.request_count() - self.unserved.len()
    }

    pub fn is_served(&self, request: usize) -> bool {
        self.instance.is_request(request) && !self.unserved.contains(&request)
    }

    /// Returns `true` if every request is served.
    pub fn is_complete(&self) -> bool {
        self.unserved.is_empty()
    }

    /// Removes a request from the unserved set.
    ///
    /// Only needed when tours are edited outside of [`Solution::execute_move`].
    pub fn mark_served(&mut self, request: usize) {
        self.unserved.remove(&request);
    }

    /// Adds a request to the unserved set.
    pub fn mark_unserved(&mut self, request: usize) {
        if self.instance.is_request(request) {
            self.unserved.insert(request);
        }
    }

    pub fn cost_delegate(&self) -> &Arc<dyn CostDelegate> {
        &self.cost
    }

    /// Objective value as last computed.
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// Recomputes the objective from the stored tour costs.
    pub fn update_objective(&mut self) -> f64 {
        self.objective = self.cost.evaluate_solution(self);
        self.objective
    }

    /// Re-evaluates every tour, then the objective.
    pub fn evaluate(&mut self) -> f64 {
        for tour in &mut self.tours {
            self.cost.evaluate_tour(tour);
        }
        self.update_objective()
    }

    /// Structural hash of the tours.
    pub fn hash(&self) -> u64 {
        self.hasher.hash_solution(self)
    }

    pub fn hasher(&self) -> &Arc<dyn SolutionHasher> {
        &self.hasher
    }

    /// Visiting sequences of all tours, indexed by technician.
    pub fn to_routes(&self) -> Vec<Vec<usize>> {
        self.tours.iter().map(Tour::to_vec).collect()
    }

    /// Applies a move, keeps tour costs and the unserved set up to date and
    /// refreshes the objective.
    pub fn execute_move(&mut self, mv: &Move) -> Result<()> {
        match mv {
            Move::Relocate(relocate) => {
                self.apply(&Move::Removal(relocate.removal().clone()))?;
                self.apply(&Move::Insertion(relocate.insertion().clone()))?;
            }
            _ => self.apply(mv)?,
        }
        self.update_objective();
        Ok(())
    }

    /// Removes `node` from the tour visiting it.
    pub fn remove_node(&mut self, node: usize) -> Result<()> {
        let technician = self.visiting_tour(node).ok_or(TrspError::NodeNotVisited {
            node,
            technician: usize::MAX,
        })?;
        self.execute_move(&Move::Removal(RemovalMove::new(technician, node)))
    }

    fn apply(&mut self, mv: &Move) -> Result<()> {
        let technician = mv.technician();
        let count = self.tours.len();
        let tour = self
            .tours
            .get_mut(technician)
            .ok_or_else(|| TrspError::InvalidParameter {
                name: "technician",
                reason: format!("{technician} out of {count} tours"),
            })?;
        let improvement = self.cost.move_improvement(tour, mv);
        mv.execute(tour)?;
        self.cost.move_executed(tour, mv, improvement);
        match mv {
            Move::Insertion(m) => {
                self.unserved.remove(&m.node());
            }
            Move::Removal(m) => self.mark_unserved(m.node()),
            _ => {}
        }
        Ok(())
    }
}

impl fmt::Debug for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solution")
            .field("instance", &self.instance.name())
            .field("objective", &self.objective)
            .field("routes", &self.to_routes())
            .field("unserved", &self.unserved)
            .field("cost", &self.cost.name())
            .finish()
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} (", self.objective)?;
        for (t, tour) in self.tours.iter().enumerate() {
            if t > 0 {
                write!(f, " ")?;
            }
            let nodes: Vec<String> = tour.iter().map(|n| n.to_string()).collect();
            write!(f, "t{t}:<{}>", nodes.join(","))?;
        }
        write!(f, ") unserved={:?}", self.unserved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::TravelDistance;
    use crate::moves::test_support::open_instance;
    use crate::moves::{InsertionMove, ShiftMove};

    #[test]
    fn test_new_solution_has_everything_unserved() {
        let ins = open_instance(&[(1.0, 0.0), (2.0, 0.0)]);
        let solution = Solution::new(Arc::clone(&ins), Arc::new(TravelDistance::new()));
        assert_eq!(solution.unserved_count(), 2);
        assert_eq!(solution.to_routes(), vec![vec![1, 4]]);
        assert_eq!(solution.objective(), 0.0);
        assert_eq!(solution.active_tour_count(), 0);
    }

    #[test]
    fn test_from_routes_rejects_duplicates() {
        let ins = open_instance(&[(1.0, 0.0), (2.0, 0.0)]);
        let cost: Arc<dyn CostDelegate> = Arc::new(TravelDistance::new());
        let err = Solution::from_routes(Arc::clone(&ins), Arc::clone(&cost), &[vec![1, 2, 2, 4]])
            .expect_err("duplicate");
        assert!(matches!(err, TrspError::NodeAlreadyVisited { node: 2, .. }));

        let solution =
            Solution::from_routes(Arc::clone(&ins), cost, &[vec![1, 3, 4]]).expect("valid");
        assert_eq!(solution.unserved().iter().copied().collect::<Vec<_>>(), vec![2]);
        assert!(solution.is_served(3));
        assert!((solution.objective() - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_execute_moves_keeps_partition() {
        let ins = open_instance(&[(1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        let mut solution = Solution::new(Arc::clone(&ins), Arc::new(TravelDistance::new()));
        solution
            .execute_move(&Move::Insertion(InsertionMove::new(0, 4, 1, 5)))
            .expect("insert");
        solution
            .execute_move(&Move::Insertion(InsertionMove::new(0, 2, 4, 5)))
            .expect("insert");
        solution
            .execute_move(&Move::Shift(ShiftMove::new(0, 4, 5, true)))
            .expect("shift");
        assert_eq!(solution.tour(0).to_vec(), vec![1, 2, 4, 5]);
        assert!((solution.objective() - 6.0).abs() < 1e-10);

        solution.remove_node(2).expect("remove");
        assert!(solution.unserved().contains(&2));
        assert!(solution.unserved().contains(&3));
        assert!(!solution.unserved().contains(&4));
        assert!((solution.objective() - 6.0).abs() < 1e-10);
        assert!(solution.remove_node(2).is_err());
    }

    #[test]
    fn test_hash_follows_structure() {
        let ins = open_instance(&[(1.0, 0.0), (2.0, 0.0)]);
        let cost: Arc<dyn CostDelegate> = Arc::new(TravelDistance::new());
        let a = Solution::from_routes(Arc::clone(&ins), Arc::clone(&cost), &[vec![1, 2, 3, 4]])
            .expect("valid");
        let b = Solution::from_routes(Arc::clone(&ins), Arc::clone(&cost), &[vec![1, 2, 3, 4]])
            .expect("valid");
        let c = Solution::from_routes(Arc::clone(&ins), cost, &[vec![1, 3, 2, 4]]).expect("valid");
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
        assert!(a.shares_instance(&c));
    }
}

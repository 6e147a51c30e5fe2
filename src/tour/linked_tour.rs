//! Arena-backed doubly-linked tour.

use std::sync::Arc;

use crate::error::{Result, TrspError};
use crate::models::{AttributeSet, Instance};

/// Sentinel for "no node" (before the first node, after the last node).
pub const UNDEFINED: usize = usize::MAX;

/// The tour of one technician.
///
/// The tour refers to its solution only through the technician index; all
/// tours of a solution share the instance through an [`Arc`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use trsp_alns::models::{Depot, Instance, Request, Technician, TimeWindow};
/// use trsp_alns::tour::Tour;
///
/// let day = TimeWindow::new(0.0, 100.0).unwrap();
/// let instance = Arc::new(
///     Instance::new(
///         "doc",
///         Depot::new(0.0, 0.0, day),
///         vec![Technician::new(0.0, 0.0, day)],
///         vec![Request::new(3.0, 4.0, 2.0)],
///     )
///     .unwrap(),
/// );
///
/// let mut tour = Tour::with_home(Arc::clone(&instance), 0);
/// tour.insert_after(tour.first(), 2).unwrap();
/// assert_eq!(tour.to_vec(), vec![1, 2, 3]);
/// assert!((tour.earliest_arrival(2) - 5.0).abs() < 1e-10);
/// assert!((tour.earliest_arrival(3) - 12.0).abs() < 1e-10);
/// assert_eq!(tour.pred(tour.succ(2)), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Tour {
    pub(super) instance: Arc<Instance>,
    pub(super) technician: usize,
    pub(super) first: usize,
    pub(super) last: usize,
    pub(super) len: usize,
    pub(super) pred: Vec<usize>,
    pub(super) succ: Vec<usize>,
    pub(super) visited: Vec<bool>,
    pub(super) earliest: Vec<f64>,
    pub(super) waiting: Vec<f64>,
    pub(super) latest: Vec<f64>,
    pub(super) depot_visited: Vec<bool>,
    pub(super) tools: Vec<AttributeSet>,
    /// Spare parts left after servicing a node, `parts` entries per node.
    pub(super) spares: Vec<i64>,
    /// Spare parts needed from a node until the next depot visit.
    pub(super) required: Vec<i64>,
    pub(super) parts: usize,
    pub(super) total_cost: f64,
}

impl Tour {
    /// Creates an empty tour for a technician.
    pub fn new(instance: Arc<Instance>, technician: usize) -> Self {
        let n = instance.max_id();
        let parts = instance.spare_part_types();
        Self {
            technician,
            first: UNDEFINED,
            last: UNDEFINED,
            len: 0,
            pred: vec![UNDEFINED; n],
            succ: vec![UNDEFINED; n],
            visited: vec![false; n],
            earliest: vec![0.0; n],
            waiting: vec![0.0; n],
            latest: vec![f64::INFINITY; n],
            depot_visited: vec![false; n],
            tools: vec![AttributeSet::empty(); n],
            spares: vec![0; n * parts],
            required: vec![0; n * parts],
            parts,
            total_cost: 0.0,
            instance,
        }
    }

    /// Creates the tour `<home, home'>` of a technician.
    pub fn with_home(instance: Arc<Instance>, technician: usize) -> Self {
        let home = instance.home(technician);
        let home_dup = instance.home_duplicate(technician);
        let mut tour = Self::new(instance, technician);
        tour.link_last(home);
        tour.link_last(home_dup);
        tour.propagate_update(home, home_dup);
        tour
    }

    /// Creates a tour visiting `nodes` in order.
    pub fn from_sequence(
        instance: Arc<Instance>,
        technician: usize,
        nodes: &[usize],
    ) -> Result<Self> {
        let mut tour = Self::new(instance, technician);
        for &node in nodes {
            tour.check_insertable(node)?;
            tour.link_last(node);
        }
        if let (Some(&first), Some(&last)) = (nodes.first(), nodes.last()) {
            tour.propagate_update(first, last);
        }
        Ok(tour)
    }

    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    /// Index of the technician (and of the tour in its solution).
    pub fn technician(&self) -> usize {
        self.technician
    }

    /// First node, or [`UNDEFINED`] for an empty tour.
    pub fn first(&self) -> usize {
        self.first
    }

    /// Last node, or [`UNDEFINED`] for an empty tour.
    pub fn last(&self) -> usize {
        self.last
    }

    /// Number of visited nodes, homes included.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if the tour visits `node`.
    pub fn is_visited(&self, node: usize) -> bool {
        self.visited.get(node).copied().unwrap_or(false)
    }

    /// Predecessor of a node, [`UNDEFINED`] for the first or an unvisited node.
    pub fn pred(&self, node: usize) -> usize {
        self.pred.get(node).copied().unwrap_or(UNDEFINED)
    }

    /// Successor of a node, [`UNDEFINED`] for the last or an unvisited node.
    pub fn succ(&self, node: usize) -> usize {
        self.succ.get(node).copied().unwrap_or(UNDEFINED)
    }

    /// Cost stored by the cost delegate.
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn set_total_cost(&mut self, cost: f64) {
        self.total_cost = cost;
    }

    /// Iterates over the visited nodes in order.
    pub fn iter(&self) -> TourIter<'_> {
        TourIter {
            tour: self,
            node: self.first,
        }
    }

    /// Visited nodes in order.
    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }

    /// Iterates over the requests served by the tour.
    pub fn requests(&self) -> impl Iterator<Item = usize> + '_ {
        self.iter().filter(move |&n| self.instance.is_request(n))
    }

    /// Inserts `node` right after `pred`.
    pub fn insert_after(&mut self, pred: usize, node: usize) -> Result<()> {
        self.check_insertable(node)?;
        self.check_visited(pred)?;
        let succ = self.succ[pred];
        self.link(pred, node);
        self.link(node, succ);
        if succ == UNDEFINED {
            self.last = node;
        }
        self.visited[node] = true;
        self.len += 1;
        self.propagate_update(pred, if succ == UNDEFINED { node } else { succ });
        Ok(())
    }

    /// Inserts `node` right before `succ`.
    pub fn insert_before(&mut self, succ: usize, node: usize) -> Result<()> {
        self.check_visited(succ)?;
        let pred = self.pred[succ];
        if pred != UNDEFINED {
            return self.insert_after(pred, node);
        }
        self.check_insertable(node)?;
        self.link(UNDEFINED, node);
        self.link(node, succ);
        self.first = node;
        self.visited[node] = true;
        self.len += 1;
        self.propagate_update(node, succ);
        Ok(())
    }

    /// Appends `node` at the end of the tour.
    pub fn append(&mut self, node: usize) -> Result<()> {
        self.check_insertable(node)?;
        let prev = self.last;
        self.link_last(node);
        self.propagate_update(if prev == UNDEFINED { node } else { prev }, node);
        Ok(())
    }

    /// Removes a node and relinks its neighbours.
    pub fn remove_node(&mut self, node: usize) -> Result<()> {
        self.check_visited(node)?;
        let pred = self.pred[node];
        let succ = self.succ[node];
        self.link(pred, succ);
        if pred == UNDEFINED {
            self.first = succ;
        }
        if succ == UNDEFINED {
            self.last = pred;
        }
        self.reset_node(node);
        self.len -= 1;
        if self.len > 0 {
            self.propagate_update(pred, succ);
        }
        Ok(())
    }

    /// Reverses the sub-path `start ..= end`, where `start` precedes `end`.
    pub fn reverse_subtour(&mut self, start: usize, end: usize) -> Result<()> {
        self.check_visited(start)?;
        self.check_visited(end)?;
        if start == end {
            return Ok(());
        }
        let before = self.pred[start];
        let after = self.succ[end];

        let mut segment = Vec::new();
        let mut node = start;
        loop {
            if node == UNDEFINED {
                // `end` does not follow `start`
                return Err(TrspError::NodeNotVisited {
                    node: end,
                    technician: self.technician,
                });
            }
            segment.push(node);
            if node == end {
                break;
            }
            node = self.succ[node];
        }

        let mut prev = before;
        for &n in segment.iter().rev() {
            self.link(prev, n);
            prev = n;
        }
        self.link(start, after);
        if before == UNDEFINED {
            self.first = end;
        }
        if after == UNDEFINED {
            self.last = start;
        }
        let from = if before == UNDEFINED { end } else { before };
        let to = if after == UNDEFINED { start } else { after };
        self.propagate_update(from, to);
        Ok(())
    }

    /// Main-depot duplicate visited by this tour, if any.
    pub fn main_depot_visit(&self) -> Option<usize> {
        let depot = self.instance.main_depot_duplicate(self.technician);
        self.is_visited(depot).then_some(depot)
    }

    /// Returns `true` if removing the depot visit would leave some request
    /// without its tools or spare parts.
    pub fn is_visit_to_main_depot_required(&self) -> bool {
        if self.main_depot_visit().is_none() {
            return false;
        }
        let tech = self.instance.technician(self.technician);
        let mut demand = vec![0i64; self.parts];
        for r in self.requests() {
            if !tech.tools().contains_all(self.instance.required_tools(r)) {
                return true;
            }
            for (p, d) in demand.iter_mut().enumerate() {
                *d += i64::from(self.instance.required_spare_parts(r, p));
            }
        }
        demand
            .iter()
            .enumerate()
            .any(|(p, &d)| d > i64::from(tech.spare_part(p)))
    }

    pub(super) fn link(&mut self, a: usize, b: usize) {
        if a != UNDEFINED {
            self.succ[a] = b;
        }
        if b != UNDEFINED {
            self.pred[b] = a;
        }
    }

    fn link_last(&mut self, node: usize) {
        if self.last == UNDEFINED {
            self.first = node;
            self.pred[node] = UNDEFINED;
        } else {
            let last = self.last;
            self.link(last, node);
        }
        self.succ[node] = UNDEFINED;
        self.last = node;
        self.visited[node] = true;
        self.len += 1;
    }

    fn reset_node(&mut self, node: usize) {
        self.pred[node] = UNDEFINED;
        self.succ[node] = UNDEFINED;
        self.visited[node] = false;
        self.earliest[node] = 0.0;
        self.waiting[node] = 0.0;
        self.latest[node] = f64::INFINITY;
        self.depot_visited[node] = false;
        self.tools[node] = AttributeSet::empty();
        let range = node * self.parts..(node + 1) * self.parts;
        self.spares[range.clone()].fill(0);
        self.required[range].fill(0);
    }

    fn check_visited(&self, node: usize) -> Result<()> {
        if self.is_visited(node) {
            Ok(())
        } else {
            Err(TrspError::NodeNotVisited {
                node,
                technician: self.technician,
            })
        }
    }

    fn check_insertable(&self, node: usize) -> Result<()> {
        if node >= self.visited.len() {
            return Err(TrspError::UnknownNode {
                node,
                max_id: self.visited.len(),
            });
        }
        if self.visited[node] {
            return Err(TrspError::NodeAlreadyVisited {
                node,
                technician: self.technician,
            });
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Tour {
    type Item = usize;
    type IntoIter = TourIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the nodes of a [`Tour`].
#[derive(Debug, Clone)]
pub struct TourIter<'a> {
    tour: &'a Tour,
    node: usize,
}

impl Iterator for TourIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.node == UNDEFINED {
            return None;
        }
        let current = self.node;
        self.node = self.tour.succ[current];
        Some(current)
    }
}

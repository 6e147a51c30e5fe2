//! Problem instance: node-id layout, travel data and precomputed
//! compatibilities.
//!
//! # Node ids
//!
//! With `T` technicians and `R` requests, node ids are laid out as:
//!
//! ```text
//! 0                       main depot
//! 1 ..= T                 technician homes (tour start)
//! T+1 ..= T+R             requests
//! T+R+1 ..= 2T+R          home duplicates (tour end)
//! 2T+R+1 ..= 3T+R         main-depot duplicates (depot trip of technician t)
//! ```
//!
//! Every tour therefore visits a disjoint set of node ids, which lets the
//! tours of a solution share the same flat per-node arrays.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::{AttributeSet, Depot, Request, Technician, TimeWindow};
use crate::distance::DistanceMatrix;
use crate::error::{Result, TrspError};

/// Role of a node id within the instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// The main depot itself (id 0).
    MainDepot,
    /// Start of a technician's tour.
    Home(usize),
    /// A request, by index in the request list.
    Request(usize),
    /// End of a technician's tour.
    HomeDuplicate(usize),
    /// The main depot visited inside a technician's tour.
    DepotDuplicate(usize),
}

#[derive(Debug, Clone)]
struct NodeData {
    x: f64,
    y: f64,
    time_window: TimeWindow,
    service_time: f64,
    kind: NodeKind,
}

/// A TRSP instance, read-only during the search.
///
/// # Examples
///
/// ```
/// use trsp_alns::models::{Depot, Instance, NodeKind, Request, Technician, TimeWindow};
///
/// let day = TimeWindow::new(0.0, 480.0).unwrap();
/// let instance = Instance::new(
///     "tiny",
///     Depot::new(0.0, 0.0, day),
///     vec![Technician::new(10.0, 0.0, day)],
///     vec![Request::new(5.0, 5.0, 10.0), Request::new(8.0, 2.0, 10.0)],
/// )
/// .unwrap();
///
/// assert_eq!(instance.max_id(), 1 + 3 + 2);
/// assert_eq!(instance.home(0), 1);
/// assert_eq!(instance.request_ids(), 2..4);
/// assert_eq!(instance.kind(4), Some(NodeKind::HomeDuplicate(0)));
/// assert!(instance.is_compatible(0, 2));
/// ```
#[derive(Debug, Clone)]
pub struct Instance {
    name: String,
    depot: Depot,
    technicians: Vec<Technician>,
    requests: Vec<Request>,
    nodes: Vec<NodeData>,
    distances: DistanceMatrix,
    arcs: Vec<bool>,
    compatible: Vec<Vec<usize>>,
    spare_part_types: usize,
    max_working_time: f64,
    committed: Vec<Vec<usize>>,
    committed_nodes: Vec<bool>,
}

impl Instance {
    /// Builds an instance and precomputes the arc graph and the
    /// request/technician compatibility.
    ///
    /// Requests without an explicit time window inherit the depot's.
    pub fn new(
        name: impl Into<String>,
        depot: Depot,
        technicians: Vec<Technician>,
        requests: Vec<Request>,
    ) -> Result<Self> {
        if technicians.is_empty() {
            return Err(TrspError::InvalidInstance(
                "at least one technician is required".into(),
            ));
        }
        let coords_ok = depot.x().is_finite()
            && depot.y().is_finite()
            && technicians.iter().all(|t| t.x().is_finite() && t.y().is_finite())
            && requests.iter().all(|r| r.x().is_finite() && r.y().is_finite());
        if !coords_ok {
            return Err(TrspError::InvalidInstance("non-finite coordinates".into()));
        }
        if let Some(idx) = requests
            .iter()
            .position(|r| !r.service_time().is_finite() || r.service_time() < 0.0)
        {
            return Err(TrspError::InvalidInstance(format!(
                "request {idx} has an invalid service time"
            )));
        }

        let t_count = technicians.len();
        let depot_node = NodeData {
            x: depot.x(),
            y: depot.y(),
            time_window: depot.time_window(),
            service_time: depot.service_time(),
            kind: NodeKind::MainDepot,
        };
        let mut nodes = Vec::with_capacity(1 + 3 * t_count + requests.len());
        nodes.push(depot_node.clone());
        for (t, tech) in technicians.iter().enumerate() {
            nodes.push(home_node(tech, NodeKind::Home(t)));
        }
        for (i, req) in requests.iter().enumerate() {
            nodes.push(NodeData {
                x: req.x(),
                y: req.y(),
                time_window: req.time_window().unwrap_or(depot.time_window()),
                service_time: req.service_time(),
                kind: NodeKind::Request(i),
            });
        }
        for (t, tech) in technicians.iter().enumerate() {
            nodes.push(home_node(tech, NodeKind::HomeDuplicate(t)));
        }
        for t in 0..t_count {
            nodes.push(NodeData {
                kind: NodeKind::DepotDuplicate(t),
                ..depot_node.clone()
            });
        }

        let points: Vec<(f64, f64)> = nodes.iter().map(|n| (n.x, n.y)).collect();
        let distances = DistanceMatrix::euclidean(&points);

        let spare_part_types = technicians
            .iter()
            .map(|t| t.spare_parts().len())
            .chain(requests.iter().map(|r| r.spare_parts().len()))
            .max()
            .unwrap_or(0);

        let max_id = nodes.len();
        let mut instance = Self {
            name: name.into(),
            depot,
            technicians,
            requests,
            nodes,
            distances,
            arcs: Vec::new(),
            compatible: Vec::new(),
            spare_part_types,
            max_working_time: f64::INFINITY,
            committed: vec![Vec::new(); t_count],
            committed_nodes: vec![false; max_id],
        };
        instance.arcs = instance.build_arc_graph();
        instance.compatible = instance.build_compatibility();
        Ok(instance)
    }

    /// Bounds the working time of every tour.
    pub fn with_max_working_time(mut self, max: f64) -> Self {
        self.max_working_time = max;
        self
    }

    /// Declares the visits already served or assigned to a technician, in
    /// visiting order after the home node.
    ///
    /// Committed nodes can no longer be removed or moved by the search.
    pub fn with_committed(mut self, technician: usize, nodes: Vec<usize>) -> Result<Self> {
        if technician >= self.technicians.len() {
            return Err(TrspError::InvalidInstance(format!(
                "unknown technician {technician}"
            )));
        }
        for &node in &nodes {
            let valid = match self.kind(node) {
                Some(NodeKind::Request(_)) => true,
                Some(NodeKind::DepotDuplicate(t)) => t == technician,
                _ => false,
            };
            if !valid || self.committed_nodes[node] {
                return Err(TrspError::InvalidInstance(format!(
                    "node {node} cannot be committed to technician {technician}"
                )));
            }
            self.committed_nodes[node] = true;
        }
        self.committed[technician] = nodes;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn depot(&self) -> &Depot {
        &self.depot
    }

    pub fn technician_count(&self) -> usize {
        self.technicians.len()
    }

    pub fn technicians(&self) -> &[Technician] {
        &self.technicians
    }

    /// Technician by index.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    pub fn technician(&self, technician: usize) -> &Technician {
        &self.technicians[technician]
    }

    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    /// Node ids of all requests.
    pub fn request_ids(&self) -> Range<usize> {
        let first = 1 + self.technicians.len();
        first..first + self.requests.len()
    }

    /// Request data for a node id, `None` if the node is not a request.
    pub fn request(&self, node: usize) -> Option<&Request> {
        match self.kind(node) {
            Some(NodeKind::Request(i)) => self.requests.get(i),
            _ => None,
        }
    }

    /// Number of node ids.
    pub fn max_id(&self) -> usize {
        self.nodes.len()
    }

    /// Number of spare-part types.
    pub fn spare_part_types(&self) -> usize {
        self.spare_part_types
    }

    pub fn kind(&self, node: usize) -> Option<NodeKind> {
        self.nodes.get(node).map(|n| n.kind)
    }

    pub fn is_request(&self, node: usize) -> bool {
        matches!(self.kind(node), Some(NodeKind::Request(_)))
    }

    /// Returns `true` for the main depot and its duplicates.
    pub fn is_main_depot(&self, node: usize) -> bool {
        matches!(
            self.kind(node),
            Some(NodeKind::MainDepot | NodeKind::DepotDuplicate(_))
        )
    }

    /// Returns `true` for homes and home duplicates.
    pub fn is_home(&self, node: usize) -> bool {
        matches!(
            self.kind(node),
            Some(NodeKind::Home(_) | NodeKind::HomeDuplicate(_))
        )
    }

    /// Node id where the tour of `technician` starts.
    pub fn home(&self, technician: usize) -> usize {
        1 + technician
    }

    /// Node id where the tour of `technician` ends.
    pub fn home_duplicate(&self, technician: usize) -> usize {
        1 + self.technicians.len() + self.requests.len() + technician
    }

    /// Node id used by `technician` for a trip to the main depot.
    pub fn main_depot_duplicate(&self, technician: usize) -> usize {
        1 + 2 * self.technicians.len() + self.requests.len() + technician
    }

    /// # Panics
    ///
    /// Panics if the node id is out of bounds.
    pub fn time_window(&self, node: usize) -> TimeWindow {
        self.nodes[node].time_window
    }

    pub fn service_time(&self, node: usize) -> f64 {
        self.nodes[node].service_time
    }

    pub fn position(&self, node: usize) -> (f64, f64) {
        (self.nodes[node].x, self.nodes[node].y)
    }

    /// Euclidean distance between two nodes.
    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.distances.get(from, to)
    }

    /// Travel time between two nodes (unit speed).
    pub fn travel_time(&self, from: usize, to: usize) -> f64 {
        self.distances.get(from, to)
    }

    /// Largest distance between two nodes.
    pub fn max_distance(&self) -> f64 {
        self.distances.max()
    }

    /// Arrival time at `node` when arriving at `pred` at `pred_arrival`.
    pub fn arrival_time(&self, node: usize, pred: usize, pred_arrival: f64) -> f64 {
        self.time_window(pred).earliest_start(pred_arrival)
            + self.service_time(pred)
            + self.travel_time(pred, node)
    }

    /// Skills required at a node (empty for non-requests).
    pub fn required_skills(&self, node: usize) -> AttributeSet {
        self.request(node)
            .map(Request::skills)
            .unwrap_or_default()
    }

    /// Tools required at a node (empty for non-requests).
    pub fn required_tools(&self, node: usize) -> AttributeSet {
        self.request(node).map(Request::tools).unwrap_or_default()
    }

    /// Spare parts of one type consumed at a node.
    pub fn required_spare_parts(&self, node: usize, part: usize) -> u32 {
        self.request(node).map_or(0, |r| r.spare_part(part))
    }

    /// Returns `true` if `j` can be reached from `i` within its window.
    pub fn is_arc_feasible(&self, i: usize, j: usize) -> bool {
        self.arcs[i * self.nodes.len() + j]
    }

    /// Technicians able to serve a request node.
    pub fn compatible_technicians(&self, request: usize) -> &[usize] {
        match self.kind(request) {
            Some(NodeKind::Request(i)) => &self.compatible[i],
            _ => &[],
        }
    }

    /// Returns `true` if `technician` can serve the request node.
    pub fn is_compatible(&self, technician: usize, request: usize) -> bool {
        self.compatible_technicians(request).contains(&technician)
    }

    /// Bound on the working time of a tour (infinite if unbounded).
    pub fn max_working_time(&self) -> f64 {
        self.max_working_time
    }

    /// Returns `true` if some visits are committed.
    pub fn is_dynamic(&self) -> bool {
        self.committed.iter().any(|c| !c.is_empty())
    }

    /// Committed visits of a technician after its home, in order.
    pub fn committed(&self, technician: usize) -> &[usize] {
        &self.committed[technician]
    }

    /// Returns `true` if the node is committed to some technician.
    pub fn is_committed(&self, node: usize) -> bool {
        self.committed_nodes.get(node).copied().unwrap_or(false)
    }

    fn build_arc_graph(&self) -> Vec<bool> {
        let n = self.nodes.len();
        let mut arcs = vec![false; n * n];
        for i in 0..n {
            let departure = self.time_window(i).start() + self.service_time(i);
            for j in 0..n {
                arcs[i * n + j] =
                    i != j && departure + self.travel_time(i, j) <= self.time_window(j).end();
            }
        }
        arcs
    }

    fn build_compatibility(&self) -> Vec<Vec<usize>> {
        self.request_ids()
            .map(|node| {
                (0..self.technicians.len())
                    .filter(|&t| self.check_compatibility(t, node))
                    .collect()
            })
            .collect()
    }

    fn check_compatibility(&self, technician: usize, node: usize) -> bool {
        let Some(req) = self.request(node) else {
            return false;
        };
        let tech = &self.technicians[technician];
        if !tech.skills().contains_all(req.skills()) {
            return false;
        }
        if (0..self.spare_part_types).any(|p| req.spare_part(p) > tech.spare_part(p)) {
            return false;
        }

        let home = self.home(technician);
        let home_dup = self.home_duplicate(technician);
        let depot = self.main_depot_duplicate(technician);
        let start = tech.working_hours().start();
        let reaches = |path: &[usize]| {
            let mut arrival = start;
            for w in path.windows(2) {
                arrival = self.arrival_time(w[1], w[0], arrival);
                if self.time_window(w[1]).is_violated(arrival) {
                    return false;
                }
            }
            true
        };

        if tech.tools().contains_all(req.tools()) && reaches(&[home, node, home_dup]) {
            return true;
        }
        reaches(&[home, depot, node, home_dup])
    }
}

fn home_node(tech: &Technician, kind: NodeKind) -> NodeData {
    NodeData {
        x: tech.x(),
        y: tech.y(),
        time_window: tech.working_hours(),
        service_time: 0.0,
        kind,
    }
}

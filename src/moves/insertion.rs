//! Insertion of an unserved request, with an optional depot trip.
//!
//! # Algorithm
//!
//! [`find_insertion`] scans the `(pred, succ)` pairs of the target tour in
//! visiting order. Each candidate is priced by the cost delegate and checked
//! by the constraint handler; the scan stops as soon as a candidate loses
//! forward feasibility, since no later position can become feasible.
//!
//! When no direct insertion exists, the tour has no depot visit and depot
//! trips are allowed, every `(depot position, request position)` pair with
//! the depot before the request is tried.
//!
//! # Complexity
//!
//! O(n) candidates for direct insertion, O(n²) with depot trips.

use crate::constraints::{ConstraintHandler, FeasibilityCode};
use crate::cost::CostDelegate;
use crate::error::Result;
use crate::tour::{Tour, UNDEFINED};

/// Position of the depot visit inserted together with a request.
///
/// The depot is inserted between `pred` and `succ`, which are consecutive in
/// the tour before the move. When `pred` equals the request's predecessor,
/// the depot is visited right before the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepotTrip {
    pub pred: usize,
    pub succ: usize,
}

/// Inserts `node` between `pred` and `succ`.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertionMove {
    technician: usize,
    node: usize,
    pred: usize,
    succ: usize,
    depot_trip: Option<DepotTrip>,
    improvement: f64,
}

impl InsertionMove {
    pub fn new(technician: usize, node: usize, pred: usize, succ: usize) -> Self {
        Self {
            technician,
            node,
            pred,
            succ,
            depot_trip: None,
            improvement: 0.0,
        }
    }

    /// Adds a depot visit between `pred` and `succ`.
    pub fn with_depot_trip(mut self, pred: usize, succ: usize) -> Self {
        self.depot_trip = Some(DepotTrip { pred, succ });
        self
    }

    pub fn technician(&self) -> usize {
        self.technician
    }

    pub fn node(&self) -> usize {
        self.node
    }

    pub fn pred(&self) -> usize {
        self.pred
    }

    pub fn succ(&self) -> usize {
        self.succ
    }

    pub fn depot_trip(&self) -> Option<DepotTrip> {
        self.depot_trip
    }

    /// Returns `true` if the depot is visited right before the request.
    pub fn is_depot_adjacent(&self) -> bool {
        self.depot_trip.is_some_and(|d| d.pred == self.pred)
    }

    pub fn improvement(&self) -> f64 {
        self.improvement
    }

    pub fn set_improvement(&mut self, improvement: f64) {
        self.improvement = improvement;
    }

    /// Insertion cost, the opposite of the improvement.
    pub fn cost(&self) -> f64 {
        -self.improvement
    }

    pub fn resulting_sequence(&self, tour: &Tour) -> Vec<usize> {
        let depot = tour.instance().main_depot_duplicate(tour.technician());
        let mut seq = Vec::with_capacity(tour.len() + 2);
        if self.pred == UNDEFINED {
            seq.push(self.node);
        }
        for n in tour {
            seq.push(n);
            if let Some(trip) = self.depot_trip {
                if trip.pred == n {
                    seq.push(depot);
                }
            }
            if n == self.pred {
                seq.push(self.node);
            }
        }
        seq
    }

    pub fn execute(&self, tour: &mut Tour) -> Result<()> {
        let depot = tour.instance().main_depot_duplicate(tour.technician());
        match self.depot_trip {
            Some(trip) if trip.pred == self.pred => {
                tour.insert_after(self.pred, depot)?;
                tour.insert_after(depot, self.node)
            }
            Some(trip) => {
                self.insert_node(tour)?;
                tour.insert_after(trip.pred, depot)
            }
            None => self.insert_node(tour),
        }
    }

    fn insert_node(&self, tour: &mut Tour) -> Result<()> {
        if self.pred == UNDEFINED {
            tour.insert_before(self.succ, self.node)
        } else {
            tour.insert_after(self.pred, self.node)
        }
    }
}

/// Finds the cheapest feasible insertion of `node` in `tour`.
///
/// Returns `None` when the technician is incompatible with the request or
/// when no feasible position exists.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use trsp_alns::constraints::ConstraintHandler;
/// use trsp_alns::cost::TravelDistance;
/// use trsp_alns::models::{Depot, Instance, Request, Technician, TimeWindow};
/// use trsp_alns::moves::find_insertion;
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
/// let tour = Tour::with_home(Arc::clone(&instance), 0);
///
/// let mv = find_insertion(2, &tour, &TravelDistance::new(), &handler, false).unwrap();
/// assert_eq!((mv.pred(), mv.succ()), (1, 3));
/// assert!((mv.cost() - 10.0).abs() < 1e-10);
/// ```
pub fn find_insertion(
    node: usize,
    tour: &Tour,
    cost: &dyn CostDelegate,
    constraints: &ConstraintHandler,
    allow_depot_trip: bool,
) -> Option<InsertionMove> {
    let technician = tour.technician();
    if tour.is_empty() || !tour.instance().is_compatible(technician, node) {
        return None;
    }

    let mut best: Option<InsertionMove> = None;
    let mut pred = tour.first();
    while pred != UNDEFINED && tour.succ(pred) != UNDEFINED {
        let succ = tour.succ(pred);
        let (candidate, code) = price(
            tour,
            cost,
            constraints,
            InsertionMove::new(technician, node, pred, succ),
        );
        if code.is_feasible() && best.as_ref().map_or(true, |b| candidate.cost() < b.cost()) {
            best = Some(candidate);
        }
        if !code.is_forward_feasible() {
            break;
        }
        pred = succ;
    }

    if best.is_some() || !allow_depot_trip || tour.main_depot_visit().is_some() {
        return best;
    }

    let mut pred = tour.first();
    while pred != UNDEFINED && tour.succ(pred) != UNDEFINED {
        let succ = tour.succ(pred);
        let mut depot_pred = tour.first();
        loop {
            let depot_succ = if depot_pred == pred { succ } else { tour.succ(depot_pred) };
            let (candidate, code) = price(
                tour,
                cost,
                constraints,
                InsertionMove::new(technician, node, pred, succ)
                    .with_depot_trip(depot_pred, depot_succ),
            );
            if code.is_feasible() && best.as_ref().map_or(true, |b| candidate.cost() < b.cost())
            {
                best = Some(candidate);
            }
            if depot_pred == pred {
                break;
            }
            depot_pred = depot_succ;
        }
        pred = succ;
    }
    best
}

fn price(
    tour: &Tour,
    cost: &dyn CostDelegate,
    constraints: &ConstraintHandler,
    mut candidate: InsertionMove,
) -> (InsertionMove, FeasibilityCode) {
    candidate.set_improvement(-cost.insertion_cost(tour, &candidate));
    let code = constraints.check_insertion(tour, &candidate);
    (candidate, code)
}

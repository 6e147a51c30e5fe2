//! Split of a technician's giant tour into feasible tours.
//!
//! # Algorithm
//!
//! A giant tour is an ordered list of requests, all compatible with one
//! technician. The split builds an auxiliary graph whose node `i` stands
//! for "the first `i` requests are served" and whose arc `(i, j)` is the
//! tour `home → giant[i..j] → home'` of that technician, with its
//! committed prefix, if any, right after the home. The shortest path from
//! node 0 to node `n` (Bellman) gives the cheapest partition of the giant
//! tour into tours of the same technician.
//!
//! Before an arc is priced, the tools and spare parts carried from home are
//! checked along the sequence. When they run out, a visit to the main depot
//! is inserted at the cheapest position preceding the first request that
//! lacks them; the arc is dropped if no such position passes the
//! constraints. Extending an infeasible arc with more requests is not
//! attempted.
//!
//! # Complexity
//!
//! O(n²) arcs, each priced and checked in O(n), O(n²) when a depot visit
//! has to be placed.
//!
//! # Reference
//!
//! Prins, C. (2004). "A simple and effective evolutionary algorithm for the
//! vehicle routing problem", *Computers & Operations Research* 31(12), 1985-2002.

use std::sync::Arc;

use log::{trace, warn};

use crate::constraints::ConstraintHandler;
use crate::cost::CostDelegate;
use crate::error::{Result, TrspError};
use crate::models::Instance;
use crate::tour::Tour;

/// Tours found by [`GiantTourSplit::split`].
#[derive(Debug, Clone)]
pub struct SplitResult {
    /// Tours in giant-tour order, all of the same technician.
    pub tours: Vec<Tour>,
    pub total_cost: f64,
}

/// Shortest-path split of giant tours.
#[derive(Debug, Clone, Copy)]
pub struct GiantTourSplit<'a> {
    cost: &'a dyn CostDelegate,
    constraints: &'a ConstraintHandler,
}

impl<'a> GiantTourSplit<'a> {
    pub fn new(cost: &'a dyn CostDelegate, constraints: &'a ConstraintHandler) -> Self {
        Self { cost, constraints }
    }

    /// Splits `giant` into tours of `technician`.
    ///
    /// Returns `None` when some request cannot be part of any feasible
    /// tour, and an error when `giant` holds a node that is not a request.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use trsp_alns::constraints::ConstraintHandler;
    /// use trsp_alns::constructive::GiantTourSplit;
    /// use trsp_alns::cost::TravelDistance;
    /// use trsp_alns::models::{Depot, Instance, Request, Technician, TimeWindow};
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
    /// let handler = ConstraintHandler::for_instance(&instance);
    /// let cost = TravelDistance::new();
    ///
    /// let split = GiantTourSplit::new(&cost, &handler)
    ///     .split(&instance, 0, &[2, 3])
    ///     .unwrap()
    ///     .unwrap();
    /// assert_eq!(split.tours.len(), 1);
    /// assert!((split.total_cost - 4.0).abs() < 1e-10);
    /// ```
    pub fn split(
        &self,
        instance: &Arc<Instance>,
        technician: usize,
        giant: &[usize],
    ) -> Result<Option<SplitResult>> {
        if let Some(&node) = giant.iter().find(|&&n| !instance.is_request(n)) {
            return Err(TrspError::InvalidParameter {
                name: "giant",
                reason: format!("node {node} is not a request"),
            });
        }

        let n = giant.len();
        let mut labels = vec![f64::INFINITY; n + 1];
        let mut pred = vec![0usize; n + 1];
        let mut arcs: Vec<Option<Tour>> = vec![None; n + 1];
        labels[0] = 0.0;

        for i in 0..n {
            if !labels[i].is_finite() {
                continue;
            }
            for j in (i + 1)..=n {
                let Some(tour) = self.build_tour(instance, technician, &giant[i..j])? else {
                    break;
                };
                let value = labels[i] + tour.total_cost();
                if value < labels[j] {
                    labels[j] = value;
                    pred[j] = i;
                    arcs[j] = Some(tour);
                }
            }
        }

        if !labels[n].is_finite() {
            warn!(
                "{}: giant tour of technician {technician} cannot be split",
                instance.name()
            );
            return Ok(None);
        }

        let mut tours = Vec::new();
        let mut j = n;
        while j > 0 {
            if let Some(tour) = arcs[j].take() {
                tours.push(tour);
            }
            j = pred[j];
        }
        tours.reverse();
        trace!(
            "split giant tour of {n} requests into {} tours ({:.3})",
            tours.len(),
            labels[n]
        );
        Ok(Some(SplitResult {
            tours,
            total_cost: labels[n],
        }))
    }

    /// Feasible tour of `technician` serving `requests` in order, with a
    /// main-depot visit when the technician's own resources do not suffice.
    pub fn build_tour(
        &self,
        instance: &Arc<Instance>,
        technician: usize,
        requests: &[usize],
    ) -> Result<Option<Tour>> {
        let committed = instance.committed(technician);
        let mut sequence = Vec::with_capacity(committed.len() + requests.len() + 3);
        sequence.push(instance.home(technician));
        sequence.extend_from_slice(committed);
        sequence.extend_from_slice(requests);
        sequence.push(instance.home_duplicate(technician));

        let depot = instance.main_depot_duplicate(technician);
        let candidates = match resource_failure(instance, technician, &sequence) {
            Some(failure) if !sequence.contains(&depot) => {
                let first = 1 + committed.len();
                let mut candidates: Vec<(f64, Vec<usize>)> = (first..=failure)
                    .map(|position| {
                        let mut seq = sequence.clone();
                        seq.insert(position, depot);
                        (self.cost.sequence_cost(instance, technician, &seq), seq)
                    })
                    .collect();
                candidates.sort_by(|a, b| a.0.total_cmp(&b.0));
                candidates.into_iter().map(|(_, seq)| seq).collect()
            }
            _ => vec![sequence],
        };

        for seq in candidates {
            let mut tour = Tour::from_sequence(Arc::clone(instance), technician, &seq)?;
            if self.constraints.is_feasible(&tour) {
                self.cost.evaluate_tour(&mut tour);
                return Ok(Some(tour));
            }
        }
        Ok(None)
    }
}

/// Position of the first node whose tools or spare parts are not carried by
/// the technician from home.
fn resource_failure(instance: &Instance, technician: usize, sequence: &[usize]) -> Option<usize> {
    let tech = instance.technician(technician);
    let mut stock: Vec<i64> = (0..instance.spare_part_types())
        .map(|p| i64::from(tech.spare_part(p)))
        .collect();
    sequence.iter().position(|&node| {
        if !instance.is_request(node) {
            return false;
        }
        let mut short = !tech.tools().contains_all(instance.required_tools(node));
        for (part, left) in stock.iter_mut().enumerate() {
            *left -= i64::from(instance.required_spare_parts(node, part));
            short |= *left < 0;
        }
        short
    })
}

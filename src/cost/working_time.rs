//! Minimal working time of a technician.
//!
//! # Algorithm
//!
//! A tour starts as early as possible, which may create waiting time in
//! front of later time windows. Delaying the departure from home by `delta`
//! absorbs up to `delta` units of that waiting without moving the end of
//! the tour, as long as every window stays reachable. The largest safe delay
//! is the forward slack `F0 = latest(first) - start(first)`, hence:
//!
//! ```text
//! working_time = end(last) - start(first) - min(F0, total_waiting)
//! ```
//!
//! # Reference
//!
//! Savelsbergh, M.W.P. (1992). "The Vehicle Routing Problem with Time
//! Windows: Minimizing Route Duration", *ORSA Journal on Computing* 4(2),
//! 146-154.

use serde::{Deserialize, Serialize};

use super::CostDelegate;
use crate::models::Instance;
use crate::tour::Tour;

/// Working time of a sequence of visits started as early as possible.
///
/// The first node is entered at the start of its time window.
pub fn sequence_working_time(instance: &Instance, sequence: &[usize]) -> f64 {
    let (Some(&first), Some(&last)) = (sequence.first(), sequence.last()) else {
        return 0.0;
    };
    let start = instance.time_window(first).start();
    let mut arrival = start;
    let mut waiting = 0.0;
    for w in sequence.windows(2) {
        arrival = instance.arrival_time(w[1], w[0], arrival);
        waiting += instance.time_window(w[1]).waiting_time(arrival);
    }
    let end = instance.time_window(last).earliest_start(arrival) + instance.service_time(last);

    let mut latest = instance.time_window(last).end();
    for w in sequence.windows(2).rev() {
        latest = instance
            .time_window(w[0])
            .end()
            .min(latest - instance.service_time(w[0]) - instance.travel_time(w[0], w[1]));
    }
    let slack = (latest - start).max(0.0);
    end - start - slack.min(waiting)
}

/// Sum of the minimal working times of the tours.
///
/// Move deltas are computed by simulating the modified sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkingTime {
    unserved_penalty: f64,
}

impl WorkingTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unserved_penalty(mut self, penalty: f64) -> Self {
        self.unserved_penalty = penalty;
        self
    }
}

impl CostDelegate for WorkingTime {
    fn name(&self) -> &'static str {
        "working time"
    }

    fn sequence_cost(&self, instance: &Instance, _technician: usize, sequence: &[usize]) -> f64 {
        sequence_working_time(instance, sequence)
    }

    fn tour_cost(&self, tour: &Tour) -> f64 {
        if tour.is_empty() {
            return 0.0;
        }
        let first = tour.first();
        let waiting = tour.total_waiting() - tour.waiting_time(first);
        tour.earliest_departure(tour.last()) - tour.earliest_start(first)
            - tour.forward_slack().min(waiting)
    }

    fn unserved_penalty(&self) -> f64 {
        self.unserved_penalty
    }
}

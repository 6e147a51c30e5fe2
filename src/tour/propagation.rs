//! Incremental update of the cached per-node attributes.
//!
//! # Algorithm
//!
//! Forward attributes (earliest arrival, waiting, depot flag, tools, spare
//! parts left) depend on the predecessor; backward attributes (latest
//! feasible arrival, spare parts required until the next depot visit) depend
//! on the successor. After a structural change confined to the region
//! `from ..= to`, the forward walk starts at `from` and the backward walk at
//! `to`. Once a walk has left the region, it stops at the first node whose
//! recomputed values equal the cached ones: links beyond the region did not
//! change, so nothing further can change either.
//!
//! # Complexity
//!
//! O(changed region) per update, O(n) in the worst case.

use super::linked_tour::{Tour, UNDEFINED};
use crate::models::AttributeSet;

impl Tour {
    /// Recomputes cached attributes after the links between `from` and `to`
    /// (inclusive, in visiting order) changed.
    ///
    /// [`UNDEFINED`] stands for the first node (`from`) or the last node
    /// (`to`).
    pub fn propagate_update(&mut self, from: usize, to: usize) {
        if self.len == 0 {
            return;
        }
        let from = if from == UNDEFINED { self.first } else { from };
        let to = if to == UNDEFINED { self.last } else { to };

        let mut node = from;
        let mut left_region = false;
        while node != UNDEFINED {
            let changed = self.update_forward(node);
            if left_region && !changed {
                break;
            }
            if node == to {
                left_region = true;
            }
            node = self.succ[node];
        }

        let mut node = to;
        let mut left_region = false;
        while node != UNDEFINED {
            let changed = self.update_backward(node);
            if left_region && !changed {
                break;
            }
            if node == from {
                left_region = true;
            }
            node = self.pred[node];
        }
    }

    /// Recomputes every cached attribute of the tour.
    pub fn update_all(&mut self) {
        let mut node = self.first;
        while node != UNDEFINED {
            self.update_forward(node);
            node = self.succ[node];
        }
        let mut node = self.last;
        while node != UNDEFINED {
            self.update_backward(node);
            node = self.pred[node];
        }
    }

    fn update_forward(&mut self, node: usize) -> bool {
        let ins = &self.instance;
        let pred = self.pred[node];
        let is_depot = ins.is_main_depot(node);
        let tech = ins.technician(self.technician);

        let earliest = if pred == UNDEFINED {
            ins.time_window(node).start()
        } else {
            ins.arrival_time(node, pred, self.earliest[pred])
        };
        let waiting = ins.time_window(node).waiting_time(earliest);
        let (depot_visited, tools) = if is_depot {
            (true, AttributeSet::all())
        } else if pred == UNDEFINED {
            (false, tech.tools())
        } else {
            (self.depot_visited[pred], self.tools[pred])
        };

        let mut changed = earliest != self.earliest[node]
            || waiting != self.waiting[node]
            || depot_visited != self.depot_visited[node]
            || tools != self.tools[node];

        for p in 0..self.parts {
            let before = if is_depot || pred == UNDEFINED {
                i64::from(tech.spare_part(p))
            } else {
                self.spares[pred * self.parts + p]
            };
            let left = before - i64::from(ins.required_spare_parts(node, p));
            let slot = &mut self.spares[node * self.parts + p];
            if *slot != left {
                *slot = left;
                changed = true;
            }
        }

        self.earliest[node] = earliest;
        self.waiting[node] = waiting;
        self.depot_visited[node] = depot_visited;
        self.tools[node] = tools;
        changed
    }

    fn update_backward(&mut self, node: usize) -> bool {
        let ins = &self.instance;
        let succ = self.succ[node];
        let tw = ins.time_window(node);
        let latest = if succ == UNDEFINED {
            tw.end()
        } else {
            tw.end()
                .min(self.latest[succ] - ins.service_time(node) - ins.travel_time(node, succ))
        };
        let mut changed = latest != self.latest[node];
        self.latest[node] = latest;

        let is_depot = ins.is_main_depot(node);
        for p in 0..self.parts {
            let required = if is_depot {
                0
            } else {
                let downstream = if succ == UNDEFINED {
                    0
                } else {
                    self.required[succ * self.parts + p]
                };
                i64::from(ins.required_spare_parts(node, p)) + downstream
            };
            let slot = &mut self.required[node * self.parts + p];
            if *slot != required {
                *slot = required;
                changed = true;
            }
        }
        changed
    }

    /// Earliest arrival time at a visited node.
    pub fn earliest_arrival(&self, node: usize) -> f64 {
        self.earliest[node]
    }

    /// Latest arrival time at a visited node that keeps the rest of the tour
    /// time-feasible.
    pub fn latest_feasible_arrival(&self, node: usize) -> f64 {
        self.latest[node]
    }

    /// Waiting time at a visited node.
    pub fn waiting_time(&self, node: usize) -> f64 {
        self.waiting[node]
    }

    /// Earliest start of service at a visited node.
    pub fn earliest_start(&self, node: usize) -> f64 {
        self.instance
            .time_window(node)
            .earliest_start(self.earliest[node])
    }

    /// Earliest departure time from a visited node.
    pub fn earliest_departure(&self, node: usize) -> f64 {
        self.earliest_start(node) + self.instance.service_time(node)
    }

    /// Returns `true` if the main depot was visited at or before `node`.
    pub fn is_main_depot_visited(&self, node: usize) -> bool {
        self.depot_visited[node]
    }

    /// Tools available when leaving `node`.
    pub fn available_tools(&self, node: usize) -> AttributeSet {
        self.tools[node]
    }

    /// Returns `true` if `tool` is available when leaving `node`.
    pub fn is_tool_available(&self, node: usize, tool: usize) -> bool {
        self.tools[node].contains(tool)
    }

    /// Spare parts of type `part` left after servicing `node`.
    ///
    /// A negative value means the tour runs out of that part.
    pub fn available_spare_parts(&self, node: usize, part: usize) -> i64 {
        if part >= self.parts {
            return 0;
        }
        self.spares[node * self.parts + part]
    }

    /// Spare parts of type `part` consumed from `node` until the next depot
    /// visit or the end of the tour.
    pub fn required_spare_parts(&self, node: usize, part: usize) -> i64 {
        if part >= self.parts {
            return 0;
        }
        self.required[node * self.parts + part]
    }

    /// Total waiting time along the tour.
    pub fn total_waiting(&self) -> f64 {
        self.iter().map(|n| self.waiting[n]).sum()
    }

    /// Delay that can be applied to the start of the tour without violating
    /// any time window.
    pub fn forward_slack(&self) -> f64 {
        if self.first == UNDEFINED {
            return 0.0;
        }
        (self.latest[self.first] - self.earliest_start(self.first)).max(0.0)
    }

    /// Returns `true` if serving `sequence` right after `before` keeps every
    /// time window and still reaches `after` before its latest feasible
    /// arrival.
    ///
    /// `before` may be [`UNDEFINED`] when `sequence` starts the tour and
    /// `after` may be [`UNDEFINED`] when it ends it.
    pub fn is_time_feasible_sequence(&self, before: usize, sequence: &[usize], after: usize) -> bool {
        let ins = &self.instance;
        let mut prev = before;
        let mut arrival = if before == UNDEFINED {
            0.0
        } else {
            self.earliest[before]
        };
        for &node in sequence {
            arrival = if prev == UNDEFINED {
                ins.time_window(node).start()
            } else {
                ins.arrival_time(node, prev, arrival)
            };
            if ins.time_window(node).is_violated(arrival) {
                return false;
            }
            prev = node;
        }
        if after == UNDEFINED || prev == UNDEFINED {
            return true;
        }
        ins.arrival_time(after, prev, arrival) <= self.latest[after]
    }
}

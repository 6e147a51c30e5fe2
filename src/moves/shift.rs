//! 1-shift: move one node to another position of the same tour.
//!
//! # Algorithm
//!
//! For a node `n` with predecessor `p` and successor `s`, the neighborhood
//! first tries every position before `n` (backward shifts), then every
//! position after it (forward shifts). A shift is identified by the node
//! that will follow `n` once moved.
//!
//! Only the nodes between the old and the new position change their
//! attributes; [`ShiftMove::changed_sequence`] materializes that sub-path on
//! first use and memoizes it.
//!
//! ```text
//! backward:  a  n  q ... p  s      (n moved before q, a = pred(q))
//! forward:   p  s ... a  n  q      (n moved before q, a = pred(q))
//! ```

use std::cell::OnceCell;

use crate::constraints::ConstraintHandler;
use crate::cost::CostDelegate;
use crate::error::Result;
use crate::tour::{Tour, UNDEFINED};

use super::{keep_best, unsupported, ExplorationStrategy, Move, TourNeighborhood};

/// Sub-path of a tour whose attributes change under a shift.
///
/// `sequence` is served right after `before` and right before `after` once
/// the move is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedSequence {
    pub before: usize,
    pub sequence: Vec<usize>,
    pub after: usize,
}

/// Moves `node` right before `new_succ`.
#[derive(Debug, Clone)]
pub struct ShiftMove {
    technician: usize,
    node: usize,
    new_succ: usize,
    forward: bool,
    improvement: f64,
    changed: OnceCell<ChangedSequence>,
}

impl ShiftMove {
    /// `forward` is `true` when `new_succ` is visited after `node`.
    pub fn new(technician: usize, node: usize, new_succ: usize, forward: bool) -> Self {
        Self {
            technician,
            node,
            new_succ,
            forward,
            improvement: 0.0,
            changed: OnceCell::new(),
        }
    }

    pub fn technician(&self) -> usize {
        self.technician
    }

    pub fn node(&self) -> usize {
        self.node
    }

    pub fn new_succ(&self) -> usize {
        self.new_succ
    }

    pub fn is_forward(&self) -> bool {
        self.forward
    }

    pub fn improvement(&self) -> f64 {
        self.improvement
    }

    pub fn set_improvement(&mut self, improvement: f64) {
        self.improvement = improvement;
    }

    /// Nodes whose predecessor or successor changes, in their new order.
    ///
    /// Computed on the first call for `tour` and cached afterwards.
    pub fn changed_sequence(&self, tour: &Tour) -> &ChangedSequence {
        self.changed.get_or_init(|| {
            let n = self.node;
            let q = self.new_succ;
            let p = tour.pred(n);
            let s = tour.succ(n);
            let a = tour.pred(q);
            let mut sequence = Vec::new();
            if self.forward {
                let mut cur = s;
                while cur != q && cur != UNDEFINED {
                    sequence.push(cur);
                    cur = tour.succ(cur);
                }
                sequence.push(n);
                ChangedSequence {
                    before: p,
                    sequence,
                    after: q,
                }
            } else {
                sequence.push(n);
                let mut cur = q;
                while cur != n && cur != UNDEFINED {
                    sequence.push(cur);
                    cur = tour.succ(cur);
                }
                ChangedSequence {
                    before: a,
                    sequence,
                    after: s,
                }
            }
        })
    }

    pub fn resulting_sequence(&self, tour: &Tour) -> Vec<usize> {
        let mut seq = Vec::with_capacity(tour.len());
        for n in tour {
            if n == self.new_succ {
                seq.push(self.node);
            }
            if n != self.node {
                seq.push(n);
            }
        }
        seq
    }

    pub fn execute(&self, tour: &mut Tour) -> Result<()> {
        tour.remove_node(self.node)?;
        tour.insert_before(self.new_succ, self.node)
    }
}

/// Explores every 1-shift of a tour.
///
/// Depot visits are never shifted, and homes stay in place through the
/// home constraint.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShiftNeighborhood;

impl ShiftNeighborhood {
    fn evaluate(
        tour: &Tour,
        cost: &dyn CostDelegate,
        constraints: &ConstraintHandler,
        mv: ShiftMove,
    ) -> (Move, bool, bool) {
        let mut mv = Move::Shift(mv);
        cost.evaluate_move(tour, &mut mv);
        let code = constraints.check_move(tour, &mv);
        (mv, code.is_feasible(), code.is_forward_feasible())
    }
}

impl TourNeighborhood for ShiftNeighborhood {
    fn name(&self) -> &'static str {
        "shift"
    }

    fn explore(
        &self,
        tour: &Tour,
        cost: &dyn CostDelegate,
        constraints: &ConstraintHandler,
        strategy: ExplorationStrategy,
    ) -> Result<Option<Move>> {
        if !self.supports(strategy) {
            return Err(unsupported("shift neighborhood", strategy));
        }
        let first_improvement = strategy.is_first_improvement();
        let instance = tour.instance();
        let technician = tour.technician();
        let mut best: Option<Move> = None;

        for node in tour {
            if !instance.is_request(node) {
                continue;
            }
            let pred = tour.pred(node);
            let succ = tour.succ(node);

            // backward: new successor among the nodes before `node`
            let mut q = pred;
            while q != UNDEFINED {
                let (mv, feasible, forward) =
                    Self::evaluate(tour, cost, constraints, ShiftMove::new(technician, node, q, false));
                if feasible && mv.is_improving() {
                    if first_improvement {
                        return Ok(Some(mv));
                    }
                    keep_best(&mut best, mv);
                }
                if !forward {
                    break;
                }
                q = tour.pred(q);
            }

            // forward: new successor after `succ`
            let mut q = if succ == UNDEFINED { UNDEFINED } else { tour.succ(succ) };
            while q != UNDEFINED {
                let (mv, feasible, forward) =
                    Self::evaluate(tour, cost, constraints, ShiftMove::new(technician, node, q, true));
                if feasible && mv.is_improving() {
                    if first_improvement {
                        return Ok(Some(mv));
                    }
                    keep_best(&mut best, mv);
                }
                if !forward {
                    break;
                }
                q = tour.succ(q);
            }
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::constraints::ConstraintHandler;
    use crate::cost::TravelDistance;
    use crate::error::TrspError;
    use crate::moves::test_support::open_instance;

    #[test]
    fn test_changed_sequence_backward() {
        let ins = open_instance(&[(1.0, 0.0), (2.0, 0.0), (3.0, 0.0), (4.0, 0.0)]);
        let tour = Tour::from_sequence(ins, 0, &[1, 2, 3, 4, 5, 6]).expect("valid");
        // move 5 before 3
        let mv = ShiftMove::new(0, 5, 3, false);
        let changed = mv.changed_sequence(&tour);
        assert_eq!(changed.before, 2);
        assert_eq!(changed.sequence, vec![5, 3, 4]);
        assert_eq!(changed.after, 6);
        assert_eq!(mv.resulting_sequence(&tour), vec![1, 2, 5, 3, 4, 6]);
    }

    #[test]
    fn test_changed_sequence_forward() {
        let ins = open_instance(&[(1.0, 0.0), (2.0, 0.0), (3.0, 0.0), (4.0, 0.0)]);
        let mut tour = Tour::from_sequence(ins, 0, &[1, 2, 3, 4, 5, 6]).expect("valid");
        // move 2 before 5
        let mv = ShiftMove::new(0, 2, 5, true);
        let changed = mv.changed_sequence(&tour).clone();
        assert_eq!(changed.before, 1);
        assert_eq!(changed.sequence, vec![3, 4, 2]);
        assert_eq!(changed.after, 5);

        mv.execute(&mut tour).expect("execute");
        assert_eq!(tour.to_vec(), vec![1, 3, 4, 2, 5, 6]);
        // memoized value is kept even though the tour changed
        assert_eq!(mv.changed_sequence(&tour), &changed);
    }

    #[test]
    fn test_explore_fixes_detour() {
        let ins = open_instance(&[(1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        let handler = ConstraintHandler::for_instance(&ins);
        let cost = TravelDistance::new();
        let tour = Tour::from_sequence(Arc::clone(&ins), 0, &[1, 3, 2, 4, 5]).expect("valid");

        let mv = ShiftNeighborhood
            .explore(&tour, &cost, &handler, ExplorationStrategy::DeterministicBestImprovement)
            .expect("supported")
            .expect("improving move");
        let mut improved = tour.clone();
        mv.execute(&mut improved).expect("execute");
        assert_eq!(improved.to_vec(), vec![1, 2, 3, 4, 5]);
        assert!((mv.improvement() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_random_strategy_not_supported() {
        let ins = open_instance(&[(1.0, 0.0)]);
        let handler = ConstraintHandler::for_instance(&ins);
        let tour = Tour::with_home(Arc::clone(&ins), 0);
        assert!(!ShiftNeighborhood.supports(ExplorationStrategy::RandomNeighbor));
        let err = ShiftNeighborhood
            .explore(&tour, &TravelDistance::new(), &handler, ExplorationStrategy::RandomNeighbor)
            .expect_err("not supported");
        assert!(matches!(err, TrspError::NotSupported { .. }));
    }
}

//! Tour constraints and the handler that chains them.
//!
//! Every constraint answers two questions: is a tour feasible, and is a
//! move feasible. Move checks return a [`FeasibilityCode`] whose second bit
//! tells a sequential scan whether a later candidate position may still be
//! feasible, which lets neighborhoods stop scanning early.
//!
//! - [`HomeConstraint`]: tours start at home and end at its duplicate
//! - [`SkillsConstraint`]: technicians hold the skills of their requests
//! - [`TimeWindowConstraint`]: every visit starts before its window closes
//! - [`ToolsConstraint`]: tools are carried or picked up at the depot first
//! - [`SparePartsConstraint`]: spare parts never run out between depot visits
//! - [`MaxDurationConstraint`]: working time stays below a bound
//! - [`ServicedRequestsConstraint`]: committed visits stay in place
//! - [`ConstraintHandler`]: ordered chain with early abort

mod handler;
mod home;
mod max_duration;
mod serviced;
mod skills;
mod spare_parts;
mod time_window;
mod tools;

pub use handler::{ConstraintConfig, ConstraintHandler};
pub use home::HomeConstraint;
pub use max_duration::MaxDurationConstraint;
pub use serviced::ServicedRequestsConstraint;
pub use skills::SkillsConstraint;
pub use spare_parts::SparePartsConstraint;
pub use time_window::TimeWindowConstraint;
pub use tools::ToolsConstraint;

use std::fmt;
use std::ops::BitAnd;

use crate::moves::{InsertionMove, Move, RelocateMove, RemovalMove, ShiftMove, TwoOptMove};
use crate::tour::{Tour, UNDEFINED};

/// Two-bit feasibility of a move.
///
/// Bit 0 is set when the move is feasible. Bit 1 is set when a similar move
/// at the next candidate position of a sequential scan could still be
/// feasible.
///
/// # Examples
///
/// ```
/// use trsp_alns::constraints::FeasibilityCode;
///
/// let code = FeasibilityCode::FEASIBLE & FeasibilityCode::INFEASIBLE_CONTINUE;
/// assert!(!code.is_feasible());
/// assert!(code.is_forward_feasible());
/// assert_eq!(code.bits(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeasibilityCode(u8);

impl FeasibilityCode {
    /// Infeasible, and so is every later candidate.
    pub const INFEASIBLE: Self = Self(0);
    /// Feasible, but no later candidate is.
    pub const FEASIBLE_STOP: Self = Self(1);
    /// Infeasible, later candidates may be feasible.
    pub const INFEASIBLE_CONTINUE: Self = Self(2);
    /// Feasible, later candidates may be feasible too.
    pub const FEASIBLE: Self = Self(3);

    pub const fn new(feasible: bool, forward_feasible: bool) -> Self {
        Self(feasible as u8 | (forward_feasible as u8) << 1)
    }

    /// `FEASIBLE` or `INFEASIBLE_CONTINUE`.
    pub const fn from_feasible(feasible: bool) -> Self {
        Self::new(feasible, true)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_feasible(self) -> bool {
        self.0 & 1 != 0
    }

    pub const fn is_forward_feasible(self) -> bool {
        self.0 & 2 != 0
    }

    /// Neither bit is set, nothing further can be learned.
    pub const fn is_hopeless(self) -> bool {
        self.0 == 0
    }
}

impl BitAnd for FeasibilityCode {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for FeasibilityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A violated constraint on a tour.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// First node at which the constraint is violated.
    pub node: usize,
    pub reason: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {}: {}", self.node, self.reason)
    }
}

/// A feasibility oracle over tours and moves.
///
/// Relocate moves are checked as their insertion on the destination tour,
/// which is the tour passed to [`TourConstraint::check_relocate`].
pub trait TourConstraint: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// First violation along the tour.
    fn check_tour(&self, tour: &Tour) -> Option<Violation>;

    fn check_insertion(&self, tour: &Tour, mv: &InsertionMove) -> FeasibilityCode;

    fn check_removal(&self, tour: &Tour, mv: &RemovalMove) -> FeasibilityCode {
        let _ = (tour, mv);
        FeasibilityCode::FEASIBLE
    }

    fn check_shift(&self, tour: &Tour, mv: &ShiftMove) -> FeasibilityCode;

    fn check_two_opt(&self, tour: &Tour, mv: &TwoOptMove) -> FeasibilityCode;

    fn check_relocate(&self, tour: &Tour, mv: &RelocateMove) -> FeasibilityCode {
        self.check_insertion(tour, mv.insertion())
    }

    fn check_move(&self, tour: &Tour, mv: &Move) -> FeasibilityCode {
        match mv {
            Move::Insertion(m) => self.check_insertion(tour, m),
            Move::Removal(m) => self.check_removal(tour, m),
            Move::Shift(m) => self.check_shift(tour, m),
            Move::TwoOpt(m) => self.check_two_opt(tour, m),
            Move::Relocate(m) => self.check_relocate(tour, m),
        }
    }

    fn is_feasible(&self, tour: &Tour) -> bool {
        self.check_tour(tour).is_none()
    }

    /// First infeasible node, [`UNDEFINED`] for a feasible tour.
    fn first_infeasible_node(&self, tour: &Tour) -> usize {
        self.check_tour(tour).map_or(UNDEFINED, |v| v.node)
    }

    /// Human-readable explanation, `None` for a feasible tour.
    fn infeasibility_explanation(&self, tour: &Tour) -> Option<String> {
        self.check_tour(tour)
            .map(|v| format!("{}: {v}", self.name()))
    }
}

/// Returns `true` if a main-depot visit occurs strictly after `node`.
pub(crate) fn depot_visited_after(tour: &Tour, node: usize) -> bool {
    let instance = tour.instance();
    let mut n = tour.succ(node);
    while n != UNDEFINED {
        if instance.is_main_depot(n) {
            return true;
        }
        n = tour.succ(n);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_bits() {
        assert_eq!(FeasibilityCode::new(true, false), FeasibilityCode::FEASIBLE_STOP);
        assert_eq!(FeasibilityCode::from_feasible(false), FeasibilityCode::INFEASIBLE_CONTINUE);
        assert!(FeasibilityCode::INFEASIBLE.is_hopeless());
        assert_eq!(
            FeasibilityCode::FEASIBLE_STOP & FeasibilityCode::INFEASIBLE_CONTINUE,
            FeasibilityCode::INFEASIBLE
        );
        assert_eq!(FeasibilityCode::FEASIBLE.to_string(), "3");
    }
}

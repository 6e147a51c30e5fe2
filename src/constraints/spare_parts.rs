use super::{depot_visited_after, FeasibilityCode, TourConstraint, Violation};
use crate::models::Instance;
use crate::moves::{InsertionMove, Move, RemovalMove, ShiftMove, TwoOptMove};
use crate::tour::{Tour, UNDEFINED};

/// Spare-part stock never runs out.
///
/// The stock starts at the technician's capacity, decreases at every
/// request and is refilled at a main-depot visit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SparePartsConstraint;

/// First node of `sequence` at which some part runs out, with that part.
fn first_shortage(instance: &Instance, technician: usize, sequence: &[usize]) -> Option<(usize, usize)> {
    let tech = instance.technician(technician);
    let capacity = |p: usize| i64::from(tech.spare_part(p));
    let mut stock: Vec<i64> = (0..instance.spare_part_types()).map(capacity).collect();
    for &node in sequence {
        for (p, s) in stock.iter_mut().enumerate() {
            if instance.is_main_depot(node) {
                *s = capacity(p);
            } else {
                *s -= i64::from(instance.required_spare_parts(node, p));
                if *s < 0 {
                    return Some((node, p));
                }
            }
        }
    }
    None
}

impl SparePartsConstraint {
    fn replay(tour: &Tour, mv: Move) -> FeasibilityCode {
        let sequence = mv.resulting_sequence(tour);
        FeasibilityCode::from_feasible(
            first_shortage(tour.instance(), tour.technician(), &sequence).is_none(),
        )
    }

    /// Checks that the stock covers `demand` plus the parts consumed from
    /// `from` until the next depot visit, starting from `stock(p)`.
    fn covers(tour: &Tour, node: usize, from: usize, stock: impl Fn(usize) -> i64) -> bool {
        let ins = tour.instance();
        (0..ins.spare_part_types()).all(|p| {
            let downstream = if from == UNDEFINED {
                0
            } else {
                tour.required_spare_parts(from, p)
            };
            stock(p) - i64::from(ins.required_spare_parts(node, p)) - downstream >= 0
        })
    }

    fn crosses_depot(tour: &Tour, nodes: &[usize]) -> bool {
        nodes.iter().any(|&n| tour.instance().is_main_depot(n))
    }
}

impl TourConstraint for SparePartsConstraint {
    fn name(&self) -> &'static str {
        "spare parts"
    }

    fn check_tour(&self, tour: &Tour) -> Option<Violation> {
        let parts = tour.instance().spare_part_types();
        tour.iter().find_map(|node| {
            (0..parts)
                .find(|&p| tour.available_spare_parts(node, p) < 0)
                .map(|p| Violation {
                    node,
                    reason: format!("spare part {p} runs out at node {node}"),
                })
        })
    }

    fn check_insertion(&self, tour: &Tour, mv: &InsertionMove) -> FeasibilityCode {
        let ins = tour.instance();
        let tech = ins.technician(tour.technician());
        let capacity = |p: usize| i64::from(tech.spare_part(p));
        if ins.is_main_depot(mv.node()) {
            return Self::replay(tour, Move::Insertion(mv.clone()));
        }
        match mv.depot_trip() {
            Some(_) if tour.main_depot_visit().is_some() => FeasibilityCode::INFEASIBLE_CONTINUE,
            Some(_) if mv.is_depot_adjacent() => {
                FeasibilityCode::from_feasible(Self::covers(tour, mv.node(), mv.succ(), capacity))
            }
            Some(trip) => {
                // the refilled stock covers the whole tail of the tour
                FeasibilityCode::from_feasible(Self::covers(tour, mv.node(), trip.succ, capacity))
            }
            None => {
                let stock = |p: usize| {
                    if tour.is_visited(mv.pred()) {
                        tour.available_spare_parts(mv.pred(), p)
                    } else {
                        capacity(p)
                    }
                };
                if Self::covers(tour, mv.node(), mv.succ(), stock) {
                    FeasibilityCode::FEASIBLE
                } else if tour.is_visited(mv.pred()) && depot_visited_after(tour, mv.pred()) {
                    FeasibilityCode::INFEASIBLE_CONTINUE
                } else {
                    FeasibilityCode::INFEASIBLE
                }
            }
        }
    }

    fn check_removal(&self, tour: &Tour, mv: &RemovalMove) -> FeasibilityCode {
        if !tour.instance().is_main_depot(mv.node()) {
            return FeasibilityCode::FEASIBLE;
        }
        let pred = tour.pred(mv.node());
        let succ = tour.succ(mv.node());
        let parts = tour.instance().spare_part_types();
        let feasible = (0..parts).all(|p| {
            let left = if pred == UNDEFINED {
                0
            } else {
                tour.available_spare_parts(pred, p)
            };
            let needed = if succ == UNDEFINED {
                0
            } else {
                tour.required_spare_parts(succ, p)
            };
            left - needed >= 0
        });
        FeasibilityCode::from_feasible(feasible)
    }

    fn check_shift(&self, tour: &Tour, mv: &ShiftMove) -> FeasibilityCode {
        let changed = mv.changed_sequence(tour);
        if !Self::crosses_depot(tour, &changed.sequence) {
            return FeasibilityCode::FEASIBLE;
        }
        Self::replay(tour, Move::Shift(mv.clone()))
    }

    fn check_two_opt(&self, tour: &Tour, mv: &TwoOptMove) -> FeasibilityCode {
        if !Self::crosses_depot(tour, &mv.reversed_segment(tour)) {
            return FeasibilityCode::FEASIBLE;
        }
        Self::replay(tour, Move::TwoOpt(mv.clone()))
    }
}

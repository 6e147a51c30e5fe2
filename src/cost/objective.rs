//! Solution-level objectives for bi-objective search.

use std::fmt;

use crate::solution::Solution;

/// A measure to minimize over whole solutions.
pub trait Objective: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn evaluate(&self, solution: &Solution) -> f64;
}

/// The objective value stored on the solution by its cost delegate.
#[derive(Debug, Clone, Copy, Default)]
pub struct CostObjective;

impl Objective for CostObjective {
    fn name(&self) -> &'static str {
        "cost"
    }

    fn evaluate(&self, solution: &Solution) -> f64 {
        solution.objective()
    }
}

/// Number of edits needed to turn each tour into the tour of the same
/// technician in a reference plan.
///
/// Lower values mean the routes stay closer to what technicians were given
/// before.
#[derive(Debug, Clone, Default)]
pub struct RouteConsistency {
    reference: Vec<Vec<usize>>,
}

impl RouteConsistency {
    /// `reference[t]` is the visiting sequence of technician `t`.
    pub fn new(reference: Vec<Vec<usize>>) -> Self {
        Self { reference }
    }

    /// Uses the tours of `solution` as reference.
    pub fn from_solution(solution: &Solution) -> Self {
        Self::new(solution.to_routes())
    }

    pub fn reference(&self) -> &[Vec<usize>] {
        &self.reference
    }
}

impl Objective for RouteConsistency {
    fn name(&self) -> &'static str {
        "route consistency"
    }

    fn evaluate(&self, solution: &Solution) -> f64 {
        solution
            .tours()
            .iter()
            .map(|tour| {
                let reference = self
                    .reference
                    .get(tour.technician())
                    .map_or(&[][..], Vec::as_slice);
                levenshtein(reference, &tour.to_vec())
            })
            .sum::<usize>() as f64
    }
}

/// Edit distance between two sequences (insertions, deletions and
/// substitutions of unit cost).
///
/// # Examples
///
/// ```
/// use trsp_alns::cost::levenshtein;
///
/// assert_eq!(levenshtein(&[1, 2, 3], &[1, 3, 2]), 2);
/// assert_eq!(levenshtein(&[1, 2, 3], &[1, 2, 3, 4]), 1);
/// assert_eq!(levenshtein::<u8>(&[], &[7, 8]), 2);
/// ```
pub fn levenshtein<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, x) in a.iter().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        for (j, y) in b.iter().enumerate() {
            let substitution = diag + usize::from(x != y);
            diag = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(diag + 1);
        }
    }
    row[b.len()]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cost::TravelDistance;
    use crate::moves::test_support::open_instance;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein(&[1, 2, 3], &[1, 2, 3]), 0);
        assert_eq!(levenshtein(&[1, 2, 3], &[]), 3);
        assert_eq!(levenshtein(&[1, 5, 3], &[1, 2, 3]), 1);
        assert_eq!(levenshtein(b"kitten", b"sitting"), 3);
    }

    #[test]
    fn test_route_consistency() {
        let ins = open_instance(&[(1.0, 0.0), (2.0, 0.0), (3.0, 0.0)]);
        let cost = Arc::new(TravelDistance::new());
        let reference =
            Solution::from_routes(Arc::clone(&ins), cost.clone(), &[vec![1, 2, 3, 4, 5]]).expect("valid");
        let objective = RouteConsistency::from_solution(&reference);
        assert_eq!(objective.evaluate(&reference), 0.0);

        let changed =
            Solution::from_routes(Arc::clone(&ins), cost, &[vec![1, 3, 2, 5]]).expect("valid");
        // drop 2, then 4 becomes 2
        assert_eq!(objective.evaluate(&changed), 2.0);
        assert!(CostObjective.evaluate(&changed) > 0.0);
    }
}

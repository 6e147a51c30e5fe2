//! Removal of a visit.

use crate::error::Result;
use crate::tour::Tour;

/// Removes `node` from the tour of `technician`.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalMove {
    technician: usize,
    node: usize,
    improvement: f64,
}

impl RemovalMove {
    pub fn new(technician: usize, node: usize) -> Self {
        Self {
            technician,
            node,
            improvement: 0.0,
        }
    }

    pub fn technician(&self) -> usize {
        self.technician
    }

    pub fn node(&self) -> usize {
        self.node
    }

    pub fn improvement(&self) -> f64 {
        self.improvement
    }

    pub fn set_improvement(&mut self, improvement: f64) {
        self.improvement = improvement;
    }

    pub fn resulting_sequence(&self, tour: &Tour) -> Vec<usize> {
        tour.iter().filter(|&n| n != self.node).collect()
    }

    pub fn execute(&self, tour: &mut Tour) -> Result<()> {
        tour.remove_node(self.node)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::TrspError;
    use crate::moves::test_support::open_instance;

    #[test]
    fn test_remove() {
        let ins = open_instance(&[(1.0, 0.0), (2.0, 0.0)]);
        let mut tour = Tour::from_sequence(Arc::clone(&ins), 0, &[1, 2, 3, 4]).expect("valid");
        let mv = RemovalMove::new(0, 2);
        assert_eq!(mv.resulting_sequence(&tour), vec![1, 3, 4]);
        mv.execute(&mut tour).expect("execute");
        assert_eq!(tour.to_vec(), vec![1, 3, 4]);
        assert!(matches!(
            mv.execute(&mut tour),
            Err(TrspError::NodeNotVisited { node: 2, .. })
        ));
    }
}

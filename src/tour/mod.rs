//! Incremental tours.
//!
//! A [`Tour`] is a doubly-linked sequence of node ids stored in flat arrays
//! indexed by node id (an arena of integer links rather than an object
//! graph). Each visited node caches its earliest arrival, latest feasible
//! arrival, tool availability and spare-part levels. Structural operations
//! relink in O(1) and then call [`Tour::propagate_update`], which only walks
//! the region whose cached values actually change.

mod linked_tour;
mod propagation;

pub use linked_tour::{Tour, TourIter, UNDEFINED};

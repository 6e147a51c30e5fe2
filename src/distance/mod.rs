//! Distances between instance nodes.
//!
//! Every node id of an instance (depot, homes, requests and their
//! duplicates) has a row in the [`DistanceMatrix`].

mod matrix;

pub use matrix::DistanceMatrix;

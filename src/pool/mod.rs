//! Solution hashing and pools of tours and solutions.
//!
//! - [`SolutionHasher`] / [`GroerHasher`]: structural hashes of tours and
//!   solutions
//! - [`HashTourPool`]: deduplicated tours collected during the search, the
//!   column set handed to the post-optimizer
//! - [`DiversifiedPool`]: bounded elite pool balancing quality and diversity

mod diversified;
mod hash_pool;
mod hasher;

pub use diversified::{DiversifiedPool, DiversityMetric, LevenshteinDiversity};
pub use hash_pool::{HashTourPool, PoolConfig, PooledTour};
pub use hasher::{GroerHasher, SolutionHasher};

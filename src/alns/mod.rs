//! Adaptive Large Neighborhood Search for the TRSP.
//!
//! - [`destroy`]: random, static-related, time-related and critical removal
//! - [`repair`]: regret-k insertion with optional noise
//! - [`ComponentHandler`]: adaptive roulette-wheel operator selection
//! - [`SimulatedAnnealing`]: acceptance criterion
//! - [`StoppingCriterion`]: iteration/time budget and cancellation
//! - [`Alns`]: the sequential search loop

mod acceptance;
mod components;
mod config;
pub mod destroy;
pub mod repair;
mod runner;
mod stopping;

pub use acceptance::{AnnealingParams, SimulatedAnnealing};
pub use components::{AdaptiveParams, ComponentHandler, Outcome, WeightUpdate};
pub use config::AlnsConfig;
pub use runner::{
    default_destroy_operators, default_repair_operators, is_better, Alns, AlnsResult, AlnsState,
};
pub use stopping::StoppingCriterion;

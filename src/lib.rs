//! # trsp-alns
//!
//! Technician routing and scheduling with adaptive large neighborhood
//! search: technicians with skills, tools and spare parts serve requests
//! with time windows, starting and ending at home and optionally restocking
//! at a main depot.
//!
//! ## Modules
//!
//! - [`models`]: instance model (technicians, requests, depot, node ids)
//! - [`distance`]: Euclidean distance matrix over every node id
//! - [`tour`]: incremental linked tours with cached schedule data
//! - [`solution`]: tours of all technicians plus the unserved requests
//! - [`cost`]: pluggable cost delegates and solution objectives
//! - [`constraints`]: feasibility pipeline with forward-feasibility pruning
//! - [`moves`]: insertion, removal, shift, 2-opt and relocate neighborhoods
//! - [`evaluation`]: independent solution checker
//! - [`constructive`]: regret insertion, initial solutions and randomized
//!   tour generation for the pool
//! - [`alns`]: destroy/repair operators, adaptive selection, the ALNS loop
//! - [`pool`]: solution hashing, hash tour pool and elite pool
//! - [`parallel`]: parallel ALNS, Pareto front, path relinking
//! - [`postopt`]: post-optimization over the tour pool
//! - [`stats`]: run statistics record
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use trsp_alns::alns::{Alns, AlnsConfig};
//! use trsp_alns::cost::TravelDistance;
//! use trsp_alns::models::{Depot, Instance, Request, Technician, TimeWindow};
//!
//! let day = TimeWindow::new(0.0, 480.0).unwrap();
//! let instance = Arc::new(
//!     Instance::new(
//!         "example",
//!         Depot::new(0.0, 0.0, day),
//!         vec![Technician::new(0.0, 0.0, day), Technician::new(20.0, 0.0, day)],
//!         vec![
//!             Request::new(2.0, 1.0, 15.0),
//!             Request::new(18.0, 3.0, 15.0),
//!             Request::new(5.0, 5.0, 15.0),
//!         ],
//!     )
//!     .unwrap(),
//! );
//! let mut alns = Alns::new(&instance, AlnsConfig::default().with_max_iterations(100)).unwrap();
//! let result = alns.solve(instance, Arc::new(TravelDistance::new())).unwrap();
//! assert!(result.best.is_complete());
//! ```

pub mod alns;
pub mod constraints;
pub mod constructive;
pub mod cost;
pub mod distance;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod moves;
pub mod parallel;
pub mod pool;
pub mod postopt;
pub mod solution;
pub mod stats;
pub mod tour;

pub use error::{Result, TrspError};

//! Instance model for the technician routing and scheduling problem.
//!
//! Technicians with skills, tools and spare parts serve requests with time
//! windows, starting and ending at home and optionally reloading at the main
//! depot.

mod attributes;
mod instance;
mod request;
mod technician;
mod time_window;

pub use attributes::AttributeSet;
pub use instance::{Instance, NodeKind};
pub use request::{Depot, Request};
pub use technician::Technician;
pub use time_window::TimeWindow;

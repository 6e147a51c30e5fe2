//! Error type shared by the whole crate.
//!
//! Infeasibility is not an error: constraints report it through
//! [`FeasibilityCode`](crate::constraints::FeasibilityCode) and explanations.
//! The variants below cover contract violations, unsupported strategies,
//! invalid input and failures of the concurrent machinery.

use thiserror::Error;

/// Errors emitted by tours, neighborhoods, pools and the search drivers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrspError {
    /// A node that should be part of the tour is not visited by it.
    #[error("node {node} is not visited by the tour of technician {technician}")]
    NodeNotVisited { node: usize, technician: usize },
    /// A node was inserted in a tour that already visits it.
    #[error("node {node} is already visited by the tour of technician {technician}")]
    NodeAlreadyVisited { node: usize, technician: usize },
    /// A node id outside of the instance range.
    #[error("unknown node id {node} (instance has {max_id} nodes)")]
    UnknownNode { node: usize, max_id: usize },
    /// A strategy or query that is not implemented for this component.
    #[error("{operation} is not supported by {component}")]
    NotSupported {
        component: &'static str,
        operation: &'static str,
    },
    /// The instance description is inconsistent.
    #[error("invalid instance: {0}")]
    InvalidInstance(String),
    /// A configuration value is out of range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    /// Two solutions or tours built on different instances were combined.
    #[error("solutions do not share the same instance")]
    InstanceMismatch,
    /// A worker of a parallel driver terminated abnormally.
    #[error("worker {worker} failed: {reason}")]
    WorkerFailed { worker: usize, reason: String },
    /// A batch of parallel tasks did not complete in time.
    #[error("{task} did not complete within {seconds:.1}s")]
    Timeout { task: &'static str, seconds: f64 },
    /// The external post-optimizer failed.
    #[error("post-optimizer failed: {0}")]
    PostOptimizer(String),
    /// Statistics could not be serialized.
    #[error("failed to serialize statistics: {0}")]
    Serialization(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TrspError>;

impl From<serde_json::Error> for TrspError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

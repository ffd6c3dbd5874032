//! Unified error types for the labforge workspace.
//!
//! Every error is terminal for the compilation that raised it: the
//! compiler performs no partial recovery and propagates the first
//! failure unchanged to the caller.

use std::path::PathBuf;

use ipnet::Ipv4Net;
use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum LabError {
    /// The lab document has a malformed top level or lab body.
    #[error("malformed lab definition: {message}")]
    Shape {
        /// Description of the structural violation.
        message: String,
    },

    /// A node definition violates a per-node semantic rule.
    #[error("node \"{node}\": {message}")]
    Node {
        /// Name of the offending node.
        node: String,
        /// Description of the violation.
        message: String,
    },

    /// Not enough free addresses remain in the requested subnet.
    #[error("address pool exhausted in {subnet}: requested {requested}, {available} available")]
    PoolExhausted {
        /// Subnet the allocation was drawn from.
        subnet: Ipv4Net,
        /// Number of addresses requested.
        requested: usize,
        /// Number of eligible addresses that remained.
        available: usize,
    },

    /// The host network could not be created even after conflict
    /// removal and one retry.
    #[error("network provisioning failed: {message}")]
    Provision {
        /// Description of the provisioning failure.
        message: String,
    },

    /// A `docker compose` invocation failed.
    #[error("orchestrator error: {message}")]
    Orchestrator {
        /// Description of the failed invocation.
        message: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// YAML serialization or deserialization failed.
    #[error("YAML error: {source}")]
    Yaml {
        /// Underlying serde error.
        #[from]
        source: serde_yaml::Error,
    },

    /// An internal invariant was violated (programming error, not a
    /// user-facing condition).
    #[error("internal error: {message}")]
    Internal {
        /// Description of the violated invariant.
        message: String,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, LabError>;

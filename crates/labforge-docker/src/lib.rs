//! # labforge-docker
//!
//! Host-side collaborators of the lab compiler:
//!
//! - **runtime**: the [`runtime::NetworkRuntime`] seam and its `docker`
//!   CLI implementation.
//! - **reconcile**: maps the declared lab subnet to a host bridge
//!   network, removing conflicting networks when necessary.
//! - **orchestrator**: wraps `docker compose` pull/build/up/stop and
//!   streams subprocess output.
//!
//! Everything here mutates or observes host state; the compiler core
//! never does.

pub mod orchestrator;
pub mod reconcile;
pub mod runtime;

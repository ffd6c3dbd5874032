//! # labforge-common
//!
//! Shared error definitions and constants for the labforge workspace.
//!
//! Every other crate in the workspace depends on this one; it must stay
//! free of host-side or compiler-specific logic.

pub mod constants;
pub mod error;

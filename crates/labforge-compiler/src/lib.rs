//! # labforge-compiler
//!
//! The lab compiler core. Translates a declarative lab definition —
//! one subnet plus a set of node definitions — into a deployment
//! descriptor for a container orchestrator.
//!
//! Pipeline (strictly sequential, single-threaded):
//! reader → network provisioner → node resolver → assembler.
//!
//! - **reader**: top-level shape validation and defaults.
//! - **ipam**: deterministic address allocation with reserved-address
//!   exclusion.
//! - **resolve**: replica fan-out and the four-case addressing policy.
//! - **descriptor**: the serde model of the emitted document.
//!
//! The compiler holds no global state; every run works on value
//! objects created for that run and discarded afterwards.

pub mod descriptor;
pub mod ipam;
pub mod node;
pub mod reader;
pub mod resolve;

use ipnet::Ipv4Net;
use labforge_common::constants::NETWORK_SUFFIX;
use labforge_common::error::Result;

use crate::descriptor::{DeploymentDescriptor, NetworkDefinition, Provision};

/// Maps the declared lab subnet to a network definition.
///
/// The production implementation reconciles the subnet against the
/// host's bridge networks; [`OfflinePlanner`] produces an inline
/// definition without touching the host.
pub trait NetworkProvisioner {
    /// Ensures a network named `name` exists for `subnet` and returns
    /// its definition.
    ///
    /// # Errors
    ///
    /// Returns [`labforge_common::error::LabError::Provision`] if the
    /// network cannot be realized.
    fn ensure(&mut self, subnet: Ipv4Net, name: &str) -> Result<NetworkDefinition>;
}

/// Provisioner that declares the network inline instead of creating it
/// on the host. Used by `plan` and by tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflinePlanner;

impl NetworkProvisioner for OfflinePlanner {
    fn ensure(&mut self, subnet: Ipv4Net, name: &str) -> Result<NetworkDefinition> {
        Ok(NetworkDefinition {
            name: name.to_owned(),
            subnet,
            provision: Provision::Managed,
        })
    }
}

/// Derives the lab's network name from the lab name.
#[must_use]
pub fn network_name(lab_name: &str) -> String {
    format!("{lab_name}{NETWORK_SUFFIX}")
}

/// Compiles a parsed lab document into a deployment descriptor.
///
/// The first error aborts the run; there is no partial recovery and no
/// descriptor state to roll back.
///
/// # Errors
///
/// Propagates every error of the pipeline stages unchanged: shape and
/// node violations, pool exhaustion, and provisioning failures.
pub fn compile(
    doc: &serde_yaml::Value,
    provisioner: &mut dyn NetworkProvisioner,
) -> Result<DeploymentDescriptor> {
    let lab = reader::read(doc)?;
    tracing::info!(lab = %lab.name, subnet = %lab.subnet, nodes = lab.nodes.len(), "lab read");

    let network = provisioner.ensure(lab.subnet, &network_name(&lab.name))?;
    let services = resolve::resolve_nodes(&lab, &network)?;
    tracing::info!(services = services.len(), "lab compiled");

    descriptor::assemble(&lab.name, &network, services)
}

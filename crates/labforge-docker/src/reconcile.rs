//! Reconciliation of the declared lab subnet against host networks.
//!
//! The reconcile sequence is check-then-act: list networks, decide
//! conflicts, remove, create. There is no transactional guarantee; a
//! concurrent process mutating host network state between the listing
//! and the removal can make a run fail or remove a network it should
//! not have. The tool targets single-operator, single-host use and
//! accepts this limitation.

use ipnet::Ipv4Net;
use labforge_common::constants::BUILTIN_NETWORKS;
use labforge_common::error::{LabError, Result};
use labforge_compiler::NetworkProvisioner;
use labforge_compiler::descriptor::{NetworkDefinition, Provision};

use crate::runtime::{HostNetwork, NetworkRuntime};

/// Maps a lab subnet to an external bridge network, removing
/// conflicting host networks when creation is rejected.
#[derive(Debug)]
pub struct NetworkReconciler<R: NetworkRuntime> {
    runtime: R,
}

impl<R: NetworkRuntime> NetworkReconciler<R> {
    /// Creates a reconciler over the given runtime.
    pub fn new(runtime: R) -> Self {
        Self { runtime }
    }

    /// Ensures a bridge network named `name` exists for `subnet`.
    ///
    /// On a rejected creation, every host network whose subnet is a
    /// sub- or super-net of `subnet`, or whose name equals `name`, is
    /// removed (docker's built-in `none`/`host`/`bridge` networks are
    /// never touched), and creation is retried exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`LabError::Provision`] if the retry is also rejected.
    pub fn ensure(&mut self, subnet: Ipv4Net, name: &str) -> Result<NetworkDefinition> {
        if self.runtime.create(name, subnet)? {
            return Ok(definition(name, subnet));
        }

        tracing::warn!(network = %name, %subnet, "creation rejected, removing conflicting networks");
        for host_net in self.runtime.list()? {
            if !conflicts(&host_net, name, subnet) {
                continue;
            }
            if let Err(e) = self.runtime.remove(&host_net.name) {
                // Removal failures surface on the retry if they matter.
                tracing::warn!(network = %host_net.name, error = %e, "could not remove network");
            }
        }

        if self.runtime.create(name, subnet)? {
            return Ok(definition(name, subnet));
        }
        Err(LabError::Provision {
            message: format!("network {name} ({subnet}) could not be created after conflict removal"),
        })
    }
}

impl<R: NetworkRuntime> NetworkProvisioner for NetworkReconciler<R> {
    fn ensure(&mut self, subnet: Ipv4Net, name: &str) -> Result<NetworkDefinition> {
        Self::ensure(self, subnet, name)
    }
}

fn definition(name: &str, subnet: Ipv4Net) -> NetworkDefinition {
    NetworkDefinition {
        name: name.to_owned(),
        subnet,
        provision: Provision::External,
    }
}

fn conflicts(host_net: &HostNetwork, name: &str, subnet: Ipv4Net) -> bool {
    if BUILTIN_NETWORKS.contains(&host_net.name.as_str()) {
        return false;
    }
    if host_net.name == name {
        return true;
    }
    host_net
        .subnet
        .is_some_and(|s| s.contains(&subnet) || subnet.contains(&s))
}

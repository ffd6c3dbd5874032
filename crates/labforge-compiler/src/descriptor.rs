//! Deployment descriptor model and final assembly.
//!
//! The descriptor is owned by [`assemble`] until it is returned, and is
//! never mutated afterwards. All maps are ordered so that serializing
//! the same compilation twice yields byte-identical output.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use labforge_common::constants::DESCRIPTOR_VERSION;
use labforge_common::error::{LabError, Result};
use serde::Serialize;

/// How the lab network was (or will be) realized on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provision {
    /// The network was created on the host by the reconciler; services
    /// bind to it as an external resource.
    External,
    /// The network is declared inline for the orchestrator to create.
    Managed,
}

/// The single network every service binds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDefinition {
    /// Network name, derived from the lab name.
    pub name: String,
    /// Subnet the network spans.
    pub subnet: Ipv4Net,
    /// Realization mode, which decides the serialized form.
    pub provision: Provision,
}

impl NetworkDefinition {
    fn to_compose(&self) -> ComposeNetwork {
        match self.provision {
            Provision::External => ComposeNetwork::External {
                name: self.name.clone(),
                external: true,
            },
            Provision::Managed => ComposeNetwork::Bridge {
                driver: "bridge".to_owned(),
                ipam: IpamSpec {
                    config: vec![IpamEntry { subnet: self.subnet }],
                },
            },
        }
    }
}

/// Serialized form of a network entry in the descriptor.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ComposeNetwork {
    /// Binding to a pre-created host network.
    External {
        /// Host network name.
        name: String,
        /// Always `true`.
        external: bool,
    },
    /// Inline bridge network with an IPAM subnet.
    Bridge {
        /// Network driver, always `bridge`.
        driver: String,
        /// Address management configuration.
        ipam: IpamSpec,
    },
}

/// IPAM block of an inline network.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IpamSpec {
    /// Subnet configuration entries.
    pub config: Vec<IpamEntry>,
}

/// One IPAM subnet entry.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct IpamEntry {
    /// Subnet in CIDR notation.
    pub subnet: Ipv4Net,
}

/// A service's binding to the lab network.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ServiceBinding {
    /// Address assigned to the service on the lab network.
    pub ipv4_address: Ipv4Addr,
}

/// One resolved service entry.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ServiceRecord {
    /// Build context path, present iff the node was a build node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    /// Image reference, present iff the node was an image node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Names of services this one depends on.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Entrypoint command line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    /// Environment entries (`KEY=value`).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<String>,
    /// Volume mounts.
    pub volumes: Vec<String>,
    /// Network bindings, keyed by network name.
    pub networks: BTreeMap<String, ServiceBinding>,
}

/// The complete deployment descriptor handed to the document writer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeploymentDescriptor {
    /// Descriptor schema version.
    pub version: String,
    /// Lab name.
    pub name: String,
    /// Network definitions keyed by network name.
    pub networks: BTreeMap<String, ComposeNetwork>,
    /// Service records keyed by derived service name.
    pub services: BTreeMap<String, ServiceRecord>,
}

/// Aggregates the network definition and all service records into the
/// final descriptor. Pure aggregation; every invariant must already
/// hold.
///
/// # Errors
///
/// Returns [`LabError::Internal`] if the network definition carries an
/// empty name. This is a programming error, not a user-facing
/// condition.
pub fn assemble(
    name: &str,
    network: &NetworkDefinition,
    services: BTreeMap<String, ServiceRecord>,
) -> Result<DeploymentDescriptor> {
    if network.name.is_empty() {
        return Err(LabError::Internal {
            message: "descriptor assembled without a network definition".to_owned(),
        });
    }

    let mut networks = BTreeMap::new();
    let _ = networks.insert(network.name.clone(), network.to_compose());

    Ok(DeploymentDescriptor {
        version: DESCRIPTOR_VERSION.to_owned(),
        name: name.to_owned(),
        networks,
        services,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network(provision: Provision) -> NetworkDefinition {
        NetworkDefinition {
            name: "mylab_network".to_owned(),
            subnet: "10.0.0.0/24".parse().expect("subnet"),
            provision,
        }
    }

    #[test]
    fn assemble_builds_descriptor_with_version_and_name() {
        let desc = assemble("mylab", &network(Provision::External), BTreeMap::new())
            .expect("should assemble");
        assert_eq!(desc.version, DESCRIPTOR_VERSION);
        assert_eq!(desc.name, "mylab");
        assert!(desc.networks.contains_key("mylab_network"));
    }

    #[test]
    fn assemble_rejects_empty_network_name() {
        let net = NetworkDefinition {
            name: String::new(),
            subnet: "10.0.0.0/24".parse().expect("subnet"),
            provision: Provision::External,
        };
        let err = assemble("mylab", &net, BTreeMap::new()).unwrap_err();
        assert!(matches!(err, LabError::Internal { .. }), "got: {err}");
    }

    #[test]
    fn external_network_serializes_binding_form() {
        let desc = assemble("mylab", &network(Provision::External), BTreeMap::new())
            .expect("should assemble");
        let yaml = serde_yaml::to_string(&desc).expect("should serialize");
        assert!(yaml.contains("external: true"), "got: {yaml}");
        assert!(!yaml.contains("driver:"), "got: {yaml}");
    }

    #[test]
    fn managed_network_serializes_bridge_ipam_form() {
        let desc = assemble("mylab", &network(Provision::Managed), BTreeMap::new())
            .expect("should assemble");
        let yaml = serde_yaml::to_string(&desc).expect("should serialize");
        assert!(yaml.contains("driver: bridge"), "got: {yaml}");
        assert!(yaml.contains("subnet: 10.0.0.0/24"), "got: {yaml}");
    }

    #[test]
    fn service_record_omits_empty_optionals() {
        let record = ServiceRecord {
            build: None,
            image: Some("alpine:3".to_owned()),
            depends_on: Vec::new(),
            entrypoint: None,
            environment: Vec::new(),
            volumes: vec!["./:/workspace".to_owned()],
            networks: BTreeMap::new(),
        };
        let yaml = serde_yaml::to_string(&record).expect("should serialize");
        assert!(yaml.contains("image: alpine:3"), "got: {yaml}");
        assert!(!yaml.contains("build"), "got: {yaml}");
        assert!(!yaml.contains("depends_on"), "got: {yaml}");
        assert!(!yaml.contains("entrypoint"), "got: {yaml}");
    }
}

//! Per-node resolution: replica fan-out and the addressing policy.
//!
//! For each node the resolver applies the four-case policy:
//!
//! 1. replicated + explicit address — error.
//! 2. replicated + sub-subnet — allocate from the sub-subnet if it is
//!    contained in the lab subnet, error otherwise; without a
//!    sub-subnet, allocate from the lab subnet.
//! 3. single + explicit address — commit it if it is free and inside
//!    the lab subnet, error otherwise.
//! 4. single + no address — allocate one from the lab subnet.
//!
//! Every allocated or pinned address is committed into one shared
//! [`AddressPool`] so later nodes cannot collide with earlier ones.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use labforge_common::constants::{ENTRYPOINT_SHELL, WORKSPACE_DIR, WORKSPACE_VOLUME};
use labforge_common::error::{LabError, Result};

use crate::descriptor::{NetworkDefinition, ServiceBinding, ServiceRecord};
use crate::ipam::{self, AddressPool};
use crate::node::{NodeDefinition, NodeSource};
use crate::reader::LabTopology;

/// Resolves every node of `lab` into service records bound to
/// `network`.
///
/// Nodes are processed in name order, which makes address allocation
/// deterministic for a given document.
///
/// # Errors
///
/// Returns [`LabError::Node`] for any policy violation and
/// [`LabError::PoolExhausted`] when a subnet runs out of addresses.
pub fn resolve_nodes(
    lab: &LabTopology,
    network: &NetworkDefinition,
) -> Result<BTreeMap<String, ServiceRecord>> {
    let mut pool = AddressPool::new();
    let mut services = BTreeMap::new();

    for (name, node) in &lab.nodes {
        tracing::debug!(node = %name, replicas = node.replicas, "resolving node");
        if node.replicas > 1 {
            resolve_replicated(lab, network, name, node, &mut pool, &mut services)?;
        } else {
            resolve_single(lab, network, name, node, &mut pool, &mut services)?;
        }
    }

    Ok(services)
}

fn resolve_replicated(
    lab: &LabTopology,
    network: &NetworkDefinition,
    name: &str,
    node: &NodeDefinition,
    pool: &mut AddressPool,
    services: &mut BTreeMap<String, ServiceRecord>,
) -> Result<()> {
    if node.address.is_some() {
        return Err(node_err(name, "a replicated node cannot pin a single address"));
    }

    let scope = match node.subnet {
        Some(sub) => {
            if !lab.subnet.contains(&sub) {
                return Err(node_err(
                    name,
                    &format!("sub-subnet {sub} escapes the lab range {}", lab.subnet),
                ));
            }
            sub
        }
        None => lab.subnet,
    };

    let count = node.replicas as usize;
    let addrs = ipam::allocate(scope, pool.as_set(), count)?;
    pool.commit(addrs.iter().copied());

    for (i, addr) in addrs.into_iter().enumerate() {
        let mut record = base_record(node);
        record.environment = vec![format!("REPLICA_ID={i}")];
        bind(&mut record, network, addr);
        let _ = services.insert(format!("{name}_{i}"), record);
    }
    Ok(())
}

fn resolve_single(
    lab: &LabTopology,
    network: &NetworkDefinition,
    name: &str,
    node: &NodeDefinition,
    pool: &mut AddressPool,
    services: &mut BTreeMap<String, ServiceRecord>,
) -> Result<()> {
    let addr = match node.address {
        Some(ip) => {
            if pool.contains(ip) {
                return Err(node_err(name, &format!("duplicate address: {ip}")));
            }
            if !lab.subnet.contains(&ip) {
                return Err(node_err(
                    name,
                    &format!("address {ip} is outside the lab range {}", lab.subnet),
                ));
            }
            ip
        }
        None => ipam::allocate(lab.subnet, pool.as_set(), 1)?[0],
    };
    pool.commit([addr]);

    let mut record = base_record(node);
    bind(&mut record, network, addr);
    let _ = services.insert(name.to_owned(), record);
    Ok(())
}

fn base_record(node: &NodeDefinition) -> ServiceRecord {
    let (build, image) = match &node.source {
        NodeSource::Build(path) => (Some(path.clone()), None),
        NodeSource::Image(reference) => (None, Some(reference.clone())),
    };
    ServiceRecord {
        build,
        image,
        depends_on: node.needs.clone(),
        entrypoint: node
            .script
            .as_ref()
            .map(|s| format!("{ENTRYPOINT_SHELL} {WORKSPACE_DIR}/{s}")),
        environment: Vec::new(),
        volumes: vec![WORKSPACE_VOLUME.to_owned()],
        networks: BTreeMap::new(),
    }
}

fn bind(record: &mut ServiceRecord, network: &NetworkDefinition, addr: Ipv4Addr) {
    let _ = record
        .networks
        .insert(network.name.clone(), ServiceBinding { ipv4_address: addr });
}

fn node_err(node: &str, message: &str) -> LabError {
    LabError::Node {
        node: node.to_owned(),
        message: message.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use ipnet::Ipv4Net;

    use super::*;
    use crate::descriptor::Provision;

    fn lab(subnet: &str, nodes: &[(&str, &str)]) -> LabTopology {
        let mut map = BTreeMap::new();
        for (name, yaml) in nodes {
            let value: serde_yaml::Value = serde_yaml::from_str(yaml).expect("valid yaml");
            let node = NodeDefinition::parse(name, &value).expect("valid node");
            let _ = map.insert((*name).to_owned(), node);
        }
        LabTopology {
            name: "mylab".to_owned(),
            subnet: subnet.parse::<Ipv4Net>().expect("subnet"),
            nodes: map,
        }
    }

    fn network() -> NetworkDefinition {
        NetworkDefinition {
            name: "mylab_network".to_owned(),
            subnet: "192.168.0.0/24".parse().expect("subnet"),
            provision: Provision::External,
        }
    }

    fn bound_address(record: &ServiceRecord) -> Ipv4Addr {
        record.networks["mylab_network"].ipv4_address
    }

    #[test]
    fn single_node_gets_first_free_address() {
        let services = resolve_nodes(&lab("192.168.0.0/24", &[("n1", "image: a")]), &network())
            .expect("should resolve");
        assert_eq!(
            bound_address(&services["n1"]),
            "192.168.0.2".parse::<Ipv4Addr>().expect("addr"),
        );
    }

    #[test]
    fn explicit_address_is_committed() {
        let services = resolve_nodes(
            &lab("192.168.0.0/24", &[("n1", "image: a\nip: 192.168.0.5"), ("n2", "image: b")]),
            &network(),
        )
        .expect("should resolve");
        assert_eq!(
            bound_address(&services["n1"]),
            "192.168.0.5".parse::<Ipv4Addr>().expect("addr"),
        );
        // n2's automatic allocation must not collide with n1's pin.
        assert_ne!(bound_address(&services["n2"]), bound_address(&services["n1"]));
    }

    #[test]
    fn duplicate_explicit_address_fails() {
        let err = resolve_nodes(
            &lab(
                "192.168.0.0/24",
                &[("n1", "image: a\nip: 192.168.0.5"), ("n2", "image: b\nip: 192.168.0.5")],
            ),
            &network(),
        )
        .unwrap_err();
        match err {
            LabError::Node { node, message } => {
                assert_eq!(node, "n2");
                assert!(message.contains("duplicate"), "got: {message}");
            }
            other => panic!("expected Node error, got {other}"),
        }
    }

    #[test]
    fn explicit_address_outside_lab_range_fails() {
        let err = resolve_nodes(
            &lab("192.168.0.0/24", &[("n1", "image: a\nip: 10.0.0.5")]),
            &network(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("outside the lab range"), "got: {err}");
    }

    #[test]
    fn replicated_node_fans_out_with_distinct_addresses() {
        let services = resolve_nodes(
            &lab("192.168.0.0/24", &[("n1", "image: a\nreplicas: 3")]),
            &network(),
        )
        .expect("should resolve");
        assert_eq!(services.len(), 3);
        let mut seen = std::collections::BTreeSet::new();
        for i in 0..3 {
            let record = &services[&format!("n1_{i}")];
            assert_eq!(record.environment, vec![format!("REPLICA_ID={i}")]);
            assert!(seen.insert(bound_address(record)), "address reused");
        }
    }

    #[test]
    fn huge_replica_count_reports_pool_exhaustion() {
        let err = resolve_nodes(
            &lab("192.168.0.0/29", &[("n1", "image: a\nreplicas: 4000000000")]),
            &network(),
        )
        .unwrap_err();
        assert!(matches!(err, LabError::PoolExhausted { .. }), "got: {err}");
    }

    #[test]
    fn replicated_node_with_pinned_address_fails() {
        let err = resolve_nodes(
            &lab("192.168.0.0/24", &[("n1", "image: a\nreplicas: 3\nip: 192.168.0.5")]),
            &network(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("cannot pin"), "got: {err}");
    }

    #[test]
    fn replicas_draw_from_contained_sub_subnet() {
        let sub: Ipv4Net = "192.168.0.64/28".parse().expect("subnet");
        let services = resolve_nodes(
            &lab("192.168.0.0/24", &[("n1", "image: a\nreplicas: 2\nnetwork: 192.168.0.64/28")]),
            &network(),
        )
        .expect("should resolve");
        for record in services.values() {
            assert!(sub.contains(&bound_address(record)));
        }
    }

    #[test]
    fn sub_subnet_escaping_lab_range_fails() {
        let err = resolve_nodes(
            &lab("192.168.0.0/24", &[("n1", "image: a\nreplicas: 2\nnetwork: 10.0.0.0/28")]),
            &network(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("escapes the lab range"), "got: {err}");
    }

    #[test]
    fn build_node_emits_build_clause_and_entrypoint() {
        let services = resolve_nodes(
            &lab("192.168.0.0/24", &[("n1", "build: ./router\nscript: start.sh\nneeds: [n2]")]),
            &network(),
        )
        .expect("should resolve");
        let record = &services["n1"];
        assert_eq!(record.build.as_deref(), Some("./router"));
        assert!(record.image.is_none());
        assert_eq!(record.entrypoint.as_deref(), Some("/bin/bash /workspace/start.sh"));
        assert_eq!(record.depends_on, vec!["n2".to_owned()]);
        assert_eq!(record.volumes, vec![WORKSPACE_VOLUME.to_owned()]);
    }

    #[test]
    fn later_nodes_cannot_collide_with_replica_allocations() {
        let services = resolve_nodes(
            &lab("192.168.0.0/29", &[("a", "image: a\nreplicas: 3"), ("b", "image: b")]),
            &network(),
        )
        .expect("should resolve");
        let mut seen = std::collections::BTreeSet::new();
        for record in services.values() {
            assert!(seen.insert(bound_address(record)), "address reused");
        }
    }
}

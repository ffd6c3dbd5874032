//! Host network runtime seam and its `docker` CLI implementation.

use std::process::Command;

use ipnet::Ipv4Net;
use labforge_common::constants::BRIDGE_IFACE;
use labforge_common::error::{LabError, Result};
use serde::Deserialize;

/// Summary of one network present on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostNetwork {
    /// Network name.
    pub name: String,
    /// Declared IPv4 subnet, if the network has one.
    pub subnet: Option<Ipv4Net>,
}

/// Operations the reconciler needs from the host's network runtime.
///
/// The production implementation shells out to the `docker` CLI; tests
/// substitute an in-memory fake.
pub trait NetworkRuntime {
    /// Attempts to create a bridge network. Returns `Ok(false)` when
    /// the runtime rejects the creation (name collision or subnet
    /// overlap).
    ///
    /// # Errors
    ///
    /// Returns an error only when the runtime itself cannot be invoked.
    fn create(&mut self, name: &str, subnet: Ipv4Net) -> Result<bool>;

    /// Lists all networks currently defined on the host.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be obtained.
    fn list(&self) -> Result<Vec<HostNetwork>>;

    /// Removes a network by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime refuses the removal.
    fn remove(&mut self, name: &str) -> Result<()>;
}

/// `docker` CLI-backed network runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct DockerCli;

impl DockerCli {
    fn run(args: &[&str]) -> Result<std::process::Output> {
        tracing::debug!(?args, "docker invocation");
        Command::new("docker").args(args).output().map_err(|e| LabError::Io {
            path: "docker".into(),
            source: e,
        })
    }
}

impl NetworkRuntime for DockerCli {
    fn create(&mut self, name: &str, subnet: Ipv4Net) -> Result<bool> {
        let subnet_arg = subnet.to_string();
        let bridge_opt = format!("com.docker.network.bridge.name={BRIDGE_IFACE}");
        let output = Self::run(&[
            "network",
            "create",
            "--driver=bridge",
            "--opt",
            &bridge_opt,
            "--subnet",
            &subnet_arg,
            name,
        ])?;

        if output.status.success() {
            tracing::info!(network = %name, subnet = %subnet, "network created");
            Ok(true)
        } else {
            tracing::debug!(
                network = %name,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "network creation rejected"
            );
            Ok(false)
        }
    }

    fn list(&self) -> Result<Vec<HostNetwork>> {
        let listing = Self::run(&["network", "ls", "--format", "{{.Name}}"])?;
        if !listing.status.success() {
            return Err(LabError::Provision {
                message: format!(
                    "network listing failed: {}",
                    String::from_utf8_lossy(&listing.stderr).trim()
                ),
            });
        }

        let names: Vec<String> = String::from_utf8_lossy(&listing.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .collect();
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut args = vec!["network", "inspect", "--format", "json"];
        args.extend(names.iter().map(String::as_str));
        let inspect = Self::run(&args)?;
        if !inspect.status.success() {
            return Err(LabError::Provision {
                message: format!(
                    "network inspection failed: {}",
                    String::from_utf8_lossy(&inspect.stderr).trim()
                ),
            });
        }

        parse_inspect_output(&String::from_utf8_lossy(&inspect.stdout))
    }

    fn remove(&mut self, name: &str) -> Result<()> {
        let output = Self::run(&["network", "rm", name])?;
        if output.status.success() {
            tracing::info!(network = %name, "network removed");
            Ok(())
        } else {
            Err(LabError::Provision {
                message: format!(
                    "removal of network {name} failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            })
        }
    }
}

#[derive(Debug, Deserialize)]
struct InspectEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "IPAM", default)]
    ipam: Option<InspectIpam>,
}

#[derive(Debug, Deserialize)]
struct InspectIpam {
    #[serde(rename = "Config", default)]
    config: Option<Vec<InspectIpamConfig>>,
}

#[derive(Debug, Deserialize)]
struct InspectIpamConfig {
    #[serde(rename = "Subnet", default)]
    subnet: Option<String>,
}

/// Decodes `docker network inspect --format json` output. Each line is
/// a JSON array (one line per invocation; kept line-wise for older
/// docker versions that emit one array per network).
fn parse_inspect_output(raw: &str) -> Result<Vec<HostNetwork>> {
    let mut networks = Vec::new();
    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let entries: Vec<InspectEntry> =
            serde_json::from_str(line).map_err(|e| LabError::Provision {
                message: format!("unreadable network inspection output: {e}"),
            })?;
        for entry in entries {
            let subnet = entry
                .ipam
                .and_then(|i| i.config)
                .and_then(|c| c.into_iter().find_map(|cfg| cfg.subnet))
                // IPv6 and malformed subnets are treated as absent.
                .and_then(|s| s.parse::<Ipv4Net>().ok());
            networks.push(HostNetwork {
                name: entry.name,
                subnet,
            });
        }
    }
    Ok(networks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_inspect_extracts_name_and_subnet() {
        let raw = r#"[{"Name":"lab_network","IPAM":{"Config":[{"Subnet":"10.0.0.0/24"}]}}]"#;
        let nets = parse_inspect_output(raw).expect("should parse");
        assert_eq!(nets.len(), 1);
        assert_eq!(nets[0].name, "lab_network");
        assert_eq!(nets[0].subnet, Some("10.0.0.0/24".parse().expect("subnet")));
    }

    #[test]
    fn parse_inspect_handles_networks_without_subnet() {
        let raw = r#"[{"Name":"host","IPAM":{"Config":[]}},{"Name":"none","IPAM":{"Config":null}}]"#;
        let nets = parse_inspect_output(raw).expect("should parse");
        assert_eq!(nets.len(), 2);
        assert!(nets.iter().all(|n| n.subnet.is_none()));
    }

    #[test]
    fn parse_inspect_ignores_ipv6_subnets() {
        let raw = r#"[{"Name":"v6","IPAM":{"Config":[{"Subnet":"fd00::/64"}]}}]"#;
        let nets = parse_inspect_output(raw).expect("should parse");
        assert_eq!(nets[0].subnet, None);
    }

    #[test]
    fn parse_inspect_accepts_one_array_per_line() {
        let raw = "[{\"Name\":\"a\"}]\n[{\"Name\":\"b\"}]\n";
        let nets = parse_inspect_output(raw).expect("should parse");
        assert_eq!(nets.len(), 2);
    }

    #[test]
    fn parse_inspect_rejects_garbage() {
        assert!(parse_inspect_output("not json").is_err());
    }
}

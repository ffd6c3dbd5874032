//! Node definitions and their parse-time validation.
//!
//! A node's `build`/`image` alternative is decided exactly once, here,
//! into the [`NodeSource`] tagged union; consumers never re-inspect the
//! raw document.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use labforge_common::error::{LabError, Result};
use serde::Deserialize;

/// Where a node's container comes from.
///
/// Exactly one of the two alternatives is present in a valid node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSource {
    /// Build the image from a local context path.
    Build(String),
    /// Pull a named image reference.
    Image(String),
}

/// A validated node definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDefinition {
    /// Container source, decided at parse time.
    pub source: NodeSource,
    /// Names of nodes this node depends on. Copied through verbatim;
    /// referenced names are not validated to exist.
    pub needs: Vec<String>,
    /// Entrypoint script path, relative to the workspace mount.
    pub script: Option<String>,
    /// Replica count, at least 1.
    pub replicas: u32,
    /// Explicit address pin. Mutually exclusive with `replicas > 1`.
    pub address: Option<Ipv4Addr>,
    /// Sub-subnet replica addresses are drawn from.
    pub subnet: Option<Ipv4Net>,
}

/// Raw node clause as it appears in the lab document. Unrecognized
/// keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct RawNode {
    build: Option<String>,
    image: Option<String>,
    needs: Option<Vec<String>>,
    script: Option<String>,
    replicas: Option<u32>,
    ip: Option<String>,
    network: Option<String>,
}

impl NodeDefinition {
    /// Parses and validates one node clause.
    ///
    /// # Errors
    ///
    /// Returns [`LabError::Node`] if the clause is not a mapping of the
    /// expected field types, declares both or neither of
    /// `build`/`image`, sets `replicas` below 1, or carries an
    /// unparseable `ip` or `network` value.
    pub fn parse(name: &str, value: &serde_yaml::Value) -> Result<Self> {
        let raw: RawNode =
            serde_yaml::from_value(value.clone()).map_err(|e| LabError::Node {
                node: name.to_owned(),
                message: e.to_string(),
            })?;

        let source = match (raw.build, raw.image) {
            (Some(_), Some(_)) => {
                return Err(node_err(name, "'build' and 'image' are mutually exclusive"));
            }
            (None, None) => {
                return Err(node_err(name, "missing 'build' or 'image' clause"));
            }
            (Some(path), None) => NodeSource::Build(path),
            (None, Some(reference)) => NodeSource::Image(reference),
        };

        let replicas = raw.replicas.unwrap_or(1);
        if replicas < 1 {
            return Err(node_err(name, "'replicas' must be at least 1"));
        }

        let address = raw
            .ip
            .map(|s| {
                s.parse::<Ipv4Addr>()
                    .map_err(|_| node_err(name, &format!("invalid 'ip' address: {s}")))
            })
            .transpose()?;

        let subnet = raw
            .network
            .map(|s| {
                s.parse::<Ipv4Net>()
                    .map_err(|_| node_err(name, &format!("invalid 'network' subnet: {s}")))
            })
            .transpose()?;

        Ok(Self {
            source,
            needs: raw.needs.unwrap_or_default(),
            script: raw.script,
            replicas,
            address,
            subnet,
        })
    }
}

fn node_err(node: &str, message: &str) -> LabError {
    LabError::Node {
        node: node.to_owned(),
        message: message.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<NodeDefinition> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml).expect("valid yaml");
        NodeDefinition::parse("n1", &value)
    }

    #[test]
    fn parse_build_node() {
        let node = parse("build: ./router").expect("should parse");
        assert_eq!(node.source, NodeSource::Build("./router".into()));
        assert_eq!(node.replicas, 1);
        assert!(node.needs.is_empty());
        assert!(node.address.is_none());
    }

    #[test]
    fn parse_image_node_with_options() {
        let node = parse(
            "image: alpine:3\nneeds: [router]\nscript: start.sh\nreplicas: 3\nnetwork: 10.0.1.0/24",
        )
        .expect("should parse");
        assert_eq!(node.source, NodeSource::Image("alpine:3".into()));
        assert_eq!(node.needs, vec!["router".to_owned()]);
        assert_eq!(node.script.as_deref(), Some("start.sh"));
        assert_eq!(node.replicas, 3);
        assert_eq!(node.subnet, Some("10.0.1.0/24".parse().expect("subnet")));
    }

    #[test]
    fn parse_both_build_and_image_fails() {
        let err = parse("build: ./a\nimage: foo:latest").unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"), "got: {err}");
    }

    #[test]
    fn parse_neither_build_nor_image_fails() {
        let err = parse("needs: [x]").unwrap_err();
        assert!(err.to_string().contains("missing 'build' or 'image'"), "got: {err}");
    }

    #[test]
    fn parse_zero_replicas_fails() {
        let err = parse("image: a\nreplicas: 0").unwrap_err();
        assert!(err.to_string().contains("at least 1"), "got: {err}");
    }

    #[test]
    fn parse_invalid_ip_fails() {
        let err = parse("image: a\nip: 300.1.2.3").unwrap_err();
        assert!(err.to_string().contains("invalid 'ip'"), "got: {err}");
    }

    #[test]
    fn parse_invalid_subnet_fails() {
        let err = parse("image: a\nnetwork: 10.0.0.0/33").unwrap_err();
        assert!(err.to_string().contains("invalid 'network'"), "got: {err}");
    }

    #[test]
    fn parse_ignores_unknown_keys() {
        let node = parse("image: a\ncolour: blue").expect("unknown keys are ignored");
        assert_eq!(node.source, NodeSource::Image("a".into()));
    }
}

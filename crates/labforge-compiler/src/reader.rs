//! Lab document reader and top-level shape validation.
//!
//! The reader is a pure function of the parsed document: it performs no
//! file access and normalizes every missing-key lookup into either a
//! default value or a [`LabError::Shape`] / [`LabError::Node`] error.

use std::collections::BTreeMap;

use ipnet::Ipv4Net;
use labforge_common::constants::DEFAULT_SUBNET;
use labforge_common::error::{LabError, Result};

use crate::node::NodeDefinition;

/// The two clauses a lab body may carry.
const RECOGNIZED_CLAUSES: [&str; 2] = ["network", "nodes"];

/// A validated lab topology, built once per run and read-only
/// thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabTopology {
    /// Lab name, the document's single top-level key.
    pub name: String,
    /// Lab subnet, defaulting to `10.0.0.0/8`.
    pub subnet: Ipv4Net,
    /// Node definitions keyed by node name.
    pub nodes: BTreeMap<String, NodeDefinition>,
}

/// Extracts the single lab definition from a parsed document.
///
/// # Errors
///
/// Returns [`LabError::Shape`] if the top level is not a mapping with
/// exactly one key, if the lab body carries a clause other than
/// `network`/`nodes`, or if the `network` clause is not a valid CIDR;
/// [`LabError::Node`] if any node clause is invalid.
pub fn read(doc: &serde_yaml::Value) -> Result<LabTopology> {
    let top = doc.as_mapping().ok_or_else(|| shape_err("document is not a mapping"))?;
    if top.len() != 1 {
        return Err(shape_err(&format!(
            "expected exactly one lab at the top level, found {}",
            top.len()
        )));
    }

    let (key, body) = top.iter().next().ok_or_else(|| shape_err("empty document"))?;
    let name = key
        .as_str()
        .ok_or_else(|| shape_err("lab name is not a string"))?
        .to_owned();

    tracing::debug!(lab = %name, "reading lab definition");

    let (subnet, nodes) = read_body(body)?;
    Ok(LabTopology { name, subnet, nodes })
}

fn read_body(body: &serde_yaml::Value) -> Result<(Ipv4Net, BTreeMap<String, NodeDefinition>)> {
    let default_subnet: Ipv4Net = DEFAULT_SUBNET
        .parse()
        .map_err(|_| LabError::Internal {
            message: format!("default subnet {DEFAULT_SUBNET} does not parse"),
        })?;

    // An empty lab body is a valid lab with only defaults.
    if body.is_null() {
        return Ok((default_subnet, BTreeMap::new()));
    }

    let lab = body
        .as_mapping()
        .ok_or_else(|| shape_err("lab body is not a mapping"))?;

    for key in lab.keys() {
        let clause = key
            .as_str()
            .ok_or_else(|| shape_err("lab clause name is not a string"))?;
        if !RECOGNIZED_CLAUSES.contains(&clause) {
            return Err(shape_err(&format!("unrecognized lab clause: {clause}")));
        }
    }

    let subnet = match lab.get("network") {
        Some(value) => parse_subnet(value)?,
        None => {
            tracing::debug!(subnet = DEFAULT_SUBNET, "no 'network' clause, using default");
            default_subnet
        }
    };

    let nodes = match lab.get("nodes") {
        Some(value) => read_nodes(value)?,
        None => BTreeMap::new(),
    };

    Ok((subnet, nodes))
}

fn parse_subnet(value: &serde_yaml::Value) -> Result<Ipv4Net> {
    let text = value
        .as_str()
        .ok_or_else(|| shape_err("'network' clause is not a string"))?;
    text.parse::<Ipv4Net>()
        .map_err(|_| shape_err(&format!("'network' is not a valid CIDR: {text}")))
}

fn read_nodes(value: &serde_yaml::Value) -> Result<BTreeMap<String, NodeDefinition>> {
    let mapping = value
        .as_mapping()
        .ok_or_else(|| shape_err("'nodes' clause is not a mapping"))?;

    let mut nodes = BTreeMap::new();
    for (key, body) in mapping {
        let name = key
            .as_str()
            .ok_or_else(|| shape_err("node name is not a string"))?;
        let node = NodeDefinition::parse(name, body)?;
        tracing::debug!(node = %name, "node added");
        if nodes.insert(name.to_owned(), node).is_some() {
            return Err(shape_err(&format!("duplicate node name: {name}")));
        }
    }
    Ok(nodes)
}

fn shape_err(message: &str) -> LabError {
    LabError::Shape {
        message: message.to_owned(),
    }
}

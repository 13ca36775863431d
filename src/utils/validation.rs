//! Identifier and topology validation utilities.
//!
//! The compiler embeds node identifiers into generated model text without
//! escaping. These checks are opt-in and let a caller reject identifiers
//! that would break the generated `system` line or the measure names.

use crate::graph_parser::Topology;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static DSL_IDENTIFIER: LazyLock<Regex> = LazyLock::new(||
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap()
);

/// Characters that would change the meaning of a `N[..]`/`C[..]` term
const RESERVED_NODE_CHARS: &[char] = &['[', ']', ',', '|', ';'];

/// Validate a system name against the DSL identifier grammar
///
/// # Examples
/// ```
/// use popsim::utils::validation::validate_dsl_identifier;
///
/// assert!(validate_dsl_identifier("sys1").is_ok());
/// assert!(validate_dsl_identifier("1sys").is_err());
/// assert!(validate_dsl_identifier("").is_err());
/// ```
pub fn validate_dsl_identifier(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Identifier cannot be empty".to_string());
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(format!("Identifier '{}' cannot start with a digit", name));
    }
    if !DSL_IDENTIFIER.is_match(name) {
        return Err(format!(
            "Identifier '{}' may only contain letters, digits and underscores",
            name
        ));
    }
    Ok(())
}

/// Reject node identifiers that are empty or contain whitespace or term delimiters
///
/// Checks every declared node and both endpoints of every edge.
pub fn validate_node_identifiers(topology: &Topology) -> Result<(), String> {
    let edge_endpoints = topology
        .edges
        .iter()
        .flat_map(|edge| [&edge.source, &edge.target]);

    for id in topology.nodes.iter().chain(edge_endpoints) {
        if id.is_empty() {
            return Err("Node identifier cannot be empty".to_string());
        }
        if let Some(bad) = id
            .chars()
            .find(|c| c.is_whitespace() || RESERVED_NODE_CHARS.contains(c))
        {
            return Err(format!(
                "Node identifier '{}' contains reserved character {:?}",
                id, bad
            ));
        }
    }
    Ok(())
}

/// Report structural oddities of a topology
///
/// Returns one message per duplicate node declaration and per edge endpoint
/// that is not a declared node. The compiler accepts all of these, so the
/// caller decides whether to surface them.
pub fn validate_topology(topology: &Topology) -> Vec<String> {
    let mut issues = Vec::new();
    let mut declared = HashSet::new();

    for node in &topology.nodes {
        if !declared.insert(node.as_str()) {
            issues.push(format!("Duplicate node declaration: {}", node));
        }
    }

    for edge in &topology.edges {
        if !declared.contains(edge.source.as_str()) {
            issues.push(format!("Edge references undeclared source node: {}", edge.source));
        }
        if !declared.contains(edge.target.as_str()) {
            issues.push(format!("Edge references undeclared target node: {}", edge.target));
        }
    }

    issues
}

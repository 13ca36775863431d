//! Shared utilities: system-name generation and identifier/topology validation.

pub mod identifier;
pub mod validation;

pub use identifier::generate_system_name;
pub use validation::{validate_dsl_identifier, validate_node_identifiers, validate_topology};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::template::ParameterTable;
use crate::utils::validation::validate_dsl_identifier;

/// Configuration of one prepared simulation run
///
/// ```yaml
/// graph: graphs/ring.tex
/// template: models/leader.pm
/// deadline: 100.0
/// dt: 1.0
/// replicas: 10
/// seed: 42
/// parameters:
///   lambda: 0.5
/// engine:
///   install_path: /opt/engine/sshell
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RunConfig {
    /// Diagram describing the communication topology
    pub graph: PathBuf,
    /// Model template receiving the generated system definition
    pub template: PathBuf,
    /// Simulated time at which the run stops
    pub deadline: f64,
    /// Sampling step of the reported time series
    #[serde(default = "default_dt")]
    pub dt: f64,
    #[serde(default = "default_replicas")]
    pub replicas: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Explicit system name; a random one is generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_name: Option<String>,
    /// Reject node identifiers that would need escaping in generated text
    #[serde(default)]
    pub strict_identifiers: bool,
    #[serde(default, skip_serializing_if = "ParameterTable::is_empty")]
    pub parameters: ParameterTable,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Settings of the external execution engine, owned by one orchestrator
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct EngineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_path: Option<PathBuf>,
}

fn default_dt() -> f64 {
    1.0
}

fn default_replicas() -> u32 {
    1
}

impl RunConfig {
    /// Create a configuration with default step, replica count and engine
    pub fn new(graph: impl Into<PathBuf>, template: impl Into<PathBuf>, deadline: f64) -> Self {
        Self {
            graph: graph.into(),
            template: template.into(),
            deadline,
            dt: default_dt(),
            replicas: default_replicas(),
            seed: None,
            system_name: None,
            strict_identifiers: false,
            parameters: ParameterTable::new(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.graph.as_os_str().is_empty() {
            return Err(ValidationError::InvalidRun("graph path cannot be empty".to_string()));
        }
        if self.template.as_os_str().is_empty() {
            return Err(ValidationError::InvalidRun("template path cannot be empty".to_string()));
        }
        if !(self.deadline.is_finite() && self.deadline > 0.0) {
            return Err(ValidationError::InvalidRun(format!(
                "deadline must be a positive number, got {}",
                self.deadline
            )));
        }
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ValidationError::InvalidRun(format!(
                "dt must be a positive number, got {}",
                self.dt
            )));
        }
        if self.replicas == 0 {
            return Err(ValidationError::InvalidRun("replicas must be at least 1".to_string()));
        }

        if let Some(name) = &self.system_name {
            validate_dsl_identifier(name).map_err(ValidationError::InvalidSystemName)?;
        }

        if let Some((name, value)) = self.parameters.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ValidationError::InvalidRun(format!(
                "parameter '{}' must be a finite number, got {}",
                name, value
            )));
        }

        if let Some(path) = &self.engine.install_path {
            if path.as_os_str().is_empty() {
                return Err(ValidationError::InvalidEngine(
                    "install_path cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid run configuration: {0}")]
    InvalidRun(String),
    #[error("Invalid system name: {0}")]
    InvalidSystemName(String),
    #[error("Invalid engine configuration: {0}")]
    InvalidEngine(String),
}

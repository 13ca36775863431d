use crate::config::RunConfig;
use crate::template::ParameterTable;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use log::info;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Load and parse a run configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<RunConfig> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open configuration '{}'", config_path.display()))?;

    let config: RunConfig = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse configuration '{}'", config_path.display()))?;

    config.validate()?;

    Ok(config)
}

/// CLI arguments that can override YAML settings
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub graph: Option<PathBuf>,
    pub template: Option<PathBuf>,
    pub deadline: Option<f64>,
    pub dt: Option<f64>,
    pub replicas: Option<u32>,
    pub seed: Option<u64>,
    pub system_name: Option<String>,
    pub strict_identifiers: bool,
    pub parameters: Option<ParameterTable>,
    pub engine_path: Option<PathBuf>,
}

/// Apply CLI overrides to a run configuration
///
/// Override parameters are merged into the configured table, replacing
/// entries with the same name.
pub fn apply_overrides(config: &mut RunConfig, overrides: &RunOverrides) -> Result<()> {
    if let Some(graph) = &overrides.graph {
        config.graph = graph.clone();
    }
    if let Some(template) = &overrides.template {
        config.template = template.clone();
    }
    if let Some(deadline) = overrides.deadline {
        config.deadline = deadline;
    }
    if let Some(dt) = overrides.dt {
        config.dt = dt;
    }
    if let Some(replicas) = overrides.replicas {
        config.replicas = replicas;
    }
    if let Some(seed) = overrides.seed {
        config.seed = Some(seed);
    }
    if let Some(name) = &overrides.system_name {
        config.system_name = Some(name.clone());
    }
    if overrides.strict_identifiers {
        config.strict_identifiers = true;
    }
    if let Some(parameters) = &overrides.parameters {
        config
            .parameters
            .extend(parameters.iter().map(|(k, v)| (k.clone(), *v)));
    }
    if let Some(path) = &overrides.engine_path {
        config.engine.install_path = Some(path.clone());
    }

    // Re-validate after applying overrides
    config.validate()?;

    Ok(())
}

/// Build the run configuration from an optional YAML file plus CLI overrides
///
/// Without a file, the overrides must name the graph, the template and the
/// deadline.
pub fn resolve_config(config_path: Option<&Path>, overrides: &RunOverrides) -> Result<RunConfig> {
    let mut config = match config_path {
        Some(path) => load_config(path)?,
        None => {
            let graph = overrides
                .graph
                .clone()
                .ok_or_else(|| eyre!("A graph file is required when no --config is given"))?;
            let template = overrides
                .template
                .clone()
                .ok_or_else(|| eyre!("A template file is required when no --config is given"))?;
            let deadline = overrides
                .deadline
                .ok_or_else(|| eyre!("A deadline is required when no --config is given"))?;
            RunConfig::new(graph, template, deadline)
        }
    };

    apply_overrides(&mut config, overrides)?;
    Ok(config)
}

/// Parse a JSON object of parameter names to numbers, e.g. `{"lambda": 0.5}`
pub fn parse_parameter_json(json: &str) -> Result<ParameterTable> {
    serde_json::from_str(json).wrap_err("Parameters must be a JSON object of names to numbers")
}

//! Run orchestrator.
//!
//! This module coordinates one simulation run: extracting the topology,
//! synthesizing the system definition and measures, rewriting the template,
//! and handing the result to a [`SimulationEngine`].
//!
//! Each run writes the derived model file next to its template. Two runs on
//! the same template at the same time race on that file and must be
//! serialized by the caller.

use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use log::{debug, info, warn};
use rand::Rng;

use crate::config::{EngineConfig, RunConfig};
use crate::graph_parser::{self, Topology};
use crate::model::{self, Measure, SystemSpec};
use crate::results::MeasureSeries;
use crate::template;
use crate::utils::identifier::generate_system_name;
use crate::utils::validation::{validate_node_identifiers, validate_topology};

/// Everything the engine needs for one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    /// Rewritten model file
    pub model_path: PathBuf,
    /// System to initialise inside the model
    pub system_name: String,
    pub measures: Vec<String>,
    pub deadline: f64,
    pub dt: f64,
    /// Only set when more than one replica is requested
    pub replicas: Option<u32>,
    pub seed: Option<u64>,
}

/// What the engine reports back
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Seed actually used, whether supplied or chosen by the engine
    pub seed: u64,
    pub series: MeasureSeries,
}

/// Errors raised at the engine boundary
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Simulation engine unavailable: {0}")]
    Unavailable(String),
    #[error("Simulation failed: {0}")]
    Failed(String),
}

/// External population-model execution engine
pub trait SimulationEngine {
    fn simulate(&mut self, config: &EngineConfig, request: &RunRequest) -> Result<RunOutcome, EngineError>;
}

/// Engine stand-in that resolves the seed and reports empty series
///
/// Useful for preparing and inspecting a model without running it.
#[derive(Debug, Default)]
pub struct DryRunEngine;

impl SimulationEngine for DryRunEngine {
    fn simulate(&mut self, config: &EngineConfig, request: &RunRequest) -> Result<RunOutcome, EngineError> {
        if let Some(path) = &config.install_path {
            debug!("Dry run: engine at {:?} not invoked", path);
        }

        let seed = request.seed.unwrap_or_else(|| rand::thread_rng().gen());
        let series = request
            .measures
            .iter()
            .map(|measure| (measure.clone(), Vec::new()))
            .collect();

        Ok(RunOutcome { seed, series })
    }
}

/// Model compiled from a graph and a template, ready to run
#[derive(Debug, Clone)]
pub struct PreparedModel {
    pub topology: Topology,
    pub system: SystemSpec,
    pub measures: Vec<Measure>,
    pub model_path: PathBuf,
}

impl PreparedModel {
    pub fn measure_names(&self) -> Vec<String> {
        self.measures.iter().map(Measure::name).collect()
    }
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub model: PreparedModel,
    pub outcome: RunOutcome,
}

/// Drives runs against one engine with one engine configuration
pub struct Orchestrator<E: SimulationEngine> {
    engine: E,
    engine_config: EngineConfig,
}

impl<E: SimulationEngine> Orchestrator<E> {
    pub fn new(engine: E, engine_config: EngineConfig) -> Self {
        Self {
            engine,
            engine_config,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_config(&self) -> &EngineConfig {
        &self.engine_config
    }

    /// Compile the graph and template of `config` into a model file
    pub fn prepare(&self, config: &RunConfig) -> Result<PreparedModel> {
        let topology = graph_parser::parse_graph_file(&config.graph)?;
        info!(
            "Loaded topology from {:?} with {} nodes and {} edges",
            config.graph,
            topology.nodes.len(),
            topology.edges.len()
        );

        if config.strict_identifiers {
            validate_node_identifiers(&topology)
                .map_err(|e| eyre!("Invalid node identifier in {:?}: {}", config.graph, e))?;
        }
        for issue in validate_topology(&topology) {
            warn!("{}", issue);
        }
        if topology.is_empty() {
            return Err(eyre!("Graph {:?} declares no nodes or edges", config.graph));
        }

        let system_name = match &config.system_name {
            Some(name) => name.clone(),
            None => generate_system_name(),
        };
        let (system, measures) = model::synthesize(&topology, &system_name);
        debug!("Synthesized {}", system);

        let model_path = template::rewrite_template_file(&config.template, &system)?;
        if let Err(e) = self.apply_parameters(config, &model_path) {
            // A half-written model must not be picked up by a later run
            if let Err(remove_err) = fs::remove_file(&model_path) {
                warn!("Failed to remove incomplete model {:?}: {}", model_path, remove_err);
            }
            return Err(e);
        }

        info!(
            "Prepared model {:?} for system {} with {} measures",
            model_path,
            system.name(),
            measures.len()
        );

        Ok(PreparedModel {
            topology,
            system,
            measures,
            model_path,
        })
    }

    fn apply_parameters(&self, config: &RunConfig, model_path: &Path) -> Result<()> {
        template::apply_parameters_to_file(model_path, &config.parameters)?;

        if !config.parameters.is_empty() {
            let text = fs::read_to_string(model_path)
                .wrap_err_with(|| format!("Failed to read model {}", model_path.display()))?;
            for name in template::unresolved_parameters(&text, &config.parameters) {
                debug!("Parameter '{}' keeps its template default", name);
            }
        }
        Ok(())
    }

    /// Build the engine request for a prepared model
    pub fn request_for(&self, config: &RunConfig, model: &PreparedModel) -> RunRequest {
        RunRequest {
            model_path: model.model_path.clone(),
            system_name: model.system.name().to_string(),
            measures: model.measure_names(),
            deadline: config.deadline,
            dt: config.dt,
            replicas: (config.replicas > 1).then_some(config.replicas),
            seed: config.seed,
        }
    }

    /// Prepare the model and run it on the engine
    pub fn run(&mut self, config: &RunConfig) -> Result<RunReport> {
        let model = self.prepare(config)?;
        let request = self.request_for(config, &model);

        info!(
            "Running {} for deadline {} with dt {} ({} replica(s))",
            request.system_name,
            request.deadline,
            request.dt,
            config.replicas
        );
        let outcome = self
            .engine
            .simulate(&self.engine_config, &request)
            .wrap_err_with(|| format!("Simulation of {:?} failed", request.model_path))?;
        info!("Simulation finished with seed {}", outcome.seed);

        Ok(RunReport { model, outcome })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const GRAPH: &str = "\\node (a) {A};\n\\node (b) {B};\n(a) edge (b)\n";
    const TEMPLATE: &str = "param rate = 1.0;\nparam size = 10;\nsystem old = N[0];\n";

    #[derive(Default)]
    struct RecordingEngine {
        requests: Vec<RunRequest>,
    }

    impl SimulationEngine for RecordingEngine {
        fn simulate(&mut self, _config: &EngineConfig, request: &RunRequest) -> Result<RunOutcome, EngineError> {
            self.requests.push(request.clone());
            Ok(RunOutcome {
                seed: request.seed.unwrap_or(1234),
                series: MeasureSeries::new(),
            })
        }
    }

    struct FailingEngine;

    impl SimulationEngine for FailingEngine {
        fn simulate(&mut self, _config: &EngineConfig, _request: &RunRequest) -> Result<RunOutcome, EngineError> {
            Err(EngineError::Unavailable("not installed".to_string()))
        }
    }

    fn setup(graph: &str) -> (tempfile::TempDir, RunConfig) {
        let dir = tempdir().unwrap();
        let graph_path = dir.path().join("graph.tex");
        let template_path = dir.path().join("model.pm");
        fs::write(&graph_path, graph).unwrap();
        fs::write(&template_path, TEMPLATE).unwrap();

        let mut config = RunConfig::new(graph_path, template_path, 50.0);
        config.system_name = Some("election".to_string());
        (dir, config)
    }

    #[test]
    fn test_prepare_writes_model() {
        let (dir, mut config) = setup(GRAPH);
        config.parameters.insert("rate".to_string(), 4.0);
        let orchestrator = Orchestrator::new(DryRunEngine, EngineConfig::default());

        let model = orchestrator.prepare(&config).unwrap();

        assert_eq!(model.model_path, dir.path().join("model_new.pm"));
        assert_eq!(model.measures.len(), 28);
        assert_eq!(
            fs::read_to_string(&model.model_path).unwrap(),
            "param rate = 4.0;\nparam size = 10;\nsystem election = N[a] | N[b] | C[a, b];\n"
        );
    }

    #[test]
    fn test_run_passes_request_to_engine() {
        let (_dir, mut config) = setup(GRAPH);
        config.replicas = 3;
        config.seed = Some(77);
        let mut orchestrator = Orchestrator::new(RecordingEngine::default(), EngineConfig::default());

        let report = orchestrator.run(&config).unwrap();

        assert_eq!(report.outcome.seed, 77);
        let request = &orchestrator.engine().requests[0];
        assert_eq!(request.system_name, "election");
        assert_eq!(request.replicas, Some(3));
        assert_eq!(request.deadline, 50.0);
        assert_eq!(request.measures[0], "%N[a]");
        assert_eq!(request.measures.len(), 28);
    }

    #[test]
    fn test_single_replica_is_not_requested() {
        let (_dir, config) = setup(GRAPH);
        let orchestrator = Orchestrator::new(DryRunEngine, EngineConfig::default());

        let model = orchestrator.prepare(&config).unwrap();
        assert_eq!(orchestrator.request_for(&config, &model).replicas, None);
    }

    #[test]
    fn test_generated_system_name_when_absent() {
        let (_dir, mut config) = setup(GRAPH);
        config.system_name = None;
        let orchestrator = Orchestrator::new(DryRunEngine, EngineConfig::default());

        let model = orchestrator.prepare(&config).unwrap();
        assert_eq!(model.system.name().len(), 32);
    }

    #[test]
    fn test_dry_run_resolves_seed_and_series() {
        let (_dir, config) = setup(GRAPH);
        let mut orchestrator = Orchestrator::new(
            DryRunEngine,
            EngineConfig {
                install_path: Some(PathBuf::from("/opt/engine")),
            },
        );

        let report = orchestrator.run(&config).unwrap();

        // duplicate channel measures collapse into one series entry
        assert!(report.outcome.series.contains_key("%C[a,b]"));
        assert!(report.outcome.series.values().all(Vec::is_empty));
        assert_eq!(orchestrator.engine_config().install_path, Some(PathBuf::from("/opt/engine")));
    }

    #[test]
    fn test_empty_graph_is_rejected() {
        let (_dir, config) = setup("% nothing here\n");
        let orchestrator = Orchestrator::new(DryRunEngine, EngineConfig::default());

        assert!(orchestrator.prepare(&config).is_err());
    }

    #[test]
    fn test_strict_identifiers() {
        let (_dir, mut config) = setup("\\node (a b) {};\n");
        let orchestrator = Orchestrator::new(DryRunEngine, EngineConfig::default());
        assert!(orchestrator.prepare(&config).is_ok());

        config.strict_identifiers = true;
        assert!(orchestrator.prepare(&config).is_err());
    }

    #[test]
    fn test_engine_failure_is_reported() {
        let (_dir, config) = setup(GRAPH);
        let mut orchestrator = Orchestrator::new(FailingEngine, EngineConfig::default());

        let err = orchestrator.run(&config).unwrap_err();
        assert!(err.chain().any(|cause| cause.to_string().contains("not installed")));
    }
}

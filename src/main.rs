use clap::Parser;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::path::PathBuf;

use popsim::config_loader::{self, RunOverrides};
use popsim::orchestrator::{DryRunEngine, Orchestrator};
use popsim::template::ParameterTable;

/// Compile a communication graph into a population-model simulation run
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the communication graph file
    communication_graph_file: Option<PathBuf>,

    /// Path to the simulation template file
    simulation_file: Option<PathBuf>,

    /// Simulated time at which the run stops
    deadline: Option<f64>,

    /// Path to a YAML run configuration; positional arguments override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sampling step of the simulation
    #[arg(long)]
    delta: Option<f64>,

    /// Number of replicas to run
    #[arg(long)]
    replica_amount: Option<u32>,

    /// Seed of the simulation
    #[arg(long)]
    seed: Option<u64>,

    /// JSON object of parameter values, e.g. '{"lambda": 0.5}'
    #[arg(long, value_parser = parse_parameters)]
    parameters: Option<ParameterTable>,

    /// Name of the generated system; random when omitted
    #[arg(long)]
    system_name: Option<String>,

    /// Reject node identifiers that would need escaping
    #[arg(long)]
    strict_identifiers: bool,

    /// Install path of the simulation engine
    #[arg(long)]
    engine_path: Option<PathBuf>,
}

impl Args {
    fn overrides(&self) -> RunOverrides {
        RunOverrides {
            graph: self.communication_graph_file.clone(),
            template: self.simulation_file.clone(),
            deadline: self.deadline,
            dt: self.delta,
            replicas: self.replica_amount,
            seed: self.seed,
            system_name: self.system_name.clone(),
            strict_identifiers: self.strict_identifiers,
            parameters: self.parameters.clone(),
            engine_path: self.engine_path.clone(),
        }
    }
}

fn parse_parameters(json: &str) -> std::result::Result<ParameterTable, String> {
    config_loader::parse_parameter_json(json).map_err(|e| format!("{:#}", e))
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config_loader::resolve_config(args.config.as_deref(), &args.overrides())?;
    info!("Graph file: {:?}", config.graph);
    info!("Template file: {:?}", config.template);

    let mut orchestrator = Orchestrator::new(DryRunEngine, config.engine.clone());
    let report = orchestrator.run(&config)?;

    info!("Model written to {:?}", report.model.model_path);
    println!("{}", report.outcome.seed);
    Ok(())
}

//! # PopSim - Compile communication graphs into population-model runs
//!
//! This library turns a diagram of a communication topology into a runnable
//! population-model simulation: it reads the graph, generates the `system`
//! definition and the full measure list for the topology, and rewrites a
//! model template with that definition and the chosen parameter values.
//!
//! ## Architecture
//!
//! - `graph_parser`: extracts nodes and directed edges from TikZ-style diagrams
//! - `model`: synthesizes the `system` definition and enumerates measures
//! - `template`: rewrites model templates and substitutes `param` values
//! - `config`: run configuration structures and YAML parsing
//! - `config_loader`: configuration loading and CLI overrides
//! - `orchestrator`: drives one run against a simulation engine
//! - `results`: per-measure time series tables
//! - `utils`: system-name generation and validation helpers
//!
//! ## Example Usage
//!
//! ```rust
//! use popsim::graph_parser::extract;
//! use popsim::model::synthesize;
//! use popsim::template::{apply_parameters, rewrite, ParameterTable};
//!
//! let topology = extract("\\node (1) {};\n\\node (2) {};\n(1) edge (2)\n")?;
//! let (system, measures) = synthesize(&topology, "sys1");
//! assert_eq!(system.as_str(), "system sys1 = N[1] | N[2] | C[1, 2];");
//! assert_eq!(measures.len(), 28);
//!
//! let model = rewrite("/* model */\nparam rate = 1.0;\n", &system);
//! let table: ParameterTable = [("rate".to_string(), 2.0)].into_iter().collect();
//! assert_eq!(
//!     apply_parameters(&model, &table),
//!     "param rate = 2.0;\nsystem sys1 = N[1] | N[2] | C[1, 2];\n"
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Run Configuration
//!
//! ```yaml
//! graph: graphs/ring.tex
//! template: models/leader.pm
//! deadline: 100
//! dt: 1.0
//! replicas: 10
//! parameters:
//!   lambda: 0.5
//! ```
//!
//! ## Error Handling
//!
//! The compiler stages return typed errors (`GraphError`, `TemplateError`,
//! `ValidationError`); the orchestrator and the binary wrap them with
//! `color_eyre` context.

pub mod config;
pub mod config_loader;
pub mod graph_parser;
pub mod model;
pub mod orchestrator;
pub mod results;
pub mod template;
pub mod utils;

use std::fs;
use std::path::{Path, PathBuf};

/// Keyword that opens a node declaration line
const NODE_KEYWORD: &str = "\\node";

/// Token that marks a line as carrying an edge declaration
const EDGE_TOKEN: &str = ") edge ";

/// Line-comment marker of the diagram notation
const COMMENT_MARKER: char = '%';

/// Identifier of a node, embedded verbatim into generated model text
pub type NodeId = String;

/// Errors that can occur while extracting a topology
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Malformed graph at line {line_number}: {reason}: '{line}'")]
    MalformedGraph {
        line_number: usize,
        line: String,
        reason: &'static str,
    },

    #[error("Failed to read graph file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A directed communication link between two nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// Nodes and edges in the order they were declared, duplicates included
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<Edge>,
}

impl Topology {
    pub fn new(nodes: Vec<NodeId>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// True when neither nodes nor edges were declared
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// Extract the topology described by a TikZ-style diagram.
///
/// The notation is line oriented:
///
/// ```text
/// % comment
/// \begin{tikzpicture}[options]
///     \node (a) [state] {A};
///     \node (b) [state] {B};
///     \path [->]
///         (a) edge [bend left] {} (b)
///         (b) edge [bend left] {} (a);
/// \end{tikzpicture}
/// ```
///
/// A line starting with `\node` contributes the text of its first `(...)`
/// group as a node. Any other line containing `) edge ` contributes an edge
/// from its first group to its second one. Only the first pair of a chained
/// line such as `(a) edge (b) edge (c)` is recognised. Every other line is
/// skipped.
///
/// # Examples
/// ```
/// use popsim::graph_parser::{extract, Edge};
///
/// let topology = extract("\\node (a) {A};\n\\node (b) {B};\n(a) edge (b)\n").unwrap();
/// assert_eq!(topology.nodes, vec!["a", "b"]);
/// assert_eq!(topology.edges, vec![Edge::new("a", "b")]);
/// ```
pub fn extract(text: &str) -> Result<Topology, GraphError> {
    let mut topology = Topology::default();

    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with(COMMENT_MARKER) {
            continue;
        }

        if line.starts_with(NODE_KEYWORD) {
            let id = parenthesized_group(line, 0)
                .ok_or_else(|| malformed(index, line, "node declaration has no (id) group"))?;
            topology.nodes.push(id.to_string());
        } else if line.contains(EDGE_TOKEN) {
            let source = parenthesized_group(line, 0)
                .ok_or_else(|| malformed(index, line, "edge declaration has no (source) group"))?;
            let target = parenthesized_group(line, 1)
                .ok_or_else(|| malformed(index, line, "edge declaration has no (target) group"))?;
            topology.edges.push(Edge::new(source, target));
        }
    }

    Ok(topology)
}

/// Read a diagram file and extract its topology
pub fn parse_graph_file(path: &Path) -> Result<Topology, GraphError> {
    let content = fs::read_to_string(path).map_err(|source| GraphError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    extract(&content)
}

/// Text between the `n`-th `(` of the line and the next `)`
fn parenthesized_group(line: &str, n: usize) -> Option<&str> {
    let after_open = line.split('(').nth(n + 1)?;
    let close = after_open.find(')')?;
    Some(&after_open[..close])
}

fn malformed(index: usize, line: &str, reason: &'static str) -> GraphError {
    GraphError::MalformedGraph {
        line_number: index + 1,
        line: line.to_string(),
        reason,
    }
}

//! Population model synthesis.
//!
//! Turns an extracted [`Topology`] into the `system` definition handed to the
//! simulation engine, together with the full list of measures the engine
//! should report. The measure surface covers every ordered pair of nodes,
//! whether or not an edge connects them.

use std::fmt;

use crate::graph_parser::{NodeId, Topology};

/// Which statistic a measure reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    /// Fraction of the population, rendered as `%`
    Percentage,
    /// Absolute count, rendered as `#`
    Count,
}

impl Statistic {
    fn symbol(self) -> char {
        match self {
            Statistic::Percentage => '%',
            Statistic::Count => '#',
        }
    }
}

/// Population state a measure observes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasureFamily {
    /// Members in state `N` at a node
    Node,
    /// Members designated leader at a node
    Leader,
    /// Follower relations from one node to another
    Follower,
    /// Communication channel between two nodes
    Channel,
}

impl MeasureFamily {
    fn symbol(self) -> char {
        match self {
            MeasureFamily::Node => 'N',
            MeasureFamily::Leader => 'L',
            MeasureFamily::Follower => 'F',
            MeasureFamily::Channel => 'C',
        }
    }
}

/// One observable quantity, e.g. `%N[a]` or `#C[a,b]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Measure {
    pub statistic: Statistic,
    pub family: MeasureFamily,
    pub nodes: Vec<NodeId>,
}

impl Measure {
    fn unary(statistic: Statistic, family: MeasureFamily, node: &str) -> Self {
        Self {
            statistic,
            family,
            nodes: vec![node.to_string()],
        }
    }

    fn binary(statistic: Statistic, family: MeasureFamily, from: &str, to: &str) -> Self {
        Self {
            statistic,
            family,
            nodes: vec![from.to_string(), to.to_string()],
        }
    }

    /// Rendered measure name as the engine expects it
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}[{}]",
            self.statistic.symbol(),
            self.family.symbol(),
            self.nodes.join(",")
        )
    }
}

/// Generated `system <name> = ...;` definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSpec {
    name: String,
    text: String,
}

impl SystemSpec {
    /// Identifier the system was declared with
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for SystemSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Number of measures [`synthesize`] produces for `n` nodes
pub fn measure_count(n: usize) -> usize {
    // 4 per node, 4 channel measures per ordered pair, 2 follower measures per distinct pair
    4 * n + 4 * n * n + 2 * n * n.saturating_sub(1)
}

/// Build the system definition and the measure list for a topology.
///
/// `system_name` must already obey the DSL identifier grammar; see
/// [`crate::utils::validation::validate_dsl_identifier`]. An empty topology
/// yields the degenerate `system <name> = ;`.
///
/// # Examples
/// ```
/// use popsim::graph_parser::{Edge, Topology};
/// use popsim::model::synthesize;
///
/// let topology = Topology::new(vec!["A".into(), "B".into()], vec![Edge::new("A", "B")]);
/// let (system, measures) = synthesize(&topology, "sys1");
/// assert_eq!(system.as_str(), "system sys1 = N[A] | N[B] | C[A, B];");
/// assert_eq!(measures[0].name(), "%N[A]");
/// ```
pub fn synthesize(topology: &Topology, system_name: &str) -> (SystemSpec, Vec<Measure>) {
    let system = system_spec(topology, system_name);
    let measures = enumerate_measures(&topology.nodes);
    (system, measures)
}

fn system_spec(topology: &Topology, system_name: &str) -> SystemSpec {
    let node_terms = topology.nodes.iter().map(|node| format!("N[{}]", node));
    let channel_terms = topology
        .edges
        .iter()
        .map(|edge| format!("C[{}, {}]", edge.source, edge.target));
    let terms: Vec<String> = node_terms.chain(channel_terms).collect();

    SystemSpec {
        name: system_name.to_string(),
        text: format!("system {} = {};", system_name, terms.join(" | ")),
    }
}

/// Node pass in node order, then the pair pass in row-major order
fn enumerate_measures(nodes: &[NodeId]) -> Vec<Measure> {
    use MeasureFamily::*;
    use Statistic::*;

    let mut measures = Vec::with_capacity(measure_count(nodes.len()));

    for node in nodes {
        measures.push(Measure::unary(Percentage, Node, node));
        measures.push(Measure::unary(Count, Node, node));
        measures.push(Measure::unary(Percentage, Leader, node));
        measures.push(Measure::unary(Count, Leader, node));
    }

    for i in nodes {
        for j in nodes {
            if i != j {
                measures.push(Measure::binary(Percentage, Follower, i, j));
                measures.push(Measure::binary(Count, Follower, i, j));
            }
            measures.push(Measure::binary(Percentage, Channel, i, j));
            measures.push(Measure::binary(Count, Channel, i, j));
            measures.push(Measure::binary(Percentage, Channel, j, i));
            measures.push(Measure::binary(Count, Channel, j, i));
        }
    }

    measures
}

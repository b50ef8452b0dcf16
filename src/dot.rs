//! DAG to DOT (Graphviz) conversion.
//!
//! Two views are available:
//!
//! - [`Dag::to_dot`] renders a single graph.
//! - [`comparison_dot`] overlays an estimated graph on the true one: shared
//!   edges use the regular style, edges the estimate misses and edges it adds
//!   get their own styles.
//!
//! # Examples
//!
//! ```
//! use dsep_eval::dot::{comparison_dot, DotConfig};
//! use dsep_eval::graph::Dag;
//!
//! let truth = Dag::from_edges("t", ["A", "B", "C"], [("A", "B"), ("B", "C")]).unwrap();
//! let estimate = Dag::from_edges("e", ["A", "B", "C"], [("A", "B"), ("A", "C")]).unwrap();
//!
//! let dot = comparison_dot(&truth, &estimate, &DotConfig::default()).unwrap();
//! // Render with: dot -Tpng output.dot -o output.png
//! assert!(dot.contains("\"B\" -> \"C\" [style=dashed"));
//! ```

use std::fmt::{self, Write as _};

use crate::graph::Dag;

/// Configuration options for DOT output generation.
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for nodes (default: "ellipse")
    pub node_shape: &'static str,
    /// Style for edges present in both graphs (default: "solid")
    pub edge_style: &'static str,
    /// Style for true edges absent from the estimate (default: "dashed")
    pub missing_edge_style: &'static str,
    /// Style for estimated edges absent from the truth (default: "bold")
    pub extra_edge_style: &'static str,
    /// Node to highlight, usually the target (default: none)
    pub highlight: Option<String>,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "ellipse",
            edge_style: "solid",
            missing_edge_style: "dashed",
            extra_edge_style: "bold",
            highlight: None,
        }
    }
}

/// A DOT quoted identifier. Only `"` and `\` are escaped; everything else,
/// control characters included, is written as is.
struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('"')?;
        for c in self.0.chars() {
            if c == '"' || c == '\\' {
                f.write_char('\\')?;
            }
            f.write_char(c)?;
        }
        f.write_char('"')
    }
}

fn write_nodes(dot: &mut String, dag: &Dag, config: &DotConfig) -> Result<(), fmt::Error> {
    writeln!(dot, "node [shape={}];", config.node_shape)?;
    for node in dag.sorted_nodes() {
        if config.highlight.as_deref() == Some(node) {
            writeln!(dot, "{} [style=filled, fillcolor=lightgrey];", Quoted(node))?;
        } else {
            writeln!(dot, "{};", Quoted(node))?;
        }
    }
    Ok(())
}

impl Dag {
    /// Converts the DAG to DOT format.
    pub fn to_dot(&self, config: &DotConfig) -> Result<String, fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {} {{", Quoted(self.name()))?;
        write_nodes(&mut dot, self, config)?;

        let mut edges: Vec<_> = self.edges().collect();
        edges.sort_unstable();
        for (from, to) in edges {
            writeln!(dot, "{} -> {} [style={}];", Quoted(from), Quoted(to), config.edge_style)?;
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

/// Renders `estimate` on top of `truth`, marking missing and extra edges.
pub fn comparison_dot(truth: &Dag, estimate: &Dag, config: &DotConfig) -> Result<String, fmt::Error> {
    let mut dot = String::new();
    writeln!(dot, "digraph {} {{", Quoted(&format!("{} vs {}", truth.name(), estimate.name())))?;
    write_nodes(&mut dot, truth, config)?;

    let mut true_edges: Vec<_> = truth.edges().collect();
    true_edges.sort_unstable();
    for (from, to) in true_edges {
        let style = if estimate.has_edge(from, to) {
            config.edge_style
        } else {
            config.missing_edge_style
        };
        writeln!(dot, "{} -> {} [style={}];", Quoted(from), Quoted(to), style)?;
    }

    let mut extra: Vec<_> = estimate.edges().filter(|&(a, b)| !truth.has_edge(a, b)).collect();
    extra.sort_unstable();
    for (from, to) in extra {
        writeln!(dot, "{} -> {} [style={}, color=red];", Quoted(from), Quoted(to), config.extra_edge_style)?;
    }

    writeln!(dot, "}}")?;
    Ok(dot)
}

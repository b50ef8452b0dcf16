//! Named directed acyclic graphs.
//!
//! Graphs are stored on disk as JSON:
//!
//! ```text
//! {
//!   "name": "asia",
//!   "nodes": ["asia", "tub", "smoke", ...],
//!   "edges": [["asia", "tub"], ["smoke", "lung"], ...]
//! }
//! ```
//!
//! The `name` field is optional; [`Dag::load`] falls back to the file stem.
//!
//! # Examples
//!
//! ```
//! use dsep_eval::graph::Dag;
//!
//! let dag = Dag::from_edges("chain", ["A", "B", "C"], [("A", "B"), ("B", "C")]).unwrap();
//! assert_eq!(dag.node_count(), 3);
//! assert_eq!(dag.predictors("C").unwrap(), vec!["A", "B"]);
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::debug;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Serialized form of a [`Dag`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub nodes: Vec<String>,
    /// Edges as `(from, to)` pairs.
    pub edges: Vec<(String, String)>,
}

/// A directed acyclic graph over uniquely named nodes.
///
/// The graph is immutable once built: every query takes `&self`.
#[derive(Debug, Clone)]
pub struct Dag {
    name: String,
    graph: DiGraph<String, ()>,
    name_to_idx: HashMap<String, NodeIndex>,
}

impl Dag {
    /// Builds a DAG from its serialized form.
    ///
    /// Fails on duplicate node names, on edges with unknown endpoints and on cycles.
    pub fn from_spec(spec: &DagSpec) -> Result<Self> {
        let mut graph = DiGraph::with_capacity(spec.nodes.len(), spec.edges.len());
        let mut name_to_idx = HashMap::with_capacity(spec.nodes.len());

        for node in &spec.nodes {
            if name_to_idx.contains_key(node) {
                return Err(Error::DuplicateNode { node: node.clone() });
            }
            let idx = graph.add_node(node.clone());
            name_to_idx.insert(node.clone(), idx);
        }

        let lookup = |node: &String| {
            name_to_idx
                .get(node)
                .copied()
                .ok_or_else(|| Error::NodeNotFound { node: node.clone() })
        };
        for (from, to) in &spec.edges {
            let a = lookup(from)?;
            let b = lookup(to)?;
            graph.update_edge(a, b, ());
        }

        let dag = Self {
            name: spec.name.clone().unwrap_or_default(),
            graph,
            name_to_idx,
        };
        if is_cyclic_directed(&dag.graph) {
            return Err(Error::CycleDetected { cycle: dag.find_cycle() });
        }
        Ok(dag)
    }

    /// Convenience constructor from node and edge name lists.
    pub fn from_edges<'a>(
        name: &str,
        nodes: impl IntoIterator<Item = &'a str>,
        edges: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self> {
        let spec = DagSpec {
            name: Some(name.to_string()),
            nodes: nodes.into_iter().map(String::from).collect(),
            edges: edges.into_iter().map(|(a, b)| (a.to_string(), b.to_string())).collect(),
        };
        Self::from_spec(&spec)
    }

    /// Loads a DAG from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let mut spec: DagSpec = serde_json::from_str(&content).map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if spec.name.is_none() {
            spec.name = path.file_stem().map(|s| s.to_string_lossy().into_owned());
        }
        let dag = Self::from_spec(&spec)?;
        debug!(
            "loaded graph {} from {} ({} nodes, {} edges)",
            dag.name,
            path.display(),
            dag.node_count(),
            dag.edge_count()
        );
        Ok(dag)
    }

    /// Writes the DAG to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.to_spec()).map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn to_spec(&self) -> DagSpec {
        DagSpec {
            name: Some(self.name.clone()),
            nodes: self.graph.node_weights().cloned().collect(),
            edges: self.edges().map(|(a, b)| (a.to_string(), b.to_string())).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, node: &str) -> bool {
        self.name_to_idx.contains_key(node)
    }

    /// Resolves a node name to its index.
    pub fn index_of(&self, node: &str) -> Result<NodeIndex> {
        self.name_to_idx
            .get(node)
            .copied()
            .ok_or_else(|| Error::NodeNotFound { node: node.to_string() })
    }

    pub fn name_of(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.name_to_idx.get(from), self.name_to_idx.get(to)) {
            (Some(&a), Some(&b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    /// Iterates over edges as `(from, to)` name pairs.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.graph
            .raw_edges()
            .iter()
            .map(|e| (self.graph[e.source()].as_str(), self.graph[e.target()].as_str()))
    }

    pub fn parents(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, Direction::Incoming)
    }

    pub fn children(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.neighbors_directed(idx, Direction::Outgoing)
    }

    /// All node names in lexicographic order.
    pub fn sorted_nodes(&self) -> Vec<&str> {
        let mut nodes: Vec<&str> = self.graph.node_weights().map(String::as_str).collect();
        nodes.sort_unstable();
        nodes
    }

    /// All nodes except `target`, sorted.
    ///
    /// Sorting keeps sampled indices meaningful across graphs that share a node
    /// set but were built in different insertion orders.
    pub fn predictors(&self, target: &str) -> Result<Vec<&str>> {
        self.index_of(target)?;
        Ok(self.sorted_nodes().into_iter().filter(|&node| node != target).collect())
    }

    /// Returns a cycle as a list of node names, first node repeated at the end.
    fn find_cycle(&self) -> Vec<String> {
        // 0 = unvisited, 1 = on stack, 2 = done
        let mut state = vec![0u8; self.graph.node_count()];
        let mut path: Vec<NodeIndex> = Vec::new();

        for start in self.graph.node_indices() {
            if state[start.index()] != 0 {
                continue;
            }
            let mut stack: Vec<(NodeIndex, Vec<NodeIndex>)> = vec![(start, self.children(start).collect())];
            state[start.index()] = 1;
            path.push(start);

            while let Some((node, pending)) = stack.last_mut() {
                match pending.pop() {
                    Some(next) if state[next.index()] == 1 => {
                        let pos = path.iter().position(|&n| n == next).unwrap_or(0);
                        let mut cycle: Vec<String> = path[pos..].iter().map(|&n| self.graph[n].clone()).collect();
                        cycle.push(self.graph[next].clone());
                        return cycle;
                    }
                    Some(next) if state[next.index()] == 0 => {
                        state[next.index()] = 1;
                        path.push(next);
                        let children = self.children(next).collect();
                        stack.push((next, children));
                    }
                    Some(_) => {}
                    None => {
                        state[node.index()] = 2;
                        path.pop();
                        stack.pop();
                    }
                }
            }
        }
        Vec::new()
    }
}

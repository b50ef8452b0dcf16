//! Exact d-separation.
//!
//! Two node sets `X` and `Y` are d-separated by `Z` in a DAG iff they are
//! disconnected in the following undirected graph:
//!
//! 1. keep only the ancestral closure of `X ∪ Y ∪ Z`,
//! 2. delete every edge leaving a node of `Z`,
//! 3. forget edge directions.
//!
//! Pruning non-ancestors removes colliders that nothing conditions on, and
//! cutting the out-edges of `Z` blocks chains and forks through conditioned
//! nodes while colliders at (or above) `Z` stay open.

use std::collections::VecDeque;

use log::{debug, trace};
use petgraph::graph::NodeIndex;

use crate::error::{Error, Result};
use crate::graph::Dag;
use crate::nodeset::NodeSet;
use crate::sampler::Trial;

/// Separation verdicts for one trial: `true` means "d-separated".
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VerdictPair {
    pub truth: bool,
    pub estimate: bool,
}

impl Dag {
    /// Tests whether `xs` and `ys` are d-separated given `zs`.
    ///
    /// All names must be nodes of the graph, and the three sets must be pairwise disjoint.
    ///
    /// # Examples
    ///
    /// ```
    /// use dsep_eval::graph::Dag;
    ///
    /// // Collider: A -> C <- B
    /// let dag = Dag::from_edges("v", ["A", "B", "C"], [("A", "C"), ("B", "C")]).unwrap();
    /// assert!(dag.d_separated(&["A"], &["B"], &[] as &[&str]).unwrap());
    /// assert!(!dag.d_separated(&["A"], &["B"], &["C"]).unwrap());
    /// ```
    pub fn d_separated<S: AsRef<str>>(&self, xs: &[S], ys: &[S], zs: &[S]) -> Result<bool> {
        let resolve = |names: &[S]| -> Result<Vec<NodeIndex>> { names.iter().map(|n| self.index_of(n.as_ref())).collect() };
        let xs = resolve(xs)?;
        let ys = resolve(ys)?;
        let zs = resolve(zs)?;

        let mut conditioned = NodeSet::new(self.node_count());
        conditioned.extend(zs.iter().copied());
        let mut sources = NodeSet::new(self.node_count());
        sources.extend(xs.iter().copied());
        let mut targets = NodeSet::new(self.node_count());
        targets.extend(ys.iter().copied());
        for &y in &ys {
            if sources.contains(y) || conditioned.contains(y) {
                return Err(Error::OverlappingSets { node: self.name_of(y).to_string() });
            }
        }
        for &x in &xs {
            if conditioned.contains(x) {
                return Err(Error::OverlappingSets { node: self.name_of(x).to_string() });
            }
        }
        if sources.is_empty() || targets.is_empty() {
            return Ok(true);
        }

        let ancestral = self.ancestral_closure(xs.iter().chain(&ys).chain(&zs).copied());
        trace!("ancestral closure: {} of {} nodes", ancestral.len(), self.node_count());

        let mut visited = sources.clone();
        let mut queue: VecDeque<NodeIndex> = sources.iter().collect();

        while let Some(node) = queue.pop_front() {
            if targets.contains(node) {
                return Ok(false);
            }
            // Edges out of a conditioned node are cut; edges into it remain.
            let down = if conditioned.contains(node) { None } else { Some(self.children(node)) };
            let neighbors = self.parents(node).filter(|&p| !conditioned.contains(p));
            let neighbors = neighbors.chain(down.into_iter().flatten());
            for next in neighbors {
                if ancestral.contains(next) && visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        Ok(true)
    }

    /// Returns the given nodes together with all their ancestors.
    pub fn ancestral_closure(&self, nodes: impl IntoIterator<Item = NodeIndex>) -> NodeSet {
        let mut closure = NodeSet::new(self.node_count());
        let mut stack: Vec<NodeIndex> = nodes.into_iter().filter(|&n| closure.insert(n)).collect();
        while let Some(node) = stack.pop() {
            for parent in self.parents(node) {
                if closure.insert(parent) {
                    stack.push(parent);
                }
            }
        }
        closure
    }
}

/// Tests whether `predictor` and `target` are d-separated by `conditioning_set` in `graph`.
pub fn test_separation<S: AsRef<str>>(graph: &Dag, predictor: &str, target: &str, conditioning_set: &[S]) -> Result<bool> {
    let zs: Vec<&str> = conditioning_set.iter().map(AsRef::as_ref).collect();
    graph.d_separated(&[predictor], &[target], zs.as_slice())
}

/// Runs the same separation query against the true and the estimated graph.
#[derive(Debug, Copy, Clone)]
pub struct SeparationOracle<'a> {
    true_graph: &'a Dag,
    est_graph: &'a Dag,
}

impl<'a> SeparationOracle<'a> {
    pub fn new(true_graph: &'a Dag, est_graph: &'a Dag) -> Self {
        Self { true_graph, est_graph }
    }

    /// Evaluates one trial. Any lookup failure aborts the run.
    pub fn query(&self, target: &str, trial: &Trial) -> Result<VerdictPair> {
        let zs: Vec<&str> = trial.conditioning_set.iter().map(String::as_str).collect();
        let truth = test_separation(self.true_graph, &trial.predictor, target, zs.as_slice())?;
        let estimate = test_separation(self.est_graph, &trial.predictor, target, zs.as_slice())?;
        debug!(
            "{} _|_ {} | {:?}: true={}, est={}",
            trial.predictor, target, trial.conditioning_set, truth, estimate
        );
        Ok(VerdictPair { truth, estimate })
    }
}

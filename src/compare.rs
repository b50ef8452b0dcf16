//! Comparison runs between a true and an estimated graph.
//!
//! # Example
//!
//! ```
//! use dsep_eval::compare::{ComparisonConfig, GraphComparison};
//! use dsep_eval::graph::Dag;
//!
//! let truth = Dag::from_edges("chain", ["A", "B", "C", "D"], [("A", "B"), ("B", "C"), ("C", "D")]).unwrap();
//! let estimate = truth.clone();
//!
//! let config = ComparisonConfig::new(50).with_seed(42);
//! let comparison = GraphComparison::new(&truth, &estimate, "D", config).unwrap();
//! let metrics = comparison.run().unwrap();
//!
//! assert_eq!(metrics.total(), 50);
//! assert_eq!(metrics.counts.fp + metrics.counts.fn_, 0);
//! ```

use std::path::Path;

use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::confusion::{ConfusionAggregator, ConfusionMatrix, Metrics, Outcome};
use crate::error::{Error, Result};
use crate::graph::Dag;
use crate::sampler::{search_space_size, ConditioningSetSampler, Trial};
use crate::separation::SeparationOracle;
use crate::table::{EvaluationRecord, EvaluationTable};

/// Subsets of deconfounders are enumerated as bits of a `u64`.
const MAX_EXACT_DECONFOUNDERS: usize = u64::BITS as usize - 1;

/// How a comparison evaluates statements.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum RunMode {
    /// Monte-Carlo sampling of `trial_budget` statements.
    #[default]
    Sampled,
    /// Every statement exactly once.
    Exact,
}

/// Configuration of a comparison run.
#[derive(Debug, Clone)]
pub struct ComparisonConfig {
    /// Number of Monte-Carlo trials
    pub trial_budget: u64,
    /// Random seed (None for entropy)
    pub seed: Option<u64>,
    /// Structure-learning method that produced the estimate
    pub method: String,
    /// Graph label for the evaluation table (None for the true graph's name)
    pub graph_name: Option<String>,
    /// Largest deconfounder count for which exact enumeration is allowed
    pub exact_limit: usize,
}

impl ComparisonConfig {
    pub fn new(trial_budget: u64) -> Self {
        Self {
            trial_budget,
            seed: Some(42),
            method: "hc".to_string(),
            graph_name: None,
            exact_limit: 20,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_entropy(mut self) -> Self {
        self.seed = None;
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_graph_name(mut self, name: impl Into<String>) -> Self {
        self.graph_name = Some(name.into());
        self
    }

    pub fn with_exact_limit(mut self, limit: usize) -> Self {
        self.exact_limit = limit;
        self
    }
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self::new(1000)
    }
}

/// A validated pair of graphs and a target node.
#[derive(Debug)]
pub struct GraphComparison<'a> {
    true_graph: &'a Dag,
    est_graph: &'a Dag,
    target: String,
    config: ComparisonConfig,
}

impl<'a> GraphComparison<'a> {
    /// Checks that both graphs contain the target and that every node of the
    /// true graph exists in the estimated graph.
    pub fn new(true_graph: &'a Dag, est_graph: &'a Dag, target: &str, config: ComparisonConfig) -> Result<Self> {
        true_graph.index_of(target)?;
        est_graph.index_of(target)?;
        if let Some(node) = true_graph.sorted_nodes().into_iter().find(|n| !est_graph.contains(n)) {
            return Err(Error::NodeSetMismatch { node: node.to_string() });
        }
        if true_graph.node_count() < 2 {
            return Err(Error::NoPredictors { target: target.to_string() });
        }
        Ok(Self {
            true_graph,
            est_graph,
            target: target.to_string(),
            config,
        })
    }

    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Runs the Monte-Carlo comparison with a generator seeded from the config.
    pub fn run(&self) -> Result<Metrics> {
        let seed = match self.config.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::random();
                info!("Random seed: {} (auto-generated)", seed);
                seed
            }
        };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        self.approx(&mut rng)
    }

    /// Runs exactly `trial_budget` trials, consuming `rng` in a fixed order.
    pub fn approx<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Metrics> {
        let sampler = ConditioningSetSampler::new(self.true_graph, &self.target)?;
        let oracle = SeparationOracle::new(self.true_graph, self.est_graph);
        let n = sampler.cardinality().support();

        info!(
            "Comparing {} against {} for target {}: {} trials over {} statements",
            self.est_graph.name(),
            self.true_graph.name(),
            self.target,
            self.config.trial_budget,
            search_space_size(n)
        );

        let mut aggregator = ConfusionAggregator::new();
        for k in 0..self.config.trial_budget {
            let trial = sampler.sample_trial(rng)?;
            let verdict = oracle.query(&self.target, &trial)?;
            let outcome = aggregator.classify_and_accumulate(verdict);
            debug!("trial {}: {:?}", k, outcome);
        }
        Ok(aggregator.finalize())
    }

    /// Evaluates every statement `predictor _|_ target | Z` exactly once.
    ///
    /// Refused when a predictor has more than `exact_limit` deconfounders, or
    /// more than fit in a 64-bit subset mask.
    pub fn exact(&self) -> Result<Metrics> {
        let predictors = self.true_graph.predictors(&self.target)?;
        let n = predictors.len();
        if n == 0 {
            return Err(Error::NoPredictors { target: self.target.clone() });
        }
        let limit = self.config.exact_limit.min(MAX_EXACT_DECONFOUNDERS);
        if n - 1 > limit {
            return Err(Error::SearchSpaceTooLarge { predictors: n - 1, limit });
        }

        info!(
            "Enumerating all {} statements for target {}",
            search_space_size(n),
            self.target
        );

        let oracle = SeparationOracle::new(self.true_graph, self.est_graph);
        let mut counts = ConfusionMatrix::default();
        for &predictor in &predictors {
            let deconfounders: Vec<&str> = predictors.iter().copied().filter(|&p| p != predictor).collect();
            let mut partial = ConfusionMatrix::default();
            for mask in 0u64..(1u64 << deconfounders.len()) {
                let conditioning_set = deconfounders
                    .iter()
                    .enumerate()
                    .filter(|&(i, _)| mask & (1 << i) != 0)
                    .map(|(_, z)| z.to_string())
                    .collect();
                let trial = Trial {
                    predictor: predictor.to_string(),
                    conditioning_set,
                };
                partial.record(Outcome::from(oracle.query(&self.target, &trial)?));
            }
            debug!("predictor {}: {}", predictor, partial);
            counts.merge(&partial);
        }

        let metrics = Metrics::from_counts(counts);
        info!("{} (F1 = {:.4})", metrics.counts, metrics.f1);
        Ok(metrics)
    }

    /// Runs the comparison in the given mode.
    pub fn run_with(&self, mode: RunMode) -> Result<Metrics> {
        match mode {
            RunMode::Sampled => self.run(),
            RunMode::Exact => self.exact(),
        }
    }

    /// Runs the comparison and appends its row to the evaluation table at `path`.
    ///
    /// The table file is created with just its header if it does not exist.
    /// The row is written only once the run has finished with at least one
    /// trial, so a failed run leaves the file as it was.
    pub fn run_into_table(&self, mode: RunMode, path: impl AsRef<Path>) -> Result<(Metrics, EvaluationTable)> {
        let mut table = EvaluationTable::load_or_create(path)?;
        let metrics = self.run_with(mode)?;
        if metrics.total() == 0 {
            return Err(Error::EmptyRun { target: self.target.clone() });
        }
        table.append(self.record(&metrics));
        table.save()?;
        Ok((metrics, table))
    }

    /// Builds the evaluation-table row for finished metrics.
    pub fn record(&self, metrics: &Metrics) -> EvaluationRecord {
        let graph = match &self.config.graph_name {
            Some(name) => name.clone(),
            None => self.true_graph.name().to_string(),
        };
        EvaluationRecord::new(
            graph,
            self.target.clone(),
            self.true_graph.node_count(),
            self.config.method.clone(),
            metrics,
        )
    }
}

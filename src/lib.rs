//! # dsep-eval: scoring estimated DAGs by their d-separations
//!
//! **`dsep-eval`** measures how well a DAG learned from data reproduces the
//! conditional-independence structure of a known reference DAG.
//!
//! ## Motivation
//!
//! For a target node and `n` predictors there are `n · 2^(n-1)` statements of
//! the form `X _|_ target | Z`. Already for medium-sized benchmark networks
//! (Alarm: 37 nodes, Hepar II: 70 nodes) enumerating them is infeasible, so
//! statements are sampled instead:
//!
//! ```text
//! ┌──────────────────┐    ┌──────────────────┐    ┌────────────────────┐
//! │  Conditioning-   │───▶│   Separation     │───▶│    Confusion       │
//! │  set sampler     │    │   oracle         │    │    aggregator      │
//! │  (X, Z)          │    │  (true?, est?)   │    │  TP / TN / FP / FN │
//! └──────────────────┘    └──────────────────┘    └─────────┬──────────┘
//!                                                           │
//!                                                           ▼
//!                                                 ┌────────────────────┐
//!                                                 │  Evaluation table  │
//!                                                 └────────────────────┘
//! ```
//!
//! "Separated in the true graph" is the positive class, so precision and
//! recall describe how well the estimate recovers true independences.
//!
//! ## Basic Usage
//!
//! ```rust
//! use dsep_eval::compare::{ComparisonConfig, GraphComparison};
//! use dsep_eval::graph::Dag;
//!
//! // True graph has A -> D, the estimate misses it.
//! let truth = Dag::from_edges("truth", ["A", "B", "D"], [("A", "D"), ("B", "D")]).unwrap();
//! let estimate = Dag::from_edges("estimate", ["A", "B", "D"], [("B", "D")]).unwrap();
//!
//! let comparison = GraphComparison::new(&truth, &estimate, "D", ComparisonConfig::new(200)).unwrap();
//! let metrics = comparison.run().unwrap();
//!
//! assert_eq!(metrics.total(), 200);
//! // The estimate never claims a dependence the truth lacks...
//! assert_eq!(metrics.counts.fn_, 0);
//! // ...but wrongly separates A from D.
//! assert!(metrics.counts.fp > 0);
//! ```
//!
//! ## Modules
//!
//! - [`graph`]: named DAGs and their JSON files.
//! - [`separation`]: exact d-separation and the paired oracle.
//! - [`sampler`]: Monte-Carlo sampling of statements.
//! - [`confusion`]: outcome classification and derived metrics.
//! - [`compare`]: comparison runs (sampled and exhaustive).
//! - [`table`]: the evaluation table shared across runs.
//! - [`dot`]: Graphviz export.

pub mod compare;
pub mod confusion;
pub mod dot;
pub mod error;
pub mod graph;
pub mod nodeset;
pub mod sampler;
pub mod separation;
pub mod table;

pub use compare::{ComparisonConfig, GraphComparison, RunMode};
pub use confusion::{ConfusionMatrix, Metrics, Outcome};
pub use error::{Error, Result};
pub use graph::Dag;
pub use table::{EvaluationRecord, EvaluationTable};

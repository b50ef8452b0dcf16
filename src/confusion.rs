//! Confusion counting of paired separation verdicts.
//!
//! "Separated in the true graph" is the positive class:
//!
//! | true graph | estimated graph | outcome |
//! |------------|-----------------|---------|
//! | separated  | separated       | TP      |
//! | connected  | connected       | TN      |
//! | connected  | separated       | FP      |
//! | separated  | connected       | FN      |

use std::fmt;

use log::info;

use crate::separation::VerdictPair;

/// Classification of a single trial.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Outcome {
    TruePositive,
    TrueNegative,
    FalsePositive,
    FalseNegative,
}

impl Outcome {
    /// Classifies one trial from its own pair of verdicts.
    pub fn classify(truth: bool, estimate: bool) -> Self {
        match (truth, estimate) {
            (true, true) => Outcome::TruePositive,
            (false, false) => Outcome::TrueNegative,
            (false, true) => Outcome::FalsePositive,
            (true, false) => Outcome::FalseNegative,
        }
    }
}

impl From<VerdictPair> for Outcome {
    fn from(v: VerdictPair) -> Self {
        Outcome::classify(v.truth, v.estimate)
    }
}

/// TP/TN/FP/FN counters.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ConfusionMatrix {
    pub tp: u64,
    pub tn: u64,
    pub fp: u64,
    pub fn_: u64,
}

impl ConfusionMatrix {
    pub fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::TruePositive => self.tp += 1,
            Outcome::TrueNegative => self.tn += 1,
            Outcome::FalsePositive => self.fp += 1,
            Outcome::FalseNegative => self.fn_ += 1,
        }
    }

    /// Adds another matrix's counts to this one.
    pub fn merge(&mut self, other: &ConfusionMatrix) {
        self.tp += other.tp;
        self.tn += other.tn;
        self.fp += other.fp;
        self.fn_ += other.fn_;
    }

    pub fn total(&self) -> u64 {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// Trials where the true graph says "separated".
    pub fn separated_total(&self) -> u64 {
        self.tp + self.fn_
    }

    /// Trials where the true graph says "connected".
    pub fn connected_total(&self) -> u64 {
        self.tn + self.fp
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TP={} TN={} FP={} FN={}", self.tp, self.tn, self.fp, self.fn_)
    }
}

/// `num / den`, or NaN when the denominator is zero.
fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        f64::NAN
    } else {
        num / den
    }
}

/// Metrics derived from a finished run.
///
/// Any metric whose denominator is zero is `NaN`.
#[derive(Debug, Copy, Clone)]
pub struct Metrics {
    pub counts: ConfusionMatrix,
    pub separated_total: u64,
    pub connected_total: u64,
    /// Share of trials separated in the true graph.
    pub dsep_share: f64,
    pub tp_rate: f64,
    pub tn_rate: f64,
    pub fp_rate: f64,
    pub fn_rate: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl Metrics {
    pub fn from_counts(counts: ConfusionMatrix) -> Self {
        let tp = counts.tp as f64;
        let tn = counts.tn as f64;
        let fp = counts.fp as f64;
        let fn_ = counts.fn_ as f64;
        let separated = counts.separated_total() as f64;
        let connected = counts.connected_total() as f64;

        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = ratio(2.0 * precision * recall, precision + recall);

        Self {
            counts,
            separated_total: counts.separated_total(),
            connected_total: counts.connected_total(),
            dsep_share: ratio(separated, counts.total() as f64),
            tp_rate: ratio(tp, separated),
            tn_rate: ratio(tn, connected),
            fp_rate: ratio(fp, connected),
            fn_rate: ratio(fn_, separated),
            precision,
            recall,
            f1,
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.total()
    }
}

/// Accumulates trial outcomes for one run.
///
/// [`finalize`][ConfusionAggregator::finalize] consumes the aggregator, so a
/// finished run cannot be fed further trials.
#[derive(Debug, Default)]
pub struct ConfusionAggregator {
    counts: ConfusionMatrix,
}

impl ConfusionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classify_and_accumulate(&mut self, verdict: VerdictPair) -> Outcome {
        let outcome = Outcome::from(verdict);
        self.counts.record(outcome);
        outcome
    }

    pub fn counts(&self) -> &ConfusionMatrix {
        &self.counts
    }

    pub fn finalize(self) -> Metrics {
        let metrics = Metrics::from_counts(self.counts);
        info!(
            "{} over {} trials: precision={:.4} recall={:.4} F1={:.4}",
            metrics.counts,
            metrics.total(),
            metrics.precision,
            metrics.recall,
            metrics.f1
        );
        metrics
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn verdict(truth: bool, estimate: bool) -> VerdictPair {
        VerdictPair { truth, estimate }
    }

    #[test]
    fn test_classify() {
        assert_eq!(Outcome::classify(true, true), Outcome::TruePositive);
        assert_eq!(Outcome::classify(false, false), Outcome::TrueNegative);
        assert_eq!(Outcome::classify(false, true), Outcome::FalsePositive);
        assert_eq!(Outcome::classify(true, false), Outcome::FalseNegative);
    }

    #[test]
    fn test_classification_uses_each_trials_own_verdict() {
        // Regression guard: agreeing trials must split into TP and TN by their
        // own verdict, not collapse into one bucket, and disagreeing trials
        // must split into FN and FP the same way.
        let mut agg = ConfusionAggregator::new();
        for v in [verdict(true, true), verdict(false, false), verdict(true, false), verdict(false, true)] {
            agg.classify_and_accumulate(v);
        }
        assert_eq!(
            *agg.counts(),
            ConfusionMatrix {
                tp: 1,
                tn: 1,
                fp: 1,
                fn_: 1
            }
        );
    }

    #[test]
    fn test_counts_sum_to_trials() {
        let mut agg = ConfusionAggregator::new();
        let pattern = [(true, true), (true, true), (false, false), (true, false), (false, true), (false, false)];
        for &(t, e) in pattern.iter().cycle().take(60) {
            agg.classify_and_accumulate(verdict(t, e));
        }
        let metrics = agg.finalize();
        assert_eq!(metrics.total(), 60);
        assert_eq!(metrics.counts.tp, 20);
        assert_eq!(metrics.counts.tn, 20);
        assert_eq!(metrics.counts.fp, 10);
        assert_eq!(metrics.counts.fn_, 10);
        assert_eq!(metrics.separated_total, 30);
        assert_eq!(metrics.connected_total, 30);
    }

    #[test]
    fn test_metrics() {
        let counts = ConfusionMatrix {
            tp: 6,
            tn: 8,
            fp: 2,
            fn_: 4,
        };
        let m = Metrics::from_counts(counts);
        assert_eq!(m.separated_total, 10);
        assert_eq!(m.connected_total, 10);
        assert!((m.dsep_share - 0.5).abs() < 1e-12);
        assert!((m.tp_rate - 0.6).abs() < 1e-12);
        assert!((m.fn_rate - 0.4).abs() < 1e-12);
        assert!((m.tn_rate - 0.8).abs() < 1e-12);
        assert!((m.fp_rate - 0.2).abs() < 1e-12);
        assert!((m.precision - 0.75).abs() < 1e-12);
        assert!((m.recall - 0.6).abs() < 1e-12);
        assert!((m.f1 - 2.0 * 0.75 * 0.6 / 1.35).abs() < 1e-12);
    }

    #[test]
    fn test_zero_denominators_are_nan() {
        let m = Metrics::from_counts(ConfusionMatrix {
            tp: 0,
            tn: 5,
            fp: 0,
            fn_: 0,
        });
        assert!(m.precision.is_nan());
        assert!(m.recall.is_nan());
        assert!(m.f1.is_nan());
        assert!(m.tp_rate.is_nan());
        assert!(m.fn_rate.is_nan());
        assert_eq!(m.tn_rate, 1.0);
        assert_eq!(m.fp_rate, 0.0);
        assert_eq!(m.dsep_share, 0.0);

        let empty = Metrics::from_counts(ConfusionMatrix::default());
        assert!(empty.dsep_share.is_nan());
    }

    #[test]
    fn test_f1_nan_when_no_true_positives() {
        let m = Metrics::from_counts(ConfusionMatrix {
            tp: 0,
            tn: 0,
            fp: 3,
            fn_: 2,
        });
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert!(m.f1.is_nan());
    }

    #[test]
    fn test_merge() {
        let mut a = ConfusionMatrix {
            tp: 1,
            tn: 2,
            fp: 3,
            fn_: 4,
        };
        let b = a;
        a.merge(&b);
        assert_eq!(a.total(), 20);
        assert_eq!(a.to_string(), "TP=2 TN=4 FP=6 FN=8");
    }
}

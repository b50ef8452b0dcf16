//! Monte-Carlo sampling of conditional-independence statements.
//!
//! A statement `predictor _|_ target | Z` is drawn in three steps:
//!
//! 1. a predictor, uniformly among the `n` non-target nodes,
//! 2. a cardinality `c ∈ 0..n`, from [`CardinalityDistribution`],
//! 3. `c` distinct deconfounders (the other `n - 1` predictors), uniformly without replacement.
//!
//! With `P(c = i) = C(n-1, i) / 2^(n-1)` every subset of the deconfounders is
//! equally likely, which is what exhaustive enumeration would weigh them by.

use std::collections::BTreeSet;

use log::debug;
use num_bigint::BigUint;
use num_traits::{One, ToPrimitive};
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;

use crate::error::{Error, Result};
use crate::graph::Dag;

/// One sampled statement. Ephemeral: it is evaluated and folded into counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trial {
    pub predictor: String,
    pub conditioning_set: BTreeSet<String>,
}

/// Binomial coefficient `C(n, k)`, exact.
pub fn binomial(n: u64, k: u64) -> BigUint {
    if k > n {
        return BigUint::ZERO;
    }
    let k = k.min(n - k);
    let mut acc = BigUint::one();
    for i in 0..k {
        // Exact at every step: the running product is C(n, i + 1).
        acc = acc * (n - i) / (i + 1);
    }
    acc
}

/// Number of distinct statements `predictor _|_ target | Z` over `n` predictors: `n * 2^(n-1)`.
pub fn search_space_size(n: usize) -> BigUint {
    if n == 0 {
        return BigUint::ZERO;
    }
    BigUint::from(n) << (n - 1)
}

/// Ratio of two big integers as `f64`, without overflowing for huge operands.
fn ratio(num: &BigUint, den: &BigUint) -> f64 {
    // f64 covers up to ~2^1023; shift both down so the denominator fits.
    let shift = den.bits().saturating_sub(1000);
    let num = (num >> shift).to_f64().unwrap_or(f64::INFINITY);
    let den = (den >> shift).to_f64().unwrap_or(f64::INFINITY);
    num / den
}

/// Distribution of conditioning-set sizes over `0..n` for `n` predictors.
#[derive(Debug, Clone)]
pub struct CardinalityDistribution {
    probabilities: Vec<f64>,
    index: WeightedIndex<f64>,
}

impl CardinalityDistribution {
    /// Builds the distribution `P(i) = C(n-1, i) / 2^(n-1)` for `i ∈ 0..n`.
    ///
    /// # Panics
    ///
    /// Panics if `n == 0`.
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "Cardinality distribution needs at least one predictor");

        let m = (n - 1) as u64;
        let total = BigUint::one() << m;
        let weights: Vec<f64> = (0..=m).map(|i| ratio(&binomial(m, i), &total)).collect();
        let sum: f64 = weights.iter().sum();
        let probabilities: Vec<f64> = weights.iter().map(|w| w / sum).collect();

        let index = WeightedIndex::new(&probabilities).expect("binomial weights are positive and finite");

        Self { probabilities, index }
    }

    /// Probability of each conditioning-set size, indexed by size.
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// Number of possible sizes (`n`).
    pub fn support(&self) -> usize {
        self.probabilities.len()
    }

    /// Draws a conditioning-set size.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.index.sample(rng)
    }
}

/// Draws one trial for `target` in `graph`.
///
/// The predictor list is rebuilt from the graph on every call, so nothing a
/// previous trial did can leak into the candidate pool.
pub fn sample_trial<R: Rng + ?Sized>(
    graph: &Dag,
    target: &str,
    cardinality: &CardinalityDistribution,
    rng: &mut R,
) -> Result<Trial> {
    let predictors = graph.predictors(target)?;
    let n = predictors.len();
    if n == 0 {
        return Err(Error::NoPredictors { target: target.to_string() });
    }
    if n != cardinality.support() {
        return Err(Error::CardinalityMismatch {
            expected: cardinality.support(),
            found: n,
        });
    }

    let ind = rng.random_range(0..n);
    let predictor = predictors[ind];

    let deconfounders: Vec<&str> = predictors.iter().copied().filter(|&p| p != predictor).collect();

    let card = cardinality.sample(rng);
    let conditioning_set: BTreeSet<String> = if card == 0 {
        BTreeSet::new()
    } else {
        rand::seq::index::sample(rng, deconfounders.len(), card)
            .into_iter()
            .map(|i| deconfounders[i].to_string())
            .collect()
    };

    debug!("sampled predictor {} with |Z| = {}", predictor, card);
    Ok(Trial {
        predictor: predictor.to_string(),
        conditioning_set,
    })
}

/// Sampler bound to a fixed graph and target.
#[derive(Debug, Clone)]
pub struct ConditioningSetSampler<'a> {
    graph: &'a Dag,
    target: String,
    cardinality: CardinalityDistribution,
}

impl<'a> ConditioningSetSampler<'a> {
    pub fn new(graph: &'a Dag, target: &str) -> Result<Self> {
        let n = graph.predictors(target)?.len();
        if n == 0 {
            return Err(Error::NoPredictors { target: target.to_string() });
        }
        Ok(Self {
            graph,
            target: target.to_string(),
            cardinality: CardinalityDistribution::new(n),
        })
    }

    pub fn cardinality(&self) -> &CardinalityDistribution {
        &self.cardinality
    }

    pub fn sample_trial<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Trial> {
        sample_trial(self.graph, &self.target, &self.cardinality, rng)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use test_log::test;

    use super::*;

    fn star(n: usize) -> Dag {
        let names: Vec<String> = (0..n).map(|i| format!("x{:02}", i)).collect();
        let nodes = names.iter().map(String::as_str).chain(["y"]);
        let edges: Vec<(&str, &str)> = names.iter().map(|x| (x.as_str(), "y")).collect();
        Dag::from_edges("star", nodes, edges).unwrap()
    }

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(0, 0), BigUint::from(1u32));
        assert_eq!(binomial(5, 2), BigUint::from(10u32));
        assert_eq!(binomial(5, 6), BigUint::ZERO);
        assert_eq!(binomial(10, 10), BigUint::from(1u32));
        // Larger than u64: C(68, 34) = 28453041475240576740
        assert_eq!(binomial(68, 34), "28453041475240576740".parse::<BigUint>().unwrap());
    }

    #[test]
    fn test_search_space_size() {
        assert_eq!(search_space_size(0), BigUint::ZERO);
        assert_eq!(search_space_size(1), BigUint::from(1u32));
        assert_eq!(search_space_size(3), BigUint::from(12u32));
        assert_eq!(search_space_size(69), BigUint::from(69u32) << 68);
    }

    #[test]
    fn test_distribution_sums_to_one() {
        for n in [1, 2, 3, 7, 10, 36, 69, 1500] {
            let dist = CardinalityDistribution::new(n);
            assert_eq!(dist.support(), n);
            let sum: f64 = dist.probabilities().iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "n = {}: sum = {}", n, sum);
            assert!(dist.probabilities().iter().all(|&p| p >= 0.0 && p.is_finite()));
        }
    }

    #[test]
    fn test_distribution_values() {
        let dist = CardinalityDistribution::new(4);
        let expected = [1.0 / 8.0, 3.0 / 8.0, 3.0 / 8.0, 1.0 / 8.0];
        for (p, e) in dist.probabilities().iter().zip(expected) {
            assert!((p - e).abs() < 1e-12);
        }
    }

    #[test]
    fn test_distribution_single_predictor() {
        let dist = CardinalityDistribution::new(1);
        assert_eq!(dist.probabilities(), &[1.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..100 {
            assert_eq!(dist.sample(&mut rng), 0);
        }
    }

    #[test]
    fn test_trial_invariants() {
        let dag = star(8);
        let sampler = ConditioningSetSampler::new(&dag, "y").unwrap();
        let n = 8;
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        for _ in 0..500 {
            let trial = sampler.sample_trial(&mut rng).unwrap();
            assert_ne!(trial.predictor, "y");
            assert!(dag.contains(&trial.predictor));
            assert!(trial.conditioning_set.len() <= n - 1);
            assert!(!trial.conditioning_set.contains("y"));
            assert!(!trial.conditioning_set.contains(&trial.predictor));
            assert!(trial.conditioning_set.iter().all(|z| dag.contains(z)));
        }
    }

    #[test]
    fn test_every_predictor_stays_reachable() {
        // A predictor drawn once must remain a candidate for later trials.
        let dag = star(5);
        let sampler = ConditioningSetSampler::new(&dag, "y").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let mut seen = BTreeSet::new();
        for _ in 0..500 {
            seen.insert(sampler.sample_trial(&mut rng).unwrap().predictor);
        }
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn test_cardinality_is_centered() {
        let dag = star(11);
        let sampler = ConditioningSetSampler::new(&dag, "y").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let trials = 4000;
        let mean = (0..trials)
            .map(|_| sampler.sample_trial(&mut rng).unwrap().conditioning_set.len() as f64)
            .sum::<f64>()
            / trials as f64;
        // Binomial(10, 1/2) has mean 5 and standard deviation ~1.58.
        assert!((mean - 5.0).abs() < 0.2, "mean = {}", mean);
    }

    #[test]
    fn test_single_predictor_has_empty_conditioning_set() {
        let dag = Dag::from_edges("pair", ["a", "y"], [("a", "y")]).unwrap();
        let sampler = ConditioningSetSampler::new(&dag, "y").unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..50 {
            let trial = sampler.sample_trial(&mut rng).unwrap();
            assert_eq!(trial.predictor, "a");
            assert!(trial.conditioning_set.is_empty());
        }
    }

    #[test]
    fn test_same_seed_same_trials() {
        let dag = star(6);
        let sampler = ConditioningSetSampler::new(&dag, "y").unwrap();

        let mut rng1 = ChaCha8Rng::seed_from_u64(42);
        let mut rng2 = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..100 {
            assert_eq!(sampler.sample_trial(&mut rng1).unwrap(), sampler.sample_trial(&mut rng2).unwrap());
        }
    }

    #[test]
    fn test_target_only_graph() {
        let dag = Dag::from_edges("lonely", ["y"], []).unwrap();
        assert!(matches!(ConditioningSetSampler::new(&dag, "y"), Err(Error::NoPredictors { .. })));
    }

    #[test]
    fn test_cardinality_for_other_predictor_count() {
        let dag = star(5);
        let cardinality = CardinalityDistribution::new(3);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        assert!(matches!(
            sample_trial(&dag, "y", &cardinality, &mut rng),
            Err(Error::CardinalityMismatch { expected: 3, found: 5 })
        ));
    }

    #[test]
    fn test_unknown_target() {
        let dag = star(3);
        assert!(matches!(ConditioningSetSampler::new(&dag, "nope"), Err(Error::NodeNotFound { .. })));
    }
}

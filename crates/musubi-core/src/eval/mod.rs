//! # Coreference evaluation
//!
//! Streaming scorer for the standard CoNLL metrics: MUC, B-cubed and
//! CEAFe, reported individually and as the CoNLL average (the mean of the
//! three metrics' figures). Counts accumulate document by document, so a
//! whole split can be scored without retaining its clusters.

pub mod assignment;
mod metrics;

use crate::cluster::ClusterSet;

/// Precision/recall/F1 for a single metric or an average of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricReport {
    /// Precision in [0, 1].
    pub precision: f64,
    /// Recall in [0, 1].
    pub recall: f64,
    /// F1 in [0, 1].
    pub f1: f64,
}

/// Numerator/denominator sums for one metric across documents.
#[derive(Debug, Clone, Copy, Default)]
struct MetricTally {
    p_num: f64,
    p_den: f64,
    r_num: f64,
    r_den: f64,
}

impl MetricTally {
    fn add(&mut self, p_num: f64, p_den: f64, r_num: f64, r_den: f64) {
        self.p_num += p_num;
        self.p_den += p_den;
        self.r_num += r_num;
        self.r_den += r_den;
    }

    fn precision(&self) -> f64 {
        if self.p_den == 0.0 {
            0.0
        } else {
            self.p_num / self.p_den
        }
    }

    fn recall(&self) -> f64 {
        if self.r_den == 0.0 {
            0.0
        } else {
            self.r_num / self.r_den
        }
    }

    fn report(&self) -> MetricReport {
        MetricReport {
            precision: self.precision(),
            recall: self.recall(),
            f1: metrics::f_score(self.p_num, self.p_den, self.r_num, self.r_den, 1.0),
        }
    }
}

/// Streaming evaluator over predicted/gold cluster pairs.
///
/// # Example
///
/// ```rust
/// use musubi_core::{ClusterSet, CorefEvaluator, Mention};
///
/// let gold = ClusterSet::from_clusters(vec![vec![
///     Mention::new(0, 0),
///     Mention::new(2, 2),
/// ]]);
/// let mut evaluator = CorefEvaluator::new();
/// evaluator.update(&gold.clone(), &gold);
/// let (precision, recall, f1) = evaluator.prf();
/// assert!((f1 - 1.0).abs() < 1e-12);
/// assert!((precision - 1.0).abs() < 1e-12 && (recall - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CorefEvaluator {
    muc: MetricTally,
    b_cubed: MetricTally,
    ceafe: MetricTally,
}

impl CorefEvaluator {
    /// Fresh evaluator with zeroed counts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one document's predicted and gold clusters into the counts.
    ///
    /// MUC and B-cubed take precision counts from the predicted clusters
    /// against the gold partition and recall counts with the roles
    /// swapped; CEAFe produces all four counts from its optimal alignment.
    pub fn update(&mut self, predicted: &ClusterSet, gold: &ClusterSet) {
        let (p_num, p_den) = metrics::muc(predicted.clusters(), gold);
        let (r_num, r_den) = metrics::muc(gold.clusters(), predicted);
        self.muc.add(p_num, p_den, r_num, r_den);

        let (p_num, p_den) = metrics::b_cubed(predicted.clusters(), gold);
        let (r_num, r_den) = metrics::b_cubed(gold.clusters(), predicted);
        self.b_cubed.add(p_num, p_den, r_num, r_den);

        let (p_num, p_den, r_num, r_den) =
            metrics::ceafe(predicted.clusters(), gold.clusters());
        self.ceafe.add(p_num, p_den, r_num, r_den);
    }

    /// MUC scores accumulated so far.
    pub fn muc(&self) -> MetricReport {
        self.muc.report()
    }

    /// B-cubed scores accumulated so far.
    pub fn b_cubed(&self) -> MetricReport {
        self.b_cubed.report()
    }

    /// CEAFe scores accumulated so far.
    pub fn ceafe(&self) -> MetricReport {
        self.ceafe.report()
    }

    /// CoNLL-average precision.
    pub fn precision(&self) -> f64 {
        (self.muc.precision() + self.b_cubed.precision() + self.ceafe.precision()) / 3.0
    }

    /// CoNLL-average recall.
    pub fn recall(&self) -> f64 {
        (self.muc.recall() + self.b_cubed.recall() + self.ceafe.recall()) / 3.0
    }

    /// CoNLL-average F1 (the mean of the three metrics' F1).
    pub fn f1(&self) -> f64 {
        (self.muc().f1 + self.b_cubed().f1 + self.ceafe().f1) / 3.0
    }

    /// (precision, recall, F1), each CoNLL-averaged.
    pub fn prf(&self) -> (f64, f64, f64) {
        (self.precision(), self.recall(), self.f1())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Mention;

    fn mentions(spans: &[(usize, usize)]) -> Vec<Mention> {
        spans.iter().map(|&(s, e)| Mention::new(s, e)).collect()
    }

    fn spec_gold() -> ClusterSet {
        ClusterSet::from_clusters(vec![
            mentions(&[(0, 0), (2, 2)]),
            mentions(&[(5, 5), (6, 7)]),
        ])
    }

    #[test]
    fn identical_clusters_score_one_everywhere() {
        let gold = spec_gold();
        let mut evaluator = CorefEvaluator::new();
        evaluator.update(&gold.clone(), &gold);

        for report in [evaluator.muc(), evaluator.b_cubed(), evaluator.ceafe()] {
            assert!((report.precision - 1.0).abs() < 1e-12);
            assert!((report.recall - 1.0).abs() < 1e-12);
            assert!((report.f1 - 1.0).abs() < 1e-12);
        }
        assert!((evaluator.f1() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn split_cluster_loses_recall_on_every_metric() {
        let gold = ClusterSet::from_clusters(vec![mentions(&[(0, 0), (2, 2), (4, 4)])]);
        // (4,4) split off as a singleton, which the predicted side drops.
        let predicted = ClusterSet::from_clusters(vec![mentions(&[(0, 0), (2, 2)])]);

        let mut evaluator = CorefEvaluator::new();
        evaluator.update(&predicted, &gold);

        assert!(evaluator.muc().recall < 1.0);
        assert!(evaluator.b_cubed().recall < 1.0);
        assert!(evaluator.ceafe().recall < 1.0);
        assert!(evaluator.f1() < 1.0);
        // Precision stays perfect for the link metrics: everything
        // predicted is correct.
        assert!((evaluator.muc().precision - 1.0).abs() < 1e-12);
        assert!((evaluator.b_cubed().precision - 1.0).abs() < 1e-12);
    }

    #[test]
    fn correct_merge_never_decreases_link_counts() {
        let gold = ClusterSet::from_clusters(vec![mentions(&[(0, 0), (2, 2), (4, 4)])]);
        let split = ClusterSet::from_clusters(vec![
            mentions(&[(0, 0), (2, 2)]),
            mentions(&[(4, 4)]),
        ]);
        let merged = ClusterSet::from_clusters(vec![mentions(&[(0, 0), (2, 2), (4, 4)])]);

        let mut before = CorefEvaluator::new();
        before.update(&split, &gold);
        let mut after = CorefEvaluator::new();
        after.update(&merged, &gold);

        assert!(after.muc.r_num >= before.muc.r_num);
        assert!(after.muc.r_den >= before.muc.r_den);
        assert!(after.b_cubed.r_num >= before.b_cubed.r_num);
        assert!(after.b_cubed.r_den >= before.b_cubed.r_den);
        assert!(after.muc().recall >= before.muc().recall);
        assert!(after.b_cubed().recall >= before.b_cubed().recall);
    }

    #[test]
    fn empty_everything_scores_zero_not_nan() {
        let evaluator = CorefEvaluator::new();
        let (p, r, f1) = evaluator.prf();
        assert_eq!((p, r, f1), (0.0, 0.0, 0.0));
    }

    #[test]
    fn counts_accumulate_across_documents() {
        let gold = spec_gold();
        let mut evaluator = CorefEvaluator::new();
        evaluator.update(&gold.clone(), &gold);
        evaluator.update(&gold.clone(), &gold);
        // Two perfect documents still score a perfect average.
        assert!((evaluator.f1() - 1.0).abs() < 1e-12);
        assert_eq!(evaluator.muc.p_den, 4.0);
    }
}

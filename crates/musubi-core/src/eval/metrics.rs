//! The three CoNLL coreference metrics, in their counts form.
//!
//! MUC and B-cubed are directional: calling them with predicted clusters
//! against the gold index gives precision counts, and with the roles
//! swapped gives recall counts. CEAFe aligns the two cluster lists
//! optimally and yields all four counts at once.

use std::collections::{HashMap, HashSet};

use crate::cluster::ClusterSet;
use crate::corpus::Mention;

use super::assignment::min_cost_assignment;

/// F-measure from accumulated counts; any zero denominator yields 0.
pub(super) fn f_score(p_num: f64, p_den: f64, r_num: f64, r_den: f64, beta: f64) -> f64 {
    let p = if p_den == 0.0 { 0.0 } else { p_num / p_den };
    let r = if r_den == 0.0 { 0.0 } else { r_num / r_den };
    if p + r == 0.0 {
        0.0
    } else {
        (1.0 + beta * beta) * p * r / (beta * beta * p + r)
    }
}

/// MUC link counts (Vilain et al., 1995) for `clusters` against the
/// partition recorded in `other`.
///
/// Each cluster contributes its link count |c|−1 to the denominator; the
/// numerator is the number of links recoverable from `other`, i.e. |c|
/// minus its unmapped members minus the number of distinct `other`
/// clusters its mapped members land in.
pub(super) fn muc(clusters: &[Vec<Mention>], other: &ClusterSet) -> (f64, f64) {
    let mut num = 0.0;
    let mut den = 0.0;
    for cluster in clusters {
        den += cluster.len().saturating_sub(1) as f64;
        let mut correct = cluster.len() as f64;
        let mut linked = HashSet::new();
        for mention in cluster {
            match other.cluster_of(mention) {
                Some(id) => {
                    linked.insert(id);
                }
                None => correct -= 1.0,
            }
        }
        correct -= linked.len() as f64;
        num += correct;
    }
    (num, den)
}

/// B-cubed counts (Bagga & Baldwin, 1998) for `clusters` against `other`.
///
/// Singleton clusters on the iterated side are skipped, and members
/// mapping to singleton `other` clusters contribute nothing, matching the
/// reference scorer.
pub(super) fn b_cubed(clusters: &[Vec<Mention>], other: &ClusterSet) -> (f64, f64) {
    let mut num = 0.0;
    let mut den = 0.0;
    for cluster in clusters {
        if cluster.len() < 2 {
            continue;
        }
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for mention in cluster {
            if let Some(id) = other.cluster_of(mention) {
                *counts.entry(id).or_default() += 1;
            }
        }
        let mut correct = 0.0;
        for (id, count) in counts {
            if other.clusters()[id].len() != 1 {
                correct += (count * count) as f64;
            }
        }
        num += correct / cluster.len() as f64;
        den += cluster.len() as f64;
    }
    (num, den)
}

/// φ4 entity similarity (Cai & Strube, 2010): 2·|a∩b| / (|a|+|b|).
pub(super) fn phi4(a: &[Mention], b: &[Mention]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let a_set: HashSet<&Mention> = a.iter().collect();
    let overlap = b.iter().filter(|m| a_set.contains(m)).count();
    2.0 * overlap as f64 / (a.len() + b.len()) as f64
}

/// CEAFe counts: optimal φ4 alignment between gold clusters and the
/// non-singleton predicted clusters.
///
/// Returns (p_num, p_den, r_num, r_den): the matched similarity total over
/// the predicted cluster count, and the same total over the gold cluster
/// count. Only CEAFe filters predicted singletons; the other metrics keep
/// their own conventions.
pub(super) fn ceafe(
    predicted: &[Vec<Mention>],
    gold: &[Vec<Mention>],
) -> (f64, f64, f64, f64) {
    let predicted: Vec<&Vec<Mention>> =
        predicted.iter().filter(|c| c.len() != 1).collect();

    let costs: Vec<Vec<f64>> = gold
        .iter()
        .map(|g| predicted.iter().map(|p| -phi4(g, p)).collect())
        .collect();
    let assignment = min_cost_assignment(&costs);
    let similarity: f64 = assignment
        .iter()
        .enumerate()
        .filter_map(|(i, j)| j.map(|j| phi4(&gold[i], predicted[j])))
        .sum();

    (
        similarity,
        predicted.len() as f64,
        similarity,
        gold.len() as f64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mentions(spans: &[(usize, usize)]) -> Vec<Mention> {
        spans.iter().map(|&(s, e)| Mention::new(s, e)).collect()
    }

    #[test]
    fn phi4_is_symmetric() {
        let a = mentions(&[(0, 0), (2, 2), (4, 4)]);
        let b = mentions(&[(2, 2), (5, 5)]);
        assert_eq!(phi4(&a, &b), phi4(&b, &a));
        assert!((phi4(&a, &b) - 2.0 / 5.0).abs() < 1e-12);
    }

    #[test]
    fn phi4_identical_clusters_score_one() {
        let a = mentions(&[(0, 0), (2, 2)]);
        assert!((phi4(&a, &a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn muc_perfect_match() {
        let clusters = vec![mentions(&[(0, 0), (2, 2), (4, 4)])];
        let other = ClusterSet::from_clusters(clusters.clone());
        let (num, den) = muc(&clusters, &other);
        assert_eq!((num, den), (2.0, 2.0));
    }

    #[test]
    fn muc_penalizes_splits() {
        let gold = vec![mentions(&[(0, 0), (2, 2), (4, 4)])];
        let predicted = ClusterSet::from_clusters(vec![mentions(&[(0, 0), (2, 2)])]);
        // Recall direction: one of two gold links is recovered; (4,4) is
        // unmapped and the mapped members span a single predicted cluster.
        let (num, den) = muc(&gold, &predicted);
        assert_eq!((num, den), (1.0, 2.0));
    }

    #[test]
    fn b_cubed_skips_singletons() {
        let predicted = vec![mentions(&[(0, 0)])];
        let gold = ClusterSet::from_clusters(vec![mentions(&[(0, 0), (2, 2)])]);
        let (num, den) = b_cubed(&predicted, &gold);
        assert_eq!((num, den), (0.0, 0.0));
    }

    #[test]
    fn b_cubed_partial_overlap() {
        // Predicted merges two gold entities of sizes 2 and 1.
        let predicted = vec![mentions(&[(0, 0), (2, 2), (5, 5)])];
        let gold = ClusterSet::from_clusters(vec![
            mentions(&[(0, 0), (2, 2)]),
            mentions(&[(5, 5), (7, 7)]),
        ]);
        let (num, den) = b_cubed(&predicted, &gold);
        assert!((num - 5.0 / 3.0).abs() < 1e-12);
        assert_eq!(den, 3.0);
    }

    #[test]
    fn ceafe_perfect_match() {
        let clusters = vec![
            mentions(&[(0, 0), (2, 2)]),
            mentions(&[(5, 5), (6, 7)]),
        ];
        let (pn, pd, rn, rd) = ceafe(&clusters, &clusters);
        assert!((pn - 2.0).abs() < 1e-12);
        assert_eq!(pd, 2.0);
        assert!((rn - 2.0).abs() < 1e-12);
        assert_eq!(rd, 2.0);
    }

    #[test]
    fn ceafe_filters_predicted_singletons_only() {
        let predicted = vec![mentions(&[(0, 0), (2, 2)]), mentions(&[(9, 9)])];
        let gold = vec![mentions(&[(0, 0), (2, 2)]), mentions(&[(9, 9)])];
        let (pn, pd, rn, rd) = ceafe(&predicted, &gold);
        // The singleton disappears from the predicted side but the gold
        // side keeps both clusters.
        assert!((pn - 1.0).abs() < 1e-12);
        assert_eq!(pd, 1.0);
        assert!((rn - 1.0).abs() < 1e-12);
        assert_eq!(rd, 2.0);
    }

    #[test]
    fn ceafe_alignment_is_optimal() {
        // Cluster A overlaps both gold entities; the optimal alignment
        // pairs A with gold1 (2/5) and B with gold0 (4/4), total 1.4.
        let predicted = vec![
            mentions(&[(0, 0), (2, 2), (4, 4)]),
            mentions(&[(0, 0), (2, 2)]),
        ];
        let gold = vec![
            mentions(&[(0, 0), (2, 2)]),
            mentions(&[(4, 4), (6, 6)]),
        ];
        let (pn, _, _, _) = ceafe(&predicted, &gold);
        assert!((pn - 1.4).abs() < 1e-12);
    }
}

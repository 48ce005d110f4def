//! # Cluster reconstruction
//!
//! A mention-ranking model emits, per mention, at most one antecedent
//! link. Chasing those links in canonical order groups mentions into
//! disjoint clusters; mentions that neither attach nor get attached to
//! stay out of every cluster (true singletons, which the standard metrics
//! exclude).

use std::collections::HashMap;

use crate::corpus::Mention;
use crate::error::{MusubiError, Result};

/// Disjoint clusters of mentions plus a mention → cluster index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterSet {
    clusters: Vec<Vec<Mention>>,
    index: HashMap<Mention, usize>,
}

impl ClusterSet {
    /// Build a cluster set from explicit clusters (e.g. a document's gold
    /// clusters).
    pub fn from_clusters(clusters: Vec<Vec<Mention>>) -> Self {
        let mut index = HashMap::new();
        for (id, cluster) in clusters.iter().enumerate() {
            for mention in cluster {
                index.insert(*mention, id);
            }
        }
        Self { clusters, index }
    }

    /// Reconstruct clusters from per-mention predicted antecedents.
    ///
    /// `mentions` is the canonical mention list; `antecedents[i]` is the
    /// index of mention i's predicted antecedent, or `None` for the dummy
    /// ("new cluster") option. Every predicted antecedent must strictly
    /// precede its mention; a violation is a fatal contract error.
    pub fn from_antecedents(
        mentions: &[Mention],
        antecedents: &[Option<usize>],
    ) -> Result<Self> {
        debug_assert_eq!(mentions.len(), antecedents.len());

        let mut clusters: Vec<Vec<Mention>> = Vec::new();
        let mut index: HashMap<Mention, usize> = HashMap::new();

        for (i, link) in antecedents.iter().enumerate() {
            let Some(j) = *link else {
                continue;
            };
            if j >= i {
                return Err(MusubiError::AntecedentOrder {
                    mention: i,
                    antecedent: j,
                });
            }

            let antecedent = mentions[j];
            let cluster_id = match index.get(&antecedent) {
                Some(&id) => id,
                None => {
                    clusters.push(vec![antecedent]);
                    let id = clusters.len() - 1;
                    index.insert(antecedent, id);
                    id
                }
            };

            let mention = mentions[i];
            clusters[cluster_id].push(mention);
            index.insert(mention, cluster_id);
        }

        Ok(Self { clusters, index })
    }

    /// The clusters, in creation order.
    pub fn clusters(&self) -> &[Vec<Mention>] {
        &self.clusters
    }

    /// Index of the cluster containing `mention`, if any.
    pub fn cluster_of(&self, mention: &Mention) -> Option<usize> {
        self.index.get(mention).copied()
    }

    /// Number of clusters.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Whether there are no clusters.
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

//! # Musubi Core
//!
//! Data model and evaluation machinery for mention-ranking coreference
//! resolution: JSON-lines corpus loading, pretrained embedding tables,
//! antecedent-link cluster reconstruction, and the standard CoNLL metrics
//! (MUC, B-cubed, CEAFe).
//!
//! ## Quick Start
//!
//! ```rust
//! use musubi_core::{ClusterSet, CorefEvaluator, Mention};
//!
//! let gold = ClusterSet::from_clusters(vec![
//!     vec![Mention::new(0, 0), Mention::new(2, 2)],
//!     vec![Mention::new(5, 5), Mention::new(6, 7)],
//! ]);
//!
//! let mut evaluator = CorefEvaluator::new();
//! evaluator.update(&gold.clone(), &gold);
//! assert!((evaluator.f1() - 1.0).abs() < 1e-12);
//! ```
pub mod cluster;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod eval;

// Re-export primary API
pub use cluster::ClusterSet;
pub use corpus::{read_corpus, Document, Mention};
pub use embedding::EmbeddingTable;
pub use error::{MusubiError, Result};
pub use eval::{CorefEvaluator, MetricReport};

//! # Musubi Trainer
//!
//! The trainable half of Musubi: a simplified end-to-end mention-ranking
//! coreference model (Lee et al., 2017) built on candle, together with
//! the document tensorization and the epoch-driven training/evaluation
//! loop. Corpus loading, cluster reconstruction and the CoNLL metrics
//! live in `musubi-core`.

pub mod data;
pub mod model;
pub mod trainer;

// Re-export primary API
pub use data::{prepare_document, DocumentTensors};
pub use model::{CorefConfig, MentionRanker};
pub use trainer::Trainer;

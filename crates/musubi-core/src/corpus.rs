//! # Corpus loading
//!
//! Documents arrive as JSON-lines: one object per line with `sentences`
//! (tokenized sentences) and `clusters` (gold coreference clusters of
//! `[start, end]` token spans, offsets into the flattened token sequence).

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;

use crate::error::{MusubiError, Result};

/// A contiguous token span, addressed by offsets into the flattened
/// document. The derived ordering is the canonical mention order:
/// ascending by start, then end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(from = "(usize, usize)")]
pub struct Mention {
    /// Offset of the first token of the span.
    pub start: usize,
    /// Offset of the last token of the span (inclusive).
    pub end: usize,
}

impl Mention {
    /// Create a mention from start/end token offsets.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl From<(usize, usize)> for Mention {
    fn from((start, end): (usize, usize)) -> Self {
        Self { start, end }
    }
}

/// A single document: tokenized sentences plus gold coreference clusters.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    /// Corpus-assigned document name, used for logging only.
    #[serde(default)]
    pub doc_key: String,
    /// Sentences as ordered token sequences.
    pub sentences: Vec<Vec<String>>,
    /// Gold clusters; every member is a span into the flattened document.
    pub clusters: Vec<Vec<Mention>>,
}

impl Document {
    /// Number of tokens across all sentences.
    pub fn total_tokens(&self) -> usize {
        self.sentences.iter().map(Vec::len).sum()
    }

    /// All gold mentions in canonical order, paired with their 1-based
    /// cluster ids (assigned in gold-cluster enumeration order).
    ///
    /// Rejects documents where the same span appears in two clusters or a
    /// span falls outside the token sequence. A document with no gold
    /// mentions yields empty vectors.
    pub fn canonical_mentions(&self) -> Result<(Vec<Mention>, Vec<u32>)> {
        let total_tokens = self.total_tokens();
        let mut mentions: Vec<Mention> = self.clusters.iter().flatten().copied().collect();
        mentions.sort_unstable();

        for pair in mentions.windows(2) {
            if pair[0] == pair[1] {
                return Err(MusubiError::DuplicateMention {
                    start: pair[0].start,
                    end: pair[0].end,
                });
            }
        }
        for m in &mentions {
            if m.start > m.end || m.end >= total_tokens {
                return Err(MusubiError::MentionOutOfRange {
                    start: m.start,
                    end: m.end,
                    total_tokens,
                });
            }
        }

        let index: HashMap<Mention, usize> =
            mentions.iter().enumerate().map(|(i, m)| (*m, i)).collect();
        let mut cluster_ids = vec![0u32; mentions.len()];
        for (cid, cluster) in self.clusters.iter().enumerate() {
            for m in cluster {
                cluster_ids[index[m]] = (cid + 1) as u32;
            }
        }
        Ok((mentions, cluster_ids))
    }
}

/// Load every document of a JSON-lines corpus file.
///
/// Blank lines are skipped; any malformed line is a fatal error carrying
/// its line number.
pub fn read_corpus<P: AsRef<Path>>(path: P) -> Result<Vec<Document>> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);

    let mut documents = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let doc = serde_json::from_str(&line).map_err(|source| MusubiError::Json {
            line: idx + 1,
            source,
        })?;
        documents.push(doc);
    }
    Ok(documents)
}

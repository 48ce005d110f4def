//! # Pretrained word embeddings
//!
//! Plain-text embedding files: one header line (skipped), then one line
//! per token holding the token followed by its space-separated components.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::info;

use crate::error::{MusubiError, Result};

/// Immutable token → vector table with a zero default for unknown tokens.
#[derive(Debug, Clone)]
pub struct EmbeddingTable {
    dim: usize,
    vectors: HashMap<String, Vec<f32>>,
    zero: Vec<f32>,
}

impl EmbeddingTable {
    /// Load an embedding file, checking every vector against `dim`.
    ///
    /// A vector with the wrong number of components, or a line without a
    /// token/vector split, is a fatal error.
    pub fn load<P: AsRef<Path>>(path: P, dim: usize) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), dim, "loading word embeddings");

        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut vectors = HashMap::new();
        // The first line is the file header.
        for (idx, line) in reader.lines().enumerate().skip(1) {
            let line = line?;
            let Some((token, rest)) = line.split_once(' ') else {
                return Err(MusubiError::EmbeddingParse { line: idx + 1 });
            };
            let vector = rest
                .split_ascii_whitespace()
                .map(str::parse)
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|_| MusubiError::EmbeddingParse { line: idx + 1 })?;
            if vector.len() != dim {
                return Err(MusubiError::EmbeddingDim {
                    token: token.to_string(),
                    expected: dim,
                    found: vector.len(),
                });
            }
            vectors.insert(token.to_string(), vector);
        }

        info!(tokens = vectors.len(), "finished loading word embeddings");
        Ok(Self {
            dim,
            vectors,
            zero: vec![0.0; dim],
        })
    }

    /// Build a table directly from token/vector pairs. Intended for tests
    /// and synthetic setups; the same arity check as [`load`](Self::load)
    /// applies.
    pub fn from_pairs<I>(pairs: I, dim: usize) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Vec<f32>)>,
    {
        let mut vectors = HashMap::new();
        for (token, vector) in pairs {
            if vector.len() != dim {
                return Err(MusubiError::EmbeddingDim {
                    token,
                    expected: dim,
                    found: vector.len(),
                });
            }
            vectors.insert(token, vector);
        }
        Ok(Self {
            dim,
            vectors,
            zero: vec![0.0; dim],
        })
    }

    /// Vector dimensionality.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of tokens in the table.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the table holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Look up a token, falling back to the zero vector when unknown.
    pub fn get(&self, token: &str) -> &[f32] {
        self.vectors
            .get(token)
            .map(Vec::as_slice)
            .unwrap_or(&self.zero)
    }
}

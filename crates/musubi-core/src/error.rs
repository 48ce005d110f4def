use thiserror::Error;

/// Errors that can occur while loading or scoring coreference data.
#[derive(Debug, Error)]
pub enum MusubiError {
    /// An underlying file could not be read.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A line of the JSON-lines corpus could not be parsed.
    #[error("malformed document on line {line}: {source}")]
    Json {
        /// 1-based line number within the corpus file.
        line: usize,
        /// The underlying parse error.
        source: serde_json::Error,
    },

    /// An embedding line did not consist of a token followed by floats.
    #[error("malformed embedding on line {line}")]
    EmbeddingParse {
        /// 1-based line number within the embedding file.
        line: usize,
    },

    /// An embedding vector had the wrong number of components.
    #[error("embedding for {token:?} has {found} components, expected {expected}")]
    EmbeddingDim {
        /// The token whose vector was malformed.
        token: String,
        /// The configured embedding dimensionality.
        expected: usize,
        /// The number of components actually present.
        found: usize,
    },

    /// The same (start, end) span appeared in more than one gold cluster.
    #[error("mention ({start}, {end}) appears in multiple gold clusters")]
    DuplicateMention {
        /// Start token offset of the repeated span.
        start: usize,
        /// End token offset of the repeated span.
        end: usize,
    },

    /// A mention's offsets fall outside the document's token sequence.
    #[error("mention ({start}, {end}) out of range for a document of {total_tokens} tokens")]
    MentionOutOfRange {
        /// Start token offset.
        start: usize,
        /// End token offset.
        end: usize,
        /// Number of tokens in the flattened document.
        total_tokens: usize,
    },

    /// A predicted antecedent did not precede its mention.
    #[error("mention {mention} predicted antecedent {antecedent}, which does not precede it")]
    AntecedentOrder {
        /// Index of the mention in canonical order.
        mention: usize,
        /// The offending antecedent index.
        antecedent: usize,
    },
}

/// Result type alias for Musubi operations.
pub type Result<T> = std::result::Result<T, MusubiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = MusubiError::EmbeddingDim {
            token: "cat".into(),
            expected: 300,
            found: 299,
        };
        assert!(err.to_string().contains("cat"));
        assert!(err.to_string().contains("300"));

        let err = MusubiError::AntecedentOrder {
            mention: 3,
            antecedent: 7,
        };
        assert!(err.to_string().contains("does not precede"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MusubiError>();
    }
}

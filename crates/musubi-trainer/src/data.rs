//! Document tensorization for the mention-ranking model.
//!
//! Turns a corpus [`Document`] into the tensors the scorer consumes: a
//! zero-padded `[num_sentences, max_sentence_len, dim]` embedding block,
//! true sentence lengths, and the canonical mention arrays.

use anyhow::Result;
use candle_core::{Device, Tensor};
use musubi_core::{Document, EmbeddingTable, Mention};

/// One document, ready for the scorer. Mention arrays are aligned to the
/// canonical (start, end) ordering.
#[derive(Debug, Clone)]
pub struct DocumentTensors {
    /// Corpus-assigned document name (may be empty).
    pub doc_key: String,
    /// Padded token embeddings, shape `[num_sentences, max_len, dim]`.
    pub word_embeddings: Tensor,
    /// True token count per sentence.
    pub sent_lengths: Vec<usize>,
    /// Gold mentions in canonical order.
    pub mentions: Vec<Mention>,
    /// Flattened start offsets, aligned with `mentions`.
    pub starts: Vec<u32>,
    /// Flattened end offsets, aligned with `mentions`.
    pub ends: Vec<u32>,
    /// 1-based gold cluster id per mention (0 = none).
    pub cluster_ids: Vec<u32>,
    /// The document's gold clusters, kept for evaluation.
    pub gold_clusters: Vec<Vec<Mention>>,
}

/// Tensorize one document. A document with no gold mentions produces
/// well-formed empty mention arrays.
pub fn prepare_document(
    doc: &Document,
    embeddings: &EmbeddingTable,
    device: &Device,
) -> Result<DocumentTensors> {
    let (mentions, cluster_ids) = doc.canonical_mentions()?;

    let dim = embeddings.dim();
    let sent_lengths: Vec<usize> = doc.sentences.iter().map(Vec::len).collect();
    let num_sentences = doc.sentences.len();
    let max_len = sent_lengths.iter().copied().max().unwrap_or(0);

    let mut data = vec![0.0f32; num_sentences * max_len * dim];
    for (s, sentence) in doc.sentences.iter().enumerate() {
        for (t, token) in sentence.iter().enumerate() {
            let offset = (s * max_len + t) * dim;
            data[offset..offset + dim].copy_from_slice(embeddings.get(token));
        }
    }
    let word_embeddings = Tensor::from_vec(data, (num_sentences, max_len, dim), device)?;

    let starts = mentions.iter().map(|m| m.start as u32).collect();
    let ends = mentions.iter().map(|m| m.end as u32).collect();

    Ok(DocumentTensors {
        doc_key: doc.doc_key.clone(),
        word_embeddings,
        sent_lengths,
        mentions,
        starts,
        ends,
        cluster_ids,
        gold_clusters: doc.clusters.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> EmbeddingTable {
        EmbeddingTable::from_pairs(
            [
                ("a".to_string(), vec![1.0, 0.0]),
                ("b".to_string(), vec![0.0, 1.0]),
            ],
            2,
        )
        .unwrap()
    }

    fn doc(json: &str) -> Document {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn pads_short_sentences_with_zeros() {
        let doc = doc(r#"{"sentences":[["a","b","a"],["b"]],"clusters":[]}"#);
        let batch = prepare_document(&doc, &table(), &Device::Cpu).unwrap();

        assert_eq!(batch.word_embeddings.dims(), &[2, 3, 2]);
        assert_eq!(batch.sent_lengths, vec![3, 1]);

        let values = batch.word_embeddings.to_vec3::<f32>().unwrap();
        assert_eq!(values[0][1], vec![0.0, 1.0]);
        // Padding positions stay zero.
        assert_eq!(values[1][1], vec![0.0, 0.0]);
        assert_eq!(values[1][2], vec![0.0, 0.0]);
    }

    #[test]
    fn unknown_tokens_embed_to_zero() {
        let doc = doc(r#"{"sentences":[["mystery"]],"clusters":[]}"#);
        let batch = prepare_document(&doc, &table(), &Device::Cpu).unwrap();
        let values = batch.word_embeddings.to_vec3::<f32>().unwrap();
        assert_eq!(values[0][0], vec![0.0, 0.0]);
    }

    #[test]
    fn mention_arrays_follow_canonical_order() {
        let doc = doc(
            r#"{"sentences":[["a","b","a","b","a"]],"clusters":[[[3,3],[0,0]],[[1,2],[4,4]]]}"#,
        );
        let batch = prepare_document(&doc, &table(), &Device::Cpu).unwrap();

        assert_eq!(batch.starts, vec![0, 1, 3, 4]);
        assert_eq!(batch.ends, vec![0, 2, 3, 4]);
        assert_eq!(batch.cluster_ids, vec![1, 2, 1, 2]);
    }

    #[test]
    fn empty_document_is_well_formed() {
        let doc = doc(r#"{"sentences":[["a","b"]],"clusters":[]}"#);
        let batch = prepare_document(&doc, &table(), &Device::Cpu).unwrap();
        assert!(batch.mentions.is_empty());
        assert!(batch.starts.is_empty());
        assert!(batch.cluster_ids.is_empty());
        assert_eq!(batch.word_embeddings.dims(), &[1, 2, 2]);
    }
}

//! # Mention-ranking scorer
//!
//! A simplified Lee et al. (2017) coreference model: sentences are
//! encoded with a bidirectional LSTM, mention spans are represented by
//! their boundary token outputs, and a feed-forward network scores each
//! mention against its preceding candidate antecedents. Training
//! maximizes the marginal likelihood of the gold antecedents.

use candle_core::{D, DType, Device, IndexOp, Result, Tensor};
use candle_nn::ops::Dropout;
use candle_nn::rnn::{lstm, LSTM, LSTMConfig, RNN};
use candle_nn::{linear, Linear, Module, VarBuilder};

use crate::data::DocumentTensors;

/// Model hyperparameters. Hardcoded defaults mirror the instructional
/// setup; only the embedding dimensionality varies with the input file.
#[derive(Debug, Clone)]
pub struct CorefConfig {
    /// Dimensionality of the pretrained word embeddings.
    pub embedding_size: usize,
    /// Dropout rate applied to word embeddings during training.
    pub embedding_dropout: f32,
    /// Hidden size of both the LSTMs and the feed-forward layers.
    pub hidden_size: usize,
    /// Number of hidden feed-forward layers in the pair scorer.
    pub ffnn_layers: usize,
    /// Dropout rate for encoder outputs and feed-forward layers.
    pub hidden_dropout: f32,
    /// Maximum number of candidate antecedents per mention.
    pub max_antecedents: usize,
    /// Adam learning rate.
    pub learning_rate: f64,
    /// Global gradient norm threshold.
    pub grad_clip_norm: f64,
}

impl CorefConfig {
    /// Default hyperparameters for the given embedding dimensionality.
    pub fn new(embedding_size: usize) -> Self {
        Self {
            embedding_size,
            ..Self::default()
        }
    }
}

impl Default for CorefConfig {
    fn default() -> Self {
        Self {
            embedding_size: 300,
            embedding_dropout: 0.5,
            hidden_size: 150,
            ffnn_layers: 2,
            hidden_dropout: 0.2,
            max_antecedents: 250,
            learning_rate: 1e-3,
            grad_clip_norm: 5.0,
        }
    }
}

/// The scoring model. Owns its layers; the parameters live in the
/// `VarMap` behind the `VarBuilder` it was constructed from, so the
/// trainer can optimize and persist them.
pub struct MentionRanker {
    config: CorefConfig,
    device: Device,
    lstm_fwd: LSTM,
    lstm_bwd: LSTM,
    hidden: Vec<Linear>,
    output: Linear,
    embedding_dropout: Dropout,
    hidden_dropout: Dropout,
}

impl MentionRanker {
    /// Build the model's layers under `vb`.
    pub fn new(config: CorefConfig, vb: VarBuilder, device: &Device) -> Result<Self> {
        let h = config.hidden_size;
        let lstm_fwd = lstm(
            config.embedding_size,
            h,
            LSTMConfig::default(),
            vb.pp("lstm_fwd"),
        )?;
        let lstm_bwd = lstm(
            config.embedding_size,
            h,
            LSTMConfig::default(),
            vb.pp("lstm_bwd"),
        )?;

        // Pair representation is two 4H mention representations.
        let mut hidden = Vec::with_capacity(config.ffnn_layers);
        let mut in_dim = 8 * h;
        for i in 0..config.ffnn_layers {
            hidden.push(linear(in_dim, h, vb.pp(format!("hidden_{i}")))?);
            in_dim = h;
        }
        let output = linear(in_dim, 1, vb.pp("output"))?;

        Ok(Self {
            embedding_dropout: Dropout::new(config.embedding_dropout),
            hidden_dropout: Dropout::new(config.hidden_dropout),
            config,
            device: device.clone(),
            lstm_fwd,
            lstm_bwd,
            hidden,
            output,
        })
    }

    /// The model's hyperparameters.
    pub fn config(&self) -> &CorefConfig {
        &self.config
    }

    /// Encode every sentence independently with the two directional
    /// LSTMs, then flatten the per-token outputs into document order.
    ///
    /// Sentences are sliced to their true length before encoding, so
    /// padding positions never reach the encoder and the result is one
    /// row per real token: `[total_tokens, 2H]`.
    fn encode(&self, batch: &DocumentTensors, train: bool) -> Result<Tensor> {
        let mut outputs = Vec::with_capacity(batch.sent_lengths.len());
        for (s, &len) in batch.sent_lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let sentence = batch.word_embeddings.i((s, ..len, ..))?.unsqueeze(0)?;
            let sentence = self.embedding_dropout.forward(&sentence, train)?;

            let forward = self
                .lstm_fwd
                .states_to_tensor(&self.lstm_fwd.seq(&sentence)?)?;

            // The backward direction runs over the reversed token order
            // and its outputs are un-reversed to line up per position.
            let reversed: Vec<u32> = (0..len as u32).rev().collect();
            let reversed = Tensor::from_vec(reversed, len, sentence.device())?;
            let backward_in = sentence.index_select(&reversed, 1)?;
            let backward = self
                .lstm_bwd
                .states_to_tensor(&self.lstm_bwd.seq(&backward_in)?)?
                .index_select(&reversed, 1)?;

            outputs.push(Tensor::cat(&[&forward, &backward], D::Minus1)?.squeeze(0)?);
        }
        let flat = Tensor::cat(&outputs, 0)?;
        self.hidden_dropout.forward(&flat, train)
    }

    /// Antecedent score matrix of shape `[num_mentions, K + 1]`, where
    /// K = min(num_mentions, max_antecedents). Column 0 is the constant-0
    /// dummy ("no antecedent"); column d scores the mention at distance d
    /// back, or −∞ where no such mention exists.
    fn pair_scores(&self, batch: &DocumentTensors, train: bool) -> Result<Tensor> {
        let device = batch.word_embeddings.device();
        let outputs = self.encode(batch, train)?;

        let num_mentions = batch.mentions.len();
        let starts = Tensor::from_vec(batch.starts.clone(), num_mentions, device)?;
        let ends = Tensor::from_vec(batch.ends.clone(), num_mentions, device)?;
        let mention_emb = Tensor::cat(
            &[
                &outputs.index_select(&starts, 0)?,
                &outputs.index_select(&ends, 0)?,
            ],
            1,
        )?;

        let max_ant = num_mentions.min(self.config.max_antecedents);
        let mut mention_ids = Vec::with_capacity(num_mentions * max_ant);
        let mut antecedent_ids = Vec::with_capacity(num_mentions * max_ant);
        let mut mask = Vec::with_capacity(num_mentions * max_ant);
        for i in 0..num_mentions {
            for distance in 1..=max_ant {
                mention_ids.push(i as u32);
                // Candidates before the document start clamp to index 0
                // and are masked out of the softmax.
                let (candidate, valid) = if i >= distance {
                    (i - distance, true)
                } else {
                    (0, false)
                };
                antecedent_ids.push(candidate as u32);
                mask.push(if valid { 0.0f32 } else { f32::NEG_INFINITY });
            }
        }
        let mention_ids = Tensor::from_vec(mention_ids, num_mentions * max_ant, device)?;
        let antecedent_ids = Tensor::from_vec(antecedent_ids, num_mentions * max_ant, device)?;

        let pairs = Tensor::cat(
            &[
                &mention_emb.index_select(&mention_ids, 0)?,
                &mention_emb.index_select(&antecedent_ids, 0)?,
            ],
            1,
        )?;

        let mut activations = pairs;
        for layer in &self.hidden {
            activations = layer.forward(&activations)?.relu()?;
            activations = self.hidden_dropout.forward(&activations, train)?;
        }
        let scores = self
            .output
            .forward(&activations)?
            .reshape((num_mentions, max_ant))?;

        let mask = Tensor::from_vec(mask, (num_mentions, max_ant), device)?;
        let scores = scores.add(&mask)?;

        let dummy = Tensor::zeros((num_mentions, 1), DType::F32, device)?;
        Tensor::cat(&[&dummy, &scores], 1)
    }

    /// Marginal-likelihood loss over a document: per mention, the
    /// log-sum-exp over every option minus the log-sum-exp over the
    /// gold-positive options ({dummy} when no earlier same-cluster
    /// candidate is in range), summed over mentions. Non-negative by
    /// construction.
    pub fn loss(&self, batch: &DocumentTensors, train: bool) -> Result<Tensor> {
        if batch.mentions.is_empty() {
            return Tensor::zeros((), DType::F32, &self.device);
        }
        let scores = self.pair_scores(batch, train)?;
        let (num_mentions, width) = scores.dims2()?;

        // Gold mask: 0 for correct options, −∞ elsewhere.
        let mut gold_mask = vec![f32::NEG_INFINITY; num_mentions * width];
        for i in 0..num_mentions {
            let cid = batch.cluster_ids[i];
            let mut has_antecedent = false;
            for distance in 1..=(width - 1).min(i) {
                let candidate = i - distance;
                if cid > 0 && batch.cluster_ids[candidate] == cid {
                    gold_mask[i * width + distance] = 0.0;
                    has_antecedent = true;
                }
            }
            if !has_antecedent {
                gold_mask[i * width] = 0.0;
            }
        }
        let gold_mask = Tensor::from_vec(gold_mask, (num_mentions, width), scores.device())?;

        let log_norm = log_sum_exp_rows(&scores)?;
        let marginalized_gold = log_sum_exp_rows(&scores.add(&gold_mask)?)?;
        log_norm.sub(&marginalized_gold)?.sum_all()
    }

    /// Predicted antecedent per mention: `None` for the dummy, otherwise
    /// the index of an earlier mention. Masked slots carry −∞ and can
    /// never win the argmax, so the result always respects the ordering
    /// contract.
    pub fn predict(&self, batch: &DocumentTensors) -> Result<Vec<Option<usize>>> {
        if batch.mentions.is_empty() {
            return Ok(Vec::new());
        }
        let scores = self.pair_scores(batch, false)?;
        let rows = scores.to_vec2::<f32>()?;
        Ok(rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let mut best = 0;
                for (j, &score) in row.iter().enumerate() {
                    if score > row[best] {
                        best = j;
                    }
                }
                if best == 0 { None } else { Some(i - best) }
            })
            .collect())
    }
}

/// Row-wise log-sum-exp of a matrix, stable under −∞ masked entries: the
/// row maximum is folded back in as a constant, so masked entries
/// contribute exp(−∞) = 0 and the gradient is exactly the row softmax.
/// Every row must keep at least one finite entry; the dummy column
/// guarantees that here.
fn log_sum_exp_rows(scores: &Tensor) -> Result<Tensor> {
    let (rows, _) = scores.dims2()?;
    let row_max = scores.max(D::Minus1)?.to_vec1::<f32>()?;
    let row_max = Tensor::from_vec(row_max, (rows, 1), scores.device())?;
    let shifted = scores.broadcast_sub(&row_max)?;
    let summed = shifted.exp()?.sum_keepdim(D::Minus1)?;
    summed.log()?.add(&row_max)?.squeeze(D::Minus1)
}

//! Training and evaluation driver.
//!
//! One optimizer step per document, gradients clipped by global norm,
//! dev evaluation after every epoch and a final test evaluation. No
//! checkpointing during training; the trained weights can be dumped once
//! at the end via [`Trainer::save_model`].

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use candle_core::backprop::GradStore;
use candle_core::{DType, Device, Var};
use candle_nn::optim::{AdamW, Optimizer, ParamsAdamW};
use candle_nn::{VarBuilder, VarMap};
use tracing::{debug, info};

use musubi_core::{read_corpus, ClusterSet, CorefEvaluator, EmbeddingTable};

use crate::data::{prepare_document, DocumentTensors};
use crate::model::{CorefConfig, MentionRanker};

/// Documents between two windowed-loss progress reports.
const LOSS_REPORT_EVERY: usize = 200;

/// Owns the model parameters, the optimizer and the embedding table for
/// one training run.
pub struct Trainer {
    model: MentionRanker,
    varmap: VarMap,
    optimizer: AdamW,
    embeddings: EmbeddingTable,
    device: Device,
    config: CorefConfig,
}

impl Trainer {
    /// Load the embedding table from `embedding_path` and build a fresh
    /// model and optimizer.
    pub fn new<P: AsRef<Path>>(embedding_path: P, config: CorefConfig) -> Result<Self> {
        let embeddings = EmbeddingTable::load(embedding_path, config.embedding_size)?;
        Self::with_embeddings(embeddings, config)
    }

    /// Build a trainer around an already-loaded embedding table.
    pub fn with_embeddings(embeddings: EmbeddingTable, config: CorefConfig) -> Result<Self> {
        anyhow::ensure!(
            embeddings.dim() == config.embedding_size,
            "embedding table dimension {} does not match configured size {}",
            embeddings.dim(),
            config.embedding_size
        );

        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let model = MentionRanker::new(config.clone(), vb, &device)?;
        let optimizer = AdamW::new(
            varmap.all_vars(),
            ParamsAdamW {
                lr: config.learning_rate,
                // Plain Adam: no decoupled weight decay.
                weight_decay: 0.0,
                ..Default::default()
            },
        )?;

        Ok(Self {
            model,
            varmap,
            optimizer,
            embeddings,
            device,
            config,
        })
    }

    /// Read a JSON-lines split and tensorize every document.
    fn load_split(&self, path: &Path) -> Result<Vec<DocumentTensors>> {
        let documents = read_corpus(path)?;
        documents
            .iter()
            .map(|doc| prepare_document(doc, &self.embeddings, &self.device))
            .collect()
    }

    /// One optimizer step over a single document; returns its loss.
    fn step(&mut self, batch: &DocumentTensors) -> Result<f32> {
        if batch.mentions.is_empty() {
            return Ok(0.0);
        }
        let loss = self.model.loss(batch, true)?;
        let mut grads = loss.backward()?;
        clip_global_norm(&self.varmap.all_vars(), &mut grads, self.config.grad_clip_norm)?;
        self.optimizer.step(&grads)?;
        Ok(loss.to_scalar::<f32>()?)
    }

    /// Run the full schedule: `epochs` passes over the training split
    /// with a dev evaluation after each, then a final test evaluation.
    pub fn train(
        &mut self,
        train_path: &Path,
        dev_path: &Path,
        test_path: &Path,
        epochs: usize,
    ) -> Result<()> {
        let train_docs = self.load_split(train_path)?;
        info!(documents = train_docs.len(), epochs, "starting training");
        let start = Instant::now();

        for epoch in 1..=epochs {
            let epoch_start = Instant::now();
            let mut losses = Vec::with_capacity(train_docs.len());
            for (i, batch) in train_docs.iter().enumerate() {
                losses.push(self.step(batch)?);
                if i > 0 && i % LOSS_REPORT_EVERY == 0 {
                    let window = &losses[losses.len() - LOSS_REPORT_EVERY..];
                    let window_loss = window.iter().sum::<f32>() / window.len() as f32;
                    info!(epoch, document = i, window_loss, "training progress");
                }
            }

            let avg_loss = losses.iter().sum::<f32>() / losses.len().max(1) as f32;
            info!(epoch, avg_loss, elapsed = ?epoch_start.elapsed(), "epoch complete");

            let dev_start = Instant::now();
            let (precision, recall, f1) = self.evaluate_split(dev_path)?;
            info!(
                epoch,
                precision,
                recall,
                f1,
                elapsed = ?dev_start.elapsed(),
                "dev evaluation"
            );
        }
        info!(elapsed = ?start.elapsed(), "training finished");

        let test_start = Instant::now();
        let (precision, recall, f1) = self.evaluate_split(test_path)?;
        info!(
            precision,
            recall,
            f1,
            elapsed = ?test_start.elapsed(),
            "test evaluation"
        );
        Ok(())
    }

    /// Score one split: reconstruct clusters from the model's predicted
    /// antecedents and stream them through the CoNLL evaluator. Returns
    /// CoNLL-averaged (precision, recall, F1).
    pub fn evaluate_split(&self, path: &Path) -> Result<(f64, f64, f64)> {
        let docs = self.load_split(path)?;
        let mut evaluator = CorefEvaluator::new();
        for batch in &docs {
            let antecedents = self.model.predict(batch)?;
            let predicted = ClusterSet::from_antecedents(&batch.mentions, &antecedents)?;
            let gold = ClusterSet::from_clusters(batch.gold_clusters.clone());
            debug!(
                doc_key = %batch.doc_key,
                mentions = batch.mentions.len(),
                predicted_clusters = predicted.len(),
                "scored document"
            );
            evaluator.update(&predicted, &gold);
        }
        Ok(evaluator.prf())
    }

    /// Dump the trained weights as a safetensors file.
    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.varmap.save(path.as_ref())?;
        info!(path = %path.as_ref().display(), "model saved");
        Ok(())
    }
}

/// Scale every gradient in `grads` so their global norm does not exceed
/// `max_norm`. Returns the pre-clipping norm.
fn clip_global_norm(vars: &[Var], grads: &mut GradStore, max_norm: f64) -> Result<f64> {
    let mut sum_sq = 0.0f64;
    for var in vars {
        if let Some(grad) = grads.get(var) {
            sum_sq += grad.sqr()?.sum_all()?.to_scalar::<f32>()? as f64;
        }
    }
    let norm = sum_sq.sqrt();
    if norm > max_norm {
        let scale = max_norm / norm;
        for var in vars {
            if let Some(grad) = grads.remove(var) {
                grads.insert(var, grad.affine(scale, 0.0)?);
            }
        }
    }
    Ok(norm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn tiny_config() -> CorefConfig {
        CorefConfig {
            embedding_size: 2,
            hidden_size: 4,
            ..CorefConfig::default()
        }
    }

    fn embeddings() -> EmbeddingTable {
        EmbeddingTable::from_pairs(
            [
                ("he".to_string(), vec![0.3, -0.1]),
                ("she".to_string(), vec![-0.5, 0.8]),
                ("ran".to_string(), vec![0.9, 0.4]),
            ],
            2,
        )
        .unwrap()
    }

    fn write_split(name: &str, contents: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("musubi-trainer-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    const CORPUS: &str = concat!(
        r#"{"doc_key":"t1","sentences":[["he","ran","he"]],"clusters":[[[0,0],[2,2]]]}"#,
        "\n",
        r#"{"doc_key":"t2","sentences":[["she","ran"],["she"]],"clusters":[[[0,0],[2,2]]]}"#,
        "\n",
        r#"{"doc_key":"t3","sentences":[["ran","ran"]],"clusters":[]}"#,
        "\n",
    );

    #[test]
    fn clipping_caps_the_global_norm() {
        let device = Device::Cpu;
        let var =
            Var::from_tensor(&candle_core::Tensor::from_vec(vec![1.0f32, 2.0], (2,), &device).unwrap())
                .unwrap();
        let loss = var.as_tensor().affine(10.0, 0.0).unwrap().sum_all().unwrap();
        let mut grads = loss.backward().unwrap();

        let vars = vec![var];
        // d(loss)/d(var) = [10, 10], norm ≈ 14.14.
        let norm = clip_global_norm(&vars, &mut grads, 5.0).unwrap();
        assert!((norm - 200.0f64.sqrt()).abs() < 1e-3);

        let clipped = grads.get(&vars[0]).unwrap();
        let clipped_norm = clipped
            .sqr()
            .unwrap()
            .sum_all()
            .unwrap()
            .to_scalar::<f32>()
            .unwrap()
            .sqrt();
        assert!((clipped_norm - 5.0).abs() < 1e-3);
    }

    #[test]
    fn small_gradients_pass_through_unchanged() {
        let device = Device::Cpu;
        let var =
            Var::from_tensor(&candle_core::Tensor::from_vec(vec![1.0f32], (1,), &device).unwrap())
                .unwrap();
        let loss = var.as_tensor().affine(0.5, 0.0).unwrap().sum_all().unwrap();
        let mut grads = loss.backward().unwrap();

        let vars = vec![var];
        let norm = clip_global_norm(&vars, &mut grads, 5.0).unwrap();
        assert!((norm - 0.5).abs() < 1e-6);
        let grad = grads.get(&vars[0]).unwrap().to_vec1::<f32>().unwrap();
        assert!((grad[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn trains_and_evaluates_a_tiny_corpus() {
        let train = write_split("train.jsonlines", CORPUS);
        let dev = write_split("dev.jsonlines", CORPUS);
        let test = write_split("test.jsonlines", CORPUS);

        let mut trainer = Trainer::with_embeddings(embeddings(), tiny_config()).unwrap();
        trainer.train(&train, &dev, &test, 1).unwrap();

        let (precision, recall, f1) = trainer.evaluate_split(&test).unwrap();
        for value in [precision, recall, f1] {
            assert!((0.0..=1.0).contains(&value), "out of range: {value}");
        }
    }

    #[test]
    fn mismatched_embedding_dimension_is_rejected() {
        let config = CorefConfig {
            embedding_size: 5,
            ..tiny_config()
        };
        assert!(Trainer::with_embeddings(embeddings(), config).is_err());
    }
}

//! Run configuration for the question classifier trainer.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::data::Vocab;
use super::model::GruClassifierConfig;

/// All settings of a training run.
///
/// Persisted as `train_config.json` next to the checkpoint so `evaluate`
/// can rebuild the same data pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Directory holding `vocab.json`, `train.jsonl` and `val.jsonl`
    pub input_dir: PathBuf,
    /// Directory for checkpoints, `metrics.csv` and `log.txt`; recreated on every run
    pub save_dir: PathBuf,
    pub lr: f64,
    pub weight_decay: f64,
    pub num_epoch: usize,
    pub batch_size: usize,
    pub seed: u64,
    pub dim_word: usize,
    pub dim_hidden: usize,
    pub num_layers: usize,
    /// Dropout between stacked encoder layers
    pub dropout: f64,
    /// Dropout on word embeddings
    pub word_dropout: f64,
    pub bidirectional: bool,
    /// Epochs after which the learning rate is multiplied by `gamma`
    pub milestones: Vec<usize>,
    pub gamma: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data"),
            save_dir: PathBuf::from("checkpoints"),
            lr: 1e-3,
            weight_decay: 1e-5,
            num_epoch: 10,
            batch_size: 16,
            seed: 666,
            dim_word: 300,
            dim_hidden: 1024,
            num_layers: 2,
            dropout: 0.2,
            word_dropout: 0.3,
            bidirectional: false,
            milestones: vec![3],
            gamma: 0.1,
        }
    }
}

impl TrainConfig {
    pub fn vocab_path(&self) -> PathBuf {
        self.input_dir.join("vocab.json")
    }

    pub fn train_path(&self) -> PathBuf {
        self.input_dir.join("train.jsonl")
    }

    pub fn val_path(&self) -> PathBuf {
        self.input_dir.join("val.jsonl")
    }

    /// Classifier architecture for this run and the given vocabulary
    pub fn classifier_config(&self, vocab: &Vocab) -> GruClassifierConfig {
        GruClassifierConfig::new(
            vocab.num_words(),
            vocab.num_answers(),
            self.dim_word,
            self.dim_hidden,
        )
        .with_num_layers(self.num_layers)
        .with_dropout(self.dropout)
        .with_word_dropout(self.word_dropout)
        .with_bidirectional(self.bidirectional)
    }

    /// `(name, value)` pairs of every setting, in declaration order
    pub fn describe(&self) -> Result<Vec<(String, String)>> {
        let value = serde_json::to_value(self).context("Cannot serialise train config")?;
        let fields = value
            .as_object()
            .context("Train config did not serialise to an object")?;

        // serde_json without `preserve_order` sorts keys; keep declaration order instead
        let order = [
            "input_dir",
            "save_dir",
            "lr",
            "weight_decay",
            "num_epoch",
            "batch_size",
            "seed",
            "dim_word",
            "dim_hidden",
            "num_layers",
            "dropout",
            "word_dropout",
            "bidirectional",
            "milestones",
            "gamma",
        ];
        Ok(order
            .iter()
            .filter_map(|&name| fields.get(name).map(|v| (name.to_string(), v.to_string())))
            .collect())
    }
}

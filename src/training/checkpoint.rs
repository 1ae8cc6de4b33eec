//! Run directory layout and model persistence
//!
//! ```text
//! save_dir/
//!   train_config.json   run settings
//!   classifier.json     model architecture
//!   model.mpk           weights (half precision), overwritten every epoch
//!   metrics.csv         one row per epoch
//!   log.txt             training log
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, ensure, Context, Result};
use burn::config::Config;
use burn::module::Module;
use burn::record::{CompactRecorder, Recorder};
use burn::tensor::backend::Backend;

use super::config::TrainConfig;
use super::model::{GruClassifier, GruClassifierConfig};

const TRAIN_CONFIG_FILE: &str = "train_config.json";
const MODEL_CONFIG_FILE: &str = "classifier.json";
const MODEL_FILE: &str = "model";

/// Reads and writes everything a run leaves in its save directory
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Start a fresh run directory, deleting any previous content
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .with_context(|| format!("Cannot clear '{}'", dir.display()))?;
        }
        fs::create_dir_all(&dir).with_context(|| format!("Cannot create '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Open the directory of a finished run
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        ensure!(
            dir.is_dir(),
            "'{}' is not a run directory. Have you run 'train' first?",
            dir.display()
        );
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join("log.txt")
    }

    pub fn save_train_config(&self, config: &TrainConfig) -> Result<()> {
        let path = self.dir.join(TRAIN_CONFIG_FILE);
        let json = serde_json::to_string_pretty(config)?;
        fs::write(&path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;

        tracing::debug!("Saved run settings to '{}'", path.display());
        Ok(())
    }

    pub fn load_train_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join(TRAIN_CONFIG_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Malformed '{}'", path.display()))
    }

    pub fn save_model_config(&self, config: &GruClassifierConfig) -> Result<()> {
        let path = self.dir.join(MODEL_CONFIG_FILE);
        config
            .save(&path)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }

    pub fn load_model_config(&self) -> Result<GruClassifierConfig> {
        let path = self.dir.join(MODEL_CONFIG_FILE);
        GruClassifierConfig::load(&path)
            .map_err(|err| anyhow!("Cannot load '{}': {err:?}", path.display()))
    }

    /// Write the weights to `model.mpk`, replacing the previous epoch's
    pub fn save_model<B: Backend>(&self, model: &GruClassifier<B>) -> Result<()> {
        let path = self.dir.join(MODEL_FILE);
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Cannot save weights to '{}'", path.display()))?;

        tracing::debug!("Saved weights to '{}'", path.display());
        Ok(())
    }

    /// Load saved weights into `model`, which must share their architecture
    pub fn load_model<B: Backend>(
        &self,
        model: GruClassifier<B>,
        device: &B::Device,
    ) -> Result<GruClassifier<B>> {
        let path = self.dir.join(MODEL_FILE);
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load weights from '{}'", path.display()))?;

        Ok(model.load_record(record))
    }
}

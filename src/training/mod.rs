//! # Question Classifier Training
//!
//! End-to-end driver around the encoders: load a tokenised question/answer
//! dataset, train a [`GruClassifier`] with Adam and step learning-rate decay,
//! and evaluate saved runs.
//!
//! ## Components
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | [`TrainConfig`], the settings of one run |
//! | [`data`] | vocabulary, JSON-lines dataset and padding batcher |
//! | [`model`] | embedding + encoder + MLP classifier |
//! | [`metrics`] | smoothed loss meters and `metrics.csv` |
//! | [`scheduler`] | multi-step learning-rate decay |
//! | [`checkpoint`] | run directory and weight persistence |
//! | [`logging`] | stdout + `log.txt` tracing subscriber |
//! | [`trainer`] | [`train`], [`validate`] and [`evaluate`] loops |
//!
//! ## Usage
//!
//! ```ignore
//! use burn::backend::{Autodiff, NdArray};
//! use varlen_gru::training::*;
//!
//! let config = TrainConfig::default();
//! let checkpoints = CheckpointManager::create(&config.save_dir)?;
//! init_logging(Some(&checkpoints.log_path()))?;
//!
//! let mut ctx = TrainingContext::new(config, checkpoints)?;
//! let model = train::<Autodiff<NdArray<f32>>>(&mut ctx, &Default::default())?;
//! ```

pub mod checkpoint;
pub mod config;
pub mod data;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod scheduler;
pub mod trainer;

pub use checkpoint::CheckpointManager;
pub use config::TrainConfig;
pub use data::{QuestionBatch, QuestionBatcher, QuestionDataset, QuestionSample, Vocab, PAD_INDEX};
pub use logging::init_logging;
pub use metrics::{EpochLog, EpochMetrics, MetricLogger, SmoothedValue};
pub use model::{ClassificationOutput, GruClassifier, GruClassifierConfig};
pub use scheduler::MultiStepLr;
pub use trainer::{evaluate, train, validate, TrainingContext};

//! Training and evaluation loops
//!
//! A run validates once before training, then for every epoch trains over
//! the shuffled training set, validates, appends to `metrics.csv`, saves the
//! weights and advances the learning-rate schedule.

use std::path::Path;

use anyhow::{ensure, Context, Result};
use burn::data::dataloader::{DataLoader, DataLoaderBuilder};
use burn::data::dataset::Dataset;
use burn::module::{AutodiffModule, Module};
use burn::optim::decay::WeightDecayConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::ElementConversion;
use tracing::info;

use super::checkpoint::CheckpointManager;
use super::config::TrainConfig;
use super::data::{QuestionBatch, QuestionBatcher, QuestionDataset, Vocab};
use super::metrics::{EpochLog, EpochMetrics, MetricLogger};
use super::model::{count_correct, GruClassifier};
use super::scheduler::MultiStepLr;

/// Mutable state shared by the epochs of one run
pub struct TrainingContext {
    pub config: TrainConfig,
    pub checkpoints: CheckpointManager,
    pub meters: MetricLogger,
    pub scheduler: MultiStepLr,
    pub epoch_log: EpochLog,
}

impl TrainingContext {
    /// Build the context on top of an already created run directory
    pub fn new(config: TrainConfig, checkpoints: CheckpointManager) -> Result<Self> {
        let epoch_log = EpochLog::create(checkpoints.dir())?;
        let scheduler = MultiStepLr::new(config.lr, config.milestones.clone(), config.gamma);

        Ok(Self {
            config,
            checkpoints,
            meters: MetricLogger::new("  "),
            scheduler,
            epoch_log,
        })
    }

    /// `progress: <epoch fraction>  <meters>  lr: <rate>`
    pub fn progress_line(&self, epoch: usize, iteration: usize, num_batches: usize, lr: f64) -> String {
        let progress = epoch as f64 + iteration as f64 / num_batches as f64;
        let delimiter = self.meters.delimiter();
        format!("progress: {progress:.3}{delimiter}{}{delimiter}lr: {lr:.6}", self.meters)
    }
}

/// Train a classifier as described by `ctx.config`
///
/// # Returns
/// The model after the last epoch; its weights are also in the run directory.
pub fn train<B: AutodiffBackend>(
    ctx: &mut TrainingContext,
    device: &B::Device,
) -> Result<GruClassifier<B>> {
    let config = ctx.config.clone();
    ensure!(config.batch_size > 0, "batch size must be positive");

    for (name, value) in config.describe()? {
        info!("{name}:{value}");
    }
    B::seed(config.seed);

    info!("Create train_loader and val_loader.........");
    let vocab = Vocab::load(&config.vocab_path())?;
    let train_set = QuestionDataset::load(&config.train_path(), &vocab)?;
    let val_set = QuestionDataset::load(&config.val_path(), &vocab)?;
    ensure!(!train_set.is_empty(), "'{}' holds no samples", config.train_path().display());
    ensure!(!val_set.is_empty(), "'{}' holds no samples", config.val_path().display());

    let num_batches = train_set.len().div_ceil(config.batch_size);
    let train_loader = DataLoaderBuilder::new(QuestionBatcher::<B>::new(device.clone()))
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(1)
        .build(train_set);
    let val_loader = DataLoaderBuilder::new(QuestionBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(config.batch_size)
        .num_workers(1)
        .build(val_set);

    info!("Create model.........");
    let model_config = config.classifier_config(&vocab);
    let mut model: GruClassifier<B> = model_config
        .init(device)
        .context("Invalid classifier configuration")?;
    info!("{model_config}");
    info!("Parameters: {}", model.num_params());

    ctx.checkpoints.save_train_config(&config)?;
    ctx.checkpoints.save_model_config(&model_config)?;

    let mut optim = AdamConfig::new()
        .with_weight_decay(Some(WeightDecayConfig::new(config.weight_decay as f32)))
        .init();

    let accuracy = validate(&model.valid(), val_loader.as_ref())?;
    info!("Valid Accuracy: {accuracy:.4}");

    info!("Start training........");
    let log_every = (num_batches / 100).max(1);

    for epoch in 0..config.num_epoch {
        ctx.meters.reset();
        let lr = ctx.scheduler.lr();

        for (index, batch) in train_loader.iter().enumerate() {
            let iteration = index + 1;

            let output = model.forward_loss(batch)?;
            let loss = output.loss.clone().into_scalar().elem::<f64>();
            ensure!(loss.is_finite(), "loss diverged at epoch {} iteration {iteration}", epoch + 1);

            let grads = GradientsParams::from_grads(output.loss.backward(), &model);
            model = optim.step(lr, model, grads);
            ctx.meters.update("loss", loss);

            if iteration % log_every == 0 {
                info!("{}", ctx.progress_line(epoch, iteration, num_batches, lr));
            }
        }

        let accuracy = validate(&model.valid(), val_loader.as_ref())?;
        info!("Valid Accuracy: {accuracy:.4}");

        let train_loss = ctx.meters.get("loss").map_or(0.0, |meter| meter.global_avg());
        ctx.epoch_log.log(&EpochMetrics {
            epoch: epoch + 1,
            train_loss,
            val_accuracy: accuracy,
            lr,
        })?;
        ctx.checkpoints.save_model(&model)?;
        ctx.scheduler.step();
    }

    Ok(model)
}

/// Fraction of correctly classified samples over a loader
pub fn validate<B: Backend>(
    model: &GruClassifier<B>,
    loader: &dyn DataLoader<QuestionBatch<B>>,
) -> Result<f64> {
    let mut correct = 0;
    let mut count = 0;

    for batch in loader.iter() {
        count += batch.lengths.len();
        let logits = model.forward(batch.tokens, &batch.lengths)?;
        correct += count_correct(logits, batch.answers);
    }

    ensure!(count > 0, "validation set is empty");
    Ok(correct as f64 / count as f64)
}

/// Accuracy of a saved run on `input_dir/val.jsonl`
pub fn evaluate<B: Backend>(input_dir: &Path, save_dir: &Path, device: &B::Device) -> Result<f64> {
    let checkpoints = CheckpointManager::open(save_dir)?;
    let train_config = checkpoints.load_train_config()?;
    let model_config = checkpoints.load_model_config()?;

    let config = TrainConfig {
        input_dir: input_dir.to_path_buf(),
        ..train_config
    };
    let vocab = Vocab::load(&config.vocab_path())?;
    ensure!(
        vocab.num_words() == model_config.num_words && vocab.num_answers() == model_config.num_classes,
        "vocabulary in '{}' does not match the saved model",
        input_dir.display()
    );

    let model = checkpoints.load_model(model_config.init::<B>(device)?, device)?;
    let val_set = QuestionDataset::load(&config.val_path(), &vocab)?;
    info!("Evaluating {} samples", val_set.len());

    let loader = DataLoaderBuilder::new(QuestionBatcher::<B>::new(device.clone()))
        .batch_size(config.batch_size.max(1))
        .num_workers(1)
        .build(val_set);

    let accuracy = validate(&model, loader.as_ref())?;
    info!("Valid Accuracy: {accuracy:.4}");
    Ok(accuracy)
}

//! Command line entry points: `train` and `evaluate`.

pub mod commands;

use anyhow::Result;
use burn::backend::{Autodiff, NdArray};
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};
use varlen_gru::training::{self, init_logging, CheckpointManager, TrainConfig, TrainingContext};

type EvalBackend = NdArray<f32>;
type TrainBackend = Autodiff<EvalBackend>;

#[derive(Parser, Debug)]
#[command(
    name = "varlen-gru",
    version,
    about = "Train and evaluate a GRU question classifier over variable-length questions."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    let config: TrainConfig = args.into();

    // The run directory is recreated before the log file is opened inside it
    let checkpoints = CheckpointManager::create(&config.save_dir)?;
    init_logging(Some(&checkpoints.log_path()))?;

    let device = Default::default();
    let mut ctx = TrainingContext::new(config, checkpoints)?;
    training::train::<TrainBackend>(&mut ctx, &device)?;

    tracing::info!("Training complete. Weights saved in '{}'", ctx.checkpoints.dir().display());
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    init_logging(None)?;

    let device = Default::default();
    let accuracy = training::evaluate::<EvalBackend>(&args.input_dir, &args.save_dir, &device)?;

    println!("{accuracy:.4}");
    Ok(())
}

use std::path::PathBuf;

use clap::{Args, Subcommand};
use varlen_gru::training::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a classifier; the save directory is wiped first
    Train(TrainArgs),

    /// Report validation accuracy of a finished run
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory with vocab.json, train.jsonl and val.jsonl
    #[arg(long)]
    pub input_dir: PathBuf,

    /// Where weights, configs, metrics.csv and log.txt are written
    #[arg(long)]
    pub save_dir: PathBuf,

    #[arg(long, default_value_t = 0.001)]
    pub lr: f64,

    #[arg(long, default_value_t = 1e-5)]
    pub weight_decay: f64,

    #[arg(long, default_value_t = 10)]
    pub num_epoch: usize,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 666)]
    pub seed: u64,

    /// Word embedding size
    #[arg(long, default_value_t = 300)]
    pub dim_word: usize,

    /// Encoder output size
    #[arg(long, default_value_t = 1024)]
    pub dim_hidden: usize,

    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,

    /// Dropout between encoder layers
    #[arg(long, default_value_t = 0.2)]
    pub dropout: f64,

    /// Dropout on word embeddings
    #[arg(long, default_value_t = 0.3)]
    pub word_dropout: f64,

    /// Use the bidirectional encoder
    #[arg(long)]
    pub bidirectional: bool,

    /// Comma-separated epochs at which the learning rate decays
    #[arg(long, value_delimiter = ',', default_values_t = [3])]
    pub milestones: Vec<usize>,

    /// Decay factor applied at every milestone
    #[arg(long, default_value_t = 0.1)]
    pub gamma: f64,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            input_dir: a.input_dir,
            save_dir: a.save_dir,
            lr: a.lr,
            weight_decay: a.weight_decay,
            num_epoch: a.num_epoch,
            batch_size: a.batch_size,
            seed: a.seed,
            dim_word: a.dim_word,
            dim_hidden: a.dim_hidden,
            num_layers: a.num_layers,
            dropout: a.dropout,
            word_dropout: a.word_dropout,
            bidirectional: a.bidirectional,
            milestones: a.milestones,
            gamma: a.gamma,
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory with vocab.json and val.jsonl
    #[arg(long)]
    pub input_dir: PathBuf,

    /// Directory of a finished training run
    #[arg(long)]
    pub save_dir: PathBuf,
}

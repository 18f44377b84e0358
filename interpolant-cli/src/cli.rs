//! Command-line arguments

use clap::Parser;
use std::path::PathBuf;

use crate::runner::RunOptions;

/// Model code passed to fastembed when `--model` is not given
pub const DEFAULT_MODEL: &str = "Qdrant/all-MiniLM-L6-v2-onnx";

#[derive(Debug, Parser)]
#[command(name = "text-interpolant")]
#[command(about = "Stochastic interpolant between two sentence-embedding distributions")]
#[command(version)]
pub struct Args {
    /// Sentence whose embedding is the initial density's mean
    #[arg(long, default_value = "initial sentence")]
    pub initial_sentence: String,

    /// Sentence whose embedding is the final density's mean
    #[arg(long, default_value = "final sentence")]
    pub final_sentence: String,

    /// Number of trajectories to integrate
    #[arg(long, short = 'n', default_value_t = 1000)]
    pub num_samples: usize,

    /// Integration horizon
    #[arg(long, default_value_t = 1.0)]
    pub time_interval: f64,

    /// Nominal time step (the adaptive solver chooses its own steps)
    #[arg(long, default_value_t = 0.01)]
    pub time_step: f64,

    /// fastembed model code
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Directory for downloaded model weights
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Also compute the cross-entropy between the endpoint densities
    #[arg(long)]
    pub cross_entropy: bool,

    /// Print a JSON report instead of plain text
    #[arg(long)]
    pub json: bool,
}

impl Args {
    /// Options for [`crate::runner::run`]
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            initial_sentence: self.initial_sentence.clone(),
            final_sentence: self.final_sentence.clone(),
            num_samples: self.num_samples,
            time_interval: self.time_interval,
            time_step: self.time_step,
            cross_entropy: self.cross_entropy,
        }
    }
}

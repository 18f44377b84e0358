//! Text Interpolant CLI Library
//!
//! Argument parsing and the end-to-end run behind the `text-interpolant`
//! binary. `run` takes any `TextEncoder`, so the whole pipeline can be
//! exercised without downloading a model.

pub mod cli;
pub mod runner;

pub use cli::Args;
pub use runner::{run, RunOptions, RunOutput, RunReport};

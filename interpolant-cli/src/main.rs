//! Text Interpolant Entry Point
//!
//! Loads a sentence encoder, builds the initial and final densities from two
//! sentences, transports samples between them and prints the likelihoods.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use interpolant_cli::{run, Args};
use text_interpolant::{CachedEncoder, FastEmbedConfig, FastEmbedEncoder};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "interpolant_cli=info,text_interpolant=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = FastEmbedConfig {
        model_code: args.model.clone(),
        cache_dir: args.cache_dir.clone(),
        ..FastEmbedConfig::default()
    };

    tracing::info!("Loading encoder {}", config.model_code);
    let encoder = FastEmbedEncoder::from_pretrained_with_config(config)
        .context("Failed to load sentence encoder")?;
    let encoder = Arc::new(CachedEncoder::new(encoder));

    let options = args.run_options();
    let output = run(encoder, &options)?;

    if args.json {
        let report = output.to_report(&options);
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", output.render_text());
    }

    Ok(())
}

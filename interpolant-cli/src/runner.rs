//! End-to-end run: build both densities, sample, score, report

use std::sync::Arc;

use anyhow::Context;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use text_interpolant::{
    EmbeddingDensity, InterpolantConfig, StochasticInterpolantModel, TextEncoder,
};

/// Parameters of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    pub initial_sentence: String,
    pub final_sentence: String,
    pub num_samples: usize,
    pub time_interval: f64,
    pub time_step: f64,
    /// Also integrate the cross-entropy
    pub cross_entropy: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            initial_sentence: "initial sentence".to_string(),
            final_sentence: "final sentence".to_string(),
            num_samples: 1000,
            time_interval: 1.0,
            time_step: 0.01,
            cross_entropy: false,
        }
    }
}

/// Results of one run
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub samples: Array2<f64>,
    pub likelihood: Array1<f64>,
    pub cross_entropy: Option<f64>,
}

/// Serializable summary of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub options: RunOptions,
    pub dimension: usize,
    pub likelihood: Vec<f64>,
    pub samples: Vec<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cross_entropy: Option<f64>,
}

/// Run the interpolant with an already-loaded encoder
pub fn run<E: TextEncoder>(encoder: Arc<E>, options: &RunOptions) -> anyhow::Result<RunOutput> {
    let initial = EmbeddingDensity::from_sentence(encoder.clone(), &options.initial_sentence)
        .context("Failed to build initial density")?;
    let final_model = EmbeddingDensity::from_sentence(encoder, &options.final_sentence)
        .context("Failed to build final density")?;

    let config = InterpolantConfig::new(options.time_interval, options.time_step);
    let model = StochasticInterpolantModel::new(Arc::new(initial), Arc::new(final_model), config)
        .context("Failed to build interpolant")?;

    tracing::info!("Generating {} samples", options.num_samples);
    let samples = model
        .generate_samples(options.num_samples)
        .context("Sample generation failed")?;
    let likelihood = model
        .likelihood(samples.view())
        .context("Likelihood evaluation failed")?;

    let cross_entropy = if options.cross_entropy {
        let value = model.cross_entropy().context("Cross-entropy failed")?;
        tracing::info!("Cross-entropy: {}", value);
        Some(value)
    } else {
        None
    };

    Ok(RunOutput {
        samples,
        likelihood,
        cross_entropy,
    })
}

impl RunOutput {
    pub fn to_report(&self, options: &RunOptions) -> RunReport {
        RunReport {
            options: options.clone(),
            dimension: self.samples.ncols(),
            likelihood: self.likelihood.to_vec(),
            samples: self.samples.rows().into_iter().map(|r| r.to_vec()).collect(),
            cross_entropy: self.cross_entropy,
        }
    }

    /// Plain-text rendering for stdout
    pub fn render_text(&self) -> String {
        let mut out = format!("Likelihood given samples:  {}\n", self.likelihood);
        out.push_str(&format!("Samples:  {}\n", self.samples));
        if let Some(value) = self.cross_entropy {
            out.push_str(&format!("Cross-entropy:  {}\n", value));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use text_interpolant::{CachedEncoder, Result};

    struct BagOfLettersEncoder;

    impl TextEncoder for BagOfLettersEncoder {
        fn encode(&self, sentences: &[&str]) -> Result<Array2<f32>> {
            let mut out = Array2::zeros((sentences.len(), 8));
            for (i, s) in sentences.iter().enumerate() {
                for b in s.bytes() {
                    out[[i, (b % 8) as usize]] += 0.1;
                }
            }
            Ok(out)
        }

        fn dimension(&self) -> usize {
            8
        }
    }

    fn options(num_samples: usize) -> RunOptions {
        RunOptions {
            num_samples,
            ..RunOptions::default()
        }
    }

    #[test]
    fn test_run_produces_scored_samples() {
        let encoder = Arc::new(CachedEncoder::new(BagOfLettersEncoder));
        let output = run(encoder, &options(12)).unwrap();
        assert_eq!(output.samples.dim(), (12, 8));
        assert_eq!(output.likelihood.len(), 12);
        assert!((output.likelihood.sum() - 1.0).abs() < 1e-12);
        assert!(output.cross_entropy.is_none());
    }

    #[test]
    fn test_run_with_cross_entropy() {
        let encoder = Arc::new(BagOfLettersEncoder);
        let opts = RunOptions {
            cross_entropy: true,
            ..options(2)
        };
        let output = run(encoder, &opts).unwrap();
        assert_eq!(output.cross_entropy, Some(0.0));
        assert!(output.render_text().contains("Cross-entropy:"));
    }

    #[test]
    fn test_run_rejects_zero_samples() {
        let err = run(Arc::new(BagOfLettersEncoder), &options(0)).unwrap_err();
        assert!(format!("{:#}", err).contains("num_samples"));
    }

    #[test]
    fn test_report_serializes() {
        let opts = options(3);
        let output = run(Arc::new(BagOfLettersEncoder), &opts).unwrap();
        let report = output.to_report(&opts);
        assert_eq!(report.dimension, 8);
        assert_eq!(report.samples.len(), 3);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["options"]["num_samples"], 3);
        assert!(json.get("cross_entropy").is_none());
        assert_eq!(json["likelihood"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_render_text_layout() {
        let output = run(Arc::new(BagOfLettersEncoder), &options(2)).unwrap();
        let text = output.render_text();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("Likelihood given samples:  ["));
        assert!(text.contains("Samples:  [["));
    }
}

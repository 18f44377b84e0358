//! Pretrained sentence encoders via fastembed
//!
//! ONNX sentence-transformer models, downloaded on first use into the
//! discovered cache directory.

use super::discovery::find_model_cache_dir;
use super::encoder::TextEncoder;
use crate::error::{InterpolantError, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Model code used when none is configured
pub const DEFAULT_MODEL_CODE: &str = "Qdrant/all-MiniLM-L6-v2-onnx";

/// FastEmbed encoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FastEmbedConfig {
    /// Model code as listed by fastembed (default: all-MiniLM-L6-v2)
    pub model_code: String,
    /// Explicit weight cache directory (default: discovered)
    pub cache_dir: Option<PathBuf>,
    /// Maximum token length per sentence (default: 512)
    pub max_length: usize,
    /// Batch size for encoding (default: 256)
    pub batch_size: usize,
    /// Show download progress on first load (default: false)
    pub show_download_progress: bool,
}

impl Default for FastEmbedConfig {
    fn default() -> Self {
        Self {
            model_code: DEFAULT_MODEL_CODE.to_string(),
            cache_dir: None,
            max_length: 512,
            batch_size: 256,
            show_download_progress: false,
        }
    }
}

/// fastembed-backed sentence encoder
pub struct FastEmbedEncoder {
    model: TextEmbedding,
    config: FastEmbedConfig,
    dimension: usize,
}

impl FastEmbedEncoder {
    /// Load the default model
    pub fn from_pretrained() -> Result<Self> {
        Self::from_pretrained_with_config(FastEmbedConfig::default())
    }

    /// Load a model with custom configuration
    pub fn from_pretrained_with_config(config: FastEmbedConfig) -> Result<Self> {
        let model = resolve_model(&config.model_code)?;
        let cache_dir = find_model_cache_dir(config.cache_dir.as_deref())?;

        log::info!(
            "Loading {} (cache: {})",
            config.model_code,
            cache_dir.display()
        );

        let options = InitOptions::new(model)
            .with_cache_dir(cache_dir)
            .with_max_length(config.max_length)
            .with_show_download_progress(config.show_download_progress);

        let model = TextEmbedding::try_new(options).map_err(|e| {
            InterpolantError::model(format!("Failed to load {}: {}", config.model_code, e))
        })?;

        // Get dimension by encoding test string
        let test_embed = model
            .embed(vec!["test"], None)
            .map_err(|e| InterpolantError::model(format!("Failed to encode test string: {}", e)))?;
        let dimension = test_embed
            .first()
            .map(|v| v.len())
            .ok_or_else(|| InterpolantError::model("Model returned no embedding for test string"))?;

        log::info!(
            "Loaded {} ({}d, max {} tokens)",
            config.model_code,
            dimension,
            config.max_length
        );

        Ok(Self {
            model,
            config,
            dimension,
        })
    }

    /// Get configuration
    pub fn config(&self) -> &FastEmbedConfig {
        &self.config
    }
}

impl TextEncoder for FastEmbedEncoder {
    fn encode(&self, sentences: &[&str]) -> Result<Array2<f32>> {
        if sentences.is_empty() {
            return Ok(Array2::zeros((0, self.dimension)));
        }

        let embeddings = self
            .model
            .embed(sentences.to_vec(), Some(self.config.batch_size))
            .map_err(|e| InterpolantError::embedding(format!("Failed to encode texts: {}", e)))?;

        let mut flat = Vec::with_capacity(sentences.len() * self.dimension);
        for embedding in embeddings {
            if embedding.len() != self.dimension {
                return Err(InterpolantError::dimension_mismatch(
                    self.dimension,
                    embedding.len(),
                ));
            }
            flat.extend(embedding);
        }

        Array2::from_shape_vec((sentences.len(), self.dimension), flat)
            .map_err(|e| InterpolantError::embedding(format!("Failed to assemble batch: {}", e)))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Look a model code up in fastembed's registry
fn resolve_model(model_code: &str) -> Result<EmbeddingModel> {
    let supported = TextEmbedding::list_supported_models();
    supported
        .iter()
        .find(|info| info.model_code.eq_ignore_ascii_case(model_code))
        .map(|info| info.model.clone())
        .ok_or_else(|| {
            let known: Vec<&str> = supported.iter().map(|i| i.model_code.as_str()).collect();
            InterpolantError::model(format!(
                "Unknown model '{}'. Supported: {}",
                model_code,
                known.join(", ")
            ))
        })
}

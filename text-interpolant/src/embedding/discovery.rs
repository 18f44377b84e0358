//! Model cache directory discovery
//!
//! Finds where pretrained encoder weights live (or should be downloaded to).

use crate::error::{InterpolantError, Result};
use std::path::{Path, PathBuf};

/// Environment variable pointing at a shared model directory
pub const MODELS_PATH_ENV: &str = "TEXT_INTERPOLANT_MODELS_PATH";

/// Cache directory variable honoured by fastembed itself
pub const FASTEMBED_CACHE_ENV: &str = "FASTEMBED_CACHE_PATH";

/// Find the model cache directory with priority:
/// 1. Explicit path from the caller (CLI `--cache-dir`)
/// 2. TEXT_INTERPOLANT_MODELS_PATH environment variable
/// 3. FASTEMBED_CACHE_PATH environment variable
/// 4. User home directory (~/.cache/text-interpolant/models)
/// 5. `.fastembed_cache` in the working directory
pub fn find_model_cache_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    // Priority 1: explicit
    if let Some(path) = explicit {
        if path.exists() && !path.is_dir() {
            return Err(InterpolantError::invalid_path(format!(
                "Model cache path is not a directory: {}",
                path.display()
            )));
        }
        log::info!("Using model cache dir: {}", path.display());
        return Ok(path.to_path_buf());
    }

    // Priority 2 and 3: environment
    for var in [MODELS_PATH_ENV, FASTEMBED_CACHE_ENV] {
        if let Ok(value) = std::env::var(var) {
            if value.is_empty() {
                continue;
            }
            let path = PathBuf::from(&value);
            if path.is_file() {
                log::warn!("{} points at a file, ignoring: {}", var, value);
                continue;
            }
            log::info!("Using {}: {}", var, path.display());
            return Ok(path);
        }
    }

    // Priority 4: user home directory
    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        return Ok(PathBuf::from(home)
            .join(".cache")
            .join("text-interpolant")
            .join("models"));
    }

    Ok(PathBuf::from(".fastembed_cache"))
}

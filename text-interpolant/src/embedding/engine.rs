//! Caching encoder wrapper
//!
//! Repeated sentences are encoded once and served from a DashMap afterwards.

use super::encoder::TextEncoder;
use crate::error::{InterpolantError, Result};
use dashmap::DashMap;
use ndarray::Array2;

/// Encoder wrapper with a per-sentence cache
///
/// Sampling encodes the same placeholder sentence once per requested sample,
/// so without the cache a 1000-sample run would push 1000 identical strings
/// through the model.
pub struct CachedEncoder<E> {
    inner: E,
    cache: DashMap<String, Vec<f32>>,
}

impl<E: TextEncoder> CachedEncoder<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    /// Get the wrapped encoder
    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Get cache size
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    /// Clear the cache
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl<E: TextEncoder> TextEncoder for CachedEncoder<E> {
    fn encode(&self, sentences: &[&str]) -> Result<Array2<f32>> {
        let dimension = self.inner.dimension();

        // Check cache for all texts
        let mut rows: Vec<Option<Vec<f32>>> = sentences
            .iter()
            .map(|text| self.cache.get(*text).map(|v| v.clone()))
            .collect();

        // Unique uncached texts, first occurrence wins
        let mut uncached: Vec<&str> = Vec::new();
        for (text, cached) in sentences.iter().zip(rows.iter()) {
            if cached.is_none() && !uncached.contains(text) {
                uncached.push(*text);
            }
        }

        if !uncached.is_empty() {
            let fresh = self.inner.encode(&uncached)?;
            if fresh.nrows() != uncached.len() {
                return Err(InterpolantError::embedding(format!(
                    "Encoder returned {} rows for {} sentences",
                    fresh.nrows(),
                    uncached.len()
                )));
            }
            for (text, row) in uncached.iter().zip(fresh.rows()) {
                self.cache.insert(text.to_string(), row.to_vec());
            }
            for (text, slot) in sentences.iter().zip(rows.iter_mut()) {
                if slot.is_none() {
                    *slot = self.cache.get(*text).map(|v| v.clone());
                }
            }
        }

        let mut flat = Vec::with_capacity(sentences.len() * dimension);
        for row in rows.into_iter().flatten() {
            if row.len() != dimension {
                return Err(InterpolantError::dimension_mismatch(dimension, row.len()));
            }
            flat.extend(row);
        }

        Array2::from_shape_vec((sentences.len(), dimension), flat)
            .map_err(|e| InterpolantError::embedding(format!("Failed to assemble batch: {}", e)))
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }
}

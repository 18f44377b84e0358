//! Text encoder capability
//!
//! Anything that turns a list of sentences into a batch of fixed-width vectors.

use crate::error::Result;
use ndarray::Array2;

/// Sentence encoder shared by the density models
///
/// Implementations must return one row per input sentence, in input order,
/// and keep the row width equal to [`TextEncoder::dimension`] for the whole
/// lifetime of the encoder.
pub trait TextEncoder: Send + Sync {
    /// Encode a batch of sentences into an `(n, dimension)` array
    fn encode(&self, sentences: &[&str]) -> Result<Array2<f32>>;

    /// Width of every embedding produced by this encoder
    fn dimension(&self) -> usize;
}

/// Cosine similarity between two embeddings
///
/// Returns 0.0 when the lengths differ or either vector has zero norm.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

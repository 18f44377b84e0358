//! Sentence embedding density
//!
//! Pseudo-likelihood over a batch of embeddings: cosine similarity to a
//! reference mean embedding, normalized with a softmax across the batch.
//!
//! The normalizer is shared by every row of the batch, so a value only means
//! something relative to the other rows it was evaluated with. A batch of one
//! always scores exactly 1.0.

use std::sync::Arc;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

use crate::embedding::{cosine_similarity, TextEncoder};
use crate::error::{InterpolantError, Result};

/// Density model for one endpoint of the interpolant
///
/// Holds the shared encoder and a mean embedding kept in `f64`.
pub struct EmbeddingDensity<E> {
    encoder: Arc<E>,
    mean_embedding: Array1<f64>,
}

impl<E: TextEncoder> EmbeddingDensity<E> {
    /// Create a density around `mean_embedding`
    ///
    /// Fails if the mean width differs from the encoder's output width.
    pub fn new(encoder: Arc<E>, mean_embedding: Array1<f64>) -> Result<Self> {
        let expected = encoder.dimension();
        if mean_embedding.len() != expected {
            return Err(InterpolantError::dimension_mismatch(
                expected,
                mean_embedding.len(),
            ));
        }
        Ok(Self {
            encoder,
            mean_embedding,
        })
    }

    /// Create a density whose mean is the embedding of `sentence`
    pub fn from_sentence(encoder: Arc<E>, sentence: &str) -> Result<Self> {
        let encoded = encoder.encode(&[sentence])?;
        if encoded.nrows() != 1 {
            return Err(InterpolantError::embedding(format!(
                "Expected one embedding for the mean sentence, got {}",
                encoded.nrows()
            )));
        }
        let mean = encoded.row(0).mapv(f64::from);
        log::debug!("Mean embedding for {:?} ({}d)", sentence, mean.len());
        Self::new(encoder, mean)
    }

    /// Encode sentences with the underlying encoder
    pub fn encode(&self, sentences: &[&str]) -> Result<Array2<f32>> {
        self.encoder.encode(sentences)
    }

    /// Batch-relative pseudo-likelihood of each row of `samples`
    ///
    /// Returns one value per row; the values sum to 1 over the batch.
    pub fn likelihood(&self, samples: ArrayView2<'_, f64>) -> Result<Array1<f64>> {
        if samples.ncols() != self.mean_embedding.len() {
            return Err(InterpolantError::dimension_mismatch(
                self.mean_embedding.len(),
                samples.ncols(),
            ));
        }

        let sims: Array1<f64> = samples
            .rows()
            .into_iter()
            .map(|row| self.similarity_to_mean(row))
            .collect();

        Ok(softmax(sims.view()))
    }

    /// Upcast an encoder batch and score it
    pub fn likelihood_f32(&self, samples: ArrayView2<'_, f32>) -> Result<Array1<f64>> {
        let upcast = samples.mapv(f64::from);
        self.likelihood(upcast.view())
    }

    fn similarity_to_mean(&self, row: ArrayView1<'_, f64>) -> f64 {
        match (row.as_slice(), self.mean_embedding.as_slice()) {
            (Some(a), Some(b)) => cosine_similarity(a, b),
            _ => {
                let a = row.to_vec();
                let b = self.mean_embedding.to_vec();
                cosine_similarity(&a, &b)
            }
        }
    }

    /// Reference mean embedding
    pub fn mean_embedding(&self) -> ArrayView1<'_, f64> {
        self.mean_embedding.view()
    }

    /// Embedding width
    pub fn dimension(&self) -> usize {
        self.mean_embedding.len()
    }

    /// Shared encoder handle
    pub fn encoder(&self) -> &Arc<E> {
        &self.encoder
    }
}

/// Softmax over a 1-D view, max-subtracted
pub(crate) fn softmax(values: ArrayView1<'_, f64>) -> Array1<f64> {
    if values.is_empty() {
        return Array1::zeros(0);
    }
    let max = values.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
    let exp = values.mapv(|v| (v - max).exp());
    let total = exp.sum();
    exp / total
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ndarray::{array, Array2};

    /// Fixed-width stub encoder: each sentence maps to a one-hot by length
    pub(crate) struct StubEncoder {
        pub dimension: usize,
    }

    impl TextEncoder for StubEncoder {
        fn encode(&self, sentences: &[&str]) -> Result<Array2<f32>> {
            let mut out = Array2::zeros((sentences.len(), self.dimension));
            for (i, s) in sentences.iter().enumerate() {
                out[[i, s.len() % self.dimension]] = 1.0;
                out[[i, 0]] += 0.5;
            }
            Ok(out)
        }

        fn dimension(&self) -> usize {
            self.dimension
        }
    }

    fn density(mean: Array1<f64>) -> EmbeddingDensity<StubEncoder> {
        let encoder = Arc::new(StubEncoder {
            dimension: mean.len(),
        });
        EmbeddingDensity::new(encoder, mean).unwrap()
    }

    #[test]
    fn test_new_rejects_dimension_mismatch() {
        let encoder = Arc::new(StubEncoder { dimension: 4 });
        let err = EmbeddingDensity::new(encoder, array![1.0, 0.0]).err().unwrap();
        assert!(matches!(
            err,
            InterpolantError::DimensionMismatch {
                expected: 4,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_from_sentence_uses_encoding_as_mean() {
        let encoder = Arc::new(StubEncoder { dimension: 4 });
        let model = EmbeddingDensity::from_sentence(encoder, "abc").unwrap();
        assert_eq!(model.mean_embedding(), array![0.5, 0.0, 0.0, 1.0].view());
        assert_eq!(model.dimension(), 4);
    }

    #[test]
    fn test_encode_delegates_to_encoder() {
        let model = density(array![1.0, 0.0, 0.0, 0.0]);
        let out = model.encode(&["a", "bb"]).unwrap();
        assert_eq!(out.dim(), (2, 4));
        assert_eq!(out.row(0), array![0.5_f32, 1.0, 0.0, 0.0].view());
    }

    #[test]
    fn test_likelihood_two_samples_matches_softmax_of_similarities() {
        let model = density(array![1.0, 0.0, 0.0, 0.0]);
        let samples = array![[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]];
        let lik = model.likelihood(samples.view()).unwrap();

        let e = std::f64::consts::E;
        assert!((lik[0] - e / (e + 1.0)).abs() < 1e-12);
        assert!((lik[1] - 1.0 / (e + 1.0)).abs() < 1e-12);
        assert!((lik[0] - 0.731).abs() < 1e-3);
        assert!((lik[1] - 0.269).abs() < 1e-3);
    }

    #[test]
    fn test_likelihood_sums_to_one() {
        let model = density(array![0.3, -1.2, 2.0, 0.7]);
        for n in [1usize, 3, 10] {
            let samples = Array2::from_shape_fn((n, 4), |(i, j)| {
                ((i * 7 + j * 3) as f64).sin() * (1.0 + i as f64)
            });
            let lik = model.likelihood(samples.view()).unwrap();
            assert_eq!(lik.len(), n);
            assert!(lik.iter().all(|&p| (0.0..=1.0).contains(&p)));
            assert!((lik.sum() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_single_sample_is_always_one() {
        let model = density(array![1.0, 0.0, 0.0, 0.0]);
        for sample in [
            array![[1.0, 0.0, 0.0, 0.0]],
            array![[-5.0, 3.0, 0.1, 9.0]],
            array![[0.0, 0.0, 0.0, 0.0]],
        ] {
            let lik = model.likelihood(sample.view()).unwrap();
            assert_eq!(lik.to_vec(), vec![1.0]);
        }
    }

    #[test]
    fn test_likelihood_depends_on_whole_batch() {
        let model = density(array![1.0, 0.0, 0.0, 0.0]);
        let pair = array![[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]];
        let triple = array![
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0]
        ];
        let a = model.likelihood(pair.view()).unwrap();
        let b = model.likelihood(triple.view()).unwrap();
        assert!((a[0] - b[0]).abs() > 1e-3);
    }

    #[test]
    fn test_likelihood_rejects_wrong_width() {
        let model = density(array![1.0, 0.0, 0.0, 0.0]);
        let samples = array![[1.0, 0.0]];
        assert!(model.likelihood(samples.view()).is_err());
    }

    #[test]
    fn test_likelihood_empty_batch() {
        let model = density(array![1.0, 0.0, 0.0, 0.0]);
        let samples = Array2::<f64>::zeros((0, 4));
        assert!(model.likelihood(samples.view()).unwrap().is_empty());
    }

    #[test]
    fn test_likelihood_f32_upcasts() {
        let model = density(array![1.0, 0.0, 0.0, 0.0]);
        let samples = array![[1.0_f32, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]];
        let lik = model.likelihood_f32(samples.view()).unwrap();
        assert!((lik[0] - 0.7310585786300049).abs() < 1e-12);
    }

    #[test]
    fn test_softmax_is_shift_invariant() {
        let a = softmax(array![1.0, 2.0, 3.0].view());
        let b = softmax(array![1001.0, 1002.0, 1003.0].view());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
    }
}

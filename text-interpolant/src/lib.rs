//! Text Stochastic Interpolant
//!
//! Transport between two sentence-embedding distributions along a
//! time-dependent ODE, with batch-relative likelihoods and a quadrature
//! divergence between the endpoint densities.
//!
//! ## Components
//!
//! - **Encoders** - `TextEncoder` capability, `CachedEncoder`, and a
//!   fastembed-backed `FastEmbedEncoder` (feature `fastembed`)
//! - **Density** - cosine similarity to a mean embedding, softmax across the batch
//! - **Schedule** - `interpolant(t)` and `diffusivity(t)` elementwise transforms
//! - **Solvers** - adaptive Dormand–Prince RK45 and Gauss–Kronrod quadrature
//! - **Model** - sample generation, likelihood, cross-entropy
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use text_interpolant::{
//!     CachedEncoder, EmbeddingDensity, FastEmbedEncoder, InterpolantConfig,
//!     StochasticInterpolantModel,
//! };
//!
//! let encoder = Arc::new(CachedEncoder::new(FastEmbedEncoder::from_pretrained()?));
//! let initial = Arc::new(EmbeddingDensity::from_sentence(encoder.clone(), "initial sentence")?);
//! let final_model = Arc::new(EmbeddingDensity::from_sentence(encoder, "final sentence")?);
//!
//! let config = InterpolantConfig::new(1.0, 0.01);
//! let model = StochasticInterpolantModel::new(initial, final_model, config)?;
//! let samples = model.generate_samples(1000)?;
//! let likelihood = model.likelihood(samples.view())?;
//! ```

pub mod density;
pub mod embedding;
pub mod error;
pub mod model;
pub mod ode;
pub mod quadrature;
pub mod schedule;

// Re-exports for convenience
pub use density::EmbeddingDensity;
pub use embedding::{cosine_similarity, CachedEncoder, TextEncoder};
#[cfg(feature = "fastembed")]
pub use embedding::{FastEmbedConfig, FastEmbedEncoder};
pub use error::{InterpolantError, Result};
pub use model::{InterpolantConfig, StochasticInterpolantModel, PLACEHOLDER_SENTENCE};
pub use ode::{solve_ivp, OdeConfig, OdeSolution};
pub use quadrature::{integrate, integrate_real_line, QuadConfig, QuadResult};
pub use schedule::{diffusivity, interpolant, Transform, TransformFactory};

//! Sentence encoders
//!
//! The encoder is a capability passed explicitly to each density model;
//! `CachedEncoder` deduplicates repeated sentences, `FastEmbedEncoder`
//! (feature `fastembed`) loads a pretrained sentence-transformer.

mod discovery;
mod encoder;
mod engine;
#[cfg(feature = "fastembed")]
mod pretrained;

pub use discovery::{find_model_cache_dir, FASTEMBED_CACHE_ENV, MODELS_PATH_ENV};
pub use encoder::{cosine_similarity, TextEncoder};
pub use engine::CachedEncoder;
#[cfg(feature = "fastembed")]
pub use pretrained::{FastEmbedConfig, FastEmbedEncoder, DEFAULT_MODEL_CODE};

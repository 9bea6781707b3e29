//! Embedding providers for the catalog and content indexes.
//!
//! Providers are opaque text-to-vector services. The trigram provider runs
//! offline and is deterministic; the Ollama provider calls a local model.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

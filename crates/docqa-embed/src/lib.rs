//! # docqa-embed
//!
//! Embedding providers for docqa.
//!
//! ## Providers
//!
//! | Type | Description |
//! |------|-------------|
//! | [`HashEmbedder`] | Offline feature-hashing embedder, no model download |
//! | [`OpenAiEmbedder`] | Any OpenAI-compatible `/embeddings` endpoint |
//!
//! A backend is wrapped in an [`EmbeddingProvider`], which records which
//! capability (direct encode, query embedding, document embedding) is used
//! to call it. [`EmbedderPool`] then adds concurrency limits, a timeout,
//! dimension checks and an optional [`EmbeddingCache`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docqa_embed::{EmbedderPool, EmbeddingProvider, HashEmbedder, PoolConfig};
//! use std::sync::Arc;
//!
//! let provider = EmbeddingProvider::from_embedder(Arc::new(HashEmbedder::new()));
//! let pool = EmbedderPool::new(provider, PoolConfig::default());
//!
//! let vectors = pool.embed_batch(&["Hello world", "Machine learning"]).await?;
//! let question = pool.embed_query("What is machine learning?").await?;
//! ```

pub mod cache;
pub mod hashing;
pub mod http;
pub mod pool;
pub mod provider;

pub use cache::{CacheStats, EmbeddingCache};
pub use hashing::HashEmbedder;
pub use http::{OpenAiConfig, OpenAiEmbedder};
pub use pool::{EmbedderPool, PoolConfig};
pub use provider::EmbeddingProvider;

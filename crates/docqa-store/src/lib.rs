//! Vector storage layer for docqa.
//!
//! This crate implements the [`VectorStore`](docqa_core::VectorStore) trait
//! with [`DocumentIndex`]: an exact flat vector index and the document
//! records that own its entries, persisted together as one file.
//!
//! # Features
//!
//! - **Exact Search**: Squared Euclidean distance over every entry, ties
//!   broken by insertion order
//! - **Soft Delete**: Removing a document hides its vectors immediately;
//!   [`compact`](docqa_core::VectorStore::compact) purges them later
//! - **Atomic Persistence**: Every mutation rewrites the store through a
//!   temporary file and a rename
//! - **Graceful Load**: A missing or corrupt store file opens as an empty store
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_store::DocumentIndex;
//! use docqa_core::{SearchQuery, VectorStore};
//!
//! let store = DocumentIndex::open("data/store.json", 384).await;
//! let hits = store.search(&SearchQuery::new(query_vector, 3)).await?;
//! ```

pub mod flat;
mod persist;
pub mod store;

pub use flat::{FlatIndex, cosine_similarity, squared_l2};
pub use store::DocumentIndex;

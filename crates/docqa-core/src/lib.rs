//! # docqa-core
//!
//! Core types and traits for docqa, a document question-answering pipeline.
//!
//! This crate provides the foundational abstractions used throughout docqa:
//!
//! - **Content Extraction**: [`ContentExtractor`] turns uploaded bytes into page text
//! - **Document Chunking**: [`Chunker`] splits page text into retrieval units
//! - **Embedding Generation**: [`Encoder`] and [`Embedder`] map text to vectors
//! - **Vector Storage**: [`VectorStore`] stores chunk vectors with document provenance
//!
//! ## Architecture
//!
//! ```text
//! bytes → ContentExtractor → Chunker → Embedder → VectorStore
//!                                                     ↓
//!                       question → Embedder → SearchQuery → SearchHit
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Chunk`] | An ordered slice of a document's text |
//! | [`DocumentRecord`] | A stored document and its chunks |
//! | [`DocumentSummary`] | Listing view of a document, no embeddings |
//! | [`ExtractedContent`] | Page text extracted from an upload |
//! | [`SearchQuery`] | Parameters for a nearest-neighbor search |
//! | [`SearchHit`] | A live chunk matching a query with its distance |
//!
//! ## Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`ContentExtractor`] | Extract page text from raw bytes |
//! | [`Chunker`] | Split extracted content into chunks |
//! | [`Encoder`] | Direct single-text encoding capability |
//! | [`Embedder`] | Document/query embedding capability |
//! | [`VectorStore`] | Vector index plus document store |
//!
//! ## Related Crates
//!
//! - `docqa-extract`: PDF and plain-text extraction
//! - `docqa-chunker`: Semantic and fixed-size chunking
//! - `docqa-embed`: Embedding providers, pooling and caching
//! - `docqa-store`: Flat vector index with atomic persistence
//! - `docqa-index`: Upload ingestion pipeline
//! - `docqa-rag`: Retrieval-augmented query orchestration

pub mod error;
pub mod traits;
pub mod types;

pub use error::{
    ChunkError, EmbedError, Error, ExtractError, GenerateError, Result, StoreError,
};
pub use traits::*;
pub use types::*;

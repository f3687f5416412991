//! Core traits for docqa components.
//!
//! - [`ContentExtractor`]: Extract page text from uploaded bytes
//! - [`Chunker`]: Split content into chunks
//! - [`Encoder`]: Encode a single text directly
//! - [`Embedder`]: Embed documents and queries
//! - [`VectorStore`]: Store document chunks and search their vectors
//!
//! These traits let the pipeline stages be swapped independently.

use async_trait::async_trait;

use crate::error::{ChunkError, EmbedError, ExtractError, StoreError};
use crate::types::{
    Chunk, ChunkConfig, DocumentMetadata, DocumentRecord, DocumentSummary, ExtractedContent,
    SearchHit, SearchQuery, StoreStats,
};

// ============================================================================
// Content Extraction
// ============================================================================

/// Trait for extracting content from uploaded files.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// File extensions (lowercase, no dot) this extractor handles.
    fn supported_extensions(&self) -> &[&str];

    /// Check if this extractor can handle the given extension.
    fn can_extract(&self, extension: &str) -> bool {
        let extension = extension.to_ascii_lowercase();
        self.supported_extensions().contains(&extension.as_str())
    }

    /// Extract page text from raw bytes.
    async fn extract_bytes(&self, data: &[u8]) -> Result<ExtractedContent, ExtractError>;
}

// ============================================================================
// Chunking
// ============================================================================

/// Trait for splitting content into chunks.
///
/// Chunkers are pure: the same content and config always yield the same
/// chunks in the same order.
pub trait Chunker: Send + Sync {
    /// Name of this chunking strategy.
    fn name(&self) -> &str;

    /// Chunk the extracted content.
    fn chunk(
        &self,
        content: &ExtractedContent,
        config: &ChunkConfig,
    ) -> Result<Vec<Chunk>, ChunkError>;
}

// ============================================================================
// Embedding
// ============================================================================

/// Direct-encode capability: one text in, one vector out.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Model name/identifier.
    fn model_name(&self) -> &str;

    /// Embedding dimension.
    fn dimension(&self) -> usize;

    /// Encode a single text.
    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Document/query embedding capability.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model name/identifier.
    fn model_name(&self) -> &str;

    /// Embedding dimension.
    fn dimension(&self) -> usize;

    /// Whether [`embed_query`](Self::embed_query) is a distinct capability.
    ///
    /// When false, callers embed questions through
    /// [`embed_documents`](Self::embed_documents) instead.
    fn supports_query_embedding(&self) -> bool {
        true
    }

    /// Embed a batch of document texts, one vector per input in order.
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Embed a query (may use a different instruction than documents).
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, EmbedError> {
        let results = self.embed_documents(&[query]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::Inference("empty embedding result".to_string()))
    }
}

// ============================================================================
// Vector Storage
// ============================================================================

/// Vector index plus document store.
///
/// Mutating calls persist the whole store before returning. Search results
/// only ever reference documents that are currently stored.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store a document's chunks and their embeddings, in chunk order.
    ///
    /// `chunks` and `embeddings` must have the same length. Returns the id.
    async fn add_document(
        &self,
        document_id: &str,
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
        metadata: DocumentMetadata,
    ) -> Result<String, StoreError>;

    /// Check whether a document is stored.
    async fn has_document(&self, document_id: &str) -> bool;

    /// Fetch a stored document.
    async fn get_document(&self, document_id: &str) -> Option<DocumentRecord>;

    /// List stored documents without embeddings.
    async fn get_all_documents(&self) -> Vec<DocumentSummary>;

    /// Remove a document. Returns `false` if it was not stored.
    ///
    /// Vector entries stay in the index until [`compact`](Self::compact).
    async fn remove_document(&self, document_id: &str) -> bool;

    /// Nearest-neighbor search, ascending distance.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, StoreError>;

    /// Alternate search entry point used when [`search`](Self::search) fails.
    async fn similarity_search(&self, _query: &SearchQuery) -> Result<Vec<SearchHit>, StoreError> {
        Err(StoreError::Unsupported(
            "similarity search not available".to_string(),
        ))
    }

    /// Drop vector entries of removed documents. Returns how many were purged.
    async fn compact(&self) -> Result<usize, StoreError>;

    /// Get store statistics.
    async fn stats(&self) -> StoreStats;

    /// Persist the full store.
    async fn save(&self) -> Result<(), StoreError>;
}

//! Core data types for docqa.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Chunks
// ============================================================================

/// An ordered slice of a document's text, the atomic retrieval unit.
///
/// Chunks are produced once by a [`Chunker`](crate::Chunker) and never
/// modified afterwards. Their order within a document is significant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text
    pub text: String,
    /// Position within the document (0-indexed)
    pub sequence_index: usize,
    /// Heading of the section this chunk came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_section: Option<String>,
    /// Length of `text` in characters
    pub length: usize,
    /// 1-based page number, when the chunk is page scoped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

impl Chunk {
    /// Create a chunk, computing its character length.
    #[must_use]
    pub fn new(text: impl Into<String>, sequence_index: usize) -> Self {
        let text = text.into();
        let length = text.chars().count();
        Self {
            text,
            sequence_index,
            source_section: None,
            length,
            page: None,
        }
    }

    /// Attach a section heading.
    #[must_use]
    pub fn with_section(mut self, section: Option<String>) -> Self {
        self.source_section = section;
        self
    }

    /// Attach a 1-based page number.
    #[must_use]
    pub fn with_page(mut self, page: Option<u32>) -> Self {
        self.page = page;
        self
    }
}

/// Configuration for chunking. Sizes are measured in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum chunk size
    pub chunk_size: usize,
    /// Overlap carried between consecutive chunks
    pub overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Content extracted from an uploaded file, one entry per page.
#[derive(Debug, Clone, Default)]
pub struct ExtractedContent {
    /// Page texts in document order
    pub pages: Vec<String>,
    /// Document metadata
    pub metadata: ContentMetadataInfo,
}

impl ExtractedContent {
    /// Build unpaginated content from a plain string.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            pages: vec![text.into()],
            metadata: ContentMetadataInfo::default(),
        }
    }

    /// True when pages come from a paginated source such as a PDF.
    #[must_use]
    pub fn is_paginated(&self) -> bool {
        self.metadata.page_count.is_some()
    }

    /// Whole document text, pages separated by a blank line.
    #[must_use]
    pub fn text(&self) -> String {
        self.pages.join("\n\n")
    }

    /// True when no page carries any non-whitespace text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.trim().is_empty())
    }
}

/// Metadata about extracted content.
#[derive(Debug, Clone, Default)]
pub struct ContentMetadataInfo {
    /// Document title
    pub title: Option<String>,
    /// Page count, set only by paginated sources
    pub page_count: Option<usize>,
}

// ============================================================================
// Documents
// ============================================================================

/// Metadata supplied when a document is added to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Original filename
    pub filename: String,
    /// Upload timestamp; the store stamps the current time when absent
    pub upload_time: Option<DateTime<Utc>>,
}

impl DocumentMetadata {
    #[must_use]
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            upload_time: None,
        }
    }
}

/// A stored document. Immutable once added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Content hash of the uploaded bytes
    pub document_id: String,
    /// Original filename
    pub filename: String,
    /// When the document was stored
    pub upload_time: DateTime<Utc>,
    /// Chunks in document order
    pub chunks: Vec<Chunk>,
}

impl DocumentRecord {
    /// Number of chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Document text reconstructed from its chunks.
    #[must_use]
    pub fn full_text(&self) -> String {
        self.chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Listing view of this record.
    #[must_use]
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.document_id.clone(),
            filename: self.filename.clone(),
            upload_time: self.upload_time,
            chunk_count: self.chunks.len(),
        }
    }
}

/// Listing entry for a stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub filename: String,
    pub upload_time: DateTime<Utc>,
    pub chunk_count: usize,
}

// ============================================================================
// Search
// ============================================================================

/// Parameters for a nearest-neighbor search.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Query embedding
    pub embedding: Vec<f32>,
    /// Maximum number of hits
    pub top_k: usize,
    /// Keep only hits with `distance <= threshold`
    pub threshold: Option<f32>,
}

impl SearchQuery {
    #[must_use]
    pub fn new(embedding: Vec<f32>, top_k: usize) -> Self {
        Self {
            embedding,
            top_k,
            threshold: None,
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = Some(threshold);
        self
    }
}

/// A live chunk matching a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Owning document
    pub document_id: String,
    /// Chunk position within the document
    pub chunk_index: usize,
    /// Chunk text
    pub chunk_text: String,
    /// Squared Euclidean distance to the query; lower is closer
    pub distance: f32,
    /// Filename of the owning document
    pub source: Option<String>,
    /// 1-based page number of the chunk
    pub page: Option<u32>,
    /// Relevance score assigned by a ranking pass for the current query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f32>,
}

/// Store statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// Live documents
    pub documents: usize,
    /// Chunks belonging to live documents
    pub live_chunks: usize,
    /// Vector entries physically present in the index
    pub total_entries: usize,
    /// Entries left behind by removed documents
    pub orphaned_entries: usize,
    /// Embedding dimension
    pub dimension: usize,
}

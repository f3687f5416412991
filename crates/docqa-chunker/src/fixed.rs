//! Fixed-size chunking strategy with overlap.
//!
//! Windows never cross a page boundary, so each chunk carries the page it
//! came from.

use docqa_core::{Chunk, ChunkConfig, ChunkError, Chunker, ExtractedContent};
use tracing::debug;

/// Fixed-size sliding-window chunker.
pub struct FixedSizeChunker;

impl FixedSizeChunker {
    /// Create a new fixed-size chunker.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for FixedSizeChunker {
    fn name(&self) -> &str {
        "fixed"
    }

    fn chunk(
        &self,
        content: &ExtractedContent,
        config: &ChunkConfig,
    ) -> Result<Vec<Chunk>, ChunkError> {
        if config.chunk_size == 0 {
            return Err(ChunkError::InvalidConfig(
                "chunk_size must be at least 1".to_string(),
            ));
        }

        let paginated = content.is_paginated();
        let step = config.chunk_size.saturating_sub(config.overlap).max(1);
        let mut chunks = Vec::new();

        for (page_index, page_text) in content.pages.iter().enumerate() {
            let page = paginated.then(|| u32::try_from(page_index + 1).unwrap_or(u32::MAX));
            let text = page_text.replace("\r\n", "\n");
            let chars: Vec<char> = text.chars().collect();
            let total_chars = chars.len();

            let mut start = 0;
            while start < total_chars {
                let end = (start + config.chunk_size).min(total_chars);
                let window: String = chars[start..end].iter().collect();

                if !window.trim().is_empty() {
                    chunks.push(Chunk::new(window, chunks.len()).with_page(page));
                }

                if end >= total_chars {
                    break;
                }
                start += step;
            }
        }

        debug!(
            "Fixed-size chunking {} pages into {} chunks (step {})",
            content.pages.len(),
            chunks.len(),
            step
        );
        Ok(chunks)
    }
}

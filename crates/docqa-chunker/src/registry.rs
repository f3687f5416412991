//! Chunker registry for selecting a chunking strategy by name.

use docqa_core::{Chunk, ChunkConfig, ChunkError, Chunker, ExtractedContent};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{FixedSizeChunker, SemanticChunker};

/// Registry of chunking strategies.
pub struct ChunkerRegistry {
    /// Chunkers keyed by their name
    chunkers: HashMap<String, Arc<dyn Chunker>>,
    /// Default chunker name
    default_chunker: Option<String>,
}

impl ChunkerRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunkers: HashMap::new(),
            default_chunker: None,
        }
    }

    /// Registry with the semantic (default) and fixed-size strategies.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(SemanticChunker::new());
        registry.register(FixedSizeChunker::new());
        registry.set_default("semantic");
        registry
    }

    /// Register a chunker under its own name.
    pub fn register<C: Chunker + 'static>(&mut self, chunker: C) {
        self.chunkers
            .insert(chunker.name().to_string(), Arc::new(chunker));
    }

    /// Set the default chunker.
    pub fn set_default(&mut self, name: &str) {
        self.default_chunker = Some(name.to_string());
    }

    /// Get a chunker by name, or the default when `name` is `None`.
    #[must_use]
    pub fn get(&self, name: Option<&str>) -> Option<Arc<dyn Chunker>> {
        name.or(self.default_chunker.as_deref())
            .and_then(|name| self.chunkers.get(name))
            .cloned()
    }

    /// Names of the registered strategies, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.chunkers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Chunk content with the named (or default) strategy.
    pub fn chunk(
        &self,
        content: &ExtractedContent,
        strategy: Option<&str>,
        config: &ChunkConfig,
    ) -> Result<Vec<Chunk>, ChunkError> {
        let chunker = self.get(strategy).ok_or_else(|| {
            ChunkError::InvalidConfig(format!(
                "unknown chunking strategy: {}",
                strategy.unwrap_or("<default>")
            ))
        })?;

        chunker.chunk(content, config)
    }
}

impl Default for ChunkerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

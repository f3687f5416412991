//! Embedding cache for avoiding redundant computations.
//!
//! Entries are keyed by the blake3 hash of the text. When the cache is full
//! the least recently touched 10% of entries are evicted.

use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Maximum number of entries in the cache.
pub const DEFAULT_CACHE_SIZE: usize = 10_000;

/// A cached embedding entry.
#[derive(Clone)]
struct CacheEntry {
    embedding: Vec<f32>,
    /// Access counter for eviction ordering
    access_count: u64,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    access_counter: u64,
    stats: CacheStats,
}

impl CacheInner {
    fn next_access(&mut self) -> u64 {
        self.access_counter += 1;
        self.access_counter
    }
}

/// Embedding cache with access-count eviction.
pub struct EmbeddingCache {
    inner: RwLock<CacheInner>,
    max_size: usize,
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of entries evicted
    pub evictions: u64,
}

impl EmbeddingCache {
    /// Create a new embedding cache with default size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_SIZE)
    }

    /// Create a new embedding cache with specified capacity.
    #[must_use]
    pub fn with_capacity(max_size: usize) -> Self {
        Self {
            inner: RwLock::new(CacheInner::default()),
            max_size: max_size.max(1),
        }
    }

    /// Compute hash for a text.
    fn hash_text(text: &str) -> String {
        blake3::hash(text.as_bytes()).to_hex().to_string()
    }

    /// Look up each text, recording hits and misses.
    pub async fn get_many(&self, texts: &[&str]) -> Vec<Option<Vec<f32>>> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let mut results = Vec::with_capacity(texts.len());

        for text in texts {
            let key = Self::hash_text(text);
            let access = inner.next_access();
            if let Some(entry) = inner.entries.get_mut(&key) {
                entry.access_count = access;
                results.push(Some(entry.embedding.clone()));
                inner.stats.hits += 1;
            } else {
                results.push(None);
                inner.stats.misses += 1;
            }
        }

        results
    }

    /// Store embeddings for the given texts.
    pub async fn insert_many(&self, texts: &[&str], embeddings: &[Vec<f32>]) {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        for (text, embedding) in texts.iter().zip(embeddings) {
            let key = Self::hash_text(text);
            if !inner.entries.contains_key(&key) && inner.entries.len() >= self.max_size {
                Self::evict(inner, self.max_size);
            }
            let access = inner.next_access();
            inner.entries.insert(
                key,
                CacheEntry {
                    embedding: embedding.clone(),
                    access_count: access,
                },
            );
        }
    }

    /// Evict the oldest 10% of entries.
    fn evict(inner: &mut CacheInner, max_size: usize) {
        let evict_count = (max_size / 10).max(1);
        let mut entries: Vec<(String, u64)> = inner
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.access_count))
            .collect();
        entries.sort_by_key(|(_, count)| *count);

        for (key, _) in entries.into_iter().take(evict_count) {
            inner.entries.remove(&key);
            inner.stats.evictions += 1;
        }
        debug!("Evicted {} cache entries", evict_count);
    }

    /// Get cache statistics.
    pub async fn stats(&self) -> CacheStats {
        self.inner.read().await.stats.clone()
    }

    /// Get cache size.
    pub async fn size(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Clear the cache.
    pub async fn clear(&self) {
        self.inner.write().await.entries.clear();
    }

    /// Maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_size
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}

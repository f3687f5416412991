//! Embedder pool for concurrent embedding operations.
//!
//! The pool bounds concurrent provider calls with a semaphore, bounds each
//! call with a timeout, checks returned dimensions, and optionally caches
//! document embeddings.

use docqa_core::EmbedError;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::cache::{CacheStats, EmbeddingCache};
use crate::provider::EmbeddingProvider;

/// Pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum concurrent provider calls
    pub max_concurrent: usize,
    /// Upper bound on a single provider call
    pub timeout: Duration,
    /// Document embedding cache capacity; `None` disables the cache
    pub cache_capacity: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            timeout: Duration::from_secs(30),
            cache_capacity: Some(crate::cache::DEFAULT_CACHE_SIZE),
        }
    }
}

/// Pool of embedding calls with concurrency control.
pub struct EmbedderPool {
    provider: EmbeddingProvider,
    /// Semaphore to limit concurrent inference
    semaphore: Semaphore,
    max_concurrent: usize,
    timeout: Duration,
    cache: Option<EmbeddingCache>,
}

impl EmbedderPool {
    /// Create a new embedder pool.
    #[must_use]
    pub fn new(provider: EmbeddingProvider, config: PoolConfig) -> Self {
        let max_concurrent = config.max_concurrent.max(1);
        Self {
            provider,
            semaphore: Semaphore::new(max_concurrent),
            max_concurrent,
            timeout: config.timeout,
            cache: config.cache_capacity.map(EmbeddingCache::with_capacity),
        }
    }

    /// Get the embedding dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// Get the model name.
    #[must_use]
    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Get the underlying provider.
    #[must_use]
    pub fn provider(&self) -> &EmbeddingProvider {
        &self.provider
    }

    /// Embed a question. Queries bypass the cache.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>, EmbedError> {
        let vector = self.guarded(self.provider.embed_query(query)).await?;
        self.check_dimension(&vector)?;
        Ok(vector)
    }

    /// Embed a batch of document texts.
    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let Some(cache) = &self.cache else {
            return self.embed_uncached(texts).await;
        };

        let cached = cache.get_many(texts).await;
        let missing: Vec<usize> = cached
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(i, _)| i)
            .collect();

        let mut fresh = Vec::new();
        if !missing.is_empty() {
            debug!(
                "Cache miss for {} of {} texts, embedding",
                missing.len(),
                texts.len()
            );
            let missing_texts: Vec<&str> = missing.iter().map(|&i| texts[i]).collect();
            fresh = self.embed_uncached(&missing_texts).await?;
            cache.insert_many(&missing_texts, &fresh).await;
        }

        let mut fresh = missing.into_iter().zip(fresh).peekable();
        let mut vectors = Vec::with_capacity(texts.len());
        for (i, hit) in cached.into_iter().enumerate() {
            match hit {
                Some(vector) => vectors.push(vector),
                None => match fresh.next_if(|(j, _)| *j == i) {
                    Some((_, vector)) => vectors.push(vector),
                    None => {
                        return Err(EmbedError::Inference(format!(
                            "missing embedding for input {i}"
                        )));
                    }
                },
            }
        }
        Ok(vectors)
    }

    async fn embed_uncached(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let vectors = self.guarded(self.provider.embed_batch(texts)).await?;
        for vector in &vectors {
            self.check_dimension(vector)?;
        }
        Ok(vectors)
    }

    /// Run a provider call under a permit and the pool timeout.
    async fn guarded<T>(
        &self,
        call: impl Future<Output = Result<T, EmbedError>>,
    ) -> Result<T, EmbedError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| EmbedError::Inference(format!("semaphore error: {e}")))?;

        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Embedding provider {} timed out after {:?}",
                    self.model_name(),
                    self.timeout
                );
                Err(EmbedError::Timeout(self.timeout))
            }
        }
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), EmbedError> {
        let expected = self.dimension();
        if vector.len() != expected {
            return Err(EmbedError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// Cache statistics, if caching is enabled.
    pub async fn cache_stats(&self) -> Option<CacheStats> {
        match &self.cache {
            Some(cache) => Some(cache.stats().await),
            None => None,
        }
    }

    /// Get pool statistics.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Get max concurrent operations.
    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docqa_core::Embedder;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TEST_DIM: usize = 8;

    /// Mock embedder for testing.
    struct MockEmbedder {
        dimension: usize,
        calls: AtomicUsize,
        embedded: AtomicUsize,
    }

    impl MockEmbedder {
        fn new(dimension: usize) -> Self {
            Self {
                dimension,
                calls: AtomicUsize::new(0),
                embedded: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for MockEmbedder {
        fn model_name(&self) -> &str {
            "mock-embedder"
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.embedded.fetch_add(texts.len(), Ordering::SeqCst);
            // Deterministic embeddings based on text length
            Ok(texts
                .iter()
                .map(|text| {
                    (0..self.dimension)
                        .map(|i| ((i + text.len()) as f32 * 0.001).sin())
                        .collect()
                })
                .collect())
        }
    }

    struct SlowEmbedder;

    #[async_trait]
    impl Embedder for SlowEmbedder {
        fn model_name(&self) -> &str {
            "slow"
        }

        fn dimension(&self) -> usize {
            TEST_DIM
        }

        async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![vec![0.0; TEST_DIM]; texts.len()])
        }
    }

    /// Claims one dimension, returns another.
    struct LyingEmbedder;

    #[async_trait]
    impl Embedder for LyingEmbedder {
        fn model_name(&self) -> &str {
            "lying"
        }

        fn dimension(&self) -> usize {
            TEST_DIM
        }

        async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
            Ok(vec![vec![0.0; TEST_DIM + 1]; texts.len()])
        }
    }

    fn pool_with(embedder: Arc<dyn Embedder>, cache_capacity: Option<usize>) -> EmbedderPool {
        EmbedderPool::new(
            EmbeddingProvider::from_embedder(embedder),
            PoolConfig {
                max_concurrent: 2,
                timeout: Duration::from_millis(100),
                cache_capacity,
            },
        )
    }

    #[test]
    fn test_pool_metadata() {
        let pool = pool_with(Arc::new(MockEmbedder::new(TEST_DIM)), None);
        assert_eq!(pool.dimension(), TEST_DIM);
        assert_eq!(pool.model_name(), "mock-embedder");
        assert_eq!(pool.max_concurrent(), 2);
        assert_eq!(pool.available_permits(), 2);
        assert_eq!(pool.provider().kind(), "query_embed");
    }

    #[tokio::test]
    async fn test_embed_batch_and_query() {
        let pool = pool_with(Arc::new(MockEmbedder::new(TEST_DIM)), None);

        let vectors = pool.embed_batch(&["Hello", "World!"]).await.unwrap();
        assert_eq!(vectors.len(), 2);
        assert!(vectors.iter().all(|v| v.len() == TEST_DIM));

        let query = pool.embed_query("Hello").await.unwrap();
        assert_eq!(query, vectors[0]);
        assert_eq!(pool.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_provider() {
        let embedder = Arc::new(MockEmbedder::new(TEST_DIM));
        let pool = pool_with(embedder.clone(), None);
        assert!(pool.embed_batch(&[]).await.unwrap().is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_avoids_reembedding() {
        let embedder = Arc::new(MockEmbedder::new(TEST_DIM));
        let pool = pool_with(embedder.clone(), Some(100));

        let first = pool.embed_batch(&["a", "bb"]).await.unwrap();
        let second = pool.embed_batch(&["bb", "ccc", "a"]).await.unwrap();

        assert_eq!(second[0], first[1]);
        assert_eq!(second[2], first[0]);
        assert_eq!(second[1].len(), TEST_DIM);
        assert_eq!(embedder.embedded.load(Ordering::SeqCst), 3);

        let stats = pool.cache_stats().await.unwrap();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 3);
    }

    #[tokio::test]
    async fn test_query_bypasses_cache() {
        let embedder = Arc::new(MockEmbedder::new(TEST_DIM));
        let pool = pool_with(embedder.clone(), Some(100));
        pool.embed_query("q").await.unwrap();
        pool.embed_query("q").await.unwrap();
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
        assert_eq!(pool.cache_stats().await.unwrap(), CacheStats::default());
    }

    #[tokio::test]
    async fn test_timeout_is_provider_error() {
        let pool = pool_with(Arc::new(SlowEmbedder), None);
        let err = pool.embed_query("slow").await.unwrap_err();
        assert!(matches!(err, EmbedError::Timeout(_)));
        assert_eq!(pool.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let pool = pool_with(Arc::new(LyingEmbedder), Some(10));
        let err = pool.embed_batch(&["x"]).await.unwrap_err();
        assert!(matches!(
            err,
            EmbedError::DimensionMismatch {
                expected: TEST_DIM,
                actual: 9
            }
        ));
        assert_eq!(pool.cache_stats().await.unwrap().misses, 1);
    }
}

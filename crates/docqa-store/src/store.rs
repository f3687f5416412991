//! Document index: flat vector index plus document store.
//!
//! Removing a document only drops its record. Its vectors stay in the index
//! until [`DocumentIndex::compact`] runs, and search resolves every raw hit
//! against the live document map, so results never reference removed
//! documents.

use async_trait::async_trait;
use chrono::Utc;
use docqa_core::{
    Chunk, DocumentMetadata, DocumentRecord, DocumentSummary, SearchHit, SearchQuery, StoreError,
    StoreStats, VectorStore,
};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::flat::cosine_similarity;
use crate::persist::{self, StoreState, StoredDocument};

/// Persistent vector index and document store.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_store::DocumentIndex;
/// use docqa_core::{Chunk, DocumentMetadata, SearchQuery, VectorStore};
///
/// let store = DocumentIndex::open("data/store.json", 2).await;
/// store
///     .add_document(
///         "doc",
///         vec![Chunk::new("cats", 0), Chunk::new("dogs", 1)],
///         vec![vec![1.0, 0.0], vec![0.0, 1.0]],
///         DocumentMetadata::new("pets.txt"),
///     )
///     .await?;
///
/// let hits = store.search(&SearchQuery::new(vec![1.0, 0.0], 1)).await?;
/// assert_eq!(hits[0].chunk_text, "cats");
/// ```
pub struct DocumentIndex {
    path: Option<PathBuf>,
    dimension: usize,
    state: RwLock<StoreState>,
}

impl DocumentIndex {
    /// Create a store that is never written to disk.
    #[must_use]
    pub fn in_memory(dimension: usize) -> Self {
        Self {
            path: None,
            dimension,
            state: RwLock::new(StoreState::empty(dimension)),
        }
    }

    /// Open the store persisted at `path`.
    ///
    /// A missing file yields an empty store. An unreadable or corrupt file is
    /// logged and also yields an empty store; opening never fails. A corrupt
    /// file, including one written with another dimension, is first moved to
    /// `<path>.corrupt` so the next write cannot destroy it.
    pub async fn open(path: impl Into<PathBuf>, dimension: usize) -> Self {
        let path = path.into();
        let state = match persist::read_state(&path, dimension).await {
            Ok(Some(state)) => {
                info!(
                    "Loaded store from {:?}: {} documents, {} vectors",
                    path,
                    state.documents.len(),
                    state.index.len()
                );
                state
            }
            Ok(None) => {
                debug!("No store at {:?}, starting empty", path);
                StoreState::empty(dimension)
            }
            Err(e @ StoreError::Corrupt(_)) => {
                error!("Failed to load store from {:?}, starting empty: {}", path, e);
                match persist::quarantine(&path).await {
                    Ok(moved) => warn!("Moved unreadable store to {:?}", moved),
                    Err(e) => error!("{}", e),
                }
                StoreState::empty(dimension)
            }
            Err(e) => {
                error!("Failed to load store from {:?}, starting empty: {}", path, e);
                StoreState::empty(dimension)
            }
        };

        Self {
            path: Some(path),
            dimension,
            state: RwLock::new(state),
        }
    }

    /// Backing file, if persistent.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Embedding dimension.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    async fn write(&self, state: &StoreState) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = persist::encode(state)?;
        persist::write_atomic(path, &bytes).await?;
        debug!("Persisted store to {:?} ({} bytes)", path, bytes.len());
        Ok(())
    }

    /// Persist after a mutation. Failures leave the in-memory state serving.
    async fn write_after_mutation(&self, state: &StoreState, operation: &str) {
        if let Err(e) = self.write(state).await {
            error!("Store not persisted after {}: {}", operation, e);
        }
    }

    fn check_query(&self, query: &SearchQuery) -> Result<(), StoreError> {
        if query.embedding.len() != self.dimension {
            return Err(StoreError::Query(format!(
                "query dimension {} does not match store dimension {}",
                query.embedding.len(),
                self.dimension
            )));
        }
        Ok(())
    }

    async fn collect_hits(
        &self,
        query: &SearchQuery,
        with_relevance: bool,
    ) -> Result<Vec<SearchHit>, StoreError> {
        self.check_query(query)?;
        if query.top_k == 0 {
            return Ok(Vec::new());
        }

        let state = self.state.read().await;
        let ranked = state.index.ranked(&query.embedding)?;

        let mut hits = Vec::with_capacity(query.top_k);
        let mut skipped = 0usize;
        for (entry, distance) in ranked {
            if query.threshold.is_some_and(|t| distance > t) {
                break;
            }
            let Some((stored, chunk_index)) = state.resolve(entry) else {
                skipped += 1;
                continue;
            };
            let chunk = &stored.record.chunks[chunk_index];
            let relevance = if with_relevance {
                state
                    .index
                    .vector(entry)
                    .map(|v| cosine_similarity(&query.embedding, v))
            } else {
                None
            };

            hits.push(SearchHit {
                document_id: stored.record.document_id.clone(),
                chunk_index,
                chunk_text: chunk.text.clone(),
                distance,
                source: Some(stored.record.filename.clone()),
                page: chunk.page,
                relevance,
            });
            if hits.len() == query.top_k {
                break;
            }
        }

        debug!(
            "Search returned {} hits (skipped {} orphaned entries)",
            hits.len(),
            skipped
        );
        Ok(hits)
    }
}

#[async_trait]
impl VectorStore for DocumentIndex {
    async fn add_document(
        &self,
        document_id: &str,
        chunks: Vec<Chunk>,
        embeddings: Vec<Vec<f32>>,
        metadata: DocumentMetadata,
    ) -> Result<String, StoreError> {
        if self.dimension == 0 {
            return Err(StoreError::Insert(
                "store dimension must be positive".to_string(),
            ));
        }
        if chunks.len() != embeddings.len() {
            return Err(StoreError::Insert(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        if chunks.is_empty() {
            return Err(StoreError::Insert("document has no chunks".to_string()));
        }
        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimension) {
            return Err(StoreError::Insert(format!(
                "embedding dimension {} does not match store dimension {}",
                bad.len(),
                self.dimension
            )));
        }

        let mut state = self.state.write().await;
        if state.documents.contains_key(document_id) {
            return Err(StoreError::Insert(format!(
                "document {document_id} already exists"
            )));
        }

        // Append into a copy so a rejected vector leaves the index untouched.
        let mut index = state.index.clone();
        for embedding in &embeddings {
            index.add(embedding)?;
        }

        let chunk_start = state.index.len();
        let chunk_count = chunks.len();
        state.index = index;
        state
            .lookup
            .extend(std::iter::repeat_n(document_id.to_string(), chunk_count));
        state.documents.insert(
            document_id.to_string(),
            StoredDocument {
                record: DocumentRecord {
                    document_id: document_id.to_string(),
                    filename: metadata.filename,
                    upload_time: metadata.upload_time.unwrap_or_else(Utc::now),
                    chunks,
                },
                chunk_start,
            },
        );
        info!(
            "Added document {} ({} chunks at entry {})",
            document_id, chunk_count, chunk_start
        );

        self.write_after_mutation(&state, "add").await;
        Ok(document_id.to_string())
    }

    async fn has_document(&self, document_id: &str) -> bool {
        self.state.read().await.documents.contains_key(document_id)
    }

    async fn get_document(&self, document_id: &str) -> Option<DocumentRecord> {
        let state = self.state.read().await;
        state.documents.get(document_id).map(|s| s.record.clone())
    }

    async fn get_all_documents(&self) -> Vec<DocumentSummary> {
        let state = self.state.read().await;
        let mut summaries: Vec<DocumentSummary> = state
            .documents
            .values()
            .map(|s| s.record.summary())
            .collect();
        summaries.sort_by(|a, b| {
            a.upload_time
                .cmp(&b.upload_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        summaries
    }

    async fn remove_document(&self, document_id: &str) -> bool {
        let mut state = self.state.write().await;
        let Some(removed) = state.documents.remove(document_id) else {
            debug!("Remove requested for unknown document {}", document_id);
            return false;
        };

        info!(
            "Removed document {} ({} vector entries left for compaction)",
            document_id,
            removed.record.chunks.len()
        );
        self.write_after_mutation(&state, "remove").await;
        true
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, StoreError> {
        self.collect_hits(query, false).await
    }

    /// Same ranking as [`search`](VectorStore::search), with each hit's
    /// cosine similarity to the query attached as its relevance.
    async fn similarity_search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, StoreError> {
        self.collect_hits(query, true).await
    }

    async fn compact(&self) -> Result<usize, StoreError> {
        let mut state = self.state.write().await;
        let before = state.index.len();

        let keep: Vec<bool> = (0..before).map(|i| state.resolve(i).is_some()).collect();
        let index = state.index.retain(|i| keep[i]);
        let lookup: Vec<String> = state
            .lookup
            .iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(id, _)| id.clone())
            .collect();

        // Live entries keep their relative order, so each document's new
        // start is the number of kept entries before its old start.
        let mut kept_before = vec![0usize; before + 1];
        for i in 0..before {
            kept_before[i + 1] = kept_before[i] + usize::from(keep[i]);
        }
        for stored in state.documents.values_mut() {
            stored.chunk_start = kept_before[stored.chunk_start];
        }

        state.index = index;
        state.lookup = lookup;
        let purged = before - state.index.len();

        if purged > 0 {
            info!("Compacted store: purged {} orphaned entries", purged);
            self.write(&state).await?;
        } else {
            debug!("Compaction found nothing to purge");
        }
        Ok(purged)
    }

    async fn stats(&self) -> StoreStats {
        let state = self.state.read().await;
        let live_chunks: usize = state
            .documents
            .values()
            .map(|s| s.record.chunks.len())
            .sum();
        let total_entries = state.index.len();
        if live_chunks > total_entries {
            warn!(
                "Store holds {} live chunks but only {} vector entries",
                live_chunks, total_entries
            );
        }

        StoreStats {
            documents: state.documents.len(),
            live_chunks,
            total_entries,
            orphaned_entries: total_entries.saturating_sub(live_chunks),
            dimension: self.dimension,
        }
    }

    async fn save(&self) -> Result<(), StoreError> {
        let state = self.state.read().await;
        self.write(&state).await
    }
}

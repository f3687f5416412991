//! Persisted store state and atomic file writes.
//!
//! The whole store is one JSON document: the document map, the id-lookup
//! sequence (one document id per index entry) and the flat index. It is
//! written to `<path>.tmp`, fsynced, then renamed over `<path>`, so readers
//! only ever see a complete snapshot.

use docqa_core::{DocumentRecord, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

use crate::flat::FlatIndex;

const FORMAT_VERSION: u32 = 1;

/// A document plus the position of its first vector in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoredDocument {
    pub record: DocumentRecord,
    pub chunk_start: usize,
}

/// In-memory state of a document index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoreState {
    pub documents: HashMap<String, StoredDocument>,
    pub lookup: Vec<String>,
    pub index: FlatIndex,
}

impl StoreState {
    pub fn empty(dimension: usize) -> Self {
        Self {
            documents: HashMap::new(),
            lookup: Vec::new(),
            index: FlatIndex::new(dimension),
        }
    }

    /// Resolve an index entry to `(document, chunk_index)` if it belongs to
    /// a live document and its chunk is in range.
    pub fn resolve(&self, entry: usize) -> Option<(&StoredDocument, usize)> {
        let document_id = self.lookup.get(entry)?;
        let stored = self.documents.get(document_id)?;
        let chunk_index = entry.checked_sub(stored.chunk_start)?;
        (chunk_index < stored.record.chunks.len()).then_some((stored, chunk_index))
    }

    /// Check the structural invariants of a loaded state.
    pub fn validate(&self, dimension: usize) -> Result<(), StoreError> {
        self.index.validate(dimension)?;

        if self.lookup.len() != self.index.len() {
            return Err(StoreError::Corrupt(format!(
                "lookup holds {} entries but index holds {}",
                self.lookup.len(),
                self.index.len()
            )));
        }

        for (id, stored) in &self.documents {
            if *id != stored.record.document_id {
                return Err(StoreError::Corrupt(format!(
                    "document keyed as {id} records id {}",
                    stored.record.document_id
                )));
            }
            let end = stored
                .chunk_start
                .checked_add(stored.record.chunks.len())
                .ok_or_else(|| {
                    StoreError::Corrupt(format!(
                        "document {id} starts at out-of-range entry {}",
                        stored.chunk_start
                    ))
                })?;
            let owned = self
                .lookup
                .get(stored.chunk_start..end)
                .is_some_and(|ids| ids.iter().all(|entry| entry == id));
            if !owned {
                return Err(StoreError::Corrupt(format!(
                    "entries {}..{end} do not belong to document {id}",
                    stored.chunk_start
                )));
            }
        }

        Ok(())
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    #[serde(flatten)]
    state: &'a StoreState,
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    #[serde(flatten)]
    state: StoreState,
}

/// Serialize the state into its on-disk form.
pub(crate) fn encode(state: &StoreState) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(&SnapshotRef {
        version: FORMAT_VERSION,
        state,
    })
    .map_err(|e| StoreError::Persist(format!("serialization failed: {e}")))
}

/// Parse and validate an on-disk snapshot.
pub(crate) fn decode(bytes: &[u8], dimension: usize) -> Result<StoreState, StoreError> {
    let snapshot: Snapshot =
        serde_json::from_slice(bytes).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    if snapshot.version != FORMAT_VERSION {
        return Err(StoreError::Corrupt(format!(
            "unsupported format version {}",
            snapshot.version
        )));
    }
    snapshot.state.validate(dimension)?;
    Ok(snapshot.state)
}

/// Read a snapshot. A missing file yields `Ok(None)`.
pub(crate) async fn read_state(
    path: &Path,
    dimension: usize,
) -> Result<Option<StoreState>, StoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StoreError::Persist(format!(
                "failed to read {}: {e}",
                path.display()
            )));
        }
    };
    decode(&bytes, dimension).map(Some)
}

/// Write `bytes` to `path` atomically.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let persist_err = |e: std::io::Error| {
        StoreError::Persist(format!("failed to write {}: {e}", path.display()))
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(persist_err)?;
    }

    let tmp = tmp_path(path);
    let result = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(persist_err(e));
    }
    Ok(())
}

/// Move an unreadable snapshot to `<path>.corrupt` so later writes do not
/// overwrite it. Returns the new location.
pub(crate) async fn quarantine(path: &Path) -> Result<PathBuf, StoreError> {
    let target = with_suffix(path, ".corrupt");
    tokio::fs::rename(path, &target).await.map_err(|e| {
        StoreError::Persist(format!(
            "failed to move {} aside: {e}",
            path.display()
        ))
    })?;
    Ok(target)
}

fn tmp_path(path: &Path) -> PathBuf {
    with_suffix(path, ".tmp")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

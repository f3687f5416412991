//! Upload ingestion service.

use chrono::Utc;
use docqa_chunker::ChunkerRegistry;
use docqa_core::{ChunkConfig, DocumentMetadata, Error, ExtractError, Result, VectorStore};
use docqa_embed::EmbedderPool;
use docqa_extract::{ExtractorRegistry, file_extension};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default upload size limit (16 MiB).
pub const DEFAULT_MAX_BYTES: usize = 16 * 1024 * 1024;

/// Configuration for the ingest service.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Lowercase extensions accepted for upload
    pub allowed_extensions: Vec<String>,
    /// Maximum upload size in bytes
    pub max_bytes: usize,
    /// Chunk configuration
    pub chunk_config: ChunkConfig,
    /// Chunking strategy name; `None` uses the registry default
    pub chunk_strategy: Option<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: vec!["pdf".to_string(), "txt".to_string(), "md".to_string()],
            max_bytes: DEFAULT_MAX_BYTES,
            chunk_config: ChunkConfig::default(),
            chunk_strategy: None,
        }
    }
}

/// Result of a successful upload call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    /// The document was extracted, chunked, embedded and stored.
    Stored {
        document_id: String,
        filename: String,
        chunk_count: usize,
    },
    /// Identical bytes were uploaded before; nothing was done.
    AlreadyProcessed {
        document_id: String,
        filename: String,
    },
}

impl UploadOutcome {
    #[must_use]
    pub fn document_id(&self) -> &str {
        match self {
            Self::Stored { document_id, .. } | Self::AlreadyProcessed { document_id, .. } => {
                document_id
            }
        }
    }
}

/// Turns uploaded bytes into stored, searchable documents.
///
/// Pipeline: validate → hash → dedup → extract → chunk → embed → add.
pub struct IngestService {
    store: Arc<dyn VectorStore>,
    extractors: Arc<ExtractorRegistry>,
    chunkers: Arc<ChunkerRegistry>,
    embedder: Arc<EmbedderPool>,
    config: IngestConfig,
}

impl IngestService {
    /// Create a new ingest service.
    pub fn new(
        store: Arc<dyn VectorStore>,
        extractors: Arc<ExtractorRegistry>,
        chunkers: Arc<ChunkerRegistry>,
        embedder: Arc<EmbedderPool>,
        config: IngestConfig,
    ) -> Self {
        Self {
            store,
            extractors,
            chunkers,
            embedder,
            config,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingest one uploaded file.
    ///
    /// Re-uploading identical bytes returns
    /// [`UploadOutcome::AlreadyProcessed`] without extracting or embedding.
    pub async fn upload(&self, filename: &str, data: &[u8]) -> Result<UploadOutcome> {
        let filename = display_name(filename);
        self.validate(&filename, data)?;

        let document_id = document_id(data);
        if self.store.has_document(&document_id).await {
            debug!("Document {} ({}) already processed", document_id, filename);
            return Ok(UploadOutcome::AlreadyProcessed {
                document_id,
                filename,
            });
        }

        let content = self.extractors.extract(&filename, data).await?;
        if content.is_blank() {
            return Err(ExtractError::NoText.into());
        }

        let chunks = self.chunkers.chunk(
            &content,
            self.config.chunk_strategy.as_deref(),
            &self.config.chunk_config,
        )?;
        if chunks.is_empty() {
            return Err(ExtractError::NoText.into());
        }
        debug!("Chunked {} into {} chunks", filename, chunks.len());

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let chunk_count = chunks.len();
        let metadata = DocumentMetadata {
            filename: filename.clone(),
            upload_time: Some(Utc::now()),
        };

        if let Err(e) = self
            .store
            .add_document(&document_id, chunks, embeddings, metadata)
            .await
        {
            // A concurrent upload of the same bytes may have won the race.
            if self.store.has_document(&document_id).await {
                warn!("Document {} was stored concurrently: {}", document_id, e);
                return Ok(UploadOutcome::AlreadyProcessed {
                    document_id,
                    filename,
                });
            }
            return Err(e.into());
        }

        info!(
            "Stored {} as {} ({} chunks)",
            filename, document_id, chunk_count
        );
        Ok(UploadOutcome::Stored {
            document_id,
            filename,
            chunk_count,
        })
    }

    fn validate(&self, filename: &str, data: &[u8]) -> Result<()> {
        let extension = file_extension(filename)
            .ok_or_else(|| Error::InvalidInput(format!("{filename} has no file extension")))?;
        if !self
            .config
            .allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&extension))
        {
            return Err(Error::InvalidInput(format!(
                "unsupported file type: .{extension} (allowed: {})",
                self.config.allowed_extensions.join(", ")
            )));
        }
        if data.is_empty() {
            return Err(Error::InvalidInput(format!("{filename} is empty")));
        }
        if data.len() > self.config.max_bytes {
            return Err(Error::InvalidInput(format!(
                "{filename} is {} bytes, limit is {}",
                data.len(),
                self.config.max_bytes
            )));
        }
        Ok(())
    }
}

/// Content hash used as the document id.
#[must_use]
pub fn document_id(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Final path component of an uploaded filename.
fn display_name(filename: &str) -> String {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filename)
        .to_string()
}

//! Document ingestion pipeline for docqa.
//!
//! This crate turns uploaded bytes into stored documents:
//! validation → content hash → dedup → extraction → chunking → embedding → storage.
//!
//! # Components
//!
//! - [`IngestService`]: Runs the pipeline for one upload at a time
//! - [`IngestConfig`]: Allowed extensions, size limit, chunking settings
//! - [`UploadOutcome`]: Stored, or already processed (identical bytes seen before)
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_index::{IngestConfig, IngestService, UploadOutcome};
//!
//! let ingest = IngestService::new(store, extractors, chunkers, embedder, IngestConfig::default());
//!
//! match ingest.upload("report.pdf", &bytes).await? {
//!     UploadOutcome::Stored { document_id, chunk_count, .. } => { /* ... */ }
//!     UploadOutcome::AlreadyProcessed { document_id, .. } => { /* ... */ }
//! }
//! ```

pub mod ingest;

pub use ingest::{DEFAULT_MAX_BYTES, IngestConfig, IngestService, UploadOutcome, document_id};

//! # docqa-extract
//!
//! Content extraction from uploaded files for the docqa ingestion pipeline.
//!
//! This crate turns raw upload bytes into
//! [`ExtractedContent`](docqa_core::ExtractedContent), one text entry per
//! page, for downstream chunking and embedding.
//!
//! ## Supported Formats
//!
//! | Extractor | Formats | Notes |
//! |-----------|---------|-------|
//! | [`PdfExtractor`] | `.pdf` | Per-page text, large documents split across workers |
//! | [`TextExtractor`] | `.txt`, `.md` | UTF-8 (lossy), Markdown title detection |
//!
//! ## Failure categories
//!
//! Extraction failures are reported through distinct
//! [`ExtractError`](docqa_core::ExtractError) variants so callers can tell
//! an encrypted source from an unreadable one, and both from a readable
//! source that simply carries no text.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use docqa_extract::ExtractorRegistry;
//!
//! let registry = ExtractorRegistry::with_defaults();
//! let content = registry.extract("report.pdf", &bytes).await?;
//! println!("Extracted {} pages", content.pages.len());
//! ```

pub mod pdf;
pub mod registry;
pub mod text;

pub use pdf::PdfExtractor;
pub use registry::{ExtractorRegistry, file_extension};
pub use text::TextExtractor;

//! PDF content extractor.
//!
//! Uses lopdf for per-page text and pdf-extract as a whole-document
//! fallback when lopdf cannot read the text layer.

use async_trait::async_trait;
use docqa_core::{ContentExtractor, ContentMetadataInfo, ExtractError, ExtractedContent};
use futures::future::try_join_all;
use lopdf::Document;
use std::sync::Arc;
use tracing::{debug, warn};

/// Documents with more pages than this are split across workers.
const PARALLEL_PAGE_THRESHOLD: usize = 10;

/// Upper bound on page extraction workers per document.
const MAX_WORKERS: usize = 8;

/// Extractor for PDF files.
pub struct PdfExtractor;

impl PdfExtractor {
    /// Create a new PDF extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for PdfExtractor {
    fn supported_extensions(&self) -> &[&str] {
        &["pdf"]
    }

    async fn extract_bytes(&self, data: &[u8]) -> Result<ExtractedContent, ExtractError> {
        debug!("Extracting PDF ({} bytes)", data.len());

        let bytes = data.to_vec();
        let loaded = tokio::task::spawn_blocking(move || Document::load_mem(&bytes))
            .await
            .map_err(|e| ExtractError::Unreadable(format!("task join error: {e}")))?;

        let doc = match loaded {
            Ok(doc) => doc,
            Err(e) => {
                debug!("lopdf could not load document: {}", e);
                if has_encrypt_marker(data) {
                    return Err(ExtractError::Encrypted);
                }
                return match fallback_pages(data).await {
                    Ok(pages) if !is_blank(&pages) => Ok(paginated(pages, None)),
                    _ => Err(ExtractError::Unreadable(e.to_string())),
                };
            }
        };

        if doc.is_encrypted() {
            return Err(ExtractError::Encrypted);
        }

        let title = document_title(&doc);
        let mut pages = extract_pages(Arc::new(doc)).await?;

        if is_blank(&pages) {
            debug!("Per-page extraction found no text, trying pdf-extract");
            match fallback_pages(data).await {
                Ok(fallback) if !is_blank(&fallback) => pages = fallback,
                Ok(_) => return Err(ExtractError::NoText),
                Err(e) => {
                    debug!("pdf-extract fallback failed: {}", e);
                    return Err(ExtractError::NoText);
                }
            }
        }

        Ok(paginated(pages, title))
    }
}

fn paginated(pages: Vec<String>, title: Option<String>) -> ExtractedContent {
    let page_count = pages.len();
    ExtractedContent {
        pages,
        metadata: ContentMetadataInfo {
            title,
            page_count: Some(page_count),
        },
    }
}

fn is_blank(pages: &[String]) -> bool {
    pages.iter().all(|p| p.trim().is_empty())
}

/// Raw scan for an `/Encrypt` reference, for files lopdf cannot parse.
/// Parsed documents are checked through their trailer instead.
fn has_encrypt_marker(data: &[u8]) -> bool {
    const MARKER: &[u8] = b"/Encrypt";
    data.windows(MARKER.len()).any(|w| w == MARKER)
}

fn document_title(doc: &Document) -> Option<String> {
    let info_id = doc.trailer.get(b"Info").ok()?.as_reference().ok()?;
    let info = doc.get_dictionary(info_id).ok()?;
    let raw = info.get(b"Title").ok()?.as_str().ok()?;
    let title = String::from_utf8_lossy(raw).trim().to_string();
    (!title.is_empty()).then_some(title)
}

/// Extract every page's text, in page order.
///
/// Large documents are partitioned into contiguous page ranges, one per
/// blocking worker. Partitions are rejoined in their original order so the
/// result is identical to a sequential pass.
async fn extract_pages(doc: Arc<Document>) -> Result<Vec<String>, ExtractError> {
    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    if page_numbers.is_empty() {
        return Err(ExtractError::NoText);
    }

    let workers = worker_count(page_numbers.len());
    let partition_size = page_numbers.len().div_ceil(workers);
    debug!(
        "Extracting {} pages with {} worker(s)",
        page_numbers.len(),
        workers
    );

    let handles = page_numbers.chunks(partition_size).map(|partition| {
        let doc = Arc::clone(&doc);
        let partition = partition.to_vec();
        tokio::task::spawn_blocking(move || {
            partition
                .iter()
                .map(|&page| page_text(&doc, page))
                .collect::<Vec<_>>()
        })
    });

    let partitions = try_join_all(handles)
        .await
        .map_err(|e| ExtractError::Unreadable(format!("page worker failed: {e}")))?;

    Ok(partitions.into_iter().flatten().collect())
}

fn worker_count(pages: usize) -> usize {
    if pages <= PARALLEL_PAGE_THRESHOLD {
        return 1;
    }
    let available = std::thread::available_parallelism().map_or(1, |n| n.get());
    available.clamp(1, MAX_WORKERS).min(pages)
}

fn page_text(doc: &Document, page: u32) -> String {
    match doc.extract_text(&[page]) {
        Ok(text) => text,
        Err(e) => {
            warn!("Failed to extract text from page {}: {}", page, e);
            String::new()
        }
    }
}

/// Whole-document extraction through pdf-extract, split on form feeds.
async fn fallback_pages(data: &[u8]) -> Result<Vec<String>, String> {
    let bytes = data.to_vec();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| format!("task join error: {e}"))?
        .map_err(|e| e.to_string())?;

    Ok(text.split('\x0c').map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};

    /// Build a PDF with one page per entry; `None` pages carry no text.
    fn build_pdf(pages: &[Option<&str>], encrypted: bool) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in pages {
            let operations = match text {
                Some(text) => vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
                None => vec![],
            };
            let content = Content { operations };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        if encrypted {
            let encrypt_id = doc.add_object(dictionary! {
                "Filter" => "Standard",
                "V" => 1,
                "R" => 2,
            });
            doc.trailer.set("Encrypt", encrypt_id);
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_supported_extensions() {
        let extractor = PdfExtractor::new();
        assert!(extractor.can_extract("pdf"));
        assert!(extractor.can_extract("PDF"));
        assert!(!extractor.can_extract("txt"));
    }

    #[test]
    fn test_encrypt_marker() {
        assert!(has_encrypt_marker(b"trailer << /Encrypt 5 0 R >>"));
        assert!(!has_encrypt_marker(b"trailer << /Root 1 0 R >>"));
    }

    #[test]
    fn test_worker_count() {
        assert_eq!(worker_count(1), 1);
        assert_eq!(worker_count(PARALLEL_PAGE_THRESHOLD), 1);
        let many = worker_count(200);
        assert!((1..=MAX_WORKERS).contains(&many));
    }

    #[tokio::test]
    async fn test_extract_single_page() {
        let bytes = build_pdf(&[Some("Hello World")], false);
        let content = PdfExtractor::new().extract_bytes(&bytes).await.unwrap();

        assert_eq!(content.pages.len(), 1);
        assert_eq!(content.metadata.page_count, Some(1));
        assert!(content.is_paginated());
        assert!(content.pages[0].contains("Hello"));
    }

    #[tokio::test]
    async fn test_multi_worker_pages_keep_order() {
        let texts: Vec<String> = (1..=24).map(|i| format!("Page{i:02}")).collect();
        let pages: Vec<Option<&str>> = texts.iter().map(|t| Some(t.as_str())).collect();
        let bytes = build_pdf(&pages, false);

        let content = PdfExtractor::new().extract_bytes(&bytes).await.unwrap();
        assert_eq!(content.pages.len(), 24);
        for (page, expected) in content.pages.iter().zip(&texts) {
            assert!(page.contains(expected.as_str()), "{page:?} vs {expected}");
        }
    }

    #[tokio::test]
    async fn test_encrypted_pdf() {
        let bytes = build_pdf(&[Some("secret")], true);
        let err = PdfExtractor::new().extract_bytes(&bytes).await.unwrap_err();
        assert!(matches!(err, ExtractError::Encrypted));
    }

    #[tokio::test]
    async fn test_encrypt_text_in_content_is_not_encryption() {
        let bytes = build_pdf(&[Some("Set /Encrypt in the trailer")], false);
        assert!(has_encrypt_marker(&bytes));

        let content = PdfExtractor::new().extract_bytes(&bytes).await.unwrap();
        assert!(content.pages[0].contains("Encrypt"));
    }

    #[tokio::test]
    async fn test_unreadable_pdf() {
        let err = PdfExtractor::new()
            .extract_bytes(b"this is not a pdf at all")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Unreadable(_)));
    }

    #[tokio::test]
    async fn test_pdf_without_text() {
        let bytes = build_pdf(&[None, None], false);
        let err = PdfExtractor::new().extract_bytes(&bytes).await.unwrap_err();
        assert!(matches!(err, ExtractError::NoText));
    }
}

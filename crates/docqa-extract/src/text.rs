//! Text content extractor.

use async_trait::async_trait;
use docqa_core::{ContentExtractor, ContentMetadataInfo, ExtractError, ExtractedContent};
use tracing::debug;

/// Extractor for plain text and Markdown files.
pub struct TextExtractor;

impl TextExtractor {
    /// Create a new text extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentExtractor for TextExtractor {
    fn supported_extensions(&self) -> &[&str] {
        &["txt", "text", "md", "markdown"]
    }

    async fn extract_bytes(&self, data: &[u8]) -> Result<ExtractedContent, ExtractError> {
        if data.contains(&0) {
            return Err(ExtractError::Unreadable(
                "binary content in text file".to_string(),
            ));
        }

        let text = String::from_utf8_lossy(data);
        if matches!(text, std::borrow::Cow::Owned(_)) {
            debug!("Replaced invalid UTF-8 sequences in text upload");
        }
        let text = text.trim_start_matches('\u{feff}').to_string();

        if text.trim().is_empty() {
            return Err(ExtractError::NoText);
        }

        Ok(ExtractedContent {
            metadata: ContentMetadataInfo {
                title: markdown_title(&text),
                page_count: None,
            },
            pages: vec![text],
        })
    }
}

/// First level-one Markdown heading, if any.
fn markdown_title(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
}

//! Extractor registry for managing content extractors.

use docqa_core::{ContentExtractor, ExtractError, ExtractedContent};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::{PdfExtractor, TextExtractor};

/// Registry of content extractors.
pub struct ExtractorRegistry {
    /// Named extractors
    extractors: HashMap<String, Arc<dyn ContentExtractor>>,
    /// Extension to extractor name mapping
    extension_mapping: HashMap<String, String>,
}

impl ExtractorRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            extractors: HashMap::new(),
            extension_mapping: HashMap::new(),
        }
    }

    /// Registry with the PDF and text extractors.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("pdf", PdfExtractor::new());
        registry.register("text", TextExtractor::new());
        registry
    }

    /// Register an extractor under a name.
    ///
    /// Later registrations take over the extensions they share with
    /// earlier ones.
    pub fn register<E: ContentExtractor + 'static>(&mut self, name: &str, extractor: E) {
        let extractor = Arc::new(extractor);
        for ext in extractor.supported_extensions() {
            self.extension_mapping
                .insert(ext.to_ascii_lowercase(), name.to_string());
        }
        self.extractors.insert(name.to_string(), extractor);
    }

    /// Get an extractor for a file extension.
    #[must_use]
    pub fn get_for_extension(&self, extension: &str) -> Option<Arc<dyn ContentExtractor>> {
        self.extension_mapping
            .get(&extension.to_ascii_lowercase())
            .and_then(|name| self.extractors.get(name))
            .cloned()
    }

    /// Every extension some registered extractor handles, sorted.
    #[must_use]
    pub fn extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.extension_mapping.keys().cloned().collect();
        extensions.sort();
        extensions
    }

    /// Extract content from an uploaded file's bytes, routed by filename.
    pub async fn extract(
        &self,
        filename: &str,
        data: &[u8],
    ) -> Result<ExtractedContent, ExtractError> {
        let extension = file_extension(filename)
            .ok_or_else(|| ExtractError::UnsupportedType(filename.to_string()))?;
        let extractor = self
            .get_for_extension(&extension)
            .ok_or_else(|| ExtractError::UnsupportedType(extension.clone()))?;

        extractor.extract_bytes(data).await
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Lowercase extension of a filename, without the dot.
#[must_use]
pub fn file_extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

//! Embedding provider selection.
//!
//! A provider exposes either a direct single-text encoder or a
//! document/query embedder. The capability is chosen once, when the
//! provider is built, and every later call dispatches on that choice.

use docqa_core::{EmbedError, Embedder, Encoder};
use std::sync::Arc;

/// An embedding backend tagged with the capability used to call it.
#[derive(Clone)]
pub enum EmbeddingProvider {
    /// Single-text `encode` for both questions and documents
    DirectEncode(Arc<dyn Encoder>),
    /// `embed_query` for questions, `embed_documents` for documents
    QueryEmbed(Arc<dyn Embedder>),
    /// `embed_documents` for everything
    DocEmbed(Arc<dyn Embedder>),
}

impl std::fmt::Debug for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingProvider")
            .field("kind", &self.kind())
            .field("model", &self.model_name())
            .field("dimension", &self.dimension())
            .finish()
    }
}

impl EmbeddingProvider {
    /// Pick the first available capability: a direct encoder, then a
    /// query-aware embedder, then a document-only embedder.
    pub fn select(
        encoder: Option<Arc<dyn Encoder>>,
        embedder: Option<Arc<dyn Embedder>>,
    ) -> Result<Self, EmbedError> {
        match (encoder, embedder) {
            (Some(encoder), _) => Ok(Self::DirectEncode(encoder)),
            (None, Some(embedder)) if embedder.supports_query_embedding() => {
                Ok(Self::QueryEmbed(embedder))
            }
            (None, Some(embedder)) => Ok(Self::DocEmbed(embedder)),
            (None, None) => Err(EmbedError::Unsupported(
                "provider exposes no encode, embed_query or embed_documents capability"
                    .to_string(),
            )),
        }
    }

    /// Build from an embedder, honoring its query capability.
    #[must_use]
    pub fn from_embedder(embedder: Arc<dyn Embedder>) -> Self {
        if embedder.supports_query_embedding() {
            Self::QueryEmbed(embedder)
        } else {
            Self::DocEmbed(embedder)
        }
    }

    /// Short name of the selected capability.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DirectEncode(_) => "direct_encode",
            Self::QueryEmbed(_) => "query_embed",
            Self::DocEmbed(_) => "doc_embed",
        }
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        match self {
            Self::DirectEncode(e) => e.model_name(),
            Self::QueryEmbed(e) | Self::DocEmbed(e) => e.model_name(),
        }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        match self {
            Self::DirectEncode(e) => e.dimension(),
            Self::QueryEmbed(e) | Self::DocEmbed(e) => e.dimension(),
        }
    }

    /// Embed a question.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        match self {
            Self::DirectEncode(e) => e.encode(text).await,
            Self::QueryEmbed(e) => e.embed_query(text).await,
            Self::DocEmbed(e) => e
                .embed_documents(&[text])
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| EmbedError::Inference("empty embedding result".to_string())),
        }
    }

    /// Embed document texts, one vector per input in order.
    pub async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let vectors = match self {
            Self::DirectEncode(e) => {
                let mut vectors = Vec::with_capacity(texts.len());
                for text in texts {
                    vectors.push(e.encode(text).await?);
                }
                vectors
            }
            Self::QueryEmbed(e) | Self::DocEmbed(e) => e.embed_documents(texts).await?,
        };

        if vectors.len() != texts.len() {
            return Err(EmbedError::Inference(format!(
                "provider returned {} embeddings for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }
}

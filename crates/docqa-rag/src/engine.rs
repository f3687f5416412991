//! Query and summarization orchestration.

use docqa_core::{SearchHit, SearchQuery, VectorStore};
use docqa_embed::EmbedderPool;
use docqa_store::cosine_similarity;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::format::format_response;
use crate::generation::GenerationProvider;
use crate::prompt::{answer_prompt, summary_prompt};

pub const EMPTY_QUESTION: &str = "Please provide a question.";
pub const NO_CONTEXT: &str = "I couldn't find any relevant information in the uploaded documents to answer this question.";
pub const DOCUMENT_NOT_FOUND: &str = "Document not found.";
pub const EMPTY_DOCUMENT: &str = "No content found in document.";

const GENERATOR_UNAVAILABLE: &str = "The language model is currently unavailable, so here are the most relevant passages from your documents:";

/// Orchestrator settings.
#[derive(Debug, Clone)]
pub struct RagConfig {
    /// Candidates retrieved per query
    pub top_k: usize,
    /// Rerank candidates by cosine similarity
    pub rerank: bool,
    /// Upper bound on passages in the context block
    pub max_context_chunks: usize,
    /// Characters of document text sent for summarization
    pub summary_char_budget: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            rerank: true,
            max_context_chunks: 5,
            summary_char_budget: 4000,
        }
    }
}

/// States of a single query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    Embedding,
    Retrieval,
    Rerank,
    ContextBuild,
    Generation,
    Format,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Embedding => "embedding",
            Self::Retrieval => "retrieval",
            Self::Rerank => "rerank",
            Self::ContextBuild => "context build",
            Self::Generation => "generation",
            Self::Format => "format",
        };
        f.write_str(name)
    }
}

/// A query failure tagged with the stage it happened in.
#[derive(Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct QueryError {
    pub stage: QueryStage,
    #[source]
    pub source: docqa_core::Error,
}

impl QueryError {
    fn new(stage: QueryStage, source: impl Into<docqa_core::Error>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }

    /// Text shown to the user in place of an answer.
    #[must_use]
    pub fn user_message(&self) -> String {
        let what = match self.stage {
            QueryStage::Embedding => "I couldn't process your question",
            QueryStage::Retrieval => "I couldn't retrieve context from the uploaded documents",
            QueryStage::Rerank => "I couldn't rank the retrieved passages",
            QueryStage::ContextBuild => "I couldn't assemble context for your question",
            QueryStage::Generation => "I couldn't generate an answer",
            QueryStage::Format => "I couldn't format the answer",
        };
        format!("Sorry, {what}: {}", self.source)
    }
}

/// Retrieval-augmented question answering over a [`VectorStore`].
///
/// `query` and `summarize_document` always return text. Failures become
/// user-facing messages and generation failures fall back to deterministic
/// answers built from the stored text.
pub struct RagEngine {
    store: Arc<dyn VectorStore>,
    embedder: Arc<EmbedderPool>,
    generator: Option<GenerationProvider>,
    config: RagConfig,
}

impl RagEngine {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<EmbedderPool>,
        generator: Option<GenerationProvider>,
        config: RagConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            generator,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    #[must_use]
    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Answer a question with the configured `top_k` and rerank setting.
    pub async fn query(&self, question: &str) -> String {
        self.query_with(question, self.config.top_k, self.config.rerank)
            .await
    }

    /// Answer a question from the `k` closest chunks.
    pub async fn query_with(&self, question: &str, k: usize, rerank: bool) -> String {
        let question = question.trim();
        if question.is_empty() {
            return EMPTY_QUESTION.to_string();
        }

        match self.run_query(question, k, rerank).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Query failed: {}", e);
                e.user_message()
            }
        }
    }

    async fn run_query(&self, question: &str, k: usize, rerank: bool) -> Result<String, QueryError> {
        debug!(stage = %QueryStage::Embedding, "Embedding question");
        let query_embedding = self
            .embedder
            .embed_query(question)
            .await
            .map_err(|e| QueryError::new(QueryStage::Embedding, e))?;

        debug!(stage = %QueryStage::Retrieval, "Retrieving {} candidates", k);
        let query = SearchQuery::new(query_embedding.clone(), k);
        let mut hits = self.retrieve(&query).await?;
        if hits.is_empty() {
            info!("No context found for question");
            return Ok(NO_CONTEXT.to_string());
        }

        if rerank && hits.len() > 1 {
            debug!(stage = %QueryStage::Rerank, "Reranking {} candidates", hits.len());
            if let Err(e) = self.rerank(&query_embedding, &mut hits).await {
                warn!("{}; keeping retrieval order", e);
            }
        }

        debug!(stage = %QueryStage::ContextBuild, "Building context");
        let context = build_context(&hits, self.config.max_context_chunks);

        match self.generate(&answer_prompt(&context, question)).await {
            Ok(answer) => Ok(answer),
            Err(e) => {
                warn!("{}; answering from retrieved passages", e);
                Ok(extractive_answer(&context))
            }
        }
    }

    /// Search, falling back to the store's alternate entry point.
    async fn retrieve(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, QueryError> {
        match self.store.search(query).await {
            Ok(hits) => Ok(hits),
            Err(primary) => {
                warn!("Search failed ({}); trying similarity search", primary);
                self.store
                    .similarity_search(query)
                    .await
                    .map_err(|e| QueryError::new(QueryStage::Retrieval, e))
            }
        }
    }

    /// Order hits by descending relevance to the query.
    ///
    /// Scores already present on every hit are used as is. Otherwise each
    /// hit's text is embedded and scored by cosine similarity; the scores
    /// live only on these query-local hits. On error `hits` is untouched.
    async fn rerank(&self, query_embedding: &[f32], hits: &mut [SearchHit]) -> Result<(), QueryError> {
        if hits.iter().any(|hit| hit.relevance.is_none()) {
            let texts: Vec<&str> = hits.iter().map(|hit| hit.chunk_text.as_str()).collect();
            let embeddings = self
                .embedder
                .embed_batch(&texts)
                .await
                .map_err(|e| QueryError::new(QueryStage::Rerank, e))?;
            for (hit, embedding) in hits.iter_mut().zip(&embeddings) {
                hit.relevance = Some(cosine_similarity(query_embedding, embedding));
            }
        }

        hits.sort_by(|a, b| {
            let a = a.relevance.unwrap_or(f32::NEG_INFINITY);
            let b = b.relevance.unwrap_or(f32::NEG_INFINITY);
            b.total_cmp(&a)
        });
        Ok(())
    }

    /// Run the prompt through the generator and format the result.
    async fn generate(&self, prompt: &str) -> Result<String, QueryError> {
        let Some(generator) = &self.generator else {
            return Err(QueryError::new(
                QueryStage::Generation,
                docqa_core::GenerateError::Unavailable("no generation provider configured".to_string()),
            ));
        };

        debug!(stage = %QueryStage::Generation, "Generating with {}", generator.name());
        let raw = generator
            .generate_text(prompt)
            .await
            .map_err(|e| QueryError::new(QueryStage::Generation, e))?;

        debug!(stage = %QueryStage::Format, "Formatting {} chars", raw.len());
        let answer = format_response(&raw);
        if answer.is_empty() {
            return Err(QueryError::new(
                QueryStage::Format,
                docqa_core::GenerateError::UnrecognizedShape("empty answer".to_string()),
            ));
        }
        Ok(answer)
    }

    /// Summarize a stored document.
    pub async fn summarize_document(&self, document_id: &str) -> String {
        let Some(record) = self.store.get_document(document_id).await else {
            return DOCUMENT_NOT_FOUND.to_string();
        };

        let full_text = record.full_text();
        if full_text.trim().is_empty() {
            return EMPTY_DOCUMENT.to_string();
        }

        let text: String = full_text.chars().take(self.config.summary_char_budget).collect();
        match self.generate(&summary_prompt(&record.filename, &text)).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("{}; using template summary for {}", e, document_id);
                fallback_summary(&record.filename, record.chunk_count())
            }
        }
    }
}

/// Render the top `limit` hits as numbered context passages.
#[must_use]
pub fn build_context(hits: &[SearchHit], limit: usize) -> String {
    let mut context = String::new();
    for (i, hit) in hits.iter().take(limit).enumerate() {
        let mut annotations = Vec::new();
        if let Some(source) = &hit.source {
            annotations.push(format!("Source: {source}"));
        }
        if let Some(page) = hit.page {
            annotations.push(format!("Page: {page}"));
        }

        context.push_str(&format!("[{}]", i + 1));
        if !annotations.is_empty() {
            context.push_str(&format!(" ({})", annotations.join(", ")));
        }
        context.push('\n');
        context.push_str(hit.chunk_text.trim());
        context.push_str("\n\n");
    }
    context
}

fn extractive_answer(context: &str) -> String {
    format!("{GENERATOR_UNAVAILABLE}\n\n{}", context.trim_end())
}

fn fallback_summary(filename: &str, chunk_count: usize) -> String {
    format!(
        "Document Summary\n\n\
         Filename: {filename}\n\
         Content Structure: {chunk_count} text sections\n\n\
         This document contains structured content that has been processed and stored in the system.\n\
         To get a detailed AI-generated summary, please ensure your language model is properly configured."
    )
}

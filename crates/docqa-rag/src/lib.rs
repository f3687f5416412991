//! Retrieval-augmented question answering for docqa.
//!
//! [`RagEngine`] runs a query through embedding, retrieval, optional
//! reranking, context assembly, generation and formatting. Every stage
//! failure is turned into a textual answer, and generation failures fall
//! back to extractive answers and template summaries.
//!
//! Language-model backends implement [`Generator`] and are wrapped in a
//! [`GenerationProvider`], which fixes their [`ResponseShape`] and a call
//! timeout.

pub mod engine;
pub mod format;
pub mod generation;
pub mod huggingface;
pub mod prompt;

pub use engine::{QueryError, QueryStage, RagConfig, RagEngine, build_context};
pub use format::format_response;
pub use generation::{FnGenerator, GenerationProvider, Generator, ResponseShape};
pub use huggingface::{HuggingFaceConfig, HuggingFaceGenerator};

//! Document chunking strategies for docqa.
//!
//! | Strategy | Type | Behavior |
//! |----------|------|----------|
//! | `semantic` | [`SemanticChunker`] | Sections and paragraphs packed greedily, sentence split for oversized paragraphs |
//! | `fixed` | [`FixedSizeChunker`] | Sliding character windows per page |
//!
//! [`ChunkerRegistry`] selects a strategy by name.

pub mod fixed;
pub mod registry;
pub mod semantic;

pub use fixed::FixedSizeChunker;
pub use registry::ChunkerRegistry;
pub use semantic::{SemanticChunker, chunk_text};

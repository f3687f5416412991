//! Semantic chunking strategy.
//!
//! Splits text at structural boundaries: sections (markdown or underline
//! headings), then paragraphs (blank lines), then sentences. Chunks are
//! packed greedily up to `chunk_size` characters. A section that fits in one
//! chunk is never split across two.
//!
//! Overlap between chunks:
//! - paragraph chunks carry the last paragraph of the closed chunk forward
//!   when the closed chunk held more than one paragraph
//! - sentence chunks (from an oversized paragraph) carry the last one or two
//!   sentences forward
//!
//! A seed is only carried when it fits within `overlap` and leaves room for
//! the next unit, so every chunk stays within `chunk_size` and every step
//! consumes input. Sentences longer than `chunk_size` are hard cut.

use docqa_core::{Chunk, ChunkConfig, ChunkError, Chunker, ExtractedContent};
use tracing::debug;

const PARAGRAPH_SEP: &str = "\n\n";
const SENTENCE_SEP: &str = " ";
const MAX_SENTENCE_SEED: usize = 2;

/// Semantic chunker that splits at document structure boundaries.
pub struct SemanticChunker;

impl SemanticChunker {
    /// Create a new semantic chunker.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for SemanticChunker {
    fn default() -> Self {
        Self::new()
    }
}

impl Chunker for SemanticChunker {
    fn name(&self) -> &str {
        "semantic"
    }

    fn chunk(
        &self,
        content: &ExtractedContent,
        config: &ChunkConfig,
    ) -> Result<Vec<Chunk>, ChunkError> {
        let paginated = content.is_paginated();
        let pages: Vec<(Option<u32>, &str)> = content
            .pages
            .iter()
            .enumerate()
            .map(|(i, text)| (paginated.then(|| page_number(i)), text.as_str()))
            .collect();

        let chunks = chunk_pages(&pages, config.chunk_size, config.overlap)?;
        debug!(
            "Semantic chunking {} pages into {} chunks",
            pages.len(),
            chunks.len()
        );
        Ok(chunks)
    }
}

/// Chunk a single unpaginated text.
///
/// Empty or whitespace-only input yields no chunks. `chunk_size` must be at
/// least 1.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>, ChunkError> {
    chunk_pages(&[(None, text)], chunk_size, overlap)
}

fn page_number(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}

fn chunk_pages(
    pages: &[(Option<u32>, &str)],
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>, ChunkError> {
    if chunk_size == 0 {
        return Err(ChunkError::InvalidConfig(
            "chunk_size must be at least 1".to_string(),
        ));
    }

    let normalized: Vec<(Option<u32>, String)> = pages
        .iter()
        .map(|(page, text)| (*page, normalize(text)))
        .collect();
    let sections = parse_sections(&normalized);

    let mut packer = Packer::new(chunk_size, overlap);
    for section in &sections {
        let section_len = section.char_len();
        if section_len <= chunk_size {
            if !packer.fits(section_len) {
                packer.close(section_len);
            }
            for paragraph in &section.paragraphs {
                packer.append(paragraph, &section.heading);
            }
            continue;
        }

        if let Some(first) = section.paragraphs.first() {
            packer.close(first.len);
        }
        for paragraph in &section.paragraphs {
            if paragraph.len > chunk_size {
                packer.close(paragraph.len);
                for piece in split_oversized(&paragraph.text, chunk_size, overlap) {
                    packer.push_chunk(piece, &section.heading, paragraph.page);
                }
            } else {
                if !packer.fits(paragraph.len) {
                    packer.close(paragraph.len);
                }
                packer.append(paragraph, &section.heading);
            }
        }
    }
    packer.emit();

    Ok(packer.chunks)
}

/// Convert line endings and page feeds, drop other control characters.
fn normalize(text: &str) -> String {
    let text = text.replace("\r\n", "\n");
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\r' => out.push('\n'),
            '\x0c' => out.push_str("\n\n"),
            '\n' | '\t' => out.push(c),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

// ============================================================================
// Structure parsing
// ============================================================================

#[derive(Debug, Clone)]
struct Paragraph {
    text: String,
    len: usize,
    page: Option<u32>,
}

impl Paragraph {
    fn new(text: String, page: Option<u32>) -> Self {
        let len = char_len(&text);
        Self { text, len, page }
    }
}

/// A run of paragraphs under one heading.
#[derive(Debug, Default)]
struct Section {
    heading: Option<String>,
    paragraphs: Vec<Paragraph>,
}

impl Section {
    fn char_len(&self) -> usize {
        let text: usize = self.paragraphs.iter().map(|p| p.len).sum();
        text + PARAGRAPH_SEP.len() * self.paragraphs.len().saturating_sub(1)
    }

    fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }
}

/// Collects lines into paragraphs and paragraphs into sections.
struct SectionBuilder {
    sections: Vec<Section>,
    current: Section,
    lines: Vec<String>,
    page: Option<u32>,
}

impl SectionBuilder {
    fn new() -> Self {
        Self {
            sections: Vec::new(),
            current: Section::default(),
            lines: Vec::new(),
            page: None,
        }
    }

    fn flush_paragraph(&mut self) {
        if self.lines.is_empty() {
            return;
        }
        let text = self.lines.join("\n").trim().to_string();
        self.lines.clear();
        if !text.is_empty() {
            self.current.paragraphs.push(Paragraph::new(text, self.page));
        }
    }

    /// Start a new section whose first paragraph is the heading line.
    fn start_section(&mut self, heading: String, heading_line: String) {
        self.flush_paragraph();
        let finished = std::mem::take(&mut self.current);
        if !finished.is_empty() {
            self.sections.push(finished);
        }
        self.current.heading = Some(heading);
        self.current
            .paragraphs
            .push(Paragraph::new(heading_line, self.page));
    }

    fn finish(mut self) -> Vec<Section> {
        self.flush_paragraph();
        if !self.current.is_empty() {
            self.sections.push(self.current);
        }
        self.sections
    }
}

/// Parse page texts into sections of paragraphs.
///
/// Paragraphs end at blank lines and at page boundaries; sections start at
/// markdown headings (`# Title`) and underline headings (`Title` over `===`).
fn parse_sections(pages: &[(Option<u32>, String)]) -> Vec<Section> {
    let mut builder = SectionBuilder::new();

    for (page, text) in pages {
        builder.flush_paragraph();
        builder.page = *page;

        for line in text.lines() {
            let line = line.trim_end();
            if line.trim().is_empty() {
                builder.flush_paragraph();
            } else if let Some((_, heading)) = parse_markdown_heading(line) {
                builder.start_section(heading, line.trim().to_string());
            } else if is_underline_heading(line, builder.lines.last().map(String::as_str)) {
                if let Some(title) = builder.lines.pop() {
                    let title = title.trim().to_string();
                    builder.start_section(title.clone(), title);
                }
            } else {
                builder.lines.push(line.to_string());
            }
        }
    }

    builder.finish()
}

/// Parse a markdown-style heading (# Heading).
fn parse_markdown_heading(line: &str) -> Option<(u8, String)> {
    let trimmed = line.trim_start();
    if !trimmed.starts_with('#') {
        return None;
    }

    let hash_count = trimmed.chars().take_while(|c| *c == '#').count();
    if hash_count > 6 {
        return None;
    }

    let rest = &trimmed[hash_count..];
    if rest.trim().is_empty() || !rest.starts_with(char::is_whitespace) {
        return None;
    }

    Some((u8::try_from(hash_count).unwrap_or(6), rest.trim().to_string()))
}

/// Check if a line underlines the previous line of the same paragraph.
fn is_underline_heading(line: &str, previous: Option<&str>) -> bool {
    let trimmed = line.trim();
    if trimmed.len() < 3 {
        return false;
    }

    let is_equals = trimmed.chars().all(|c| c == '=');
    let is_dashes = trimmed.chars().all(|c| c == '-');
    if !is_equals && !is_dashes {
        return false;
    }

    previous.is_some_and(|prev| {
        let prev = prev.trim();
        !prev.is_empty() && !prev.starts_with('#')
    })
}

// ============================================================================
// Packing
// ============================================================================

/// Greedy paragraph packer.
struct Packer {
    chunk_size: usize,
    overlap: usize,
    parts: Vec<(String, usize)>,
    len: usize,
    // Whether `parts` holds anything beyond a carried seed.
    fresh: bool,
    section: Option<String>,
    page: Option<u32>,
    chunks: Vec<Chunk>,
}

impl Packer {
    fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunk_size,
            overlap,
            parts: Vec::new(),
            len: 0,
            fresh: false,
            section: None,
            page: None,
            chunks: Vec::new(),
        }
    }

    fn joined_len(&self, extra: usize) -> usize {
        if self.parts.is_empty() {
            extra
        } else {
            self.len + PARAGRAPH_SEP.len() + extra
        }
    }

    fn fits(&self, extra: usize) -> bool {
        self.joined_len(extra) <= self.chunk_size
    }

    fn append(&mut self, paragraph: &Paragraph, section: &Option<String>) {
        self.len = self.joined_len(paragraph.len);
        self.parts.push((paragraph.text.clone(), paragraph.len));
        if !self.fresh {
            self.fresh = true;
            self.section.clone_from(section);
            self.page = paragraph.page;
        }
    }

    /// Emit the running chunk if it holds new content, then reset.
    fn emit(&mut self) {
        if self.fresh {
            let text = self
                .parts
                .iter()
                .map(|(t, _)| t.as_str())
                .collect::<Vec<_>>()
                .join(PARAGRAPH_SEP);
            let section = self.section.take();
            let page = self.page.take();
            self.push_chunk(text, &section, page);
        }
        self.parts.clear();
        self.len = 0;
        self.fresh = false;
    }

    /// Close the running chunk, seeding the next one with its last paragraph
    /// when that paragraph fits the overlap and leaves room for `next_len`.
    fn close(&mut self, next_len: usize) {
        let seed = match self.parts.as_slice() {
            [.., (text, len)]
                if self.fresh
                    && self.parts.len() > 1
                    && *len <= self.overlap
                    && *len + PARAGRAPH_SEP.len() + next_len <= self.chunk_size =>
            {
                Some((text.clone(), *len))
            }
            _ => None,
        };

        self.emit();

        if let Some((text, len)) = seed {
            self.parts.push((text, len));
            self.len = len;
        }
    }

    fn push_chunk(&mut self, text: String, section: &Option<String>, page: Option<u32>) {
        let chunk = Chunk::new(text, self.chunks.len())
            .with_section(section.clone())
            .with_page(page);
        self.chunks.push(chunk);
    }
}

/// Split a paragraph longer than `chunk_size` into sentence-packed pieces.
fn split_oversized(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let units: Vec<(String, usize)> = split_sentences(text)
        .into_iter()
        .flat_map(|sentence| hard_cut(&sentence, chunk_size))
        .map(|unit| {
            let len = char_len(&unit);
            (unit, len)
        })
        .collect();

    let mut pieces = Vec::new();
    let mut current: Vec<(String, usize)> = Vec::new();
    let mut current_len = 0;
    let mut fresh = false;

    for (unit, unit_len) in units {
        let needed = if current.is_empty() {
            unit_len
        } else {
            current_len + SENTENCE_SEP.len() + unit_len
        };

        if needed > chunk_size {
            if fresh {
                pieces.push(join_units(&current));
            }
            current = sentence_seed(&current, unit_len, chunk_size, overlap);
            current_len = joined_units_len(&current);
        }

        if !current.is_empty() {
            current_len += SENTENCE_SEP.len();
        }
        current_len += unit_len;
        current.push((unit, unit_len));
        fresh = true;
    }

    if fresh {
        pieces.push(join_units(&current));
    }
    pieces
}

/// The last one or two sentences of a closed piece, if they fit the overlap
/// and leave room for the next unit.
fn sentence_seed(
    current: &[(String, usize)],
    next_len: usize,
    chunk_size: usize,
    overlap: usize,
) -> Vec<(String, usize)> {
    for take in (1..=MAX_SENTENCE_SEED).rev() {
        if current.len() < take {
            continue;
        }
        let tail = &current[current.len() - take..];
        let tail_len = joined_units_len(tail);
        if tail_len <= overlap && tail_len + SENTENCE_SEP.len() + next_len <= chunk_size {
            return tail.to_vec();
        }
    }
    Vec::new()
}

fn joined_units_len(units: &[(String, usize)]) -> usize {
    let text: usize = units.iter().map(|(_, len)| len).sum();
    text + SENTENCE_SEP.len() * units.len().saturating_sub(1)
}

fn join_units(units: &[(String, usize)]) -> String {
    units
        .iter()
        .map(|(t, _)| t.as_str())
        .collect::<Vec<_>>()
        .join(SENTENCE_SEP)
}

/// Split at terminal punctuation followed by whitespace.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?')
            && chars.peek().is_some_and(|(_, next)| next.is_whitespace())
        {
            let end = i + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            start = end;
        }
    }

    let rest = text[start..].trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }
    sentences
}

/// Cut text into pieces of at most `size` characters, dropping blank pieces.
fn hard_cut(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|piece| piece.iter().collect::<String>().trim().to_string())
        .filter(|piece| !piece.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::ContentMetadataInfo;

    fn texts(chunks: &[Chunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    // ==================== Parsing Tests ====================

    #[test]
    fn test_parse_markdown_heading() {
        assert_eq!(
            parse_markdown_heading("# Title"),
            Some((1, "Title".to_string()))
        );
        assert_eq!(
            parse_markdown_heading("### Deep"),
            Some((3, "Deep".to_string()))
        );
        assert_eq!(parse_markdown_heading("#hashtag"), None);
        assert_eq!(parse_markdown_heading("#"), None);
        assert_eq!(parse_markdown_heading("####### Seven"), None);
        assert_eq!(parse_markdown_heading("plain"), None);
    }

    #[test]
    fn test_is_underline_heading() {
        assert!(is_underline_heading("=====", Some("Title")));
        assert!(is_underline_heading("---", Some("Subtitle")));
        assert!(!is_underline_heading("---", None));
        assert!(!is_underline_heading("---", Some("# Heading")));
        assert!(!is_underline_heading("==", Some("Title")));
        assert!(!is_underline_heading("=-=", Some("Title")));
    }

    #[test]
    fn test_parse_sections_splits_on_headings() {
        let pages = vec![(
            None,
            "Preamble.\n\n# First\n\nBody one.\n\nTitle Two\n=========\nBody two.".to_string(),
        )];
        let sections = parse_sections(&pages);

        assert_eq!(sections.len(), 3);
        assert!(sections[0].heading.is_none());
        assert_eq!(sections[1].heading.as_deref(), Some("First"));
        assert_eq!(sections[1].paragraphs[0].text, "# First");
        assert_eq!(sections[2].heading.as_deref(), Some("Title Two"));
        assert_eq!(sections[2].paragraphs.len(), 2);
        assert_eq!(sections[2].paragraphs[1].text, "Body two.");
    }

    #[test]
    fn test_parse_sections_paragraphs_end_at_page_boundary() {
        let pages = vec![
            (Some(1), "line one".to_string()),
            (Some(2), "line two".to_string()),
        ];
        let sections = parse_sections(&pages);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].paragraphs.len(), 2);
        assert_eq!(sections[0].paragraphs[0].page, Some(1));
        assert_eq!(sections[0].paragraphs[1].page, Some(2));
    }

    #[test]
    fn test_normalize_line_endings_and_form_feed() {
        assert_eq!(normalize("a\r\nb\rc"), "a\nb\nc");
        assert_eq!(normalize("a\x0cb"), "a\n\nb");
        assert_eq!(normalize("a\u{0}b"), "ab");
    }

    #[test]
    fn test_split_sentences() {
        let sentences = split_sentences("One. Two!  Three? Four");
        assert_eq!(sentences, vec!["One.", "Two!", "Three?", "Four"]);
        assert_eq!(split_sentences("3.14 is pi."), vec!["3.14 is pi."]);
    }

    #[test]
    fn test_hard_cut() {
        assert_eq!(hard_cut("abcdefg", 3), vec!["abc", "def", "g"]);
        assert_eq!(hard_cut("ééé", 2), vec!["éé", "é"]);
        assert_eq!(hard_cut("# H", 1), vec!["#", "H"]);
    }

    // ==================== Chunking Tests ====================

    #[test]
    fn test_chunker_name() {
        assert_eq!(SemanticChunker::new().name(), "semantic");
    }

    #[test]
    fn test_chunk_empty_text() {
        assert!(chunk_text("", 100, 10).unwrap().is_empty());
        assert!(chunk_text("   \n\n\t  ", 100, 10).unwrap().is_empty());
    }

    #[test]
    fn test_chunk_zero_size_rejected() {
        let err = chunk_text("text", 0, 0).unwrap_err();
        assert!(matches!(err, ChunkError::InvalidConfig(_)));
    }

    #[test]
    fn test_chunk_simple_text() {
        let chunks = chunk_text("Hello world.\n\nSecond paragraph.", 1000, 200).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello world.\n\nSecond paragraph.");
        assert_eq!(chunks[0].sequence_index, 0);
        assert_eq!(chunks[0].length, chunks[0].text.chars().count());
        assert!(chunks[0].page.is_none());
    }

    #[test]
    fn test_paragraph_overlap_carries_last_paragraph() {
        let p1 = "a".repeat(40);
        let p2 = "b".repeat(40);
        let p3 = "c".repeat(40);
        let text = format!("{p1}\n\n{p2}\n\n{p3}");

        let chunks = chunk_text(&text, 100, 50).unwrap();
        assert_eq!(
            texts(&chunks),
            vec![format!("{p1}\n\n{p2}"), format!("{p2}\n\n{p3}")]
        );
        assert_eq!(chunks[1].sequence_index, 1);
    }

    #[test]
    fn test_no_overlap_when_paragraph_exceeds_overlap() {
        let p1 = "a".repeat(40);
        let p2 = "b".repeat(40);
        let p3 = "c".repeat(40);
        let text = format!("{p1}\n\n{p2}\n\n{p3}");

        let chunks = chunk_text(&text, 100, 0).unwrap();
        assert_eq!(texts(&chunks), vec![format!("{p1}\n\n{p2}"), p3]);
    }

    #[test]
    fn test_no_overlap_after_single_paragraph_chunk() {
        let p1 = "a".repeat(70);
        let p2 = "b".repeat(70);
        let chunks = chunk_text(&format!("{p1}\n\n{p2}"), 100, 200).unwrap();
        assert_eq!(texts(&chunks), vec![p1, p2]);
    }

    #[test]
    fn test_section_kept_whole_when_it_fits() {
        let body_a = "a".repeat(30);
        let body_b1 = "b".repeat(30);
        let body_b2 = "d".repeat(30);
        let text = format!("# A\n\n{body_a}\n\n# B\n\n{body_b1}\n\n{body_b2}");

        // Section A is 35 chars, section B is 67; together they exceed 100.
        let chunks = chunk_text(&text, 100, 0).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, format!("# A\n\n{body_a}"));
        assert_eq!(chunks[0].source_section.as_deref(), Some("A"));
        assert_eq!(chunks[1].text, format!("# B\n\n{body_b1}\n\n{body_b2}"));
        assert_eq!(chunks[1].source_section.as_deref(), Some("B"));
    }

    #[test]
    fn test_small_sections_share_a_chunk() {
        let text = "# A\n\nalpha\n\n# B\n\nbeta";
        let chunks = chunk_text(text, 1000, 200).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].source_section.as_deref(), Some("A"));
        assert!(chunks[0].text.contains("beta"));
    }

    #[test]
    fn test_oversized_paragraph_without_boundaries_is_hard_cut() {
        let text = "x".repeat(2500);
        let chunks = chunk_text(&text, 1000, 200).unwrap();
        let lengths: Vec<usize> = chunks.iter().map(|c| c.length).collect();
        assert_eq!(lengths, vec![1000, 1000, 500]);
    }

    #[test]
    fn test_oversized_paragraph_sentence_overlap() {
        let text: String = (0..60)
            .map(|i| format!("Sentence number {i:02} is here."))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunk_text(&text, 200, 60).unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.length <= 200, "chunk too long: {}", chunk.length);
        }
        for pair in chunks.windows(2) {
            let last_sentence = split_sentences(&pair[0].text).pop().unwrap();
            assert!(
                pair[1].text.contains(&last_sentence),
                "next chunk should repeat the tail of the previous one"
            );
        }
    }

    #[test]
    fn test_termination_and_bounds_for_tiny_sizes() {
        let text = "abcdefghij klmnop. qrstu!\n\nvwxyz\n\n# H\n\n0123456789";
        for size in 1..=25 {
            for overlap in [0, 1, 5, 50] {
                let chunks = chunk_text(text, size, overlap).unwrap();
                assert!(!chunks.is_empty());
                for (i, chunk) in chunks.iter().enumerate() {
                    assert!(chunk.length <= size, "size {size}: {:?}", chunk.text);
                    assert!(!chunk.text.is_empty());
                    assert_eq!(chunk.sequence_index, i);
                }
            }
        }
    }

    #[test]
    fn test_every_paragraph_is_covered_in_order() {
        let paragraphs: Vec<String> = (0..30)
            .map(|i| format!("Paragraph {i} talks about topic {i}."))
            .collect();
        let text = paragraphs.join("\n\n");
        let chunks = chunk_text(&text, 120, 40).unwrap();

        let mut last_chunk = 0;
        for paragraph in &paragraphs {
            let found = chunks
                .iter()
                .enumerate()
                .skip(last_chunk)
                .find(|(_, c)| c.text.contains(paragraph.as_str()))
                .map(|(i, _)| i);
            let Some(index) = found else {
                panic!("paragraph dropped: {paragraph}");
            };
            last_chunk = index;
        }
    }

    #[test]
    fn test_chunker_assigns_pages_for_paginated_content() {
        let content = ExtractedContent {
            pages: vec!["a".repeat(60), "b".repeat(60)],
            metadata: ContentMetadataInfo {
                title: None,
                page_count: Some(2),
            },
        };
        let config = ChunkConfig {
            chunk_size: 100,
            overlap: 0,
        };
        let chunks = SemanticChunker::new().chunk(&content, &config).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].page, Some(1));
        assert_eq!(chunks[1].page, Some(2));
    }

    #[test]
    fn test_chunker_is_deterministic() {
        let content = ExtractedContent::from_text("One. Two. Three.\n\nFour five six.");
        let config = ChunkConfig {
            chunk_size: 10,
            overlap: 5,
        };
        let chunker = SemanticChunker::new();
        let a = chunker.chunk(&content, &config).unwrap();
        let b = chunker.chunk(&content, &config).unwrap();
        assert_eq!(a, b);
    }
}

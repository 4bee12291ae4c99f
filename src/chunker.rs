//! Splits parsed filings into bounded chunks for downstream consumers.
//!
//! Two modes:
//! - semantic: sections are rendered depth-first and packed into chunks, tables and lists can be
//!   emitted on their own;
//! - size: plain text is cut at paragraph, sentence or word boundaries with a fixed overlap.
//!
//! Chunk `start`/`end` are byte offsets into the chunked source text. In semantic mode that
//! source is the rendered blocks joined by the separator, so `reconstruct` with the same
//! separator and no overlap reproduces it exactly.

use serde::{Deserialize, Serialize};

use crate::core::{PipelineError, Result};
use crate::edgar::parsing::types::{flatten, ParsedFiling, Section, SectionKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkOptions {
    /// Characters per chunk before a new one is started.
    pub max_chunk_size: usize,
    /// A running chunk at or below this size is never closed early.
    pub min_chunk_size: usize,
    /// Characters repeated from the previous chunk in size-based splitting.
    pub chunk_overlap: usize,
    pub separate_tables: bool,
    pub separate_lists: bool,
    pub include_boilerplate: bool,
    pub separator: String,
    pub max_heading_depth: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            max_chunk_size: 4000,
            min_chunk_size: 500,
            chunk_overlap: 200,
            separate_tables: true,
            separate_lists: false,
            include_boilerplate: false,
            separator: "\n\n".to_string(),
            max_heading_depth: 6,
        }
    }
}

impl ChunkOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_size <= self.chunk_overlap {
            return Err(PipelineError::Config(format!(
                "max_chunk_size ({}) must be greater than chunk_overlap ({})",
                self.max_chunk_size, self.chunk_overlap
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub start: usize,
    pub end: usize,
    pub section_types: Vec<SectionKind>,
    pub section_titles: Vec<String>,
    pub is_table: bool,
    pub is_list: bool,
    pub char_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: usize,
    pub content: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChunkMode {
    Semantic,
    Size,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkResultMetadata {
    pub mode: ChunkMode,
    pub filing_type: Option<String>,
    pub company_name: Option<String>,
    pub max_chunk_size: usize,
    pub chunk_overlap: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkResult {
    pub chunks: Vec<Chunk>,
    pub total_chunks: usize,
    /// Characters in the chunked source text.
    pub original_length: usize,
    pub chunk_lengths: Vec<usize>,
    pub average_chunk_size: f64,
    pub metadata: ChunkResultMetadata,
}

impl ChunkResult {
    fn new(chunks: Vec<Chunk>, original_length: usize, metadata: ChunkResultMetadata) -> Self {
        let chunk_lengths: Vec<usize> = chunks.iter().map(|c| c.metadata.char_count).collect();
        let total_chunks = chunks.len();
        let average_chunk_size = if total_chunks == 0 {
            0.0
        } else {
            original_length as f64 / total_chunks as f64
        };
        Self {
            chunks,
            total_chunks,
            original_length,
            chunk_lengths,
            average_chunk_size,
            metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructOptions {
    pub separator: String,
    /// Drop the prefix each chunk shares with its predecessor.
    pub remove_overlap: bool,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            separator: "\n\n".to_string(),
            remove_overlap: true,
        }
    }
}

/// A contiguous slice of the source text, described in byte offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Span {
    start: usize,
    end: usize,
}

/// Byte offset of every character boundary, including the end of the text.
fn char_boundaries(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect()
}

fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Break position in `(lower, target]` (character indices): a paragraph break first, then a
/// sentence end, then any whitespace. Falls back to `target`.
fn find_break(chars: &[char], lower: usize, target: usize) -> usize {
    let window = (lower + 1..=target).rev();

    let paragraph = window
        .clone()
        .find(|&p| p >= 2 && chars[p - 1] == '\n' && chars[p - 2] == '\n');
    if let Some(p) = paragraph {
        return p;
    }

    let sentence = window
        .clone()
        .find(|&p| p >= 2 && (chars[p - 1] == ' ' || chars[p - 1] == '\n') && is_sentence_end(chars[p - 2]));
    if let Some(p) = sentence {
        return p;
    }

    window
        .clone()
        .find(|&p| chars[p - 1].is_whitespace())
        .unwrap_or(target)
}

/// Size-based split of `text` into overlapping spans. Breaks are searched no closer than
/// `overlap` characters to the span start, so every span ends past the previous one.
fn split_spans(text: &str, max: usize, overlap: usize) -> Vec<Span> {
    let chars: Vec<char> = text.chars().collect();
    let bounds = char_boundaries(text);
    let total = chars.len();
    let mut spans = Vec::new();
    let mut start = 0;

    while start < total {
        let target = start + max;
        let end = if target >= total {
            total
        } else {
            let lower = target.saturating_sub(max / 2).max(start + overlap);
            find_break(&chars, lower, target)
        };
        spans.push(Span {
            start: bounds[start],
            end: bounds[end],
        });
        if end >= total {
            break;
        }
        start = end - overlap;
    }
    spans
}

fn make_chunk(id: usize, content: String, span: Span, sections: &[&Section]) -> Chunk {
    let mut section_types = Vec::new();
    let mut section_titles = Vec::new();
    for section in sections {
        if !section_types.contains(&section.kind) {
            section_types.push(section.kind);
        }
        if let Some(title) = section.title.as_ref() {
            if !section_titles.contains(title) {
                section_titles.push(title.clone());
            }
        }
    }
    let all_of = |kind: SectionKind| !sections.is_empty() && sections.iter().all(|s| s.kind == kind);

    Chunk {
        id,
        metadata: ChunkMetadata {
            start: span.start,
            end: span.end,
            is_table: all_of(SectionKind::Table),
            is_list: all_of(SectionKind::List),
            section_types,
            section_titles,
            char_count: content.chars().count(),
        },
        content,
    }
}

pub fn chunk_text(text: &str, options: &ChunkOptions) -> Result<ChunkResult> {
    options.validate()?;
    let chunks: Vec<Chunk> = split_spans(text, options.max_chunk_size, options.chunk_overlap)
        .into_iter()
        .enumerate()
        .map(|(id, span)| make_chunk(id, text[span.start..span.end].to_string(), span, &[]))
        .collect();
    log::debug!("Split {} bytes of text into {} chunks", text.len(), chunks.len());

    Ok(ChunkResult::new(
        chunks,
        text.chars().count(),
        ChunkResultMetadata {
            mode: ChunkMode::Size,
            filing_type: None,
            company_name: None,
            max_chunk_size: options.max_chunk_size,
            chunk_overlap: options.chunk_overlap,
        },
    ))
}

/// Renders one section as a chunk block. Titles get a `#` marker sized by heading depth.
fn render_block(section: &Section, max_heading_depth: usize) -> String {
    if section.kind == SectionKind::Title {
        return format!("# {}", section.content.trim());
    }
    let content = section.content.trim();
    match section.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(title) => {
            let depth = section.level.clamp(1, max_heading_depth.max(1));
            let heading = format!("{} {}", "#".repeat(depth), title);
            if content.is_empty() {
                heading
            } else {
                format!("{}\n{}", heading, content)
            }
        }
        None => content.to_string(),
    }
}

/// Packs rendered section blocks into chunks. Offsets refer to the blocks joined by the
/// separator.
struct SemanticPacker<'a> {
    options: &'a ChunkOptions,
    source: String,
    chunks: Vec<Chunk>,
    pending: Vec<&'a Section>,
    pending_start: usize,
}

impl<'a> SemanticPacker<'a> {
    fn new(options: &'a ChunkOptions) -> Self {
        Self {
            options,
            source: String::new(),
            chunks: Vec::new(),
            pending: Vec::new(),
            pending_start: 0,
        }
    }

    fn pending_chars(&self) -> usize {
        self.source[self.pending_start..].chars().count()
    }

    fn append_block(&mut self, block: &str) -> usize {
        if !self.source.is_empty() {
            self.source.push_str(&self.options.separator);
        }
        let start = self.source.len();
        self.source.push_str(block);
        start
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let span = Span {
            start: self.pending_start,
            end: self.source.len(),
        };
        let content = self.source[span.start..span.end].to_string();
        let sections = std::mem::take(&mut self.pending);
        self.chunks.push(make_chunk(self.chunks.len(), content, span, &sections));
    }

    /// Emits a block as its own chunk or chunks, splitting it when oversized.
    fn emit_standalone(&mut self, section: &'a Section, block: &str) {
        self.flush();
        let start = self.append_block(block);
        for span in split_spans(block, self.options.max_chunk_size, self.options.chunk_overlap) {
            let span = Span {
                start: start + span.start,
                end: start + span.end,
            };
            let content = self.source[span.start..span.end].to_string();
            self.chunks.push(make_chunk(self.chunks.len(), content, span, &[section]));
        }
    }

    fn add(&mut self, section: &'a Section) {
        let block = render_block(section, self.options.max_heading_depth);
        if block.is_empty() {
            return;
        }
        let block_chars = block.chars().count();
        let standalone = (section.kind == SectionKind::Table && self.options.separate_tables)
            || (section.kind == SectionKind::List && self.options.separate_lists);
        if standalone || block_chars > self.options.max_chunk_size {
            self.emit_standalone(section, &block);
            return;
        }

        if !self.pending.is_empty() {
            let current = self.pending_chars();
            let combined = current + self.options.separator.chars().count() + block_chars;
            if combined > self.options.max_chunk_size && current > self.options.min_chunk_size {
                self.flush();
            }
        }

        let start = self.append_block(&block);
        if self.pending.is_empty() {
            self.pending_start = start;
        }
        self.pending.push(section);
    }

    fn finish(mut self) -> (String, Vec<Chunk>) {
        self.flush();
        (self.source, self.chunks)
    }
}

/// Semantic chunking over `filing.sections`; falls back to size-based chunking of the full text
/// when the filing has no sections.
pub fn chunk(filing: &ParsedFiling, options: &ChunkOptions) -> Result<ChunkResult> {
    options.validate()?;

    if filing.sections.is_empty() {
        let mut result = chunk_text(filing.full_text.as_deref().unwrap_or(""), options)?;
        result.metadata.filing_type = Some(filing.filing_type.clone());
        result.metadata.company_name = filing.company_name.clone();
        return Ok(result);
    }

    let mut packer = SemanticPacker::new(options);
    for section in flatten(&filing.sections) {
        if section.is_boilerplate && !options.include_boilerplate {
            continue;
        }
        packer.add(section);
    }
    let (source, chunks) = packer.finish();
    log::debug!(
        "Chunked {} filing into {} chunks ({} bytes rendered)",
        filing.filing_type,
        chunks.len(),
        source.len()
    );

    Ok(ChunkResult::new(
        chunks,
        source.chars().count(),
        ChunkResultMetadata {
            mode: ChunkMode::Semantic,
            filing_type: Some(filing.filing_type.clone()),
            company_name: filing.company_name.clone(),
            max_chunk_size: options.max_chunk_size,
            chunk_overlap: options.chunk_overlap,
        },
    ))
}

/// Joins chunks in id order.
pub fn reconstruct(chunks: &[Chunk], options: &ReconstructOptions) -> String {
    let mut ordered: Vec<&Chunk> = chunks.iter().collect();
    ordered.sort_by_key(|c| c.id);

    let mut parts: Vec<&str> = Vec::with_capacity(ordered.len());
    let mut covered: Option<usize> = None;
    for chunk in ordered {
        let mut content = chunk.content.as_str();
        if options.remove_overlap {
            if let Some(end) = covered {
                let shared = end.saturating_sub(chunk.metadata.start);
                content = content.get(shared.min(content.len())..).unwrap_or("");
            }
        }
        covered = Some(covered.map_or(chunk.metadata.end, |end| end.max(chunk.metadata.end)));
        if !content.is_empty() {
            parts.push(content);
        }
    }
    parts.join(&options.separator)
}

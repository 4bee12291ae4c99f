//! PDF parsing in two passes over the same bytes.
//!
//! The first pass reads the page text stream and segments it with the line heading heuristic.
//! The second walks each page's content stream to recover positioned text elements, which feed
//! the geometric table reconstruction in [`super::layout`]. Tables are appended after the text
//! sections.

use lopdf::content::Content;
use lopdf::{Document, Object};

use super::layout::{self, TextElement};
use super::text::segment_lines;
use super::types::{ParserOptions, Section, StructuredDocument};
use crate::core::{PipelineError, Result};

/// Width of a glyph as a share of the font size, used to advance x between show operators.
const GLYPH_WIDTH_RATIO: f32 = 0.5;
/// `TJ` adjustments (thousandths of an em) more negative than this are read as word gaps.
const TJ_SPACE_THRESHOLD: f32 = -200.0;

pub fn parse(bytes: &[u8], options: &ParserOptions) -> Result<StructuredDocument> {
    let document = Document::load_mem(bytes)
        .map_err(|e| PipelineError::parse("pdf", bytes.len(), format!("failed to load document: {}", e)))?;

    let pages = document.get_pages();
    if pages.is_empty() {
        return Err(PipelineError::parse("pdf", bytes.len(), "document has no pages"));
    }

    let mut elements = Vec::new();
    for (page_number, page_id) in &pages {
        match document
            .get_page_content(*page_id)
            .and_then(|content| Content::decode(&content))
        {
            Ok(content) => elements.extend(positioned_text(*page_number, &content)),
            Err(e) => log::warn!("Skipping content stream of page {}: {}", page_number, e),
        }
    }

    let page_numbers: Vec<u32> = pages.keys().copied().collect();
    let text = match document.extract_text(&page_numbers) {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) | Err(_) => {
            log::debug!("Falling back to positioned elements for PDF text");
            layout::rows_to_lines(&layout::group_rows(&elements))
        }
    };

    let mut sections = segment_lines(&text, options);
    if options.extract_tables {
        for (index, rows) in layout::reconstruct_tables(&elements).into_iter().enumerate() {
            let mut table = Section::table(Some(format!("Table {}", index + 1)), rows);
            table.truncate_content(options.max_section_length);
            sections.push(table);
        }
    }

    if sections.is_empty() {
        return Err(PipelineError::parse("pdf", bytes.len(), "no extractable text"));
    }
    log::debug!(
        "PDF parser produced {} sections from {} pages",
        sections.len(),
        pages.len()
    );
    Ok(StructuredDocument::from_sections(sections))
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// PDF text strings: UTF-16BE when they carry a byte order mark, Latin-1 otherwise.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|b| *b as char).collect()
    }
}

fn shown_text(operand: &Object) -> String {
    match operand {
        Object::String(bytes, _) => decode_pdf_string(bytes),
        Object::Array(items) => {
            let mut text = String::new();
            for item in items {
                match item {
                    Object::String(bytes, _) => text.push_str(&decode_pdf_string(bytes)),
                    other => {
                        if number(other).is_some_and(|n| n < TJ_SPACE_THRESHOLD) {
                            text.push(' ');
                        }
                    }
                }
            }
            text
        }
        _ => String::new(),
    }
}

#[derive(Debug, Default)]
struct TextState {
    line_x: f32,
    line_y: f32,
    x: f32,
    leading: f32,
    font_size: f32,
}

impl TextState {
    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_x += tx;
        self.line_y += ty;
        self.x = self.line_x;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }
}

/// Walks text operators and records where each string is drawn. Only translation is tracked.
fn positioned_text(page: u32, content: &Content) -> Vec<TextElement> {
    let mut elements = Vec::new();
    let mut state = TextState {
        font_size: 12.0,
        ..TextState::default()
    };

    for operation in &content.operations {
        let operands = &operation.operands;
        let arg = |i: usize| operands.get(i).and_then(number);

        match operation.operator.as_str() {
            "BT" => {
                state.line_x = 0.0;
                state.line_y = 0.0;
                state.x = 0.0;
            }
            "Tf" => {
                if let Some(size) = arg(1) {
                    state.font_size = size.abs().max(1.0);
                }
            }
            "TL" => state.leading = arg(0).unwrap_or(state.leading),
            "Tm" => {
                if let (Some(e), Some(f)) = (arg(4), arg(5)) {
                    state.line_x = e;
                    state.line_y = f;
                    state.x = e;
                }
            }
            "Td" => state.move_line(arg(0).unwrap_or(0.0), arg(1).unwrap_or(0.0)),
            "TD" => {
                let ty = arg(1).unwrap_or(0.0);
                state.leading = -ty;
                state.move_line(arg(0).unwrap_or(0.0), ty);
            }
            "T*" => state.next_line(),
            "Tj" | "TJ" | "'" | "\"" => {
                if matches!(operation.operator.as_str(), "'" | "\"") {
                    state.next_line();
                }
                let Some(text) = operands.last().map(shown_text) else {
                    continue;
                };
                if text.trim().is_empty() {
                    continue;
                }
                let advance = text.chars().count() as f32 * state.font_size * GLYPH_WIDTH_RATIO;
                elements.push(TextElement {
                    page,
                    x: state.x,
                    y: state.line_y,
                    text,
                });
                state.x += advance;
            }
            _ => {}
        }
    }
    elements
}

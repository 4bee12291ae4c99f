use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::types::{ParserOptions, Section};

pub const MIN_HEADING_CHARS: usize = 3;
pub const MAX_HEADING_CHARS: usize = 100;
/// Share of alphabetic characters that must be upper-case for an all-caps heading.
pub const HEADING_UPPERCASE_RATIO: f64 = 0.7;
const MAX_TITLE_CASE_WORDS: usize = 8;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static pattern"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("static pattern"));
static SCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script.*?</script>").expect("static pattern"));
static STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style.*?</style>").expect("static pattern"));
static BLOCK_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</p>|</div>|</tr>|</h[1-6]>|</li>|</title>").expect("static pattern")
});
static CELL_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</t[dh]>").expect("static pattern"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("static pattern"));
static PART_OR_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(part\s+[ivx]+\b|item\s+\d{1,2}[a-c]?(\.\d{1,2})?\b)").expect("static pattern")
});
static PART_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^part\s+[ivx]+\b").expect("static pattern"));

const MINOR_WORDS: &[&str] = &["a", "an", "and", "as", "at", "by", "for", "in", "of", "on", "or", "the", "to"];

/// Entity decoding, NFKC normalization and whitespace handling for extracted text.
pub fn normalize_text(text: &str, preserve_whitespace: bool) -> String {
    let decoded = decode_html_entities(text);
    let normalized: String = decoded
        .nfkc()
        .map(|c| match c {
            '\u{a0}' | '\u{2007}' | '\u{202f}' => ' ',
            '\u{2019}' => '\'',
            _ => c,
        })
        .filter(|c| *c != '\u{feff}' && *c != '\u{200b}')
        .collect();

    if preserve_whitespace {
        let trimmed_lines = normalized
            .lines()
            .map(|line| line.trim_end())
            .collect::<Vec<_>>()
            .join("\n");
        BLANK_LINES
            .replace_all(trimmed_lines.trim(), "\n\n")
            .to_string()
    } else {
        WHITESPACE.replace_all(&normalized, " ").trim().to_string()
    }
}

/// Regex-level markup stripping for samples that are not worth a DOM parse.
pub fn strip_markup(html: &str) -> String {
    let text = SCRIPT.replace_all(html, "");
    let text = STYLE.replace_all(&text, "");
    let text = CELL_BREAK.replace_all(&text, " ");
    let text = BLOCK_BREAK.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, " ");
    let text = decode_html_entities(&text);

    text.lines()
        .map(|line| WHITESPACE.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn looks_like_markup(sample: &str) -> bool {
    let head: String = sample.chars().take(4096).collect::<String>().to_lowercase();
    ["<html", "<body", "<div", "<p>", "<p ", "<table", "<title", "<font", "<document>"]
        .iter()
        .any(|tag| head.contains(tag))
}

fn within_heading_length(line: &str) -> bool {
    (MIN_HEADING_CHARS..=MAX_HEADING_CHARS).contains(&line.chars().count())
}

/// `Item`/`Part` marker or a short, mostly upper-case line.
pub fn is_structural_heading(line: &str) -> bool {
    let line = line.trim();
    if !within_heading_length(line) {
        return false;
    }
    if PART_OR_ITEM.is_match(line) {
        return true;
    }
    if line.ends_with(['.', ',', ';']) {
        return false;
    }

    let letters = line.chars().filter(|c| c.is_alphabetic()).count();
    if letters < MIN_HEADING_CHARS {
        return false;
    }
    let upper = line.chars().filter(|c| c.is_uppercase()).count();
    upper as f64 / letters as f64 >= HEADING_UPPERCASE_RATIO
}

/// Short line that is mostly upper-case, an `Item`/`Part` marker, or a short title-cased phrase.
pub fn is_heading_line(line: &str) -> bool {
    let line = line.trim();
    if is_structural_heading(line) {
        return true;
    }
    if !within_heading_length(line) || line.ends_with(['.', ',', ';']) {
        return false;
    }

    let restricted = line
        .chars()
        .all(|c| c.is_alphanumeric() || " &'-,:()/".contains(c));
    let words: Vec<&str> = line.split_whitespace().collect();
    restricted
        && words.len() <= MAX_TITLE_CASE_WORDS
        && words.iter().enumerate().all(|(i, word)| {
            let starts_upper = word.chars().next().is_some_and(|c| c.is_uppercase() || c.is_numeric());
            starts_upper || (i > 0 && MINOR_WORDS.contains(&word.to_lowercase().as_str()))
        })
}

pub fn heading_level(line: &str) -> usize {
    let line = line.trim();
    if PART_PREFIX.is_match(line) {
        1
    } else if PART_OR_ITEM.is_match(line) {
        2
    } else {
        3
    }
}

struct OpenSection {
    title: String,
    level: usize,
    paragraphs: Vec<String>,
    children: Vec<Section>,
}

/// Accumulates a flat section sequence: a heading opens a section that collects the following
/// paragraphs, with tables and lists nested as its children.
pub struct SectionBuilder<'a> {
    options: &'a ParserOptions,
    sections: Vec<Section>,
    open: Option<OpenSection>,
}

impl<'a> SectionBuilder<'a> {
    pub fn new(options: &'a ParserOptions) -> Self {
        Self {
            options,
            sections: Vec::new(),
            open: None,
        }
    }

    pub fn options(&self) -> &ParserOptions {
        self.options
    }

    pub fn current_title(&self) -> Option<&str> {
        self.open.as_ref().map(|o| o.title.as_str())
    }

    pub fn heading(&mut self, title: &str, level: usize) {
        let title = normalize_text(title, false);
        if title.is_empty() {
            return;
        }
        self.close();
        self.open = Some(OpenSection {
            title,
            level,
            paragraphs: Vec::new(),
            children: Vec::new(),
        });
    }

    pub fn paragraph(&mut self, text: &str) {
        let text = normalize_text(text, self.options.preserve_whitespace);
        if text.is_empty() {
            return;
        }
        match self.open.as_mut() {
            Some(open) => open.paragraphs.push(text),
            None => self.sections.push(Section::paragraph(text)),
        }
    }

    /// Tables and lists nest under the open heading, if any.
    pub fn block(&mut self, section: Section) {
        match self.open.as_mut() {
            Some(open) => open.children.push(section),
            None => self.sections.push(section),
        }
    }

    /// Adds a section at the top level, closing any open heading first.
    pub fn push(&mut self, section: Section) {
        self.close();
        self.sections.push(section);
    }

    fn close(&mut self) {
        if let Some(open) = self.open.take() {
            let section = if open.paragraphs.is_empty() && open.children.is_empty() {
                Section::header(open.title, open.level)
            } else {
                Section::generic(Some(open.title), open.paragraphs.join("\n\n"), open.level)
                    .with_children(open.children)
            };
            self.sections.push(section);
        }
    }

    pub fn finish(mut self) -> Vec<Section> {
        self.close();
        let max = self.options.max_section_length;
        let mut sections = self.sections;
        for section in &mut sections {
            section.truncate_content(max);
        }
        sections
    }
}

/// Line-oriented segmentation for text without markup: heading lines start sections, blank
/// lines end paragraphs.
pub fn segment_lines(text: &str, options: &ParserOptions) -> Vec<Section> {
    let mut builder = SectionBuilder::new(options);
    let mut paragraph: Vec<&str> = Vec::new();
    let joiner = if options.preserve_whitespace { "\n" } else { " " };

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !paragraph.is_empty() {
                builder.paragraph(&paragraph.join(joiner));
                paragraph.clear();
            }
            continue;
        }
        if is_heading_line(trimmed) {
            if !paragraph.is_empty() {
                builder.paragraph(&paragraph.join(joiner));
                paragraph.clear();
            }
            builder.heading(trimmed, heading_level(trimmed));
            continue;
        }
        paragraph.push(trimmed);
    }
    if !paragraph.is_empty() {
        builder.paragraph(&paragraph.join(joiner));
    }

    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::parsing::types::SectionKind;

    #[test]
    fn test_normalize_text_collapses_whitespace() {
        assert_eq!(
            normalize_text("  Net&nbsp;sales\n\n  grew   10% ", false),
            "Net sales grew 10%"
        );
        assert_eq!(normalize_text("a  \n\n\n\nb", true), "a\n\nb");
    }

    #[test]
    fn test_strip_markup() {
        let html = "<html><head><style>p{}</style><title>FORM 10-K</title></head>\
                    <body><p>Annual <b>report</b></p><table><tr><td>a</td><td>b</td></tr></table></body></html>";
        assert_eq!(strip_markup(html), "FORM 10-K\nAnnual report\na b");
    }

    #[test]
    fn test_heading_heuristic() {
        assert!(is_heading_line("RISK FACTORS"));
        assert!(is_heading_line("Item 1A. Risk Factors"));
        assert!(is_heading_line("PART II"));
        assert!(is_heading_line("Results of Operations"));
        assert!(!is_heading_line("Revenue increased 12% compared to the prior year."));
        assert!(!is_heading_line("42"));
        assert!(!is_heading_line(&"A".repeat(150)));
    }

    #[test]
    fn test_heading_levels() {
        assert_eq!(heading_level("PART I"), 1);
        assert_eq!(heading_level("Item 7. Management's Discussion"), 2);
        assert_eq!(heading_level("OVERVIEW"), 3);
    }

    #[test]
    fn test_segment_lines() {
        let text = "ACME CORP ANNUAL REPORT\n\nIntro line one\nintro line two.\n\nRISK FACTORS\nWe face risks.\n\nMore risks here.\n";
        let sections = segment_lines(text, &ParserOptions::default());

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].kind, SectionKind::GenericSection);
        assert_eq!(sections[0].title.as_deref(), Some("ACME CORP ANNUAL REPORT"));
        assert_eq!(sections[0].content, "Intro line one intro line two.");
        assert_eq!(sections[1].title.as_deref(), Some("RISK FACTORS"));
        assert_eq!(sections[1].content, "We face risks.\n\nMore risks here.");
    }

    #[test]
    fn test_builder_heading_without_body_is_header() {
        let options = ParserOptions::default();
        let mut builder = SectionBuilder::new(&options);
        builder.heading("PART I", 1);
        builder.heading("Item 1. Business", 2);
        builder.paragraph("We make widgets.");
        let sections = builder.finish();

        assert_eq!(sections[0].kind, SectionKind::Header);
        assert_eq!(sections[0].level, 1);
        assert_eq!(sections[1].kind, SectionKind::GenericSection);
        assert_eq!(sections[1].content, "We make widgets.");
    }

    #[test]
    fn test_builder_truncates_to_max_section_length() {
        let options = ParserOptions {
            max_section_length: 5,
            ..ParserOptions::default()
        };
        let mut builder = SectionBuilder::new(&options);
        builder.paragraph("abcdefghij");
        assert_eq!(builder.finish()[0].content, "abcde");
    }
}

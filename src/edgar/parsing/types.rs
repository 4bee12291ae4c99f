use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionKind {
    Title,
    Header,
    Paragraph,
    List,
    Table,
    GenericSection,
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionKind::Title => write!(f, "title"),
            SectionKind::Header => write!(f, "header"),
            SectionKind::Paragraph => write!(f, "paragraph"),
            SectionKind::List => write!(f, "list"),
            SectionKind::Table => write!(f, "table"),
            SectionKind::GenericSection => write!(f, "section"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    pub title: Option<String>,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_data: Option<Vec<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Section>,
    /// Heading depth, 0 when the parser had no level information.
    #[serde(default)]
    pub level: usize,
    #[serde(default)]
    pub is_boilerplate: bool,
}

impl Section {
    fn new(kind: SectionKind, title: Option<String>, content: String) -> Self {
        Self {
            kind,
            title,
            content,
            table_data: None,
            children: Vec::new(),
            level: 0,
            is_boilerplate: false,
        }
    }

    pub fn title(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(SectionKind::Title, Some(text.clone()), text)
    }

    pub fn header(title: impl Into<String>, level: usize) -> Self {
        let mut section = Self::new(SectionKind::Header, Some(title.into()), String::new());
        section.level = level;
        section
    }

    pub fn paragraph(content: impl Into<String>) -> Self {
        Self::new(SectionKind::Paragraph, None, content.into())
    }

    pub fn generic(title: Option<String>, content: impl Into<String>, level: usize) -> Self {
        let mut section = Self::new(SectionKind::GenericSection, title, content.into());
        section.level = level;
        section
    }

    pub fn list(title: Option<String>, items: Vec<String>) -> Self {
        let content = items
            .iter()
            .map(|item| format!("- {}", item))
            .collect::<Vec<_>>()
            .join("\n");
        Self::new(SectionKind::List, title, content)
    }

    /// Rows are stored as-is; `content` is the pipe-delimited rendering used for search and chunks.
    pub fn table(title: Option<String>, rows: Vec<Vec<String>>) -> Self {
        let content = rows
            .iter()
            .map(|row| format!("| {} |", row.join(" | ")))
            .collect::<Vec<_>>()
            .join("\n");
        let mut section = Self::new(SectionKind::Table, title, content);
        section.table_data = Some(rows);
        section
    }

    pub fn with_children(mut self, children: Vec<Section>) -> Self {
        self.children = children;
        self
    }

    /// Depth-first iterator over this section and all of its descendants.
    pub fn walk(&self) -> SectionWalk<'_> {
        SectionWalk { stack: vec![self] }
    }

    /// Limits `content` to `max_chars` characters.
    pub fn truncate_content(&mut self, max_chars: usize) {
        if let Some((idx, _)) = self.content.char_indices().nth(max_chars) {
            self.content.truncate(idx);
        }
        for child in &mut self.children {
            child.truncate_content(max_chars);
        }
    }
}

pub struct SectionWalk<'a> {
    stack: Vec<&'a Section>,
}

impl<'a> Iterator for SectionWalk<'a> {
    type Item = &'a Section;

    fn next(&mut self) -> Option<Self::Item> {
        let section = self.stack.pop()?;
        self.stack.extend(section.children.iter().rev());
        Some(section)
    }
}

/// Flattens a section forest in document order.
pub fn flatten(sections: &[Section]) -> impl Iterator<Item = &Section> {
    sections.iter().flat_map(|s| s.walk())
}

/// Renders sections as plain text: titles on their own line, blocks separated by blank lines.
pub fn render_text(sections: &[Section]) -> String {
    let mut blocks: Vec<&str> = Vec::new();
    for section in flatten(sections) {
        match section.kind {
            SectionKind::Title => blocks.push(section.content.as_str()),
            _ => {
                if let Some(title) = section.title.as_deref() {
                    if section.kind != SectionKind::Table && section.kind != SectionKind::List {
                        blocks.push(title);
                    }
                }
                if !section.content.is_empty() {
                    blocks.push(section.content.as_str());
                }
            }
        }
    }
    blocks
        .into_iter()
        .filter(|b| !b.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserOptions {
    pub extract_tables: bool,
    pub extract_lists: bool,
    pub max_section_length: usize,
    pub preserve_whitespace: bool,
    pub remove_boilerplate: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            extract_tables: true,
            extract_lists: true,
            max_section_length: 100_000,
            preserve_whitespace: false,
            remove_boilerplate: true,
        }
    }
}

/// Per-filing-type option overrides; `None` keeps the caller's value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParserOptionOverrides {
    pub extract_tables: Option<bool>,
    pub extract_lists: Option<bool>,
    pub max_section_length: Option<usize>,
    pub preserve_whitespace: Option<bool>,
    pub remove_boilerplate: Option<bool>,
}

impl ParserOptionOverrides {
    pub fn apply(&self, base: &ParserOptions) -> ParserOptions {
        ParserOptions {
            extract_tables: self.extract_tables.unwrap_or(base.extract_tables),
            extract_lists: self.extract_lists.unwrap_or(base.extract_lists),
            max_section_length: self.max_section_length.unwrap_or(base.max_section_length),
            preserve_whitespace: self.preserve_whitespace.unwrap_or(base.preserve_whitespace),
            remove_boilerplate: self.remove_boilerplate.unwrap_or(base.remove_boilerplate),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub value: String,
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilingMetadata {
    pub filing_type: String,
    pub company_name: Option<String>,
    pub filing_date: Option<NaiveDate>,
    pub cik: Option<String>,
    pub fiscal_year: Option<String>,
    pub fiscal_period: Option<String>,
    pub period_of_report: Option<NaiveDate>,
    pub financial_metrics: BTreeMap<String, MetricValue>,
}

impl FilingMetadata {
    pub fn new(filing_type: impl Into<String>) -> Self {
        Self {
            filing_type: filing_type.into(),
            ..Self::default()
        }
    }

    /// Fills fields that are still unset from `other`; set fields and known metrics are kept.
    pub fn fill_missing(&mut self, other: FilingMetadata) {
        if self.filing_type.is_empty() {
            self.filing_type = other.filing_type;
        }
        self.company_name = self.company_name.take().or(other.company_name);
        self.filing_date = self.filing_date.or(other.filing_date);
        self.cik = self.cik.take().or(other.cik);
        self.fiscal_year = self.fiscal_year.take().or(other.fiscal_year);
        self.fiscal_period = self.fiscal_period.take().or(other.fiscal_period);
        self.period_of_report = self.period_of_report.or(other.period_of_report);
        for (name, metric) in other.financial_metrics {
            self.financial_metrics.entry(name).or_insert(metric);
        }
    }
}

/// Output of a structural parser, before content extraction.
#[derive(Debug, Clone, Default)]
pub struct StructuredDocument {
    pub sections: Vec<Section>,
    pub title: Option<String>,
    pub text: String,
    /// Metadata read directly from tagged sources (SGML header, XBRL `dei:` facts, ownership XML).
    pub tagged: FilingMetadata,
}

impl StructuredDocument {
    pub fn from_sections(sections: Vec<Section>) -> Self {
        let title = sections
            .iter()
            .find(|s| s.kind == SectionKind::Title)
            .map(|s| s.content.clone());
        let text = render_text(&sections);
        Self {
            sections,
            title,
            text,
            tagged: FilingMetadata::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFiling {
    pub filing_type: String,
    pub company_name: Option<String>,
    pub cik: Option<String>,
    pub filing_date: Option<NaiveDate>,
    pub important_sections: BTreeMap<String, String>,
    pub sections: Vec<Section>,
    pub full_text: Option<String>,
    pub metadata: FilingMetadata,
}

impl ParsedFiling {
    pub fn tables(&self) -> Vec<&Section> {
        flatten(&self.sections)
            .filter(|s| s.kind == SectionKind::Table)
            .collect()
    }

    pub fn lists(&self) -> Vec<&Section> {
        flatten(&self.sections)
            .filter(|s| s.kind == SectionKind::List)
            .collect()
    }
}

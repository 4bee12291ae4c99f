//! Parser factory: filing type → effective options → structural parse → extraction.

use std::sync::Arc;

use super::extract::{
    extract_financial_metrics, extract_important_sections, extract_metadata, remove_boilerplate,
};
use super::parsing::{
    self, decode_bytes, detect, submission, DocumentFormat, ParsedFiling, ParserOptions,
    StructuredDocument,
};
use super::registry::{self, FilingTypeConfig, ParserStrategy};
use super::report::FilingCategory;
use crate::core::config::DEFAULT_DETECTION_SAMPLE_BYTES;
use crate::core::{PipelineError, Result};

/// A parser bound to one registered filing type, with the type's option overrides applied.
#[derive(Debug, Clone)]
pub struct FilingParser {
    filing_type: String,
    config: Arc<FilingTypeConfig>,
    options: ParserOptions,
}

impl FilingParser {
    pub fn filing_type(&self) -> &str {
        &self.filing_type
    }

    pub fn config(&self) -> &FilingTypeConfig {
        &self.config
    }

    /// Options after the registry overrides were applied.
    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn parse(&self, bytes: &[u8]) -> Result<ParsedFiling> {
        log::info!("Parsing {} bytes as filing type {}", bytes.len(), self.filing_type);
        match self.config.parser {
            ParserStrategy::Custom(parse) => parse(bytes, &self.options),
            ParserStrategy::Generic => parse_generic(bytes, &self.filing_type, &self.options),
        }
    }

    /// Whether a document already parsed with `options` can be reused as-is.
    fn accepts_document_parsed_with(&self, options: &ParserOptions) -> bool {
        matches!(self.config.parser, ParserStrategy::Generic) && self.options == *options
    }
}

/// Fails with `UnsupportedFilingType` for identifiers the registry does not know.
pub fn create_parser(filing_type: &str, options: &ParserOptions) -> Result<FilingParser> {
    let config = registry::get_section_config(filing_type).ok_or_else(|| {
        PipelineError::UnsupportedFilingType {
            id: filing_type.to_string(),
        }
    })?;
    let options = config.parser_option_overrides.apply(options);
    Ok(FilingParser {
        filing_type: filing_type.to_string(),
        config,
        options,
    })
}

pub fn parse_generic(bytes: &[u8], filing_type: &str, options: &ParserOptions) -> Result<ParsedFiling> {
    let (format, document) = parsing::parse_structure(bytes, options)?;
    log::debug!(
        "{} document produced {} top-level sections",
        format,
        document.sections.len()
    );
    Ok(build_filing(filing_type, document, options))
}

/// Runs content extraction over a structured document. Tag-derived metadata and metrics take
/// precedence over values found by text patterns.
pub fn build_filing(filing_type: &str, document: StructuredDocument, options: &ParserOptions) -> ParsedFiling {
    let StructuredDocument {
        sections,
        text,
        tagged,
        ..
    } = document;

    let sections = if options.remove_boilerplate {
        remove_boilerplate(&sections)
    } else {
        sections
    };

    let mut metadata = tagged;
    metadata.fill_missing(extract_metadata(&text, filing_type));
    metadata.filing_type = filing_type.to_string();
    for (name, metric) in extract_financial_metrics(&sections) {
        metadata.financial_metrics.entry(name).or_insert(metric);
    }

    let important_sections = extract_important_sections(&sections, filing_type);
    log::info!(
        "Parsed {} filing: {} sections, {} important, {} metrics",
        filing_type,
        sections.len(),
        important_sections.len(),
        metadata.financial_metrics.len()
    );

    ParsedFiling {
        filing_type: filing_type.to_string(),
        company_name: metadata.company_name.clone(),
        cik: metadata.cik.clone(),
        filing_date: metadata.filing_date,
        important_sections,
        sections,
        full_text: (!text.trim().is_empty()).then_some(text),
        metadata,
    }
}

/// Maps a tagged form name (`10-K`, `10-K/A`, `4`) to a registered identifier.
fn resolve_type_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if registry::is_supported(raw) {
        return Some(raw.to_string());
    }
    raw.parse::<FilingCategory>()
        .ok()
        .and_then(|category| category.canonical_id())
        .filter(|id| registry::is_supported(id))
        .map(str::to_string)
}

/// At most `max_bytes` of `text`, cut on a character boundary.
fn sample_of(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

pub fn parse_auto(bytes: &[u8], options: &ParserOptions) -> Result<ParsedFiling> {
    parse_auto_with_sample(bytes, options, DEFAULT_DETECTION_SAMPLE_BYTES)
}

/// Detects the filing type and parses with that type's parser.
///
/// Tag-structured inputs (XBRL, ownership XML, submission headers) name their own form type;
/// everything else goes through the pattern detector over the first `sample_bytes` of text.
pub fn parse_auto_with_sample(
    bytes: &[u8],
    options: &ParserOptions,
    sample_bytes: usize,
) -> Result<ParsedFiling> {
    let format = detect::detect_format(bytes);

    let (filing_type, parsed) = match format {
        DocumentFormat::Html | DocumentFormat::PlainText => {
            let text = decode_bytes(bytes);
            (detect::detect_filing_type(sample_of(&text, sample_bytes)), None)
        }
        DocumentFormat::Submission => {
            let text = decode_bytes(bytes);
            let header = submission::parse_header(&text);
            let detected = header
                .submission_type
                .as_deref()
                .and_then(resolve_type_id)
                .or_else(|| detect::detect_filing_type(sample_of(&text, sample_bytes)));
            (detected, None)
        }
        DocumentFormat::Pdf | DocumentFormat::Xbrl | DocumentFormat::OwnershipXml => {
            let document = parsing::parse_as(format, bytes, options)?;
            let detected = resolve_type_id(&document.tagged.filing_type)
                .or_else(|| detect::detect_filing_type(sample_of(&document.text, sample_bytes)))
                .or_else(|| document.title.as_deref().and_then(detect::detect_filing_type));
            (detected, Some(document))
        }
    };

    let filing_type = filing_type.ok_or_else(|| PipelineError::DetectionFailed {
        reason: format!(
            "no filing type pattern matched the {} document ({} bytes)",
            format,
            bytes.len()
        ),
    })?;
    log::info!("Detected {} document as filing type {}", format, filing_type);

    let parser = create_parser(&filing_type, options)?;
    match parsed {
        Some(document) if parser.accepts_document_parsed_with(options) => {
            Ok(build_filing(&filing_type, document, parser.options()))
        }
        _ => parser.parse(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::parsing::tests::read_test_bytes;

    const CURRENT_REPORT: &str = "<html><head><title>Acme Industries Inc. Form 8-K</title></head><body>\
        <p>CURRENT REPORT</p>\
        <p>Date of Report (Date of earliest event reported): November 15, 2023</p>\
        <p><b>Item 8.01 Other Events</b></p>\
        <p>The board declared a quarterly dividend of $0.25 per share.</p>\
        </body></html>";

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = create_parser("S-1", &ParserOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFilingType { ref id } if id == "S-1"));
    }

    #[test]
    fn test_overrides_are_applied() {
        let parser = create_parser("4", &ParserOptions::default()).unwrap();
        assert!(!parser.options().remove_boilerplate);
        assert_eq!(parser.filing_type(), "4");

        let parser = create_parser("10-K", &ParserOptions::default()).unwrap();
        assert_eq!(parser.options(), &ParserOptions::default());
    }

    #[test]
    fn test_generic_parse_of_current_report() {
        let filing = create_parser("8-K", &ParserOptions::default())
            .unwrap()
            .parse(CURRENT_REPORT.as_bytes())
            .unwrap();
        assert_eq!(filing.filing_type, "8-K");
        assert_eq!(
            filing.important_sections["Item 8.01"],
            "The board declared a quarterly dividend of $0.25 per share."
        );
        assert_eq!(
            filing.metadata.period_of_report,
            chrono::NaiveDate::from_ymd_opt(2023, 11, 15)
        );
        assert!(filing.full_text.is_some());
    }

    #[test]
    fn test_auto_detects_current_report() {
        let filing = parse_auto(CURRENT_REPORT.as_bytes(), &ParserOptions::default()).unwrap();
        assert_eq!(filing.filing_type, "8-K");
        assert!(filing.important_sections.contains_key("Item 8.01"));
    }

    #[test]
    fn test_auto_uses_tagged_type_for_xbrl() {
        let filing = parse_auto(&read_test_bytes("acme-20231231.xml"), &ParserOptions::default()).unwrap();
        assert_eq!(filing.filing_type, "10-K");
        assert_eq!(filing.company_name.as_deref(), Some("Acme Industries Inc."));
        assert_eq!(
            filing.metadata.financial_metrics["revenue"].source,
            "xbrl:us-gaap:Revenues"
        );
    }

    #[test]
    fn test_auto_routes_ownership_xml_to_custom_parser() {
        let filing = parse_auto(&read_test_bytes("form4-ownership.xml"), &ParserOptions::default()).unwrap();
        assert_eq!(filing.filing_type, "4");
        assert_eq!(filing.tables().len(), 2);
        assert!(filing.important_sections.contains_key("Reporting Owner"));
    }

    #[test]
    fn test_undetectable_document() {
        let err = parse_auto(b"just some words\nnothing else", &ParserOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::DetectionFailed { .. }));
    }

    #[test]
    fn test_resolve_type_id() {
        assert_eq!(resolve_type_id("10-K/A").as_deref(), Some("10-K"));
        assert_eq!(resolve_type_id("Form4").as_deref(), Some("Form4"));
        assert_eq!(resolve_type_id("S-1"), None);
        assert_eq!(resolve_type_id(" "), None);
    }

    #[test]
    fn test_sample_respects_char_boundaries() {
        assert_eq!(sample_of("héllo", 2), "h");
        assert_eq!(sample_of("abc", 10), "abc");
    }
}

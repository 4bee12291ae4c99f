//! Structural parsing: raw bytes in, a section tree plus tag-derived metadata out.

pub mod decode;
pub mod detect;
pub mod html;
pub mod layout;
pub mod ownership;
pub mod pdf;
pub mod submission;
pub mod text;
pub mod types;
pub mod xbrl;

#[cfg(test)]
pub mod tests;

pub use decode::decode_bytes;
pub use detect::DocumentFormat;
pub use types::{
    FilingMetadata, MetricValue, ParsedFiling, ParserOptionOverrides, ParserOptions, Section,
    SectionKind, StructuredDocument,
};

use crate::core::{PipelineError, Result};

/// Detects the container format and runs the matching parser.
pub fn parse_structure(
    bytes: &[u8],
    options: &ParserOptions,
) -> Result<(DocumentFormat, StructuredDocument)> {
    let format = detect::detect_format(bytes);
    log::debug!("Parsing {} bytes as {}", bytes.len(), format);
    let document = parse_as(format, bytes, options)?;
    Ok((format, document))
}

pub fn parse_as(
    format: DocumentFormat,
    bytes: &[u8],
    options: &ParserOptions,
) -> Result<StructuredDocument> {
    match format {
        DocumentFormat::Pdf => pdf::parse(bytes, options),
        DocumentFormat::Xbrl => xbrl::parse(&decode_bytes(bytes), options),
        DocumentFormat::OwnershipXml => ownership::parse(&decode_bytes(bytes), options),
        DocumentFormat::Html => html::parse(&decode_bytes(bytes), options),
        DocumentFormat::PlainText => parse_plain_text(&decode_bytes(bytes), options),
        DocumentFormat::Submission => parse_submission_container(bytes, options),
    }
}

fn parse_plain_text(content: &str, options: &ParserOptions) -> Result<StructuredDocument> {
    let sections = text::segment_lines(content, options);
    if sections.is_empty() {
        return Err(PipelineError::parse("text", content.len(), "document has no textual content"));
    }
    Ok(StructuredDocument::from_sections(sections))
}

/// Parses the primary document of a submission; header fields take precedence over the
/// document's own tagged metadata.
fn parse_submission_container(bytes: &[u8], options: &ParserOptions) -> Result<StructuredDocument> {
    let raw = decode_bytes(bytes);
    let submission = submission::parse_submission(&raw);
    let primary = submission
        .primary_document()
        .ok_or_else(|| PipelineError::parse("submission", bytes.len(), "no <DOCUMENT> blocks found"))?;

    let inner_format = match detect::detect_format(&primary.body) {
        DocumentFormat::Submission => DocumentFormat::PlainText,
        format => format,
    };
    log::debug!(
        "Primary document {:?} ({:?}) parsed as {}",
        primary.filename,
        primary.doc_type,
        inner_format
    );

    let mut document = parse_as(inner_format, &primary.body, options)?;
    let mut tagged = submission.header.metadata();
    tagged.fill_missing(std::mem::take(&mut document.tagged));
    document.tagged = tagged;
    Ok(document)
}

#[cfg(test)]
mod dispatch_tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_plain_text_is_segmented() {
        let (format, doc) =
            parse_structure(b"RISK FACTORS\n\nOur results may vary.\n", &ParserOptions::default()).unwrap();
        assert_eq!(format, DocumentFormat::PlainText);
        assert_eq!(doc.sections[0].title.as_deref(), Some("RISK FACTORS"));
    }

    #[test]
    fn test_empty_text_is_parse_error() {
        let err = parse_structure(b"   \n\n", &ParserOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
    }

    #[test]
    fn test_submission_header_fills_metadata() {
        let raw = "<SEC-DOCUMENT>0001.txt : 20240201\n<SEC-HEADER>0001.hdr.sgml : 20240201\n\
                   CONFORMED SUBMISSION TYPE:\t4\nFILED AS OF DATE:\t\t20240201\n\
                   COMPANY CONFORMED NAME:\t\tACME INDUSTRIES INC\n</SEC-HEADER>\n\
                   <DOCUMENT>\n<TYPE>4\n<SEQUENCE>1\n<FILENAME>form4.xml\n<TEXT>\n<XML>\n\
                   <?xml version=\"1.0\"?>\n<ownershipDocument><documentType>4</documentType>\
                   <periodOfReport>2024-01-30</periodOfReport>\
                   <issuer><issuerCik>0000123456</issuerCik><issuerName>Acme Industries Inc.</issuerName></issuer>\
                   </ownershipDocument>\n</XML>\n</TEXT>\n</DOCUMENT>\n</SEC-DOCUMENT>";

        let (format, doc) = parse_structure(raw.as_bytes(), &ParserOptions::default()).unwrap();
        assert_eq!(format, DocumentFormat::Submission);
        assert_eq!(doc.tagged.company_name.as_deref(), Some("ACME INDUSTRIES INC"));
        assert_eq!(doc.tagged.cik.as_deref(), Some("0000123456"));
        assert_eq!(doc.tagged.filing_date, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(doc.tagged.period_of_report, NaiveDate::from_ymd_opt(2024, 1, 30));
        let tables = types::flatten(&doc.sections)
            .filter(|s| s.kind == SectionKind::Table)
            .count();
        assert_eq!(tables, 2);
    }
}

//! Format and filing-type detection over a byte or text sample.

use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::text::{looks_like_markup, normalize_text, strip_markup};
use crate::edgar::filing_types;

pub const PDF_MAGIC: &[u8; 5] = b"%PDF-";
pub const XBRL_ROOT: &str = "xbrl";
pub const OWNERSHIP_ROOT: &str = "ownershipDocument";
/// Bytes handed to the XML reader when sniffing the root element.
const ROOT_SNIFF_BYTES: usize = 8192;
const FORMAT_SNIFF_BYTES: usize = 4096;
const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentFormat {
    Pdf,
    Xbrl,
    OwnershipXml,
    Submission,
    Html,
    PlainText,
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Pdf => write!(f, "pdf"),
            DocumentFormat::Xbrl => write!(f, "xbrl"),
            DocumentFormat::OwnershipXml => write!(f, "ownership-xml"),
            DocumentFormat::Submission => write!(f, "submission"),
            DocumentFormat::Html => write!(f, "html"),
            DocumentFormat::PlainText => write!(f, "text"),
        }
    }
}

static DETECTION_TABLE: Lazy<Vec<(&'static str, Vec<Regex>)>> = Lazy::new(|| {
    filing_types::detection_table()
        .into_iter()
        .map(|(id, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| Regex::new(p).expect("detection patterns are static"))
                .collect();
            (id, compiled)
        })
        .collect()
});

static TITLE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("static pattern"));

pub fn is_portable_document(bytes: &[u8]) -> bool {
    bytes.len() >= PDF_MAGIC.len() && &bytes[..PDF_MAGIC.len()] == PDF_MAGIC
}

/// Local name of the first element, if the sample reads as XML up to that point.
pub fn sniff_root_tag(bytes: &[u8]) -> Option<String> {
    let sample = &bytes[..bytes.len().min(ROOT_SNIFF_BYTES)];
    let mut reader = Reader::from_reader(sample);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
        buf.clear();
    }
}

pub fn is_tag_structured_data(bytes: &[u8]) -> bool {
    sniff_root_tag(bytes).as_deref() == Some(XBRL_ROOT)
}

pub fn detect_format(bytes: &[u8]) -> DocumentFormat {
    if is_portable_document(bytes) {
        return DocumentFormat::Pdf;
    }
    match sniff_root_tag(bytes).as_deref() {
        Some(XBRL_ROOT) => return DocumentFormat::Xbrl,
        Some(OWNERSHIP_ROOT) => return DocumentFormat::OwnershipXml,
        _ => {}
    }

    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(FORMAT_SNIFF_BYTES)]);
    let upper = head.to_uppercase();
    if upper.contains("<SEC-DOCUMENT>")
        || upper.contains("<SEC-HEADER>")
        || upper.trim_start().starts_with("<DOCUMENT>")
    {
        DocumentFormat::Submission
    } else if looks_like_markup(&head) {
        DocumentFormat::Html
    } else {
        DocumentFormat::PlainText
    }
}

fn match_table(text: &str) -> Option<String> {
    DETECTION_TABLE
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| p.is_match(text)))
        .map(|(id, _)| id.to_string())
}

/// `<title>` contents when present, otherwise the first non-empty line of the stripped sample.
pub fn extract_title(sample: &str) -> Option<String> {
    if let Some(caps) = TITLE_TAG.captures(sample) {
        let title = normalize_text(&strip_markup(&caps[1]), false);
        if !title.is_empty() {
            return Some(title);
        }
    }

    let text = if looks_like_markup(sample) {
        strip_markup(sample)
    } else {
        sample.to_string()
    };
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.chars().take(MAX_TITLE_CHARS).collect())
}

/// First registered filing type with a pattern matching the sample body, then the title.
pub fn detect_filing_type(sample: &str) -> Option<String> {
    let body = if looks_like_markup(sample) {
        strip_markup(sample)
    } else {
        sample.to_string()
    };

    let detected = match_table(&body).or_else(|| extract_title(sample).and_then(|t| match_table(&t)));
    log::debug!("Detected filing type {:?} from {} byte sample", detected, sample.len());
    detected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_signature() {
        assert!(is_portable_document(b"%PDF-1.7\n..."));
        assert!(!is_portable_document(b"%PDF"));
        assert!(!is_portable_document(b"<html>%PDF-"));
    }

    #[test]
    fn test_tag_structured_sniff() {
        let xbrl = br#"<?xml version="1.0"?><!-- c --><xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"></xbrli:xbrl>"#;
        assert!(is_tag_structured_data(xbrl));
        assert!(!is_tag_structured_data(b"<html><body>hi</body></html>"));
        assert!(!is_tag_structured_data(b"plain text"));
        assert_eq!(
            sniff_root_tag(b"<?xml version=\"1.0\"?>\n<ownershipDocument><x/></ownershipDocument>").as_deref(),
            Some(OWNERSHIP_ROOT)
        );
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(b"%PDF-1.4"), DocumentFormat::Pdf);
        assert_eq!(
            detect_format(b"<SEC-DOCUMENT>0001.txt\n<SEC-HEADER>\n</SEC-HEADER>"),
            DocumentFormat::Submission
        );
        assert_eq!(
            detect_format(b"<!DOCTYPE html><html><body><p>x</p></body></html>"),
            DocumentFormat::Html
        );
        assert_eq!(detect_format(b"UNITED STATES\nFORM 10-K"), DocumentFormat::PlainText);
    }

    #[test]
    fn test_detects_annual_report_title() {
        let sample = "<html><head><title>Acme Corp Form 10-K Annual Report</title></head><body></body></html>";
        assert_eq!(detect_filing_type(sample).as_deref(), Some("10-K"));
    }

    #[test]
    fn test_detects_types_from_body() {
        assert_eq!(
            detect_filing_type("CURRENT REPORT\nPursuant to Section 13 or 15(d)").as_deref(),
            Some("8-K")
        );
        assert_eq!(
            detect_filing_type("For the quarterly period ended March 31, 2024").as_deref(),
            Some("10-Q")
        );
        assert_eq!(
            detect_filing_type("STATEMENT OF CHANGES IN BENEFICIAL OWNERSHIP").as_deref(),
            Some("4")
        );
        assert_eq!(
            detect_filing_type("DEFINITIVE PROXY STATEMENT").as_deref(),
            Some("DEF 14A")
        );
    }

    #[test]
    fn test_registration_order_breaks_ties() {
        // Mentions both forms; 10-K is registered first.
        let sample = "Quarterly Report on Form 10-Q; see our Annual Report on Form 10-K.";
        assert_eq!(detect_filing_type(sample).as_deref(), Some("10-K"));
    }

    #[test]
    fn test_no_match_and_determinism() {
        let sample = "Minutes of the neighbourhood gardening club";
        assert_eq!(detect_filing_type(sample), None);
        let html = "<p>Form 8-K</p>";
        assert_eq!(detect_filing_type(html), detect_filing_type(html));
    }

    #[test]
    fn test_extract_title_fallback_to_first_line() {
        assert_eq!(
            extract_title("\n\n  Acme Quarterly Update  \nbody").as_deref(),
            Some("Acme Quarterly Update")
        );
    }
}

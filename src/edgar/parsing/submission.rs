//! Full submission text files: an SGML `<SEC-HEADER>` followed by `<DOCUMENT>` blocks.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::types::FilingMetadata;

static HEADER_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(SEC-HEADER|IMS-HEADER)>(.*?)</(SEC-HEADER|IMS-HEADER)>").expect("static pattern")
});
static DOCUMENT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<DOCUMENT>(.*?)</DOCUMENT>").expect("static pattern"));
static TEXT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<TEXT>(.*?)</TEXT>").expect("static pattern"));
static PAYLOAD_WRAPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?(XBRL|XML|PDF)>").expect("static pattern"));

const DOCUMENT_FIELDS: &[&str] = &["TYPE", "SEQUENCE", "FILENAME", "DESCRIPTION"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionHeader {
    pub submission_type: Option<String>,
    pub company_name: Option<String>,
    pub cik: Option<String>,
    pub filed_as_of: Option<NaiveDate>,
    pub period_of_report: Option<NaiveDate>,
    /// Every `KEY: value` line as `GROUP:KEY`, in header order.
    pub fields: Vec<(String, String)>,
}

impl SubmissionHeader {
    pub fn metadata(&self) -> FilingMetadata {
        FilingMetadata {
            filing_type: self.submission_type.clone().unwrap_or_default(),
            company_name: self.company_name.clone(),
            filing_date: self.filed_as_of,
            cik: self.cik.clone(),
            period_of_report: self.period_of_report,
            ..FilingMetadata::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionDocument {
    pub doc_type: Option<String>,
    pub sequence: Option<String>,
    pub filename: Option<String>,
    pub description: Option<String>,
    /// Payload bytes; uuencoded payloads are already decoded.
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Submission {
    pub header: SubmissionHeader,
    pub documents: Vec<SubmissionDocument>,
}

impl Submission {
    /// The document whose type matches the submission type, else the first document.
    pub fn primary_document(&self) -> Option<&SubmissionDocument> {
        let submission_type = self.header.submission_type.as_deref();
        self.documents
            .iter()
            .find(|d| {
                submission_type.is_some_and(|t| {
                    d.doc_type.as_deref().is_some_and(|dt| dt.eq_ignore_ascii_case(t))
                })
            })
            .or_else(|| self.documents.first())
    }
}

fn parse_header_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y%m%d").ok()
}

pub fn parse_header(raw_text: &str) -> SubmissionHeader {
    let mut header = SubmissionHeader::default();
    let Some(block) = HEADER_BLOCK.captures(raw_text).and_then(|c| c.get(2)) else {
        return header;
    };

    let mut current_group = String::new();
    // The first line is the remainder of the opening tag line.
    for line in block.as_str().lines().skip(1) {
        if line.trim().is_empty() || line.trim_start().starts_with('<') {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = html_escape::decode_html_entities(value.trim()).into_owned();

        // Unindented keys with no value open a group (FILER, COMPANY DATA, ...).
        if value.is_empty() {
            if current_group.is_empty() || !(line.starts_with('\t') || line.starts_with(' ')) {
                current_group = key.to_string();
            } else {
                current_group = format!("{}/{}", current_group.split('/').next().unwrap_or(""), key);
            }
            continue;
        }

        match key {
            "CONFORMED SUBMISSION TYPE" => {
                header.submission_type.get_or_insert_with(|| value.clone());
            }
            "COMPANY CONFORMED NAME" => {
                header.company_name.get_or_insert_with(|| value.clone());
            }
            "CENTRAL INDEX KEY" => {
                header.cik.get_or_insert_with(|| value.clone());
            }
            "FILED AS OF DATE" => header.filed_as_of = header.filed_as_of.or(parse_header_date(&value)),
            "CONFORMED PERIOD OF REPORT" => {
                header.period_of_report = header.period_of_report.or(parse_header_date(&value))
            }
            _ => {}
        }
        let field = if current_group.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", current_group, key)
        };
        header.fields.push((field, value));
    }
    header
}

/// Byte count declared by the length characters of the encoded lines after `begin`.
fn declared_length(encoded: &str) -> usize {
    encoded
        .lines()
        .skip(1)
        .take_while(|line| line.trim_end() != "end")
        .filter_map(|line| line.bytes().next())
        .map(|length| (length.wrapping_sub(b' ') & 0x3f) as usize)
        .sum()
}

/// Decodes a `begin <mode> <name>` ... `end` payload. The decoder pads the last line to a
/// full group, so the output is cut to the declared length.
pub fn decode_uuencoded(text: &str) -> Option<Vec<u8>> {
    let start = text.find("begin ")?;
    let encoded = &text[start..];
    let (mut bytes, _name) = uuencode::uudecode(encoded)?;
    bytes.truncate(declared_length(encoded));
    Some(bytes)
}

fn field_value(document: &str, field: &str) -> Option<String> {
    let tag = format!("<{}>", field);
    let start = document.find(&tag)? + tag.len();
    let rest = &document[start..];
    let end = rest.find(['\n', '<']).unwrap_or(rest.len());
    let value = rest[..end].trim();
    (!value.is_empty()).then(|| value.to_string())
}

pub fn split_documents(raw_text: &str) -> Vec<SubmissionDocument> {
    DOCUMENT_BLOCK
        .captures_iter(raw_text)
        .filter_map(|c| c.get(1))
        .map(|block| {
            let block = block.as_str();
            let mut fields = DOCUMENT_FIELDS.iter().map(|f| field_value(block, f));
            let (doc_type, sequence, filename, description) = (
                fields.next().flatten(),
                fields.next().flatten(),
                fields.next().flatten(),
                fields.next().flatten(),
            );

            let text = TEXT_BLOCK
                .captures(block)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
                .unwrap_or("");
            let text = PAYLOAD_WRAPPER.replace_all(text, "");
            let text = text.trim();

            let body = if text.starts_with("begin ") {
                decode_uuencoded(text).unwrap_or_else(|| {
                    log::warn!("Could not decode uuencoded payload of {:?}", filename);
                    text.as_bytes().to_vec()
                })
            } else {
                text.as_bytes().to_vec()
            };

            SubmissionDocument {
                doc_type,
                sequence,
                filename,
                description,
                body,
            }
        })
        .collect()
}

pub fn parse_submission(raw_text: &str) -> Submission {
    let submission = Submission {
        header: parse_header(raw_text),
        documents: split_documents(raw_text),
    };
    log::debug!(
        "Submission {:?} contains {} documents",
        submission.header.submission_type,
        submission.documents.len()
    );
    submission
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBMISSION: &str = "<SEC-DOCUMENT>0000123456-23-000042.txt : 20231117
<SEC-HEADER>0000123456-23-000042.hdr.sgml : 20231117
ACCESSION NUMBER:\t\t0000123456-23-000042
CONFORMED SUBMISSION TYPE:\t8-K
PUBLIC DOCUMENT COUNT:\t\t2
CONFORMED PERIOD OF REPORT:\t20231115
FILED AS OF DATE:\t\t20231117

FILER:

\tCOMPANY DATA:\t
\t\tCOMPANY CONFORMED NAME:\t\t\tACME INDUSTRIES INC
\t\tCENTRAL INDEX KEY:\t\t\t0000123456
</SEC-HEADER>
<DOCUMENT>
<TYPE>8-K
<SEQUENCE>1
<FILENAME>acme-8k.htm
<DESCRIPTION>CURRENT REPORT
<TEXT>
<html><body><p>Item 8.01 Other Events</p></body></html>
</TEXT>
</DOCUMENT>
<DOCUMENT>
<TYPE>EX-99.1
<SEQUENCE>2
<FILENAME>ex99.htm
<TEXT>
<html><body><p>Press release</p></body></html>
</TEXT>
</DOCUMENT>
</SEC-DOCUMENT>";

    #[test]
    fn test_parse_header() {
        let header = parse_header(SUBMISSION);
        assert_eq!(header.submission_type.as_deref(), Some("8-K"));
        assert_eq!(header.company_name.as_deref(), Some("ACME INDUSTRIES INC"));
        assert_eq!(header.cik.as_deref(), Some("0000123456"));
        assert_eq!(header.filed_as_of, NaiveDate::from_ymd_opt(2023, 11, 17));
        assert_eq!(header.period_of_report, NaiveDate::from_ymd_opt(2023, 11, 15));
        assert!(header
            .fields
            .iter()
            .any(|(k, v)| k == "FILER/COMPANY DATA:CENTRAL INDEX KEY" && v == "0000123456"));
    }

    #[test]
    fn test_split_documents_and_primary() {
        let submission = parse_submission(SUBMISSION);
        assert_eq!(submission.documents.len(), 2);
        assert_eq!(submission.documents[1].doc_type.as_deref(), Some("EX-99.1"));
        assert_eq!(submission.documents[1].description, None);

        let primary = submission.primary_document().unwrap();
        assert_eq!(primary.filename.as_deref(), Some("acme-8k.htm"));
        assert!(String::from_utf8_lossy(&primary.body).starts_with("<html>"));
    }

    #[test]
    fn test_uuencoded_payload_is_decoded() {
        let payload = b"%PDF-1.4 binary exhibit";
        let encoded = uuencode::uuencode("exhibit.pdf", payload);
        let raw = format!(
            "<DOCUMENT>\n<TYPE>EX-99.2\n<FILENAME>exhibit.pdf\n<TEXT>\n<PDF>\n{}\n</PDF>\n</TEXT>\n</DOCUMENT>",
            encoded
        );

        let documents = split_documents(&raw);
        assert_eq!(documents[0].body, payload.to_vec());
    }

    #[test]
    fn test_decoded_length_follows_line_lengths() {
        for len in [1usize, 23, 45, 46, 100] {
            let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
            let encoded = uuencode::uuencode("blob.bin", &payload);
            assert_eq!(decode_uuencoded(&encoded).unwrap(), payload, "payload of {} bytes", len);
        }
    }

    #[test]
    fn test_missing_header_is_empty() {
        assert_eq!(parse_header("no header here"), SubmissionHeader::default());
    }
}

use filing_pipeline::batch::{process_batch, BatchItem, BatchOptions};
use filing_pipeline::edgar::parsing::submission::{decode_uuencoded, split_documents};
use filing_pipeline::edgar::parsing::{parse_structure, DocumentFormat, ParserOptions};
use filing_pipeline::{parse_auto, ProgressTracker};
use std::fs;
use tempfile::tempdir;

const EXHIBIT_TEXT: &str = "Here is a test of UUEncoding.\n\nThis is another line of text.\n\nEnd of the test file.\n";

fn submission(document_type: &str, filename: &str, body: &str) -> String {
    format!(
        "<SEC-DOCUMENT>0000123456-24-000007.txt : 20240215
<SEC-HEADER>0000123456-24-000007.hdr.sgml : 20240215
ACCESSION NUMBER:\t\t0000123456-24-000007
CONFORMED SUBMISSION TYPE:\t{doc_type}
CONFORMED PERIOD OF REPORT:\t20231231
FILED AS OF DATE:\t\t20240215

FILER:

\tCOMPANY DATA:\t
\t\tCOMPANY CONFORMED NAME:\t\t\tACME INDUSTRIES INC
\t\tCENTRAL INDEX KEY:\t\t\t0000123456
</SEC-HEADER>
<DOCUMENT>
<TYPE>{doc_type}
<SEQUENCE>1
<FILENAME>{filename}
<DESCRIPTION>PRIMARY DOCUMENT
<TEXT>
{body}
</TEXT>
</DOCUMENT>
</SEC-DOCUMENT>",
        doc_type = document_type,
        filename = filename,
        body = body
    )
}

#[test]
fn test_decode_uuencoded() {
    let encoded = uuencode::uuencode("test.txt", EXHIBIT_TEXT.as_bytes());
    let decoded = decode_uuencoded(&encoded).unwrap();
    assert_eq!(String::from_utf8(decoded).unwrap(), EXHIBIT_TEXT);
}

#[test]
fn test_uuencoded_document_is_decoded_from_file() {
    let temp_dir = tempdir().unwrap();
    let input_file = temp_dir.path().join("input.txt");
    let raw = format!(
        "<DOCUMENT>\n<TYPE>EX-101.INS\n<FILENAME>uuencoded_content.txt\n<DESCRIPTION>XBRL INSTANCE DOCUMENT\n<TEXT>\n{}\n</TEXT>\n</DOCUMENT>",
        uuencode::uuencode("test.txt", EXHIBIT_TEXT.as_bytes())
    );
    fs::write(&input_file, raw).unwrap();

    let documents = split_documents(&fs::read_to_string(&input_file).unwrap());
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].doc_type.as_deref(), Some("EX-101.INS"));
    assert_eq!(documents[0].description.as_deref(), Some("XBRL INSTANCE DOCUMENT"));
    assert_eq!(documents[0].body, EXHIBIT_TEXT.as_bytes());
}

#[test]
fn test_submission_with_html_primary_document() {
    let body = "<html><body>\
        <p>FORM 10-K</p>\
        <p>ANNUAL REPORT PURSUANT TO SECTION 13 OR 15(d) OF THE SECURITIES EXCHANGE ACT OF 1934</p>\
        <h2>Item 1A. Risk Factors</h2><p>Demand for anvils is cyclical.</p>\
        </body></html>";
    let raw = submission("10-K", "acme-10k.htm", body);

    let (format, document) = parse_structure(raw.as_bytes(), &ParserOptions::default()).unwrap();
    assert_eq!(format, DocumentFormat::Submission);
    assert_eq!(document.tagged.company_name.as_deref(), Some("ACME INDUSTRIES INC"));

    let filing = parse_auto(raw.as_bytes(), &ParserOptions::default()).unwrap();
    assert_eq!(filing.filing_type, "10-K");
    assert_eq!(filing.cik.as_deref(), Some("0000123456"));
    assert_eq!(filing.filing_date, chrono::NaiveDate::from_ymd_opt(2024, 2, 15));
    assert_eq!(
        filing.metadata.period_of_report,
        chrono::NaiveDate::from_ymd_opt(2023, 12, 31)
    );
    assert_eq!(filing.important_sections["Risk Factors"], "Demand for anvils is cyclical.");
    assert_eq!(filing.important_sections["Item 1A"], "Demand for anvils is cyclical.");
}

#[test]
fn test_submission_with_uuencoded_primary_document() {
    let html = "<html><body><p>FORM 8-K</p><p><b>Item 7.01 Regulation FD Disclosure</b></p>\
                <p>Slides were furnished to investors.</p></body></html>";
    let raw = submission("8-K", "acme-8k.htm", &uuencode::uuencode("acme-8k.htm", html.as_bytes()));

    let filing = parse_auto(raw.as_bytes(), &ParserOptions::default()).unwrap();
    assert_eq!(filing.filing_type, "8-K");
    assert_eq!(filing.important_sections["Item 7.01"], "Slides were furnished to investors.");
}

#[tokio::test]
async fn test_batch_over_files_on_disk() {
    let temp_dir = tempdir().unwrap();
    let good = temp_dir.path().join("good.txt");
    let bad = temp_dir.path().join("bad.pdf");
    fs::write(&good, submission("10-K", "a.htm", "<html><body><p>FORM 10-K</p><p>Body text.</p></body></html>")).unwrap();
    fs::write(&bad, b"%PDF-1.7 truncated").unwrap();

    let items = vec![
        BatchItem::from_path(&good).unwrap(),
        BatchItem::from_path(&bad).unwrap(),
    ];
    let results = process_batch(items, BatchOptions::default(), &ProgressTracker::silent()).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].filing().unwrap().filing_type, "10-K");
    assert!(results[1].is_failed());
}

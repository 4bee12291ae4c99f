//! Pattern-based metadata extraction from document text.
//!
//! Each field has an ordered pattern list. The first pattern whose capture parses wins, so the
//! order of every list below is significant.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::edgar::parsing::types::FilingMetadata;
use crate::edgar::registry;
use crate::edgar::report::FilingCategory;

const COMPANY_NAME_PATTERNS: &[&str] = &[
    r"(?im)^\s*COMPANY CONFORMED NAME:\s*(.+?)\s*$",
    r"(?im)^\s*([^\n(]{2,120}?)\s*\n\s*\(exact\s+name\s+of\s+registrant\s+as\s+specified\s+in\s+its\s+charter\)",
    r"(?i)registrant\s*name\s*:\s*([^\n]{2,120})",
    r"(?m)^\s*([A-Z][A-Za-z0-9&.,' -]{1,80}\b(?:INC|CORP|CORPORATION|COMPANY|HOLDINGS|LLC|LTD|PLC|CO)\.?)\s*$",
];

const FILING_DATE_PATTERNS: &[&str] = &[
    r"(?i)FILED\s+AS\s+OF\s+DATE:\s*(\d{8})",
    r"(?i)date\s+of\s+report\s*\(\s*date\s+of\s+earliest\s+event\s+reported\s*\)\s*:?\s*([A-Za-z]+\.?\s+\d{1,2},\s*\d{4})",
    r"(?i)\bdated?\s*:?\s+([A-Za-z]+\.?\s+\d{1,2},\s*\d{4})",
    r"(?i)\bdate\s*:\s*(\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{4})",
];

const CIK_PATTERNS: &[&str] = &[
    r"(?i)CENTRAL\s+INDEX\s+KEY:\s*(\d{10})",
    r"(?i)\bCIK\b\s*(?:no\.?|number|#)?\s*:?\s*(\d{4,10})\b",
];

const FISCAL_YEAR_PATTERNS: &[&str] = &[
    r"(?i)for\s+the\s+fiscal\s+year\s+ended\s+[A-Za-z]+\.?\s+\d{1,2},\s*(\d{4})",
    r"(?i)for\s+the\s+quarterly\s+period\s+ended\s+[A-Za-z]+\.?\s+\d{1,2},\s*(\d{4})",
    r"(?i)\bfiscal\s+(?:year\s+)?(\d{4})\b",
];

const FISCAL_PERIOD_PATTERNS: &[&str] = &[
    r"(?i)\b(Q[1-4])\b",
    r"(?i)\b(first|second|third|fourth)\s+(?:fiscal\s+)?quarter\b",
    r"(?i)for\s+the\s+(fiscal\s+year)\s+ended",
];

const PERIOD_OF_REPORT_PATTERNS: &[&str] = &[
    r"(?i)CONFORMED\s+PERIOD\s+OF\s+REPORT:\s*(\d{8})",
    r"(?i)for\s+the\s+(?:fiscal\s+year|quarterly\s+period)\s+ended\s+([A-Za-z]+\.?\s+\d{1,2},\s*\d{4})",
    r"(?i)date\s+of\s+report\s*\(\s*date\s+of\s+earliest\s+event\s+reported\s*\)\s*:?\s*([A-Za-z]+\.?\s+\d{1,2},\s*\d{4})",
];

const DATE_FORMATS: &[&str] = &["%Y%m%d", "%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%m/%d/%Y"];

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("metadata patterns are static"))
        .collect()
}

static COMPANY_NAME: Lazy<Vec<Regex>> = Lazy::new(|| compile(COMPANY_NAME_PATTERNS));
static FILING_DATE: Lazy<Vec<Regex>> = Lazy::new(|| compile(FILING_DATE_PATTERNS));
static CIK: Lazy<Vec<Regex>> = Lazy::new(|| compile(CIK_PATTERNS));
static FISCAL_YEAR: Lazy<Vec<Regex>> = Lazy::new(|| compile(FISCAL_YEAR_PATTERNS));
static FISCAL_PERIOD: Lazy<Vec<Regex>> = Lazy::new(|| compile(FISCAL_PERIOD_PATTERNS));
static PERIOD_OF_REPORT: Lazy<Vec<Regex>> = Lazy::new(|| compile(PERIOD_OF_REPORT_PATTERNS));
static COMMA_SPACING: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*").expect("static pattern"));

/// First capture, across the patterns in order, that `convert` accepts.
fn first_match<T>(patterns: &[Regex], text: &str, convert: impl Fn(&str) -> Option<T>) -> Option<T> {
    patterns.iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| convert(m.as_str().trim()))
    })
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim().trim_end_matches(',');
    (!value.is_empty()).then(|| value.to_string())
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = COMMA_SPACING.replace_all(value.trim().trim_end_matches('.'), ", ");
    let value = value.replace('.', "");
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&value, format).ok())
}

fn normalize_period(value: &str, category: FilingCategory) -> Option<String> {
    let period = match value.to_lowercase().as_str() {
        "first" | "q1" => "Q1",
        "second" | "q2" => "Q2",
        "third" | "q3" => "Q3",
        "fourth" | "q4" => "Q4",
        "fiscal year" if category != FilingCategory::QuarterlyReport => "FY",
        _ => return None,
    };
    Some(period.to_string())
}

pub fn extract_metadata(text: &str, filing_type: &str) -> FilingMetadata {
    let category = registry::category_of(filing_type);
    let metadata = FilingMetadata {
        filing_type: filing_type.to_string(),
        company_name: first_match(&COMPANY_NAME, text, non_empty),
        filing_date: first_match(&FILING_DATE, text, parse_date),
        cik: first_match(&CIK, text, non_empty),
        fiscal_year: first_match(&FISCAL_YEAR, text, non_empty),
        fiscal_period: first_match(&FISCAL_PERIOD, text, |v| normalize_period(v, category)),
        period_of_report: first_match(&PERIOD_OF_REPORT, text, parse_date),
        financial_metrics: Default::default(),
    };
    log::debug!(
        "Metadata for {}: company={:?} cik={:?} filed={:?}",
        filing_type,
        metadata.company_name,
        metadata.cik,
        metadata.filing_date
    );
    metadata
}

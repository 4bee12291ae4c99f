//! Financial metric extraction over a section tree.
//!
//! Sections are visited depth-first in document order. For each section the text patterns run
//! first, then (for tables) the row scan. A metric keeps the first value found.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::edgar::parsing::types::{flatten, MetricValue, Section, SectionKind};

/// Dollar amount with an optional scale word. Substituted for `{money}` in the text patterns.
const MONEY: &str = r"(\(?\$\s?\d[\d,]*(?:\.\d+)?\)?(?:\s*(?:million|billion|thousand))?)";
const PER_SHARE: &str = r"(\(?\$\s?\d+\.\d{2}\)?)";

struct MetricSpec {
    name: &'static str,
    /// Ordered; `{money}` and `{per_share}` are expanded before compiling.
    text_patterns: &'static [&'static str],
    /// Lower-case prefixes of a table row's first cell, optionally after a qualifier word.
    row_labels: &'static [&'static str],
    /// Rows whose first cell contains one of these belong to another metric.
    row_excludes: &'static [&'static str],
}

/// Words that may precede a row label (`Diluted earnings per share`).
const LABEL_QUALIFIERS: &[&str] = &["total ", "diluted ", "basic ", "consolidated "];

const METRICS: &[MetricSpec] = &[
    MetricSpec {
        name: "revenue",
        text_patterns: &[
            r"(?i)total\s+(?:net\s+)?revenues?\s+(?:of|was|were|totaled)\s+{money}",
            r"(?i)(?:net\s+)?revenues?\s+(?:increased|decreased|grew|declined)[^$\n]{0,80}?\bto\s+{money}",
            r"(?i)(?:net\s+)?(?:revenues?|sales)\s+(?:of|was|were|totaled)\s+{money}",
        ],
        row_labels: &["total revenue", "total net revenue", "revenue", "total net sales", "net sales"],
        row_excludes: &[],
    },
    MetricSpec {
        name: "net_income",
        text_patterns: &[
            r"(?i)net\s+(?:income|earnings)\s+(?:attributable\s+to\s+[\w\s.,']{1,60}?\s+)?(?:of|was|were|totaled)\s+{money}",
            r"(?i)net\s+loss\s+(?:of|was|totaled)\s+{money}",
        ],
        row_labels: &["net income", "net earnings", "net loss"],
        row_excludes: &["per share", "per diluted", "per basic", "per common"],
    },
    MetricSpec {
        name: "eps",
        text_patterns: &[
            r"(?i)(?:diluted\s+)?earnings\s+per\s+(?:diluted\s+)?share\s+(?:of|was|were)\s+{per_share}",
            r"(?i)\bEPS\s+(?:of|was)\s+{per_share}",
        ],
        row_labels: &["earnings per share", "net income per share", "earnings per common share", "per diluted share"],
        row_excludes: &[],
    },
    MetricSpec {
        name: "total_assets",
        text_patterns: &[r"(?i)total\s+assets\s+(?:of|was|were|totaled)\s+{money}"],
        row_labels: &["total assets"],
        row_excludes: &[],
    },
    MetricSpec {
        name: "total_liabilities",
        text_patterns: &[r"(?i)total\s+liabilities\s+(?:of|was|were|totaled)\s+{money}"],
        row_labels: &["total liabilities"],
        row_excludes: &[],
    },
    MetricSpec {
        name: "cash_and_equivalents",
        text_patterns: &[
            r"(?i)cash\s+and\s+cash\s+equivalents\s+(?:of|was|were|totaled)\s+{money}",
            r"(?i)cash\s+and\s+equivalents\s+(?:of|was|were|totaled)\s+{money}",
        ],
        row_labels: &["cash and cash equivalents", "cash and equivalents"],
        row_excludes: &[],
    },
];

static TEXT_PATTERNS: Lazy<Vec<Vec<Regex>>> = Lazy::new(|| {
    METRICS
        .iter()
        .map(|metric| {
            metric
                .text_patterns
                .iter()
                .map(|p| {
                    let expanded = p.replace("{money}", MONEY).replace("{per_share}", PER_SHARE);
                    Regex::new(&expanded).expect("metric patterns are static")
                })
                .collect()
        })
        .collect()
});

/// Header labels that mark a value column: a year, a quarter or a period phrase.
static PERIOD_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:19|20)\d{2}\b|\bq[1-4]\b|months\s+ended|year\s+ended|quarter")
        .expect("static pattern")
});
static HAS_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").expect("static pattern"));

pub fn metric_names() -> impl Iterator<Item = &'static str> {
    METRICS.iter().map(|m| m.name)
}

fn source_label(prefix: &str, section: &Section) -> String {
    match section.title.as_deref() {
        Some(title) => format!("{}:{}", prefix, title),
        None => format!("{}:{}", prefix, section.kind),
    }
}

fn scan_text(section: &Section, found: &mut BTreeMap<String, MetricValue>) {
    for (metric, patterns) in METRICS.iter().zip(TEXT_PATTERNS.iter()) {
        if found.contains_key(metric.name) {
            continue;
        }
        let value = patterns.iter().find_map(|p| {
            p.captures(&section.content)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
        });
        if let Some(value) = value {
            found.insert(
                metric.name.to_string(),
                MetricValue {
                    value,
                    source: source_label("text", section),
                },
            );
        }
    }
}

/// Row indices of value columns. Header rows may be shorter than data rows when leading label
/// cells were empty, so columns are aligned from the right.
fn value_columns(header: &[String], row_len: usize) -> Vec<usize> {
    let offset = row_len.saturating_sub(header.len());
    let columns: Vec<usize> = header
        .iter()
        .enumerate()
        .filter(|(_, label)| PERIOD_HEADER.is_match(label))
        .map(|(i, _)| i + offset)
        .filter(|col| *col >= 1 && *col < row_len)
        .collect();
    if columns.is_empty() && row_len > 1 {
        vec![row_len - 1]
    } else {
        columns
    }
}

fn label_matches(cell: &str, metric: &MetricSpec) -> bool {
    let cell = cell.trim_start_matches(|c: char| !c.is_alphanumeric());
    if metric.row_excludes.iter().any(|x| cell.contains(x)) {
        return false;
    }
    let unqualified = LABEL_QUALIFIERS.iter().filter_map(|q| cell.strip_prefix(q));
    let candidates: Vec<&str> = std::iter::once(cell).chain(unqualified).collect();
    metric
        .row_labels
        .iter()
        .any(|label| candidates.iter().any(|c| c.starts_with(label)))
}

fn scan_table(section: &Section, found: &mut BTreeMap<String, MetricValue>) {
    let Some(rows) = section.table_data.as_ref() else {
        return;
    };
    let Some((header, data)) = rows.split_first() else {
        return;
    };

    for row in data {
        let Some(label) = row.first().map(|c| c.to_lowercase()) else {
            continue;
        };
        for metric in METRICS {
            if found.contains_key(metric.name) || !label_matches(&label, metric) {
                continue;
            }
            let value = value_columns(header, row.len())
                .into_iter()
                .filter_map(|col| row.get(col))
                .find(|cell| HAS_DIGIT.is_match(cell));
            if let Some(value) = value {
                found.insert(
                    metric.name.to_string(),
                    MetricValue {
                        value: value.trim().to_string(),
                        source: source_label("table", section),
                    },
                );
            }
        }
    }
}

pub fn extract_financial_metrics(sections: &[Section]) -> BTreeMap<String, MetricValue> {
    let mut found = BTreeMap::new();
    for section in flatten(sections) {
        if section.kind != SectionKind::Table {
            scan_text(section, &mut found);
        } else {
            scan_table(section, &mut found);
        }
        if found.len() == METRICS.len() {
            break;
        }
    }
    log::debug!("Extracted {} financial metrics", found.len());
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_first_revenue_mention_wins() {
        let sections = vec![
            Section::generic(Some("Overview".into()), "Total revenue was $1.2 billion for the year.", 2),
            Section::generic(Some("Segments".into()), "Total revenue was $900 million in the segment.", 2),
        ];
        let metrics = extract_financial_metrics(&sections);
        assert_eq!(metrics["revenue"].value, "$1.2 billion");
        assert_eq!(metrics["revenue"].source, "text:Overview");
    }

    #[test]
    fn test_text_patterns() {
        let sections = vec![Section::paragraph(
            "Net income was $150 million and diluted earnings per share was $2.50. \
             Cash and cash equivalents of $750,000 remained. Total assets were $5,000,000.",
        )];
        let metrics = extract_financial_metrics(&sections);
        assert_eq!(metrics["net_income"].value, "$150 million");
        assert_eq!(metrics["eps"].value, "$2.50");
        assert_eq!(metrics["cash_and_equivalents"].value, "$750,000");
        assert_eq!(metrics["total_assets"].value, "$5,000,000");
        assert!(!metrics.contains_key("total_liabilities"));
    }

    #[test]
    fn test_table_scan_uses_year_column() {
        let table = Section::table(
            Some("Consolidated Balance Sheets".into()),
            vec![
                row(&["", "Notes", "2023", "2022"]),
                row(&["Total assets", "4", "$5,000", "$4,100"]),
                row(&["Total liabilities", "5", "$3,000", "$2,900"]),
                row(&["Total liabilities and equity", "", "$5,000", "$4,100"]),
            ],
        );
        let metrics = extract_financial_metrics(&[table]);
        assert_eq!(metrics["total_assets"].value, "$5,000");
        assert_eq!(metrics["total_liabilities"].value, "$3,000");
        assert_eq!(metrics["total_assets"].source, "table:Consolidated Balance Sheets");
    }

    #[test]
    fn test_short_header_is_right_aligned() {
        let table = Section::table(
            None,
            vec![row(&["2023", "2022"]), row(&["Revenue", "$1,200", "$1,000"])],
        );
        let metrics = extract_financial_metrics(&[table]);
        assert_eq!(metrics["revenue"].value, "$1,200");
        assert_eq!(metrics["revenue"].source, "table:table");
    }

    #[test]
    fn test_falls_back_to_last_column() {
        let table = Section::table(
            Some("Summary".into()),
            vec![row(&["Item", "Amount"]), row(&["Net sales", "$42"])],
        );
        assert_eq!(extract_financial_metrics(&[table])["revenue"].value, "$42");
    }

    #[test]
    fn test_related_rows_do_not_match() {
        let table = Section::table(
            Some("Selected Data".into()),
            vec![
                row(&["", "2023"]),
                row(&["Deferred revenue", "$80"]),
                row(&["Cost of revenue", "$400"]),
                row(&["Net income per share, diluted", "$1.10"]),
                row(&["Total revenues", "$1,000"]),
                row(&["Net income", "$120"]),
                row(&["Diluted earnings per share", "$1.09"]),
            ],
        );
        let metrics = extract_financial_metrics(&[table]);
        assert_eq!(metrics["revenue"].value, "$1,000");
        assert_eq!(metrics["net_income"].value, "$120");
        assert_eq!(metrics["eps"].value, "$1.10");
    }

    #[test]
    fn test_text_before_table_in_same_order() {
        let sections = vec![
            Section::table(None, vec![row(&["", "2023"]), row(&["Revenue", "$10"])]),
            Section::paragraph("Total revenue was $99."),
        ];
        assert_eq!(extract_financial_metrics(&sections)["revenue"].value, "$10");
    }
}

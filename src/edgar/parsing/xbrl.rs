//! XBRL instance documents.
//!
//! Structure is explicit, so no heuristics are involved: `dei:` facts fill the tagged metadata,
//! non-dimensional numeric facts become one concept-by-period table, and a handful of us-gaap
//! concepts are reported as financial metrics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use unicode_normalization::UnicodeNormalization;

use super::types::{FilingMetadata, MetricValue, ParserOptions, Section, StructuredDocument};
use crate::core::{PipelineError, Result};

pub const ENTITY_SECTION_TITLE: &str = "Document and Entity Information";
pub const FACT_TABLE_TITLE: &str = "Financial Data";

/// Metric name and the us-gaap concepts that report it, in preference order.
const METRIC_CONCEPTS: &[(&str, &[&str])] = &[
    (
        "revenue",
        &[
            "Revenues",
            "RevenueFromContractWithCustomerExcludingAssessedTax",
            "SalesRevenueNet",
        ],
    ),
    ("net_income", &["NetIncomeLoss", "ProfitLoss"]),
    ("eps", &["EarningsPerShareBasic", "EarningsPerShareDiluted"]),
    ("total_assets", &["Assets"]),
    ("total_liabilities", &["Liabilities"]),
    (
        "cash_and_equivalents",
        &[
            "CashAndCashEquivalentsAtCarryingValue",
            "CashCashEquivalentsRestrictedCashAndRestrictedCashEquivalents",
        ],
    ),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub instant: Option<String>,
}

impl Period {
    /// Instant for point-in-time facts, end date for durations.
    pub fn end(&self) -> Option<&str> {
        self.instant.as_deref().or(self.end_date.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub axis: String,
    pub member: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    /// Prefixed concept name, e.g. `us-gaap:Revenues`.
    pub name: String,
    pub value: String,
    pub formatted_value: String,
    pub unit: Option<String>,
    pub context: String,
    pub period: Period,
    pub dimensions: Vec<Dimension>,
}

impl Fact {
    fn prefix(&self) -> &str {
        self.name.split_once(':').map_or("", |(p, _)| p)
    }

    fn local_name(&self) -> &str {
        self.name.split_once(':').map_or(self.name.as_str(), |(_, n)| n)
    }
}

pub fn extract_facts(content: &str) -> Result<Vec<Fact>> {
    let xml_tree = roxmltree::Document::parse(content)
        .map_err(|e| PipelineError::parse("xbrl", content.len(), e.to_string()))?;
    let root = xml_tree.root_element();

    let mut units: HashMap<&str, Vec<String>> = HashMap::new();
    for unit in root.children().filter(|n| n.has_tag_name("unit")) {
        let id = unit.attribute("id").unwrap_or("");
        for measure in unit.descendants().filter(|n| n.has_tag_name("measure")) {
            let value = measure.text().unwrap_or("").trim();
            let value = value.split_once(':').map_or(value, |(_, v)| v);
            units.entry(id).or_default().push(value.to_string());
        }
    }

    let mut periods: HashMap<&str, Period> = HashMap::new();
    let mut dimensions: HashMap<&str, Vec<Dimension>> = HashMap::new();
    for context in root.children().filter(|n| n.has_tag_name("context")) {
        let id = context.attribute("id").unwrap_or("");

        if let Some(period) = context.descendants().find(|n| n.has_tag_name("period")) {
            let mut parsed = Period::default();
            for child in period.children().filter(|n| n.is_element()) {
                let value = child.text().map(|t| t.trim().to_string());
                match child.tag_name().name() {
                    "instant" => parsed.instant = value,
                    "startDate" => parsed.start_date = value,
                    "endDate" => parsed.end_date = value,
                    _ => {}
                }
            }
            periods.insert(id, parsed);
        }

        for member in context.descendants().filter(|n| n.has_tag_name("explicitMember")) {
            if let Some(axis) = member.attribute("dimension") {
                dimensions.entry(id).or_default().push(Dimension {
                    axis: axis.to_string(),
                    member: member.text().unwrap_or("").trim().to_string(),
                });
            }
        }
    }

    let mut facts = Vec::new();
    for element in root
        .children()
        .filter(|n| n.is_element() && n.attribute("contextRef").is_some())
    {
        let tag = element.tag_name();
        let prefix = tag
            .namespace()
            .and_then(|ns| element.lookup_prefix(ns))
            .unwrap_or("");
        let context = element.attribute("contextRef").unwrap_or("");
        let value: String = element.text().unwrap_or("").trim().nfkc().collect();
        let fact_units = element
            .attribute("unitRef")
            .and_then(|u| units.get(u))
            .cloned()
            .unwrap_or_default();

        facts.push(Fact {
            name: if prefix.is_empty() {
                tag.name().to_string()
            } else {
                format!("{}:{}", prefix, tag.name())
            },
            formatted_value: format_fact_value(&value, &fact_units),
            value,
            unit: (!fact_units.is_empty()).then(|| fact_units.join("/")),
            context: context.to_string(),
            period: periods.get(context).cloned().unwrap_or_default(),
            dimensions: dimensions.get(context).cloned().unwrap_or_default(),
        });
    }

    log::debug!("Extracted {} XBRL facts", facts.len());
    Ok(facts)
}

fn group_thousands(digits: &str) -> String {
    let mut result = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }
    result
}

pub fn format_fact_value(value: &str, units: &[String]) -> String {
    let Ok(number) = value.parse::<f64>() else {
        return value.to_string();
    };
    let sign = if number < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", number.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let whole = group_thousands(whole);

    match units.first().map(String::as_str) {
        Some("USD") if units.len() == 1 => format!("{}${}.{}", sign, whole, fraction),
        Some(unit) if unit.contains("USD") => format!("{}${}.{}/{}", sign, whole, fraction, units[1..].join("/")),
        Some(unit) if unit.eq_ignore_ascii_case("shares") => format!("{}{} shares", sign, whole),
        Some(unit) => format!("{}{}.{} {}", sign, whole, fraction, unit),
        None => format!("{}{}.{}", sign, whole, fraction),
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

fn entity_metadata(facts: &[Fact]) -> FilingMetadata {
    let dei = |name: &str| {
        facts
            .iter()
            .find(|f| f.prefix() == "dei" && f.local_name() == name && !f.value.is_empty())
            .map(|f| f.value.clone())
    };

    FilingMetadata {
        filing_type: dei("DocumentType").unwrap_or_default(),
        company_name: dei("EntityRegistrantName"),
        filing_date: None,
        cik: dei("EntityCentralIndexKey"),
        fiscal_year: dei("DocumentFiscalYearFocus"),
        fiscal_period: dei("DocumentFiscalPeriodFocus"),
        period_of_report: dei("DocumentPeriodEndDate").as_deref().and_then(parse_date),
        financial_metrics: Default::default(),
    }
}

/// Latest non-dimensional value of the first concept that reports each metric.
pub fn metrics_from_facts(facts: &[Fact]) -> Vec<(String, MetricValue)> {
    let mut metrics = Vec::new();
    for (metric, concepts) in METRIC_CONCEPTS {
        let found = concepts.iter().find_map(|concept| {
            facts
                .iter()
                .filter(|f| f.prefix() == "us-gaap" && f.local_name() == *concept && f.dimensions.is_empty())
                .filter(|f| f.value.parse::<f64>().is_ok())
                .max_by(|a, b| a.period.end().cmp(&b.period.end()))
        });
        if let Some(fact) = found {
            metrics.push((
                metric.to_string(),
                MetricValue {
                    value: fact.formatted_value.clone(),
                    source: format!("xbrl:{}", fact.name),
                },
            ));
        }
    }
    metrics
}

fn entity_section(facts: &[Fact]) -> Option<Section> {
    let lines: Vec<String> = facts
        .iter()
        .filter(|f| f.prefix() == "dei" && !f.value.is_empty())
        .map(|f| format!("{}: {}", f.local_name(), f.value))
        .collect();
    (!lines.is_empty()).then(|| Section::generic(Some(ENTITY_SECTION_TITLE.to_string()), lines.join("\n"), 1))
}

/// Concept rows by period-end columns, newest period first.
fn fact_table(facts: &[Fact]) -> Option<Section> {
    let numeric: Vec<&Fact> = facts
        .iter()
        .filter(|f| f.prefix() != "dei" && f.unit.is_some() && f.dimensions.is_empty())
        .filter(|f| f.period.end().is_some())
        .collect();
    if numeric.is_empty() {
        return None;
    }

    let period_ends: BTreeSet<&str> = numeric.iter().filter_map(|f| f.period.end()).collect();
    let columns: Vec<&str> = period_ends.into_iter().rev().collect();

    let mut concepts: Vec<&str> = Vec::new();
    for fact in &numeric {
        if !concepts.contains(&fact.name.as_str()) {
            concepts.push(&fact.name);
        }
    }

    let mut rows = Vec::with_capacity(concepts.len() + 1);
    let mut header = vec!["Concept".to_string()];
    header.extend(columns.iter().map(|c| c.to_string()));
    rows.push(header);
    for concept in concepts {
        let mut row = vec![concept.to_string()];
        for column in &columns {
            let value = numeric
                .iter()
                .find(|f| f.name == concept && f.period.end() == Some(*column))
                .map(|f| f.formatted_value.clone())
                .unwrap_or_default();
            row.push(value);
        }
        rows.push(row);
    }
    Some(Section::table(Some(FACT_TABLE_TITLE.to_string()), rows))
}

pub fn parse(content: &str, options: &ParserOptions) -> Result<StructuredDocument> {
    let facts = extract_facts(content)?;
    if facts.is_empty() {
        return Err(PipelineError::parse("xbrl", content.len(), "instance contains no facts"));
    }

    let mut sections = Vec::new();
    sections.extend(entity_section(&facts));
    if options.extract_tables {
        sections.extend(fact_table(&facts));
    }
    for section in &mut sections {
        section.truncate_content(options.max_section_length);
    }

    let mut tagged = entity_metadata(&facts);
    tagged.financial_metrics.extend(metrics_from_facts(&facts));

    let mut document = StructuredDocument::from_sections(sections);
    if document.title.is_none() {
        document.title = tagged
            .company_name
            .as_ref()
            .map(|name| format!("{} {}", name, tagged.filing_type).trim().to_string());
    }
    document.tagged = tagged;
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::parsing::tests::read_test_file;
    use crate::edgar::parsing::types::SectionKind;

    #[test]
    fn test_extract_facts() {
        let content = read_test_file("acme-20231231.xml");
        let facts = extract_facts(&content).unwrap();

        let revenue: Vec<_> = facts
            .iter()
            .filter(|f| f.name == "us-gaap:Revenues" && f.dimensions.is_empty())
            .collect();
        assert_eq!(revenue.len(), 2);
        assert_eq!(revenue[0].unit.as_deref(), Some("USD"));
        assert_eq!(revenue[0].period.end(), Some("2023-12-31"));

        let segment = facts
            .iter()
            .find(|f| !f.dimensions.is_empty())
            .expect("dimensional fact");
        assert_eq!(segment.dimensions[0].axis, "srt:ProductOrServiceAxis");
    }

    #[test]
    fn test_parse_builds_metadata_and_metrics() {
        let content = read_test_file("acme-20231231.xml");
        let doc = parse(&content, &ParserOptions::default()).unwrap();

        assert_eq!(doc.tagged.company_name.as_deref(), Some("Acme Industries Inc."));
        assert_eq!(doc.tagged.cik.as_deref(), Some("0000123456"));
        assert_eq!(doc.tagged.filing_type, "10-K");
        assert_eq!(doc.tagged.fiscal_year.as_deref(), Some("2023"));
        assert_eq!(doc.tagged.period_of_report, NaiveDate::from_ymd_opt(2023, 12, 31));

        let revenue = &doc.tagged.financial_metrics["revenue"];
        assert_eq!(revenue.value, "$1,200,000.00");
        assert_eq!(revenue.source, "xbrl:us-gaap:Revenues");
        assert_eq!(doc.tagged.financial_metrics["eps"].value, "$2.50/shares");

        assert_eq!(doc.sections[0].title.as_deref(), Some(ENTITY_SECTION_TITLE));
        let table = &doc.sections[1];
        assert_eq!(table.kind, SectionKind::Table);
        let rows = table.table_data.as_ref().unwrap();
        assert_eq!(rows[0], vec!["Concept", "2023-12-31", "2022-12-31"]);
        assert_eq!(rows[1], vec!["us-gaap:Revenues", "$1,200,000.00", "$1,000,000.00"]);
    }

    #[test]
    fn test_format_fact_value() {
        assert_eq!(format_fact_value("1234567", &["USD".to_string()]), "$1,234,567.00");
        assert_eq!(format_fact_value("-50", &["USD".to_string()]), "-$50.00");
        assert_eq!(format_fact_value("1000", &["shares".to_string()]), "1,000 shares");
        assert_eq!(format_fact_value("n/a", &[]), "n/a");
    }

    #[test]
    fn test_malformed_instance_is_parse_error() {
        let err = parse("<xbrl><unclosed></xbrl>", &ParserOptions::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Parse { .. }));
    }
}

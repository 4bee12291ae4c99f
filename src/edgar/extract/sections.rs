//! Important-section extraction.
//!
//! Type-specific rules run first, then the registry's section names for the type, then the
//! cross-type standard names and `Item N` headings. A key that is already present is never
//! replaced, so earlier rules and earlier sections in document order win.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::edgar::filing_types::{current, insider};
use crate::edgar::parsing::types::{flatten, render_text, Section, SectionKind};
use crate::edgar::registry;
use crate::edgar::report::FilingCategory;

/// Section titles looked for in every filing type.
pub const STANDARD_SECTIONS: &[&str] = &[
    "Management's Discussion and Analysis",
    "Risk Factors",
    "Financial Statements",
    "Business",
    "Legal Proceedings",
    "Properties",
    "Controls and Procedures",
    "Quantitative and Qualitative Disclosures About Market Risk",
    "Executive Compensation",
];

/// Key and title keywords for the primary financial statements.
const STATEMENT_TABLES: &[(&str, &[&str])] = &[
    (
        "Balance Sheet",
        &["balance sheet", "statement of financial position", "statements of financial position", "financial condition"],
    ),
    (
        "Income Statement",
        &[
            "statements of operations",
            "statement of operations",
            "income statement",
            "statements of income",
            "statement of income",
            "statements of earnings",
            "statement of earnings",
        ],
    ),
    ("Cash Flow Statement", &["cash flows", "cash flow"]),
    (
        "Stockholders Equity",
        &[
            "stockholders' equity",
            "shareholders' equity",
            "stockholders equity",
            "shareholders equity",
            "changes in equity",
        ],
    ),
];

pub const AUDITOR_REPORT: &str = "Auditor's Report";
const AUDITOR_KEYWORDS: &[&str] = &[
    "report of independent registered public accounting firm",
    "independent auditor",
    "auditor's report",
    "auditors' report",
];

const REPORTING_OWNER_KEYWORD: &str = "reporting owner";

static ITEM_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*item\s+(\d{1,2}[a-c]?(?:\.\d{1,2})?)\b").expect("static pattern")
});

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Content of a section; headings that only carry children fall back to the rendered children.
fn section_text(section: &Section) -> String {
    if !section.content.trim().is_empty() {
        section.content.clone()
    } else {
        render_text(&section.children)
    }
}

fn insert_first(found: &mut BTreeMap<String, String>, key: &str, value: String) {
    if value.trim().is_empty() {
        return;
    }
    found.entry(key.to_string()).or_insert(value);
}

/// `Item 1A`, `Item 8.01`: the item number as written, upper-cased.
pub fn item_key(title: &str) -> Option<String> {
    ITEM_TITLE
        .captures(title)
        .map(|caps| format!("Item {}", caps[1].to_uppercase()))
}

fn titled<'a, 'b>(flat: &'b [&'a Section]) -> impl Iterator<Item = (&'a Section, &'a str)> + 'b {
    flat.iter()
        .copied()
        .filter(|s| s.kind != SectionKind::Title)
        .filter_map(|s: &'a Section| s.title.as_deref().map(|t| (s, t)))
}

fn statement_tables(flat: &[&Section], found: &mut BTreeMap<String, String>) {
    for (section, title) in titled(flat).filter(|(s, _)| s.kind == SectionKind::Table) {
        for (key, keywords) in STATEMENT_TABLES {
            if keywords.iter().any(|k| contains_ignore_case(title, k)) {
                insert_first(found, key, section.content.clone());
            }
        }
    }
}

fn auditor_report(flat: &[&Section], found: &mut BTreeMap<String, String>) {
    if let Some((section, _)) = titled(flat)
        .filter(|(s, _)| s.kind != SectionKind::Table)
        .find(|(_, title)| AUDITOR_KEYWORDS.iter().any(|k| contains_ignore_case(title, k)))
    {
        insert_first(found, AUDITOR_REPORT, section_text(section));
    }
}

fn canonical_items(flat: &[&Section], found: &mut BTreeMap<String, String>) {
    for (number, _) in current::CANONICAL_ITEMS {
        let key = format!("Item {}", number);
        if let Some((section, _)) = titled(flat).find(|(_, title)| item_key(title).as_deref() == Some(key.as_str())) {
            insert_first(found, &key, section_text(section));
        }
    }
}

fn insider_sections(flat: &[&Section], found: &mut BTreeMap<String, String>) {
    let tables: Vec<&&Section> = flat.iter().filter(|s| s.kind == SectionKind::Table).collect();
    if let Some(table) = tables.first() {
        insert_first(found, insider::NON_DERIVATIVE_TABLE, table.content.clone());
    }
    if let Some(table) = tables.get(1) {
        insert_first(found, insider::DERIVATIVE_TABLE, table.content.clone());
    }

    let by_title = titled(flat)
        .find(|(_, title)| contains_ignore_case(title, REPORTING_OWNER_KEYWORD))
        .map(|(s, title)| {
            let text = section_text(s);
            if text.trim().is_empty() {
                title.to_string()
            } else {
                text
            }
        });
    let owner = by_title.or_else(|| {
        flat.iter()
            .filter(|s| s.kind != SectionKind::Table)
            .find(|s| contains_ignore_case(&s.content, REPORTING_OWNER_KEYWORD))
            .map(|s| s.content.clone())
    });
    if let Some(owner) = owner {
        insert_first(found, insider::REPORTING_OWNER, owner);
    }
}

pub fn extract_important_sections(sections: &[Section], filing_type: &str) -> BTreeMap<String, String> {
    let flat: Vec<&Section> = flatten(sections).collect();
    let mut found = BTreeMap::new();

    match registry::category_of(filing_type) {
        FilingCategory::AnnualReport => {
            statement_tables(&flat, &mut found);
            auditor_report(&flat, &mut found);
        }
        FilingCategory::QuarterlyReport => statement_tables(&flat, &mut found),
        FilingCategory::CurrentReport => canonical_items(&flat, &mut found),
        FilingCategory::InsiderTransaction => insider_sections(&flat, &mut found),
        FilingCategory::ProxyStatement | FilingCategory::Other => {}
    }

    for name in registry::get_important_sections(filing_type) {
        if let Some((section, _)) = titled(&flat)
            .filter(|(s, _)| s.kind != SectionKind::Table)
            .find(|(_, title)| contains_ignore_case(title, &name))
        {
            insert_first(&mut found, &name, section_text(section));
        }
    }

    for (section, title) in titled(&flat).filter(|(s, _)| s.kind != SectionKind::Table) {
        for name in STANDARD_SECTIONS {
            if contains_ignore_case(title, name) {
                insert_first(&mut found, name, section_text(section));
            }
        }
        if let Some(key) = item_key(title) {
            insert_first(&mut found, &key, section_text(section));
        }
    }

    log::debug!("Found {} important sections for {}", found.len(), filing_type);
    found
}

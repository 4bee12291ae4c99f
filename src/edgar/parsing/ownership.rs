//! Insider ownership documents (`<ownershipDocument>` XML filed for Forms 3, 4 and 5).

use chrono::NaiveDate;
use roxmltree::Node;

use super::types::{FilingMetadata, ParserOptions, Section, StructuredDocument};
use crate::core::{PipelineError, Result};

pub const REPORTING_OWNER_TITLE: &str = "Reporting Owner";
pub const NON_DERIVATIVE_TITLE: &str = "Table I - Non-Derivative Securities";
pub const DERIVATIVE_TITLE: &str = "Table II - Derivative Securities";
pub const FOOTNOTES_TITLE: &str = "Explanation of Responses";

const NON_DERIVATIVE_HEADER: &[&str] = &[
    "Title of Security",
    "Transaction Date",
    "Transaction Code",
    "Amount",
    "Price",
    "(A) or (D)",
    "Owned Following Transaction",
    "Ownership Form",
];

const DERIVATIVE_HEADER: &[&str] = &[
    "Title of Security",
    "Conversion or Exercise Price",
    "Transaction Date",
    "Transaction Code",
    "Amount",
    "Price",
    "(A) or (D)",
    "Date Exercisable",
    "Expiration Date",
    "Underlying Security",
    "Underlying Shares",
    "Owned Following Transaction",
    "Ownership Form",
];

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

/// Text at the end of a child path, trimmed; empty strings are treated as absent.
fn text_at(node: Node, path: &[&str]) -> Option<String> {
    let mut current = node;
    for name in path {
        current = child(current, name)?;
    }
    current
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
}

/// Ownership values are wrapped in `<value>` and may carry footnote references instead.
fn value_at(node: Node, path: &[&str]) -> String {
    let mut full: Vec<&str> = path.to_vec();
    full.push("value");
    text_at(node, &full).unwrap_or_default()
}

fn is_flag_set(node: Node, name: &str) -> bool {
    text_at(node, &[name]).is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

fn reporting_owner_section(owner: Node) -> Section {
    let mut lines = Vec::new();
    if let Some(name) = text_at(owner, &["reportingOwnerId", "rptOwnerName"]) {
        lines.push(format!("Name: {}", name));
    }
    if let Some(cik) = text_at(owner, &["reportingOwnerId", "rptOwnerCik"]) {
        lines.push(format!("CIK: {}", cik));
    }

    if let Some(relationship) = child(owner, "reportingOwnerRelationship") {
        let mut roles = Vec::new();
        if is_flag_set(relationship, "isDirector") {
            roles.push("Director".to_string());
        }
        if is_flag_set(relationship, "isOfficer") {
            match text_at(relationship, &["officerTitle"]) {
                Some(title) => roles.push(format!("Officer ({})", title)),
                None => roles.push("Officer".to_string()),
            }
        }
        if is_flag_set(relationship, "isTenPercentOwner") {
            roles.push("10% Owner".to_string());
        }
        if is_flag_set(relationship, "isOther") {
            match text_at(relationship, &["otherText"]) {
                Some(text) => roles.push(format!("Other ({})", text)),
                None => roles.push("Other".to_string()),
            }
        }
        if !roles.is_empty() {
            lines.push(format!("Relationship: {}", roles.join(", ")));
        }
    }

    if let Some(address) = child(owner, "reportingOwnerAddress") {
        let parts: Vec<String> = ["rptOwnerStreet1", "rptOwnerStreet2", "rptOwnerCity", "rptOwnerState", "rptOwnerZipCode"]
            .iter()
            .filter_map(|field| text_at(address, &[field]))
            .collect();
        if !parts.is_empty() {
            lines.push(format!("Address: {}", parts.join(", ")));
        }
    }

    Section::generic(Some(REPORTING_OWNER_TITLE.to_string()), lines.join("\n"), 1)
}

fn header_row(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

fn non_derivative_row(entry: Node) -> Vec<String> {
    vec![
        value_at(entry, &["securityTitle"]),
        value_at(entry, &["transactionDate"]),
        text_at(entry, &["transactionCoding", "transactionCode"]).unwrap_or_default(),
        value_at(entry, &["transactionAmounts", "transactionShares"]),
        value_at(entry, &["transactionAmounts", "transactionPricePerShare"]),
        value_at(entry, &["transactionAmounts", "transactionAcquiredDisposedCode"]),
        value_at(entry, &["postTransactionAmounts", "sharesOwnedFollowingTransaction"]),
        value_at(entry, &["ownershipNature", "directOrIndirectOwnership"]),
    ]
}

fn derivative_row(entry: Node) -> Vec<String> {
    vec![
        value_at(entry, &["securityTitle"]),
        value_at(entry, &["conversionOrExercisePrice"]),
        value_at(entry, &["transactionDate"]),
        text_at(entry, &["transactionCoding", "transactionCode"]).unwrap_or_default(),
        value_at(entry, &["transactionAmounts", "transactionShares"]),
        value_at(entry, &["transactionAmounts", "transactionPricePerShare"]),
        value_at(entry, &["transactionAmounts", "transactionAcquiredDisposedCode"]),
        value_at(entry, &["exerciseDate"]),
        value_at(entry, &["expirationDate"]),
        value_at(entry, &["underlyingSecurity", "underlyingSecurityTitle"]),
        value_at(entry, &["underlyingSecurity", "underlyingSecurityShares"]),
        value_at(entry, &["postTransactionAmounts", "sharesOwnedFollowingTransaction"]),
        value_at(entry, &["ownershipNature", "directOrIndirectOwnership"]),
    ]
}

/// Transactions and holdings of one table; the header row is always present.
fn security_table(
    root: Node,
    table_tag: &str,
    title: &str,
    header: &[&str],
    row: fn(Node) -> Vec<String>,
) -> Section {
    let mut rows = vec![header_row(header)];
    if let Some(table) = child(root, table_tag) {
        rows.extend(table.children().filter(|n| n.is_element()).map(row));
    }
    Section::table(Some(title.to_string()), rows)
}

pub fn parse(content: &str, options: &ParserOptions) -> Result<StructuredDocument> {
    let xml = roxmltree::Document::parse(content)
        .map_err(|e| PipelineError::parse("ownership-xml", content.len(), e.to_string()))?;
    let root = xml.root_element();
    if !root.has_tag_name(super::detect::OWNERSHIP_ROOT) {
        return Err(PipelineError::parse(
            "ownership-xml",
            content.len(),
            format!("unexpected root element <{}>", root.tag_name().name()),
        ));
    }

    let document_type = text_at(root, &["documentType"]).unwrap_or_else(|| "4".to_string());
    let issuer_name = text_at(root, &["issuer", "issuerName"]);
    let symbol = text_at(root, &["issuer", "issuerTradingSymbol"]);

    let title = match (&issuer_name, &symbol) {
        (Some(name), Some(symbol)) => format!("Form {}: {} ({})", document_type, name, symbol),
        (Some(name), None) => format!("Form {}: {}", document_type, name),
        _ => format!("Form {}", document_type),
    };

    let mut sections = vec![Section::title(title)];
    sections.extend(
        root.children()
            .filter(|n| n.has_tag_name("reportingOwner"))
            .map(reporting_owner_section),
    );
    if options.extract_tables {
        sections.push(security_table(
            root,
            "nonDerivativeTable",
            NON_DERIVATIVE_TITLE,
            NON_DERIVATIVE_HEADER,
            non_derivative_row,
        ));
        sections.push(security_table(
            root,
            "derivativeTable",
            DERIVATIVE_TITLE,
            DERIVATIVE_HEADER,
            derivative_row,
        ));
    }

    let footnotes: Vec<String> = child(root, "footnotes")
        .map(|f| {
            f.children()
                .filter(|n| n.has_tag_name("footnote"))
                .filter_map(|n| {
                    let text = n.text()?.trim();
                    let id = n.attribute("id").unwrap_or("");
                    (!text.is_empty()).then(|| format!("({}) {}", id, text))
                })
                .collect()
        })
        .unwrap_or_default();
    if !footnotes.is_empty() {
        sections.push(Section::generic(Some(FOOTNOTES_TITLE.to_string()), footnotes.join("\n"), 1));
    }
    if let Some(remarks) = text_at(root, &["remarks"]) {
        sections.push(Section::generic(Some("Remarks".to_string()), remarks, 1));
    }

    for section in &mut sections {
        section.truncate_content(options.max_section_length);
    }

    let mut document = StructuredDocument::from_sections(sections);
    document.tagged = FilingMetadata {
        filing_type: document_type,
        company_name: issuer_name,
        cik: text_at(root, &["issuer", "issuerCik"]),
        period_of_report: text_at(root, &["periodOfReport"])
            .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        ..FilingMetadata::default()
    };
    log::debug!(
        "Ownership document parsed: {} sections for {:?}",
        document.sections.len(),
        document.tagged.company_name
    );
    Ok(document)
}

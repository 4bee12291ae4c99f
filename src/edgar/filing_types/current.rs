use super::register_with_aliases;
use crate::edgar::registry::{FilingTypeConfig, FilingTypeRegistry};
use crate::edgar::report::FilingCategory;

pub const ID: &str = "8-K";
pub const ALIASES: &[&str] = &["8K", "Form8K"];

pub const DETECTION_PATTERNS: &[&str] = &[
    r"(?i)\bform\s+8-k\b",
    r"(?i)current\s+report\s+pursuant\s+to\s+section\s+13\s+or\s+15\s*\(d\)",
    r"(?i)date\s+of\s+report\s*\(\s*date\s+of\s+earliest\s+event\s+reported\s*\)",
];

/// Item numbers pulled, in this order, when present in a current report.
pub const CANONICAL_ITEMS: &[(&str, &str)] = &[
    ("1.01", "Entry into a Material Definitive Agreement"),
    ("1.02", "Termination of a Material Definitive Agreement"),
    ("2.01", "Completion of Acquisition or Disposition of Assets"),
    ("2.02", "Results of Operations and Financial Condition"),
    ("2.03", "Creation of a Direct Financial Obligation"),
    ("2.05", "Costs Associated with Exit or Disposal Activities"),
    ("3.01", "Notice of Delisting or Failure to Satisfy a Continued Listing Rule"),
    ("4.01", "Changes in Registrant's Certifying Accountant"),
    ("5.02", "Departure of Directors or Certain Officers"),
    ("5.07", "Submission of Matters to a Vote of Security Holders"),
    ("7.01", "Regulation FD Disclosure"),
    ("8.01", "Other Events"),
    ("9.01", "Financial Statements and Exhibits"),
];

pub fn config() -> FilingTypeConfig {
    let names: Vec<String> = CANONICAL_ITEMS
        .iter()
        .map(|(number, _)| format!("Item {}", number))
        .collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();

    FilingTypeConfig::new(
        ID,
        FilingCategory::CurrentReport,
        "Current report of material events or corporate changes",
    )
    .with_sections(&names)
}

pub fn register(registry: &mut FilingTypeRegistry) {
    register_with_aliases(registry, ID, ALIASES, config());
}

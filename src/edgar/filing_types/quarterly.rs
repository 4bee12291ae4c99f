use super::register_with_aliases;
use crate::edgar::registry::{FilingTypeConfig, FilingTypeRegistry};
use crate::edgar::report::FilingCategory;

pub const ID: &str = "10-Q";
pub const ALIASES: &[&str] = &["10Q", "Form10Q"];

pub const DETECTION_PATTERNS: &[&str] = &[
    r"(?i)\bform\s+10-q\b",
    r"(?i)quarterly\s+report\s+pursuant\s+to\s+section\s+13\s+or\s+15\s*\(d\)",
    r"(?i)for\s+the\s+quarterly\s+period\s+ended",
];

pub const IMPORTANT_SECTIONS: &[&str] = &[
    "Financial Statements",
    "Management's Discussion and Analysis",
    "Quantitative and Qualitative Disclosures About Market Risk",
    "Controls and Procedures",
    "Legal Proceedings",
    "Risk Factors",
];

pub fn config() -> FilingTypeConfig {
    FilingTypeConfig::new(
        ID,
        FilingCategory::QuarterlyReport,
        "Quarterly report with unaudited financial statements",
    )
    .with_sections(IMPORTANT_SECTIONS)
}

pub fn register(registry: &mut FilingTypeRegistry) {
    register_with_aliases(registry, ID, ALIASES, config());
}

use super::register_with_aliases;
use crate::edgar::registry::{FilingTypeConfig, FilingTypeRegistry};
use crate::edgar::report::FilingCategory;

pub const ID: &str = "10-K";
pub const ALIASES: &[&str] = &["10K", "Form10K"];

pub const DETECTION_PATTERNS: &[&str] = &[
    r"(?i)\bform\s+10-k\b",
    r"(?i)annual\s+report\s+pursuant\s+to\s+section\s+13\s+or\s+15\s*\(d\)",
    r"(?i)for\s+the\s+fiscal\s+year\s+ended",
];

pub const IMPORTANT_SECTIONS: &[&str] = &[
    "Business",
    "Risk Factors",
    "Properties",
    "Legal Proceedings",
    "Management's Discussion and Analysis",
    "Quantitative and Qualitative Disclosures About Market Risk",
    "Financial Statements and Supplementary Data",
    "Controls and Procedures",
];

pub fn config() -> FilingTypeConfig {
    FilingTypeConfig::new(
        ID,
        FilingCategory::AnnualReport,
        "Annual report with audited financial statements",
    )
    .with_sections(IMPORTANT_SECTIONS)
}

pub fn register(registry: &mut FilingTypeRegistry) {
    register_with_aliases(registry, ID, ALIASES, config());
}

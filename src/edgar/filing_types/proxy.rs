use super::register_with_aliases;
use crate::edgar::parsing::types::ParserOptionOverrides;
use crate::edgar::registry::{FilingTypeConfig, FilingTypeRegistry};
use crate::edgar::report::FilingCategory;

pub const ID: &str = "DEF 14A";
pub const ALIASES: &[&str] = &["DEF14A", "FormDEF14A"];

pub const DETECTION_PATTERNS: &[&str] = &[
    r"(?i)\bschedule\s+14a\b",
    r"(?i)definitive\s+proxy\s+statement",
    r"(?i)notice\s+of\s+(?:the\s+)?annual\s+meeting\s+of\s+(?:stockholders|shareholders)",
];

pub const IMPORTANT_SECTIONS: &[&str] = &[
    "Executive Compensation",
    "Compensation Discussion and Analysis",
    "Security Ownership of Certain Beneficial Owners",
    "Corporate Governance",
    "Election of Directors",
    "Proposal",
];

pub fn config() -> FilingTypeConfig {
    FilingTypeConfig::new(
        ID,
        FilingCategory::ProxyStatement,
        "Definitive proxy statement for a shareholder meeting",
    )
    .with_sections(IMPORTANT_SECTIONS)
    .with_overrides(ParserOptionOverrides {
        extract_lists: Some(true),
        ..Default::default()
    })
}

pub fn register(registry: &mut FilingTypeRegistry) {
    register_with_aliases(registry, ID, ALIASES, config());
}

use super::register_with_aliases;
use crate::core::Result;
use crate::edgar::parser;
use crate::edgar::parsing::decode::decode_bytes;
use crate::edgar::parsing::detect::{sniff_root_tag, OWNERSHIP_ROOT};
use crate::edgar::parsing::ownership;
use crate::edgar::parsing::types::{ParsedFiling, ParserOptionOverrides, ParserOptions};
use crate::edgar::registry::{FilingTypeConfig, FilingTypeRegistry};
use crate::edgar::report::FilingCategory;

pub const ID: &str = "4";
pub const ALIASES: &[&str] = &["Form4"];

pub const DETECTION_PATTERNS: &[&str] = &[
    r"(?i)statement\s+of\s+changes\s+in\s+beneficial\s+ownership",
    r"(?i)\bform\s+4\b",
    r"(?i)<ownershipDocument>",
];

pub const NON_DERIVATIVE_TABLE: &str = "Non-Derivative Securities";
pub const DERIVATIVE_TABLE: &str = "Derivative Securities";
pub const REPORTING_OWNER: &str = "Reporting Owner";

pub fn config() -> FilingTypeConfig {
    FilingTypeConfig::new(
        ID,
        FilingCategory::InsiderTransaction,
        "Statement of changes in beneficial ownership by an insider",
    )
    .with_sections(&[NON_DERIVATIVE_TABLE, DERIVATIVE_TABLE, REPORTING_OWNER])
    .with_overrides(ParserOptionOverrides {
        extract_tables: Some(true),
        remove_boilerplate: Some(false),
        ..Default::default()
    })
    .with_custom_parser(parse_insider_filing)
}

/// Ownership XML goes through the dedicated parser; anything else takes the generic path.
fn parse_insider_filing(bytes: &[u8], options: &ParserOptions) -> Result<ParsedFiling> {
    if sniff_root_tag(bytes).as_deref() == Some(OWNERSHIP_ROOT) {
        let document = ownership::parse(&decode_bytes(bytes), options)?;
        return Ok(parser::build_filing(ID, document, options));
    }
    parser::parse_generic(bytes, ID, options)
}

pub fn register(registry: &mut FilingTypeRegistry) {
    register_with_aliases(registry, ID, ALIASES, config());
}

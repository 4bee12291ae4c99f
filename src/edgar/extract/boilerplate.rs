use once_cell::sync::Lazy;
use regex::Regex;

use crate::edgar::parsing::types::{Section, SectionKind};

/// Characters from the start of a section that are checked for boilerplate phrases.
pub const BOILERPLATE_SCAN_CHARS: usize = 500;

const BOILERPLATE_PATTERNS: &[&str] = &[
    r"(?i)forward[-\s]looking\s+statements?",
    r"(?i)safe[-\s]harbor",
    r"(?i)private\s+securities\s+litigation\s+reform\s+act",
    r"(?i)(?:this|the)\s+(?:report|document|release)\s+(?:contains|includes)\s+(?:certain\s+)?statements\s+that",
    r"(?i)pursuant\s+to\s+the\s+requirements\s+of\s+the\s+securities\s+exchange\s+act\s+of\s+1934,\s+the\s+registrant\s+has\s+duly\s+caused",
    r"(?i)actual\s+results\s+(?:may|could)\s+differ\s+materially",
];

static PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    BOILERPLATE_PATTERNS
        .iter()
        .map(|p| Regex::new(p).expect("boilerplate patterns are static"))
        .collect()
});

pub fn is_boilerplate(content: &str) -> bool {
    let head: String = content.chars().take(BOILERPLATE_SCAN_CHARS).collect();
    PATTERNS.iter().any(|p| p.is_match(&head))
}

/// Returns a copy with boilerplate `GenericSection`s flagged. Nothing is removed and existing
/// flags are never cleared, so the function is idempotent.
pub fn remove_boilerplate(sections: &[Section]) -> Vec<Section> {
    sections.iter().map(flag_section).collect()
}

fn flag_section(section: &Section) -> Section {
    let mut flagged = section.clone();
    if section.kind == SectionKind::GenericSection && is_boilerplate(&section.content) {
        flagged.is_boilerplate = true;
    }
    flagged.children = remove_boilerplate(&section.children);
    flagged
}

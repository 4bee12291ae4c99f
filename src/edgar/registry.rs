//! Process-wide catalog of supported filing types.
//!
//! The registry is built once (see [`initialize`]) and only read afterwards. Re-registering an
//! identifier replaces its configuration but keeps its original registration position, which is
//! how aliases are added.

use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use super::filing_types;
use super::parsing::types::{ParsedFiling, ParserOptionOverrides, ParserOptions};
use super::report::FilingCategory;
use crate::core::Result;

pub type CustomParserFn = fn(&[u8], &ParserOptions) -> Result<ParsedFiling>;

/// How documents of a filing type are turned into a `ParsedFiling`.
#[derive(Clone, Copy)]
pub enum ParserStrategy {
    Generic,
    Custom(CustomParserFn),
}

impl fmt::Debug for ParserStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParserStrategy::Generic => write!(f, "Generic"),
            ParserStrategy::Custom(_) => write!(f, "Custom(fn)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilingTypeConfig {
    pub filing_type_id: String,
    pub category: FilingCategory,
    pub important_section_names: Vec<String>,
    pub parser_option_overrides: ParserOptionOverrides,
    pub description: String,
    pub parser: ParserStrategy,
}

impl FilingTypeConfig {
    pub fn new(filing_type_id: &str, category: FilingCategory, description: &str) -> Self {
        Self {
            filing_type_id: filing_type_id.to_string(),
            category,
            important_section_names: Vec::new(),
            parser_option_overrides: ParserOptionOverrides::default(),
            description: description.to_string(),
            parser: ParserStrategy::Generic,
        }
    }

    /// Adds section names in order, skipping duplicates.
    pub fn with_sections(mut self, names: &[&str]) -> Self {
        for name in names {
            if !self.important_section_names.iter().any(|n| n == name) {
                self.important_section_names.push(name.to_string());
            }
        }
        self
    }

    pub fn with_overrides(mut self, overrides: ParserOptionOverrides) -> Self {
        self.parser_option_overrides = overrides;
        self
    }

    pub fn with_custom_parser(mut self, parser: CustomParserFn) -> Self {
        self.parser = ParserStrategy::Custom(parser);
        self
    }
}

#[derive(Debug, Default)]
pub struct FilingTypeRegistry {
    entries: HashMap<String, Arc<FilingTypeConfig>>,
    order: Vec<String>,
}

impl FilingTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with every built-in filing type.
    pub fn with_builtin_types() -> Self {
        let mut registry = Self::new();
        filing_types::register_all(&mut registry);
        registry
    }

    pub fn register(&mut self, id: &str, config: FilingTypeConfig) {
        if self.entries.insert(id.to_string(), Arc::new(config)).is_some() {
            log::debug!("Filing type {} re-registered; previous config replaced", id);
        } else {
            self.order.push(id.to_string());
        }
    }

    pub fn is_supported(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get_section_config(&self, id: &str) -> Option<Arc<FilingTypeConfig>> {
        self.entries.get(id).cloned()
    }

    pub fn get_important_sections(&self, id: &str) -> Vec<String> {
        self.entries
            .get(id)
            .map(|c| c.important_section_names.clone())
            .unwrap_or_default()
    }

    /// Registered identifiers in registration order.
    pub fn get_all_types(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn get_filing_type_descriptions(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(id, config)| (id.clone(), config.description.clone()))
            .collect()
    }
}

static REGISTRY: Lazy<RwLock<FilingTypeRegistry>> =
    Lazy::new(|| RwLock::new(FilingTypeRegistry::with_builtin_types()));

pub fn initialize() {
    Lazy::force(&REGISTRY);
}

fn with_registry<T>(f: impl FnOnce(&FilingTypeRegistry) -> T) -> T {
    let guard = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
    f(&guard)
}

pub fn register(id: &str, config: FilingTypeConfig) {
    let mut guard = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    guard.register(id, config);
}

pub fn is_supported(id: &str) -> bool {
    with_registry(|r| r.is_supported(id))
}

pub fn get_section_config(id: &str) -> Option<Arc<FilingTypeConfig>> {
    with_registry(|r| r.get_section_config(id))
}

pub fn get_important_sections(id: &str) -> Vec<String> {
    with_registry(|r| r.get_important_sections(id))
}

pub fn get_all_types() -> Vec<String> {
    with_registry(|r| r.get_all_types())
}

pub fn get_filing_type_descriptions() -> BTreeMap<String, String> {
    with_registry(|r| r.get_filing_type_descriptions())
}

/// Category of a registered type; unregistered identifiers fall back to parsing the id itself.
pub fn category_of(id: &str) -> FilingCategory {
    get_section_config(id)
        .map(|c| c.category)
        .unwrap_or_else(|| id.parse().unwrap_or(FilingCategory::Other))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_registered_type_is_supported() {
        initialize();
        let types = get_all_types();
        assert!(!types.is_empty());
        for id in types {
            assert!(is_supported(&id), "{} should be supported", id);
            assert!(get_section_config(&id).is_some(), "{} should have a config", id);
        }
    }

    #[test]
    fn test_aliases_share_config() {
        let registry = FilingTypeRegistry::with_builtin_types();
        let form4 = registry.get_section_config("4").unwrap();
        let alias = registry.get_section_config("Form4").unwrap();
        assert_eq!(form4.filing_type_id, alias.filing_type_id);
        assert_eq!(alias.category, FilingCategory::InsiderTransaction);
    }

    #[test]
    fn test_unsupported_lookups_are_empty() {
        let registry = FilingTypeRegistry::with_builtin_types();
        assert!(!registry.is_supported("S-1"));
        assert!(registry.get_section_config("S-1").is_none());
        assert!(registry.get_important_sections("S-1").is_empty());
    }

    #[test]
    fn test_reregister_overwrites_and_keeps_position() {
        let mut registry = FilingTypeRegistry::new();
        registry.register("A", FilingTypeConfig::new("A", FilingCategory::Other, "first"));
        registry.register("B", FilingTypeConfig::new("B", FilingCategory::Other, "b"));
        registry.register("A", FilingTypeConfig::new("A", FilingCategory::Other, "second"));

        assert_eq!(registry.get_all_types(), vec!["A".to_string(), "B".to_string()]);
        assert_eq!(registry.get_filing_type_descriptions()["A"], "second");
    }

    #[test]
    fn test_with_sections_deduplicates_in_order() {
        let config = FilingTypeConfig::new("X", FilingCategory::Other, "x")
            .with_sections(&["Risk Factors", "Business", "Risk Factors"]);
        assert_eq!(config.important_section_names, vec!["Risk Factors", "Business"]);
    }

    #[test]
    fn test_category_of_unregistered_id() {
        assert_eq!(category_of("10-K/A"), FilingCategory::AnnualReport);
        assert_eq!(category_of("S-1"), FilingCategory::Other);
    }
}

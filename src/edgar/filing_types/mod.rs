//! Built-in filing type definitions.
//!
//! Each module owns its identifier, aliases, detection patterns and section names, and
//! registers itself through `register`. Order here is the detection tie-break order.

pub mod annual;
pub mod current;
pub mod insider;
pub mod proxy;
pub mod quarterly;

use super::registry::FilingTypeRegistry;

pub fn register_all(registry: &mut FilingTypeRegistry) {
    annual::register(registry);
    quarterly::register(registry);
    current::register(registry);
    insider::register(registry);
    proxy::register(registry);
}

/// `(filing type id, detection patterns)` in registration order.
pub fn detection_table() -> Vec<(&'static str, &'static [&'static str])> {
    vec![
        (annual::ID, annual::DETECTION_PATTERNS),
        (quarterly::ID, quarterly::DETECTION_PATTERNS),
        (current::ID, current::DETECTION_PATTERNS),
        (insider::ID, insider::DETECTION_PATTERNS),
        (proxy::ID, proxy::DETECTION_PATTERNS),
    ]
}

fn register_with_aliases(
    registry: &mut FilingTypeRegistry,
    id: &str,
    aliases: &[&str],
    config: super::registry::FilingTypeConfig,
) {
    registry.register(id, config.clone());
    for alias in aliases {
        registry.register(alias, config.clone());
    }
}

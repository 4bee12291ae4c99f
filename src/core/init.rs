use crate::edgar::registry;

/// Registers every built-in filing type in a fixed order. Safe to call more than once;
/// only the first call builds the registry.
pub fn initialize_filing_types() {
    registry::initialize();
    log::debug!(
        "Filing type registry ready with {} identifiers",
        registry::get_all_types().len()
    );
}

/// Logger plus registry bootstrap for binaries.
pub fn initialize() {
    let _ = env_logger::try_init();
    initialize_filing_types();
}

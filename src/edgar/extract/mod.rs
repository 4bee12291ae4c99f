//! Content extraction over a parsed section tree.

pub mod boilerplate;
pub mod metadata;
pub mod metrics;
pub mod sections;

pub use boilerplate::{is_boilerplate, remove_boilerplate};
pub use metadata::extract_metadata;
pub use metrics::extract_financial_metrics;
pub use sections::extract_important_sections;

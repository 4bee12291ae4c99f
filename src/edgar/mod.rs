pub mod extract;
pub mod filing_types;
pub mod parser;
pub mod parsing;
pub mod registry;
pub mod report;

pub use parser::{create_parser, parse_auto, FilingParser};
pub use registry::{FilingTypeConfig, ParserStrategy};
pub use report::FilingCategory;

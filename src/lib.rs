pub mod batch;
pub mod chunker;
pub mod core;
pub mod edgar;
pub mod utils;

// Re-exports
pub use crate::chunker::{chunk, chunk_text, reconstruct, Chunk, ChunkOptions, ChunkResult, ReconstructOptions};
pub use crate::core::init::{self, initialize_filing_types};
pub use crate::core::{PipelineError, Result};
pub use crate::edgar::parser::{build_filing, create_parser, parse_auto, FilingParser};
pub use crate::edgar::parsing::types::{FilingMetadata, MetricValue, ParsedFiling, ParserOptions, Section, SectionKind};
pub use crate::utils::progress::ProgressTracker;

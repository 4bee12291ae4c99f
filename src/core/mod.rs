pub mod config;
pub mod error;
pub mod init;

pub use error::{PipelineError, Result};

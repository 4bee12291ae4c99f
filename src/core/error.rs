use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("unsupported filing type: {id}")]
    UnsupportedFilingType { id: String },

    #[error("cannot determine document type: {reason}")]
    DetectionFailed { reason: String },

    #[error("failed to parse {format} document ({byte_len} bytes): {detail}")]
    Parse {
        format: String,
        byte_len: usize,
        detail: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn parse(format: impl ToString, byte_len: usize, detail: impl ToString) -> Self {
        PipelineError::Parse {
            format: format.to_string(),
            byte_len,
            detail: detail.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

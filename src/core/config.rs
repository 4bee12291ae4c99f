use anyhow::{anyhow, Result};
use std::str::FromStr;

use crate::chunker::ChunkOptions;
use crate::edgar::parsing::types::ParserOptions;

/// Bytes inspected by the type detector when no explicit sample is given.
pub const DEFAULT_DETECTION_SAMPLE_BYTES: usize = 5_000;
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub max_section_length: usize,
    pub max_chunk_size: usize,
    pub min_chunk_size: usize,
    pub chunk_overlap: usize,
    pub detection_sample_bytes: usize,
    pub max_concurrent: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let parser = ParserOptions::default();
        let chunks = ChunkOptions::default();
        Self {
            max_section_length: parser.max_section_length,
            max_chunk_size: chunks.max_chunk_size,
            min_chunk_size: chunks.min_chunk_size,
            chunk_overlap: chunks.chunk_overlap,
            detection_sample_bytes: DEFAULT_DETECTION_SAMPLE_BYTES,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            max_section_length: env_or("FILING_MAX_SECTION_LENGTH", defaults.max_section_length)?,
            max_chunk_size: env_or("FILING_MAX_CHUNK_SIZE", defaults.max_chunk_size)?,
            min_chunk_size: env_or("FILING_MIN_CHUNK_SIZE", defaults.min_chunk_size)?,
            chunk_overlap: env_or("FILING_CHUNK_OVERLAP", defaults.chunk_overlap)?,
            detection_sample_bytes: env_or(
                "FILING_DETECTION_SAMPLE_BYTES",
                defaults.detection_sample_bytes,
            )?,
            max_concurrent: env_or("FILING_MAX_CONCURRENT", defaults.max_concurrent)?,
        };

        if config.max_chunk_size <= config.chunk_overlap {
            return Err(anyhow!(
                "FILING_MAX_CHUNK_SIZE ({}) must be greater than FILING_CHUNK_OVERLAP ({})",
                config.max_chunk_size,
                config.chunk_overlap
            ));
        }
        if config.max_concurrent == 0 {
            return Err(anyhow!("FILING_MAX_CONCURRENT must be at least 1"));
        }

        log::debug!("Loaded pipeline config: {:?}", config);
        Ok(config)
    }

    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            max_section_length: self.max_section_length,
            ..ParserOptions::default()
        }
    }

    pub fn chunk_options(&self) -> ChunkOptions {
        ChunkOptions {
            max_chunk_size: self.max_chunk_size,
            min_chunk_size: self.min_chunk_size,
            chunk_overlap: self.chunk_overlap,
            ..ChunkOptions::default()
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{} has an invalid value {:?}: {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_component_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_section_length, 100_000);
        assert_eq!(config.parser_options().max_section_length, 100_000);
        assert_eq!(config.chunk_options().max_chunk_size, config.max_chunk_size);
        assert!(config.max_chunk_size > config.chunk_overlap);
    }

    #[test]
    fn test_env_or_parses_and_rejects() {
        std::env::set_var("FILING_TEST_ENV_OR_OK", " 42 ");
        assert_eq!(env_or::<usize>("FILING_TEST_ENV_OR_OK", 1).unwrap(), 42);

        std::env::set_var("FILING_TEST_ENV_OR_BAD", "lots");
        assert!(env_or::<usize>("FILING_TEST_ENV_OR_BAD", 1).is_err());

        assert_eq!(env_or::<usize>("FILING_TEST_ENV_OR_MISSING", 7).unwrap(), 7);
    }
}

//! Bounded-concurrency parsing of many documents.
//!
//! Each document is parsed on the blocking pool. A failure, a panic or a cancellation only
//! affects the document it happened to; the batch always returns one result per input, in
//! input order.

use anyhow::{Context, Result};
use futures::future::join_all;
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::core::config::{DEFAULT_DETECTION_SAMPLE_BYTES, DEFAULT_MAX_CONCURRENT};
use crate::edgar::parser::{create_parser, parse_auto_with_sample};
use crate::edgar::parsing::types::{ParsedFiling, ParserOptions};
use crate::utils::progress::ProgressTracker;

#[derive(Debug, Clone)]
pub struct BatchItem {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl BatchItem {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        Ok(Self::new(path.display().to_string(), bytes))
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub max_concurrent: usize,
    pub parser_options: ParserOptions,
    /// Parse every document as this type instead of detecting it.
    pub filing_type: Option<String>,
    pub detection_sample_bytes: usize,
    /// Checked before each document starts; documents already running finish.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            parser_options: ParserOptions::default(),
            filing_type: None,
            detection_sample_bytes: DEFAULT_DETECTION_SAMPLE_BYTES,
            cancel: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    Parsed { filing: Box<ParsedFiling> },
    Failed { error: String },
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentResult {
    pub name: String,
    #[serde(flatten)]
    pub outcome: DocumentOutcome,
}

impl DocumentResult {
    pub fn filing(&self) -> Option<&ParsedFiling> {
        match &self.outcome {
            DocumentOutcome::Parsed { filing } => Some(filing.as_ref()),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, DocumentOutcome::Failed { .. })
    }
}

fn parse_one(item: &BatchItem, options: &BatchOptions) -> DocumentOutcome {
    let parsed = match options.filing_type.as_deref() {
        Some(filing_type) => create_parser(filing_type, &options.parser_options)
            .and_then(|parser| parser.parse(&item.bytes)),
        None => parse_auto_with_sample(
            &item.bytes,
            &options.parser_options,
            options.detection_sample_bytes,
        ),
    };
    match parsed {
        Ok(filing) => DocumentOutcome::Parsed {
            filing: Box::new(filing),
        },
        Err(e) => {
            log::warn!("Failed to parse {}: {}", item.name, e);
            DocumentOutcome::Failed {
                error: e.to_string(),
            }
        }
    }
}

fn is_cancelled(cancel: &Option<Arc<AtomicBool>>) -> bool {
    cancel.as_ref().is_some_and(|flag| flag.load(Ordering::SeqCst))
}

pub async fn process_batch(
    items: Vec<BatchItem>,
    options: BatchOptions,
    progress: &ProgressTracker,
) -> Vec<DocumentResult> {
    let semaphore = Arc::new(Semaphore::new(options.max_concurrent.max(1)));
    let options = Arc::new(options);
    progress.start(items.len() as u64);
    log::info!(
        "Processing {} documents with up to {} in parallel",
        items.len(),
        options.max_concurrent
    );

    let tasks = items.into_iter().map(|item| {
        let semaphore = Arc::clone(&semaphore);
        let options = Arc::clone(&options);
        let progress = progress.clone();
        async move {
            let name = item.name.clone();
            let outcome = match semaphore.acquire_owned().await {
                Err(e) => DocumentOutcome::Failed {
                    error: format!("worker pool closed: {}", e),
                },
                Ok(_permit) if is_cancelled(&options.cancel) => {
                    log::debug!("Skipping {} after cancellation", name);
                    DocumentOutcome::Cancelled
                }
                Ok(_permit) => {
                    let worker_options = Arc::clone(&options);
                    match tokio::task::spawn_blocking(move || parse_one(&item, &worker_options)).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            log::error!("Worker for {} stopped abnormally: {}", name, e);
                            DocumentOutcome::Failed {
                                error: format!("worker stopped abnormally: {}", e),
                            }
                        }
                    }
                }
            };
            progress.document_done(&name);
            DocumentResult { name, outcome }
        }
    });

    let results = join_all(tasks).await;
    progress.finish();

    let failed = results.iter().filter(|r| r.is_failed()).count();
    log::info!("Batch finished: {} documents, {} failed", results.len(), failed);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANNUAL: &str = "<html><head><title>Acme Form 10-K</title></head><body>\
        <h2>Risk Factors</h2><p>Competition is intense.</p></body></html>";

    fn items() -> Vec<BatchItem> {
        vec![
            BatchItem::new("annual.htm", ANNUAL.as_bytes().to_vec()),
            BatchItem::new("broken.pdf", b"%PDF-1.4 not really a pdf".to_vec()),
            BatchItem::new("unknown.txt", b"nothing recognisable".to_vec()),
        ]
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let results = process_batch(items(), BatchOptions::default(), &ProgressTracker::silent()).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].name, "annual.htm");
        let filing = results[0].filing().unwrap();
        assert_eq!(filing.filing_type, "10-K");
        assert_eq!(filing.important_sections["Risk Factors"], "Competition is intense.");
        assert!(results[1].is_failed());
        assert!(results[2].is_failed());
    }

    #[tokio::test]
    async fn test_cancelled_batch_skips_documents() {
        let options = BatchOptions {
            cancel: Some(Arc::new(AtomicBool::new(true))),
            ..BatchOptions::default()
        };
        let results = process_batch(items(), options, &ProgressTracker::silent()).await;
        assert!(results
            .iter()
            .all(|r| matches!(r.outcome, DocumentOutcome::Cancelled)));
    }

    #[tokio::test]
    async fn test_forced_filing_type() {
        let options = BatchOptions {
            filing_type: Some("8-K".to_string()),
            max_concurrent: 1,
            ..BatchOptions::default()
        };
        let results = process_batch(
            vec![BatchItem::new("a.htm", ANNUAL.as_bytes().to_vec())],
            options,
            &ProgressTracker::silent(),
        )
        .await;
        assert_eq!(results[0].filing().unwrap().filing_type, "8-K");

        let options = BatchOptions {
            filing_type: Some("S-1".to_string()),
            ..BatchOptions::default()
        };
        let results = process_batch(
            vec![BatchItem::new("a.htm", ANNUAL.as_bytes().to_vec())],
            options,
            &ProgressTracker::silent(),
        )
        .await;
        match &results[0].outcome {
            DocumentOutcome::Failed { error } => assert!(error.contains("unsupported filing type")),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, ANNUAL.as_bytes()).unwrap();
        let item = BatchItem::from_path(file.path()).unwrap();
        assert_eq!(item.bytes, ANNUAL.as_bytes());
        assert!(BatchItem::from_path(Path::new("/definitely/missing/file")).is_err());
    }
}

use anyhow::{anyhow, Context, Result};
use colored::*;
use filing_pipeline::{
    batch::{self, BatchItem, BatchOptions, DocumentOutcome},
    chunker::{self, ChunkOptions},
    core::{config::PipelineConfig, init},
    edgar::{
        parser,
        parsing::{self, decode_bytes, detect},
        registry, FilingCategory,
    },
    ProgressTracker,
};
use indicatif::MultiProgress;
use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(name = "filing-cli", about = "Parse and chunk regulatory filings")]
enum Command {
    /// Show the detected container format and filing type
    Detect {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
    },
    /// Parse a filing and print it as JSON
    Parse {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
        /// Filing type to parse as; detected when omitted
        #[structopt(short = "t", long)]
        filing_type: Option<String>,
        /// Leave out sections and full text
        #[structopt(long)]
        summary: bool,
    },
    /// Parse a filing and print its chunks as JSON
    Chunk {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
        #[structopt(short = "t", long)]
        filing_type: Option<String>,
        #[structopt(long)]
        max_chunk_size: Option<usize>,
        #[structopt(long)]
        chunk_overlap: Option<usize>,
        /// Chunk the full text by size instead of by section
        #[structopt(long)]
        by_size: bool,
    },
    /// List registered filing types
    Types,
    /// Parse many files concurrently
    Batch {
        #[structopt(parse(from_os_str), required = true)]
        inputs: Vec<PathBuf>,
        #[structopt(short = "t", long)]
        filing_type: Option<String>,
        #[structopt(short = "j", long)]
        jobs: Option<usize>,
    },
}

fn parse_file(input: &Path, filing_type: Option<&str>, config: &PipelineConfig) -> Result<filing_pipeline::ParsedFiling> {
    let bytes = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let options = config.parser_options();
    let filing = match filing_type {
        Some(filing_type) => parser::create_parser(filing_type, &options)?.parse(&bytes)?,
        None => parser::parse_auto_with_sample(&bytes, &options, config.detection_sample_bytes)?,
    };
    Ok(filing)
}

fn detect_command(input: &Path, config: &PipelineConfig) -> Result<()> {
    let bytes = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let format = detect::detect_format(&bytes);
    println!("{} {}", "Format:".green(), format);

    let text = match format {
        parsing::DocumentFormat::Pdf => parsing::parse_as(format, &bytes, &config.parser_options())
            .map(|doc| doc.text)
            .unwrap_or_default(),
        _ => decode_bytes(&bytes),
    };
    let sample: String = text.chars().take(config.detection_sample_bytes).collect();
    match detect::detect_filing_type(&sample) {
        Some(filing_type) => println!("{} {}", "Filing type:".green(), filing_type.bold()),
        None => println!("{} {}", "Filing type:".green(), "unknown".yellow()),
    }
    if let Some(title) = detect::extract_title(&sample) {
        println!("{} {}", "Title:".green(), title);
    }
    Ok(())
}

fn types_command() {
    println!("{} {}", "Categories:".green(), FilingCategory::list_types());
    let descriptions = registry::get_filing_type_descriptions();
    for id in registry::get_all_types() {
        let description = descriptions.get(&id).map(String::as_str).unwrap_or("");
        println!("{:<12} {}", id.bold(), description);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init::initialize();
    log::debug!("Logger initialized");

    let config = PipelineConfig::from_env()?;

    match Command::from_args() {
        Command::Detect { input } => detect_command(&input, &config)?,
        Command::Parse {
            input,
            filing_type,
            summary,
        } => {
            let mut filing = parse_file(&input, filing_type.as_deref(), &config)?;
            if summary {
                filing.sections.clear();
                filing.full_text = None;
            }
            println!("{}", serde_json::to_string_pretty(&filing)?);
        }
        Command::Chunk {
            input,
            filing_type,
            max_chunk_size,
            chunk_overlap,
            by_size,
        } => {
            let filing = parse_file(&input, filing_type.as_deref(), &config)?;
            let defaults = config.chunk_options();
            let options = ChunkOptions {
                max_chunk_size: max_chunk_size.unwrap_or(defaults.max_chunk_size),
                chunk_overlap: chunk_overlap.unwrap_or(defaults.chunk_overlap),
                ..defaults
            };
            let result = if by_size {
                let text = filing
                    .full_text
                    .as_deref()
                    .ok_or_else(|| anyhow!("{} has no text to chunk", input.display()))?;
                chunker::chunk_text(text, &options)?
            } else {
                chunker::chunk(&filing, &options)?
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Types => types_command(),
        Command::Batch {
            inputs,
            filing_type,
            jobs,
        } => {
            let cancel = Arc::new(AtomicBool::new(false));
            let flag = cancel.clone();
            ctrlc::set_handler(move || {
                eprintln!("\n{}", "Received Ctrl+C, finishing running documents".yellow());
                flag.store(true, Ordering::SeqCst);
            })?;

            let items = inputs
                .iter()
                .map(|path| BatchItem::from_path(path.as_path()))
                .collect::<Result<Vec<_>>>()?;
            let options = BatchOptions {
                max_concurrent: jobs.unwrap_or(config.max_concurrent),
                parser_options: config.parser_options(),
                filing_type,
                detection_sample_bytes: config.detection_sample_bytes,
                cancel: Some(cancel),
            };

            let multi_progress = Arc::new(MultiProgress::new());
            let progress = ProgressTracker::new(Some(&multi_progress), "Parsing filings");
            let results = batch::process_batch(items, options, &progress).await;

            for result in &results {
                match &result.outcome {
                    DocumentOutcome::Parsed { filing } => println!(
                        "{} {} ({}, {} sections, {} important)",
                        "ok".green(),
                        result.name,
                        filing.filing_type,
                        filing.sections.len(),
                        filing.important_sections.len()
                    ),
                    DocumentOutcome::Failed { error } => {
                        println!("{} {}: {}", "failed".red(), result.name, error)
                    }
                    DocumentOutcome::Cancelled => println!("{} {}", "skipped".yellow(), result.name),
                }
            }
        }
    }

    Ok(())
}

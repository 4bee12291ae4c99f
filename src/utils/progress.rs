use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

const RUNNING_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";
const DONE_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} {msg}";

/// Progress over a batch of documents. A tracker created without a `MultiProgress` is silent.
#[derive(Clone)]
pub struct ProgressTracker {
    progress_bar: Option<ProgressBar>,
    label: String,
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

impl ProgressTracker {
    pub fn new(multi_progress: Option<&Arc<MultiProgress>>, label: &str) -> Self {
        let progress_bar = multi_progress.map(|mp| {
            let pb = mp.add(ProgressBar::new(0));
            pb.set_style(style(RUNNING_TEMPLATE));
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        Self {
            progress_bar,
            label: label.to_string(),
        }
    }

    pub fn silent() -> Self {
        Self::new(None, "")
    }

    pub fn start(&self, total: u64) {
        if let Some(pb) = &self.progress_bar {
            pb.reset();
            pb.set_length(total);
            pb.set_message(self.label.clone());
        }
    }

    /// Marks one document as done and shows its name.
    pub fn document_done(&self, name: &str) {
        if let Some(pb) = &self.progress_bar {
            pb.set_message(format!("{} - {}", self.label, name));
            pb.inc(1);
        }
    }

    pub fn finish(&self) {
        if let Some(pb) = &self.progress_bar {
            pb.set_style(style(DONE_TEMPLATE));
            pb.finish_with_message(format!("Complete [{}]", self.label));
        }
    }
}

//! Console progress output for batch runs.

use std::path::Path;
use std::sync::Mutex;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use docflow_core::extract::{CustomReport, SegmentReport};
use docflow_core::{BatchObserver, BatchSummary, DocumentOutcome, JobHandle, JobResult, JobStatus, SkipReason};

/// Prints per-file progress and a spinner while jobs are polled.
#[derive(Default)]
pub struct ConsoleReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_spinner(&self, f: impl FnOnce(&mut Option<ProgressBar>)) {
        let mut guard = self.spinner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut *guard);
    }
}

fn format_confidence(confidence: Option<f64>) -> String {
    confidence
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Closing lines of a batch run: success count and result file location.
fn summary_lines(summary: &BatchSummary) -> Vec<String> {
    let mut lines = vec![
        format!(
            "{} Batch processing completed: {}/{} files processed successfully",
            style("✓").green(),
            style(summary.processed).green(),
            summary.total
        ),
        format!("   Results saved to: {}", summary.result_file.display()),
    ];
    if summary.recorded == 0 {
        lines.push("   No records were extracted, so the file was not created".to_string());
    }
    lines
}

fn print_custom(custom: &CustomReport) {
    println!();
    println!("  {}", style("- Custom output").bold());
    println!(
        "  Matched blueprint: {}  Confidence: {}",
        custom.blueprint_name,
        format_confidence(custom.blueprint_confidence)
    );
    println!(
        "  Document class: {}",
        custom.document_class.as_deref().unwrap_or("-")
    );

    if custom.matched {
        println!();
        println!("  {}", style("- Fields").bold());
        for reading in &custom.readings {
            println!(
                "  {}: {}  Confidence: {}",
                reading.field,
                reading.display_value(),
                format_confidence(reading.confidence)
            );
        }
    }
}

impl BatchObserver for ConsoleReporter {
    fn on_batch_start(&self, batch: &str, total: usize, result_file: &Path) {
        println!(
            "{} Starting batch processing for '{}' with {} files",
            style("ℹ").blue(),
            batch,
            total
        );
        println!("   Results will be saved to: {}", result_file.display());
    }

    fn on_document_start(&self, index: usize, total: usize, filename: &str) {
        println!();
        println!("Processing file {}/{}: {}", index, total, style(filename).bold());
    }

    fn on_uploaded(&self, _filename: &str, key: &str) {
        println!("  Uploaded to S3: {}", key);
    }

    fn on_job_submitted(&self, filename: &str, _handle: &JobHandle) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("  {spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Invoking Bedrock Data Automation for '{}'", filename));
        self.with_spinner(|spinner| *spinner = Some(pb));
    }

    fn on_poll(&self, filename: &str, status: &JobStatus) {
        self.with_spinner(|spinner| {
            if let Some(pb) = spinner {
                pb.set_message(format!("Waiting for '{}' ({})", filename, status));
                pb.tick();
            }
        });
    }

    fn on_job_finished(&self, _filename: &str, result: &JobResult) {
        self.with_spinner(|spinner| {
            if let Some(pb) = spinner.take() {
                pb.finish_and_clear();
            }
        });

        match result {
            JobResult::Success { .. } => println!("  Job status: {}", style("Success").green()),
            JobResult::Failed(status) => println!("  Job status: {}", style(status).red()),
        }
    }

    fn on_segment(&self, _filename: &str, segment: &SegmentReport) {
        println!();
        println!("  Asset ID: {}", segment.asset_id);
        println!("  {}", style("- Standard output").bold());
        println!(
            "  Semantic modality: {}",
            segment.semantic_modality.as_deref().unwrap_or("-")
        );
        if let Some(custom) = &segment.custom {
            print_custom(custom);
        }
    }

    fn on_document_finished(&self, filename: &str, outcome: &DocumentOutcome) {
        self.with_spinner(|spinner| {
            if let Some(pb) = spinner.take() {
                pb.finish_and_clear();
            }
        });

        match outcome {
            DocumentOutcome::Recorded(_) => {
                println!("{} Recorded {}", style("✓").green(), filename);
            }
            DocumentOutcome::Skipped(SkipReason::JobStatus(status)) => {
                println!("{} Failed to process {}: {}", style("✗").red(), filename, status);
            }
            DocumentOutcome::Skipped(SkipReason::NoMatch) => {
                println!(
                    "{} {}: no segment matched the blueprint, nothing recorded",
                    style("ℹ").blue(),
                    filename
                );
            }
            DocumentOutcome::Skipped(SkipReason::Error(message)) => {
                println!("{} Error processing {}: {}", style("✗").red(), filename, message);
            }
        }
    }

    fn on_batch_finished(&self, summary: &BatchSummary) {
        println!();
        for line in summary_lines(summary) {
            println!("{}", line);
        }
    }
}

//! Batch orchestration: upload, submit, poll, and extract every document
//! in a batch folder, one at a time.

mod result_file;

pub use result_file::ResultFile;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tracing::{info, warn};

use crate::error::Result;
use crate::extract::{FieldSpec, ResultExtractor, SegmentReport};
use crate::job::{
    IdentityProvider, JobClient, JobHandle, JobRequest, JobResult, JobService, JobStatus, PollSettings,
};
use crate::logging::PayloadLog;
use crate::models::config::DocflowConfig;
use crate::models::record::{DocumentOutcome, ResultRecord, SkipReason};
use crate::storage::BlobStore;

/// Progress callbacks for a batch run. Every method defaults to a no-op.
pub trait BatchObserver {
    fn on_batch_start(&self, _batch: &str, _total: usize, _result_file: &Path) {}
    fn on_document_start(&self, _index: usize, _total: usize, _filename: &str) {}
    fn on_uploaded(&self, _filename: &str, _key: &str) {}
    fn on_job_submitted(&self, _filename: &str, _handle: &JobHandle) {}
    /// Called once per non-terminal status check.
    fn on_poll(&self, _filename: &str, _status: &JobStatus) {}
    fn on_job_finished(&self, _filename: &str, _result: &JobResult) {}
    /// Called as each output segment is read, before the next is fetched.
    fn on_segment(&self, _filename: &str, _segment: &SegmentReport) {}
    fn on_document_finished(&self, _filename: &str, _outcome: &DocumentOutcome) {}
    fn on_batch_finished(&self, _summary: &BatchSummary) {}
}

/// Observer that ignores every event.
impl BatchObserver for () {}

/// How a batch run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// The batch folder does not exist.
    MissingFolder(PathBuf),
    /// The folder holds no matching documents; no result file was created.
    NoDocuments(PathBuf),
    /// Every document was attempted.
    Completed(BatchSummary),
}

/// Totals for a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub batch: String,
    pub total: usize,
    /// Documents whose job succeeded, with or without a matching blueprint.
    pub processed: usize,
    /// Records appended to the result file.
    pub recorded: usize,
    pub result_file: PathBuf,
    /// Outcome per document, in processing order.
    pub outcomes: Vec<(String, DocumentOutcome)>,
}

/// Drives every document of a batch through the extraction pipeline.
pub struct BatchOrchestrator {
    config: DocflowConfig,
    store: Arc<dyn BlobStore>,
    jobs: JobClient,
    identity: Arc<dyn IdentityProvider>,
    extractor: ResultExtractor,
    specs: Vec<FieldSpec>,
}

impl BatchOrchestrator {
    /// Wire an orchestrator from its collaborators.
    ///
    /// Fails if a configured field spec is malformed.
    pub fn new(
        config: DocflowConfig,
        store: Arc<dyn BlobStore>,
        jobs: Arc<dyn JobService>,
        identity: Arc<dyn IdentityProvider>,
        payloads: Arc<dyn PayloadLog>,
    ) -> Result<Self> {
        let specs = FieldSpec::parse_all(config.blueprint.fields.as_slice())?;
        let jobs = JobClient::new(jobs, PollSettings::from_config(&config), Arc::clone(&payloads));
        let extractor = ResultExtractor::new(Arc::clone(&store), payloads);

        Ok(Self {
            config,
            store,
            jobs,
            identity,
            extractor,
            specs,
        })
    }

    /// Process the batch folder `<input_root>/<batch_name>`.
    ///
    /// A failure on one document is recorded as a skip and the run moves on.
    /// Only failures before the first document (listing the folder,
    /// resolving the account) abort the run.
    pub async fn run(&self, batch_name: &str, observer: &dyn BatchObserver) -> Result<BatchOutcome> {
        let dir = self.config.batch_dir(batch_name);
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "Batch folder does not exist");
            return Ok(BatchOutcome::MissingFolder(dir));
        }

        let files = list_documents(&dir, &self.config.batch.extensions)?;
        if files.is_empty() {
            info!(dir = %dir.display(), "No documents to process");
            return Ok(BatchOutcome::NoDocuments(dir));
        }

        let total = files.len();
        let result_file = ResultFile::for_run(&dir, &Local::now());
        observer.on_batch_start(batch_name, total, result_file.path());
        info!(batch = %batch_name, total, result_file = %result_file.path().display(), "Starting batch");

        let account_id = self.identity.account_id().await?;

        let mut summary = BatchSummary {
            batch: batch_name.to_string(),
            total,
            processed: 0,
            recorded: 0,
            result_file: result_file.path().to_path_buf(),
            outcomes: Vec::with_capacity(total),
        };

        for (index, filename) in files.into_iter().enumerate() {
            observer.on_document_start(index + 1, total, &filename);

            let outcome = match self
                .process_document(batch_name, &dir, &filename, &account_id, &result_file, observer)
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => DocumentOutcome::Skipped(SkipReason::Error(e.to_string())),
            };

            match &outcome {
                DocumentOutcome::Recorded(_) => summary.recorded += 1,
                DocumentOutcome::Skipped(reason) => warn!(file = %filename, "Skipped: {}", reason),
            }
            if outcome.is_processed() {
                summary.processed += 1;
            }

            observer.on_document_finished(&filename, &outcome);
            summary.outcomes.push((filename, outcome));
        }

        info!(
            batch = %batch_name,
            processed = summary.processed,
            recorded = summary.recorded,
            total,
            "Batch finished"
        );
        observer.on_batch_finished(&summary);
        Ok(BatchOutcome::Completed(summary))
    }

    async fn process_document(
        &self,
        batch_name: &str,
        dir: &Path,
        filename: &str,
        account_id: &str,
        result_file: &ResultFile,
        observer: &dyn BatchObserver,
    ) -> Result<DocumentOutcome> {
        let key = self.config.input_key(batch_name, filename);
        self.store
            .upload(&dir.join(filename), &self.config.aws.bucket, &key)
            .await?;
        observer.on_uploaded(filename, &key);

        let request = JobRequest::for_document(&self.config, account_id, self.config.object_uri(&key));
        let handle = self.jobs.submit(&request).await?;
        observer.on_job_submitted(filename, &handle);

        let result = self
            .jobs
            .await_completion(&handle, |status| observer.on_poll(filename, status))
            .await?;
        observer.on_job_finished(filename, &result);

        let output_uri = match result {
            JobResult::Success { output_uri } => output_uri,
            JobResult::Failed(status) => return Ok(DocumentOutcome::Skipped(SkipReason::JobStatus(status))),
        };

        let extraction = self
            .extractor
            .extract_with(
                &output_uri,
                filename,
                &self.config.blueprint.name,
                &self.specs,
                |segment| observer.on_segment(filename, segment),
            )
            .await?;

        if !extraction.has_fields() {
            return Ok(DocumentOutcome::Skipped(SkipReason::NoMatch));
        }

        let record = ResultRecord::from_fields(filename, &extraction.fields);
        result_file.append(&record).await?;
        Ok(DocumentOutcome::Recorded(record))
    }
}

/// Regular files directly in `dir` whose extension matches, case-insensitively,
/// in directory-listing order.
pub fn list_documents(dir: &Path, extensions: &[String]) -> Result<Vec<String>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }

        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
            .unwrap_or(false);
        if !matches {
            continue;
        }

        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => files.push(name.to_string()),
            None => warn!(path = %path.display(), "Skipping file with non UTF-8 name"),
        }
    }

    Ok(files)
}

//! Job client: submission and status polling for extraction jobs.

#[cfg(feature = "aws")]
mod bedrock;

#[cfg(feature = "aws")]
pub use bedrock::{BedrockJobService, StsIdentity, load_sdk_config};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{DocflowError, Result};
use crate::logging::PayloadLog;
use crate::models::config::DocflowConfig;

/// Status of an extraction job as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Created,
    InProgress,
    Success,
    ServiceError,
    ClientError,
    /// Any other terminal status the service reports.
    Other(String),
}

impl JobStatus {
    /// Parse a status string as returned by the service.
    pub fn parse(status: &str) -> Self {
        match status {
            "Created" => JobStatus::Created,
            "InProgress" => JobStatus::InProgress,
            "Success" => JobStatus::Success,
            "ServiceError" => JobStatus::ServiceError,
            "ClientError" => JobStatus::ClientError,
            other => JobStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Created => "Created",
            JobStatus::InProgress => "InProgress",
            JobStatus::Success => "Success",
            JobStatus::ServiceError => "ServiceError",
            JobStatus::ClientError => "ClientError",
            JobStatus::Other(other) => other,
        }
    }

    /// Whether the job may still change state.
    pub fn is_pending(&self) -> bool {
        matches!(self, JobStatus::Created | JobStatus::InProgress)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque invocation handle returned on submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle(pub String);

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything needed to start one extraction job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub input_uri: String,
    pub output_uri: String,
    pub project_arn: String,
    pub profile_arn: String,
}

impl JobRequest {
    /// Request for one uploaded document under the configured project.
    pub fn for_document(config: &DocflowConfig, account_id: &str, input_uri: impl Into<String>) -> Self {
        Self {
            input_uri: input_uri.into(),
            output_uri: config.output_uri(),
            project_arn: config.project_arn(account_id),
            profile_arn: config.profile_arn(account_id),
        }
    }
}

/// A single status query response.
#[derive(Debug, Clone, PartialEq)]
pub struct JobStatusReport {
    pub status: JobStatus,
    /// Job metadata location, set once the job has succeeded.
    pub output_uri: Option<String>,
}

/// Terminal state of a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobResult {
    /// Output metadata is available at the URI.
    Success { output_uri: String },
    /// The job ended in a non-success terminal status.
    Failed(JobStatus),
}

/// Asynchronous extraction job API.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Start a job and return its handle.
    async fn submit(&self, request: &JobRequest) -> Result<JobHandle>;

    /// Query the current status of a job.
    async fn status(&self, handle: &JobHandle) -> Result<JobStatusReport>;
}

/// Resolves the account that owns the extraction project.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn account_id(&self) -> Result<String>;
}

/// Polling behaviour for [`JobClient::await_completion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between status checks.
    pub interval: Duration,
    /// Give up after this long; `None` waits indefinitely.
    pub max_wait: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_wait: None,
        }
    }
}

impl PollSettings {
    pub fn from_config(config: &DocflowConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_wait: config.max_wait(),
        }
    }
}

/// Submits jobs and blocks until they reach a terminal state.
#[derive(Clone)]
pub struct JobClient {
    service: Arc<dyn JobService>,
    poll: PollSettings,
    payloads: Arc<dyn PayloadLog>,
}

impl JobClient {
    pub fn new(service: Arc<dyn JobService>, poll: PollSettings, payloads: Arc<dyn PayloadLog>) -> Self {
        Self { service, poll, payloads }
    }

    /// Start a job for the request.
    pub async fn submit(&self, request: &JobRequest) -> Result<JobHandle> {
        let handle = self.service.submit(request).await?;
        self.payloads.log(
            "invoke data automation",
            &json!({
                "inputConfiguration": {"s3Uri": request.input_uri},
                "outputConfiguration": {"s3Uri": request.output_uri},
                "dataAutomationProjectArn": request.project_arn,
                "dataAutomationProfileArn": request.profile_arn,
                "invocationArn": handle.0,
            }),
        );
        info!(handle = %handle, input = %request.input_uri, "Submitted extraction job");
        Ok(handle)
    }

    /// Poll until the job leaves Created/InProgress.
    ///
    /// `on_poll` runs once for every non-terminal status seen. A terminal
    /// non-success status is returned as [`JobResult::Failed`], not an error.
    pub async fn await_completion<F>(&self, handle: &JobHandle, mut on_poll: F) -> Result<JobResult>
    where
        F: FnMut(&JobStatus),
    {
        let started = Instant::now();

        loop {
            let report = self.service.status(handle).await?;

            if !report.status.is_pending() {
                debug!(handle = %handle, status = %report.status, "Job finished");
                return match report.status {
                    JobStatus::Success => {
                        let output_uri = report
                            .output_uri
                            .ok_or_else(|| DocflowError::missing("outputConfiguration.s3Uri"))?;
                        Ok(JobResult::Success { output_uri })
                    }
                    status => Ok(JobResult::Failed(status)),
                };
            }

            on_poll(&report.status);

            if let Some(max_wait) = self.poll.max_wait {
                if started.elapsed() >= max_wait {
                    return Err(DocflowError::Timeout {
                        handle: handle.to_string(),
                        waited_secs: started.elapsed().as_secs(),
                    });
                }
            }

            tokio::time::sleep(self.poll.interval).await;
        }
    }
}

//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{DocflowError, Result};

/// Main configuration for docflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocflowConfig {
    /// AWS account resources.
    pub aws: AwsConfig,

    /// Blueprint matching and field selection.
    pub blueprint: BlueprintConfig,

    /// Job status polling.
    pub polling: PollingConfig,

    /// Local batch folders.
    pub batch: BatchConfig,

    /// Logging toggles.
    pub logging: LoggingConfig,
}

/// AWS resources used by a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// Region for all service clients.
    pub region: String,

    /// Bucket holding both input documents and job output.
    pub bucket: String,

    /// Key prefix for uploaded documents.
    pub input_prefix: String,

    /// Key prefix where the service writes job output.
    pub output_prefix: String,

    /// Data automation project id.
    pub project_id: String,

    /// Data automation profile name.
    pub profile_name: String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            bucket: "lufng-bedrock-data-automation".to_string(),
            input_prefix: "BDA/Input/ruter_invoices".to_string(),
            output_prefix: "BDA/Output/ruter_invoices".to_string(),
            project_id: "a0fbb83f9473".to_string(),
            profile_name: "us.data-automation-v1".to_string(),
        }
    }
}

/// Blueprint to match and the fields to read from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlueprintConfig {
    /// Name the custom output must match.
    pub name: String,

    /// Field specs, `field` or `group/field`.
    pub fields: Vec<String>,
}

impl Default for BlueprintConfig {
    fn default() -> Self {
        Self {
            name: "ruter_invoice_blueprint".to_string(),
            fields: vec![
                "invoice_amount".to_string(),
                "purchase_date".to_string(),
                "ticket_number".to_string(),
            ],
        }
    }
}

/// Job polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay between status checks.
    pub interval_ms: u64,

    /// Give up after this many seconds (None = wait indefinitely).
    pub max_wait_secs: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_wait_secs: None,
        }
    }
}

/// Local batch folder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Directory containing one folder per batch.
    pub input_root: PathBuf,

    /// Document extensions to pick up (case-insensitive, without dot).
    pub extensions: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_root: PathBuf::from("input"),
            extensions: vec!["pdf".to_string()],
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Dump raw service payloads at DEBUG level.
    pub payloads: bool,
}

impl DocflowConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DocflowError::NotFound(path.display().to_string())
            } else {
                DocflowError::Io(e)
            }
        })?;
        serde_json::from_str(&content)
            .map_err(|e| DocflowError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject configurations that cannot produce a valid run.
    pub fn validate(&self) -> Result<()> {
        if self.aws.bucket.trim().is_empty() {
            return Err(DocflowError::Config("aws.bucket is empty".to_string()));
        }
        if self.aws.project_id.trim().is_empty() {
            return Err(DocflowError::Config("aws.project_id is empty".to_string()));
        }
        if self.blueprint.name.trim().is_empty() {
            return Err(DocflowError::Config("blueprint.name is empty".to_string()));
        }
        if self.blueprint.fields.iter().any(|f| f.trim().is_empty()) {
            return Err(DocflowError::Config("blueprint.fields contains an empty entry".to_string()));
        }
        Ok(())
    }

    /// Local folder for a batch.
    pub fn batch_dir(&self, batch_name: &str) -> PathBuf {
        self.batch.input_root.join(batch_name)
    }

    /// Object key for an uploaded document.
    pub fn input_key(&self, batch_name: &str, filename: &str) -> String {
        format!(
            "{}/{}/{}",
            self.aws.input_prefix.trim_end_matches('/'),
            batch_name,
            filename
        )
    }

    /// URI of an object in the configured bucket.
    pub fn object_uri(&self, key: &str) -> String {
        format!("s3://{}/{}", self.aws.bucket, key)
    }

    /// URI the service writes job output under.
    pub fn output_uri(&self) -> String {
        self.object_uri(self.aws.output_prefix.trim_end_matches('/'))
    }

    /// ARN of the data automation project for an account.
    pub fn project_arn(&self, account_id: &str) -> String {
        format!(
            "arn:aws:bedrock:{}:{}:data-automation-project/{}",
            self.aws.region, account_id, self.aws.project_id
        )
    }

    /// ARN of the data automation profile for an account.
    pub fn profile_arn(&self, account_id: &str) -> String {
        format!(
            "arn:aws:bedrock:{}:{}:data-automation-profile/{}",
            self.aws.region, account_id, self.aws.profile_name
        )
    }

    /// Polling interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.polling.interval_ms)
    }

    /// Maximum wait as a duration, if one is configured.
    pub fn max_wait(&self) -> Option<Duration> {
        self.polling.max_wait_secs.map(Duration::from_secs)
    }
}

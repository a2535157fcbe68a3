//! Run command - process every document in a batch folder.

use std::path::Path;
use std::sync::Arc;

use console::style;
use tracing::debug;

use docflow_core::job::load_sdk_config;
use docflow_core::{
    BatchOrchestrator, BatchOutcome, BedrockJobService, DocflowConfig, NoopPayloadLog, PayloadLog,
    S3BlobStore, StsIdentity, TracingPayloadLog,
};

use super::config::default_config_path;
use crate::report::ConsoleReporter;

pub async fn run(batch: &str, config_path: Option<&str>, debug_payloads: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    config.validate()?;

    let payloads: Arc<dyn PayloadLog> = if debug_payloads || config.logging.payloads {
        Arc::new(TracingPayloadLog)
    } else {
        Arc::new(NoopPayloadLog)
    };

    let sdk_config = load_sdk_config(&config.aws.region).await;
    debug!(region = %config.aws.region, bucket = %config.aws.bucket, "Loaded AWS configuration");

    let orchestrator = BatchOrchestrator::new(
        config,
        Arc::new(S3BlobStore::new(&sdk_config)),
        Arc::new(BedrockJobService::new(&sdk_config)),
        Arc::new(StsIdentity::new(&sdk_config)),
        payloads,
    )?;

    let reporter = ConsoleReporter::new();
    match orchestrator.run(batch, &reporter).await? {
        BatchOutcome::MissingFolder(dir) => {
            println!(
                "{} Error: Folder '{}' does not exist",
                style("✗").red(),
                dir.display()
            );
        }
        BatchOutcome::NoDocuments(dir) => {
            println!(
                "{} No files found in '{}'",
                style("ℹ").blue(),
                dir.display()
            );
        }
        BatchOutcome::Completed(_) => {}
    }

    Ok(())
}

/// Explicit path, else the user config file if present, else defaults.
fn load_config(config_path: Option<&str>) -> anyhow::Result<DocflowConfig> {
    if let Some(path) = config_path {
        return Ok(DocflowConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!(path = %default_path.display(), "Using user configuration");
        Ok(DocflowConfig::from_file(&default_path)?)
    } else {
        Ok(DocflowConfig::default())
    }
}

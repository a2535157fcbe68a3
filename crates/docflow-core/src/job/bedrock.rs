//! Bedrock Data Automation job service and STS identity.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_bedrockdataautomationruntime::Client as BdaClient;
use aws_sdk_bedrockdataautomationruntime::types::{
    DataAutomationConfiguration, InputConfiguration, OutputConfiguration,
};
use aws_sdk_sts::Client as StsClient;
use tracing::{debug, info};

use super::{IdentityProvider, JobHandle, JobRequest, JobService, JobStatus, JobStatusReport};
use crate::error::{DocflowError, Result};

/// Load shared AWS configuration pinned to a region.
pub async fn load_sdk_config(region: &str) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.to_string()))
        .load()
        .await
}

/// Job service backed by the Bedrock Data Automation runtime API.
pub struct BedrockJobService {
    client: BdaClient,
}

impl BedrockJobService {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        info!(region = ?sdk_config.region(), "Initialized Bedrock Data Automation client");
        Self {
            client: BdaClient::new(sdk_config),
        }
    }
}

fn build_error(what: &str, err: impl std::fmt::Display) -> DocflowError {
    DocflowError::Config(format!("invalid {}: {}", what, err))
}

#[async_trait]
impl JobService for BedrockJobService {
    async fn submit(&self, request: &JobRequest) -> Result<JobHandle> {
        let input = InputConfiguration::builder()
            .s3_uri(&request.input_uri)
            .build()
            .map_err(|e| build_error("input configuration", e))?;
        let output = OutputConfiguration::builder()
            .s3_uri(&request.output_uri)
            .build()
            .map_err(|e| build_error("output configuration", e))?;
        let automation = DataAutomationConfiguration::builder()
            .data_automation_project_arn(&request.project_arn)
            .build()
            .map_err(|e| build_error("data automation configuration", e))?;

        let response = self
            .client
            .invoke_data_automation_async()
            .input_configuration(input)
            .output_configuration(output)
            .data_automation_configuration(automation)
            .data_automation_profile_arn(&request.profile_arn)
            .send()
            .await
            .map_err(|e| DocflowError::Transport(format!("invoke data automation: {}", e)))?;

        Ok(JobHandle(response.invocation_arn().to_string()))
    }

    async fn status(&self, handle: &JobHandle) -> Result<JobStatusReport> {
        let response = self
            .client
            .get_data_automation_status()
            .invocation_arn(&handle.0)
            .send()
            .await
            .map_err(|e| DocflowError::Transport(format!("get data automation status: {}", e)))?;

        let status = response
            .status()
            .map(|s| JobStatus::parse(s.as_str()))
            .ok_or_else(|| DocflowError::missing("status"))?;

        if let Some(message) = response.error_message() {
            debug!(handle = %handle, error_type = ?response.error_type(), "{}", message);
        }

        Ok(JobStatusReport {
            status,
            output_uri: response
                .output_configuration()
                .map(|output| output.s3_uri().to_string()),
        })
    }
}

/// Resolves the caller's account id through STS.
pub struct StsIdentity {
    client: StsClient,
}

impl StsIdentity {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: StsClient::new(sdk_config),
        }
    }
}

#[async_trait]
impl IdentityProvider for StsIdentity {
    async fn account_id(&self) -> Result<String> {
        let identity = self
            .client
            .get_caller_identity()
            .send()
            .await
            .map_err(|e| DocflowError::Transport(format!("get caller identity: {}", e)))?;

        identity
            .account()
            .map(str::to_string)
            .ok_or_else(|| DocflowError::missing("Account"))
    }
}

//! AWS collaborators for DreamChaser
//!
//! Thin adapters from the `dreamchaser-cloud` traits to the AWS SDK. Idempotency
//! handling and status semantics live in `dreamchaser-cloud`; these adapters only
//! translate requests and map SDK errors to `CloudError::Provider`.

mod cloudformation;
mod ec2;
mod organizations;
mod ram;
mod ssm;

pub use cloudformation::CloudFormationStacks;
pub use ec2::Ec2Zones;
pub use organizations::Organizations;
pub use ram::RamSharing;
pub use ssm::SsmParameters;

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;
use aws_smithy_runtime_api::client::result::SdkError;
use dreamchaser_cloud::{CloudError, Operation};
use tracing::debug;

/// Load the shared SDK configuration, optionally pinning the region
pub async fn load_sdk_config(region: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    let config = loader.load().await;
    debug!(region = ?config.region(), "Loaded AWS configuration");
    config
}

/// All collaborators built from one SDK configuration
pub struct AwsClients {
    pub stacks: CloudFormationStacks,
    pub organizations: Organizations,
    pub sharing: RamSharing,
    pub parameters: SsmParameters,
    pub zones: Ec2Zones,
}

impl AwsClients {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            stacks: CloudFormationStacks::new(config),
            organizations: Organizations::new(config),
            sharing: RamSharing::new(config),
            parameters: SsmParameters::new(config),
            zones: Ec2Zones::new(config),
        }
    }

    pub async fn load(region: Option<&str>) -> Self {
        Self::new(&load_sdk_config(region).await)
    }
}

/// Map an SDK error to a provider error carrying code, message and HTTP status
pub(crate) fn sdk_error<E>(operation: Operation, err: SdkError<E, HttpResponse>) -> CloudError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let status = err.raw_response().map(|r| r.status().as_u16());
    let code = err.code().unwrap_or("Unknown").to_string();
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    CloudError::provider(operation, code, message, status)
}

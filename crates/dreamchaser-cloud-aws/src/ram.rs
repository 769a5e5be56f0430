use crate::sdk_error;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ram::Client;
use dreamchaser_cloud::{Operation, ResourceSharing, Result};
use tracing::info;

pub struct RamSharing {
    client: Client,
}

impl RamSharing {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl ResourceSharing for RamSharing {
    async fn enable_sharing_with_organization(&self) -> Result<()> {
        info!("EnableSharingWithAwsOrganization");
        self.client
            .enable_sharing_with_aws_organization()
            .send()
            .await
            .map_err(|e| sdk_error(Operation::ResourceSharing, e))?;
        Ok(())
    }
}

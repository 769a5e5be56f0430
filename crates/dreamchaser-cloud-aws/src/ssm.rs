use crate::sdk_error;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ssm::Client;
use aws_sdk_ssm::types::ParameterType;
use dreamchaser_cloud::{CloudError, Operation, ParameterStore, Result};
use tracing::info;

pub struct SsmParameters {
    client: Client,
}

impl SsmParameters {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl ParameterStore for SsmParameters {
    async fn get_parameter(&self, name: &str) -> Result<String> {
        let output = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(false)
            .send()
            .await
            .map_err(|e| sdk_error(Operation::ParameterStore, e))?;

        output
            .parameter()
            .and_then(|p| p.value())
            .map(str::to_string)
            .ok_or_else(|| {
                CloudError::provider(
                    Operation::ParameterStore,
                    "ParameterNotFound",
                    format!("parameter {} has no value", name),
                    None,
                )
            })
    }

    async fn put_string_parameter(&self, name: &str, value: &str) -> Result<()> {
        info!(name, "PutParameter");
        self.client
            .put_parameter()
            .name(name)
            .value(value)
            .r#type(ParameterType::String)
            .overwrite(true)
            .send()
            .await
            .map_err(|e| sdk_error(Operation::ParameterStore, e))?;
        Ok(())
    }
}

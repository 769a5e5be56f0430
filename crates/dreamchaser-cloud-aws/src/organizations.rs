use crate::sdk_error;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_organizations::Client;
use aws_sdk_organizations::types::{OrganizationFeatureSet, PolicyType};
use dreamchaser_cloud::{Operation, OrganizationDirectory, OrganizationalUnit, Result};
use tracing::info;

pub struct Organizations {
    client: Client,
}

impl Organizations {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl OrganizationDirectory for Organizations {
    async fn create_organization(&self, feature_set: &str) -> Result<()> {
        info!(feature_set, "CreateOrganization");
        self.client
            .create_organization()
            .feature_set(OrganizationFeatureSet::from(feature_set))
            .send()
            .await
            .map_err(|e| sdk_error(Operation::CreateOrganization, e))?;
        Ok(())
    }

    async fn list_roots(&self) -> Result<Vec<String>> {
        let output = self
            .client
            .list_roots()
            .send()
            .await
            .map_err(|e| sdk_error(Operation::FetchOrganizationalUnit, e))?;
        Ok(output
            .roots()
            .iter()
            .filter_map(|r| r.id().map(str::to_string))
            .collect())
    }

    async fn enable_policy_type(&self, root_id: &str, policy_type: &str) -> Result<()> {
        info!(root_id, policy_type, "EnablePolicyType");
        self.client
            .enable_policy_type()
            .root_id(root_id)
            .policy_type(PolicyType::from(policy_type))
            .send()
            .await
            .map_err(|e| sdk_error(Operation::EnablePolicyType, e))?;
        Ok(())
    }

    async fn create_organizational_unit(&self, parent_id: &str, name: &str) -> Result<()> {
        info!(parent_id, name, "CreateOrganizationalUnit");
        self.client
            .create_organizational_unit()
            .parent_id(parent_id)
            .name(name)
            .send()
            .await
            .map_err(|e| sdk_error(Operation::CreateOrganizationalUnit, e))?;
        Ok(())
    }

    async fn list_organizational_units(&self, parent_id: &str) -> Result<Vec<OrganizationalUnit>> {
        let mut units = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_organizational_units_for_parent()
                .parent_id(parent_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error(Operation::FetchOrganizationalUnit, e))?;

            units.extend(output.organizational_units().iter().filter_map(|ou| {
                Some(OrganizationalUnit {
                    id: ou.id()?.to_string(),
                    name: ou.name()?.to_string(),
                    arn: ou.arn()?.to_string(),
                })
            }));

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(units)
    }
}

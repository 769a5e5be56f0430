//! Organization bootstrap
//!
//! Create the organization, enable the policy type on the root, create the
//! organizational unit, enable RAM sharing with the organization and store the
//! OU ARN in the parameter store. Every step is idempotent: the provider's
//! "already done" codes count as success.

use crate::error::{CloudError, Operation, Result};
use crate::provider::{
    ALREADY_IN_ORGANIZATION, DUPLICATE_ORGANIZATIONAL_UNIT, OrganizationDirectory,
    POLICY_TYPE_ALREADY_ENABLED, ParameterStore, ResourceSharing,
};
use dreamchaser_core::OrganizationConfig;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub organization_created: bool,
    pub policy_enabled: bool,
    pub unit_created: bool,
    pub root_id: String,
    pub unit_arn: String,
    pub parameter: String,
}

/// Treat the given provider code as success; returns whether the call did something
fn tolerate(result: Result<()>, code: &str) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.code() == Some(code) => {
            warn!(code, "Already done, skipping");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// First root of the organization
pub async fn root_id(org: &dyn OrganizationDirectory, operation: Operation) -> Result<String> {
    let roots = org
        .list_roots()
        .await
        .map_err(|e| e.for_operation(operation))?;
    roots.into_iter().next().ok_or_else(|| {
        CloudError::provider(operation, "RootNotFoundException", "organization has no root", None)
    })
}

/// ARN of the OU named `name` directly under `parent_id`
pub async fn find_unit_arn(
    org: &dyn OrganizationDirectory,
    parent_id: &str,
    name: &str,
) -> Result<String> {
    org.list_organizational_units(parent_id)
        .await?
        .into_iter()
        .find(|ou| ou.name == name)
        .map(|ou| ou.arn)
        .ok_or_else(|| {
            CloudError::provider(
                Operation::FetchOrganizationalUnit,
                "OrganizationalUnitNotFoundException",
                format!("organizational unit '{}' not found under {}", name, parent_id),
                None,
            )
        })
}

pub async fn bootstrap_organization(
    org: &dyn OrganizationDirectory,
    sharing: &dyn ResourceSharing,
    parameters: &dyn ParameterStore,
    config: &OrganizationConfig,
) -> Result<BootstrapReport> {
    let organization_created = tolerate(
        org.create_organization(&config.feature_set).await,
        ALREADY_IN_ORGANIZATION,
    )?;
    info!(created = organization_created, "Organization ready");

    let root = root_id(org, Operation::EnablePolicyType).await?;
    let policy_enabled = tolerate(
        org.enable_policy_type(&root, &config.policy_type).await,
        POLICY_TYPE_ALREADY_ENABLED,
    )?;
    info!(
        root = %root,
        policy_type = %config.policy_type,
        enabled = policy_enabled,
        "Policy type ready"
    );

    let unit_created = tolerate(
        org.create_organizational_unit(&root, &config.unit).await,
        DUPLICATE_ORGANIZATIONAL_UNIT,
    )?;
    let unit_arn = find_unit_arn(org, &root, &config.unit).await?;
    info!(
        unit = %config.unit,
        arn = %unit_arn,
        created = unit_created,
        "Organizational unit ready"
    );

    sharing.enable_sharing_with_organization().await?;
    info!("Resource sharing with the organization enabled");

    parameters
        .put_string_parameter(&config.parameter, &unit_arn)
        .await?;
    info!(parameter = %config.parameter, "OU saved to parameter store");

    Ok(BootstrapReport {
        organization_created,
        policy_enabled,
        unit_created,
        root_id: root,
        unit_arn,
        parameter: config.parameter.clone(),
    })
}

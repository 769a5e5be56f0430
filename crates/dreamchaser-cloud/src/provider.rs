//! Collaborator traits
//!
//! The executor talks to the cloud only through these traits. The AWS SDK
//! implementations live in `dreamchaser-cloud-aws`; tests use in-memory fakes.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Error codes that mean "already done" for idempotent bootstrap steps
pub const ALREADY_IN_ORGANIZATION: &str = "AlreadyInOrganizationException";
pub const POLICY_TYPE_ALREADY_ENABLED: &str = "PolicyTypeAlreadyEnabledException";
pub const DUPLICATE_ORGANIZATIONAL_UNIT: &str = "DuplicateOrganizationalUnitException";

/// Stack orchestration (CloudFormation)
#[async_trait]
pub trait StackExecutor: Send + Sync {
    /// Describe a stack. A missing stack surfaces as a provider error with status 400.
    async fn describe_stack(&self, name: &str) -> Result<StackDescription>;

    /// Start creating a stack and return its id
    async fn create_stack(&self, request: &StackRequest) -> Result<String>;

    /// Start updating a stack and return its id
    async fn update_stack(&self, request: &StackRequest) -> Result<String>;
}

/// AWS Organizations
#[async_trait]
pub trait OrganizationDirectory: Send + Sync {
    async fn create_organization(&self, feature_set: &str) -> Result<()>;

    /// Root ids, in provider order
    async fn list_roots(&self) -> Result<Vec<String>>;

    async fn enable_policy_type(&self, root_id: &str, policy_type: &str) -> Result<()>;

    async fn create_organizational_unit(&self, parent_id: &str, name: &str) -> Result<()>;

    async fn list_organizational_units(&self, parent_id: &str) -> Result<Vec<OrganizationalUnit>>;
}

/// Resource Access Manager
#[async_trait]
pub trait ResourceSharing: Send + Sync {
    async fn enable_sharing_with_organization(&self) -> Result<()>;
}

/// SSM parameter store
#[async_trait]
pub trait ParameterStore: Send + Sync {
    async fn get_parameter(&self, name: &str) -> Result<String>;

    /// Put a `String` parameter, overwriting any existing value
    async fn put_string_parameter(&self, name: &str, value: &str) -> Result<()>;
}

/// Availability zone discovery (EC2)
#[async_trait]
pub trait ZoneCatalog: Send + Sync {
    /// Names of the available zones in the configured region, sorted
    async fn availability_zones(&self) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationalUnit {
    pub id: String,
    pub name: String,
    pub arn: String,
}

/// Where the template comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Body(String),
    Url(String),
}

/// Create/update request for a stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackRequest {
    pub name: String,
    pub template: TemplateSource,
    pub parameters: BTreeMap<String, String>,
    pub capabilities: Vec<String>,
    pub timeout_minutes: u32,
    pub termination_protection: bool,
}

impl StackRequest {
    pub fn new(name: impl Into<String>, template: TemplateSource) -> Self {
        Self {
            name: name.into(),
            template,
            parameters: BTreeMap::new(),
            capabilities: dreamchaser_core::DEFAULT_CAPABILITIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
            timeout_minutes: dreamchaser_core::DEFAULT_STACK_TIMEOUT_MINUTES,
            termination_protection: true,
        }
    }

    /// Build a request from a `stack` block, using the synthesized body unless a URL is set
    pub fn from_config(
        config: &dreamchaser_core::StackConfig,
        body: Option<String>,
    ) -> Option<Self> {
        let template = match (&config.template_url, body) {
            (Some(url), _) => TemplateSource::Url(url.clone()),
            (None, Some(body)) => TemplateSource::Body(body),
            (None, None) => return None,
        };
        Some(Self {
            name: config.name.clone(),
            template,
            parameters: config.parameters.clone(),
            capabilities: config.capabilities.clone(),
            timeout_minutes: config.timeout_minutes,
            termination_protection: config.termination_protection,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.timeout_minutes) * 60)
    }
}

/// Current state of a stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackDescription {
    pub name: String,
    pub stack_id: Option<String>,
    pub status: String,
    pub status_reason: Option<String>,
    /// Output key to value
    pub outputs: BTreeMap<String, String>,
}

impl StackDescription {
    pub fn is_in_progress(&self) -> bool {
        self.status.ends_with("_IN_PROGRESS")
    }
}

/// Polling configuration for stack waiters (exponential backoff)
#[derive(Debug, Clone)]
pub struct WaiterConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(30),
            multiplier: 1.5,
        }
    }
}

impl WaiterConfig {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt as i32);
        let delay = self.initial_delay.mul_f64(factor);
        delay.min(self.max_delay)
    }
}

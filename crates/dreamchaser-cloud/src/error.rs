//! Cloud collaborator error types

use std::fmt;
use thiserror::Error;

/// Collaborator operation that produced an error
///
/// Each operation maps to the process exit status the CLI reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateOrganization,
    EnablePolicyType,
    CreateOrganizationalUnit,
    FetchOrganizationalUnit,
    ParameterStore,
    ResourceSharing,
    DescribeStack,
    CreateStack,
    UpdateStack,
    DescribeZones,
}

impl Operation {
    /// Fixed exit status, or `None` when the provider's HTTP status is used
    pub fn fixed_exit_code(self) -> Option<i32> {
        match self {
            Operation::CreateOrganization => Some(127),
            Operation::CreateOrganizationalUnit => Some(137),
            Operation::EnablePolicyType => Some(157),
            Operation::FetchOrganizationalUnit => Some(177),
            Operation::ParameterStore => Some(197),
            Operation::ResourceSharing
            | Operation::DescribeStack
            | Operation::CreateStack
            | Operation::UpdateStack
            | Operation::DescribeZones => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::CreateOrganization => "create organization",
            Operation::EnablePolicyType => "enable policy type",
            Operation::CreateOrganizationalUnit => "create organizational unit",
            Operation::FetchOrganizationalUnit => "fetch organizational unit",
            Operation::ParameterStore => "parameter store",
            Operation::ResourceSharing => "resource sharing",
            Operation::DescribeStack => "describe stack",
            Operation::CreateStack => "create stack",
            Operation::UpdateStack => "update stack",
            Operation::DescribeZones => "describe availability zones",
        };
        write!(f, "{}", name)
    }
}

/// Cloud collaborator errors
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("{operation} failed: {message} (Error Code: {code})")]
    Provider {
        operation: Operation,
        code: String,
        message: String,
        /// HTTP status of the provider response, when one was received
        status: Option<u16>,
    },

    #[error("Private CloudFormation stack. Access denied! ({0})")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Stack {stack} ended in {status}: {}", .reason.as_deref().unwrap_or("no reason given"))]
    StackFailed {
        stack: String,
        status: String,
        reason: Option<String>,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn provider(
        operation: Operation,
        code: impl Into<String>,
        message: impl Into<String>,
        status: Option<u16>,
    ) -> Self {
        CloudError::Provider {
            operation,
            code: code.into(),
            message: message.into(),
            status,
        }
    }

    /// Attribute a provider error to the step that issued the call
    pub fn for_operation(self, operation: Operation) -> Self {
        match self {
            CloudError::Provider {
                code,
                message,
                status,
                ..
            } => CloudError::Provider {
                operation,
                code,
                message,
                status,
            },
            other => other,
        }
    }

    /// Provider error code (e.g. `AlreadyInOrganizationException`)
    pub fn code(&self) -> Option<&str> {
        match self {
            CloudError::Provider { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            CloudError::Provider { status, .. } => *status,
            _ => None,
        }
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CloudError::Provider {
                operation, status, ..
            } => operation
                .fixed_exit_code()
                .or_else(|| status.map(i32::from))
                .unwrap_or(1),
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

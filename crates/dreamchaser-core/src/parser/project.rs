//! organization / stack ノードのパース

use super::{flag, integer, node_label, require_string, string_args};
use crate::error::{PlanError, Result};
use crate::model::{OrganizationConfig, StackConfig};
use kdl::KdlNode;
use std::path::PathBuf;

/// organization ノードをパース（指定のない項目は既定値のまま）
pub fn parse_organization(node: &KdlNode, organization: &mut OrganizationConfig) -> Result<()> {
    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "feature-set" => organization.feature_set = require_string(child)?,
                "policy-type" => organization.policy_type = require_string(child)?,
                "unit" => organization.unit = require_string(child)?,
                "parameter" => organization.parameter = require_string(child)?,
                other => {
                    return Err(PlanError::InvalidConfig(format!(
                        "organization: unknown setting '{}'",
                        other
                    )));
                }
            }
        }
    }
    Ok(())
}

/// stack ノードをパース
pub fn parse_stack(node: &KdlNode) -> Result<StackConfig> {
    let mut stack = StackConfig::new(node_label(node)?);
    let mut capabilities = Vec::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "vpc" => stack.vpc = Some(require_string(child)?),
                "template-url" => stack.template_url = Some(require_string(child)?),
                "timeout" => stack.timeout_minutes = integer(child)?,
                "output" => stack.output = Some(PathBuf::from(require_string(child)?)),
                "termination-protection" => stack.termination_protection = flag(child)?,
                "capability" => capabilities.extend(string_args(child)),
                "parameter" => {
                    let args = string_args(child);
                    let [key, value] = args.as_slice() else {
                        return Err(PlanError::InvalidConfig(format!(
                            "stack '{}': parameter expects a key and a value",
                            stack.name
                        )));
                    };
                    stack.parameters.insert(key.clone(), value.clone());
                }
                other => {
                    return Err(PlanError::InvalidConfig(format!(
                        "stack '{}': unknown setting '{}'",
                        stack.name, other
                    )));
                }
            }
        }
    }

    if stack.timeout_minutes == 0 {
        return Err(PlanError::InvalidConfig(format!(
            "stack '{}': timeout must be at least 1 minute",
            stack.name
        )));
    }
    // 明示した場合は既定のケイパビリティを置き換える
    if !capabilities.is_empty() {
        stack.capabilities = capabilities;
    }

    Ok(stack)
}

//! Planned changes between the deployed and the desired resource set

use dreamchaser_core::Template;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Set of resources keyed by logical id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceSet {
    pub resources: BTreeMap<String, ResourceConfig>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_template(template: &Template) -> Self {
        let mut set = Self::new();
        for (id, resource) in &template.resources {
            set.add(ResourceConfig {
                id: id.clone(),
                resource_type: resource.resource_type.clone(),
                config: resource.properties.clone(),
            });
        }
        set
    }

    pub fn add(&mut self, resource: ResourceConfig) {
        self.resources.insert(resource.id.clone(), resource);
    }

    pub fn get(&self, id: &str) -> Option<&ResourceConfig> {
        self.resources.get(id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Logical id in the template
    pub id: String,

    /// CloudFormation type (e.g. "AWS::EC2::Subnet")
    pub resource_type: String,

    /// Resource properties
    pub config: serde_json::Value,
}

/// Represents a planned action for a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub action_type: ActionType,
    pub resource_type: String,
    pub resource_id: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Create,
    Update,
    Delete,
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Plan containing all actions, ordered by logical id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub actions: Vec<Action>,
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    /// Diff the desired set against what was last deployed
    ///
    /// A resource whose type changed under the same logical id is an update;
    /// CloudFormation replaces it.
    pub fn diff(desired: &ResourceSet, current: &ResourceSet) -> Self {
        let mut actions = Vec::new();

        for (id, resource) in &desired.resources {
            let (action_type, description) = match current.get(id) {
                None => (ActionType::Create, format!("create {}", resource.resource_type)),
                Some(existing) if existing == resource => {
                    (ActionType::NoOp, "unchanged".to_string())
                }
                Some(existing) if existing.resource_type != resource.resource_type => (
                    ActionType::Update,
                    format!(
                        "replace {} with {}",
                        existing.resource_type, resource.resource_type
                    ),
                ),
                Some(_) => (ActionType::Update, format!("update {}", resource.resource_type)),
            };
            actions.push(Action {
                action_type,
                resource_type: resource.resource_type.clone(),
                resource_id: id.clone(),
                description,
            });
        }

        for (id, resource) in &current.resources {
            if desired.get(id).is_none() {
                actions.push(Action {
                    action_type: ActionType::Delete,
                    resource_type: resource.resource_type.clone(),
                    resource_id: id.clone(),
                    description: format!("delete {}", resource.resource_type),
                });
            }
        }

        actions.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));
        Self::new(actions)
    }

    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource(id: &str, resource_type: &str, config: serde_json::Value) -> ResourceConfig {
        ResourceConfig {
            id: id.to_string(),
            resource_type: resource_type.to_string(),
            config,
        }
    }

    #[test]
    fn test_diff_against_empty_creates_everything() {
        let mut desired = ResourceSet::new();
        desired.add(resource("Vpc1", "AWS::EC2::VPC", json!({"CidrBlock": "10.0.0.0/16"})));
        desired.add(resource("Igw1", "AWS::EC2::InternetGateway", json!({})));

        let plan = Plan::diff(&desired, &ResourceSet::new());
        assert!(plan.has_changes);
        assert_eq!(plan.summary().create, 2);
    }

    #[test]
    fn test_diff_detects_all_action_types() {
        let mut current = ResourceSet::new();
        current.add(resource("Vpc1", "AWS::EC2::VPC", json!({"CidrBlock": "10.0.0.0/16"})));
        current.add(resource("Subnet1", "AWS::EC2::Subnet", json!({"CidrBlock": "10.0.16.0/24"})));
        current.add(resource("Old1", "AWS::EC2::NatGateway", json!({})));

        let mut desired = ResourceSet::new();
        desired.add(resource("Vpc1", "AWS::EC2::VPC", json!({"CidrBlock": "10.0.0.0/16"})));
        desired.add(resource("Subnet1", "AWS::EC2::Subnet", json!({"CidrBlock": "10.0.17.0/24"})));
        desired.add(resource("New1", "AWS::EC2::EIP", json!({})));

        let plan = Plan::diff(&desired, &current);
        assert_eq!(
            plan.summary(),
            PlanSummary {
                create: 1,
                update: 1,
                delete: 1,
                no_change: 1,
            }
        );
        let ids: Vec<&str> = plan.actions.iter().map(|a| a.resource_id.as_str()).collect();
        assert_eq!(ids, vec!["New1", "Old1", "Subnet1", "Vpc1"]);
    }

    #[test]
    fn test_identical_sets_have_no_changes() {
        let mut set = ResourceSet::new();
        set.add(resource("Vpc1", "AWS::EC2::VPC", json!({})));
        let plan = Plan::diff(&set, &set.clone());
        assert!(!plan.has_changes);
        assert_eq!(
            plan.summary().to_string(),
            "0 to create, 0 to update, 0 to delete, 1 unchanged"
        );
    }
}

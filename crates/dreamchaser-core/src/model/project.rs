//! プロジェクト設定
//!
//! `dreamchaser.kdl` 全体を表すモデル。

use super::params::VpcParams;
use crate::error::{PlanError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// 既定のスタック作成タイムアウト（分）
pub const DEFAULT_STACK_TIMEOUT_MINUTES: u32 = 30;

/// スタック作成・更新時に付与するケイパビリティ
pub const DEFAULT_CAPABILITIES: &[&str] = &["CAPABILITY_NAMED_IAM", "CAPABILITY_AUTO_EXPAND"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub account: Option<String>,
    pub region: Option<String>,
    pub organization: OrganizationConfig,
    /// ファイル内の記述順
    pub vpcs: Vec<VpcParams>,
    pub stacks: Vec<StackConfig>,
}

impl Project {
    /// 名前で VPC を取得。省略時は1つ目
    pub fn vpc(&self, name: Option<&str>) -> Result<&VpcParams> {
        match name {
            Some(name) => self
                .vpcs
                .iter()
                .find(|v| v.name == name)
                .ok_or_else(|| PlanError::VpcNotFound(name.to_string())),
            None => self
                .vpcs
                .first()
                .ok_or_else(|| PlanError::VpcNotFound("(none defined)".to_string())),
        }
    }

    /// 名前でスタックを取得。省略時は1つ目
    pub fn stack(&self, name: Option<&str>) -> Result<&StackConfig> {
        match name {
            Some(name) => self
                .stacks
                .iter()
                .find(|s| s.name == name)
                .ok_or_else(|| PlanError::StackNotFound(name.to_string())),
            None => self
                .stacks
                .first()
                .ok_or_else(|| PlanError::StackNotFound("(none defined)".to_string())),
        }
    }
}

/// AWS Organizations の初期化設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationConfig {
    pub feature_set: String,
    pub policy_type: String,
    /// 作成する OU の名前
    pub unit: String,
    /// OU を保存する SSM パラメータ名
    pub parameter: String,
}

impl Default for OrganizationConfig {
    fn default() -> Self {
        Self {
            feature_set: "ALL".to_string(),
            policy_type: "SERVICE_CONTROL_POLICY".to_string(),
            unit: "dreamchaser".to_string(),
            parameter: "DC_ONE_OU_ID".to_string(),
        }
    }
}

/// CloudFormation スタックの設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackConfig {
    pub name: String,
    /// デプロイする VPC（省略時は1つ目）
    pub vpc: Option<String>,
    /// 指定した場合は合成したテンプレートの代わりに使う
    pub template_url: Option<String>,
    pub timeout_minutes: u32,
    /// スタック出力を書き出す JSON ファイル
    pub output: Option<PathBuf>,
    pub parameters: BTreeMap<String, String>,
    pub capabilities: Vec<String>,
    pub termination_protection: bool,
}

impl StackConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vpc: None,
            template_url: None,
            timeout_minutes: DEFAULT_STACK_TIMEOUT_MINUTES,
            output: None,
            parameters: BTreeMap::new(),
            capabilities: DEFAULT_CAPABILITIES.iter().map(|c| c.to_string()).collect(),
            termination_protection: true,
        }
    }
}

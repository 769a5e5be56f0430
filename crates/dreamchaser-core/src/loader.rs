//! 統合ローダー
//!
//! 設定ファイルの読み込みと、コンテキスト値（`-c KEY=VALUE` と環境変数）の適用。
//! 優先順位: `-c` > 環境変数 > KDL ファイル

use crate::error::{PlanError, Result};
use crate::model::{Project, ShareTarget, TopologyVariant, VpcParams};
use crate::parser::parse_kdl_string;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, instrument};

pub const ACCOUNT_KEYS: &[&str] = &["DREAMCHASER_CDK_ACCOUNT", "CDK_DEFAULT_ACCOUNT"];
pub const REGION_KEYS: &[&str] = &["DREAMCHASER_CDK_REGION", "CDK_DEFAULT_REGION"];
pub const VPC_CIDR_KEY: &str = "DREAMCHASER_VPC_CIDR";
pub const VPC_HA_KEY: &str = "DREAMCHASER_VPC_HA";
pub const VPC_VARIANT_KEY: &str = "DREAMCHASER_VPC_VARIANT";
pub const TGW_DESTINATION_KEY: &str = "DREAMCHASER_TGW_DEST_CIDR";
pub const OU_ID_KEY: &str = "DREAMCHASER_OU_ID";

/// 設定ファイルに VPC がない場合に作る VPC の名前
pub const DEFAULT_VPC_NAME: &str = "main";

const CONTEXT_PREFIXES: &[&str] = &["DREAMCHASER_", "CDK_DEFAULT_"];

/// コンテキスト値
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    env: BTreeMap<String, String>,
    overrides: BTreeMap<String, String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// プロセスの環境変数から関連するものだけを取り込む
    pub fn from_env() -> Self {
        Self::from_env_pairs(std::env::vars())
    }

    pub fn from_env_pairs<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let env = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| CONTEXT_PREFIXES.iter().any(|p| k.starts_with(p)))
            .collect();
        Self {
            env,
            overrides: BTreeMap::new(),
        }
    }

    /// `KEY=VALUE` 形式の上書きを追加
    pub fn with_override(mut self, pair: &str) -> Result<Self> {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            PlanError::InvalidConfig(format!("context must be KEY=VALUE: {}", pair))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(PlanError::InvalidConfig(format!(
                "context key is empty: {}",
                pair
            )));
        }
        self.overrides.insert(key.to_string(), value.trim().to_string());
        Ok(self)
    }

    pub fn with_overrides<S: AsRef<str>>(self, pairs: &[S]) -> Result<Self> {
        pairs
            .iter()
            .try_fold(self, |ctx, pair| ctx.with_override(pair.as_ref()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.overrides
            .get(key)
            .or_else(|| self.env.get(key))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// キー一覧のうち最初に見つかった値
    pub fn first(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|key| self.get(key))
    }

    fn flag(&self, key: &str) -> Result<Option<bool>> {
        self.get(key)
            .map(|value| match value.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                other => Err(PlanError::InvalidConfig(format!(
                    "{} expects a boolean, got '{}'",
                    key, other
                ))),
            })
            .transpose()
    }
}

/// 設定ファイル群を読み込んでアカウント・リージョンを解決する
///
/// 後のファイルの定義が前のファイルを上書きする（`dreamchaser.local.kdl`）。
#[instrument(skip(context))]
pub fn load_project(paths: &[PathBuf], context: &Context) -> Result<Project> {
    let mut content = String::new();
    for path in paths {
        debug!(path = %path.display(), "Reading config file");
        let text = std::fs::read_to_string(path).map_err(|e| PlanError::IoError {
            path: path.clone(),
            message: e.to_string(),
        })?;
        content.push_str(&text);
        content.push('\n');
    }

    let name = paths
        .first()
        .and_then(|p| p.parent())
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();

    let mut project = parse_kdl_string(&content, name)?;
    apply_context(&mut project, context);
    info!(
        vpcs = project.vpcs.len(),
        stacks = project.stacks.len(),
        "Project loaded"
    );
    Ok(project)
}

/// アカウントとリージョンにコンテキストを適用
pub fn apply_context(project: &mut Project, context: &Context) {
    if let Some(account) = context.first(ACCOUNT_KEYS) {
        project.account = Some(account.to_string());
    }
    if let Some(region) = context.first(REGION_KEYS) {
        project.region = Some(region.to_string());
    }
}

/// 計画対象の VPC パラメータを確定する
///
/// ファイルに VPC がなく `DREAMCHASER_VPC_CIDR` がある場合は easy 構成の VPC を作る。
/// OU ID がコンテキストにあれば、パラメータストア参照の共有先をそれで解決する。
pub fn resolve_vpc(project: &Project, name: Option<&str>, context: &Context) -> Result<VpcParams> {
    let mut vpc = match (project.vpc(name), context.get(VPC_CIDR_KEY)) {
        (Ok(vpc), _) => vpc.clone(),
        (Err(_), Some(cidr)) if project.vpcs.is_empty() => {
            VpcParams::easy(name.unwrap_or(DEFAULT_VPC_NAME), cidr, "", Vec::new())
        }
        (Err(e), _) => return Err(e),
    };

    if let Some(cidr) = context.get(VPC_CIDR_KEY) {
        vpc.cidr = cidr.to_string();
    }
    if let Some(ha) = context.flag(VPC_HA_KEY)? {
        vpc.vpc_ha = ha;
    }
    if let Some(variant) = context.get(VPC_VARIANT_KEY) {
        vpc.variant = variant.parse::<TopologyVariant>()?;
    }
    if let Some(destination) = context.get(TGW_DESTINATION_KEY) {
        vpc.tgw_destination = Some(destination.to_string());
    }
    if vpc.region.is_empty()
        && let Some(region) = &project.region
    {
        vpc.region = region.clone();
    }
    if let Some(ou) = context.get(OU_ID_KEY)
        && let Some(tgw) = vpc.transit_gateway.as_mut()
        && matches!(tgw.share_with, Some(ShareTarget::FromParameter(_)))
    {
        tgw.share_with = Some(ShareTarget::Principal(ou.to_string()));
    }

    if vpc.cidr.is_empty() {
        return Err(PlanError::InvalidConfig(format!(
            "VPC '{}' has no cidr (set it in the file or {})",
            vpc.name, VPC_CIDR_KEY
        )));
    }

    Ok(vpc)
}

//! VPC 計画の入力パラメータ
//!
//! KDL ファイルとコンテキスト値から組み立てられ、`topology::assemble` に渡される。

use super::tier::{SubnetTier, TierRequest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 指定しない場合の Transit Gateway の BGP ASN
pub const DEFAULT_TGW_ASN: u32 = 65000;

/// 指定しない場合のサブネットマスク
pub const DEFAULT_SUBNET_MASK: u8 = 24;

/// トポロジーの組み立て方
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyVariant {
    /// ゾーン数から階層とオフセットを自動で決める簡易構成
    #[default]
    Easy,
    /// 階層とオフセットを明示する構成
    Explicit,
}

impl fmt::Display for TopologyVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyVariant::Easy => write!(f, "easy"),
            TopologyVariant::Explicit => write!(f, "explicit"),
        }
    }
}

impl FromStr for TopologyVariant {
    type Err = crate::error::PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(TopologyVariant::Easy),
            "explicit" | "step-by-step" => Ok(TopologyVariant::Explicit),
            other => Err(crate::error::PlanError::InvalidConfig(format!(
                "unknown topology variant: {}",
                other
            ))),
        }
    }
}

/// VPC 計画のパラメータ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VpcParams {
    /// VPC 名（リソース ID のスコープにもなる）
    pub name: String,

    /// VPC の CIDR（例: "10.0.0.0/16"）
    pub cidr: String,

    /// デプロイ先リージョン
    pub region: String,

    /// 順序付きのアベイラビリティゾーン一覧
    pub zones: Vec<String>,

    pub variant: TopologyVariant,

    /// サブネットのマスク
    pub mask: u8,

    pub enable_dns: bool,
    pub enable_internet: bool,
    pub enable_nat: bool,

    /// NAT ゲートウェイをゾーンごとに作成する
    pub vpc_ha: bool,

    /// S3 ゲートウェイエンドポイントを作成する
    pub enable_endpoint: bool,

    /// 要求する階層（easy で空の場合は既定の階層）
    pub tiers: Vec<TierRequest>,

    pub transit_gateway: Option<TransitGatewayParams>,

    /// 宛先を省略したルートに使う既定の宛先 CIDR
    pub tgw_destination: Option<String>,

    pub tgw_routes: Vec<TgwRouteParams>,
    pub vpc_routes: Vec<VpcRouteParams>,
}

impl VpcParams {
    /// easy 構成の既定値
    pub fn easy(
        name: impl Into<String>,
        cidr: impl Into<String>,
        region: impl Into<String>,
        zones: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            cidr: cidr.into(),
            region: region.into(),
            zones,
            variant: TopologyVariant::Easy,
            mask: DEFAULT_SUBNET_MASK,
            enable_dns: true,
            enable_internet: true,
            enable_nat: true,
            vpc_ha: false,
            enable_endpoint: false,
            tiers: Vec::new(),
            transit_gateway: None,
            tgw_destination: None,
            tgw_routes: Vec::new(),
            vpc_routes: Vec::new(),
        }
    }

    /// 明示構成の既定値（階層なし、ゲートウェイなし）
    pub fn explicit(
        name: impl Into<String>,
        cidr: impl Into<String>,
        region: impl Into<String>,
        zones: Vec<String>,
    ) -> Self {
        Self {
            variant: TopologyVariant::Explicit,
            enable_internet: false,
            enable_nat: false,
            ..Self::easy(name, cidr, region, zones)
        }
    }

    pub fn with_tier(mut self, tier: SubnetTier, offset: u8) -> Self {
        self.tiers.push(TierRequest::new(tier, offset));
        self
    }
}

/// Transit Gateway の作成元
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitGatewaySource {
    /// このスタックで作成する
    Create {
        asn: Option<u32>,
        description: Option<String>,
    },
    /// 共有済みの既存 Transit Gateway にアタッチする
    Existing { id: String },
}

/// リソース共有の相手
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareTarget {
    /// OU の ARN などプリンシパルを直接指定
    Principal(String),
    /// パラメータストアから取得する（実行前に解決が必要）
    FromParameter(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitGatewayParams {
    pub source: TransitGatewaySource,
    pub share_with: Option<ShareTarget>,
}

impl TransitGatewayParams {
    pub fn create() -> Self {
        Self {
            source: TransitGatewaySource::Create {
                asn: None,
                description: None,
            },
            share_with: None,
        }
    }
}

/// Transit Gateway アタッチメントの参照
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentRef {
    /// この VPC のアタッチメント
    Local,
    /// 他アカウント・他 VPC のアタッチメント ID
    External(String),
}

impl AttachmentRef {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "local" | "self" => AttachmentRef::Local,
            other => AttachmentRef::External(other.to_string()),
        }
    }
}

impl fmt::Display for AttachmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentRef::Local => write!(f, "local"),
            AttachmentRef::External(id) => write!(f, "{}", id),
        }
    }
}

/// Transit Gateway ルートテーブルのルート
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TgwRouteParams {
    pub name: String,
    /// ルートテーブルを関連付けるアタッチメント
    pub associate: AttachmentRef,
    /// ルートの転送先アタッチメント
    pub target: AttachmentRef,
    pub destination: Option<String>,
}

/// VPC ルートテーブルから Transit Gateway へのルート
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VpcRouteParams {
    pub tier: SubnetTier,
    /// 指定した場合はそのゾーンのルートテーブルのみ
    pub zone: Option<String>,
    pub destination: Option<String>,
}

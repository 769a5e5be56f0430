//! サブネット階層
//!
//! 階層ごとにルーティング方針とゲートウェイエンドポイントへの参加可否が決まる。

use crate::error::PlanError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetTier {
    Public,
    Private,
    Database,
    Isolated,
    TransitGatewayAttach,
}

/// 階層のデフォルトルート方針
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingPolicy {
    /// 0.0.0.0/0 をインターネットゲートウェイへ
    Internet,
    /// 0.0.0.0/0 をゾーンに対応する NAT ゲートウェイへ
    Nat,
    /// デフォルトルートなし
    None,
}

impl SubnetTier {
    pub const ALL: [SubnetTier; 5] = [
        SubnetTier::Public,
        SubnetTier::Private,
        SubnetTier::Database,
        SubnetTier::Isolated,
        SubnetTier::TransitGatewayAttach,
    ];

    pub fn routing_policy(self) -> RoutingPolicy {
        match self {
            SubnetTier::Public => RoutingPolicy::Internet,
            SubnetTier::Private => RoutingPolicy::Nat,
            SubnetTier::Database | SubnetTier::Isolated | SubnetTier::TransitGatewayAttach => {
                RoutingPolicy::None
            }
        }
    }

    /// S3 ゲートウェイエンドポイントのルートテーブル一覧に含めるか
    pub fn endpoint_eligible(self) -> bool {
        matches!(
            self,
            SubnetTier::Private | SubnetTier::Database | SubnetTier::Isolated
        )
    }

    /// KDL やコンテキストで使うキー
    pub fn key(self) -> &'static str {
        match self {
            SubnetTier::Public => "public",
            SubnetTier::Private => "private",
            SubnetTier::Database => "database",
            SubnetTier::Isolated => "isolated",
            SubnetTier::TransitGatewayAttach => "transit",
        }
    }

    /// リソース名に使うラベル
    pub fn label(self) -> &'static str {
        match self {
            SubnetTier::Public => "Public",
            SubnetTier::Private => "Private",
            SubnetTier::Database => "Database",
            SubnetTier::Isolated => "Isolated",
            SubnetTier::TransitGatewayAttach => "Transit",
        }
    }
}

impl fmt::Display for SubnetTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SubnetTier {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(SubnetTier::Public),
            "private" => Ok(SubnetTier::Private),
            "database" | "db" => Ok(SubnetTier::Database),
            "isolated" => Ok(SubnetTier::Isolated),
            "transit" | "tgw" | "transit-gateway" | "transit_gateway_attach" => {
                Ok(SubnetTier::TransitGatewayAttach)
            }
            other => Err(PlanError::UnknownTier(other.to_string())),
        }
    }
}

/// 要求された階層とその第3オクテットのオフセット
///
/// `offset` が `None` の場合はゾーン数から自動算出される。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRequest {
    pub tier: SubnetTier,
    pub offset: Option<u8>,
}

impl TierRequest {
    pub fn new(tier: SubnetTier, offset: u8) -> Self {
        Self {
            tier,
            offset: Some(offset),
        }
    }

    pub fn derived(tier: SubnetTier) -> Self {
        Self { tier, offset: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_policy() {
        assert_eq!(SubnetTier::Public.routing_policy(), RoutingPolicy::Internet);
        assert_eq!(SubnetTier::Private.routing_policy(), RoutingPolicy::Nat);
        assert_eq!(SubnetTier::Database.routing_policy(), RoutingPolicy::None);
        assert_eq!(
            SubnetTier::TransitGatewayAttach.routing_policy(),
            RoutingPolicy::None
        );
    }

    #[test]
    fn test_tier_from_str_aliases() {
        assert_eq!("db".parse::<SubnetTier>().unwrap(), SubnetTier::Database);
        assert_eq!(
            "tgw".parse::<SubnetTier>().unwrap(),
            SubnetTier::TransitGatewayAttach
        );
        assert!("dmz".parse::<SubnetTier>().is_err());
    }

    #[test]
    fn test_public_is_not_endpoint_eligible() {
        assert!(!SubnetTier::Public.endpoint_eligible());
        assert!(SubnetTier::Isolated.endpoint_eligible());
    }
}

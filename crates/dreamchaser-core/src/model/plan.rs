//! 宣言的なリソース計画
//!
//! `topology::assemble` が生成し、以降は変更されない。
//! エグゼキューターへの受け渡しは `synth` でテンプレートに変換して行う。

use super::network::NetworkBlock;
use super::tier::SubnetTier;
use super::zone::Zone;
use crate::ident::LogicalId;
use crate::nat::NatPlacement;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VpcPlan {
    pub name: String,
    pub region: String,
    pub network: NetworkBlock,
    pub vpc: VpcResource,
    pub zones: Vec<Zone>,
    pub internet_gateway: Option<InternetGateway>,
    pub nat: NatPlacement,
    pub nat_gateways: Vec<NatGateway>,
    pub subnets: Vec<Subnet>,
    pub endpoint: Option<GatewayEndpoint>,
    pub transit_gateway: Option<TransitGatewayPlan>,
    pub share: Option<OrgShare>,
    /// VPC ルートテーブルから Transit Gateway へのルート
    pub tgw_bound_routes: Vec<TgwBoundRoute>,
}

impl VpcPlan {
    pub fn subnets_of(&self, tier: SubnetTier) -> impl Iterator<Item = &Subnet> {
        self.subnets.iter().filter(move |s| s.tier == tier)
    }

    pub fn subnet(&self, tier: SubnetTier, zone_index: u8) -> Option<&Subnet> {
        self.subnets
            .iter()
            .find(|s| s.tier == tier && s.zone_index == zone_index)
    }

    pub fn tiers(&self) -> Vec<SubnetTier> {
        let mut tiers: Vec<SubnetTier> = Vec::new();
        for subnet in &self.subnets {
            if !tiers.contains(&subnet.tier) {
                tiers.push(subnet.tier);
            }
        }
        tiers
    }

    /// 宣言されるリソースの総数
    pub fn resource_count(&self) -> usize {
        let igw = self.internet_gateway.as_ref().map(|_| 2).unwrap_or(0);
        let subnets: usize = self
            .subnets
            .iter()
            .map(|s| 3 + usize::from(s.default_route.is_some()))
            .sum();
        let tgw = self
            .transit_gateway
            .as_ref()
            .map(TransitGatewayPlan::resource_count)
            .unwrap_or(0);

        1 + igw
            + self.nat_gateways.len() * 2
            + subnets
            + usize::from(self.endpoint.is_some())
            + tgw
            + usize::from(self.share.is_some())
            + self.tgw_bound_routes.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VpcResource {
    pub logical_id: LogicalId,
    pub cidr: String,
    pub enable_dns: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternetGateway {
    pub logical_id: LogicalId,
    /// VPCGatewayAttachment
    pub attachment_id: LogicalId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NatGateway {
    pub logical_id: LogicalId,
    pub eip_logical_id: LogicalId,
    pub zone_index: u8,
    /// 配置先のパブリックサブネット
    pub subnet: LogicalId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subnet {
    pub logical_id: LogicalId,
    pub tier: SubnetTier,
    pub zone_index: u8,
    pub zone_name: String,
    pub cidr: String,
    pub map_public_ip: bool,
    pub route_table: RouteTable,
    pub default_route: Option<DefaultRoute>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTable {
    pub logical_id: LogicalId,
    /// SubnetRouteTableAssociation
    pub association_id: LogicalId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultRoute {
    pub logical_id: LogicalId,
    pub target: RouteTarget,
    /// 先に作成されている必要があるリソース
    pub depends_on: Vec<LogicalId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteTarget {
    InternetGateway(LogicalId),
    NatGateway(LogicalId),
}

/// S3 ゲートウェイエンドポイント
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayEndpoint {
    pub logical_id: LogicalId,
    pub service_name: String,
    pub route_tables: Vec<LogicalId>,
    /// 許可する AWS 管理バケットの ARN
    pub allowed_resources: Vec<String>,
}

/// Transit Gateway の参照（同じテンプレート内か既存か）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitGatewayRef {
    Local(LogicalId),
    Existing(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitGatewayPlan {
    pub gateway: TransitGatewayRef,
    /// 作成する場合の設定（既存の場合は None）
    pub settings: Option<TransitGatewaySettings>,
    pub attachment: TgwAttachment,
    pub route_domain: String,
    pub route_tables: Vec<TgwRouteTable>,
}

impl TransitGatewayPlan {
    /// (アタッチメント, ルートテーブル, 宛先CIDR) の組
    pub fn route_triples(&self) -> Vec<(AttachmentTarget, LogicalId, String)> {
        self.route_tables
            .iter()
            .flat_map(|table| {
                table.routes.iter().map(move |route| {
                    (
                        route.attachment.clone(),
                        table.logical_id.clone(),
                        route.destination.clone(),
                    )
                })
            })
            .collect()
    }

    fn resource_count(&self) -> usize {
        let gateway = usize::from(self.settings.is_some());
        let tables: usize = self
            .route_tables
            .iter()
            .map(|t| 1 + t.associations.len() + t.routes.len())
            .sum();
        gateway + 1 + tables
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitGatewaySettings {
    pub amazon_side_asn: u32,
    pub auto_accept_shared_attachments: bool,
    pub default_route_table_association: bool,
    pub default_route_table_propagation: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TgwAttachment {
    pub logical_id: LogicalId,
    /// transit 階層の全ゾーンのサブネット
    pub subnets: Vec<LogicalId>,
}

/// ルートが参照するアタッチメント
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentTarget {
    Local(LogicalId),
    External(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TgwRouteTable {
    pub logical_id: LogicalId,
    pub associations: Vec<TgwAssociation>,
    pub routes: Vec<TgwRoute>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TgwAssociation {
    pub logical_id: LogicalId,
    pub attachment: AttachmentTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TgwRoute {
    pub logical_id: LogicalId,
    pub destination: String,
    pub attachment: AttachmentTarget,
}

/// Transit Gateway を宛先とする VPC ルート
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TgwBoundRoute {
    pub logical_id: LogicalId,
    pub route_table: LogicalId,
    pub destination: String,
    pub gateway: TransitGatewayRef,
    /// アタッチメントの完了後に作成する
    pub depends_on: Vec<LogicalId>,
}

/// Transit Gateway の OU への共有（RAM）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgShare {
    pub logical_id: LogicalId,
    pub name: String,
    pub principal: String,
    pub gateway: LogicalId,
}

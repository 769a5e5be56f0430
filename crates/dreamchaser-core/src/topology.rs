//! トポロジー組み立て
//!
//! CIDR アロケーターとゾーン展開プランナーを組み合わせて `VpcPlan` を作る。
//! 後の手順が前の手順の論理IDを参照するため、手順の順序に意味がある。
//! 前提条件の不足はすべてここで設定エラーになり、
//! 部分的な計画は返さない。

use crate::cidr::{allocate, check_headroom, check_layout, derived_offset};
use crate::error::{PlanError, Result};
use crate::ident::{IdKey, LogicalId};
use crate::model::{
    AttachmentRef, AttachmentTarget, DEFAULT_TGW_ASN, DefaultRoute, GatewayEndpoint,
    InternetGateway, NatGateway, NetworkBlock, OrgShare, RouteTable, RouteTarget, ShareTarget,
    Subnet, SubnetTier, TgwAttachment, TgwBoundRoute, TopologyVariant, TransitGatewayParams,
    TransitGatewayPlan, TransitGatewayRef, TransitGatewaySettings, TransitGatewaySource,
    VpcParams, VpcPlan, VpcResource, Zone, parse_ipv4_cidr,
};
use crate::nat::plan_nat_strategy;
use crate::route_domain::{FlatRouteDomain, ResolvedTgwRoute, RouteDomainStrategy};
use ipnetwork::Ipv4Network;
use std::collections::HashSet;

/// S3 ゲートウェイエンドポイントで許可する AWS 管理バケット
///
/// CloudWatch エージェント、パッチベースライン、SSM、birdwatcher、
/// starport レイヤーのバケット。`{region}` はデプロイ先リージョンに置換する。
const ENDPOINT_BUCKET_PATTERNS: &[&str] = &[
    "arn:aws:s3:::amazoncloudwatch-agent-{region}/*",
    "arn:aws:s3:::amazoncloudwatch-agent/*",
    "arn:aws:s3:::patch-baseline-snapshot-{region}/*",
    "arn:aws:s3:::aws-patchmanager-macos-{region}/*",
    "arn:aws:s3:::aws-ssm-{region}/*",
    "arn:aws:s3:::amazon-ssm-{region}/*",
    "arn:aws:s3:::amazon-ssm-packages-{region}/*",
    "arn:aws:s3:::aws-windows-downloads-{region}/*",
    "arn:aws:s3:::{region}-birdwatcher-prod/*",
    "arn:aws:s3:::prod-{region}-starport-layer-bucket/*",
];

/// リージョンに対応したエンドポイントの許可リスト
pub fn endpoint_allowed_resources(region: &str) -> Vec<String> {
    ENDPOINT_BUCKET_PATTERNS
        .iter()
        .map(|pattern| pattern.replace("{region}", region))
        .collect()
}

/// フラットなルートドメインで計画を組み立てる
pub fn assemble(params: &VpcParams) -> Result<VpcPlan> {
    assemble_with(params, &FlatRouteDomain)
}

/// ルートドメイン戦略を指定して計画を組み立てる
pub fn assemble_with(
    params: &VpcParams,
    route_domain: &dyn RouteDomainStrategy,
) -> Result<VpcPlan> {
    let zones = Zone::list(&params.zones)?;
    let vpc_network = parse_ipv4_cidr(&params.cidr)?;
    let network = NetworkBlock::from_network(&vpc_network);
    if params.mask > 32 {
        return Err(PlanError::MaskOutOfRange(params.mask));
    }

    let tiers = resolve_tiers(params, zones.len())?;
    let has_tier = |tier: SubnetTier| tiers.iter().any(|(t, _)| *t == tier);
    let has_public = has_tier(SubnetTier::Public);

    if has_public && !params.enable_internet {
        return Err(PlanError::PublicWithoutInternet);
    }
    if params.enable_internet && !has_public {
        return Err(PlanError::InternetWithoutPublic);
    }
    match (&params.transit_gateway, has_tier(SubnetTier::TransitGatewayAttach)) {
        (Some(_), false) => return Err(PlanError::MissingTransitTier),
        (None, true) => return Err(PlanError::TransitTierWithoutGateway),
        _ => {}
    }
    if params.transit_gateway.is_none() {
        if let Some(route) = params.tgw_routes.first() {
            return Err(PlanError::RouteWithoutGateway(route.name.clone()));
        }
        if let Some(route) = params.vpc_routes.first() {
            return Err(PlanError::RouteWithoutGateway(route.tier.to_string()));
        }
    }

    let scope = params.name.as_str();
    tracing::debug!(
        vpc = scope,
        cidr = %vpc_network,
        zones = zones.len(),
        variant = %params.variant,
        "assembling VPC plan"
    );

    // 1. VPC 本体とインターネットゲートウェイ
    let vpc = VpcResource {
        logical_id: IdKey::new(scope, "Vpc").logical_id(),
        cidr: vpc_network.to_string(),
        enable_dns: params.enable_dns,
    };
    let internet_gateway = params.enable_internet.then(|| InternetGateway {
        logical_id: IdKey::new(scope, "InternetGateway").logical_id(),
        attachment_id: IdKey::new(scope, "GatewayAttachment").logical_id(),
    });

    // 2. NAT の配置
    let nat = plan_nat_strategy(zones.len(), params.vpc_ha, params.enable_nat, has_public)?;
    let nat_gateways: Vec<NatGateway> = nat
        .gateway_zones
        .iter()
        .map(|zone_index| {
            let zone = &zones[*zone_index as usize];
            NatGateway {
                logical_id: IdKey::new(scope, "NatGateway").zone(zone).logical_id(),
                eip_logical_id: IdKey::new(scope, "Eip").zone(zone).logical_id(),
                zone_index: *zone_index,
                subnet: subnet_id(scope, SubnetTier::Public, zone),
            }
        })
        .collect();

    // 3. 階層 x ゾーンのサブネット
    let mut allocated: Vec<Ipv4Network> = Vec::new();
    let mut subnets = Vec::new();
    for (tier, offset) in &tiers {
        check_headroom(&network, *offset, zones.len())?;
        for zone in &zones {
            let cidr = allocate(&network, *offset, zone.index, params.mask)?;
            allocated.push(cidr);

            let default_route = match tier.routing_policy() {
                crate::model::RoutingPolicy::Internet => {
                    internet_gateway.as_ref().map(|igw| DefaultRoute {
                        logical_id: IdKey::new(scope, "DefaultRoute")
                            .tier(*tier)
                            .zone(zone)
                            .logical_id(),
                        target: RouteTarget::InternetGateway(igw.logical_id.clone()),
                        depends_on: vec![igw.attachment_id.clone()],
                    })
                }
                crate::model::RoutingPolicy::Nat => {
                    nat.gateway_for_zone(zone.index).map(|gateway| DefaultRoute {
                        logical_id: IdKey::new(scope, "DefaultRoute")
                            .tier(*tier)
                            .zone(zone)
                            .logical_id(),
                        target: RouteTarget::NatGateway(nat_gateways[gateway].logical_id.clone()),
                        depends_on: Vec::new(),
                    })
                }
                crate::model::RoutingPolicy::None => None,
            };

            subnets.push(Subnet {
                logical_id: subnet_id(scope, *tier, zone),
                tier: *tier,
                zone_index: zone.index,
                zone_name: zone.name.clone(),
                cidr: cidr.to_string(),
                map_public_ip: *tier == SubnetTier::Public,
                route_table: RouteTable {
                    logical_id: IdKey::new(scope, "RouteTable")
                        .tier(*tier)
                        .zone(zone)
                        .logical_id(),
                    association_id: IdKey::new(scope, "RouteTableAssociation")
                        .tier(*tier)
                        .zone(zone)
                        .logical_id(),
                },
                default_route,
            });
        }
    }
    check_layout(&vpc_network, &allocated)?;

    // 4. S3 ゲートウェイエンドポイント
    let endpoint = if params.enable_endpoint {
        Some(plan_endpoint(scope, &params.region, &subnets)?)
    } else {
        None
    };

    // 5-7. Transit Gateway、アタッチメント、ルートドメイン
    let transit_gateway = match &params.transit_gateway {
        Some(tgw) => Some(plan_transit_gateway(
            scope,
            params,
            tgw,
            &subnets,
            route_domain,
        )?),
        None => None,
    };

    // 8. VPC ルートテーブルから Transit Gateway へのルート
    let tgw_bound_routes = match &transit_gateway {
        Some(tgw) => plan_tgw_bound_routes(scope, params, &zones, &subnets, tgw)?,
        None => Vec::new(),
    };

    // 9. OU への共有
    let share = match (&params.transit_gateway, &transit_gateway) {
        (Some(tgw_params), Some(tgw)) => plan_share(scope, tgw_params, tgw)?,
        _ => None,
    };

    let plan = VpcPlan {
        name: params.name.clone(),
        region: params.region.clone(),
        network,
        vpc,
        zones,
        internet_gateway,
        nat,
        nat_gateways,
        subnets,
        endpoint,
        transit_gateway,
        share,
        tgw_bound_routes,
    };

    tracing::debug!(
        vpc = scope,
        resources = plan.resource_count(),
        "assembled VPC plan"
    );
    Ok(plan)
}

fn subnet_id(scope: &str, tier: SubnetTier, zone: &Zone) -> LogicalId {
    IdKey::new(scope, "Subnet").tier(tier).zone(zone).logical_id()
}

/// 要求された階層とオフセットを確定する
fn resolve_tiers(params: &VpcParams, zone_count: usize) -> Result<Vec<(SubnetTier, u8)>> {
    let requests = if params.tiers.is_empty() {
        match params.variant {
            TopologyVariant::Easy => {
                let mut tiers = Vec::new();
                // NAT だけではパブリック階層を作らない
                if params.enable_internet {
                    tiers.push(crate::model::TierRequest::derived(SubnetTier::Public));
                }
                tiers.push(crate::model::TierRequest::derived(SubnetTier::Private));
                tiers.push(crate::model::TierRequest::derived(SubnetTier::Isolated));
                if params.transit_gateway.is_some() {
                    tiers.push(crate::model::TierRequest::derived(
                        SubnetTier::TransitGatewayAttach,
                    ));
                }
                tiers
            }
            TopologyVariant::Explicit => {
                return Err(PlanError::InvalidConfig(format!(
                    "VPC '{}' uses the explicit variant but requests no tiers",
                    params.name
                )));
            }
        }
    } else {
        params.tiers.clone()
    };

    let mut seen = HashSet::new();
    requests
        .into_iter()
        .map(|request| {
            if !seen.insert(request.tier) {
                return Err(PlanError::DuplicateTier(request.tier.to_string()));
            }
            let offset = match request.offset {
                Some(offset) => offset,
                None => derived_offset(request.tier, zone_count)?,
            };
            Ok((request.tier, offset))
        })
        .collect()
}

fn plan_endpoint(scope: &str, region: &str, subnets: &[Subnet]) -> Result<GatewayEndpoint> {
    if region.is_empty() {
        return Err(PlanError::InvalidConfig(
            "a region is required for the S3 gateway endpoint".to_string(),
        ));
    }

    let route_tables: Vec<LogicalId> = subnets
        .iter()
        .filter(|s| s.tier.endpoint_eligible())
        .map(|s| s.route_table.logical_id.clone())
        .collect();
    if route_tables.is_empty() {
        return Err(PlanError::EndpointWithoutRouteTables);
    }

    Ok(GatewayEndpoint {
        logical_id: IdKey::new(scope, "S3Endpoint").logical_id(),
        service_name: format!("com.amazonaws.{}.s3", region),
        route_tables,
        allowed_resources: endpoint_allowed_resources(region),
    })
}

fn plan_transit_gateway(
    scope: &str,
    params: &VpcParams,
    tgw: &TransitGatewayParams,
    subnets: &[Subnet],
    route_domain: &dyn RouteDomainStrategy,
) -> Result<TransitGatewayPlan> {
    let (gateway, settings) = match &tgw.source {
        TransitGatewaySource::Create { asn, description } => (
            TransitGatewayRef::Local(IdKey::new(scope, "TransitGateway").logical_id()),
            Some(TransitGatewaySettings {
                amazon_side_asn: asn.unwrap_or(DEFAULT_TGW_ASN),
                auto_accept_shared_attachments: true,
                default_route_table_association: false,
                default_route_table_propagation: false,
                description: description.clone(),
            }),
        ),
        TransitGatewaySource::Existing { id } => (TransitGatewayRef::Existing(id.clone()), None),
    };

    let attachment = TgwAttachment {
        logical_id: IdKey::new(scope, "TgwAttachment").logical_id(),
        subnets: subnets
            .iter()
            .filter(|s| s.tier == SubnetTier::TransitGatewayAttach)
            .map(|s| s.logical_id.clone())
            .collect(),
    };

    let to_target = |reference: &AttachmentRef| match reference {
        AttachmentRef::Local => AttachmentTarget::Local(attachment.logical_id.clone()),
        AttachmentRef::External(id) => AttachmentTarget::External(id.clone()),
    };

    let resolved = params
        .tgw_routes
        .iter()
        .map(|route| {
            let destination =
                resolve_destination(&route.name, route.destination.as_deref(), params)?;
            Ok(ResolvedTgwRoute {
                name: route.name.clone(),
                associate: to_target(&route.associate),
                target: to_target(&route.target),
                destination,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let route_tables = route_domain.route_tables(scope, &attachment.logical_id, &resolved)?;

    Ok(TransitGatewayPlan {
        gateway,
        settings,
        attachment,
        route_domain: route_domain.name().to_string(),
        route_tables,
    })
}

fn plan_tgw_bound_routes(
    scope: &str,
    params: &VpcParams,
    zones: &[Zone],
    subnets: &[Subnet],
    tgw: &TransitGatewayPlan,
) -> Result<Vec<TgwBoundRoute>> {
    let mut routes = Vec::new();
    let mut seen = HashSet::new();

    for request in &params.vpc_routes {
        let label = match &request.zone {
            Some(zone) => format!("{}@{}", request.tier, zone),
            None => request.tier.to_string(),
        };
        if !subnets.iter().any(|s| s.tier == request.tier) {
            return Err(PlanError::RouteTierNotRequested {
                route: label,
                tier: request.tier.to_string(),
            });
        }
        if let Some(zone) = &request.zone
            && !zones.iter().any(|z| &z.name == zone)
        {
            return Err(PlanError::UnknownZone(zone.clone()));
        }
        let destination = resolve_destination(&label, request.destination.as_deref(), params)?;

        for subnet in subnets.iter().filter(|s| {
            s.tier == request.tier
                && request
                    .zone
                    .as_ref()
                    .is_none_or(|zone| &s.zone_name == zone)
        }) {
            if destination == "0.0.0.0/0" && subnet.default_route.is_some() {
                return Err(PlanError::InvalidConfig(format!(
                    "route '{}' conflicts with the default route of {}",
                    label, subnet.logical_id
                )));
            }

            let zone = &zones[subnet.zone_index as usize];
            let logical_id = IdKey::new(scope, "TgwRoute")
                .tier(subnet.tier)
                .zone(zone)
                .qualifier(&destination)
                .logical_id();
            if !seen.insert(logical_id.clone()) {
                return Err(PlanError::InvalidConfig(format!(
                    "destination {} is routed twice from {}",
                    destination, subnet.route_table.logical_id
                )));
            }

            routes.push(TgwBoundRoute {
                logical_id,
                route_table: subnet.route_table.logical_id.clone(),
                destination: destination.clone(),
                gateway: tgw.gateway.clone(),
                depends_on: vec![tgw.attachment.logical_id.clone()],
            });
        }
    }

    Ok(routes)
}

fn plan_share(
    scope: &str,
    params: &TransitGatewayParams,
    tgw: &TransitGatewayPlan,
) -> Result<Option<OrgShare>> {
    let principal = match &params.share_with {
        None => return Ok(None),
        Some(ShareTarget::FromParameter(name)) => {
            return Err(PlanError::UnresolvedShareTarget(name.clone()));
        }
        Some(ShareTarget::Principal(principal)) => principal.clone(),
    };

    match &tgw.gateway {
        TransitGatewayRef::Local(gateway) => {
            let key = IdKey::new(scope, "TgwShare");
            Ok(Some(OrgShare {
                logical_id: key.logical_id(),
                name: key.resource_name(),
                principal,
                gateway: gateway.clone(),
            }))
        }
        TransitGatewayRef::Existing(id) => Err(PlanError::ShareExistingGateway(id.clone())),
    }
}

fn resolve_destination(route: &str, explicit: Option<&str>, params: &VpcParams) -> Result<String> {
    let destination = explicit
        .or(params.tgw_destination.as_deref())
        .ok_or_else(|| PlanError::MissingDestination(route.to_string()))?;
    Ok(parse_ipv4_cidr(destination)?.to_string())
}

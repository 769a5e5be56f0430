//! vpc ノードのパース

use super::{
    first_string, flag, integer, node_label, prop_integer, prop_string, require_string,
    string_args,
};
use crate::error::{PlanError, Result};
use crate::model::{
    AttachmentRef, ShareTarget, SubnetTier, TgwRouteParams, TierRequest, TopologyVariant,
    TransitGatewayParams, TransitGatewaySource, VpcParams, VpcRouteParams,
};
use kdl::KdlNode;

/// vpc ノードをパース
///
/// `variant` で既定値が変わるため、先に variant を読んでから他の子ノードを適用する。
pub fn parse_vpc(node: &KdlNode) -> Result<VpcParams> {
    let name = node_label(node)?;

    let variant = match node
        .children()
        .and_then(|c| c.nodes().iter().find(|n| n.name().value() == "variant"))
    {
        Some(variant) => require_string(variant)?.parse::<TopologyVariant>()?,
        None => TopologyVariant::Easy,
    };

    let mut vpc = match variant {
        TopologyVariant::Easy => VpcParams::easy(&name, "", "", Vec::new()),
        TopologyVariant::Explicit => VpcParams::explicit(&name, "", "", Vec::new()),
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "variant" => {}
                "cidr" => vpc.cidr = require_string(child)?,
                "region" => vpc.region = require_string(child)?,
                "zones" => vpc.zones = string_args(child),
                "mask" => vpc.mask = integer(child)?,
                "dns" => vpc.enable_dns = flag(child)?,
                "internet" => vpc.enable_internet = flag(child)?,
                "nat" => vpc.enable_nat = flag(child)?,
                "ha" => vpc.vpc_ha = flag(child)?,
                "endpoint" => vpc.enable_endpoint = flag(child)?,
                "tier" => vpc.tiers.push(parse_tier(child)?),
                "transit-gateway" => {
                    vpc.transit_gateway = Some(parse_transit_gateway(child)?);
                }
                "tgw-destination" => vpc.tgw_destination = Some(require_string(child)?),
                "tgw-route" => vpc.tgw_routes.push(parse_tgw_route(child)?),
                "route" => vpc.vpc_routes.push(parse_vpc_route(child)?),
                other => {
                    return Err(PlanError::InvalidConfig(format!(
                        "vpc '{}': unknown setting '{}'",
                        name, other
                    )));
                }
            }
        }
    }

    Ok(vpc)
}

/// `tier "public" offset=16`
fn parse_tier(node: &KdlNode) -> Result<TierRequest> {
    let tier: SubnetTier = require_string(node)?.parse()?;
    let offset = prop_integer::<u8>(node, "offset")?;
    Ok(TierRequest { tier, offset })
}

fn parse_transit_gateway(node: &KdlNode) -> Result<TransitGatewayParams> {
    let mut asn = None;
    let mut description = None;
    let mut existing = None;
    let mut share_with = None;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "asn" => asn = Some(integer::<u32>(child)?),
                "description" => description = first_string(child),
                "existing" => existing = Some(require_string(child)?),
                "share-with" => share_with = Some(ShareTarget::Principal(require_string(child)?)),
                "share-with-parameter" => {
                    share_with = Some(ShareTarget::FromParameter(require_string(child)?));
                }
                other => {
                    return Err(PlanError::InvalidConfig(format!(
                        "transit-gateway: unknown setting '{}'",
                        other
                    )));
                }
            }
        }
    }

    let source = match existing {
        Some(id) => {
            if asn.is_some() || description.is_some() {
                return Err(PlanError::InvalidConfig(
                    "transit-gateway: asn/description cannot be combined with existing".to_string(),
                ));
            }
            TransitGatewaySource::Existing { id }
        }
        None => TransitGatewaySource::Create { asn, description },
    };

    Ok(TransitGatewayParams { source, share_with })
}

/// `tgw-route "hub" associate="local" target="tgw-attach-0abc" destination="10.1.0.0/16"`
fn parse_tgw_route(node: &KdlNode) -> Result<TgwRouteParams> {
    let name = node_label(node)?;
    let target = prop_string(node, "target").ok_or_else(|| {
        PlanError::InvalidConfig(format!("tgw-route '{}' requires target=", name))
    })?;
    let associate = prop_string(node, "associate").unwrap_or_else(|| "local".to_string());

    Ok(TgwRouteParams {
        name,
        associate: AttachmentRef::parse(&associate),
        target: AttachmentRef::parse(&target),
        destination: prop_string(node, "destination"),
    })
}

/// `route tier="private" zone="ap-southeast-2a" destination="10.1.0.0/16"`
fn parse_vpc_route(node: &KdlNode) -> Result<VpcRouteParams> {
    let tier = prop_string(node, "tier")
        .ok_or_else(|| PlanError::InvalidConfig("route requires tier=".to_string()))?
        .parse()?;

    Ok(VpcRouteParams {
        tier,
        zone: prop_string(node, "zone"),
        destination: prop_string(node, "destination"),
    })
}

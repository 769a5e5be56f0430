//! テンプレート合成
//!
//! `VpcPlan` を CloudFormation テンプレートに変換する。
//! プロパティは serde_json の Map（キー順ソート）で組み立てるため、
//! 同じ計画からは常にバイト単位で同じ JSON が得られる。

use crate::error::Result;
use crate::ident::LogicalId;
use crate::model::{AttachmentTarget, RouteTarget, Subnet, TransitGatewayRef, VpcPlan};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,

    #[serde(rename = "Description")]
    pub description: String,

    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, TemplateResource>,

    #[serde(
        rename = "Outputs",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub outputs: BTreeMap<String, TemplateOutput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(rename = "Properties")]
    pub properties: Value,

    #[serde(rename = "DependsOn", default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateOutput {
    #[serde(rename = "Description")]
    pub description: String,

    #[serde(rename = "Value")]
    pub value: Value,

    #[serde(rename = "Export", default, skip_serializing_if = "Option::is_none")]
    pub export: Option<Value>,
}

impl Template {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a TemplateResource)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }
}

struct Builder<'a> {
    plan: &'a VpcPlan,
    resources: BTreeMap<String, TemplateResource>,
    outputs: BTreeMap<String, TemplateOutput>,
}

impl<'a> Builder<'a> {
    fn add(
        &mut self,
        id: &LogicalId,
        resource_type: &str,
        properties: Value,
        depends_on: &[LogicalId],
    ) {
        self.resources.insert(
            id.to_string(),
            TemplateResource {
                resource_type: resource_type.to_string(),
                properties,
                depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
            },
        );
    }

    fn output(&mut self, key: &str, description: String, value: Value) {
        self.outputs.insert(
            key.to_string(),
            TemplateOutput {
                description,
                value,
                export: Some(json!({
                    "Name": { "Fn::Sub": format!("${{AWS::StackName}}-{}", key) }
                })),
            },
        );
    }

    fn tags(&self, name: &str) -> Value {
        json!([
            { "Key": "Name", "Value": format!("{}/{}", self.plan.name, name) },
            { "Key": "dreamchaser:vpc", "Value": self.plan.name },
        ])
    }

    fn subnet_name(subnet: &Subnet) -> String {
        format!("{}Subnet{}", subnet.tier.label(), subnet.zone_index as u16 + 1)
    }
}

fn reference(id: &LogicalId) -> Value {
    json!({ "Ref": id.as_str() })
}

fn gateway_value(gateway: &TransitGatewayRef) -> Value {
    match gateway {
        TransitGatewayRef::Local(id) => reference(id),
        TransitGatewayRef::Existing(id) => json!(id),
    }
}

fn attachment_value(target: &AttachmentTarget) -> Value {
    match target {
        AttachmentTarget::Local(id) => reference(id),
        AttachmentTarget::External(id) => json!(id),
    }
}

/// 計画をテンプレートに変換
pub fn synthesize(plan: &VpcPlan) -> Template {
    let mut b = Builder {
        plan,
        resources: BTreeMap::new(),
        outputs: BTreeMap::new(),
    };
    let vpc_ref = reference(&plan.vpc.logical_id);

    b.add(
        &plan.vpc.logical_id,
        "AWS::EC2::VPC",
        json!({
            "CidrBlock": plan.vpc.cidr,
            "EnableDnsHostnames": plan.vpc.enable_dns,
            "EnableDnsSupport": plan.vpc.enable_dns,
            "InstanceTenancy": "default",
            "Tags": b.tags("Vpc"),
        }),
        &[],
    );
    b.output("VpcId", format!("VPC {}", plan.name), vpc_ref.clone());

    if let Some(igw) = &plan.internet_gateway {
        b.add(
            &igw.logical_id,
            "AWS::EC2::InternetGateway",
            json!({ "Tags": b.tags("InternetGateway") }),
            &[],
        );
        b.add(
            &igw.attachment_id,
            "AWS::EC2::VPCGatewayAttachment",
            json!({
                "InternetGatewayId": reference(&igw.logical_id),
                "VpcId": vpc_ref,
            }),
            &[],
        );
    }

    for subnet in &plan.subnets {
        let name = Builder::subnet_name(subnet);
        b.add(
            &subnet.logical_id,
            "AWS::EC2::Subnet",
            json!({
                "AvailabilityZone": subnet.zone_name,
                "CidrBlock": subnet.cidr,
                "MapPublicIpOnLaunch": subnet.map_public_ip,
                "VpcId": vpc_ref,
                "Tags": [
                    { "Key": "Name", "Value": format!("{}/{}", plan.name, name) },
                    { "Key": "dreamchaser:subnet-tier", "Value": subnet.tier.key() },
                    { "Key": "dreamchaser:vpc", "Value": plan.name },
                ],
            }),
            &[],
        );
        b.add(
            &subnet.route_table.logical_id,
            "AWS::EC2::RouteTable",
            json!({ "VpcId": vpc_ref, "Tags": b.tags(&format!("{}RouteTable", name)) }),
            &[],
        );
        b.add(
            &subnet.route_table.association_id,
            "AWS::EC2::SubnetRouteTableAssociation",
            json!({
                "RouteTableId": reference(&subnet.route_table.logical_id),
                "SubnetId": reference(&subnet.logical_id),
            }),
            &[],
        );

        if let Some(route) = &subnet.default_route {
            let mut properties = json!({
                "DestinationCidrBlock": "0.0.0.0/0",
                "RouteTableId": reference(&subnet.route_table.logical_id),
            });
            let (key, value) = match &route.target {
                RouteTarget::InternetGateway(id) => ("GatewayId", reference(id)),
                RouteTarget::NatGateway(id) => ("NatGatewayId", reference(id)),
            };
            properties[key] = value;
            b.add(&route.logical_id, "AWS::EC2::Route", properties, &route.depends_on);
        }

        b.output(
            &format!("{}Id", name),
            format!("{} subnet in {}", subnet.tier, subnet.zone_name),
            reference(&subnet.logical_id),
        );
        b.output(
            &format!("{}RouteTableId", name),
            format!("Route table of {} subnet in {}", subnet.tier, subnet.zone_name),
            reference(&subnet.route_table.logical_id),
        );
    }

    for (i, nat) in plan.nat_gateways.iter().enumerate() {
        b.add(
            &nat.eip_logical_id,
            "AWS::EC2::EIP",
            json!({ "Domain": "vpc", "Tags": b.tags(&format!("NatEip{}", i + 1)) }),
            &[],
        );
        // NAT はパブリックサブネットのデフォルトルートができてから作る
        let depends_on: Vec<LogicalId> = plan
            .subnets
            .iter()
            .find(|s| s.logical_id == nat.subnet)
            .and_then(|s| s.default_route.as_ref())
            .map(|r| vec![r.logical_id.clone()])
            .unwrap_or_default();
        b.add(
            &nat.logical_id,
            "AWS::EC2::NatGateway",
            json!({
                "AllocationId": { "Fn::GetAtt": [nat.eip_logical_id.as_str(), "AllocationId"] },
                "SubnetId": reference(&nat.subnet),
                "Tags": b.tags(&format!("NatGateway{}", i + 1)),
            }),
            &depends_on,
        );
        b.output(
            &format!("NatGateway{}Id", i + 1),
            format!("NAT gateway in {}", plan.zones[nat.zone_index as usize].name),
            reference(&nat.logical_id),
        );
    }

    if let Some(endpoint) = &plan.endpoint {
        let route_tables: Vec<Value> = endpoint.route_tables.iter().map(reference).collect();
        b.add(
            &endpoint.logical_id,
            "AWS::EC2::VPCEndpoint",
            json!({
                "PolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Action": ["s3:GetObject"],
                        "Effect": "Allow",
                        "Principal": "*",
                        "Resource": endpoint.allowed_resources,
                    }],
                },
                "RouteTableIds": route_tables,
                "ServiceName": endpoint.service_name,
                "VpcEndpointType": "Gateway",
                "VpcId": vpc_ref,
            }),
            &[],
        );
    }

    if let Some(tgw) = &plan.transit_gateway {
        if let (TransitGatewayRef::Local(id), Some(settings)) = (&tgw.gateway, &tgw.settings) {
            let enable = |flag: bool| if flag { "enable" } else { "disable" };
            let mut properties = json!({
                "AmazonSideAsn": settings.amazon_side_asn,
                "AutoAcceptSharedAttachments": enable(settings.auto_accept_shared_attachments),
                "DefaultRouteTableAssociation": enable(settings.default_route_table_association),
                "DefaultRouteTablePropagation": enable(settings.default_route_table_propagation),
                "Tags": b.tags("TransitGateway"),
            });
            if let Some(description) = &settings.description {
                properties["Description"] = json!(description);
            }
            b.add(id, "AWS::EC2::TransitGateway", properties, &[]);
            b.output(
                "TransitGatewayId",
                "Transit gateway".to_string(),
                reference(id),
            );
        }

        let subnets: Vec<Value> = tgw.attachment.subnets.iter().map(reference).collect();
        b.add(
            &tgw.attachment.logical_id,
            "AWS::EC2::TransitGatewayAttachment",
            json!({
                "SubnetIds": subnets,
                "TransitGatewayId": gateway_value(&tgw.gateway),
                "VpcId": vpc_ref,
                "Tags": b.tags("TransitGatewayAttachment"),
            }),
            &[],
        );
        b.output(
            "TransitGatewayAttachmentId",
            "Transit gateway attachment".to_string(),
            reference(&tgw.attachment.logical_id),
        );

        for (i, table) in tgw.route_tables.iter().enumerate() {
            b.add(
                &table.logical_id,
                "AWS::EC2::TransitGatewayRouteTable",
                json!({
                    "TransitGatewayId": gateway_value(&tgw.gateway),
                    "Tags": b.tags(&format!("TransitGatewayRouteTable{}", i + 1)),
                }),
                &[],
            );
            for association in &table.associations {
                b.add(
                    &association.logical_id,
                    "AWS::EC2::TransitGatewayRouteTableAssociation",
                    json!({
                        "TransitGatewayAttachmentId": attachment_value(&association.attachment),
                        "TransitGatewayRouteTableId": reference(&table.logical_id),
                    }),
                    &[],
                );
            }
            for route in &table.routes {
                b.add(
                    &route.logical_id,
                    "AWS::EC2::TransitGatewayRoute",
                    json!({
                        "DestinationCidrBlock": route.destination,
                        "TransitGatewayAttachmentId": attachment_value(&route.attachment),
                        "TransitGatewayRouteTableId": reference(&table.logical_id),
                    }),
                    &[],
                );
            }
            let key = if i == 0 {
                "TransitGatewayRouteTableId".to_string()
            } else {
                format!("TransitGatewayRouteTable{}Id", i + 1)
            };
            b.output(
                &key,
                format!("Transit gateway route table ({})", tgw.route_domain),
                reference(&table.logical_id),
            );
        }
    }

    for route in &plan.tgw_bound_routes {
        b.add(
            &route.logical_id,
            "AWS::EC2::Route",
            json!({
                "DestinationCidrBlock": route.destination,
                "RouteTableId": reference(&route.route_table),
                "TransitGatewayId": gateway_value(&route.gateway),
            }),
            &route.depends_on,
        );
    }

    if let Some(share) = &plan.share {
        b.add(
            &share.logical_id,
            "AWS::RAM::ResourceShare",
            json!({
                "AllowExternalPrincipals": false,
                "Name": share.name,
                "Principals": [share.principal],
                "ResourceArns": [{
                    "Fn::Sub": format!(
                        "arn:${{AWS::Partition}}:ec2:${{AWS::Region}}:${{AWS::AccountId}}:transit-gateway/${{{}}}",
                        share.gateway
                    )
                }],
            }),
            &[],
        );
    }

    Template {
        format_version: TEMPLATE_FORMAT_VERSION.to_string(),
        description: format!(
            "DreamChaser VPC {} ({}, {} zones)",
            plan.name,
            plan.vpc.cidr,
            plan.zones.len()
        ),
        resources: b.resources,
        outputs: b.outputs,
    }
}

use super::*;
use crate::model::{
    AttachmentRef, ShareTarget, SubnetTier, TierRequest, TopologyVariant, TransitGatewaySource,
};
use crate::topology::assemble;

#[test]
fn test_parse_project_header() {
    let kdl = r#"
        project "dreamchaser"
        account "123456789012"
        region "ap-southeast-2"
    "#;

    let project = parse_kdl_string(kdl, "test".to_string()).unwrap();
    assert_eq!(project.name, "dreamchaser");
    assert_eq!(project.account.as_deref(), Some("123456789012"));
    assert_eq!(project.region.as_deref(), Some("ap-southeast-2"));
    assert!(project.vpcs.is_empty());
    // organization は既定値
    assert_eq!(project.organization.unit, "dreamchaser");
    assert_eq!(project.organization.parameter, "DC_ONE_OU_ID");
}

#[test]
fn test_parse_easy_vpc_defaults() {
    let kdl = r#"
        vpc "main" {
            cidr "10.0.0.0/16"
            zones "ap-southeast-2a" "ap-southeast-2b" "ap-southeast-2c"
        }
    "#;

    let project = parse_kdl_string(kdl, "test".to_string()).unwrap();
    let vpc = project.vpc(None).unwrap();
    assert_eq!(vpc.name, "main");
    assert_eq!(vpc.variant, TopologyVariant::Easy);
    assert_eq!(vpc.zones.len(), 3);
    assert_eq!(vpc.mask, 24);
    assert!(vpc.enable_internet);
    assert!(vpc.enable_nat);
    assert!(!vpc.vpc_ha);
    assert!(vpc.tiers.is_empty());
}

#[test]
fn test_parse_explicit_vpc() {
    let kdl = r#"
        vpc "main" {
            variant "explicit"
            cidr "10.0.0.0/16"
            region "ap-southeast-2"
            zones "ap-southeast-2a" "ap-southeast-2b" "ap-southeast-2c"
            internet #true
            nat
            ha #true
            endpoint #true
            tier "public" offset=16
            tier "private" offset=64
            tier "isolated"
        }
    "#;

    let project = parse_kdl_string(kdl, "test".to_string()).unwrap();
    let vpc = project.vpc(Some("main")).unwrap();
    assert_eq!(vpc.variant, TopologyVariant::Explicit);
    assert!(vpc.enable_internet);
    // 引数なしは true
    assert!(vpc.enable_nat);
    assert!(vpc.vpc_ha);
    assert!(vpc.enable_endpoint);
    assert_eq!(
        vpc.tiers,
        vec![
            TierRequest::new(SubnetTier::Public, 16),
            TierRequest::new(SubnetTier::Private, 64),
            TierRequest::derived(SubnetTier::Isolated),
        ]
    );

    let plan = assemble(vpc).unwrap();
    assert_eq!(plan.nat_gateways.len(), 3);
    assert_eq!(plan.subnets.len(), 9);
}

#[test]
fn test_parse_explicit_vpc_defaults_to_no_gateways() {
    let kdl = r#"
        vpc "isolated-only" {
            variant "explicit"
            cidr "10.9.0.0/16"
            zones "a"
            tier "isolated" offset=0
        }
    "#;

    let project = parse_kdl_string(kdl, "test".to_string()).unwrap();
    let vpc = &project.vpcs[0];
    assert!(!vpc.enable_internet);
    assert!(!vpc.enable_nat);
}

#[test]
fn test_parse_transit_gateway() {
    let kdl = r#"
        vpc "hub" {
            cidr "10.0.0.0/16"
            zones "a" "b"
            transit-gateway {
                asn 64512
                description "hub gateway"
                share-with-parameter "DC_ONE_OU_ID"
            }
            tgw-destination "10.1.0.0/16"
            tgw-route "spoke" target="tgw-attach-0abc"
            tgw-route "shared" associate="local" target="tgw-attach-0def" destination="10.2.0.0/16"
            route tier="private" zone="a"
        }
    "#;

    let project = parse_kdl_string(kdl, "test".to_string()).unwrap();
    let vpc = &project.vpcs[0];
    let tgw = vpc.transit_gateway.as_ref().unwrap();
    assert_eq!(
        tgw.source,
        TransitGatewaySource::Create {
            asn: Some(64512),
            description: Some("hub gateway".to_string()),
        }
    );
    assert_eq!(
        tgw.share_with,
        Some(ShareTarget::FromParameter("DC_ONE_OU_ID".to_string()))
    );
    assert_eq!(vpc.tgw_destination.as_deref(), Some("10.1.0.0/16"));
    assert_eq!(vpc.tgw_routes.len(), 2);
    assert_eq!(vpc.tgw_routes[0].associate, AttachmentRef::Local);
    assert_eq!(
        vpc.tgw_routes[0].target,
        AttachmentRef::External("tgw-attach-0abc".to_string())
    );
    assert_eq!(vpc.tgw_routes[0].destination, None);
    assert_eq!(vpc.tgw_routes[1].destination.as_deref(), Some("10.2.0.0/16"));
    assert_eq!(vpc.vpc_routes[0].tier, SubnetTier::Private);
    assert_eq!(vpc.vpc_routes[0].zone.as_deref(), Some("a"));
}

#[test]
fn test_parse_existing_transit_gateway() {
    let kdl = r#"
        vpc "spoke" {
            cidr "10.1.0.0/16"
            zones "a"
            transit-gateway {
                existing "tgw-0123456789abcdef0"
            }
        }
    "#;

    let project = parse_kdl_string(kdl, "test".to_string()).unwrap();
    let tgw = project.vpcs[0].transit_gateway.as_ref().unwrap();
    assert_eq!(
        tgw.source,
        TransitGatewaySource::Existing {
            id: "tgw-0123456789abcdef0".to_string()
        }
    );
}

#[test]
fn test_parse_existing_with_asn_error() {
    let kdl = r#"
        vpc "spoke" {
            cidr "10.1.0.0/16"
            transit-gateway {
                existing "tgw-0123"
                asn 64512
            }
        }
    "#;

    assert!(matches!(
        parse_kdl_string(kdl, "test".to_string()),
        Err(PlanError::InvalidConfig(_))
    ));
}

#[test]
fn test_parse_organization_and_stack() {
    let kdl = r#"
        organization {
            unit "platform"
            parameter "PLATFORM_OU_ID"
        }
        stack "DREAMCHASER-VPC-STACK-MAIN" {
            vpc "main"
            timeout 45
            output "outputs.json"
            parameter "Environment" "prod"
        }
    "#;

    let project = parse_kdl_string(kdl, "test".to_string()).unwrap();
    assert_eq!(project.organization.unit, "platform");
    assert_eq!(project.organization.parameter, "PLATFORM_OU_ID");
    assert_eq!(project.organization.feature_set, "ALL");

    let stack = project.stack(None).unwrap();
    assert_eq!(stack.name, "DREAMCHASER-VPC-STACK-MAIN");
    assert_eq!(stack.vpc.as_deref(), Some("main"));
    assert_eq!(stack.timeout_minutes, 45);
    assert_eq!(stack.output, Some(std::path::PathBuf::from("outputs.json")));
    assert_eq!(stack.parameters["Environment"], "prod");
    assert_eq!(
        stack.capabilities,
        vec!["CAPABILITY_NAMED_IAM", "CAPABILITY_AUTO_EXPAND"]
    );
    assert!(stack.termination_protection);
}

#[test]
fn test_parse_stack_capabilities_override() {
    let kdl = r#"
        stack "s" {
            capability "CAPABILITY_IAM"
            termination-protection #false
        }
    "#;

    let project = parse_kdl_string(kdl, "test".to_string()).unwrap();
    let stack = &project.stacks[0];
    assert_eq!(stack.capabilities, vec!["CAPABILITY_IAM"]);
    assert!(!stack.termination_protection);
}

#[test]
fn test_parse_later_vpc_overrides() {
    let kdl = r#"
        vpc "main" {
            cidr "10.0.0.0/16"
        }
        vpc "main" {
            cidr "10.8.0.0/16"
            ha #true
        }
    "#;

    let project = parse_kdl_string(kdl, "test".to_string()).unwrap();
    assert_eq!(project.vpcs.len(), 1);
    assert_eq!(project.vpcs[0].cidr, "10.8.0.0/16");
    assert!(project.vpcs[0].vpc_ha);
}

#[test]
fn test_parse_unknown_tier_error() {
    let kdl = r#"
        vpc "main" {
            tier "dmz" offset=8
        }
    "#;

    assert!(matches!(
        parse_kdl_string(kdl, "test".to_string()),
        Err(PlanError::UnknownTier(_))
    ));
}

#[test]
fn test_parse_offset_out_of_range() {
    let kdl = r#"
        vpc "main" {
            tier "public" offset=300
        }
    "#;

    assert!(parse_kdl_string(kdl, "test".to_string()).is_err());
}

#[test]
fn test_parse_vpc_requires_name() {
    let kdl = r#"
        vpc {
            cidr "10.0.0.0/16"
        }
    "#;

    assert!(parse_kdl_string(kdl, "test".to_string()).is_err());
}

#[test]
fn test_parse_invalid_kdl() {
    assert!(matches!(
        parse_kdl_string("vpc \"main\" {", "test".to_string()),
        Err(PlanError::KdlParse(_))
    ));
}

#[test]
fn test_parse_kdl_file_uses_directory_name() {
    let dir = tempfile::tempdir().unwrap();
    let project_dir = dir.path().join("network");
    std::fs::create_dir(&project_dir).unwrap();
    let path = project_dir.join("dreamchaser.kdl");
    std::fs::write(&path, "region \"us-east-1\"\n").unwrap();

    let project = parse_kdl_file(&path).unwrap();
    assert_eq!(project.name, "network");
    assert_eq!(project.region.as_deref(), Some("us-east-1"));
}

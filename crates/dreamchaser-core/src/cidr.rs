//! CIDR アロケーター
//!
//! 階層の第3オクテットのオフセットにゾーン序数を足して、
//! ゾーンごとのサブネット CIDR を求める。副作用のない純粋関数。

use crate::error::{PlanError, Result};
use crate::model::{NetworkBlock, SubnetTier};
use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;

/// `a.b.(octet3_base + tier_offset + zone_index).0/mask` を返す
///
/// 第3オクテットが 255 を超える場合は折り返さずにエラーにする。
pub fn allocate(
    base: &NetworkBlock,
    tier_offset: u8,
    zone_index: u8,
    mask: u8,
) -> Result<Ipv4Network> {
    if mask > 32 {
        return Err(PlanError::MaskOutOfRange(mask));
    }

    let offset = base.octet3_base as u16 + tier_offset as u16;
    let octet3 = offset + zone_index as u16;
    if octet3 > 255 {
        return Err(PlanError::OctetOverflow { offset, zone_index });
    }

    let addr = Ipv4Addr::new(base.octet1, base.octet2, octet3 as u8, 0);
    let network = Ipv4Network::new(addr, mask).map_err(|e| PlanError::InvalidCidr {
        cidr: format!("{}/{}", addr, mask),
        reason: e.to_string(),
    })?;

    if network.network() != addr {
        return Err(PlanError::MisalignedSubnet {
            cidr: network.to_string(),
            mask,
        });
    }

    Ok(network)
}

/// ゾーン数に対してオフセットの余裕があるかを事前に確認
pub fn check_headroom(base: &NetworkBlock, tier_offset: u8, zone_count: usize) -> Result<()> {
    if zone_count == 0 {
        return Ok(());
    }
    let last = zone_count - 1;
    if last > 255 {
        return Err(PlanError::TooManyZones(zone_count));
    }
    let offset = base.octet3_base as u16 + tier_offset as u16;
    if offset + last as u16 > 255 {
        return Err(PlanError::OctetOverflow {
            offset,
            zone_index: last as u8,
        });
    }
    Ok(())
}

/// easy 構成の既定オフセット
///
/// `exp` はゾーン数のビット長。public は `2^exp`、transit は `2^exp * 2`、
/// private は `2^exp * 4`、database は `2^exp * 8`、isolated は 192 固定。
pub fn derived_offset(tier: SubnetTier, zone_count: usize) -> Result<u8> {
    let exp = usize::BITS - zone_count.leading_zeros();
    let unit: u64 = 1u64 << exp;
    let offset = match tier {
        SubnetTier::Public => unit,
        SubnetTier::TransitGatewayAttach => unit * 2,
        SubnetTier::Private => unit * 4,
        SubnetTier::Database => unit * 8,
        SubnetTier::Isolated => 192,
    };
    u8::try_from(offset).map_err(|_| PlanError::OctetOverflow {
        offset: offset.min(u16::MAX as u64) as u16,
        zone_index: 0,
    })
}

/// 割り当て済みサブネットの VPC への収まりと重複を確認
pub fn check_layout(vpc: &Ipv4Network, subnets: &[Ipv4Network]) -> Result<()> {
    for subnet in subnets {
        if subnet.prefix() < vpc.prefix() || !vpc.contains(subnet.network()) {
            return Err(PlanError::OutsideVpc {
                subnet: subnet.to_string(),
                vpc: vpc.to_string(),
            });
        }
    }

    for (i, first) in subnets.iter().enumerate() {
        for second in &subnets[i + 1..] {
            if overlaps(first, second) {
                return Err(PlanError::OverlappingSubnets {
                    first: first.to_string(),
                    second: second.to_string(),
                });
            }
        }
    }
    Ok(())
}

fn overlaps(a: &Ipv4Network, b: &Ipv4Network) -> bool {
    a.contains(b.network()) || b.contains(a.network())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> NetworkBlock {
        NetworkBlock::parse("10.0.0.0/16").unwrap()
    }

    #[test]
    fn test_allocate_public_tier() {
        let cidrs: Vec<String> = (0..3)
            .map(|zone| allocate(&base(), 16, zone, 24).unwrap().to_string())
            .collect();
        assert_eq!(cidrs, vec!["10.0.16.0/24", "10.0.17.0/24", "10.0.18.0/24"]);
    }

    #[test]
    fn test_allocate_is_deterministic_and_distinct() {
        for offset in [0u8, 16, 64, 200] {
            let mut seen = std::collections::HashSet::new();
            for zone in 0..16u8 {
                let first = allocate(&base(), offset, zone, 24).unwrap();
                let again = allocate(&base(), offset, zone, 24).unwrap();
                assert_eq!(first, again);
                assert!(seen.insert(first));
            }
        }
    }

    #[test]
    fn test_allocate_overflow_fails_fast() {
        let result = allocate(&base(), 240, 16, 24);
        assert!(matches!(
            result,
            Err(PlanError::OctetOverflow {
                offset: 240,
                zone_index: 16
            })
        ));
        assert!(allocate(&base(), 240, 15, 24).is_ok());
    }

    #[test]
    fn test_allocate_rejects_bad_mask() {
        assert!(matches!(
            allocate(&base(), 16, 0, 33),
            Err(PlanError::MaskOutOfRange(33))
        ));
        // /20 の境界に揃っていない
        assert!(matches!(
            allocate(&base(), 16, 1, 20),
            Err(PlanError::MisalignedSubnet { .. })
        ));
    }

    #[test]
    fn test_check_headroom() {
        assert!(check_headroom(&base(), 240, 16).is_ok());
        assert!(check_headroom(&base(), 240, 17).is_err());
    }

    #[test]
    fn test_disjoint_offsets_never_overlap() {
        let vpc = base().to_network().unwrap();
        let offsets = [16u8, 32, 64, 128, 192];
        for zone_count in 1..=16u8 {
            let subnets: Vec<Ipv4Network> = offsets
                .iter()
                .flat_map(|offset| {
                    (0..zone_count).map(move |zone| allocate(&base(), *offset, zone, 24).unwrap())
                })
                .collect();
            assert!(check_layout(&vpc, &subnets).is_ok());
        }
    }

    #[test]
    fn test_overlapping_tiers_rejected() {
        let vpc = base().to_network().unwrap();
        let subnets = vec![
            allocate(&base(), 16, 0, 24).unwrap(),
            allocate(&base(), 16, 1, 24).unwrap(),
            allocate(&base(), 17, 0, 24).unwrap(),
        ];
        assert!(matches!(
            check_layout(&vpc, &subnets),
            Err(PlanError::OverlappingSubnets { .. })
        ));
    }

    #[test]
    fn test_subnet_outside_vpc_rejected() {
        let vpc: Ipv4Network = "10.0.0.0/20".parse().unwrap();
        let subnets = vec![allocate(&base(), 16, 0, 24).unwrap()];
        assert!(matches!(
            check_layout(&vpc, &subnets),
            Err(PlanError::OutsideVpc { .. })
        ));
    }

    #[test]
    fn test_derived_offsets() {
        // 3ゾーン -> ビット長2 -> 4
        assert_eq!(derived_offset(SubnetTier::Public, 3).unwrap(), 4);
        assert_eq!(derived_offset(SubnetTier::TransitGatewayAttach, 3).unwrap(), 8);
        assert_eq!(derived_offset(SubnetTier::Private, 3).unwrap(), 16);
        assert_eq!(derived_offset(SubnetTier::Database, 3).unwrap(), 32);
        assert_eq!(derived_offset(SubnetTier::Isolated, 3).unwrap(), 192);
        // 4ゾーン -> ビット長3 -> 8
        assert_eq!(derived_offset(SubnetTier::Public, 4).unwrap(), 8);
        // 32ゾーン -> database は 512 で溢れる
        assert!(derived_offset(SubnetTier::Database, 32).is_err());
    }
}

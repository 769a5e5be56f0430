//! ゾーン展開プランナー
//!
//! NAT ゲートウェイの数と配置ゾーン、各ゾーンのルートテーブルが
//! どのゲートウェイを向くかを決める。

use crate::error::{PlanError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NatStrategy {
    None,
    /// ゾーン0に1つだけ（コスト優先）
    Single,
    /// ゾーンごとに1つ（高可用性）
    PerZone,
}

/// NAT ゲートウェイの配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatPlacement {
    pub strategy: NatStrategy,
    /// ゲートウェイを置くゾーンの序数（ゲートウェイ順）
    pub gateway_zones: Vec<u8>,
    zone_count: usize,
}

impl NatPlacement {
    pub fn none(zone_count: usize) -> Self {
        Self {
            strategy: NatStrategy::None,
            gateway_zones: Vec::new(),
            zone_count,
        }
    }

    pub fn gateway_count(&self) -> usize {
        self.gateway_zones.len()
    }

    /// ゾーンのルートテーブルが向くゲートウェイの番号
    pub fn gateway_for_zone(&self, zone_index: u8) -> Option<usize> {
        if zone_index as usize >= self.zone_count {
            return None;
        }
        match self.strategy {
            NatStrategy::None => None,
            NatStrategy::Single => Some(0),
            NatStrategy::PerZone => Some(zone_index as usize),
        }
    }
}

/// NAT 戦略を決める
///
/// NAT を要求しているのにパブリックサブネットがない場合は
/// 黙ってスキップせず設定エラーにする。
pub fn plan_nat_strategy(
    zone_count: usize,
    ha: bool,
    nat_requested: bool,
    public_subnets: bool,
) -> Result<NatPlacement> {
    if !nat_requested {
        return Ok(NatPlacement::none(zone_count));
    }
    if !public_subnets {
        return Err(PlanError::NatWithoutPublic);
    }
    if zone_count == 0 {
        return Err(PlanError::NoZones);
    }
    if zone_count > 256 {
        return Err(PlanError::TooManyZones(zone_count));
    }

    let placement = if ha {
        NatPlacement {
            strategy: NatStrategy::PerZone,
            gateway_zones: (0..zone_count).map(|i| i as u8).collect(),
            zone_count,
        }
    } else {
        NatPlacement {
            strategy: NatStrategy::Single,
            gateway_zones: vec![0],
            zone_count,
        }
    };

    tracing::debug!(
        strategy = ?placement.strategy,
        gateways = placement.gateway_count(),
        "planned NAT placement"
    );
    Ok(placement)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_nat_requested() {
        let placement = plan_nat_strategy(3, true, false, false).unwrap();
        assert_eq!(placement.strategy, NatStrategy::None);
        assert_eq!(placement.gateway_count(), 0);
        assert_eq!(placement.gateway_for_zone(0), None);
    }

    #[test]
    fn test_ha_one_gateway_per_zone() {
        let placement = plan_nat_strategy(3, true, true, true).unwrap();
        assert_eq!(placement.strategy, NatStrategy::PerZone);
        assert_eq!(placement.gateway_count(), 3);
        assert_eq!(placement.gateway_zones, vec![0, 1, 2]);
        for zone in 0..3u8 {
            assert_eq!(placement.gateway_for_zone(zone), Some(zone as usize));
        }
    }

    #[test]
    fn test_single_gateway_shared_by_all_zones() {
        let placement = plan_nat_strategy(3, false, true, true).unwrap();
        assert_eq!(placement.strategy, NatStrategy::Single);
        assert_eq!(placement.gateway_count(), 1);
        assert_eq!(placement.gateway_zones, vec![0]);
        for zone in 0..3u8 {
            assert_eq!(placement.gateway_for_zone(zone), Some(0));
        }
        assert_eq!(placement.gateway_for_zone(3), None);
    }

    #[test]
    fn test_nat_without_public_subnets_fails() {
        let result = plan_nat_strategy(3, false, true, false);
        assert!(matches!(result, Err(PlanError::NatWithoutPublic)));
    }
}

//! ネットワークブロック
//!
//! VPC の CIDR を第1・第2オクテット、第3オクテットの基点、マスクに分解したもの。

use crate::error::{PlanError, Result};
use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};
use std::fmt;

/// IPv4 ネットワークブロック `{octet1, octet2, octet3_base, mask}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkBlock {
    pub octet1: u8,
    pub octet2: u8,
    /// 第3オクテットの基点（/16 の VPC なら 0）
    pub octet3_base: u8,
    pub mask: u8,
}

impl NetworkBlock {
    pub fn new(octet1: u8, octet2: u8, octet3_base: u8, mask: u8) -> Result<Self> {
        if mask > 32 {
            return Err(PlanError::MaskOutOfRange(mask));
        }
        Ok(Self {
            octet1,
            octet2,
            octet3_base,
            mask,
        })
    }

    /// "10.0.0.0/16" 形式の文字列からブロックを作成
    pub fn parse(cidr: &str) -> Result<Self> {
        let network = parse_ipv4_cidr(cidr)?;
        Ok(Self::from_network(&network))
    }

    pub fn from_network(network: &Ipv4Network) -> Self {
        let [octet1, octet2, octet3_base, _] = network.network().octets();
        Self {
            octet1,
            octet2,
            octet3_base,
            mask: network.prefix(),
        }
    }

    /// ブロック全体を Ipv4Network として取得
    pub fn to_network(&self) -> Result<Ipv4Network> {
        let addr = std::net::Ipv4Addr::new(self.octet1, self.octet2, self.octet3_base, 0);
        Ipv4Network::new(addr, self.mask).map_err(|e| PlanError::InvalidCidr {
            cidr: self.to_string(),
            reason: e.to_string(),
        })
    }
}

impl fmt::Display for NetworkBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.0/{}",
            self.octet1, self.octet2, self.octet3_base, self.mask
        )
    }
}

/// CIDR 文字列をパースし、ホスト部が 0 であることを確認
pub fn parse_ipv4_cidr(cidr: &str) -> Result<Ipv4Network> {
    let network: Ipv4Network = cidr.trim().parse().map_err(|e: ipnetwork::IpNetworkError| {
        PlanError::InvalidCidr {
            cidr: cidr.to_string(),
            reason: e.to_string(),
        }
    })?;

    if network.ip() != network.network() {
        return Err(PlanError::MisalignedSubnet {
            cidr: cidr.to_string(),
            mask: network.prefix(),
        });
    }

    Ok(network)
}

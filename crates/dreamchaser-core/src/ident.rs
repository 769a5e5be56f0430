//! リソースの論理ID
//!
//! 論理IDは「用途・階層・ゾーン・修飾子」から決定的に導出する。
//! 読みやすい接頭辞に、スコープを含めた SHA-256 の先頭8桁を付ける。

use crate::model::{SubnetTier, Zone};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// テンプレート内で一意な論理ID（英数字のみ）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LogicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 論理IDの元になる意味的なキー
#[derive(Debug, Clone, Copy)]
pub struct IdKey<'a> {
    scope: &'a str,
    purpose: &'a str,
    tier: Option<SubnetTier>,
    zone: Option<&'a Zone>,
    qualifier: Option<&'a str>,
}

impl<'a> IdKey<'a> {
    /// `scope` は VPC 名、`purpose` は "Subnet" "RouteTable" など
    pub fn new(scope: &'a str, purpose: &'a str) -> Self {
        Self {
            scope,
            purpose,
            tier: None,
            zone: None,
            qualifier: None,
        }
    }

    pub fn tier(mut self, tier: SubnetTier) -> Self {
        self.tier = Some(tier);
        self
    }

    pub fn zone(mut self, zone: &'a Zone) -> Self {
        self.zone = Some(zone);
        self
    }

    pub fn qualifier(mut self, qualifier: &'a str) -> Self {
        self.qualifier = Some(qualifier);
        self
    }

    fn prefix(&self) -> String {
        let mut prefix = String::new();
        if let Some(tier) = self.tier {
            prefix.push_str(tier.label());
        }
        prefix.extend(self.purpose.chars().filter(|c| c.is_ascii_alphanumeric()));
        if let Some(zone) = self.zone {
            prefix.push_str(&zone.ordinal().to_string());
        }
        prefix
    }

    fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [
            self.scope,
            self.purpose,
            self.tier.map(|t| t.key()).unwrap_or(""),
            self.zone.map(|z| z.name.as_str()).unwrap_or(""),
            self.qualifier.unwrap_or(""),
        ] {
            hasher.update(part.as_bytes());
            // 区切り（"ab"+"c" と "a"+"bc" を区別する）
            hasher.update([0u8]);
        }
        hex::encode_upper(hasher.finalize())
    }

    pub fn logical_id(&self) -> LogicalId {
        let digest = self.digest();
        LogicalId(format!("{}{}", self.prefix(), &digest[..8]))
    }

    /// RAM の共有名など、アカウント内で一意である必要がある名前
    pub fn resource_name(&self) -> String {
        let digest = self.digest();
        format!(
            "{}-{}-{}",
            self.scope,
            self.purpose.to_ascii_lowercase(),
            digest[..8].to_ascii_lowercase()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(name: &str, index: u8) -> Zone {
        Zone {
            name: name.to_string(),
            index,
        }
    }

    #[test]
    fn test_logical_id_is_stable() {
        let z = zone("ap-southeast-2a", 0);
        let a = IdKey::new("main", "Subnet")
            .tier(SubnetTier::Public)
            .zone(&z)
            .logical_id();
        let b = IdKey::new("main", "Subnet")
            .tier(SubnetTier::Public)
            .zone(&z)
            .logical_id();
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("PublicSubnet1"));
        assert_eq!(a.as_str().len(), "PublicSubnet1".len() + 8);
        assert!(a.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_logical_id_differs_by_scope_and_zone() {
        let z1 = zone("ap-southeast-2a", 0);
        let z2 = zone("ap-southeast-2b", 1);
        let base = IdKey::new("main", "Subnet").tier(SubnetTier::Private);

        let id1 = base.zone(&z1).logical_id();
        let id2 = base.zone(&z2).logical_id();
        let other_scope = IdKey::new("shared", "Subnet")
            .tier(SubnetTier::Private)
            .zone(&z1)
            .logical_id();

        assert_ne!(id1, id2);
        assert_ne!(id1, other_scope);
    }

    #[test]
    fn test_qualifier_changes_digest() {
        let a = IdKey::new("main", "TgwRoute").qualifier("10.1.0.0/16");
        let b = IdKey::new("main", "TgwRoute").qualifier("10.2.0.0/16");
        assert_ne!(a.logical_id(), b.logical_id());
    }

    #[test]
    fn test_resource_name() {
        let name = IdKey::new("main", "TgwShare").resource_name();
        assert!(name.starts_with("main-tgwshare-"));
        assert_eq!(name.len(), "main-tgwshare-".len() + 8);
    }
}

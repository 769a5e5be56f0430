use crate::error::{PlanError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// アベイラビリティゾーンとその序数（0始まり）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub index: u8,
}

impl Zone {
    /// 順序付きのゾーン名一覧から Zone を作成
    ///
    /// 序数は一覧の並び順で決まる。空・重複・256個超はエラー。
    pub fn list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Zone>> {
        if names.is_empty() {
            return Err(PlanError::NoZones);
        }
        if names.len() > 256 {
            return Err(PlanError::TooManyZones(names.len()));
        }

        let mut seen = HashSet::new();
        names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let name = name.as_ref().trim();
                if !seen.insert(name.to_string()) {
                    return Err(PlanError::DuplicateZone(name.to_string()));
                }
                Ok(Zone {
                    name: name.to_string(),
                    index: index as u8,
                })
            })
            .collect()
    }

    /// 表示・命名用の 1 始まりの番号
    pub fn ordinal(&self) -> u16 {
        self.index as u16 + 1
    }
}

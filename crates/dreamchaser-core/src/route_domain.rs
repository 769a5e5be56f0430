//! Transit Gateway のルートドメイン
//!
//! どのルートテーブルを作り、どのアタッチメントに関連付けるかを決める戦略。
//! 現在はフラット（ルートテーブル1つ）のみ。分離型のドメインは
//! `RouteDomainStrategy` を実装して差し替える。

use crate::error::{PlanError, Result};
use crate::ident::{IdKey, LogicalId};
use crate::model::{AttachmentTarget, TgwAssociation, TgwRoute, TgwRouteTable};
use std::collections::HashSet;

/// 宛先が解決済みの Transit Gateway ルート要求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTgwRoute {
    pub name: String,
    pub associate: AttachmentTarget,
    pub target: AttachmentTarget,
    pub destination: String,
}

pub trait RouteDomainStrategy {
    fn name(&self) -> &'static str;

    fn route_tables(
        &self,
        scope: &str,
        local_attachment: &LogicalId,
        routes: &[ResolvedTgwRoute],
    ) -> Result<Vec<TgwRouteTable>>;
}

/// ルートテーブル1つ、関連付け1つのフラットなドメイン
#[derive(Debug, Clone, Copy, Default)]
pub struct FlatRouteDomain;

impl FlatRouteDomain {
    fn reject(&self, reason: impl Into<String>) -> PlanError {
        PlanError::RouteDomain {
            strategy: self.name(),
            reason: reason.into(),
        }
    }
}

impl RouteDomainStrategy for FlatRouteDomain {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn route_tables(
        &self,
        scope: &str,
        _local_attachment: &LogicalId,
        routes: &[ResolvedTgwRoute],
    ) -> Result<Vec<TgwRouteTable>> {
        let Some(first) = routes.first() else {
            return Ok(Vec::new());
        };

        let associate = first.associate.clone();
        let mut destinations = HashSet::new();
        let mut table_routes = Vec::with_capacity(routes.len());

        for route in routes {
            if route.associate != associate {
                return Err(self.reject(format!(
                    "route '{}' is associated with a different attachment; only one association is supported",
                    route.name
                )));
            }
            if route.target == associate {
                return Err(self.reject(format!(
                    "route '{}' targets the attachment it is associated with",
                    route.name
                )));
            }
            if !destinations.insert(route.destination.clone()) {
                return Err(self.reject(format!(
                    "destination {} is routed twice",
                    route.destination
                )));
            }

            let qualifier = format!("{}|{}", route.name, route.destination);
            table_routes.push(TgwRoute {
                logical_id: IdKey::new(scope, "TgwRoute")
                    .qualifier(&qualifier)
                    .logical_id(),
                destination: route.destination.clone(),
                attachment: route.target.clone(),
            });
        }

        let association_key = attachment_key(&associate);
        let table = TgwRouteTable {
            logical_id: IdKey::new(scope, "TgwRouteTable")
                .qualifier(self.name())
                .logical_id(),
            associations: vec![TgwAssociation {
                logical_id: IdKey::new(scope, "TgwAssociation")
                    .qualifier(&association_key)
                    .logical_id(),
                attachment: associate,
            }],
            routes: table_routes,
        };

        Ok(vec![table])
    }
}

fn attachment_key(target: &AttachmentTarget) -> String {
    match target {
        AttachmentTarget::Local(id) => format!("local:{}", id),
        AttachmentTarget::External(id) => format!("external:{}", id),
    }
}

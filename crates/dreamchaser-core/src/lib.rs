//! DreamChaser Core
//!
//! VPC のアドレス設計とトポロジー計画。
//!
//! 対象 CIDR、順序付きのアベイラビリティゾーン、機能フラグから
//! 宣言的なリソース計画 (`VpcPlan`) を組み立て、CloudFormation テンプレートに合成する。
//! 計画は純粋かつ決定的で、同じ入力からは同じ論理IDと同じテンプレートが得られる。
//!
//! ```text
//! dreamchaser.kdl ──▶ parser ──▶ loader (context) ──▶ VpcParams
//!                                                       │
//!                         cidr ◀── topology::assemble ──┤
//!                         nat  ◀──────────┘             │
//!                                                       ▼
//!                                  VpcPlan ──▶ synth ──▶ Template (JSON)
//! ```

pub mod cidr;
pub mod error;
pub mod ident;
pub mod loader;
pub mod model;
pub mod nat;
pub mod parser;
pub mod route_domain;
pub mod synth;
pub mod topology;

pub use error::{PlanError, Result};
pub use ident::{IdKey, LogicalId};
pub use loader::{Context, load_project, resolve_vpc};
pub use model::*;
pub use nat::{NatPlacement, NatStrategy, plan_nat_strategy};
pub use parser::{parse_kdl_file, parse_kdl_string};
pub use route_domain::{FlatRouteDomain, RouteDomainStrategy};
pub use synth::{Template, synthesize};
pub use topology::{assemble, assemble_with};

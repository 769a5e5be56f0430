//! DreamChaser Cloud
//!
//! Executor-side abstraction: the collaborator traits the CLI drives,
//! stack create-or-update with waiters, the organization bootstrap, the
//! plan diff against the last deploy, and the local state file.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 dreamchaser CLI                  │
//! │        (plan / deploy / bootstrap / param)       │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               dreamchaser-cloud                  │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  StackExecutor  OrganizationDirectory    │   │
//! │  │  ResourceSharing ParameterStore Zones    │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ deploy/boot  │  │  State Mgmt  │            │
//! │  └──────────────┘  └──────────────┘            │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//!           ┌───────▼────────┐
//!           │ dreamchaser-   │
//!           │   cloud-aws    │
//!           └────────────────┘
//! ```

pub mod action;
pub mod bootstrap;
pub mod deploy;
pub mod error;
pub mod provider;
pub mod state;

// Re-exports
pub use action::{Action, ActionType, Plan, PlanSummary, ResourceConfig, ResourceSet};
pub use bootstrap::{BootstrapReport, bootstrap_organization, find_unit_arn, root_id};
pub use deploy::{
    DeployOutcome, DeployReport, DeployTarget, create_or_update, deploy_and_record, wait_for_stack,
    write_outputs,
};
pub use error::{CloudError, Operation, Result};
pub use provider::{
    OrganizationDirectory, OrganizationalUnit, ParameterStore, ResourceSharing,
    StackDescription, StackExecutor, StackRequest, TemplateSource, WaiterConfig, ZoneCatalog,
};
pub use state::{GlobalState, StackRecord, StateLock, StateManager};

//! Stack create-or-update orchestration
//!
//! Status semantics:
//! - describe succeeds: update, then wait for `UPDATE_COMPLETE`. A 400 on
//!   update means there is nothing to update and counts as success.
//! - describe returns 403: the stack is private, fatal.
//! - describe returns 400: the stack does not exist, create it and wait for
//!   `CREATE_COMPLETE`.
//! - anything else is fatal with the provider's status code.
//!
//! Nothing here retries.

use crate::action::ResourceSet;
use crate::error::{CloudError, Result};
use crate::provider::{StackDescription, StackExecutor, StackRequest, WaiterConfig};
use crate::state::{StackRecord, StateManager};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

const CREATE_COMPLETE: &str = "CREATE_COMPLETE";
const UPDATE_COMPLETE: &str = "UPDATE_COMPLETE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployOutcome {
    Created,
    Updated,
    NoChanges,
}

impl std::fmt::Display for DeployOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeployOutcome::Created => write!(f, "created"),
            DeployOutcome::Updated => write!(f, "updated"),
            DeployOutcome::NoChanges => write!(f, "no changes"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeployReport {
    pub outcome: DeployOutcome,
    pub stack: StackDescription,
}

impl DeployReport {
    pub fn outputs(&self) -> &BTreeMap<String, String> {
        &self.stack.outputs
    }
}

/// Create the stack if it does not exist, otherwise update it
pub async fn create_or_update(
    executor: &dyn StackExecutor,
    request: &StackRequest,
    waiter: &WaiterConfig,
) -> Result<DeployReport> {
    match executor.describe_stack(&request.name).await {
        Ok(_) => {
            info!(stack = %request.name, "Updating stack");
            match executor.update_stack(request).await {
                Ok(_) => {
                    let stack = wait_for_stack(
                        executor,
                        &request.name,
                        UPDATE_COMPLETE,
                        request.timeout(),
                        waiter,
                    )
                    .await?;
                    Ok(DeployReport {
                        outcome: DeployOutcome::Updated,
                        stack,
                    })
                }
                Err(e) if e.status() == Some(400) => {
                    info!(stack = %request.name, "Nothing to be updated on stack");
                    let stack = executor.describe_stack(&request.name).await?;
                    Ok(DeployReport {
                        outcome: DeployOutcome::NoChanges,
                        stack,
                    })
                }
                Err(e) => Err(e),
            }
        }
        Err(e) if e.status() == Some(403) => Err(CloudError::AccessDenied(request.name.clone())),
        Err(e) if e.status() == Some(400) => {
            info!(stack = %request.name, "Stack does not exist, creating stack");
            executor.create_stack(request).await?;
            let stack = wait_for_stack(
                executor,
                &request.name,
                CREATE_COMPLETE,
                request.timeout(),
                waiter,
            )
            .await?;
            Ok(DeployReport {
                outcome: DeployOutcome::Created,
                stack,
            })
        }
        Err(e) => Err(e),
    }
}

/// Where a deployed stack lives, stored with its state record
#[derive(Debug, Clone, Default)]
pub struct DeployTarget {
    pub vpc: String,
    pub account: Option<String>,
    pub region: Option<String>,
}

/// [`create_or_update`] under the project lock, then record the result
///
/// `desired` is the synthesized resource set, or `None` when the template
/// comes from a URL. When there is nothing to update the resources recorded
/// by the previous deploy are kept. State is left untouched on failure.
pub async fn deploy_and_record(
    executor: &dyn StackExecutor,
    state_manager: &StateManager,
    request: &StackRequest,
    desired: Option<ResourceSet>,
    target: DeployTarget,
    waiter: &WaiterConfig,
) -> Result<DeployReport> {
    let lock = state_manager.acquire_lock(&request.name).await?;
    let report = create_or_update(executor, request, waiter).await?;

    let mut state = state_manager.load().await?;
    let resources = match report.outcome {
        DeployOutcome::Created | DeployOutcome::Updated => desired,
        DeployOutcome::NoChanges => state
            .get(&request.name)
            .and_then(|previous| previous.resources.clone()),
    };
    state.record(StackRecord {
        stack_name: request.name.clone(),
        stack_id: report.stack.stack_id.clone(),
        vpc: target.vpc,
        account: target.account,
        region: target.region,
        status: report.stack.status.clone(),
        resources,
        outputs: report.outputs().clone(),
        deployed_at: Utc::now(),
    });
    state_manager.save(&state).await?;
    lock.release().await?;

    info!(stack = %request.name, outcome = %report.outcome, "Deploy recorded");
    Ok(report)
}

/// Poll until the stack reaches `target`
///
/// Any settled status other than `target` (rollbacks, failures) is an error.
pub async fn wait_for_stack(
    executor: &dyn StackExecutor,
    name: &str,
    target: &str,
    timeout: Duration,
    waiter: &WaiterConfig,
) -> Result<StackDescription> {
    let started = Instant::now();
    let mut attempt = 0;

    loop {
        let stack = executor.describe_stack(name).await?;
        if stack.status == target {
            return Ok(stack);
        }
        if !stack.is_in_progress() {
            return Err(CloudError::StackFailed {
                stack: name.to_string(),
                status: stack.status,
                reason: stack.status_reason,
            });
        }

        let delay = waiter.delay_for_attempt(attempt);
        if started.elapsed() + delay > timeout {
            return Err(CloudError::Timeout(format!(
                "stack {} still {} after {} minutes",
                name,
                stack.status,
                timeout.as_secs() / 60
            )));
        }
        debug!(stack = name, status = %stack.status, ?delay, "Waiting for stack");
        sleep(delay).await;
        attempt += 1;
    }
}

/// Write the stack outputs map as JSON
pub async fn write_outputs(path: &Path, outputs: &BTreeMap<String, String>) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string_pretty(outputs)?;
    tokio::fs::write(path, content).await?;
    info!(path = %path.display(), "Stack outputs written");
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::fake::FakeStacks;
    use super::*;
    use crate::action::ResourceConfig;
    use crate::provider::TemplateSource;
    use crate::state::GlobalState;

    const STACK: &str = "DREAMCHASER-VPC-STACK-MAIN";

    fn request() -> StackRequest {
        StackRequest::new(STACK, TemplateSource::Body("{}".into()))
    }

    fn resources(ids: &[&str]) -> ResourceSet {
        let mut set = ResourceSet::new();
        for id in ids {
            set.add(ResourceConfig {
                id: id.to_string(),
                resource_type: "AWS::EC2::Subnet".to_string(),
                config: serde_json::json!({ "CidrBlock": "10.0.0.0/24" }),
            });
        }
        set
    }

    fn target() -> DeployTarget {
        DeployTarget {
            vpc: "main".to_string(),
            account: Some("111111111111".to_string()),
            region: Some("ap-southeast-2".to_string()),
        }
    }

    /// State holding a previous deploy of `ids`
    async fn seeded_state(manager: &StateManager, ids: &[&str]) {
        let mut state = GlobalState::new();
        state.record(StackRecord {
            stack_name: STACK.to_string(),
            stack_id: None,
            vpc: "main".to_string(),
            account: None,
            region: None,
            status: "CREATE_COMPLETE".to_string(),
            resources: Some(resources(ids)),
            outputs: BTreeMap::new(),
            deployed_at: Utc::now(),
        });
        manager.save(&state).await.unwrap();
    }

    fn quick() -> WaiterConfig {
        WaiterConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_creates_missing_stack() {
        let fake = FakeStacks::default();
        let report = create_or_update(&fake, &request(), &quick()).await.unwrap();

        assert_eq!(report.outcome, DeployOutcome::Created);
        assert_eq!(report.stack.status, "CREATE_COMPLETE");
        assert_eq!(report.outputs()["VpcId"], "vpc-0123");
        assert!(fake.calls().iter().any(|c| c.starts_with("create:")));
    }

    #[tokio::test]
    async fn test_updates_existing_stack() {
        let fake = FakeStacks::with_stack("DREAMCHASER-VPC-STACK-MAIN", "CREATE_COMPLETE");
        let report = create_or_update(&fake, &request(), &quick()).await.unwrap();

        assert_eq!(report.outcome, DeployOutcome::Updated);
        assert_eq!(report.stack.status, "UPDATE_COMPLETE");
        assert!(!fake.calls().iter().any(|c| c.starts_with("create:")));
    }

    #[tokio::test]
    async fn test_update_400_is_no_changes() {
        let mut fake = FakeStacks::with_stack("DREAMCHASER-VPC-STACK-MAIN", "UPDATE_COMPLETE");
        fake.update_status = Some(400);
        let report = create_or_update(&fake, &request(), &quick()).await.unwrap();
        assert_eq!(report.outcome, DeployOutcome::NoChanges);
    }

    #[tokio::test]
    async fn test_update_other_status_is_fatal() {
        let mut fake = FakeStacks::with_stack("DREAMCHASER-VPC-STACK-MAIN", "UPDATE_COMPLETE");
        fake.update_status = Some(500);
        let err = create_or_update(&fake, &request(), &quick()).await.unwrap_err();
        assert_eq!(err.exit_code(), 500);
    }

    #[tokio::test]
    async fn test_describe_403_is_access_denied() {
        let fake = FakeStacks {
            describe_status: Some(403),
            ..Default::default()
        };
        let err = create_or_update(&fake, &request(), &quick()).await.unwrap_err();
        assert!(matches!(err, CloudError::AccessDenied(_)));
        assert!(fake.calls().iter().all(|c| c.starts_with("describe:")));
    }

    #[tokio::test]
    async fn test_describe_other_status_is_fatal() {
        let fake = FakeStacks {
            describe_status: Some(503),
            ..Default::default()
        };
        let err = create_or_update(&fake, &request(), &quick()).await.unwrap_err();
        assert_eq!(err.exit_code(), 503);
    }

    #[tokio::test]
    async fn test_rollback_is_failure() {
        let fake = FakeStacks {
            final_status: Some("ROLLBACK_COMPLETE".into()),
            ..Default::default()
        };
        let err = create_or_update(&fake, &request(), &quick()).await.unwrap_err();
        assert!(matches!(
            err,
            CloudError::StackFailed { ref status, .. } if status == "ROLLBACK_COMPLETE"
        ));
    }

    #[tokio::test]
    async fn test_waiter_polls_through_in_progress() {
        let fake = FakeStacks::with_stack("s", "CREATE_COMPLETE");
        *fake.pending.lock().unwrap() = vec![
            "CREATE_IN_PROGRESS".to_string(),
            "CREATE_IN_PROGRESS".to_string(),
        ];
        let stack = wait_for_stack(&fake, "s", CREATE_COMPLETE, Duration::from_secs(60), &quick())
            .await
            .unwrap();
        assert_eq!(stack.status, "CREATE_COMPLETE");
        assert_eq!(fake.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_waiter_times_out() {
        let fake = FakeStacks::with_stack("s", "CREATE_IN_PROGRESS");
        let err = wait_for_stack(&fake, "s", CREATE_COMPLETE, Duration::from_millis(0), &quick())
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_write_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("outputs.json");
        let outputs = BTreeMap::from([("VpcId".to_string(), "vpc-0123".to_string())]);

        write_outputs(&path, &outputs).await.unwrap();

        let written: BTreeMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, outputs);
    }

    #[tokio::test]
    async fn test_no_changes_keeps_recorded_resources() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StateManager::new(dir.path());
        seeded_state(&manager, &["SubnetOld"]).await;

        let mut fake = FakeStacks::with_stack(STACK, "UPDATE_COMPLETE");
        fake.update_status = Some(400);
        let report = deploy_and_record(
            &fake,
            &manager,
            &request(),
            Some(resources(&["SubnetNew"])),
            target(),
            &quick(),
        )
        .await
        .unwrap();
        assert_eq!(report.outcome, DeployOutcome::NoChanges);

        let recorded = manager.load().await.unwrap().deployed_resources(STACK).unwrap();
        assert!(recorded.get("SubnetOld").is_some());
        assert!(recorded.get("SubnetNew").is_none());
    }

    #[tokio::test]
    async fn test_update_records_desired_resources() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StateManager::new(dir.path());
        seeded_state(&manager, &["SubnetOld"]).await;

        let fake = FakeStacks::with_stack(STACK, "CREATE_COMPLETE");
        deploy_and_record(
            &fake,
            &manager,
            &request(),
            Some(resources(&["SubnetNew"])),
            target(),
            &quick(),
        )
        .await
        .unwrap();

        let state = manager.load().await.unwrap();
        let record = state.get(STACK).unwrap();
        assert_eq!(record.status, "UPDATE_COMPLETE");
        assert_eq!(record.outputs["VpcId"], "vpc-0123");
        let recorded = record.resources.as_ref().unwrap();
        assert!(recorded.get("SubnetNew").is_some());
        assert!(recorded.get("SubnetOld").is_none());
        assert!(!dir.path().join(".dreamchaser/lock.json").exists());
    }

    #[tokio::test]
    async fn test_url_template_is_recorded_without_resources() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StateManager::new(dir.path());

        let fake = FakeStacks::with_stack(STACK, "CREATE_COMPLETE");
        let request = StackRequest::new(
            STACK,
            TemplateSource::Url("https://example.com/vpc.json".into()),
        );
        deploy_and_record(&fake, &manager, &request, None, target(), &quick())
            .await
            .unwrap();

        let state = manager.load().await.unwrap();
        assert!(state.get(STACK).is_some());
        assert!(state.deployed_resources(STACK).is_none());
    }

    #[tokio::test]
    async fn test_failed_deploy_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StateManager::new(dir.path());
        seeded_state(&manager, &["SubnetOld"]).await;

        let mut fake = FakeStacks::with_stack(STACK, "UPDATE_COMPLETE");
        fake.update_status = Some(500);
        let err = deploy_and_record(
            &fake,
            &manager,
            &request(),
            Some(resources(&["SubnetNew"])),
            target(),
            &quick(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code(), 500);

        let recorded = manager.load().await.unwrap().deployed_resources(STACK).unwrap();
        assert!(recorded.get("SubnetOld").is_some());
        assert!(!dir.path().join(".dreamchaser/lock.json").exists());
    }
}

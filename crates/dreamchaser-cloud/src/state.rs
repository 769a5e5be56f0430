//! Local deployment state
//!
//! Manages the `.dreamchaser/state.json` file, which records the resource set
//! and outputs of the last successful deploy of each stack.

use crate::action::ResourceSet;
use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".dreamchaser";
const STATE_FILE: &str = "state.json";
const STATE_STAGING: &str = "state.json.tmp";
const STATE_BACKUP: &str = "state.json.backup";
const LOCK_FILE: &str = "lock.json";

/// Age after which a lock left by a crashed deploy is ignored
pub const STALE_LOCK_HOURS: i64 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalState {
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    /// Records indexed by stack name
    pub stacks: BTreeMap<String, StackRecord>,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            stacks: BTreeMap::new(),
        }
    }
}

impl GlobalState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: StackRecord) {
        self.stacks.insert(record.stack_name.clone(), record);
        self.updated_at = Utc::now();
    }

    pub fn get(&self, stack_name: &str) -> Option<&StackRecord> {
        self.stacks.get(stack_name)
    }

    /// Resources last deployed for a stack
    ///
    /// Empty if the stack was never deployed, `None` if it was deployed from
    /// a template this tool did not synthesize.
    pub fn deployed_resources(&self, stack_name: &str) -> Option<ResourceSet> {
        match self.get(stack_name) {
            Some(record) => record.resources.clone(),
            None => Some(ResourceSet::new()),
        }
    }
}

/// A successful deploy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackRecord {
    pub stack_name: String,
    pub stack_id: Option<String>,
    pub vpc: String,
    pub account: Option<String>,
    pub region: Option<String>,
    pub status: String,
    /// `None` when the deployed template is not known locally
    #[serde(default)]
    pub resources: Option<ResourceSet>,
    pub outputs: BTreeMap<String, String>,
    pub deployed_at: DateTime<Utc>,
}

/// Reads and writes `.dreamchaser/` under a project root
pub struct StateManager {
    dir: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            dir: project_root.as_ref().join(STATE_DIR),
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    pub async fn load(&self) -> Result<GlobalState> {
        let content = match fs::read_to_string(self.state_path()).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state file yet");
                return Ok(GlobalState::new());
            }
            Err(e) => return Err(e.into()),
        };

        let state: GlobalState = serde_json::from_str(&content)?;
        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "state file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }
        debug!(stacks = state.stacks.len(), "Loaded state");
        Ok(state)
    }

    /// Write the state atomically; the previous file is kept as `state.json.backup`
    pub async fn save(&self, state: &GlobalState) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;

        let path = self.state_path();
        let staging = self.dir.join(STATE_STAGING);
        fs::write(&staging, serde_json::to_vec_pretty(state)?).await?;

        match fs::copy(&path, self.dir.join(STATE_BACKUP)).await {
            Ok(_) => debug!("Previous state backed up"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        fs::rename(&staging, &path).await?;

        debug!(stacks = state.stacks.len(), path = %path.display(), "Saved state");
        Ok(())
    }

    /// Take the project lock for a deploy of `stack`
    ///
    /// A lock older than [`STALE_LOCK_HOURS`] is taken over.
    pub async fn acquire_lock(&self, stack: &str) -> Result<StateLock> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(LOCK_FILE);

        if let Some(held) = read_lock(&path).await? {
            let age = Utc::now().signed_duration_since(held.acquired_at);
            if age.num_hours() < STALE_LOCK_HOURS {
                return Err(CloudError::LockError(format!(
                    "{} is deploying {} since {} (pid {})",
                    held.holder, held.stack, held.acquired_at, held.pid
                )));
            }
            warn!(holder = %held.holder, stack = %held.stack, "Taking over stale lock");
            fs::remove_file(&path).await?;
        }

        let info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            pid: std::process::id(),
            stack: stack.to_string(),
            acquired_at: Utc::now(),
        };
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(CloudError::LockError(format!(
                    "another deploy took the lock at {}",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&serde_json::to_vec_pretty(&info)?).await?;

        debug!(stack, "Acquired state lock");
        Ok(StateLock { path: Some(path) })
    }
}

async fn read_lock(path: &Path) -> Result<Option<LockInfo>> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    pid: u32,
    stack: String,
    acquired_at: DateTime<Utc>,
}

/// Held project lock, removed on release or drop
pub struct StateLock {
    path: Option<PathBuf>,
}

impl StateLock {
    pub async fn release(mut self) -> Result<()> {
        if let Some(path) = self.path.take() {
            fs::remove_file(&path).await?;
            debug!("Released state lock");
        }
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ResourceConfig;
    use tempfile::tempdir;

    fn record(name: &str) -> StackRecord {
        let mut resources = ResourceSet::new();
        resources.add(ResourceConfig {
            id: "Vpc1A2B3C4D".to_string(),
            resource_type: "AWS::EC2::VPC".to_string(),
            config: serde_json::json!({"CidrBlock": "10.0.0.0/16"}),
        });
        StackRecord {
            stack_name: name.to_string(),
            stack_id: None,
            vpc: "main".to_string(),
            account: Some("111111111111".to_string()),
            region: Some("ap-southeast-2".to_string()),
            status: "CREATE_COMPLETE".to_string(),
            resources: Some(resources),
            outputs: BTreeMap::from([("VpcId".to_string(), "vpc-0123".to_string())]),
            deployed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_state_save_load() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let mut state = GlobalState::new();
        state.record(record("DREAMCHASER-VPC-STACK-MAIN"));
        manager.save(&state).await.unwrap();

        let loaded = manager.load().await.unwrap();
        assert_eq!(loaded.stacks.len(), 1);
        assert_eq!(
            loaded
                .deployed_resources("DREAMCHASER-VPC-STACK-MAIN")
                .map(|r| r.len()),
            Some(1)
        );
        assert!(loaded.deployed_resources("other").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_template_has_no_resources() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let mut state = GlobalState::new();
        state.record(StackRecord {
            resources: None,
            ..record("DREAMCHASER-VPC-STACK-MAIN")
        });
        manager.save(&state).await.unwrap();

        let loaded = manager.load().await.unwrap();
        assert!(loaded.deployed_resources("DREAMCHASER-VPC-STACK-MAIN").is_none());
    }

    #[tokio::test]
    async fn test_save_keeps_backup() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        manager.save(&GlobalState::new()).await.unwrap();
        manager.save(&GlobalState::new()).await.unwrap();

        assert!(temp_dir.path().join(".dreamchaser/state.json.backup").exists());
        assert!(!temp_dir.path().join(".dreamchaser/state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_stale_lock_is_taken_over() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());
        let dir = temp_dir.path().join(".dreamchaser");
        std::fs::create_dir_all(&dir).unwrap();

        let stale = LockInfo {
            holder: "old-host".to_string(),
            pid: 1,
            stack: "vpc-a".to_string(),
            acquired_at: Utc::now() - chrono::Duration::hours(STALE_LOCK_HOURS + 1),
        };
        std::fs::write(dir.join("lock.json"), serde_json::to_string(&stale).unwrap()).unwrap();

        let lock = manager.acquire_lock("vpc-b").await.unwrap();
        let content = std::fs::read_to_string(dir.join("lock.json")).unwrap();
        assert!(content.contains("vpc-b"));
        lock.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_state() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let state = manager.load().await.unwrap();
        assert!(state.stacks.is_empty());
    }

    #[tokio::test]
    async fn test_newer_version_rejected() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let mut state = GlobalState::new();
        state.version = STATE_VERSION + 1;
        manager.save(&state).await.unwrap();

        assert!(matches!(
            manager.load().await,
            Err(CloudError::StateError(_))
        ));
    }

    #[tokio::test]
    async fn test_lock_is_exclusive() {
        let temp_dir = tempdir().unwrap();
        let manager = StateManager::new(temp_dir.path());

        let lock = manager.acquire_lock("vpc-a").await.unwrap();
        let err = manager.acquire_lock("vpc-b").await.err().unwrap();
        assert!(matches!(&err, CloudError::LockError(m) if m.contains("vpc-a")));

        lock.release().await.unwrap();
        let again = manager.acquire_lock("vpc-b").await.unwrap();
        drop(again);
        assert!(!temp_dir.path().join(".dreamchaser/lock.json").exists());
    }
}

pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};
use tracing::debug;

/// 設定ファイルのパスを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "DREAMCHASER_CONFIG_PATH";

/// プロジェクト内のローカルディレクトリ（状態ファイルもここに置く）
pub const PROJECT_DIR: &str = ".dreamchaser";

const ROOT_CANDIDATES: [&str; 2] = ["dreamchaser.kdl", ".dreamchaser.kdl"];
const LOCAL_CANDIDATES: [&str; 2] = ["dreamchaser.local.kdl", ".dreamchaser.local.kdl"];

/// 見つかった設定ファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFiles {
    /// 共有の設定ファイル
    pub root: Option<PathBuf>,
    /// 個人用の上書きファイル（root の後に読む）
    pub local: Option<PathBuf>,
    /// 状態ファイルの基準ディレクトリ
    pub project_root: PathBuf,
}

impl ProjectFiles {
    /// 読み込み順のパス一覧
    pub fn paths(&self) -> Vec<PathBuf> {
        self.root.iter().chain(self.local.iter()).cloned().collect()
    }
}

/// DreamChaser のグローバル設定ディレクトリを取得
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("dreamchaser");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// プロジェクトの設定ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 DREAMCHASER_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: dreamchaser.kdl / .dreamchaser.kdl と *.local.kdl
/// 3. ./.dreamchaser/ ディレクトリ内: 同様
/// 4. ~/.config/dreamchaser/dreamchaser.kdl (グローバル設定)
pub fn find_project_files() -> Result<ProjectFiles> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if !path.exists() {
            return Err(ConfigError::ConfigPathMissing(path));
        }
        let project_root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        return Ok(ProjectFiles {
            root: Some(path),
            local: None,
            project_root,
        });
    }

    let current_dir = std::env::current_dir()?;

    // 2, 3. カレントディレクトリと ./.dreamchaser/
    if let Some(files) = find_in(&current_dir, &current_dir) {
        return Ok(files);
    }
    let project_dir = current_dir.join(PROJECT_DIR);
    if project_dir.is_dir()
        && let Some(files) = find_in(&project_dir, &current_dir)
    {
        return Ok(files);
    }

    // 4. グローバル設定ファイル
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("dreamchaser").join(ROOT_CANDIDATES[0]);
        if global_config.exists() {
            debug!(path = %global_config.display(), "Using global config");
            return Ok(ProjectFiles {
                root: Some(global_config),
                local: None,
                project_root: current_dir,
            });
        }
    }

    Err(ConfigError::ProjectFileNotFound)
}

/// ディレクトリ内の設定ファイル。どちらもなければ None
fn find_in(dir: &Path, project_root: &Path) -> Option<ProjectFiles> {
    let first_existing = |candidates: &[&str]| {
        candidates
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    };

    let root = first_existing(&ROOT_CANDIDATES);
    let local = first_existing(&LOCAL_CANDIDATES);
    if root.is_none() && local.is_none() {
        return None;
    }

    debug!(dir = %dir.display(), ?root, ?local, "Found project files");
    Some(ProjectFiles {
        root,
        local,
        project_root: project_root.to_path_buf(),
    })
}

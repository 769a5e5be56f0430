use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error(
        "設定ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: dreamchaser.kdl, dreamchaser.local.kdl, .dreamchaser.kdl, .dreamchaser.local.kdl\n\
        - ./.dreamchaser/ ディレクトリ\n\
        - ~/.config/dreamchaser/dreamchaser.kdl\n\
        または DREAMCHASER_CONFIG_PATH 環境変数で直接指定できます"
    )]
    ProjectFileNotFound,

    #[error("DREAMCHASER_CONFIG_PATH のファイルが存在しません: {0}")]
    ConfigPathMissing(std::path::PathBuf),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

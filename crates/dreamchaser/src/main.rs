mod commands;
mod utils;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dreamchaser")]
#[command(about = "KDL で宣言したマルチAZ の VPC トポロジーを AWS にデプロイする", long_about = None)]
struct Cli {
    /// デバッグログを出力する
    #[arg(short, long, global = true)]
    verbose: bool,

    /// コンテキスト値を上書きする（例: -c DREAMCHASER_VPC_CIDR=10.0.0.0/16）
    #[arg(short = 'c', long = "context", value_name = "KEY=VALUE", global = true)]
    context: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

/// 対象の VPC とスタック
#[derive(Args, Debug, Clone, Default)]
pub struct Target {
    /// VPC 名（省略時はスタックの VPC、なければ1つ目）
    #[arg(long)]
    pub vpc: Option<String>,

    /// スタック名（省略時は1つ目の stack ブロック）
    #[arg(long)]
    pub stack: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 計画を組み立て、前回のデプロイとの差分を表示
    Plan {
        #[command(flatten)]
        target: Target,
    },
    /// CloudFormation テンプレートを生成
    Synth {
        #[command(flatten)]
        target: Target,

        /// 出力先ファイル（省略時は標準出力）
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// スタックを作成または更新
    Deploy {
        #[command(flatten)]
        target: Target,

        /// スタック出力を書き出す JSON ファイル
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// スタック出力を表示・書き出し
    Outputs {
        /// スタック名（省略時は1つ目の stack ブロック）
        #[arg(long)]
        stack: Option<String>,

        /// 書き出し先の JSON ファイル
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Organizations・OU・RAM 共有を初期化し、OU を SSM に保存
    Bootstrap,
    /// SSM パラメータを操作
    #[command(subcommand)]
    Param(ParamCommands),
    /// リージョンのアベイラビリティゾーンを一覧表示
    Zones {
        /// リージョン（省略時は設定ファイルかコンテキスト）
        #[arg(short, long, env = "DREAMCHASER_CDK_REGION")]
        region: Option<String>,
    },
    /// 設定ファイルを検証
    Validate {
        #[command(flatten)]
        target: Target,
    },
    /// バージョン情報を表示
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ParamCommands {
    /// パラメータの値を表示
    Get {
        /// パラメータ名
        name: String,
    },
    /// 文字列パラメータを保存（上書き）
    Put {
        /// パラメータ名
        name: String,
        /// 値
        value: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!();
        eprintln!("{} {:#}", "✗ エラー:".red().bold(), e);
        std::process::exit(utils::exit_code(&e));
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("dreamchaser {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let workspace = utils::load_workspace(&cli.context)?;

    match cli.command {
        Commands::Plan { target } => commands::plan::handle(&workspace, &target).await,
        Commands::Synth { target, out } => {
            commands::synth::handle(&workspace, &target, out.as_deref()).await
        }
        Commands::Deploy { target, output } => {
            commands::deploy::handle(&workspace, &target, output).await
        }
        Commands::Outputs { stack, output } => {
            commands::outputs::handle(&workspace, stack.as_deref(), output).await
        }
        Commands::Bootstrap => commands::bootstrap::handle(&workspace).await,
        Commands::Param(param_cmd) => commands::param::handle(&workspace, param_cmd).await,
        Commands::Zones { region } => commands::zones::handle(&workspace, region).await,
        Commands::Validate { target } => commands::validate::handle(&workspace, &target),
        Commands::Version => unreachable!("Version is handled before config loading"),
    }
}

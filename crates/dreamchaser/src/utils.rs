use crate::Target;
use colored::Colorize;
use dreamchaser_cloud::{CloudError, ParameterStore, ZoneCatalog};
use dreamchaser_cloud_aws::AwsClients;
use dreamchaser_config::{ConfigError, find_project_files};
use dreamchaser_core::loader::{DEFAULT_VPC_NAME, apply_context};
use dreamchaser_core::{Context, Project, ShareTarget, StackConfig, VpcParams, resolve_vpc};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 読み込んだプロジェクトとコンテキスト
pub struct Workspace {
    pub project: Project,
    pub context: Context,
    /// 状態ファイル (.dreamchaser/) の基準ディレクトリ
    pub project_root: PathBuf,
    /// 読み込んだ設定ファイル（読み込み順）
    pub files: Vec<PathBuf>,
}

impl Workspace {
    /// AWS クライアントに渡すリージョン
    pub fn region(&self) -> Option<&str> {
        self.project.region.as_deref()
    }

    /// プロジェクトルートからの相対パスを解決
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

/// 設定ファイルを探してプロジェクトを読み込む
///
/// 設定ファイルがない場合はコンテキストだけで動く空のプロジェクトを返す。
pub fn load_workspace(context_args: &[String]) -> anyhow::Result<Workspace> {
    let context = Context::from_env().with_overrides(context_args)?;

    match find_project_files() {
        Ok(files) => {
            let paths = files.paths();
            let project = dreamchaser_core::load_project(&paths, &context)?;
            Ok(Workspace {
                project,
                context,
                project_root: files.project_root,
                files: paths,
            })
        }
        Err(ConfigError::ProjectFileNotFound) => {
            debug!("No config file found, using context only");
            let project_root = std::env::current_dir()?;
            let mut project = Project {
                name: project_root
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unnamed")
                    .to_string(),
                ..Default::default()
            };
            apply_context(&mut project, &context);
            Ok(Workspace {
                project,
                context,
                project_root,
                files: Vec::new(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// stack ブロックがない場合のスタック名
pub fn default_stack_name(vpc_name: &str) -> String {
    format!("DREAMCHASER-VPC-STACK-{}", vpc_name.to_uppercase())
}

/// 対象のスタック設定と VPC パラメータ
#[derive(Debug, Clone)]
pub struct Selection {
    pub stack: StackConfig,
    pub vpc: VpcParams,
}

/// `--stack` / `--vpc` から対象を決める
pub fn select(workspace: &Workspace, target: &Target) -> anyhow::Result<Selection> {
    let project = &workspace.project;
    let stack = match target.stack.as_deref() {
        Some(name) => Some(project.stack(Some(name))?.clone()),
        None => project
            .stacks
            .iter()
            .find(|s| target.vpc.is_none() || s.vpc == target.vpc)
            .cloned(),
    };

    let vpc_name = target
        .vpc
        .as_deref()
        .or_else(|| stack.as_ref().and_then(|s| s.vpc.as_deref()));
    let vpc = resolve_vpc(project, vpc_name, &workspace.context)?;
    let stack = stack.unwrap_or_else(|| StackConfig::new(default_stack_name(&vpc.name)));

    debug!(stack = %stack.name, vpc = %vpc.name, "Selected target");
    Ok(Selection { stack, vpc })
}

/// 組み立て前に AWS への問い合わせが必要か
pub fn needs_cloud(vpc: &VpcParams) -> bool {
    vpc.zones.is_empty() || share_parameter(vpc).is_some()
}

fn share_parameter(vpc: &VpcParams) -> Option<&str> {
    match vpc.transit_gateway.as_ref()?.share_with.as_ref()? {
        ShareTarget::FromParameter(name) => Some(name.as_str()),
        ShareTarget::Principal(_) => None,
    }
}

/// 未指定のゾーンとパラメータストア参照の共有先を解決する
pub async fn fill_from_cloud(
    vpc: &mut VpcParams,
    zones: &dyn ZoneCatalog,
    parameters: &dyn ParameterStore,
) -> Result<(), CloudError> {
    if vpc.zones.is_empty() {
        vpc.zones = zones.availability_zones().await?;
        info!(zones = ?vpc.zones, "Using availability zones of the region");
    }
    if let Some(name) = share_parameter(vpc).map(str::to_string) {
        let principal = parameters.get_parameter(&name).await?;
        info!(parameter = %name, "Resolved share target from parameter store");
        if let Some(tgw) = vpc.transit_gateway.as_mut() {
            tgw.share_with = Some(ShareTarget::Principal(principal));
        }
    }
    Ok(())
}

/// 対象を決め、必要なら AWS から不足値を補う
pub async fn prepare(workspace: &Workspace, target: &Target) -> anyhow::Result<Selection> {
    let mut selection = select(workspace, target)?;
    if needs_cloud(&selection.vpc) {
        let region = Some(selection.vpc.region.as_str()).filter(|r| !r.is_empty());
        let clients = AwsClients::load(region.or(workspace.region())).await;
        fill_from_cloud(&mut selection.vpc, &clients.zones, &clients.parameters).await?;
    }
    Ok(selection)
}

/// outputs コマンドなど VPC を組み立てない場面のスタック名
pub fn stack_name(workspace: &Workspace, name: Option<&str>) -> anyhow::Result<StackConfig> {
    let project = &workspace.project;
    if !project.stacks.is_empty() {
        return Ok(project.stack(name)?.clone());
    }
    let name = match name {
        Some(name) => name.to_string(),
        None => default_stack_name(
            project
                .vpcs
                .first()
                .map(|v| v.name.as_str())
                .unwrap_or(DEFAULT_VPC_NAME),
        ),
    };
    Ok(StackConfig::new(name))
}

/// プロセスの終了コード
///
/// クラウド側のエラーは操作ごとのコード、それ以外は 1。
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|e| e.downcast_ref::<CloudError>())
        .map(CloudError::exit_code)
        .unwrap_or(1)
}

/// 読み込んだ設定ファイル情報を表示
pub fn print_loaded_config_files(workspace: &Workspace) {
    if workspace.files.is_empty() {
        println!(
            "📄 設定ファイルなし（{}）",
            "コンテキスト値のみで構成".yellow()
        );
        return;
    }
    println!("📄 読み込んだ設定ファイル:");
    for (i, path) in workspace.files.iter().enumerate() {
        if i == 0 {
            println!("  • {}", path.display().to_string().cyan());
        } else {
            println!(
                "  • {} (ローカルオーバーライド)",
                path.display().to_string().cyan()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dreamchaser_cloud::Operation;
    use dreamchaser_core::{TransitGatewayParams, parse_kdl_string};

    fn workspace(kdl: &str, overrides: &[&str]) -> Workspace {
        let context = Context::new().with_overrides(overrides).unwrap();
        let mut project = parse_kdl_string(kdl, "demo".to_string()).unwrap();
        apply_context(&mut project, &context);
        Workspace {
            project,
            context,
            project_root: PathBuf::from("/tmp/demo"),
            files: vec![PathBuf::from("/tmp/demo/dreamchaser.kdl")],
        }
    }

    const TWO_VPCS: &str = r#"
region "us-east-1"
vpc "main" {
    cidr "10.0.0.0/16"
    zones "us-east-1a" "us-east-1b"
}
vpc "edge" {
    cidr "10.1.0.0/16"
}
stack "edge-stack" {
    vpc "edge"
}
"#;

    #[test]
    fn test_default_stack_name() {
        assert_eq!(default_stack_name("main"), "DREAMCHASER-VPC-STACK-MAIN");
    }

    #[test]
    fn test_select_defaults_to_first_stack() {
        let ws = workspace(TWO_VPCS, &[]);
        let selection = select(&ws, &Target::default()).unwrap();
        assert_eq!(selection.stack.name, "edge-stack");
        assert_eq!(selection.vpc.name, "edge");
        assert_eq!(selection.vpc.region, "us-east-1");
    }

    #[test]
    fn test_select_vpc_without_stack_uses_default_name() {
        let ws = workspace(TWO_VPCS, &[]);
        let target = Target {
            vpc: Some("main".to_string()),
            stack: None,
        };
        let selection = select(&ws, &target).unwrap();
        assert_eq!(selection.vpc.name, "main");
        assert_eq!(selection.stack.name, "DREAMCHASER-VPC-STACK-MAIN");
    }

    #[test]
    fn test_select_unknown_stack() {
        let ws = workspace(TWO_VPCS, &[]);
        let target = Target {
            vpc: None,
            stack: Some("missing".to_string()),
        };
        let err = select(&ws, &target).unwrap_err();
        assert_eq!(exit_code(&err), 1);
    }

    #[test]
    fn test_select_context_only() {
        let ws = workspace("", &["DREAMCHASER_VPC_CIDR=10.9.0.0/16"]);
        let selection = select(&ws, &Target::default()).unwrap();
        assert_eq!(selection.vpc.cidr, "10.9.0.0/16");
        assert_eq!(selection.stack.name, "DREAMCHASER-VPC-STACK-MAIN");
        assert!(needs_cloud(&selection.vpc));
    }

    #[test]
    fn test_stack_name_without_stacks() {
        let ws = workspace(TWO_VPCS.split("stack").next().unwrap(), &[]);
        assert_eq!(
            stack_name(&ws, None).unwrap().name,
            "DREAMCHASER-VPC-STACK-MAIN"
        );
        assert_eq!(stack_name(&ws, Some("other")).unwrap().name, "other");
    }

    #[tokio::test]
    async fn test_fill_from_cloud() {
        let mut vpc = VpcParams::easy("main", "10.0.0.0/16", "us-east-1", Vec::new());
        vpc.transit_gateway = Some(TransitGatewayParams {
            share_with: Some(ShareTarget::FromParameter("DC_ONE_OU_ID".to_string())),
            ..TransitGatewayParams::create()
        });
        assert!(needs_cloud(&vpc));

        let zones = StaticZones(vec!["us-east-1a".to_string(), "us-east-1b".to_string()]);
        let params = StaticParameter(Some("arn:aws:organizations::1:ou/o-x/ou-y".to_string()));
        fill_from_cloud(&mut vpc, &zones, &params).await.unwrap();

        assert_eq!(vpc.zones, ["us-east-1a", "us-east-1b"]);
        assert_eq!(
            vpc.transit_gateway.unwrap().share_with,
            Some(ShareTarget::Principal(
                "arn:aws:organizations::1:ou/o-x/ou-y".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_fill_from_cloud_missing_parameter_exit_code() {
        let mut vpc = VpcParams::easy("main", "10.0.0.0/16", "us-east-1", vec!["a".into()]);
        vpc.transit_gateway = Some(TransitGatewayParams {
            share_with: Some(ShareTarget::FromParameter("DC_ONE_OU_ID".to_string())),
            ..TransitGatewayParams::create()
        });

        let err = fill_from_cloud(&mut vpc, &StaticZones(Vec::new()), &StaticParameter(None))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 197);

        let err = anyhow::Error::from(err).context("resolving share target");
        assert_eq!(exit_code(&err), 197);
    }

    #[test]
    fn test_exit_code_for_stack_errors() {
        let err = anyhow::Error::from(CloudError::provider(
            Operation::CreateStack,
            "ValidationError",
            "bad template",
            Some(400),
        ));
        assert_eq!(exit_code(&err), 400);
        assert_eq!(exit_code(&anyhow::anyhow!("plain")), 1);
    }

    struct StaticZones(Vec<String>);
    struct StaticParameter(Option<String>);

    #[async_trait]
    impl ZoneCatalog for StaticZones {
        async fn availability_zones(&self) -> dreamchaser_cloud::Result<Vec<String>> {
            Ok(self.0.clone())
        }
    }

    #[async_trait]
    impl ParameterStore for StaticParameter {
        async fn get_parameter(&self, name: &str) -> dreamchaser_cloud::Result<String> {
            self.0.clone().ok_or_else(|| {
                CloudError::provider(
                    Operation::ParameterStore,
                    "ParameterNotFound",
                    format!("{} not found", name),
                    Some(400),
                )
            })
        }

        async fn put_string_parameter(
            &self,
            _name: &str,
            _value: &str,
        ) -> dreamchaser_cloud::Result<()> {
            Ok(())
        }
    }
}

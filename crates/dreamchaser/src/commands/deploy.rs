use crate::Target;
use crate::utils::{self, Workspace};
use anyhow::anyhow;
use colored::Colorize;
use dreamchaser_cloud::{
    DeployOutcome, DeployTarget, ResourceSet, StackRequest, StateManager, WaiterConfig,
    deploy_and_record, write_outputs,
};
use dreamchaser_cloud_aws::AwsClients;
use dreamchaser_core::{assemble, synthesize};
use std::path::PathBuf;
use tracing::info;

pub async fn handle(
    workspace: &Workspace,
    target: &Target,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    utils::print_loaded_config_files(workspace);
    let selection = utils::prepare(workspace, target).await?;
    let stack = &selection.stack;

    // テンプレート URL 指定時も計画は検証する
    let plan = assemble(&selection.vpc)?;
    let template = synthesize(&plan);
    // URL テンプレートの中身は分からないのでリソースは記録しない
    let (body, resources) = match stack.template_url {
        Some(_) => (None, None),
        None => (
            Some(template.to_json()?),
            Some(ResourceSet::from_template(&template)),
        ),
    };
    let request = StackRequest::from_config(stack, body)
        .ok_or_else(|| anyhow!("スタック {} のテンプレートがありません", stack.name))?;

    println!();
    println!(
        "{} {} ({}個のリソース)",
        "デプロイ中:".blue().bold(),
        stack.name.cyan(),
        template.resource_count()
    );

    let region = Some(selection.vpc.region.as_str()).filter(|r| !r.is_empty());
    let clients = AwsClients::load(region.or(workspace.region())).await;
    let deployed = DeployTarget {
        vpc: selection.vpc.name.clone(),
        account: workspace.project.account.clone(),
        region: region
            .map(str::to_string)
            .or_else(|| workspace.project.region.clone()),
    };
    let report = deploy_and_record(
        &clients.stacks,
        &StateManager::new(&workspace.project_root),
        &request,
        resources,
        deployed,
        &WaiterConfig::default(),
    )
    .await?;
    info!(stack = %stack.name, outcome = %report.outcome, "Deploy finished");

    match report.outcome {
        DeployOutcome::Created => println!("{}", "✓ スタックを作成しました".green().bold()),
        DeployOutcome::Updated => println!("{}", "✓ スタックを更新しました".green().bold()),
        DeployOutcome::NoChanges => println!("{}", "✓ 変更はありませんでした".green()),
    }
    for (key, value) in report.outputs() {
        println!("  {} = {}", key.cyan(), value);
    }

    let output = output.or_else(|| stack.output.as_deref().map(|p| workspace.resolve_path(p)));
    if let Some(path) = output {
        write_outputs(&path, report.outputs()).await?;
        println!(
            "{} {}",
            "✓ スタック出力を書き出しました:".green(),
            path.display().to_string().cyan()
        );
    }

    Ok(())
}

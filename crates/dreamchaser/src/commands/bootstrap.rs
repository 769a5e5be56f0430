use crate::utils::Workspace;
use colored::Colorize;
use dreamchaser_cloud::bootstrap_organization;
use dreamchaser_cloud_aws::AwsClients;

fn status(done: bool) -> colored::ColoredString {
    if done {
        "作成".green()
    } else {
        "既存".yellow()
    }
}

pub async fn handle(workspace: &Workspace) -> anyhow::Result<()> {
    let config = &workspace.project.organization;
    println!("{}", "AWS Organizations を初期化中...".blue());

    let clients = AwsClients::load(workspace.region()).await;
    let report = bootstrap_organization(
        &clients.organizations,
        &clients.sharing,
        &clients.parameters,
        config,
    )
    .await?;

    println!(
        "  Organization ({}): {}",
        config.feature_set,
        status(report.organization_created)
    );
    println!(
        "  ポリシータイプ {} ({}): {}",
        config.policy_type,
        report.root_id,
        status(report.policy_enabled)
    );
    println!(
        "  OU {}: {}",
        config.unit.cyan(),
        status(report.unit_created)
    );
    println!("    {}", report.unit_arn);
    println!("  RAM 共有: {}", "有効".green());
    println!(
        "{} {} = {}",
        "✓ OU を保存しました:".green().bold(),
        report.parameter.cyan(),
        report.unit_arn
    );

    Ok(())
}

use crate::Target;
use crate::utils::{self, Workspace};
use colored::Colorize;
use dreamchaser_core::{VpcParams, assemble, resolve_vpc};

/// 設定ファイルを検証する（AWS には接続しない）
pub fn handle(workspace: &Workspace, target: &Target) -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());
    utils::print_loaded_config_files(workspace);

    let project = &workspace.project;
    let vpcs: Vec<VpcParams> =
        if target.vpc.is_some() || target.stack.is_some() || project.vpcs.is_empty() {
            vec![utils::select(workspace, target)?.vpc]
        } else {
            project
                .vpcs
                .iter()
                .map(|v| resolve_vpc(project, Some(&v.name), &workspace.context))
                .collect::<Result<_, _>>()?
        };

    println!();
    println!("サマリー:");
    println!("  プロジェクト: {}", project.name.cyan());
    println!(
        "  アカウント: {}",
        project.account.as_deref().unwrap_or("(未設定)")
    );
    println!(
        "  リージョン: {}",
        project.region.as_deref().unwrap_or("(未設定)")
    );
    println!("  VPC: {}個", vpcs.len());

    for vpc in &vpcs {
        if utils::needs_cloud(vpc) {
            println!(
                "    - {} ({}, {}) {}",
                vpc.name.cyan(),
                vpc.cidr,
                vpc.variant,
                "ゾーン・共有先はデプロイ時に AWS から取得".yellow()
            );
            continue;
        }
        let plan = assemble(vpc)?;
        println!(
            "    - {} ({}, {}) {}ゾーン, {}個のリソース",
            vpc.name.cyan(),
            vpc.cidr,
            vpc.variant,
            plan.zones.len(),
            plan.resource_count()
        );
    }

    if !project.stacks.is_empty() {
        println!("  スタック: {}個", project.stacks.len());
        for stack in &project.stacks {
            let vpc = stack.vpc.as_deref().unwrap_or("(1つ目のVPC)");
            println!(
                "    - {} (vpc: {}, timeout: {}分)",
                stack.name.cyan(),
                vpc,
                stack.timeout_minutes
            );
        }
    }

    println!();
    println!("{}", "✓ 設定ファイルは正常です！".green().bold());
    Ok(())
}

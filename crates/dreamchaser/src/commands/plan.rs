use crate::Target;
use crate::utils::{self, Workspace};
use colored::Colorize;
use dreamchaser_cloud::{ActionType, Plan, ResourceSet, StateManager};
use dreamchaser_core::{VpcPlan, assemble, synthesize};

pub async fn handle(workspace: &Workspace, target: &Target) -> anyhow::Result<()> {
    utils::print_loaded_config_files(workspace);
    let selection = utils::prepare(workspace, target).await?;

    let plan = assemble(&selection.vpc)?;
    print_topology(&plan);

    let template = synthesize(&plan);
    let state = StateManager::new(&workspace.project_root).load().await?;
    println!();
    println!("{} {}", "スタック:".bold(), selection.stack.name.cyan());
    if let Some(url) = &selection.stack.template_url {
        println!("  テンプレート: {} (合成結果は使いません)", url.yellow());
    }
    if let Some(record) = state.get(&selection.stack.name) {
        println!(
            "  前回のデプロイ: {} ({})",
            record.deployed_at.format("%Y-%m-%d %H:%M:%S UTC"),
            record.status
        );
    }

    let Some(current) = state.deployed_resources(&selection.stack.name) else {
        println!(
            "{}",
            "前回は URL のテンプレートでデプロイされたため差分は表示できません".yellow()
        );
        return Ok(());
    };
    let diff = Plan::diff(&ResourceSet::from_template(&template), &current);

    if !diff.has_changes {
        println!("{}", "✓ 変更はありません".green());
        return Ok(());
    }

    println!();
    for action in &diff.actions {
        let line = format!(
            "{} ({}) {}",
            action.resource_id, action.resource_type, action.description
        );
        match action.action_type {
            ActionType::Create => println!("  {} {}", "+".green().bold(), line),
            ActionType::Update => println!("  {} {}", "~".yellow().bold(), line),
            ActionType::Delete => println!("  {} {}", "-".red().bold(), line),
            ActionType::NoOp => {}
        }
    }
    println!();
    println!("{}", diff.summary().to_string().bold());

    Ok(())
}

fn print_topology(plan: &VpcPlan) {
    println!();
    println!(
        "{} {} ({}, {})",
        "VPC:".bold(),
        plan.name.cyan(),
        plan.vpc.cidr,
        plan.region
    );
    let zones: Vec<&str> = plan.zones.iter().map(|z| z.name.as_str()).collect();
    println!("  ゾーン: {}", zones.join(", "));
    println!("  NATゲートウェイ: {}個", plan.nat_gateways.len());

    for tier in plan.tiers() {
        println!("  {} サブネット:", tier.label().cyan());
        for subnet in plan.subnets_of(tier) {
            println!("    - {} {}", subnet.zone_name, subnet.cidr);
        }
    }
    if let Some(endpoint) = &plan.endpoint {
        println!(
            "  S3 エンドポイント: ルートテーブル {}個",
            endpoint.route_tables.len()
        );
    }
    if let Some(tgw) = &plan.transit_gateway {
        println!(
            "  Transit Gateway: ルートテーブル {}個 ({})",
            tgw.route_tables.len(),
            tgw.route_domain
        );
    }
    println!("  リソース: {}個", plan.resource_count());
}

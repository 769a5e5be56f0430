use crate::utils::{self, Workspace};
use colored::Colorize;
use dreamchaser_cloud::{CloudError, StackExecutor, write_outputs};
use dreamchaser_cloud_aws::AwsClients;
use std::path::PathBuf;

pub async fn handle(
    workspace: &Workspace,
    stack: Option<&str>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let stack = utils::stack_name(workspace, stack)?;
    let clients = AwsClients::load(workspace.region()).await;

    let description = clients
        .stacks
        .describe_stack(&stack.name)
        .await
        .map_err(|e| match e.status() {
            Some(403) => CloudError::AccessDenied(stack.name.clone()),
            _ => e,
        })?;

    println!(
        "{} {} ({})",
        "スタック:".bold(),
        description.name.cyan(),
        description.status
    );
    if description.outputs.is_empty() {
        println!("  {}", "出力はありません".yellow());
    }
    for (key, value) in &description.outputs {
        println!("  {} = {}", key.cyan(), value);
    }

    let output = output.or_else(|| stack.output.as_deref().map(|p| workspace.resolve_path(p)));
    if let Some(path) = output {
        write_outputs(&path, &description.outputs).await?;
        println!(
            "{} {}",
            "✓ スタック出力を書き出しました:".green(),
            path.display().to_string().cyan()
        );
    }

    Ok(())
}

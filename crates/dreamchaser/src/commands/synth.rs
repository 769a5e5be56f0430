use crate::Target;
use crate::utils::{self, Workspace};
use anyhow::Context;
use colored::Colorize;
use dreamchaser_core::{assemble, synthesize};
use std::path::Path;

pub async fn handle(
    workspace: &Workspace,
    target: &Target,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let selection = utils::prepare(workspace, target).await?;
    let plan = assemble(&selection.vpc)?;
    let template = synthesize(&plan);
    let json = template.to_json()?;

    match out {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("{} を作成できません", parent.display()))?;
            }
            std::fs::write(path, &json)
                .with_context(|| format!("{} に書き込めません", path.display()))?;
            eprintln!(
                "{} {} ({}個のリソース)",
                "✓ テンプレートを書き出しました:".green(),
                path.display().to_string().cyan(),
                template.resource_count()
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}

use crate::ParamCommands;
use crate::utils::Workspace;
use colored::Colorize;
use dreamchaser_cloud::ParameterStore;
use dreamchaser_cloud_aws::AwsClients;

pub async fn handle(workspace: &Workspace, command: ParamCommands) -> anyhow::Result<()> {
    let clients = AwsClients::load(workspace.region()).await;

    match command {
        ParamCommands::Get { name } => {
            let value = clients.parameters.get_parameter(&name).await?;
            println!("{}", value);
        }
        ParamCommands::Put { name, value } => {
            clients
                .parameters
                .put_string_parameter(&name, &value)
                .await?;
            println!("{} {}", "✓ 保存しました:".green(), name.cyan());
        }
    }

    Ok(())
}

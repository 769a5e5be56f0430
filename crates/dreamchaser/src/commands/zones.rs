use crate::utils::Workspace;
use colored::Colorize;
use dreamchaser_cloud::ZoneCatalog;
use dreamchaser_cloud_aws::AwsClients;

pub async fn handle(workspace: &Workspace, region: Option<String>) -> anyhow::Result<()> {
    let region = region.as_deref().or(workspace.region());
    let clients = AwsClients::load(region).await;
    let zones = clients.zones.availability_zones().await?;

    println!(
        "{} {}",
        "アベイラビリティゾーン:".bold(),
        region.unwrap_or("(既定のリージョン)").cyan()
    );
    for (index, zone) in zones.iter().enumerate() {
        println!("  {} {}", index, zone);
    }

    Ok(())
}

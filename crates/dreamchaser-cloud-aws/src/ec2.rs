use crate::sdk_error;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ec2::Client;
use aws_sdk_ec2::types::Filter;
use dreamchaser_cloud::{Operation, Result, ZoneCatalog};

pub struct Ec2Zones {
    client: Client,
}

impl Ec2Zones {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl ZoneCatalog for Ec2Zones {
    async fn availability_zones(&self) -> Result<Vec<String>> {
        let output = self
            .client
            .describe_availability_zones()
            .filters(Filter::builder().name("state").values("available").build())
            .send()
            .await
            .map_err(|e| sdk_error(Operation::DescribeZones, e))?;

        let mut zones: Vec<String> = output
            .availability_zones()
            .iter()
            .filter(|z| z.zone_type().is_none_or(|t| t == "availability-zone"))
            .filter_map(|z| z.zone_name().map(str::to_string))
            .collect();
        zones.sort();
        Ok(zones)
    }
}

use crate::sdk_error;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_cloudformation::Client;
use aws_sdk_cloudformation::types::{Capability, OnFailure, Parameter, Stack};
use dreamchaser_cloud::{
    Operation, Result, StackDescription, StackExecutor, StackRequest, TemplateSource,
};
use std::collections::BTreeMap;
use tracing::info;

pub struct CloudFormationStacks {
    client: Client,
}

impl CloudFormationStacks {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

fn parameters(request: &StackRequest) -> Vec<Parameter> {
    request
        .parameters
        .iter()
        .map(|(key, value)| {
            Parameter::builder()
                .parameter_key(key)
                .parameter_value(value)
                .build()
        })
        .collect()
}

fn capabilities(request: &StackRequest) -> Vec<Capability> {
    request
        .capabilities
        .iter()
        .map(|c| Capability::from(c.as_str()))
        .collect()
}

pub(crate) fn describe(name: &str, stack: &Stack) -> StackDescription {
    let outputs: BTreeMap<String, String> = stack
        .outputs()
        .iter()
        .filter_map(|o| Some((o.output_key()?.to_string(), o.output_value()?.to_string())))
        .collect();

    StackDescription {
        name: stack.stack_name().unwrap_or(name).to_string(),
        stack_id: stack.stack_id().map(str::to_string),
        status: stack
            .stack_status()
            .map(|s| s.as_str().to_string())
            .unwrap_or_default(),
        status_reason: stack.stack_status_reason().map(str::to_string),
        outputs,
    }
}

#[async_trait]
impl StackExecutor for CloudFormationStacks {
    async fn describe_stack(&self, name: &str) -> Result<StackDescription> {
        let output = self
            .client
            .describe_stacks()
            .stack_name(name)
            .send()
            .await
            .map_err(|e| sdk_error(Operation::DescribeStack, e))?;

        // A missing stack normally fails with 400; treat an empty result the same way
        match output.stacks().first() {
            Some(stack) => Ok(describe(name, stack)),
            None => Err(dreamchaser_cloud::CloudError::provider(
                Operation::DescribeStack,
                "ValidationError",
                format!("Stack with id {} does not exist", name),
                Some(400),
            )),
        }
    }

    async fn create_stack(&self, request: &StackRequest) -> Result<String> {
        info!(stack = %request.name, "CreateStack");
        let mut call = self
            .client
            .create_stack()
            .stack_name(&request.name)
            .set_parameters(Some(parameters(request)))
            .set_capabilities(Some(capabilities(request)))
            .timeout_in_minutes(request.timeout_minutes as i32)
            .on_failure(OnFailure::Rollback)
            .enable_termination_protection(request.termination_protection);
        call = match &request.template {
            TemplateSource::Body(body) => call.template_body(body),
            TemplateSource::Url(url) => call.template_url(url),
        };

        let output = call
            .send()
            .await
            .map_err(|e| sdk_error(Operation::CreateStack, e))?;
        Ok(output.stack_id().unwrap_or(&request.name).to_string())
    }

    async fn update_stack(&self, request: &StackRequest) -> Result<String> {
        info!(stack = %request.name, "UpdateStack");
        let mut call = self
            .client
            .update_stack()
            .stack_name(&request.name)
            .set_parameters(Some(parameters(request)))
            .set_capabilities(Some(capabilities(request)));
        call = match &request.template {
            TemplateSource::Body(body) => call.template_body(body),
            TemplateSource::Url(url) => call.template_url(url),
        };

        let output = call
            .send()
            .await
            .map_err(|e| sdk_error(Operation::UpdateStack, e))?;
        Ok(output.stack_id().unwrap_or(&request.name).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_cloudformation::primitives::DateTime;
    use aws_sdk_cloudformation::types::{Output, StackStatus};

    #[test]
    fn test_describe_maps_outputs() {
        let stack = Stack::builder()
            .stack_name("DREAMCHASER-VPC-STACK-MAIN")
            .creation_time(DateTime::from_secs(0))
            .stack_status(StackStatus::UpdateComplete)
            .outputs(
                Output::builder()
                    .output_key("VpcId")
                    .output_value("vpc-0123")
                    .build(),
            )
            .outputs(Output::builder().output_key("Dangling").build())
            .build()
            .unwrap();

        let description = describe("ignored", &stack);
        assert_eq!(description.name, "DREAMCHASER-VPC-STACK-MAIN");
        assert_eq!(description.status, "UPDATE_COMPLETE");
        assert_eq!(description.outputs.len(), 1);
        assert_eq!(description.outputs["VpcId"], "vpc-0123");
    }

    #[test]
    fn test_request_translation() {
        let mut request = StackRequest::new("s", TemplateSource::Body("{}".into()));
        request
            .parameters
            .insert("Environment".into(), "prod".into());

        let params = parameters(&request);
        assert_eq!(params[0].parameter_key(), Some("Environment"));
        assert_eq!(params[0].parameter_value(), Some("prod"));
        assert_eq!(
            capabilities(&request),
            vec![Capability::CapabilityNamedIam, Capability::CapabilityAutoExpand]
        );
    }
}

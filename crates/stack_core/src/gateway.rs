use serde_json::{json, Value};

use crate::compute::ComputeResource;
use crate::error::SynthError;
use crate::template::{join, reference, sub, Resource};
use crate::unit::DeploymentUnit;

pub const DEFAULT_ROUTE_KEY: &str = "$default";
pub const DEFAULT_STAGE_NAME: &str = "$default";
pub const PAYLOAD_FORMAT_VERSION: &str = "2.0";

/// An HTTP API whose catch-all route proxies every request to one function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpApi {
    api_id: String,
    integration_id: String,
    route_id: String,
    stage_id: String,
    permission_id: String,
}

impl HttpApi {
    pub fn with_default_integration(
        unit: &mut DeploymentUnit,
        construct_id: &str,
        integration_name: &str,
        handler: &ComputeResource,
    ) -> Result<Self, SynthError> {
        let api = Resource::new("AWS::ApiGatewayV2::Api")
            .property("Name", json!(construct_id))
            .property("ProtocolType", json!("HTTP"));
        let api_id = unit.add_resource(&[construct_id, "Resource"], api)?;

        let integration = Resource::new("AWS::ApiGatewayV2::Integration")
            .property("ApiId", reference(&api_id))
            .property("IntegrationType", json!("AWS_PROXY"))
            .property("IntegrationUri", handler.function_arn())
            .property("PayloadFormatVersion", json!(PAYLOAD_FORMAT_VERSION));
        let integration_id = unit.add_resource(
            &[construct_id, "DefaultRoute", integration_name],
            integration,
        )?;

        // The gateway must be allowed to call the function for the
        // integration to work at all.
        let permission = Resource::new("AWS::Lambda::Permission")
            .property("Action", json!("lambda:InvokeFunction"))
            .property("FunctionName", handler.function_arn())
            .property("Principal", json!("apigateway.amazonaws.com"))
            .property(
                "SourceArn",
                join(vec![
                    sub("arn:${AWS::Partition}:execute-api:${AWS::Region}:${AWS::AccountId}:"),
                    reference(&api_id),
                    json!("/*/*"),
                ]),
            );
        let permission_name = format!("{integration_name}-Permission");
        let permission_id = unit.add_resource(
            &[construct_id, "DefaultRoute", permission_name.as_str()],
            permission,
        )?;

        let route = Resource::new("AWS::ApiGatewayV2::Route")
            .property("ApiId", reference(&api_id))
            .property("AuthorizationType", json!("NONE"))
            .property("RouteKey", json!(DEFAULT_ROUTE_KEY))
            .property(
                "Target",
                join(vec![json!("integrations/"), reference(&integration_id)]),
            );
        let route_id = unit.add_resource(&[construct_id, "DefaultRoute"], route)?;

        let stage = Resource::new("AWS::ApiGatewayV2::Stage")
            .property("ApiId", reference(&api_id))
            .property("AutoDeploy", json!(true))
            .property("StageName", json!(DEFAULT_STAGE_NAME));
        let stage_id = unit.add_resource(&[construct_id, "DefaultStage"], stage)?;

        Ok(Self {
            api_id,
            integration_id,
            route_id,
            stage_id,
            permission_id,
        })
    }

    pub fn api_logical_id(&self) -> &str {
        &self.api_id
    }

    pub fn integration_logical_id(&self) -> &str {
        &self.integration_id
    }

    pub fn route_logical_id(&self) -> &str {
        &self.route_id
    }

    pub fn stage_logical_id(&self) -> &str {
        &self.stage_id
    }

    pub fn permission_logical_id(&self) -> &str {
        &self.permission_id
    }

    /// Base URL of the default stage, resolved by the orchestrator at deploy time.
    pub fn url(&self) -> Value {
        join(vec![
            json!("https://"),
            reference(&self.api_id),
            json!(".execute-api."),
            reference("AWS::Region"),
            json!("."),
            reference("AWS::URLSuffix"),
            json!("/"),
        ])
    }
}

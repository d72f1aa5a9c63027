use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::artifact::{Artifact, HANDLER};
use crate::error::SynthError;
use crate::permissions::PermissionStatement;
use crate::settings::{DeploymentSettings, Runtime};
use crate::template::{get_att, logical_id, reference, sub, Resource};
use crate::unit::DeploymentUnit;

pub const ASSET_BUCKET: &str = "cdk-hnb659fds-assets-${AWS::AccountId}-${AWS::Region}";
pub const BASIC_EXECUTION_POLICY: &str =
    "arn:${AWS::Partition}:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";
const POLICY_DOCUMENT_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionProps {
    pub runtime: Runtime,
    pub memory: u32,
    pub timeout: u32,
    /// `None` leaves the function on the shared, unreserved pool.
    pub reserved_concurrency: Option<u32>,
    pub environment: BTreeMap<String, String>,
}

impl FunctionProps {
    pub fn from_settings(settings: &DeploymentSettings) -> Self {
        Self {
            runtime: settings.runtime,
            memory: settings.memory,
            timeout: settings.timeout,
            reserved_concurrency: settings.max_concurrent,
            environment: settings.env.clone(),
        }
    }
}

/// Handle to the function and its execution role inside a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeResource {
    construct_id: String,
    role_id: String,
    function_id: String,
    policy_id: Option<String>,
}

impl ComputeResource {
    pub fn new(
        unit: &mut DeploymentUnit,
        construct_id: &str,
        props: &FunctionProps,
        artifact: &Artifact,
    ) -> Result<Self, SynthError> {
        let role = Resource::new("AWS::IAM::Role")
            .property(
                "AssumeRolePolicyDocument",
                json!({
                    "Version": POLICY_DOCUMENT_VERSION,
                    "Statement": [{
                        "Action": "sts:AssumeRole",
                        "Effect": "Allow",
                        "Principal": { "Service": "lambda.amazonaws.com" },
                    }],
                }),
            )
            .property("ManagedPolicyArns", json!([sub(BASIC_EXECUTION_POLICY)]));
        let role_id = unit.add_resource(&[construct_id, "ServiceRole"], role)?;

        let mut function = Resource::new("AWS::Lambda::Function")
            .property(
                "Code",
                json!({
                    "S3Bucket": sub(ASSET_BUCKET),
                    "S3Key": artifact.object_key(),
                }),
            )
            .property("Handler", json!(HANDLER))
            .property("Runtime", json!(props.runtime.as_str()))
            .property("MemorySize", json!(props.memory))
            .property("Timeout", json!(props.timeout))
            .property("Role", get_att(&role_id, "Arn"));
        if let Some(limit) = props.reserved_concurrency {
            function = function.property("ReservedConcurrentExecutions", json!(limit));
        }
        if !props.environment.is_empty() {
            function = function.property(
                "Environment",
                json!({ "Variables": props.environment }),
            );
        }
        function.add_dependency(&role_id);
        let function_id = unit.add_resource(&[construct_id, "Function"], function)?;
        unit.add_asset(artifact.clone());

        Ok(Self {
            construct_id: construct_id.to_string(),
            role_id,
            function_id,
            policy_id: None,
        })
    }

    pub fn construct_id(&self) -> &str {
        &self.construct_id
    }

    pub fn function_logical_id(&self) -> &str {
        &self.function_id
    }

    pub fn role_logical_id(&self) -> &str {
        &self.role_id
    }

    pub fn policy_logical_id(&self) -> Option<&str> {
        self.policy_id.as_deref()
    }

    pub fn function_arn(&self) -> Value {
        get_att(&self.function_id, "Arn")
    }

    /// Append a statement to the execution role's inline policy. The policy
    /// resource is created on first use so an unused role carries only its
    /// baseline managed policy.
    pub fn add_to_role_policy(
        &mut self,
        unit: &mut DeploymentUnit,
        statement: &PermissionStatement,
    ) -> Result<(), SynthError> {
        let statement = serde_json::to_value(statement).map_err(|source| {
            SynthError::Serialize {
                what: "policy statement",
                source,
            }
        })?;

        let policy_id = match self.policy_id.clone() {
            Some(id) => id,
            None => self.create_default_policy(unit)?,
        };

        let statements = unit
            .resource_mut(&policy_id)
            .and_then(|policy| policy.properties.get_mut("PolicyDocument"))
            .and_then(|document| document.get_mut("Statement"))
            .and_then(Value::as_array_mut)
            .ok_or_else(|| SynthError::MissingResource(policy_id.clone()))?;
        statements.push(statement);
        Ok(())
    }

    fn create_default_policy(
        &mut self,
        unit: &mut DeploymentUnit,
    ) -> Result<String, SynthError> {
        let policy_path = [self.construct_id.as_str(), "ServiceRole", "DefaultPolicy"];
        let policy_name = logical_id(&policy_path);
        let policy = Resource::new("AWS::IAM::Policy")
            .property(
                "PolicyDocument",
                json!({ "Version": POLICY_DOCUMENT_VERSION, "Statement": [] }),
            )
            .property("PolicyName", json!(policy_name))
            .property("Roles", json!([reference(&self.role_id)]));
        let policy_id = unit.add_resource(&policy_path, policy)?;

        if let Some(function) = unit.resource_mut(&self.function_id) {
            function.add_dependency(&policy_id);
        }
        self.policy_id = Some(policy_id.clone());
        Ok(policy_id)
    }
}

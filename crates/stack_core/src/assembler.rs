//! Builds the function stack: compute, role policy, HTTP API and endpoint output.

use crate::artifact::Artifact;
use crate::compute::{ComputeResource, FunctionProps};
use crate::error::SynthError;
use crate::gateway::HttpApi;
use crate::permissions::PermissionStatement;
use crate::settings::DeploymentSettings;
use crate::unit::DeploymentUnit;

pub const ENDPOINT_OUTPUT: &str = "Endpoint";

/// Handles to everything the assembler created, for callers that want to
/// inspect the unit afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionStack {
    pub compute: ComputeResource,
    pub api: HttpApi,
}

/// Populate `unit` with the function stack. Statements are attached to the
/// execution role in the order given.
pub fn assemble(
    unit: &mut DeploymentUnit,
    settings: &DeploymentSettings,
    statements: &[PermissionStatement],
    artifact: &Artifact,
) -> Result<FunctionStack, SynthError> {
    let id = unit.stack_id().to_string();
    let props = FunctionProps::from_settings(settings);

    let mut compute = ComputeResource::new(unit, &format!("{id}-lambda"), &props, artifact)?;
    for statement in statements {
        compute.add_to_role_policy(unit, statement)?;
    }

    let api = HttpApi::with_default_integration(
        unit,
        &format!("{id}-endpoint"),
        &format!("{id}-integration"),
        &compute,
    )?;
    unit.add_output(ENDPOINT_OUTPUT, api.url(), Some("Base URL of the HTTP API"))?;

    tracing::info!(
        stack = %id,
        statements = statements.len(),
        reserved_concurrency = ?props.reserved_concurrency,
        "assembled function stack"
    );
    Ok(FunctionStack { compute, api })
}

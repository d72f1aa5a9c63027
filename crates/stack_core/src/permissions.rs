use serde::{Deserialize, Serialize};

pub const S3_ARN_PREFIX: &str = "arn:aws:s3:::";
pub const S3_READ_ACTION: &str = "s3:GetObject";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
}

/// One IAM policy statement, rendered in the policy document shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PermissionStatement {
    pub effect: Effect,
    #[serde(rename = "Action")]
    pub actions: Vec<String>,
    #[serde(rename = "Resource")]
    pub resources: Vec<String>,
}

impl PermissionStatement {
    pub fn allow(actions: Vec<String>, resources: Vec<String>) -> Self {
        Self {
            effect: Effect::Allow,
            actions,
            resources,
        }
    }
}

/// Read-only object access for every bucket prefix, in input order.
///
/// Returns `None` for an empty list. Duplicate prefixes are kept as
/// duplicate resource patterns.
pub fn bucket_read_statement(buckets: &[String]) -> Option<PermissionStatement> {
    if buckets.is_empty() {
        return None;
    }

    let resources = buckets
        .iter()
        .map(|bucket| format!("{S3_ARN_PREFIX}{bucket}*"))
        .collect();

    Some(PermissionStatement::allow(
        vec![S3_READ_ACTION.to_string()],
        resources,
    ))
}

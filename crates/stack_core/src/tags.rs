//! Identity tags stamped across the whole deployment unit.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::settings::DeploymentSettings;

pub const PROJECT_TAG: &str = "Project";
pub const STACK_TAG: &str = "Stack";
pub const OWNER_TAG: &str = "Owner";
pub const CLIENT_TAG: &str = "Client";

/// How a resource type expects its `Tags` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFormat {
    /// `[{"Key": .., "Value": ..}]`
    KeyValueList,
    /// `{"key": "value"}`
    StringMap,
    NotTaggable,
}

impl TagFormat {
    pub fn for_resource_type(resource_type: &str) -> Self {
        match resource_type {
            "AWS::IAM::Role" | "AWS::Lambda::Function" => Self::KeyValueList,
            "AWS::ApiGatewayV2::Api" | "AWS::ApiGatewayV2::Stage" => Self::StringMap,
            _ => Self::NotTaggable,
        }
    }

    pub fn render(self, tags: &BTreeMap<String, String>) -> Option<Value> {
        if tags.is_empty() {
            return None;
        }

        match self {
            Self::KeyValueList => Some(Value::Array(
                tags.iter()
                    .map(|(key, value)| json!({ "Key": key, "Value": value }))
                    .collect(),
            )),
            Self::StringMap => Some(json!(tags)),
            Self::NotTaggable => None,
        }
    }
}

/// The tags that survive filtering. A key is present only when its source
/// value is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: BTreeMap<String, String>,
}

impl TagSet {
    pub fn from_settings(settings: &DeploymentSettings) -> Self {
        Self::from_pairs([
            (PROJECT_TAG, Some(settings.name.as_str())),
            (STACK_TAG, Some(settings.stage.as_str())),
            (OWNER_TAG, settings.owner.as_deref()),
            (CLIENT_TAG, settings.client.as_deref()),
        ])
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Option<&'a str>)>) -> Self {
        let tags = pairs
            .into_iter()
            .filter_map(|(key, value)| {
                let value = value?.trim();
                (!value.is_empty()).then(|| (key.to_string(), value.to_string()))
            })
            .collect();
        Self { tags }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

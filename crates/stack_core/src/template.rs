//! CloudFormation template model and intrinsic function helpers.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::tags::TagFormat;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";
const MAX_LOGICAL_ID_LEN: usize = 255;
const HASH_LEN: usize = 8;

/// A resource declaration before rendering. Tags are kept apart from the
/// properties so the tag pass can reach every resource the same way.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub resource_type: &'static str,
    pub properties: Map<String, Value>,
    pub depends_on: Vec<String>,
    pub tags: BTreeMap<String, String>,
}

impl Resource {
    pub fn new(resource_type: &'static str) -> Self {
        Self {
            resource_type,
            properties: Map::new(),
            depends_on: Vec::new(),
            tags: BTreeMap::new(),
        }
    }

    pub fn property(mut self, key: &str, value: Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    pub fn add_dependency(&mut self, logical_id: &str) {
        if !self.depends_on.iter().any(|existing| existing == logical_id) {
            self.depends_on.push(logical_id.to_string());
        }
    }

    pub fn tag_format(&self) -> TagFormat {
        TagFormat::for_resource_type(self.resource_type)
    }

    fn rendered_properties(&self) -> Map<String, Value> {
        let mut properties = self.properties.clone();
        if let Some(tags) = self.tag_format().render(&self.tags) {
            properties.insert("Tags".to_string(), tags);
        }
        properties
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
struct RenderedResource<'a> {
    #[serde(rename = "Type")]
    resource_type: &'a str,
    #[serde(rename = "Properties", skip_serializing_if = "Map::is_empty")]
    properties: Map<String, Value>,
    #[serde(rename = "DependsOn", skip_serializing_if = "has_no_dependencies")]
    depends_on: &'a [String],
}

fn has_no_dependencies(depends_on: &&[String]) -> bool {
    depends_on.is_empty()
}

/// Serialized form handed to the provisioning orchestrator.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template<'a> {
    #[serde(rename = "AWSTemplateFormatVersion")]
    format_version: &'static str,
    description: String,
    resources: BTreeMap<&'a str, RenderedResource<'a>>,
    outputs: &'a BTreeMap<String, Output>,
}

impl<'a> Template<'a> {
    pub fn render(
        description: String,
        resources: &'a BTreeMap<String, Resource>,
        outputs: &'a BTreeMap<String, Output>,
    ) -> Self {
        let resources = resources
            .iter()
            .map(|(logical_id, resource)| {
                (
                    logical_id.as_str(),
                    RenderedResource {
                        resource_type: resource.resource_type,
                        properties: resource.rendered_properties(),
                        depends_on: &resource.depends_on,
                    },
                )
            })
            .collect();

        Self {
            format_version: TEMPLATE_FORMAT_VERSION,
            description,
            resources,
            outputs,
        }
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

pub fn reference(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

pub fn join(parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": ["", parts] })
}

pub fn sub(template: &str) -> Value {
    json!({ "Fn::Sub": template })
}

/// Template key for a construct path: the alphanumeric characters of each
/// path segment followed by an 8 character hash of the full path.
pub fn logical_id(path: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.join("/"));
    let digest = format!("{:X}", hasher.finalize());

    let mut human: String = path
        .iter()
        .flat_map(|segment| segment.chars())
        .filter(char::is_ascii_alphanumeric)
        .collect();
    human.truncate(MAX_LOGICAL_ID_LEN - HASH_LEN);

    format!("{human}{}", &digest[..HASH_LEN])
}

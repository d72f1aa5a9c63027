use std::collections::BTreeMap;

use serde_json::Value;

use crate::artifact::Artifact;
use crate::error::SynthError;
use crate::tags::{TagFormat, TagSet};
use crate::template::{logical_id, Output, Resource, Template};

/// Root scope of one synthesis run. Constructs register their resources
/// here; the tag pass and rendering walk the whole set.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentUnit {
    stack_id: String,
    resources: BTreeMap<String, Resource>,
    outputs: BTreeMap<String, Output>,
    assets: Vec<Artifact>,
}

impl DeploymentUnit {
    pub fn new(stack_id: impl Into<String>) -> Self {
        Self {
            stack_id: stack_id.into(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
            assets: Vec::new(),
        }
    }

    pub fn stack_id(&self) -> &str {
        &self.stack_id
    }

    /// Register a resource under its construct path and return its logical id.
    pub fn add_resource(&mut self, path: &[&str], resource: Resource) -> Result<String, SynthError> {
        let id = logical_id(path);
        if self.resources.contains_key(&id) {
            return Err(SynthError::DuplicateConstruct(path.join("/")));
        }
        tracing::debug!(logical_id = %id, resource_type = resource.resource_type, "added resource");
        self.resources.insert(id.clone(), resource);
        Ok(id)
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    pub fn resource_mut(&mut self, logical_id: &str) -> Option<&mut Resource> {
        self.resources.get_mut(logical_id)
    }

    pub fn resources(&self) -> impl Iterator<Item = (&str, &Resource)> {
        self.resources.iter().map(|(id, r)| (id.as_str(), r))
    }

    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a Resource)> + 'a {
        self.resources()
            .filter(move |(_, resource)| resource.resource_type == resource_type)
    }

    pub fn add_output(
        &mut self,
        name: &str,
        value: Value,
        description: Option<&str>,
    ) -> Result<(), SynthError> {
        if self.outputs.contains_key(name) {
            return Err(SynthError::DuplicateConstruct(name.to_string()));
        }
        self.outputs.insert(
            name.to_string(),
            Output {
                value,
                description: description.map(str::to_string),
            },
        );
        Ok(())
    }

    pub fn output(&self, name: &str) -> Option<&Output> {
        self.outputs.get(name)
    }

    pub fn add_asset(&mut self, artifact: Artifact) {
        if !self.assets.iter().any(|existing| existing.hash == artifact.hash) {
            self.assets.push(artifact);
        }
    }

    pub fn assets(&self) -> &[Artifact] {
        &self.assets
    }

    /// Stamp every taggable resource in the unit. Returns how many resources
    /// received tags.
    pub fn apply_tags(&mut self, tags: &TagSet) -> usize {
        if tags.is_empty() {
            return 0;
        }

        let mut tagged = 0;
        for resource in self.resources.values_mut() {
            if resource.tag_format() == TagFormat::NotTaggable {
                continue;
            }
            for (key, value) in tags.iter() {
                resource.tags.insert(key.to_string(), value.to_string());
            }
            tagged += 1;
        }
        tracing::debug!(tags = tags.len(), resources = tagged, "applied tags");
        tagged
    }

    pub fn template(&self) -> Template<'_> {
        Template::render(
            format!("HTTP function stack {}", self.stack_id),
            &self.resources,
            &self.outputs,
        )
    }
}

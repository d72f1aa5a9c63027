//! Cloud assembly manifests: the index the orchestrator reads to find the
//! stack template and the asset bundles it must upload first.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;
use crate::compute::ASSET_BUCKET;

pub const ASSEMBLY_SCHEMA_VERSION: &str = "36.0.0";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const UNKNOWN_ENVIRONMENT: &str = "aws://unknown-account/unknown-region";
const CURRENT_DESTINATION: &str = "current_account-current_region";

pub fn template_file_name(stack_id: &str) -> String {
    format!("{stack_id}.template.json")
}

pub fn assets_file_name(stack_id: &str) -> String {
    format!("{stack_id}.assets.json")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyManifest {
    pub version: String,
    pub artifacts: BTreeMap<String, ArtifactEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ArtifactEntry {
    #[serde(rename = "aws:cloudformation:stack")]
    Stack {
        environment: String,
        properties: StackProperties,
        dependencies: Vec<String>,
    },
    #[serde(rename = "cdk:asset-manifest")]
    AssetManifest { properties: AssetManifestProperties },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackProperties {
    pub template_file: String,
    pub stack_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetManifestProperties {
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetsManifest {
    pub version: String,
    pub files: BTreeMap<String, FileAsset>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAsset {
    pub source: FileSource,
    pub destinations: BTreeMap<String, FileDestination>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSource {
    pub path: String,
    pub packaging: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDestination {
    pub bucket_name: String,
    pub object_key: String,
}

pub fn assets_manifest(assets: &[Artifact]) -> AssetsManifest {
    let files = assets
        .iter()
        .map(|artifact| {
            let destination = FileDestination {
                bucket_name: ASSET_BUCKET.to_string(),
                object_key: artifact.object_key(),
            };
            (
                artifact.hash.clone(),
                FileAsset {
                    source: FileSource {
                        path: artifact.file_name.clone(),
                        packaging: "file".to_string(),
                    },
                    destinations: BTreeMap::from([(CURRENT_DESTINATION.to_string(), destination)]),
                },
            )
        })
        .collect();

    AssetsManifest {
        version: ASSEMBLY_SCHEMA_VERSION.to_string(),
        files,
    }
}

/// The stack depends on its asset manifest so assets publish first.
pub fn assembly_manifest(stack_id: &str) -> AssemblyManifest {
    let assets_id = format!("{stack_id}.assets");
    let artifacts = BTreeMap::from([
        (
            assets_id.clone(),
            ArtifactEntry::AssetManifest {
                properties: AssetManifestProperties {
                    file: assets_file_name(stack_id),
                },
            },
        ),
        (
            stack_id.to_string(),
            ArtifactEntry::Stack {
                environment: UNKNOWN_ENVIRONMENT.to_string(),
                properties: StackProperties {
                    template_file: template_file_name(stack_id),
                    stack_name: stack_id.to_string(),
                },
                dependencies: vec![assets_id],
            },
        ),
    ]);

    AssemblyManifest {
        version: ASSEMBLY_SCHEMA_VERSION.to_string(),
        artifacts,
    }
}

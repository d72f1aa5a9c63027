use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_MEMORY_MB: u32 = 1024;
pub const DEFAULT_TIMEOUT_SECONDS: u32 = 30;

/// Execution runtimes accepted for the function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Runtime {
    #[serde(rename = "python3.9")]
    #[default]
    Python39,
    #[serde(rename = "python3.10")]
    Python310,
    #[serde(rename = "python3.11")]
    Python311,
    #[serde(rename = "python3.12")]
    Python312,
    #[serde(rename = "python3.13")]
    Python313,
    #[serde(rename = "nodejs18.x")]
    Nodejs18,
    #[serde(rename = "nodejs20.x")]
    Nodejs20,
    #[serde(rename = "nodejs22.x")]
    Nodejs22,
    #[serde(rename = "java17")]
    Java17,
    #[serde(rename = "java21")]
    Java21,
    #[serde(rename = "provided.al2")]
    ProvidedAl2,
    #[serde(rename = "provided.al2023")]
    ProvidedAl2023,
}

impl Runtime {
    pub const ALL: [Runtime; 12] = [
        Self::Python39,
        Self::Python310,
        Self::Python311,
        Self::Python312,
        Self::Python313,
        Self::Nodejs18,
        Self::Nodejs20,
        Self::Nodejs22,
        Self::Java17,
        Self::Java21,
        Self::ProvidedAl2,
        Self::ProvidedAl2023,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Python39 => "python3.9",
            Self::Python310 => "python3.10",
            Self::Python311 => "python3.11",
            Self::Python312 => "python3.12",
            Self::Python313 => "python3.13",
            Self::Nodejs18 => "nodejs18.x",
            Self::Nodejs20 => "nodejs20.x",
            Self::Nodejs22 => "nodejs22.x",
            Self::Java17 => "java17",
            Self::Java21 => "java21",
            Self::ProvidedAl2 => "provided.al2",
            Self::ProvidedAl2023 => "provided.al2023",
        }
    }
}

impl std::fmt::Display for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Runtime {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Self::ALL
            .into_iter()
            .find(|runtime| runtime.as_str() == wanted)
            .ok_or_else(|| {
                let supported: Vec<&str> = Self::ALL.iter().map(|r| r.as_str()).collect();
                ValidationError::new(format!(
                    "unsupported runtime '{wanted}' (supported: {})",
                    supported.join(", ")
                ))
            })
    }
}

/// Resolved configuration for one deployment unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSettings {
    pub name: String,
    pub stage: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default = "default_memory")]
    pub memory: u32,
    #[serde(default = "default_timeout")]
    pub timeout: u32,
    #[serde(default)]
    pub max_concurrent: Option<u32>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub buckets: Vec<String>,
    #[serde(default)]
    pub runtime: Runtime,
    #[serde(default = "default_code_dir")]
    pub code_dir: PathBuf,
}

pub fn default_memory() -> u32 {
    DEFAULT_MEMORY_MB
}

pub fn default_timeout() -> u32 {
    DEFAULT_TIMEOUT_SECONDS
}

pub fn default_code_dir() -> PathBuf {
    PathBuf::from(".")
}

impl DeploymentSettings {
    /// Settings with every optional field at its default.
    pub fn new(name: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stage: stage.into(),
            owner: None,
            client: None,
            memory: DEFAULT_MEMORY_MB,
            timeout: DEFAULT_TIMEOUT_SECONDS,
            max_concurrent: None,
            env: BTreeMap::new(),
            buckets: Vec::new(),
            runtime: Runtime::default(),
            code_dir: default_code_dir(),
        }
    }

    /// Identity of the deployment unit, `{name}-{stage}`.
    pub fn stack_id(&self) -> String {
        format!("{}-{}", self.name.trim(), self.stage.trim())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name cannot be empty"));
        }

        if self.stage.trim().is_empty() {
            return Err(ValidationError::new("stage cannot be empty"));
        }

        if self.memory == 0 {
            return Err(ValidationError::new("memory must be a positive integer"));
        }

        if self.timeout == 0 {
            return Err(ValidationError::new("timeout must be a positive integer"));
        }

        if let Some(0) = self.max_concurrent {
            return Err(ValidationError::new(
                "max_concurrent must be a positive integer",
            ));
        }

        if self.env.keys().any(|key| key.trim().is_empty()) {
            return Err(ValidationError::new(
                "environment variable names must be non-empty strings",
            ));
        }

        // A blank prefix would widen the grant to every bucket in the account.
        if let Some(position) = self.buckets.iter().position(|b| b.trim().is_empty()) {
            return Err(ValidationError::new(format!(
                "bucket entry {position} must be a non-empty prefix"
            )));
        }

        Ok(())
    }
}

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use stack_core::settings::{DeploymentSettings, Runtime, DEFAULT_MEMORY_MB, DEFAULT_TIMEOUT_SECONDS};

/// Environment variables for the deployed function, given as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVars(pub BTreeMap<String, String>);

/// Bucket name prefixes, given as a JSON array or a comma separated list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketList(pub Vec<String>);

#[derive(Debug, Parser)]
#[command(
    name = "stack_synth",
    about = "Synthesize the HTTP function stack into a cloud assembly",
    long_about = "Reads deployment settings from flags or STACK_* environment variables\n\
                  and writes a CloudFormation template, asset manifest and asset bundle\n\
                  to the output directory. An output directory inside the code\n\
                  directory should be listed in its .dockerignore."
)]
pub struct Cli {
    /// Project name, used as the stack name prefix
    #[arg(long, env = "STACK_NAME")]
    pub name: String,

    /// Deployment stage, e.g. dev or prod
    #[arg(long, env = "STACK_STAGE")]
    pub stage: String,

    /// Owner tag value
    #[arg(long, env = "STACK_OWNER")]
    pub owner: Option<String>,

    /// Client tag value
    #[arg(long, env = "STACK_CLIENT")]
    pub client: Option<String>,

    /// Function memory in MB
    #[arg(long, env = "STACK_MEMORY", default_value_t = DEFAULT_MEMORY_MB)]
    pub memory: u32,

    /// Function timeout in seconds
    #[arg(long, env = "STACK_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECONDS)]
    pub timeout: u32,

    /// Reserved concurrency; unset leaves the function unbounded
    #[arg(long, env = "STACK_MAX_CONCURRENT")]
    pub max_concurrent: Option<u32>,

    /// Function environment as a JSON object of strings
    #[arg(long = "env", env = "STACK_ENV", default_value = "{}", value_parser = parse_env_vars)]
    pub env_vars: EnvVars,

    /// Buckets the function may read, as prefixes
    #[arg(long, env = "STACK_BUCKETS", default_value = "[]", value_parser = parse_bucket_list)]
    pub buckets: BucketList,

    /// Function runtime identifier
    #[arg(long, env = "STACK_RUNTIME", default_value_t = Runtime::Python39)]
    pub runtime: Runtime,

    /// Directory holding the Dockerfile and handler source
    #[arg(long, env = "STACK_CODE_DIR", default_value = ".")]
    pub code_dir: PathBuf,

    /// Cloud assembly output directory; must be new, empty or a previous assembly
    #[arg(long, short, env = "STACK_OUTPUT", default_value = "cdk.out")]
    pub output: PathBuf,
}

impl Cli {
    /// Resolve flags into the settings value handed to the assembler.
    pub fn settings(&self) -> DeploymentSettings {
        DeploymentSettings {
            name: self.name.trim().to_string(),
            stage: self.stage.trim().to_string(),
            owner: non_empty(self.owner.as_deref()),
            client: non_empty(self.client.as_deref()),
            memory: self.memory,
            timeout: self.timeout,
            max_concurrent: self.max_concurrent,
            env: self.env_vars.0.clone(),
            buckets: self.buckets.0.clone(),
            runtime: self.runtime,
            code_dir: self.code_dir.clone(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn parse_env_vars(raw: &str) -> Result<EnvVars, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(EnvVars::default());
    }
    serde_json::from_str::<BTreeMap<String, String>>(raw)
        .map(EnvVars)
        .map_err(|error| format!("expected a JSON object of strings: {error}"))
}

fn parse_bucket_list(raw: &str) -> Result<BucketList, String> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        return serde_json::from_str::<Vec<String>>(raw)
            .map(BucketList)
            .map_err(|error| format!("expected a JSON array of strings: {error}"));
    }

    Ok(BucketList(
        raw.split(',')
            .map(str::trim)
            .filter(|bucket| !bucket.is_empty())
            .map(str::to_string)
            .collect(),
    ))
}

//! Synthesis driver: settings in, cloud assembly directory out.
//!
//! The artifact is built in a system temporary directory. The assembly is
//! then written into a staging directory beside the output and only moved
//! into place once every step has succeeded, so a failed run never leaves a
//! partial manifest behind.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::artifact::ArtifactBuilder;
use crate::assembler::{assemble, ENDPOINT_OUTPUT};
use crate::assembly::{
    assembly_manifest, assets_file_name, assets_manifest, template_file_name, MANIFEST_FILE,
};
use crate::error::{SynthError, ValidationError};
use crate::permissions::{bucket_read_statement, PermissionStatement};
use crate::settings::DeploymentSettings;
use crate::tags::TagSet;
use crate::unit::DeploymentUnit;

#[derive(Debug, Clone, PartialEq)]
pub struct SynthSummary {
    pub stack_id: String,
    pub output_dir: PathBuf,
    pub template_path: PathBuf,
    pub endpoint: Value,
    pub resource_count: usize,
    pub tagged_resources: usize,
}

/// Build the deployment unit in memory, without touching the filesystem
/// beyond what the artifact builder does.
pub fn build_unit(
    settings: &DeploymentSettings,
    builder: &dyn ArtifactBuilder,
    staging_dir: &Path,
) -> Result<DeploymentUnit, SynthError> {
    settings.validate()?;

    let statements: Vec<PermissionStatement> =
        bucket_read_statement(&settings.buckets).into_iter().collect();
    tracing::info!(statements = statements.len(), "derived permission statements");

    let source_dir = std::path::absolute(&settings.code_dir)
        .map_err(|source| SynthError::io("resolve", &settings.code_dir, source))?;
    tracing::info!(source_dir = %source_dir.display(), "building function artifact");
    let artifact = builder
        .build(&source_dir, staging_dir)
        .map_err(SynthError::Build)?;

    let mut unit = DeploymentUnit::new(settings.stack_id());
    assemble(&mut unit, settings, &statements, &artifact)?;

    let tags = TagSet::from_settings(settings);
    let tagged = unit.apply_tags(&tags);
    tracing::info!(tags = tags.len(), resources = tagged, "tagged deployment unit");

    Ok(unit)
}

/// Run the whole pipeline and write the cloud assembly to `out_dir`.
///
/// `out_dir` may be missing, empty, or hold a previous cloud assembly; any
/// other directory is refused. It must not be, or contain, the code
/// directory.
pub fn synthesize(
    settings: &DeploymentSettings,
    builder: &dyn ArtifactBuilder,
    out_dir: &Path,
) -> Result<SynthSummary, SynthError> {
    settings.validate()?;
    let out_dir = resolve(out_dir)?;
    let source_dir = resolve(&settings.code_dir)?;
    check_output_dir(&out_dir, &source_dir)?;
    if out_dir.starts_with(&source_dir) && out_dir.exists() {
        tracing::warn!(
            out_dir = %out_dir.display(),
            "previous assembly is inside the code directory; list it in .dockerignore to keep it out of the build context"
        );
    }
    let parent = out_dir
        .parent()
        .ok_or_else(|| ValidationError::new("output directory cannot be a filesystem root"))?
        .to_path_buf();

    // Built outside the code directory so nothing of ours lands in the
    // build context.
    let build_dir = tempfile::Builder::new()
        .prefix("stack-synth-")
        .tempdir()
        .map_err(|source| SynthError::io("create", std::env::temp_dir(), source))?;
    let unit = build_unit(settings, builder, build_dir.path())?;
    let stack_id = unit.stack_id().to_string();

    let template = unit
        .template()
        .to_value()
        .map_err(|source| SynthError::Serialize {
            what: "template",
            source,
        })?;
    let endpoint = template
        .get("Outputs")
        .and_then(|outputs| outputs.get(ENDPOINT_OUTPUT))
        .and_then(|output| output.get("Value"))
        .cloned()
        .ok_or_else(|| SynthError::MissingResource(ENDPOINT_OUTPUT.to_string()))?;

    fs::create_dir_all(&parent).map_err(|source| SynthError::io("create", &parent, source))?;
    let staging = tempfile::Builder::new()
        .prefix(".synth-")
        .tempdir_in(&parent)
        .map_err(|source| SynthError::io("create staging directory in", &parent, source))?;

    for artifact in unit.assets() {
        let from = build_dir.path().join(&artifact.file_name);
        fs::copy(&from, staging.path().join(&artifact.file_name))
            .map_err(|source| SynthError::io("copy", &from, source))?;
    }

    let template_name = template_file_name(&stack_id);
    write_json(staging.path(), &template_name, "template", &template)?;
    write_json(
        staging.path(),
        &assets_file_name(&stack_id),
        "assets manifest",
        &assets_manifest(unit.assets()),
    )?;
    write_json(
        staging.path(),
        MANIFEST_FILE,
        "assembly manifest",
        &assembly_manifest(&stack_id),
    )?;

    replace_dir(staging.path(), &out_dir)?;
    tracing::info!(stack = %stack_id, out_dir = %out_dir.display(), "synthesized cloud assembly");

    Ok(SynthSummary {
        template_path: out_dir.join(&template_name),
        output_dir: out_dir,
        stack_id,
        endpoint,
        resource_count: unit.resources().count(),
        tagged_resources: unit
            .resources()
            .filter(|(_, resource)| !resource.tags.is_empty())
            .count(),
    })
}

fn resolve(path: &Path) -> Result<PathBuf, SynthError> {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .map_err(|source| SynthError::io("resolve", path, source))
}

/// Refuse output locations whose replacement would destroy anything but a
/// previous assembly.
fn check_output_dir(out_dir: &Path, source_dir: &Path) -> Result<(), SynthError> {
    if source_dir.starts_with(out_dir) {
        return Err(ValidationError::new(format!(
            "output directory '{}' must not be or contain the code directory '{}'",
            out_dir.display(),
            source_dir.display()
        ))
        .into());
    }

    if !out_dir.exists() {
        return Ok(());
    }
    if !out_dir.is_dir() {
        return Err(ValidationError::new(format!(
            "output path '{}' exists and is not a directory",
            out_dir.display()
        ))
        .into());
    }

    let mut entries =
        fs::read_dir(out_dir).map_err(|source| SynthError::io("read", out_dir, source))?;
    if entries.next().is_none() || out_dir.join(MANIFEST_FILE).is_file() {
        return Ok(());
    }
    Err(ValidationError::new(format!(
        "output directory '{}' is not empty and does not hold a previous cloud assembly",
        out_dir.display()
    ))
    .into())
}

fn write_json(
    dir: &Path,
    file_name: &str,
    what: &'static str,
    value: &impl Serialize,
) -> Result<(), SynthError> {
    let mut body = serde_json::to_vec_pretty(value)
        .map_err(|source| SynthError::Serialize { what, source })?;
    body.push(b'\n');
    let path = dir.join(file_name);
    fs::write(&path, body).map_err(|source| SynthError::io("write", &path, source))
}

/// Swap the staged assembly in. `out_dir` has already passed
/// `check_output_dir`.
fn replace_dir(staging: &Path, out_dir: &Path) -> Result<(), SynthError> {
    if out_dir.exists() {
        fs::remove_dir_all(out_dir).map_err(|source| SynthError::io("remove", out_dir, source))?;
    }
    fs::rename(staging, out_dir).map_err(|source| SynthError::io("move assembly to", out_dir, source))
}

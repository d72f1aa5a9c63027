//! Builds the function bundle by running the source directory's Dockerfile
//! and copying `/asset` out of the resulting image.

use std::path::Path;
use std::process::{Command, Output};

use sha2::{Digest, Sha256};
use stack_core::artifact::{bundle_directory, Artifact, ArtifactBuilder, BUILD_DESCRIPTOR};

pub const ASSET_PATH_IN_IMAGE: &str = "/asset";

#[derive(Debug, Clone)]
pub struct DockerArtifactBuilder {
    program: String,
}

impl Default for DockerArtifactBuilder {
    fn default() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }
}

impl DockerArtifactBuilder {
    /// Use another docker-compatible CLI, e.g. `podman`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<Output, String> {
        tracing::debug!("+ {} {}", self.program, args.join(" "));
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|error| format!("failed to execute {}: {error}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "`{} {}` exited with {}: {}",
                self.program,
                args.first().copied().unwrap_or_default(),
                output.status,
                stderr.trim()
            ));
        }
        Ok(output)
    }
}

pub fn image_tag(source_dir: &Path) -> String {
    let digest = format!(
        "{:x}",
        Sha256::digest(source_dir.to_string_lossy().as_bytes())
    );
    format!("stack-synth-asset:{}", &digest[..12])
}

impl ArtifactBuilder for DockerArtifactBuilder {
    fn build(&self, source_dir: &Path, staging_dir: &Path) -> Result<Artifact, String> {
        let descriptor = source_dir.join(BUILD_DESCRIPTOR);
        if !descriptor.is_file() {
            return Err(format!(
                "build descriptor '{}' not found",
                descriptor.display()
            ));
        }

        let tag = image_tag(source_dir);
        let source = source_dir.to_string_lossy();
        let descriptor = descriptor.to_string_lossy();
        tracing::info!(image = %tag, "building image");
        self.run(&["build", "--tag", &tag, "--file", &descriptor, &source])?;

        let created = self.run(&["create", &tag])?;
        let container = String::from_utf8_lossy(&created.stdout).trim().to_string();
        if container.is_empty() {
            return Err(format!("{} create returned no container id", self.program));
        }

        let extracted = tempfile::tempdir_in(staging_dir)
            .map_err(|error| format!("failed to create extraction directory: {error}"))?;
        let target = extracted.path().join("asset");
        let copy_source = format!("{container}:{ASSET_PATH_IN_IMAGE}");
        let copied = self.run(&["cp", &copy_source, &target.to_string_lossy()]);
        let removed = self.run(&["rm", "--volumes", &container]);
        copied?;
        if let Err(error) = removed {
            tracing::warn!(container = %container, "failed to remove build container: {error}");
        }

        bundle_directory(&target, source_dir, staging_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_tag_is_stable_per_directory() {
        let a = image_tag(Path::new("/work/api"));
        let b = image_tag(Path::new("/work/api"));
        let c = image_tag(Path::new("/work/other"));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("stack-synth-asset:"));
    }

    #[test]
    fn missing_descriptor_fails_before_running_docker() {
        let source = tempfile::tempdir().expect("source");
        let staging = tempfile::tempdir().expect("staging");
        let builder = DockerArtifactBuilder::with_program("definitely-not-a-real-docker");

        let error = builder
            .build(source.path(), staging.path())
            .expect_err("missing Dockerfile should fail");
        assert!(error.starts_with("build descriptor"));
        assert!(error.ends_with("Dockerfile' not found"));
    }

    #[test]
    fn unavailable_program_is_reported() {
        let source = tempfile::tempdir().expect("source");
        let staging = tempfile::tempdir().expect("staging");
        std::fs::write(source.path().join(BUILD_DESCRIPTOR), "FROM scratch\n").expect("write");
        let builder = DockerArtifactBuilder::with_program("definitely-not-a-real-docker");

        let error = builder
            .build(source.path(), staging.path())
            .expect_err("missing program should fail");
        assert!(error.starts_with("failed to execute definitely-not-a-real-docker"));
    }
}

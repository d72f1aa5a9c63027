//! Deployable code artifacts and the seam to whatever builds them.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// File expected at the root of the source directory.
pub const BUILD_DESCRIPTOR: &str = "Dockerfile";
/// Fixed entry point of the packaged function.
pub const HANDLER: &str = "handler.handler";

/// A content-addressed bundle written into the staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub hash: String,
    /// File name relative to the staging directory.
    pub file_name: String,
    pub source_dir: PathBuf,
}

impl Artifact {
    pub fn object_key(&self) -> String {
        format!("{}.zip", self.hash)
    }
}

pub trait ArtifactBuilder {
    /// Build `source_dir` (already absolute) into a bundle under `staging_dir`.
    fn build(&self, source_dir: &Path, staging_dir: &Path) -> Result<Artifact, String>;
}

pub fn asset_file_name(hash: &str) -> String {
    format!("asset.{hash}.zip")
}

/// Zip every regular file below `content_dir` into `staging_dir` and name the
/// bundle after the SHA-256 of its bytes. Entries are sorted and carry no
/// timestamps, so identical content yields an identical hash.
pub fn bundle_directory(
    content_dir: &Path,
    source_dir: &Path,
    staging_dir: &Path,
) -> Result<Artifact, String> {
    let mut files = Vec::new();
    collect_files(content_dir, content_dir, &mut files)?;
    if files.is_empty() {
        return Err(format!(
            "no files to package under '{}'",
            content_dir.display()
        ));
    }
    files.sort();

    let pending_path = staging_dir.join("asset.pending.zip");
    write_zip(content_dir, &files, &pending_path)?;

    let bytes = fs::read(&pending_path)
        .map_err(|error| format!("failed to read '{}': {error}", pending_path.display()))?;
    let hash = format!("{:x}", Sha256::digest(&bytes));
    let file_name = asset_file_name(&hash);
    fs::rename(&pending_path, staging_dir.join(&file_name))
        .map_err(|error| format!("failed to finalize asset bundle: {error}"))?;

    tracing::debug!(hash = %hash, files = files.len(), "packaged asset bundle");
    Ok(Artifact {
        hash,
        file_name,
        source_dir: source_dir.to_path_buf(),
    })
}

fn collect_files(root: &Path, dir: &Path, files: &mut Vec<String>) -> Result<(), String> {
    let entries = fs::read_dir(dir)
        .map_err(|error| format!("failed to read directory '{}': {error}", dir.display()))?;

    for entry in entries {
        let entry = entry.map_err(|error| format!("failed to read directory entry: {error}"))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|error| format!("failed to stat '{}': {error}", path.display()))?;

        if file_type.is_dir() {
            collect_files(root, &path, files)?;
        } else if file_type.is_file() {
            let relative = path
                .strip_prefix(root)
                .map_err(|error| format!("unexpected path '{}': {error}", path.display()))?;
            let name = relative
                .components()
                .map(|part| part.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push(name);
        }
    }

    Ok(())
}

fn write_zip(content_dir: &Path, files: &[String], zip_path: &Path) -> Result<(), String> {
    let file = fs::File::create(zip_path)
        .map_err(|error| format!("failed to create '{}': {error}", zip_path.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut buffer = Vec::new();
    for name in files {
        buffer.clear();
        let source = content_dir.join(name);
        fs::File::open(&source)
            .and_then(|mut handle| handle.read_to_end(&mut buffer))
            .map_err(|error| format!("failed to read '{}': {error}", source.display()))?;

        zip.start_file(name.as_str(), options)
            .map_err(|error| format!("failed to start zip entry '{name}': {error}"))?;
        zip.write_all(&buffer)
            .map_err(|error| format!("failed to write zip entry '{name}': {error}"))?;
    }

    zip.finish()
        .map_err(|error| format!("failed to finish asset bundle: {error}"))?;
    Ok(())
}

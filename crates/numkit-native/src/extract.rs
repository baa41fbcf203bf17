//! Provisioning of bundled kernels onto disk.
//!
//! Extraction is additive and idempotent: files already present are never
//! rewritten, and new files land via a temp file in the destination
//! directory followed by a rename, so concurrent readers and parallel
//! provisioning passes never observe partial contents.

use std::io;
use std::path::Path;

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::bundle::{ArtifactBundle, BundleError};

/// Extraction failure for a single manifest entry.
///
/// The first failing entry aborts the pass; files written before it remain
/// in place.
#[derive(Debug, Error)]
#[error("failed to extract {file}: {source}")]
pub struct ExtractError {
    /// Manifest entry being extracted when the failure hit.
    pub file: String,
    #[source]
    pub source: ExtractFault,
}

/// Underlying cause of an [`ExtractError`].
#[derive(Debug, Error)]
pub enum ExtractFault {
    /// The bundle could not provide the artifact.
    #[error(transparent)]
    Bundle(#[from] BundleError),

    /// Writing the destination file failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The entry names something outside the destination directory.
    #[error("artifact name escapes the installation directory: {0}")]
    UnsafeName(String),
}

/// Counters from one extraction pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractReport {
    /// Entries newly written to the destination.
    pub extracted: usize,
    /// Entries already present and left untouched.
    pub skipped: usize,
}

/// Materialize every manifest entry under `dest`.
///
/// Existing files are skipped without inspecting their contents.
pub fn extract(
    bundle: &dyn ArtifactBundle,
    manifest: &[String],
    dest: &Path,
) -> Result<ExtractReport, ExtractError> {
    let mut report = ExtractReport::default();
    for file in manifest {
        if file.contains('/') || file.contains('\\') || file.contains("..") {
            return Err(ExtractError {
                file: file.clone(),
                source: ExtractFault::UnsafeName(file.clone()),
            });
        }

        let target = dest.join(file);
        if target.exists() {
            tracing::debug!("kernel artifact {} already installed, skipping", file);
            report.skipped += 1;
            continue;
        }

        extract_one(bundle, file, dest, &target).map_err(|source| ExtractError {
            file: file.clone(),
            source,
        })?;
        tracing::debug!("kernel artifact {} extracted", file);
        report.extracted += 1;
    }
    Ok(report)
}

fn extract_one(
    bundle: &dyn ArtifactBundle,
    file: &str,
    dest: &Path,
    target: &Path,
) -> Result<(), ExtractFault> {
    let mut reader = bundle.open_artifact(file)?;
    let mut tmp = NamedTempFile::new_in(dest)?;
    io::copy(&mut reader, tmp.as_file_mut())?;
    tmp.as_file().sync_all()?;
    match tmp.persist(target) {
        Ok(_) => Ok(()),
        // Lost the rename race to a concurrent provisioner; the artifact
        // being in place is all that matters.
        Err(_) if target.exists() => Ok(()),
        Err(err) => Err(ExtractFault::Io(err.error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::MemoryBundle;

    fn bundle_with(name: &str, bytes: &[u8]) -> MemoryBundle {
        MemoryBundle::new().with_artifact(name, bytes.to_vec())
    }

    #[test]
    fn test_extracts_listed_files() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = bundle_with("libk.so", b"kernel bytes");
        let manifest = vec!["libk.so".to_string()];

        let report = extract(&bundle, &manifest, dir.path()).unwrap();
        assert_eq!(report.extracted, 1);
        assert_eq!(report.skipped, 0);
        let written = std::fs::read(dir.path().join("libk.so")).unwrap();
        assert_eq!(written, b"kernel bytes");
    }

    #[test]
    fn test_existing_files_are_never_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("libk.so"), b"already here").unwrap();
        let bundle = bundle_with("libk.so", b"different bytes");
        let manifest = vec!["libk.so".to_string()];

        let report = extract(&bundle, &manifest, dir.path()).unwrap();
        assert_eq!(report.extracted, 0);
        assert_eq!(report.skipped, 1);
        let kept = std::fs::read(dir.path().join("libk.so")).unwrap();
        assert_eq!(kept, b"already here");
    }

    #[test]
    fn test_missing_artifact_aborts_with_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = bundle_with("libk.so", b"bytes");
        let manifest = vec!["libk.so".to_string(), "gone.so".to_string()];

        let err = extract(&bundle, &manifest, dir.path()).unwrap_err();
        assert_eq!(err.file, "gone.so");
        assert!(matches!(err.source, ExtractFault::Bundle(_)));
        // The entry before the failure was still written.
        assert!(dir.path().join("libk.so").exists());
    }

    #[test]
    fn test_unsafe_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = MemoryBundle::new();
        for name in ["../up.so", "a/b.so", "a\\b.so"] {
            let manifest = vec![name.to_string()];
            let err = extract(&bundle, &manifest, dir.path()).unwrap_err();
            assert!(matches!(err.source, ExtractFault::UnsafeName(_)));
        }
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = bundle_with("libk.so", b"bytes");
        let manifest = vec!["libk.so".to_string()];
        extract(&bundle, &manifest, dir.path()).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, ["libk.so"]);
    }
}

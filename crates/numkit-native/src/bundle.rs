//! Access to bundled kernel artifacts.
//!
//! A bundle pairs an `index.txt` manifest with the binary artifacts it
//! lists, stored under the platform prefix `native/<os>/<arch>/`.
//! [`DirBundle`] reads a distribution directory on disk; [`MemoryBundle`]
//! serves embedded bytes and backs most tests.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;

use thiserror::Error;

use crate::platform::Platform;

/// Name of the manifest resource inside a bundle.
pub const MANIFEST_NAME: &str = "index.txt";

/// Failure to produce an artifact's bytes.
#[derive(Debug, Error)]
pub enum BundleError {
    /// The bundle has no artifact under the given name.
    #[error("artifact not found in bundle: {0}")]
    Missing(String),

    /// The artifact exists but could not be opened.
    #[error("failed to open bundled artifact {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Source of the kernel manifest and the binaries it lists.
///
/// `open_manifest` distinguishes "the bundle carries no manifest"
/// (`Ok(None)`) from an I/O fault, so callers can treat absence as an empty
/// manifest.
pub trait ArtifactBundle: Send + Sync {
    /// Open the manifest resource, or `None` when the bundle has none.
    fn open_manifest(&self) -> io::Result<Option<Box<dyn Read + '_>>>;

    /// Open the named artifact for reading.
    fn open_artifact(&self, name: &str) -> Result<Box<dyn Read + '_>, BundleError>;
}

/// Bundle rooted at a distribution directory on disk.
///
/// Expected layout: `<root>/index.txt` plus
/// `<root>/native/<os>/<arch>/<artifact>`.
pub struct DirBundle {
    root: PathBuf,
    platform: Platform,
}

impl DirBundle {
    /// Bundle at `root` serving artifacts for `platform`.
    pub fn new(root: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            root: root.into(),
            platform,
        }
    }

    fn artifact_path(&self, name: &str) -> PathBuf {
        self.root
            .join("native")
            .join(&self.platform.os)
            .join(&self.platform.arch)
            .join(name)
    }
}

impl ArtifactBundle for DirBundle {
    fn open_manifest(&self) -> io::Result<Option<Box<dyn Read + '_>>> {
        match File::open(self.root.join(MANIFEST_NAME)) {
            Ok(file) => Ok(Some(Box::new(file))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn open_artifact(&self, name: &str) -> Result<Box<dyn Read + '_>, BundleError> {
        let path = self.artifact_path(name);
        match File::open(&path) {
            Ok(file) => Ok(Box::new(file)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(BundleError::Missing(name.to_string()))
            }
            Err(err) => Err(BundleError::Io {
                name: name.to_string(),
                source: err,
            }),
        }
    }
}

/// In-memory bundle for embedded artifacts and tests.
#[derive(Debug, Default)]
pub struct MemoryBundle {
    manifest: Option<Vec<u8>>,
    artifacts: HashMap<String, Vec<u8>>,
}

impl MemoryBundle {
    /// Empty bundle without a manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the manifest contents.
    pub fn with_manifest(mut self, text: impl Into<Vec<u8>>) -> Self {
        self.manifest = Some(text.into());
        self
    }

    /// Add an artifact under `name`.
    pub fn with_artifact(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.artifacts.insert(name.into(), bytes.into());
        self
    }
}

impl ArtifactBundle for MemoryBundle {
    fn open_manifest(&self) -> io::Result<Option<Box<dyn Read + '_>>> {
        match &self.manifest {
            Some(bytes) => Ok(Some(Box::new(io::Cursor::new(bytes.clone())))),
            None => Ok(None),
        }
    }

    fn open_artifact(&self, name: &str) -> Result<Box<dyn Read + '_>, BundleError> {
        match self.artifacts.get(name) {
            Some(bytes) => Ok(Box::new(io::Cursor::new(bytes.clone()))),
            None => Err(BundleError::Missing(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(mut reader: Box<dyn Read + '_>) -> Vec<u8> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_dir_bundle_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = DirBundle::new(dir.path(), Platform::new("linux", "x64"));
        assert!(bundle.open_manifest().unwrap().is_none());
    }

    #[test]
    fn test_dir_bundle_resolves_platform_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let lib_dir = dir.path().join("native").join("linux").join("x64");
        std::fs::create_dir_all(&lib_dir).unwrap();
        std::fs::write(lib_dir.join("libk.so"), b"bytes").unwrap();
        std::fs::write(dir.path().join(MANIFEST_NAME), b"libk.so\n").unwrap();

        let bundle = DirBundle::new(dir.path(), Platform::new("linux", "x64"));
        let manifest = read_all(bundle.open_manifest().unwrap().unwrap());
        assert_eq!(manifest, b"libk.so\n");
        assert_eq!(read_all(bundle.open_artifact("libk.so").unwrap()), b"bytes");
    }

    #[test]
    fn test_dir_bundle_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = DirBundle::new(dir.path(), Platform::new("linux", "x64"));
        match bundle.open_artifact("nope.so") {
            Err(BundleError::Missing(name)) => assert_eq!(name, "nope.so"),
            other => panic!("expected Missing, got {:?}", other.map(|_| ())),
        };
    }

    #[test]
    fn test_memory_bundle_round_trip() {
        let bundle = MemoryBundle::new()
            .with_manifest("a.so\n")
            .with_artifact("a.so", vec![1, 2, 3]);
        assert_eq!(read_all(bundle.open_manifest().unwrap().unwrap()), b"a.so\n");
        assert_eq!(read_all(bundle.open_artifact("a.so").unwrap()), [1, 2, 3]);
        assert!(matches!(
            bundle.open_artifact("b.so"),
            Err(BundleError::Missing(_))
        ));
    }
}

//! Kernel manifest parsing.
//!
//! The manifest (`index.txt`) lists one artifact file name per line, in the
//! order the loader links them. A bundle without a manifest, or with an
//! empty one, simply has nothing to load; only an I/O fault while reading an
//! existing manifest is an error.

use std::io::{self, BufRead, BufReader};

use thiserror::Error;

use crate::bundle::ArtifactBundle;

/// Failure while reading an existing manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest resource is there but reading it failed part-way.
    #[error("failed to read kernel manifest: {source}")]
    Unreadable {
        #[source]
        source: io::Error,
    },
}

/// Read the ordered artifact list from `bundle`.
///
/// An absent manifest yields an empty list. Lines are trimmed and blank
/// lines skipped; order is preserved otherwise.
pub fn read_manifest(bundle: &dyn ArtifactBundle) -> Result<Vec<String>, ManifestError> {
    let reader = match bundle.open_manifest() {
        Ok(Some(reader)) => reader,
        Ok(None) => {
            tracing::debug!("bundle carries no kernel manifest");
            return Ok(Vec::new());
        }
        Err(source) => return Err(ManifestError::Unreadable { source }),
    };

    let mut entries = Vec::new();
    for line in BufReader::new(reader).lines() {
        let line = line.map_err(|source| ManifestError::Unreadable { source })?;
        let name = line.trim();
        if name.is_empty() {
            continue;
        }
        entries.push(name.to_string());
    }
    Ok(entries)
}

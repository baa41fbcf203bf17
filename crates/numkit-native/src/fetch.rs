//! Remote augmentation of the installed kernel set.
//!
//! The runtime does not know how extended kernels are obtained; it hands a
//! [`RemoteFetcher`] the installation directory and expects the files to be
//! there afterwards. Transport, discovery and verification live with the
//! implementor.

use std::error::Error as StdError;
use std::path::Path;

use thiserror::Error;

/// Failure reported by a remote fetcher.
#[derive(Debug, Error)]
#[error("sparse kernel fetch failed: {source}")]
pub struct FetchError {
    #[source]
    source: Box<dyn StdError + Send + Sync>,
}

impl FetchError {
    /// Wrap any transport error.
    pub fn new(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

/// Obtains extended kernel artifacts and places them in the installation
/// directory.
pub trait RemoteFetcher: Send + Sync {
    /// Make the extended artifacts available under `install_dir`.
    fn fetch(&self, install_dir: &Path) -> Result<(), FetchError>;
}

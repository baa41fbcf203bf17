//! Dynamic loading seam.
//!
//! [`LibraryLoader`] turns installed files into retained [`NativeLibrary`]
//! handles; [`DlopenLoader`] is the production implementation over
//! `libloading`. Handles committed by a successful load stay alive for the
//! life of the owning runtime and are never unloaded.

use std::path::{Path, PathBuf};

use libloading::Library;
use thiserror::Error;

/// Raw function address resolved from a loaded library.
pub type RawSymbol = *const ();

/// Failure to load a shared library file.
#[derive(Debug, Error)]
#[error("failed to load native library {path}: {source}")]
pub struct LinkError {
    /// File that failed to load.
    pub path: PathBuf,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl LinkError {
    /// Link failure for `path` caused by `source`.
    pub fn new(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Retained handle to a loaded native library.
pub trait NativeLibrary: Send + Sync {
    /// Resolve `name` to a raw function address.
    ///
    /// # Safety
    /// The caller must convert the address to the exact exported signature
    /// before calling it.
    unsafe fn symbol(&self, name: &str) -> Option<RawSymbol>;

    /// Path the library was loaded from.
    fn path(&self) -> &Path;
}

impl std::fmt::Debug for dyn NativeLibrary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeLibrary")
            .field("path", &self.path())
            .finish()
    }
}

/// Loads shared-library files into the process.
pub trait LibraryLoader: Send + Sync {
    /// Load the file at `path`, retaining the handle.
    fn load(&self, path: &Path) -> Result<Box<dyn NativeLibrary>, LinkError>;
}

/// Production loader backed by the platform dynamic linker.
#[derive(Debug, Default, Clone, Copy)]
pub struct DlopenLoader;

struct DlopenLibrary {
    library: Library,
    path: PathBuf,
}

impl NativeLibrary for DlopenLibrary {
    unsafe fn symbol(&self, name: &str) -> Option<RawSymbol> {
        let symbol: libloading::Symbol<'_, unsafe extern "C" fn()> =
            match self.library.get(name.as_bytes()) {
                Ok(symbol) => symbol,
                Err(_) => return None,
            };
        Some(*symbol as RawSymbol)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl LibraryLoader for DlopenLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn NativeLibrary>, LinkError> {
        let library = unsafe { Library::new(path).map_err(|err| LinkError::new(path, err))? };
        tracing::debug!("linked native library {}", path.display());
        Ok(Box::new(DlopenLibrary {
            library,
            path: path.to_path_buf(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reports_the_path() {
        let err = DlopenLoader
            .load(Path::new("/no/such/libnumkit_blas.so"))
            .unwrap_err();
        assert!(err.to_string().contains("libnumkit_blas.so"));
    }

    #[test]
    fn test_link_error_wraps_any_source() {
        let err = LinkError::new("/tmp/libx.so", "refused by stub");
        assert!(err.to_string().contains("refused by stub"));
    }
}

//! Installation directory layout.
//!
//! Kernels install under `<data root>/native/<version>/<os>/<arch>`. The
//! version segment isolates incompatible kernel generations; the platform
//! segments keep one data root shareable across machines.

use std::path::{Path, PathBuf};

use crate::config::INTERFACE_VERSION;
use crate::platform::Platform;

/// Resolves the per-platform installation directory.
///
/// Pure path arithmetic; nothing here touches the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    data_root: PathBuf,
    platform: Platform,
}

impl InstallLayout {
    /// Layout rooted at `data_root` for the given platform.
    pub fn new(data_root: impl Into<PathBuf>, platform: Platform) -> Self {
        Self {
            data_root: data_root.into(),
            platform,
        }
    }

    /// Directory the current kernel generation installs into.
    pub fn install_dir(&self) -> PathBuf {
        self.data_root
            .join("native")
            .join(INTERFACE_VERSION)
            .join(&self.platform.os)
            .join(&self.platform.arch)
    }

    /// Data root this layout resolves under.
    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Platform this layout resolves for.
    pub fn platform(&self) -> &Platform {
        &self.platform
    }
}

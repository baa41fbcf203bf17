//! Runtime configuration for the kernel subsystem.
//!
//! The only configurable input is the data root under which kernels are
//! installed. Resolution order: the `NUMKIT_DATA_DIR` environment variable,
//! then `~/.numkit`, then the current directory as a last resort.

use std::path::PathBuf;

/// Version segment of the installation directory layout.
///
/// Bundled artifacts and the loader must agree on this value. Bumping it
/// retires previously installed directories without touching their files.
pub const INTERFACE_VERSION: &str = "1.1.0";

/// Environment variables recognized by this crate.
pub mod env_vars {
    /// Overrides the data root under which kernels are installed.
    pub const DATA_DIR: &str = "NUMKIT_DATA_DIR";
}

/// Resolve the default data root.
pub fn default_data_root() -> PathBuf {
    if let Some(dir) = std::env::var_os(env_vars::DATA_DIR) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".numkit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_version_is_a_single_segment() {
        assert!(!INTERFACE_VERSION.is_empty());
        assert!(!INTERFACE_VERSION.contains('/'));
        assert!(!INTERFACE_VERSION.contains('\\'));
    }

    #[test]
    fn test_data_root_env_override() {
        std::env::set_var(env_vars::DATA_DIR, "/tmp/numkit-config-test");
        assert_eq!(default_data_root(), PathBuf::from("/tmp/numkit-config-test"));
        std::env::remove_var(env_vars::DATA_DIR);
    }
}

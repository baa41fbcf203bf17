//! Host platform identification.
//!
//! Installation directories and bundle resource paths are keyed by operating
//! system and CPU architecture. The segment values follow the kernel
//! distribution naming: `macos`, `linux`, `win` and `x64`, `arm64`.

use std::env::consts;

/// Operating system / architecture pair a kernel build targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    /// Directory segment for the operating system.
    pub os: String,
    /// Directory segment for the CPU architecture.
    pub arch: String,
}

impl Platform {
    /// Platform from explicit segment values.
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Detect the platform of the running process.
    pub fn current() -> Self {
        let os = match consts::OS {
            "macos" => "macos",
            "windows" => "win",
            _ => "linux",
        };
        let arch = match consts::ARCH {
            "aarch64" => "arm64",
            _ => "x64",
        };
        Self::new(os, arch)
    }

    /// File name the platform linker expects for a shared library,
    /// e.g. `libnumkit_blas.so` for `numkit_blas` on Linux.
    pub fn shared_library_name(name: &str) -> String {
        if cfg!(target_os = "windows") {
            format!("{}.dll", name)
        } else if cfg!(target_os = "macos") {
            format!("lib{}.dylib", name)
        } else {
            format!("lib{}.so", name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_platform_has_known_segments() {
        let platform = Platform::current();
        assert!(["macos", "linux", "win"].contains(&platform.os.as_str()));
        assert!(["x64", "arm64"].contains(&platform.arch.as_str()));
    }

    #[test]
    fn test_shared_library_name_keeps_the_base_name() {
        let name = Platform::shared_library_name("numkit_blas");
        assert!(name.contains("numkit_blas"));
        #[cfg(target_os = "linux")]
        assert_eq!(name, "libnumkit_blas.so");
    }
}

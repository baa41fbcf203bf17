//! Integration tests against the real smoke kernel cdylib.
//!
//! These tests load the `numkit-smoke-kernel` artifact through the platform
//! linker and are ignored unless it has been built:
//!
//! ```text
//! cargo build -p numkit-smoke-kernel
//! cargo test -p numkit-native -- --ignored
//! ```

use std::path::{Path, PathBuf};

use numkit_native::{
    Capability, DenseFactorization, DirBundle, KernelRuntime, Platform, MANIFEST_NAME,
};

fn smoke_kernel_artifact() -> PathBuf {
    let file = Platform::shared_library_name("numkit_blas");
    let mut target_dirs = Vec::new();
    if let Ok(dir) = std::env::var("CARGO_TARGET_DIR") {
        target_dirs.push(PathBuf::from(dir));
    }
    target_dirs.push(
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .and_then(Path::parent)
            .expect("workspace root")
            .join("target"),
    );

    for target_dir in &target_dirs {
        for profile in ["debug", "release"] {
            let candidate = target_dir.join(profile).join(&file);
            if candidate.exists() {
                return candidate;
            }
        }
    }
    panic!("smoke kernel not built; run `cargo build -p numkit-smoke-kernel` first");
}

/// Stage a distribution directory bundling the built smoke kernel.
fn stage_bundle(root: &Path, platform: &Platform) {
    let file = Platform::shared_library_name("numkit_blas");
    let lib_dir = root.join("native").join(&platform.os).join(&platform.arch);
    std::fs::create_dir_all(&lib_dir).unwrap();
    std::fs::copy(smoke_kernel_artifact(), lib_dir.join(&file)).unwrap();
    std::fs::write(root.join(MANIFEST_NAME), format!("{}\n", file)).unwrap();
}

fn loaded_runtime(bundle_dir: &Path, data_dir: &Path) -> KernelRuntime {
    let platform = Platform::current();
    stage_bundle(bundle_dir, &platform);
    let runtime =
        KernelRuntime::new(DirBundle::new(bundle_dir, platform)).with_data_root(data_dir);
    assert!(runtime.load(), "smoke kernel failed to load");
    runtime
}

#[test]
#[ignore = "requires the smoke kernel to be built"]
fn test_load_and_call_the_real_kernel() {
    let bundle_dir = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    let runtime = loaded_runtime(bundle_dir.path(), data_dir.path());

    assert!(runtime.is_loaded());
    assert!(!runtime.has_sparse_libraries());
    assert_eq!(runtime.status().capability, Capability::Base);

    let kernels = runtime.kernels().unwrap();
    // A = [1 3; 2 4], B = [5 7; 6 8], column-major.
    let a = [1.0, 2.0, 3.0, 4.0];
    let b = [5.0, 6.0, 7.0, 8.0];
    let mut c = [0.0; 4];
    kernels.mmult(2, 2, 2, &a, &b, &mut c);
    assert_eq!(c, [23.0, 34.0, 31.0, 46.0]);

    let mut m = [2.0, 1.0, 1.0, 3.0];
    let mut rhs = [5.0, 10.0];
    assert_eq!(kernels.solve(2, 1, &mut m, &mut rhs), 0);
    assert!((rhs[0] - 1.0).abs() < 1e-9);
    assert!((rhs[1] - 3.0).abs() < 1e-9);
}

#[test]
#[ignore = "requires the smoke kernel to be built"]
fn test_dense_factorization_through_the_real_kernel() {
    let bundle_dir = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    let runtime = loaded_runtime(bundle_dir.path(), data_dir.path());

    let kernels = runtime.kernels().unwrap();
    let factorization = DenseFactorization::new(kernels, 2, &[2.0, 1.0, 1.0, 3.0]).unwrap();

    let mut b = [5.0, 10.0];
    factorization.solve(1, &mut b);
    assert!((b[0] - 1.0).abs() < 1e-9);
    assert!((b[1] - 3.0).abs() < 1e-9);

    // Reusable across solves.
    let mut b = [4.0, 7.0];
    factorization.solve(1, &mut b);
    assert!((b[0] - 1.0).abs() < 1e-9);
    assert!((b[1] - 2.0).abs() < 1e-9);
}

#[test]
#[ignore = "requires the smoke kernel to be built"]
fn test_repeated_loads_against_the_real_linker() {
    let bundle_dir = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();
    let runtime = loaded_runtime(bundle_dir.path(), data_dir.path());

    assert!(runtime.load());
    assert!(runtime.load());
    assert!(runtime.is_loaded());
}

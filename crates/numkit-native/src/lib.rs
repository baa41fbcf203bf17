//! Native math-kernel provisioning and loading.
//!
//! This crate installs and links the platform-specific BLAS/LAPACK/UMFPACK
//! binding libraries that back numkit's accelerated math, and exposes the
//! resolved call surface behind a per-process runtime:
//!
//! - resolve the per-platform installation directory
//!   (`<data root>/native/<version>/<os>/<arch>`)
//! - extract bundled artifacts listed by the kernel manifest, skipping files
//!   already installed
//! - pick the richest installed capability variant (extended beats base)
//! - link the selected files exactly once per process
//! - optionally fetch the sparse (UMFPACK) variant from a remote source and
//!   re-link
//!
//! Every failure collapses to `false` at the [`KernelRuntime::load`] /
//! [`KernelRuntime::fetch_sparse_libraries`] boundary; callers fall back to
//! pure-Rust math when native kernels are unavailable. The causes go to the
//! `tracing` log.
//!
//! ```no_run
//! use numkit_native::{DirBundle, KernelRuntime, Platform};
//!
//! let bundle = DirBundle::new("/opt/numkit/dist", Platform::current());
//! let runtime = KernelRuntime::new(bundle);
//! if runtime.load() {
//!     let kernels = runtime.kernels().expect("loaded");
//!     let a = [1.0, 2.0, 3.0, 4.0];
//!     let x = [1.0, 1.0];
//!     let mut y = [0.0; 2];
//!     kernels.mvmult(2, 2, &a, &x, &mut y);
//! }
//! ```

pub mod bundle;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod kernels;
pub mod layout;
pub mod loader;
pub mod manifest;
pub mod platform;
pub mod runtime;
mod state;
pub mod variant;

#[cfg(test)]
mod testutil;

pub use bundle::{ArtifactBundle, BundleError, DirBundle, MemoryBundle, MANIFEST_NAME};
pub use config::INTERFACE_VERSION;
pub use extract::{ExtractError, ExtractFault, ExtractReport};
pub use fetch::{FetchError, RemoteFetcher};
pub use kernels::{DenseFactorization, KernelBindings, SparseFactorization, SparseKernels};
pub use layout::InstallLayout;
pub use loader::{DlopenLoader, LibraryLoader, LinkError, NativeLibrary, RawSymbol};
pub use manifest::{read_manifest, ManifestError};
pub use platform::Platform;
pub use runtime::{KernelRuntime, LoadStatus};
pub use variant::{Capability, MarkerClassifier, Selection, VariantClassifier, VariantProfile};

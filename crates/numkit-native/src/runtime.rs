//! Kernel runtime: provisioning, linking and augmentation.
//!
//! One [`KernelRuntime`] instance owns the load state for a process. `load()`
//! is idempotent and safe to call from any number of threads; every failure
//! mode collapses to `false` so callers can fall back to pure-Rust math
//! without inspecting causes. The causes themselves go to the log.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::bundle::ArtifactBundle;
use crate::config;
use crate::extract::extract;
use crate::fetch::RemoteFetcher;
use crate::kernels::KernelBindings;
use crate::layout::InstallLayout;
use crate::loader::{DlopenLoader, LibraryLoader, NativeLibrary};
use crate::manifest::read_manifest;
use crate::platform::Platform;
use crate::state::LoadState;
use crate::variant::{Capability, MarkerClassifier, VariantClassifier};

/// Snapshot of a runtime's load state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadStatus {
    /// Whether the kernel set is linked and callable.
    pub loaded: bool,
    /// Whether the linked set includes the sparse surface.
    pub has_sparse: bool,
    /// Variant of the most recent successful link.
    pub capability: Capability,
    /// Directory kernels install into.
    pub install_dir: PathBuf,
    /// When the most recent link committed.
    pub loaded_at: Option<DateTime<Utc>>,
}

/// Provisions and links the native kernel set for this process.
///
/// Hosts construct one long-lived instance and share it; tests construct as
/// many as they like, each with its own state and collaborators.
pub struct KernelRuntime {
    layout: InstallLayout,
    bundle: Box<dyn ArtifactBundle>,
    classifier: Box<dyn VariantClassifier>,
    loader: Box<dyn LibraryLoader>,
    fetcher: Option<Box<dyn RemoteFetcher>>,
    state: LoadState,
    /// Serializes provisioning (directory creation, manifest, extraction).
    provision_lock: Mutex<()>,
    /// Serializes sparse augmentation; acquired before, never inside, the
    /// link section's write guard.
    fetch_lock: Mutex<()>,
}

impl KernelRuntime {
    /// Runtime over `bundle` with production collaborators: detected
    /// platform, default data root, marker classifier, platform linker.
    pub fn new(bundle: impl ArtifactBundle + 'static) -> Self {
        Self {
            layout: InstallLayout::new(config::default_data_root(), Platform::current()),
            bundle: Box::new(bundle),
            classifier: Box::new(MarkerClassifier::default()),
            loader: Box::new(DlopenLoader),
            fetcher: None,
            state: LoadState::new(),
            provision_lock: Mutex::new(()),
            fetch_lock: Mutex::new(()),
        }
    }

    /// Install under a different data root.
    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.layout = InstallLayout::new(root, self.layout.platform().clone());
        self
    }

    /// Target a platform other than the detected one.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.layout = InstallLayout::new(self.layout.data_root().to_path_buf(), platform);
        self
    }

    /// Replace the variant classifier.
    pub fn with_classifier(mut self, classifier: impl VariantClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    /// Replace the dynamic loader.
    pub fn with_loader(mut self, loader: impl LibraryLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    /// Wire a sparse-kernel fetcher. Without one,
    /// [`fetch_sparse_libraries`](Self::fetch_sparse_libraries) reports
    /// `false`.
    pub fn with_fetcher(mut self, fetcher: impl RemoteFetcher + 'static) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    /// Directory this runtime installs kernels into.
    pub fn install_dir(&self) -> PathBuf {
        self.layout.install_dir()
    }

    /// Whether the kernel set is linked and callable.
    pub fn is_loaded(&self) -> bool {
        self.state.is_loaded()
    }

    /// Whether the linked set includes the sparse (UMFPACK) surface.
    ///
    /// Meaningful alongside [`is_loaded`](Self::is_loaded).
    pub fn has_sparse_libraries(&self) -> bool {
        self.state.has_sparse()
    }

    /// Resolved call surface, once [`load`](Self::load) has succeeded.
    pub fn kernels(&self) -> Option<Arc<KernelBindings>> {
        if !self.state.is_loaded() {
            return None;
        }
        self.state.bindings()
    }

    /// Current state snapshot.
    pub fn status(&self) -> LoadStatus {
        let link = self.state.link();
        LoadStatus {
            loaded: self.state.is_loaded(),
            has_sparse: self.state.has_sparse(),
            capability: link.capability,
            install_dir: self.layout.install_dir(),
            loaded_at: link.loaded_at,
        }
    }

    /// Provision and link the kernel set.
    ///
    /// Idempotent; `true` once the surface is callable. Absence of bundled
    /// kernels and every fault alike report `false`; faults are logged.
    pub fn load(&self) -> bool {
        if self.state.is_loaded() {
            return true;
        }

        let dir = self.layout.install_dir();
        let manifest = {
            let _provisioning = self.provision_lock.lock();

            if let Err(err) = std::fs::create_dir_all(&dir) {
                tracing::error!("cannot create kernel directory {}: {}", dir.display(), err);
                return false;
            }

            let manifest = match read_manifest(self.bundle.as_ref()) {
                Ok(manifest) => manifest,
                Err(err) => {
                    tracing::error!("cannot read kernel manifest: {}", err);
                    return false;
                }
            };
            if manifest.is_empty() {
                tracing::info!("no native kernels bundled for this platform");
                return false;
            }

            match extract(self.bundle.as_ref(), &manifest, &dir) {
                Ok(report) => tracing::debug!(
                    "kernel artifacts ready in {} ({} extracted, {} already present)",
                    dir.display(),
                    report.extracted,
                    report.skipped
                ),
                Err(err) => {
                    tracing::error!("kernel extraction aborted: {}", err);
                    return false;
                }
            }
            manifest
        };

        self.link(&dir, &manifest)
    }

    /// Classify the directory and link the selected files, exactly once per
    /// runtime.
    fn link(&self, dir: &Path, manifest: &[String]) -> bool {
        let mut link = self.state.link_mut();

        // A racing caller may have finished the link while this one was
        // provisioning.
        if self.state.is_loaded() {
            return true;
        }

        let selection = self.classifier.classify(dir, manifest);
        if !selection.capability.is_loadable() {
            tracing::warn!("no kernel variant found in {}", dir.display());
            return false;
        }

        let mut libraries: Vec<Arc<dyn NativeLibrary>> = Vec::new();
        for file in &selection.files {
            match self.loader.load(&dir.join(file)) {
                Ok(library) => libraries.push(Arc::from(library)),
                Err(err) => {
                    // Handles acquired for this attempt are released; the
                    // committed state stays as it was.
                    tracing::error!("kernel link failed: {}", err);
                    return false;
                }
            }
        }

        let bindings = match KernelBindings::resolve(&libraries) {
            Some(bindings) => Arc::new(bindings),
            None => {
                tracing::error!(
                    "kernel set in {} does not export the base surface",
                    dir.display()
                );
                return false;
            }
        };

        self.state
            .commit(&mut link, libraries, bindings, selection.capability);
        tracing::info!(
            "native kernels loaded from {} ({:?})",
            dir.display(),
            selection.capability
        );
        true
    }

    /// Ensure the sparse surface is available, fetching it if needed.
    ///
    /// `true` when the process ends up with a loaded extended kernel set.
    /// Fetch failures leave the committed state untouched.
    pub fn fetch_sparse_libraries(&self) -> bool {
        if self.state.is_loaded() && self.state.has_sparse() {
            return true;
        }
        let fetcher = match &self.fetcher {
            Some(fetcher) => fetcher,
            None => {
                tracing::warn!("sparse kernels requested but no fetcher is wired");
                return false;
            }
        };

        let _fetching = self.fetch_lock.lock();
        if self.state.is_loaded() && self.state.has_sparse() {
            return true;
        }

        let dir = self.layout.install_dir();
        if let Err(err) = std::fs::create_dir_all(&dir) {
            tracing::error!("cannot create kernel directory {}: {}", dir.display(), err);
            return false;
        }
        if let Err(err) = fetcher.fetch(&dir) {
            tracing::error!("{}", err);
            return false;
        }

        {
            let mut link = self.state.link_mut();
            // A load racing the fetch may have linked the fetched files
            // already.
            if self.state.is_loaded() && self.state.has_sparse() {
                return true;
            }
            // The only place `loaded` regresses: force the next load to
            // re-link against the augmented directory. Taking the link
            // section orders the reset after a commit that classified the
            // directory before the fetched files landed.
            self.state.reset_for_refetch(&mut link);
        }
        self.load()
    }
}

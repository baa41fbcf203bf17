//! Process-wide load state.
//!
//! `loaded` answers the lock-free fast path; the link section retains the
//! committed library handles and the resolved call surface. `loaded`
//! regresses to false in exactly one place, the reset ahead of a sparse
//! re-load.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::kernels::KernelBindings;
use crate::loader::NativeLibrary;
use crate::variant::Capability;

/// Handles and bindings committed by successful links.
#[derive(Default)]
pub(crate) struct LinkedKernels {
    /// Retained for the life of the state; never unloaded. A sparse re-load
    /// appends, it does not replace.
    pub libraries: Vec<Arc<dyn NativeLibrary>>,
    /// Call surface of the most recent successful link.
    pub bindings: Option<Arc<KernelBindings>>,
    /// Variant of the most recent successful link.
    pub capability: Capability,
    /// When the most recent link committed.
    pub loaded_at: Option<DateTime<Utc>>,
}

/// Mutable load state owned by one runtime instance.
pub(crate) struct LoadState {
    loaded: AtomicBool,
    has_sparse: AtomicBool,
    link: RwLock<LinkedKernels>,
}

impl LoadState {
    pub fn new() -> Self {
        Self {
            loaded: AtomicBool::new(false),
            has_sparse: AtomicBool::new(false),
            link: RwLock::new(LinkedKernels::default()),
        }
    }

    /// Lock-free view of the loaded flag.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    pub fn has_sparse(&self) -> bool {
        self.has_sparse.load(Ordering::Acquire)
    }

    /// Enter the link critical section.
    pub fn link_mut(&self) -> RwLockWriteGuard<'_, LinkedKernels> {
        self.link.write()
    }

    /// Read-side view for status and bindings access.
    pub fn link(&self) -> RwLockReadGuard<'_, LinkedKernels> {
        self.link.read()
    }

    /// Call surface of the most recent successful link.
    pub fn bindings(&self) -> Option<Arc<KernelBindings>> {
        self.link.read().bindings.clone()
    }

    /// Commit a successful link. The caller holds the write guard.
    pub fn commit(
        &self,
        link: &mut LinkedKernels,
        libraries: Vec<Arc<dyn NativeLibrary>>,
        bindings: Arc<KernelBindings>,
        capability: Capability,
    ) {
        link.libraries.extend(libraries);
        link.bindings = Some(bindings);
        link.capability = capability;
        link.loaded_at = Some(Utc::now());
        // `has_sparse` is published before `loaded`; an Acquire read of
        // `loaded` therefore observes the matching sparse flag.
        self.has_sparse
            .store(capability == Capability::Extended, Ordering::Release);
        self.loaded.store(true, Ordering::Release);
    }

    /// The one legitimate regression of `loaded`, taken ahead of a sparse
    /// re-load. Requires the write guard so the reset is ordered after any
    /// in-flight commit. `has_sparse` is recomputed by the next commit.
    pub fn reset_for_refetch(&self, _link: &mut LinkedKernels) {
        self.loaded.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StaticLibrary;

    fn committed(state: &LoadState, capability: Capability) {
        let library: Arc<dyn NativeLibrary> = match capability {
            Capability::Extended => Arc::new(StaticLibrary::with_all()),
            _ => Arc::new(StaticLibrary::with_base()),
        };
        let bindings = Arc::new(KernelBindings::resolve(&[library.clone()]).unwrap());
        let mut link = state.link_mut();
        state.commit(&mut link, vec![library], bindings, capability);
    }

    #[test]
    fn test_fresh_state_is_unloaded() {
        let state = LoadState::new();
        assert!(!state.is_loaded());
        assert!(!state.has_sparse());
        assert!(state.bindings().is_none());
        assert_eq!(state.link().capability, Capability::None);
    }

    #[test]
    fn test_commit_publishes_the_surface() {
        let state = LoadState::new();
        committed(&state, Capability::Base);
        assert!(state.is_loaded());
        assert!(!state.has_sparse());
        assert!(state.bindings().is_some());
        assert!(state.link().loaded_at.is_some());
    }

    #[test]
    fn test_extended_commit_sets_sparse() {
        let state = LoadState::new();
        committed(&state, Capability::Extended);
        assert!(state.is_loaded());
        assert!(state.has_sparse());
    }

    #[test]
    fn test_reset_only_touches_loaded() {
        let state = LoadState::new();
        committed(&state, Capability::Extended);
        state.reset_for_refetch(&mut state.link_mut());
        assert!(!state.is_loaded());
        assert!(state.has_sparse());
        assert!(state.bindings().is_some());
    }

    #[test]
    fn test_recommit_appends_libraries() {
        let state = LoadState::new();
        committed(&state, Capability::Base);
        state.reset_for_refetch(&mut state.link_mut());
        committed(&state, Capability::Extended);
        assert_eq!(state.link().libraries.len(), 2);
        assert!(state.has_sparse());
    }
}

//! Capability variants of the installed kernel set.
//!
//! A kernel distribution ships the base BLAS/LAPACK binding, optionally
//! accompanied by an extended binding that adds the sparse (UMFPACK)
//! surface. Which variant is installed is never persisted; it is recomputed
//! by scanning the installation directory against variant profiles, richest
//! first, so a directory holding both bindings loads the extended one.

use std::collections::HashSet;
use std::path::Path;

/// Functional richness of an installed kernel set.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    /// No usable kernel binding installed.
    #[default]
    None,
    /// Dense BLAS/LAPACK surface only.
    Base,
    /// Dense surface plus the sparse (UMFPACK) surface.
    Extended,
}

impl Capability {
    /// Whether this capability can serve calls at all.
    pub fn is_loadable(self) -> bool {
        self != Capability::None
    }
}

/// Marker metadata identifying one variant's binding artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantProfile {
    /// Capability the variant provides.
    pub capability: Capability,
    /// File-name fragment carried by the variant's binding library.
    pub marker: String,
}

impl VariantProfile {
    /// Profile matching files whose name contains `marker`.
    pub fn new(capability: Capability, marker: impl Into<String>) -> Self {
        Self {
            capability,
            marker: marker.into(),
        }
    }
}

/// Outcome of classifying an installation directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Richest capability found.
    pub capability: Capability,
    /// Files to link, in link order.
    pub files: Vec<String>,
}

impl Selection {
    /// The "nothing usable installed" outcome.
    pub fn none() -> Self {
        Self {
            capability: Capability::None,
            files: Vec::new(),
        }
    }
}

/// Decides which variant an installation directory provides.
pub trait VariantClassifier: Send + Sync {
    /// Scan `dir` and pick the richest installed variant.
    ///
    /// Missing directories and unreadable listings classify as
    /// [`Capability::None`]; classification never fails.
    fn classify(&self, dir: &Path, manifest: &[String]) -> Selection;
}

/// Classifier matching file names against [`VariantProfile`] markers.
#[derive(Debug, Clone)]
pub struct MarkerClassifier {
    /// Profiles ordered richest first.
    profiles: Vec<VariantProfile>,
}

impl MarkerClassifier {
    /// Classifier over the given profiles.
    ///
    /// Profiles are re-ordered richest first so the outcome never depends on
    /// the order they were handed in.
    pub fn new(mut profiles: Vec<VariantProfile>) -> Self {
        profiles.sort_by(|a, b| b.capability.cmp(&a.capability));
        Self { profiles }
    }
}

impl Default for MarkerClassifier {
    /// Production profiles: `numkit_umf` marks the extended binding,
    /// `numkit_blas` the base one.
    fn default() -> Self {
        Self::new(vec![
            VariantProfile::new(Capability::Extended, "numkit_umf"),
            VariantProfile::new(Capability::Base, "numkit_blas"),
        ])
    }
}

impl VariantClassifier for MarkerClassifier {
    fn classify(&self, dir: &Path, manifest: &[String]) -> Selection {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return Selection::none(),
        };

        let mut present = Vec::new();
        for entry in entries.flatten() {
            if !entry.path().is_file() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                present.push(name);
            }
        }

        for profile in &self.profiles {
            let mut matched: Vec<&String> = present
                .iter()
                .filter(|name| name.contains(&profile.marker))
                .collect();
            if matched.is_empty() {
                continue;
            }
            matched.sort();

            // Link order: manifest entries present in the directory first,
            // in manifest order, then matched variant files not already
            // listed, by name.
            let present_set: HashSet<&str> = present.iter().map(String::as_str).collect();
            let mut files: Vec<String> = manifest
                .iter()
                .filter(|name| present_set.contains(name.as_str()))
                .cloned()
                .collect();
            for name in matched {
                if !files.iter().any(|f| f == name) {
                    files.push(name.clone());
                }
            }

            tracing::debug!(
                "kernel directory {} classified as {:?} via marker {}",
                dir.display(),
                profile.capability,
                profile.marker
            );
            return Selection {
                capability: profile.capability,
                files,
            };
        }
        Selection::none()
    }
}

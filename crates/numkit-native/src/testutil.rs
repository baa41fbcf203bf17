//! Shared fakes for unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::kernels::symbols;
use crate::loader::{NativeLibrary, RawSymbol};

pub unsafe extern "C" fn noop() {}

/// Address of a function that must never actually be called through the
/// resolved signatures; resolution-only tests use it for every symbol.
pub fn noop_symbol() -> RawSymbol {
    noop as unsafe extern "C" fn() as RawSymbol
}

/// Library handle serving a fixed symbol table.
pub struct StaticLibrary {
    symbols: HashMap<String, RawSymbol>,
    path: PathBuf,
}

// Symbol addresses point at static test functions.
unsafe impl Send for StaticLibrary {}
unsafe impl Sync for StaticLibrary {}

impl StaticLibrary {
    pub fn new(symbols: HashMap<String, RawSymbol>) -> Self {
        Self {
            symbols,
            path: PathBuf::from("/static/test/library"),
        }
    }

    /// All base symbols resolvable.
    pub fn with_base() -> Self {
        let names = [
            symbols::MMULT,
            symbols::MVMULT,
            symbols::SOLVE,
            symbols::INVERT,
            symbols::DENSE_FACTORIZE,
            symbols::DENSE_SOLVE,
            symbols::DENSE_FREE,
        ];
        Self::new(names.iter().map(|n| (n.to_string(), noop_symbol())).collect())
    }

    /// All base and sparse symbols resolvable.
    pub fn with_all() -> Self {
        let mut library = Self::with_base();
        for name in [
            symbols::UMF_SOLVE,
            symbols::UMF_FACTORIZE,
            symbols::UMF_SOLVE_FACTORIZED,
            symbols::UMF_FREE,
        ] {
            library.symbols.insert(name.to_string(), noop_symbol());
        }
        library
    }
}

impl NativeLibrary for StaticLibrary {
    unsafe fn symbol(&self, name: &str) -> Option<RawSymbol> {
        self.symbols.get(name).copied()
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

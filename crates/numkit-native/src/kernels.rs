//! Native call surface.
//!
//! [`KernelBindings`] resolves the exported kernel functions from the
//! retained library handles and wraps them behind safe slice-based methods.
//! The base (dense BLAS/LAPACK) surface must resolve for a load to succeed;
//! the sparse (UMFPACK) surface resolves best-effort and is exposed only
//! when present. Matrices are column-major throughout.

use std::ffi::c_void;
use std::mem;
use std::sync::Arc;

use crate::loader::{NativeLibrary, RawSymbol};

// ============================================================================
// Symbol names
// ============================================================================

/// Exported symbol names of the kernel call surface.
///
/// Kernel binding libraries export these with C linkage.
pub mod symbols {
    /// Dense matrix-matrix multiplication.
    pub const MMULT: &str = "numkit_mmult";
    /// Dense matrix-vector multiplication.
    pub const MVMULT: &str = "numkit_mvmult";
    /// Dense linear solve, in place.
    pub const SOLVE: &str = "numkit_solve";
    /// Dense inversion, in place.
    pub const INVERT: &str = "numkit_invert";
    /// Create a dense factorization for repeated solves.
    pub const DENSE_FACTORIZE: &str = "numkit_dense_factorize";
    /// Solve against a dense factorization.
    pub const DENSE_SOLVE: &str = "numkit_dense_solve";
    /// Release a dense factorization.
    pub const DENSE_FREE: &str = "numkit_dense_free";
    /// One-shot sparse solve on a compressed-column matrix.
    pub const UMF_SOLVE: &str = "numkit_umf_solve";
    /// Create a sparse factorization for repeated solves.
    pub const UMF_FACTORIZE: &str = "numkit_umf_factorize";
    /// Solve against a sparse factorization.
    pub const UMF_SOLVE_FACTORIZED: &str = "numkit_umf_solve_factorized";
    /// Release a sparse factorization.
    pub const UMF_FREE: &str = "numkit_umf_free";
}

type MmultFn = unsafe extern "C" fn(i32, i32, i32, *const f64, *const f64, *mut f64);
type MvmultFn = unsafe extern "C" fn(i32, i32, *const f64, *const f64, *mut f64);
type SolveFn = unsafe extern "C" fn(i32, i32, *mut f64, *mut f64) -> i32;
type InvertFn = unsafe extern "C" fn(i32, *mut f64) -> i32;
type DenseFactorizeFn = unsafe extern "C" fn(i32, *const f64) -> *mut c_void;
type DenseSolveFn = unsafe extern "C" fn(*mut c_void, i32, *mut f64);
type DenseFreeFn = unsafe extern "C" fn(*mut c_void);
type UmfSolveFn =
    unsafe extern "C" fn(i32, *const i32, *const i32, *const f64, *const f64, *mut f64);
type UmfFactorizeFn = unsafe extern "C" fn(i32, *const i32, *const i32, *const f64) -> *mut c_void;
type UmfSolveFactorizedFn = unsafe extern "C" fn(*mut c_void, *const f64, *mut f64);
type UmfFreeFn = unsafe extern "C" fn(*mut c_void);

/// Resolve `name` across the retained libraries.
///
/// Later libraries shadow earlier ones, so an extended binding loaded after
/// the base one takes precedence.
fn find(libraries: &[Arc<dyn NativeLibrary>], name: &str) -> Option<RawSymbol> {
    libraries
        .iter()
        .rev()
        .find_map(|library| unsafe { library.symbol(name) })
}

// ============================================================================
// Bindings
// ============================================================================

/// Resolved base call surface, plus the sparse surface when present.
pub struct KernelBindings {
    mmult_fn: MmultFn,
    mvmult_fn: MvmultFn,
    solve_fn: SolveFn,
    invert_fn: InvertFn,
    dense_factorize_fn: DenseFactorizeFn,
    dense_solve_fn: DenseSolveFn,
    dense_free_fn: DenseFreeFn,
    sparse: Option<SparseKernels>,

    /// Retained handles backing the resolved pointers.
    _libraries: Vec<Arc<dyn NativeLibrary>>,
}

impl KernelBindings {
    /// Resolve the call surface from the retained libraries.
    ///
    /// Returns `None` when any base symbol is missing. The sparse surface
    /// resolves only when every sparse symbol is present.
    pub(crate) fn resolve(libraries: &[Arc<dyn NativeLibrary>]) -> Option<Self> {
        let mmult = find(libraries, symbols::MMULT)?;
        let mvmult = find(libraries, symbols::MVMULT)?;
        let solve = find(libraries, symbols::SOLVE)?;
        let invert = find(libraries, symbols::INVERT)?;
        let dense_factorize = find(libraries, symbols::DENSE_FACTORIZE)?;
        let dense_solve = find(libraries, symbols::DENSE_SOLVE)?;
        let dense_free = find(libraries, symbols::DENSE_FREE)?;

        Some(Self {
            mmult_fn: unsafe { mem::transmute::<RawSymbol, MmultFn>(mmult) },
            mvmult_fn: unsafe { mem::transmute::<RawSymbol, MvmultFn>(mvmult) },
            solve_fn: unsafe { mem::transmute::<RawSymbol, SolveFn>(solve) },
            invert_fn: unsafe { mem::transmute::<RawSymbol, InvertFn>(invert) },
            dense_factorize_fn: unsafe {
                mem::transmute::<RawSymbol, DenseFactorizeFn>(dense_factorize)
            },
            dense_solve_fn: unsafe { mem::transmute::<RawSymbol, DenseSolveFn>(dense_solve) },
            dense_free_fn: unsafe { mem::transmute::<RawSymbol, DenseFreeFn>(dense_free) },
            sparse: Self::resolve_sparse(libraries),
            _libraries: libraries.to_vec(),
        })
    }

    fn resolve_sparse(libraries: &[Arc<dyn NativeLibrary>]) -> Option<SparseKernels> {
        let solve = find(libraries, symbols::UMF_SOLVE)?;
        let factorize = find(libraries, symbols::UMF_FACTORIZE)?;
        let solve_factorized = find(libraries, symbols::UMF_SOLVE_FACTORIZED)?;
        let free = find(libraries, symbols::UMF_FREE)?;
        Some(SparseKernels {
            solve_fn: unsafe { mem::transmute::<RawSymbol, UmfSolveFn>(solve) },
            factorize_fn: unsafe { mem::transmute::<RawSymbol, UmfFactorizeFn>(factorize) },
            solve_factorized_fn: unsafe {
                mem::transmute::<RawSymbol, UmfSolveFactorizedFn>(solve_factorized)
            },
            free_fn: unsafe { mem::transmute::<RawSymbol, UmfFreeFn>(free) },
        })
    }

    /// Whether the sparse surface resolved.
    pub fn has_sparse(&self) -> bool {
        self.sparse.is_some()
    }

    /// Sparse surface, when the loaded binding exports it.
    pub fn sparse(&self) -> Option<&SparseKernels> {
        self.sparse.as_ref()
    }

    /// C := A * B for column-major matrices.
    ///
    /// `a` is `rows_a` x `k`, `b` is `k` x `cols_b`, `c` is `rows_a` x
    /// `cols_b`.
    pub fn mmult(&self, rows_a: i32, cols_b: i32, k: i32, a: &[f64], b: &[f64], c: &mut [f64]) {
        assert!(rows_a >= 0 && cols_b >= 0 && k >= 0, "negative dimension");
        assert_eq!(a.len(), rows_a as usize * k as usize, "lhs buffer size");
        assert_eq!(b.len(), k as usize * cols_b as usize, "rhs buffer size");
        assert_eq!(c.len(), rows_a as usize * cols_b as usize, "result buffer size");
        unsafe { (self.mmult_fn)(rows_a, cols_b, k, a.as_ptr(), b.as_ptr(), c.as_mut_ptr()) }
    }

    /// y := A * x for a column-major `rows` x `cols` matrix.
    pub fn mvmult(&self, rows: i32, cols: i32, a: &[f64], x: &[f64], y: &mut [f64]) {
        assert!(rows >= 0 && cols >= 0, "negative dimension");
        assert_eq!(a.len(), rows as usize * cols as usize, "matrix buffer size");
        assert_eq!(x.len(), cols as usize, "input vector size");
        assert_eq!(y.len(), rows as usize, "result vector size");
        unsafe { (self.mvmult_fn)(rows, cols, a.as_ptr(), x.as_ptr(), y.as_mut_ptr()) }
    }

    /// Solve A * X = B in place; `b` holds the solution on return.
    ///
    /// `a` is `n` x `n` and is overwritten with its factorization, `b` is
    /// `n` x `columns`. Returns the LAPACK info code, zero on success.
    pub fn solve(&self, n: i32, columns: i32, a: &mut [f64], b: &mut [f64]) -> i32 {
        assert!(n >= 0 && columns >= 0, "negative dimension");
        assert_eq!(a.len(), n as usize * n as usize, "matrix buffer size");
        assert_eq!(b.len(), n as usize * columns as usize, "rhs buffer size");
        unsafe { (self.solve_fn)(n, columns, a.as_mut_ptr(), b.as_mut_ptr()) }
    }

    /// Invert the `n` x `n` matrix `a` in place.
    ///
    /// Returns the LAPACK info code, zero on success.
    pub fn invert(&self, n: i32, a: &mut [f64]) -> i32 {
        assert!(n >= 0, "negative dimension");
        assert_eq!(a.len(), n as usize * n as usize, "matrix buffer size");
        unsafe { (self.invert_fn)(n, a.as_mut_ptr()) }
    }
}

/// Sparse (UMFPACK) call surface.
pub struct SparseKernels {
    solve_fn: UmfSolveFn,
    factorize_fn: UmfFactorizeFn,
    solve_factorized_fn: UmfSolveFactorizedFn,
    free_fn: UmfFreeFn,
}

impl SparseKernels {
    /// One-shot solve of A * x = demand for a compressed-column matrix.
    ///
    /// `column_pointers` has `n + 1` entries; `row_indices` and `values`
    /// carry one entry per non-zero.
    pub fn solve(
        &self,
        n: i32,
        column_pointers: &[i32],
        row_indices: &[i32],
        values: &[f64],
        demand: &[f64],
        result: &mut [f64],
    ) {
        assert!(n >= 0, "negative dimension");
        assert_eq!(column_pointers.len(), n as usize + 1, "column pointer size");
        assert_eq!(row_indices.len(), values.len(), "non-zero entry count");
        assert_eq!(demand.len(), n as usize, "demand vector size");
        assert_eq!(result.len(), n as usize, "result vector size");
        unsafe {
            (self.solve_fn)(
                n,
                column_pointers.as_ptr(),
                row_indices.as_ptr(),
                values.as_ptr(),
                demand.as_ptr(),
                result.as_mut_ptr(),
            )
        }
    }
}

// ============================================================================
// Factorizations
// ============================================================================

/// Dense factorization handle for repeated solves.
///
/// Dropping the handle releases the native factorization.
pub struct DenseFactorization {
    handle: *mut c_void,
    n: i32,
    solve_fn: DenseSolveFn,
    free_fn: DenseFreeFn,
    /// Keeps the backing libraries alive for as long as the handle exists.
    _bindings: Arc<KernelBindings>,
}

// The handle is exclusively owned; the native side attaches no thread
// affinity to it.
unsafe impl Send for DenseFactorization {}

impl DenseFactorization {
    /// Factorize the column-major `n` x `n` matrix.
    ///
    /// Returns `None` when the native side rejects the matrix.
    pub fn new(bindings: Arc<KernelBindings>, n: i32, matrix: &[f64]) -> Option<Self> {
        assert!(n >= 0, "negative dimension");
        assert_eq!(matrix.len(), n as usize * n as usize, "matrix buffer size");
        let handle = unsafe { (bindings.dense_factorize_fn)(n, matrix.as_ptr()) };
        if handle.is_null() {
            return None;
        }
        Some(Self {
            handle,
            n,
            solve_fn: bindings.dense_solve_fn,
            free_fn: bindings.dense_free_fn,
            _bindings: bindings,
        })
    }

    /// Solve A * X = B against the stored factorization; `b` is `n` x
    /// `columns` and holds the solution on return.
    pub fn solve(&self, columns: i32, b: &mut [f64]) {
        assert!(columns >= 0, "negative dimension");
        assert_eq!(b.len(), self.n as usize * columns as usize, "rhs buffer size");
        unsafe { (self.solve_fn)(self.handle, columns, b.as_mut_ptr()) }
    }
}

impl Drop for DenseFactorization {
    fn drop(&mut self) {
        unsafe { (self.free_fn)(self.handle) }
    }
}

/// Sparse factorization handle for repeated solves.
///
/// Dropping the handle releases the native factorization.
pub struct SparseFactorization {
    handle: *mut c_void,
    n: i32,
    solve_fn: UmfSolveFactorizedFn,
    free_fn: UmfFreeFn,
    /// Keeps the backing libraries alive for as long as the handle exists.
    _bindings: Arc<KernelBindings>,
}

// The handle is exclusively owned; the native side attaches no thread
// affinity to it.
unsafe impl Send for SparseFactorization {}

impl SparseFactorization {
    /// Factorize a compressed-column matrix.
    ///
    /// Returns `None` when the sparse surface is not loaded or the native
    /// side rejects the matrix.
    pub fn new(
        bindings: Arc<KernelBindings>,
        n: i32,
        column_pointers: &[i32],
        row_indices: &[i32],
        values: &[f64],
    ) -> Option<Self> {
        assert!(n >= 0, "negative dimension");
        assert_eq!(column_pointers.len(), n as usize + 1, "column pointer size");
        assert_eq!(row_indices.len(), values.len(), "non-zero entry count");
        let sparse = bindings.sparse.as_ref()?;
        let handle = unsafe {
            (sparse.factorize_fn)(
                n,
                column_pointers.as_ptr(),
                row_indices.as_ptr(),
                values.as_ptr(),
            )
        };
        if handle.is_null() {
            return None;
        }
        let solve_fn = sparse.solve_factorized_fn;
        let free_fn = sparse.free_fn;
        Some(Self {
            handle,
            n,
            solve_fn,
            free_fn,
            _bindings: bindings,
        })
    }

    /// Solve A * x = demand against the stored factorization.
    pub fn solve(&self, demand: &[f64], result: &mut [f64]) {
        assert_eq!(demand.len(), self.n as usize, "demand vector size");
        assert_eq!(result.len(), self.n as usize, "result vector size");
        unsafe { (self.solve_fn)(self.handle, demand.as_ptr(), result.as_mut_ptr()) }
    }
}

impl Drop for SparseFactorization {
    fn drop(&mut self) {
        unsafe { (self.free_fn)(self.handle) }
    }
}

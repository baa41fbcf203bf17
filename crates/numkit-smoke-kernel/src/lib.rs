//! Reference kernel exporting the base call surface.
//!
//! Built as a `cdylib` named `numkit_blas`, this crate backs the ignored
//! integration tests that exercise real dynamic loading. The implementations
//! are naive loop code; it exports the dense surface only, so a directory
//! holding just this library classifies as the base variant.

use std::ffi::c_void;

/// Column-major LU factors with partial pivoting.
struct DenseLu {
    n: usize,
    lu: Vec<f64>,
    pivots: Vec<usize>,
}

fn factorize(n: usize, a: &[f64]) -> DenseLu {
    let mut lu = a.to_vec();
    let mut pivots = vec![0usize; n];
    for col in 0..n {
        let mut p = col;
        for row in col + 1..n {
            if lu[row + col * n].abs() > lu[p + col * n].abs() {
                p = row;
            }
        }
        pivots[col] = p;
        if p != col {
            for c in 0..n {
                lu.swap(col + c * n, p + c * n);
            }
        }
        let pivot = lu[col + col * n];
        if pivot == 0.0 {
            continue;
        }
        for row in col + 1..n {
            let factor = lu[row + col * n] / pivot;
            lu[row + col * n] = factor;
            for c in col + 1..n {
                lu[row + c * n] -= factor * lu[col + c * n];
            }
        }
    }
    DenseLu { n, lu, pivots }
}

/// One-based index of the first zero pivot, zero when regular.
fn singular_info(lu: &DenseLu) -> i32 {
    for i in 0..lu.n {
        if lu.lu[i + i * lu.n] == 0.0 {
            return i as i32 + 1;
        }
    }
    0
}

fn solve_column(lu: &DenseLu, b: &mut [f64]) {
    let n = lu.n;
    for col in 0..n {
        let p = lu.pivots[col];
        if p != col {
            b.swap(col, p);
        }
    }
    for row in 1..n {
        for col in 0..row {
            b[row] -= lu.lu[row + col * n] * b[col];
        }
    }
    for row in (0..n).rev() {
        for col in row + 1..n {
            b[row] -= lu.lu[row + col * n] * b[col];
        }
        b[row] /= lu.lu[row + row * n];
    }
}

#[no_mangle]
pub unsafe extern "C" fn numkit_mmult(
    rows_a: i32,
    cols_b: i32,
    k: i32,
    a: *const f64,
    b: *const f64,
    c: *mut f64,
) {
    let (m, n, k) = (rows_a as usize, cols_b as usize, k as usize);
    for j in 0..n {
        for i in 0..m {
            let mut sum = 0.0;
            for p in 0..k {
                sum += *a.add(i + p * m) * *b.add(p + j * k);
            }
            *c.add(i + j * m) = sum;
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn numkit_mvmult(
    rows: i32,
    cols: i32,
    a: *const f64,
    x: *const f64,
    y: *mut f64,
) {
    let (m, n) = (rows as usize, cols as usize);
    for i in 0..m {
        let mut sum = 0.0;
        for j in 0..n {
            sum += *a.add(i + j * m) * *x.add(j);
        }
        *y.add(i) = sum;
    }
}

#[no_mangle]
pub unsafe extern "C" fn numkit_solve(n: i32, columns: i32, a: *mut f64, b: *mut f64) -> i32 {
    if n < 0 || columns < 0 {
        return -1;
    }
    let n = n as usize;
    let matrix = std::slice::from_raw_parts_mut(a, n * n);
    let lu = factorize(n, matrix);
    let info = singular_info(&lu);
    matrix.copy_from_slice(&lu.lu);
    if info != 0 {
        return info;
    }
    let rhs = std::slice::from_raw_parts_mut(b, n * columns as usize);
    for column in rhs.chunks_mut(n.max(1)) {
        solve_column(&lu, column);
    }
    0
}

#[no_mangle]
pub unsafe extern "C" fn numkit_invert(n: i32, a: *mut f64) -> i32 {
    if n < 0 {
        return -1;
    }
    let n_us = n as usize;
    let matrix = std::slice::from_raw_parts_mut(a, n_us * n_us);
    let lu = factorize(n_us, matrix);
    let info = singular_info(&lu);
    if info != 0 {
        return info;
    }
    let mut inverse = vec![0.0; n_us * n_us];
    for col in 0..n_us {
        let column = &mut inverse[col * n_us..(col + 1) * n_us];
        column[col] = 1.0;
        solve_column(&lu, column);
    }
    matrix.copy_from_slice(&inverse);
    0
}

#[no_mangle]
pub unsafe extern "C" fn numkit_dense_factorize(n: i32, matrix: *const f64) -> *mut c_void {
    if n <= 0 || matrix.is_null() {
        return std::ptr::null_mut();
    }
    let n = n as usize;
    let a = std::slice::from_raw_parts(matrix, n * n);
    let lu = factorize(n, a);
    if singular_info(&lu) != 0 {
        return std::ptr::null_mut();
    }
    Box::into_raw(Box::new(lu)) as *mut c_void
}

#[no_mangle]
pub unsafe extern "C" fn numkit_dense_solve(factorization: *mut c_void, columns: i32, b: *mut f64) {
    let lu = &*(factorization as *const DenseLu);
    let rhs = std::slice::from_raw_parts_mut(b, lu.n * columns as usize);
    for column in rhs.chunks_mut(lu.n.max(1)) {
        solve_column(lu, column);
    }
}

#[no_mangle]
pub unsafe extern "C" fn numkit_dense_free(factorization: *mut c_void) {
    if !factorization.is_null() {
        drop(Box::from_raw(factorization as *mut DenseLu));
    }
}

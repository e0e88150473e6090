// src/gep.rs

//! Slice-level entry points for the generalized eigenvalue problem.
//!
//! Same conventions as [`crate::sep`]: column-major slices, explicit leading
//! dimensions and a [`Status`] naming the first invalid argument.

use log::debug;

use crate::config::{EigenvectorConfig, SwapConfig};
use crate::eigvec_gen::generalized_eigenvectors;
use crate::error::{Result, Status};
use crate::layout::{check_leading_dimension, check_len, col_major, col_major_mut};
use crate::reorder::reorder_generalized;
use crate::select::select_generalized;

fn finish(result: Result<Status>, matrix_position: usize, operation: &str) -> Status {
    match result {
        Ok(status) => status,
        Err(err) => {
            debug!("generalized {} failed: {}", operation, err);
            err.status(matrix_position)
        }
    }
}

/// Marks the eigenvalues `(re + i*im) / beta` of the pencil accepted by
/// `predicate(re, im, beta)`. Conjugate pairs are offered once with `im > 0`.
#[allow(clippy::too_many_arguments)]
pub fn select<P>(
    n: usize,
    s: &[f64],
    lds: usize,
    t: &[f64],
    ldt: usize,
    predicate: P,
    selected: &mut [bool],
    num_selected: &mut usize,
) -> Status
where
    P: Fn(f64, f64, f64) -> bool,
{
    let result = (|| -> Result<Status> {
        check_leading_dimension(n, lds, 3, "ldS")?;
        check_leading_dimension(n, ldt, 5, "ldT")?;
        let s = col_major(s, n, n, lds, 2, "S")?;
        let t = col_major(t, n, n, ldt, 4, "T")?;
        check_len(selected.len(), n, 7, "selected")?;
        let selection = select_generalized(s, t, predicate)?;
        selected[..n].copy_from_slice(&selection.selected);
        *num_selected = selection.count;
        Ok(Status::Success)
    })();
    finish(result, 2, "select")
}

/// Moves the selected eigenvalues of `(S, T)` to the leading blocks, applying
/// the left transformations to `Q` and the right ones to `Z`.
#[allow(clippy::too_many_arguments)]
pub fn reorder_schur(
    n: usize,
    selected: &mut [bool],
    s: &mut [f64],
    lds: usize,
    t: &mut [f64],
    ldt: usize,
    q: &mut [f64],
    ldq: usize,
    z: &mut [f64],
    ldz: usize,
    real: &mut [f64],
    imag: &mut [f64],
    beta: &mut [f64],
) -> Status {
    reorder_schur_with(
        &SwapConfig::default(),
        n,
        selected,
        s,
        lds,
        t,
        ldt,
        q,
        ldq,
        z,
        ldz,
        real,
        imag,
        beta,
    )
}

/// [`reorder_schur`] with explicit swap tuning.
#[allow(clippy::too_many_arguments)]
pub fn reorder_schur_with(
    config: &SwapConfig,
    n: usize,
    selected: &mut [bool],
    s: &mut [f64],
    lds: usize,
    t: &mut [f64],
    ldt: usize,
    q: &mut [f64],
    ldq: usize,
    z: &mut [f64],
    ldz: usize,
    real: &mut [f64],
    imag: &mut [f64],
    beta: &mut [f64],
) -> Status {
    let result = (|| -> Result<Status> {
        check_len(selected.len(), n, 2, "selected")?;
        check_leading_dimension(n, lds, 4, "ldS")?;
        check_leading_dimension(n, ldt, 6, "ldT")?;
        check_leading_dimension(n, ldq, 8, "ldQ")?;
        check_leading_dimension(n, ldz, 10, "ldZ")?;
        check_len(real.len(), n, 11, "real")?;
        check_len(imag.len(), n, 12, "imag")?;
        check_len(beta.len(), n, 13, "beta")?;
        let s = col_major_mut(s, n, n, lds, 3, "S")?;
        let t = col_major_mut(t, n, n, ldt, 5, "T")?;
        let q = col_major_mut(q, n, n, ldq, 7, "Q")?;
        let z = col_major_mut(z, n, n, ldz, 9, "Z")?;

        let report = reorder_generalized(s, t, Some(q), Some(z), &mut selected[..n], config)?;
        real[..n].copy_from_slice(&report.eigenvalues.real);
        imag[..n].copy_from_slice(&report.eigenvalues.imag);
        beta[..n].copy_from_slice(&report.eigenvalues.beta);
        Ok(report.status())
    })();
    finish(result, 3, "reorder_schur")
}

/// Writes the back-transformed eigenvectors `Z x` of the selected eigenvalues
/// into `X`.
#[allow(clippy::too_many_arguments)]
pub fn eigenvectors(
    n: usize,
    selected: &[bool],
    s: &[f64],
    lds: usize,
    t: &[f64],
    ldt: usize,
    z: &[f64],
    ldz: usize,
    x: &mut [f64],
    ldx: usize,
) -> Status {
    let result = (|| -> Result<Status> {
        check_len(selected.len(), n, 2, "selected")?;
        check_leading_dimension(n, lds, 4, "ldS")?;
        check_leading_dimension(n, ldt, 6, "ldT")?;
        check_leading_dimension(n, ldz, 8, "ldZ")?;
        check_leading_dimension(n, ldx, 10, "ldX")?;
        let s = col_major(s, n, n, lds, 3, "S")?;
        let t = col_major(t, n, n, ldt, 5, "T")?;
        let z = col_major(z, n, n, ldz, 7, "Z")?;
        let columns = selected[..n].iter().filter(|&&b| b).count();
        let mut x = col_major_mut(x, n, columns, ldx, 9, "X")?;

        let out = generalized_eigenvectors(
            s,
            t,
            Some(z),
            &selected[..n],
            &EigenvectorConfig::default(),
        )?;
        x.assign(&out.vectors);
        if out.is_complete() {
            Ok(Status::Success)
        } else {
            Ok(Status::PartialEigenvectors)
        }
    })();
    finish(result, 3, "eigenvectors")
}

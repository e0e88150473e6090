// src/sep.rs

//! Slice-level entry points for the standard eigenvalue problem.
//!
//! Matrices are dense column-major slices with an explicit leading dimension.
//! Every function returns a [`Status`]; a negative code names the 1-based
//! ordinal of the offending argument in the function's parameter list.

use log::debug;

use crate::config::{EigenvectorConfig, SwapConfig};
use crate::eigvec;
use crate::error::{Result, Status};
use crate::layout::{check_leading_dimension, check_len, col_major, col_major_mut};
use crate::reorder;
use crate::select::select_eigenvalues;

fn finish(result: Result<Status>, matrix_position: usize, operation: &str) -> Status {
    match result {
        Ok(status) => status,
        Err(err) => {
            debug!("{} failed: {}", operation, err);
            err.status(matrix_position)
        }
    }
}

/// Marks the eigenvalues of `S` accepted by `predicate(re, im)`; a conjugate
/// pair is offered once with `im > 0` and both positions get the answer.
pub fn select<P>(
    n: usize,
    s: &[f64],
    lds: usize,
    predicate: P,
    selected: &mut [bool],
    num_selected: &mut usize,
) -> Status
where
    P: Fn(f64, f64) -> bool,
{
    let result = (|| -> Result<Status> {
        check_leading_dimension(n, lds, 3, "ldS")?;
        let s = col_major(s, n, n, lds, 2, "S")?;
        check_len(selected.len(), n, 5, "selected")?;
        let selection = select_eigenvalues(s, predicate)?;
        selected[..n].copy_from_slice(&selection.selected);
        *num_selected = selection.count;
        Ok(Status::Success)
    })();
    finish(result, 2, "select")
}

/// Moves the selected eigenvalues of `S` to its leading block, updating `Q`.
///
/// Returns [`Status::PartialReordering`] when a swap was refused; `selected`
/// then marks the eigenvalues that did reach the front. `real` and `imag`
/// receive the eigenvalues of the reordered form.
#[allow(clippy::too_many_arguments)]
pub fn reorder_schur(
    n: usize,
    selected: &mut [bool],
    s: &mut [f64],
    lds: usize,
    q: &mut [f64],
    ldq: usize,
    real: &mut [f64],
    imag: &mut [f64],
) -> Status {
    reorder_schur_with(&SwapConfig::default(), n, selected, s, lds, q, ldq, real, imag)
}

/// [`reorder_schur`] with explicit swap tuning.
#[allow(clippy::too_many_arguments)]
pub fn reorder_schur_with(
    config: &SwapConfig,
    n: usize,
    selected: &mut [bool],
    s: &mut [f64],
    lds: usize,
    q: &mut [f64],
    ldq: usize,
    real: &mut [f64],
    imag: &mut [f64],
) -> Status {
    let result = (|| -> Result<Status> {
        check_len(selected.len(), n, 2, "selected")?;
        check_leading_dimension(n, lds, 4, "ldS")?;
        check_leading_dimension(n, ldq, 6, "ldQ")?;
        check_len(real.len(), n, 7, "real")?;
        check_len(imag.len(), n, 8, "imag")?;
        let s = col_major_mut(s, n, n, lds, 3, "S")?;
        let q = col_major_mut(q, n, n, ldq, 5, "Q")?;

        let report = reorder::reorder_schur(s, Some(q), &mut selected[..n], config)?;
        real[..n].copy_from_slice(&report.eigenvalues.real);
        imag[..n].copy_from_slice(&report.eigenvalues.imag);
        Ok(report.status())
    })();
    finish(result, 3, "reorder_schur")
}

/// Writes the back-transformed eigenvectors `Q x` of the selected eigenvalues
/// into `X`, one column per real eigenvalue and two per conjugate pair.
///
/// Returns [`Status::PartialEigenvectors`] when some columns underflowed and
/// were left at zero.
#[allow(clippy::too_many_arguments)]
pub fn eigenvectors(
    n: usize,
    selected: &[bool],
    s: &[f64],
    lds: usize,
    q: &[f64],
    ldq: usize,
    x: &mut [f64],
    ldx: usize,
) -> Status {
    let result = (|| -> Result<Status> {
        check_len(selected.len(), n, 2, "selected")?;
        check_leading_dimension(n, lds, 4, "ldS")?;
        check_leading_dimension(n, ldq, 6, "ldQ")?;
        check_leading_dimension(n, ldx, 8, "ldX")?;
        let s = col_major(s, n, n, lds, 3, "S")?;
        let q = col_major(q, n, n, ldq, 5, "Q")?;
        let columns = selected[..n].iter().filter(|&&b| b).count();
        let mut x = col_major_mut(x, n, columns, ldx, 7, "X")?;

        let out = eigvec::eigenvectors(s, Some(q), &selected[..n], &EigenvectorConfig::default())?;
        x.assign(&out.vectors);
        if out.is_complete() {
            Ok(Status::Success)
        } else {
            Ok(Status::PartialEigenvectors)
        }
    })();
    finish(result, 3, "eigenvectors")
}

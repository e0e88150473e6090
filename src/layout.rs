// src/layout.rs

//! Column-major views with an explicit leading dimension.
//!
//! Callers of the slice-level entry points hand over dense column-major storage
//! where column `j` starts at offset `j * ld`. All bounds and stride handling is
//! done here once; the numerical code only ever sees `ndarray` views.

use ndarray::{ArrayView2, ArrayViewMut2, ShapeBuilder};

use crate::error::{Result, SchurError};

/// Number of scalars a `rows x cols` column-major matrix with leading dimension
/// `ld` occupies.
pub fn required_len(rows: usize, cols: usize, ld: usize) -> usize {
    if rows == 0 || cols == 0 {
        0
    } else {
        ld * (cols - 1) + rows
    }
}

/// Validates a leading dimension; `position` is the ordinal reported on failure.
pub fn check_leading_dimension(
    rows: usize,
    ld: usize,
    position: usize,
    name: &'static str,
) -> Result<()> {
    if ld < rows.max(1) {
        return Err(SchurError::invalid(
            position,
            name,
            format!("leading dimension {} is smaller than max(1, {})", ld, rows),
        ));
    }
    Ok(())
}

fn check_storage(
    len: usize,
    rows: usize,
    cols: usize,
    ld: usize,
    position: usize,
    name: &'static str,
) -> Result<()> {
    let needed = required_len(rows, cols, ld);
    if len < needed {
        return Err(SchurError::invalid(
            position,
            name,
            format!(
                "{}x{} matrix with leading dimension {} needs {} entries, got {}",
                rows, cols, ld, needed, len
            ),
        ));
    }
    Ok(())
}

/// Read-only view of column-major storage.
pub fn col_major<'a>(
    data: &'a [f64],
    rows: usize,
    cols: usize,
    ld: usize,
    position: usize,
    name: &'static str,
) -> Result<ArrayView2<'a, f64>> {
    check_storage(data.len(), rows, cols, ld, position, name)?;
    let needed = required_len(rows, cols, ld);
    Ok(ArrayView2::from_shape(
        (rows, cols).strides((1, ld.max(1))),
        &data[..needed],
    )?)
}

/// Mutable view of column-major storage.
pub fn col_major_mut<'a>(
    data: &'a mut [f64],
    rows: usize,
    cols: usize,
    ld: usize,
    position: usize,
    name: &'static str,
) -> Result<ArrayViewMut2<'a, f64>> {
    check_storage(data.len(), rows, cols, ld, position, name)?;
    let needed = required_len(rows, cols, ld);
    Ok(ArrayViewMut2::from_shape(
        (rows, cols).strides((1, ld.max(1))),
        &mut data[..needed],
    )?)
}

/// Checks that a parallel array holds at least `n` entries.
pub fn check_len(len: usize, n: usize, position: usize, name: &'static str) -> Result<()> {
    if len < n {
        return Err(SchurError::invalid(
            position,
            name,
            format!("expected at least {} entries, got {}", n, len),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_respects_leading_dimension() {
        // 2x2 matrix stored with ld = 3, padding rows marked with NaN
        let data = [1.0, 3.0, f64::NAN, 2.0, 4.0];
        let view = col_major(&data, 2, 2, 3, 1, "A").unwrap();
        assert_eq!(view[[0, 0]], 1.0);
        assert_eq!(view[[1, 0]], 3.0);
        assert_eq!(view[[0, 1]], 2.0);
        assert_eq!(view[[1, 1]], 4.0);
    }

    #[test]
    fn short_storage_reports_ordinal() {
        let data = [0.0; 4];
        let err = col_major(&data, 2, 2, 3, 5, "Q").unwrap_err();
        assert!(matches!(err, SchurError::InvalidArgument { position: 5, .. }));
    }

    #[test]
    fn empty_matrix_needs_no_storage() {
        let mut data: [f64; 0] = [];
        let view = col_major_mut(&mut data, 0, 0, 1, 1, "S").unwrap();
        assert_eq!(view.dim(), (0, 0));
    }
}

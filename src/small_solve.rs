// src/small_solve.rs

//! Solver for the shifted 1x1 and 2x2 systems met during back-substitution.
//!
//! Solves `(ca * op(A) - w * D) X = scale * B` where `A` is 1x1 or 2x2,
//! `D = diag(d1, d2)`, `w = wr + i*wi` and `op` optionally transposes. With
//! `wi == 0` only the first column of `B` and `X` is used; otherwise column 0
//! holds real parts and column 1 imaginary parts.
//!
//! `scale <= 1` is chosen so that `X` cannot overflow. When the coefficient
//! matrix is smaller than `smin` it is perturbed up to `smin` and the solution
//! is flagged as perturbed; the answer is then bounded but not exact.

use ndarray::ArrayView2;

/// Coefficients of one shifted small system.
#[derive(Debug, Clone, Copy)]
pub struct ShiftedSystem<'a> {
    pub transpose: bool,
    pub smin: f64,
    pub ca: f64,
    pub a: ArrayView2<'a, f64>,
    pub d1: f64,
    pub d2: f64,
    pub wr: f64,
    pub wi: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmallSolution {
    /// `x[row][0]` real part, `x[row][1]` imaginary part.
    pub x: [[f64; 2]; 2],
    pub scale: f64,
    /// Infinity norm of `X` (|re| + |im| per row for complex shifts).
    pub xnorm: f64,
    pub perturbed: bool,
}

// Complete pivoting over the four entries of a 2x2 matrix stored column-major
// (c11, c21, c12, c22). Column `icmax` of IPIVOT lists the pivoted order.
const ZSWAP: [bool; 4] = [false, false, true, true];
const RSWAP: [bool; 4] = [false, true, false, true];
const IPIVOT: [[usize; 4]; 4] = [[0, 1, 2, 3], [1, 0, 3, 2], [2, 3, 0, 1], [3, 2, 1, 0]];

/// Robust complex division `(a + ib) / (c + id)`.
pub fn complex_div(a: f64, b: f64, c: f64, d: f64) -> (f64, f64) {
    if d.abs() <= c.abs() {
        let e = d / c;
        let f = c + d * e;
        ((a + b * e) / f, (b - a * e) / f)
    } else {
        let e = c / d;
        let f = d + c * e;
        ((b + a * e) / f, (-a + b * e) / f)
    }
}

pub fn solve_shifted(sys: &ShiftedSystem<'_>, b: &[[f64; 2]; 2]) -> SmallSolution {
    let smlnum = 2.0 * f64::MIN_POSITIVE;
    let bignum = 1.0 / smlnum;
    let smini = sys.smin.max(smlnum);
    let complex = sys.wi != 0.0;

    let mut out = SmallSolution {
        x: [[0.0; 2]; 2],
        scale: 1.0,
        xnorm: 0.0,
        perturbed: false,
    };

    if sys.a.nrows() == 1 {
        let mut csr = sys.ca * sys.a[[0, 0]] - sys.wr * sys.d1;
        if !complex {
            let mut cnorm = csr.abs();
            if cnorm < smini {
                csr = smini;
                cnorm = smini;
                out.perturbed = true;
            }
            let bnorm = b[0][0].abs();
            if cnorm < 1.0 && bnorm > 1.0 && bnorm > bignum * cnorm {
                out.scale = 1.0 / bnorm;
            }
            out.x[0][0] = (b[0][0] * out.scale) / csr;
            out.xnorm = out.x[0][0].abs();
        } else {
            let mut csi = -sys.wi * sys.d1;
            let mut cnorm = csr.abs() + csi.abs();
            if cnorm < smini {
                csr = smini;
                csi = 0.0;
                cnorm = smini;
                out.perturbed = true;
            }
            let bnorm = b[0][0].abs() + b[0][1].abs();
            if cnorm < 1.0 && bnorm > 1.0 && bnorm > bignum * cnorm {
                out.scale = 1.0 / bnorm;
            }
            let (xr, xi) = complex_div(out.scale * b[0][0], out.scale * b[0][1], csr, csi);
            out.x[0][0] = xr;
            out.x[0][1] = xi;
            out.xnorm = xr.abs() + xi.abs();
        }
        return out;
    }

    // 2x2: real part of the coefficient matrix, column-major
    let a = &sys.a;
    let mut crv = [0.0; 4];
    crv[0] = sys.ca * a[[0, 0]] - sys.wr * sys.d1;
    crv[3] = sys.ca * a[[1, 1]] - sys.wr * sys.d2;
    if sys.transpose {
        crv[2] = sys.ca * a[[1, 0]];
        crv[1] = sys.ca * a[[0, 1]];
    } else {
        crv[1] = sys.ca * a[[1, 0]];
        crv[2] = sys.ca * a[[0, 1]];
    }

    if !complex {
        let (icmax, cmax) = crv
            .iter()
            .enumerate()
            .fold((0, 0.0), |(im, m), (j, v)| if v.abs() > m { (j, v.abs()) } else { (im, m) });

        if cmax < smini {
            // Use smini * I
            let bnorm = b[0][0].abs().max(b[1][0].abs());
            if smini < 1.0 && bnorm > 1.0 && bnorm > bignum * smini {
                out.scale = 1.0 / bnorm;
            }
            let temp = out.scale / smini;
            out.x[0][0] = temp * b[0][0];
            out.x[1][0] = temp * b[1][0];
            out.xnorm = temp * bnorm;
            out.perturbed = true;
            return out;
        }

        // Gaussian elimination with complete pivoting
        let ur11 = crv[icmax];
        let cr21 = crv[IPIVOT[icmax][1]];
        let ur12 = crv[IPIVOT[icmax][2]];
        let cr22 = crv[IPIVOT[icmax][3]];
        let ur11r = 1.0 / ur11;
        let lr21 = ur11r * cr21;
        let mut ur22 = cr22 - ur12 * lr21;
        if ur22.abs() < smini {
            ur22 = smini;
            out.perturbed = true;
        }

        let (br1, mut br2) = if RSWAP[icmax] {
            (b[1][0], b[0][0])
        } else {
            (b[0][0], b[1][0])
        };
        br2 -= lr21 * br1;
        let bbnd = (br1 * (ur22 * ur11r)).abs().max(br2.abs());
        if bbnd > 1.0 && ur22.abs() < 1.0 && bbnd >= bignum * ur22.abs() {
            out.scale = 1.0 / bbnd;
        }

        let xr2 = (br2 * out.scale) / ur22;
        let xr1 = (out.scale * br1) * ur11r - xr2 * (ur11r * ur12);
        if ZSWAP[icmax] {
            out.x[0][0] = xr2;
            out.x[1][0] = xr1;
        } else {
            out.x[0][0] = xr1;
            out.x[1][0] = xr2;
        }
        out.xnorm = xr1.abs().max(xr2.abs());

        // Further scaling if norm(A) norm(X) > overflow
        if out.xnorm > 1.0 && cmax > 1.0 && out.xnorm > bignum / cmax {
            let temp = cmax / bignum;
            out.x[0][0] *= temp;
            out.x[1][0] *= temp;
            out.xnorm *= temp;
            out.scale *= temp;
        }
        return out;
    }

    // Complex 2x2: imaginary part of the coefficient matrix is diagonal
    let mut civ = [0.0; 4];
    civ[0] = -sys.wi * sys.d1;
    civ[3] = -sys.wi * sys.d2;

    let (icmax, cmax) = (0..4).fold((0, 0.0), |(im, m), j| {
        let v = crv[j].abs() + civ[j].abs();
        if v > m {
            (j, v)
        } else {
            (im, m)
        }
    });

    if cmax < smini {
        let bnorm = (b[0][0].abs() + b[0][1].abs()).max(b[1][0].abs() + b[1][1].abs());
        if smini < 1.0 && bnorm > 1.0 && bnorm > bignum * smini {
            out.scale = 1.0 / bnorm;
        }
        let temp = out.scale / smini;
        for row in 0..2 {
            for col in 0..2 {
                out.x[row][col] = temp * b[row][col];
            }
        }
        out.xnorm = temp * bnorm;
        out.perturbed = true;
        return out;
    }

    let ur11 = crv[icmax];
    let ui11 = civ[icmax];
    let cr21 = crv[IPIVOT[icmax][1]];
    let ci21 = civ[IPIVOT[icmax][1]];
    let ur12 = crv[IPIVOT[icmax][2]];
    let ui12 = civ[IPIVOT[icmax][2]];
    let cr22 = crv[IPIVOT[icmax][3]];
    let ci22 = civ[IPIVOT[icmax][3]];

    let ur11r: f64;
    let ui11r: f64;
    let lr21: f64;
    let li21: f64;
    let ur12s: f64;
    let ui12s: f64;
    let mut ur22: f64;
    let mut ui22: f64;
    if icmax == 0 || icmax == 3 {
        // Off-diagonals of the pivoted matrix are real
        if ur11.abs() > ui11.abs() {
            let temp = ui11 / ur11;
            ur11r = 1.0 / (ur11 * (1.0 + temp * temp));
            ui11r = -temp * ur11r;
        } else {
            let temp = ur11 / ui11;
            ui11r = -1.0 / (ui11 * (1.0 + temp * temp));
            ur11r = -temp * ui11r;
        }
        lr21 = cr21 * ur11r;
        li21 = cr21 * ui11r;
        ur12s = ur12 * ur11r;
        ui12s = ur12 * ui11r;
        ur22 = cr22 - ur12 * lr21;
        ui22 = ci22 - ur12 * li21;
    } else {
        // Diagonals of the pivoted matrix are real
        ur11r = 1.0 / ur11;
        ui11r = 0.0;
        lr21 = cr21 * ur11r;
        li21 = ci21 * ur11r;
        ur12s = ur12 * ur11r;
        ui12s = ui12 * ur11r;
        ur22 = cr22 - ur12 * lr21 + ui12 * li21;
        ui22 = -ur12 * li21 - ui12 * lr21;
    }

    let u22abs = ur22.abs() + ui22.abs();
    if u22abs < smini {
        ur22 = smini;
        ui22 = 0.0;
        out.perturbed = true;
    }

    let (mut br1, mut bi1, mut br2, mut bi2) = if RSWAP[icmax] {
        (b[1][0], b[1][1], b[0][0], b[0][1])
    } else {
        (b[0][0], b[0][1], b[1][0], b[1][1])
    };
    br2 = br2 - lr21 * br1 + li21 * bi1;
    bi2 = bi2 - li21 * br1 - lr21 * bi1;

    let u22abs = ur22.abs() + ui22.abs();
    let bbnd = ((br1.abs() + bi1.abs()) * (u22abs * (ur11r.abs() + ui11r.abs())))
        .max(br2.abs() + bi2.abs());
    if bbnd > 1.0 && u22abs < 1.0 && bbnd >= bignum * u22abs {
        out.scale = 1.0 / bbnd;
        br1 *= out.scale;
        bi1 *= out.scale;
        br2 *= out.scale;
        bi2 *= out.scale;
    }

    let (xr2, xi2) = complex_div(br2, bi2, ur22, ui22);
    let xr1 = ur11r * br1 - ui11r * bi1 - ur12s * xr2 + ui12s * xi2;
    let xi1 = ui11r * br1 + ur11r * bi1 - ui12s * xr2 - ur12s * xi2;
    if ZSWAP[icmax] {
        out.x = [[xr2, xi2], [xr1, xi1]];
    } else {
        out.x = [[xr1, xi1], [xr2, xi2]];
    }
    out.xnorm = (xr1.abs() + xi1.abs()).max(xr2.abs() + xi2.abs());

    if out.xnorm > 1.0 && cmax > 1.0 && out.xnorm > bignum / cmax {
        let temp = cmax / bignum;
        for row in out.x.iter_mut() {
            for v in row.iter_mut() {
                *v *= temp;
            }
        }
        out.xnorm *= temp;
        out.scale *= temp;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn complex_division_matches_definition() {
        let (re, im) = complex_div(1.0, 2.0, 3.0, -4.0);
        // (1 + 2i) / (3 - 4i) = (-5 + 10i) / 25
        assert!((re + 0.2).abs() < 1e-15);
        assert!((im - 0.4).abs() < 1e-15);
    }

    #[test]
    fn pivot_table_is_a_permutation() {
        for col in IPIVOT.iter() {
            let mut seen = [false; 4];
            for &i in col {
                seen[i] = true;
            }
            assert!(seen.iter().all(|&s| s));
        }
    }

    #[test]
    fn transposed_real_system() {
        let a = array![[1.0, 2.0], [0.0, 3.0]];
        let sys = ShiftedSystem {
            transpose: true,
            smin: 1e-300,
            ca: 1.0,
            a: a.view(),
            d1: 1.0,
            d2: 1.0,
            wr: 0.0,
            wi: 0.0,
        };
        // A^T x = b with x = (1, 1): b = (1, 5)
        let sol = solve_shifted(&sys, &[[1.0, 0.0], [5.0, 0.0]]);
        assert_eq!(sol.scale, 1.0);
        assert!((sol.x[0][0] - 1.0).abs() < 1e-14);
        assert!((sol.x[1][0] - 1.0).abs() < 1e-14);
    }
}

// src/rotation.rs

//! Plane rotations, Householder completions and 2x2 normal forms.

use ndarray::{s, Array2, ArrayView2, ArrayViewMut2};

/// Plane rotation `R = [c -s; s c]`.
///
/// `apply_left` multiplies rows `(i, k)` by `R^T`, `apply_right` multiplies
/// columns `(i, k)` by `R`, so `apply_left` followed by `apply_right` is the
/// similarity `R^T A R`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneRotation {
    pub c: f64,
    pub s: f64,
}

impl PlaneRotation {
    pub fn identity() -> Self {
        PlaneRotation { c: 1.0, s: 0.0 }
    }

    /// Rotation with `[c s; -s c] [f; g] = [r; 0]`, returned with `r`.
    pub fn zeroing(f: f64, g: f64) -> (Self, f64) {
        if g == 0.0 {
            (PlaneRotation { c: 1.0, s: 0.0 }, f)
        } else if f == 0.0 {
            (PlaneRotation { c: 0.0, s: g.signum() }, g.abs())
        } else {
            let scale = f.abs().max(g.abs());
            let fs = f / scale;
            let gs = g / scale;
            let r = scale * (fs * fs + gs * gs).sqrt();
            (PlaneRotation { c: f / r, s: g / r }, r)
        }
    }

    pub fn apply_left(&self, a: &mut ArrayViewMut2<f64>, i: usize, k: usize) {
        for j in 0..a.ncols() {
            let x = a[[i, j]];
            let y = a[[k, j]];
            a[[i, j]] = self.c * x + self.s * y;
            a[[k, j]] = self.c * y - self.s * x;
        }
    }

    pub fn apply_right(&self, a: &mut ArrayViewMut2<f64>, i: usize, k: usize) {
        for r in 0..a.nrows() {
            let x = a[[r, i]];
            let y = a[[r, k]];
            a[[r, i]] = self.c * x + self.s * y;
            a[[r, k]] = self.c * y - self.s * x;
        }
    }
}

/// Orthogonal `m x m` matrix whose leading `k` columns span the columns of the
/// `m x k` matrix `v`.
pub fn orthonormal_completion(v: ArrayView2<f64>) -> Array2<f64> {
    let (m, k) = v.dim();
    let mut a = v.to_owned();
    let mut u = Array2::<f64>::eye(m);
    let mut w = vec![0.0; m];

    for col in 0..k.min(m) {
        let norm = a
            .slice(s![col.., col])
            .iter()
            .map(|x| x * x)
            .sum::<f64>()
            .sqrt();
        if norm == 0.0 {
            continue;
        }
        let alpha = if a[[col, col]] >= 0.0 { -norm } else { norm };

        w.iter_mut().for_each(|x| *x = 0.0);
        w[col] = a[[col, col]] - alpha;
        for r in col + 1..m {
            w[r] = a[[r, col]];
        }
        let w_norm_sq: f64 = w[col..].iter().map(|x| x * x).sum();
        if w_norm_sq == 0.0 {
            continue;
        }
        let beta = 2.0 / w_norm_sq;

        for j in col..k {
            let dot: f64 = (col..m).map(|r| w[r] * a[[r, j]]).sum();
            for r in col..m {
                a[[r, j]] -= beta * dot * w[r];
            }
        }

        for row in 0..m {
            let dot: f64 = (col..m).map(|r| u[[row, r]] * w[r]).sum();
            for r in col..m {
                u[[row, r]] -= beta * dot * w[r];
            }
        }
    }

    u
}

/// Standardized real 2x2 block produced by [`standardize_2x2`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standard2x2 {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub rotation: PlaneRotation,
}

impl Standard2x2 {
    /// True when the block still holds a complex conjugate pair.
    pub fn is_complex(&self) -> bool {
        self.c != 0.0
    }

    /// Eigenvalue with non-negative imaginary part.
    pub fn eigenvalue(&self) -> (f64, f64) {
        if self.c == 0.0 {
            (self.a, 0.0)
        } else {
            (self.a, self.b.abs().sqrt() * self.c.abs().sqrt())
        }
    }
}

/// Schur factorization of a real 2x2 block, `[a b; c d] = R [aa bb; cc dd] R^T`.
///
/// On return either `c == 0` (two real eigenvalues `a`, `d`) or `a == d` and
/// `b * c < 0` (a conjugate pair `a +- sqrt(-b c) i`).
pub fn standardize_2x2(a: f64, b: f64, c: f64, d: f64) -> Standard2x2 {
    const MULTPL: f64 = 4.0;
    let eps = f64::EPSILON;
    let safmn2 = 2f64.powi(((f64::MIN_POSITIVE / eps).log2() / 2.0) as i32);
    let safmx2 = 1.0 / safmn2;

    let (mut a, mut b, mut c, mut d) = (a, b, c, d);
    let mut cs: f64;
    let mut sn: f64;

    if c == 0.0 {
        cs = 1.0;
        sn = 0.0;
    } else if b == 0.0 {
        // Swap rows and columns
        cs = 0.0;
        sn = 1.0;
        std::mem::swap(&mut a, &mut d);
        b = -c;
        c = 0.0;
    } else if a - d == 0.0 && b.signum() != c.signum() {
        cs = 1.0;
        sn = 0.0;
    } else {
        let mut temp = a - d;
        let mut p = 0.5 * temp;
        let bcmax = b.abs().max(c.abs());
        let bcmis = b.abs().min(c.abs()) * b.signum() * c.signum();
        let mut scale = p.abs().max(bcmax);
        let mut z = (p / scale) * p + (bcmax / scale) * bcmis;

        if z >= MULTPL * eps {
            // Real eigenvalues
            z = p + (scale.sqrt() * z.sqrt()).copysign(p);
            a = d + z;
            d -= (bcmax / z) * bcmis;
            let tau = c.hypot(z);
            cs = z / tau;
            sn = c / tau;
            b -= c;
            c = 0.0;
        } else {
            // Complex or nearly equal real eigenvalues: make the diagonal equal
            let mut sigma = b + c;
            for _ in 0..=20 {
                scale = temp.abs().max(sigma.abs());
                if scale >= safmx2 {
                    sigma *= safmn2;
                    temp *= safmn2;
                    continue;
                }
                if scale <= safmn2 {
                    sigma *= safmx2;
                    temp *= safmx2;
                    continue;
                }
                break;
            }
            p = 0.5 * temp;
            let mut tau = sigma.hypot(temp);
            cs = (0.5 * (1.0 + sigma.abs() / tau)).sqrt();
            sn = -(p / (tau * cs)) * 1f64.copysign(sigma);

            let aa = a * cs + b * sn;
            let bb = -a * sn + b * cs;
            let cc = c * cs + d * sn;
            let dd = -c * sn + d * cs;

            a = aa * cs + cc * sn;
            b = bb * cs + dd * sn;
            c = -aa * sn + cc * cs;
            d = -bb * sn + dd * cs;

            temp = 0.5 * (a + d);
            a = temp;
            d = temp;

            if c != 0.0 {
                if b != 0.0 {
                    if b.signum() == c.signum() {
                        // Real eigenvalues after all: reduce to upper triangular
                        let sab = b.abs().sqrt();
                        let sac = c.abs().sqrt();
                        p = (sab * sac).copysign(c);
                        tau = 1.0 / (b + c).abs().sqrt();
                        a = temp + p;
                        d = temp - p;
                        b -= c;
                        c = 0.0;
                        let cs1 = sab * tau;
                        let sn1 = sac * tau;
                        let t = cs * cs1 - sn * sn1;
                        sn = cs * sn1 + sn * cs1;
                        cs = t;
                    }
                } else {
                    b = -c;
                    c = 0.0;
                    let t = cs;
                    cs = -sn;
                    sn = t;
                }
            }
        }
    }

    Standard2x2 {
        a,
        b,
        c,
        d,
        rotation: PlaneRotation { c: cs, s: sn },
    }
}

/// Rotations `L`, `R` with `L^T M R` diagonal for a real 2x2 `M`, returned with
/// the two diagonal entries.
pub fn diagonalize_2x2(m: [[f64; 2]; 2]) -> (PlaneRotation, PlaneRotation, [f64; 2]) {
    // Right rotation diagonalizes M^T M
    let g00 = m[0][0] * m[0][0] + m[1][0] * m[1][0];
    let g11 = m[0][1] * m[0][1] + m[1][1] * m[1][1];
    let g01 = m[0][0] * m[0][1] + m[1][0] * m[1][1];
    let theta = 0.5 * (2.0 * g01).atan2(g00 - g11);
    let right = PlaneRotation {
        c: theta.cos(),
        s: theta.sin(),
    };

    // Columns of M R are orthogonal
    let col0 = [
        right.c * m[0][0] + right.s * m[0][1],
        right.c * m[1][0] + right.s * m[1][1],
    ];
    let col1 = [
        -right.s * m[0][0] + right.c * m[0][1],
        -right.s * m[1][0] + right.c * m[1][1],
    ];
    let n0 = col0[0].hypot(col0[1]);
    let n1 = col1[0].hypot(col1[1]);
    let left = if n0 > 0.0 {
        PlaneRotation {
            c: col0[0] / n0,
            s: col0[1] / n0,
        }
    } else if n1 > 0.0 {
        PlaneRotation {
            c: col1[1] / n1,
            s: -col1[0] / n1,
        }
    } else {
        PlaneRotation::identity()
    };

    let d0 = left.c * col0[0] + left.s * col0[1];
    let d1 = -left.s * col1[0] + left.c * col1[1];
    (left, right, [d0, d1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn zeroing_rotation_annihilates_second_component() {
        let (rot, r) = PlaneRotation::zeroing(3.0, 4.0);
        assert!((r - 5.0).abs() < 1e-14);
        assert!((-rot.s * 3.0 + rot.c * 4.0).abs() < 1e-14);
    }

    #[test]
    fn completion_spans_input_columns() {
        let v = array![[1.0], [2.0], [2.0]];
        let u = orthonormal_completion(v.view());
        let utu = u.t().dot(&u);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((utu[[i, j]] - expected).abs() < 1e-14);
            }
        }
        // First column parallel to v
        let dot: f64 = (0..3).map(|i| u[[i, 0]] * v[[i, 0]]).sum();
        assert!((dot.abs() - 3.0).abs() < 1e-13);
    }

    #[test]
    fn standardize_complex_block_equalizes_diagonal() {
        let std = standardize_2x2(1.0, -5.0, 2.0, 3.0);
        assert!(std.is_complex());
        assert_eq!(std.a, std.d);
        assert!(std.b * std.c < 0.0);
        // trace and determinant survive
        assert!((std.a + std.d - 4.0).abs() < 1e-13);
        assert!((std.a * std.d - std.b * std.c - 13.0).abs() < 1e-12);
    }

    #[test]
    fn standardize_real_block_triangularizes() {
        let std = standardize_2x2(4.0, 1.0, 2.0, 3.0);
        assert!(!std.is_complex());
        let mut eig = [std.a, std.d];
        eig.sort_by(|x, y| x.partial_cmp(y).unwrap());
        assert!((eig[0] - 2.0).abs() < 1e-13);
        assert!((eig[1] - 5.0).abs() < 1e-13);
    }

    #[test]
    fn diagonalize_upper_triangular() {
        let m = [[2.0, 1.0], [0.0, 0.5]];
        let (l, r, d) = diagonalize_2x2(m);
        let mut mat = array![[2.0, 1.0], [0.0, 0.5]];
        l.apply_left(&mut mat.view_mut(), 0, 1);
        r.apply_right(&mut mat.view_mut(), 0, 1);
        assert!(mat[[0, 1]].abs() < 1e-14);
        assert!(mat[[1, 0]].abs() < 1e-14);
        assert!((mat[[0, 0]] - d[0]).abs() < 1e-14);
        assert!((mat[[1, 1]] - d[1]).abs() < 1e-14);
        assert!(((d[0] * d[1]).abs() - 1.0).abs() < 1e-14);
    }
}

// tests/test_small_solve.rs

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use schurvec::small_solve::{complex_div, solve_shifted, ShiftedSystem};

    fn system(a: ndarray::ArrayView2<'_, f64>, wr: f64, wi: f64) -> ShiftedSystem<'_> {
        ShiftedSystem {
            transpose: false,
            smin: 1e-300,
            ca: 1.0,
            a,
            d1: 1.0,
            d2: 1.0,
            wr,
            wi,
        }
    }

    #[test]
    fn test_real_scalar_solve() {
        let a = array![[5.0]];
        let sol = solve_shifted(&system(a.view(), 1.0, 0.0), &[[8.0, 0.0], [0.0, 0.0]]);
        assert_eq!(sol.scale, 1.0);
        assert!(!sol.perturbed);
        assert_abs_diff_eq!(sol.x[0][0], 2.0, epsilon = 1e-15);
        assert_abs_diff_eq!(sol.xnorm, 2.0, epsilon = 1e-15);
    }

    #[test]
    fn test_complex_scalar_solve() {
        // (3 - (1 + 2i)) x = 4  =>  x = 4 / (2 - 2i) = 1 + i
        let a = array![[3.0]];
        let sol = solve_shifted(&system(a.view(), 1.0, 2.0), &[[4.0, 0.0], [0.0, 0.0]]);
        assert_abs_diff_eq!(sol.x[0][0], 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(sol.x[0][1], 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(sol.xnorm, 2.0, epsilon = 1e-15);
    }

    #[test]
    fn test_complex_two_by_two_residual() {
        let a = array![[1.0, 2.0], [-3.0, 4.0]];
        let (wr, wi) = (0.5, 1.5);
        let b = [[1.0, -2.0], [0.5, 3.0]];
        let sol = solve_shifted(&system(a.view(), wr, wi), &b);
        assert_eq!(sol.scale, 1.0);

        // (A - w I) x = b in complex arithmetic
        for r in 0..2 {
            let mut re = -wr * sol.x[r][0] + wi * sol.x[r][1];
            let mut im = -wr * sol.x[r][1] - wi * sol.x[r][0];
            for c in 0..2 {
                re += a[[r, c]] * sol.x[c][0];
                im += a[[r, c]] * sol.x[c][1];
            }
            assert!((re - b[r][0]).abs() < 1e-13, "row {} real residual {}", r, re - b[r][0]);
            assert!((im - b[r][1]).abs() < 1e-13, "row {} imag residual {}", r, im - b[r][1]);
        }
    }

    #[test]
    fn test_shift_diagonal_and_ca() {
        // (2 A - 3 diag(1, 2)) x = b
        let a = array![[4.0, 1.0], [0.5, 5.0]];
        let sys = ShiftedSystem {
            transpose: false,
            smin: 1e-300,
            ca: 2.0,
            a: a.view(),
            d1: 1.0,
            d2: 2.0,
            wr: 3.0,
            wi: 0.0,
        };
        let b = [[7.0, 0.0], [-1.0, 0.0]];
        let sol = solve_shifted(&sys, &b);
        let m = [[2.0 * 4.0 - 3.0, 2.0], [1.0, 2.0 * 5.0 - 6.0]];
        for r in 0..2 {
            let lhs = m[r][0] * sol.x[0][0] + m[r][1] * sol.x[1][0];
            assert_abs_diff_eq!(lhs, sol.scale * b[r][0], epsilon = 1e-13);
        }
    }

    #[test]
    fn test_singular_block_is_perturbed() {
        let a = array![[1.0, 1.0], [1.0, 1.0]];
        let sol = solve_shifted(
            &ShiftedSystem {
                smin: 1e-8,
                ..system(a.view(), 0.0, 0.0)
            },
            &[[1.0, 0.0], [1.0, 0.0]],
        );
        assert!(sol.perturbed, "a singular block must report the pivot floor");
        assert!(sol.x.iter().all(|r| r[0].is_finite()));
        assert!(sol.xnorm <= 1.0 / 1e-8 * 2.0);
    }

    #[test]
    fn test_overflow_is_scaled_away() {
        let a = array![[0.0]];
        let sys = ShiftedSystem {
            smin: 1e-300,
            ..system(a.view(), 0.0, 0.0)
        };
        let sol = solve_shifted(&sys, &[[1e300, 0.0], [0.0, 0.0]]);
        assert!(sol.perturbed);
        assert!(sol.scale < 1.0 && sol.scale > 0.0);
        assert!(sol.x[0][0].is_finite());
        // scale * b was solved exactly against the floored pivot
        let relative = (1e-300 * sol.x[0][0] - sol.scale * 1e300).abs() / (sol.scale * 1e300);
        assert!(relative < 1e-14);
    }

    #[test]
    fn test_complex_division_avoids_overflow() {
        let (re, im) = complex_div(1e300, 1e300, 1e300, 1e300);
        assert_abs_diff_eq!(re, 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(im, 0.0, epsilon = 1e-15);
    }
}

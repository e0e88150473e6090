// tests/test_eigvec.rs


#[cfg(test)]
mod tests {
    use super::common_schur::{max_abs, random_orthogonal, random_schur, Eig};
    use ndarray::{array, Array1, Array2, ArrayView1, ArrayView2};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use schurvec::blocks::eigenvalues;
    use schurvec::{
        classify_blocks, eigenvectors, EigenvectorConfig, Normalization, SchurError,
    };

    fn serial(normalization: Normalization) -> EigenvectorConfig {
        EigenvectorConfig {
            normalization,
            parallel: false,
        }
    }

    fn norm(v: ArrayView1<f64>) -> f64 {
        v.dot(&v).sqrt()
    }

    /// Largest residual of `a x = lambda x` over all columns of `x`, relative to
    /// `||a||`. Columns are consumed one per real eigenvalue and two per pair.
    fn residual(a: ArrayView2<f64>, x: ArrayView2<f64>, real: &[f64], imag: &[f64]) -> f64 {
        let scale = max_abs(a).max(1.0);
        let mut worst = 0.0f64;
        let mut col = 0;
        let mut k = 0;
        while k < real.len() {
            if imag[k] == 0.0 {
                let v = x.column(col);
                let r: Array1<f64> = a.dot(&v) - &(&v * real[k]);
                worst = worst.max(r.iter().fold(0.0f64, |m, e| m.max(e.abs())));
                col += 1;
                k += 1;
            } else {
                let (wr, wi) = (real[k], imag[k]);
                let (xr, xi) = (x.column(col), x.column(col + 1));
                let rr: Array1<f64> = a.dot(&xr) - &(&xr * wr) + &(&xi * wi);
                let ri: Array1<f64> = a.dot(&xi) - &(&xi * wr) - &(&xr * wi);
                for e in rr.iter().chain(ri.iter()) {
                    worst = worst.max(e.abs());
                }
                col += 2;
                k += 2;
            }
        }
        worst / scale
    }

    fn mixed_form(seed: u64) -> Array2<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let eigs = [
            Eig::Real(2.0),
            Eig::Pair(-1.0, 1.5),
            Eig::Real(-3.0),
            Eig::Pair(0.5, 0.25),
            Eig::Real(0.75),
            Eig::Pair(3.0, 2.0),
        ];
        random_schur(&eigs, &mut rng)
    }

    #[test]
    fn test_diagonal_form_gives_unit_vectors() {
        let s = array![[2.0, 0.0], [0.0, -1.0]];
        let out = eigenvectors(s.view(), None, &[true, true], &EigenvectorConfig::default())
            .unwrap();
        assert!(out.is_complete());
        assert_eq!(out.vectors, array![[1.0, 0.0], [0.0, 1.0]]);
    }

    #[test]
    fn test_rotation_block_gives_balanced_pair() {
        let s = array![[0.0, 1.0], [-1.0, 0.0]];
        let out = eigenvectors(s.view(), None, &[true, true], &EigenvectorConfig::default())
            .unwrap();
        let (re, im) = (out.vectors.column(0), out.vectors.column(1));
        assert!(re.dot(&im).abs() < 1e-15, "real and imaginary parts are orthogonal");
        assert!((norm(re) - norm(im)).abs() < 1e-15);
        assert!((norm(re) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_random_form_residuals_max_abs() {
        for seed in 0..5 {
            let s = mixed_form(seed);
            let n = s.nrows();
            let eig = eigenvalues(s.view(), &classify_blocks(s.view()).unwrap());
            let out = eigenvectors(s.view(), None, &vec![true; n], &serial(Normalization::MaxAbs))
                .unwrap();
            assert!(out.is_complete());
            assert_eq!(out.vectors.ncols(), n);

            let r = residual(s.view(), out.vectors.view(), &eig.real, &eig.imag);
            assert!(r < 1e-12, "seed {}: relative residual {:e}", seed, r);

            // largest |re| + |im| component of every eigenvalue is one
            let (x0, x1, x2) = (out.vectors.column(0), out.vectors.column(1), out.vectors.column(2));
            assert!((x0.iter().fold(0.0f64, |m, v| m.max(v.abs())) - 1.0).abs() < 1e-14);
            let pair_max = x1
                .iter()
                .zip(x2.iter())
                .fold(0.0f64, |m, (a, b)| m.max(a.abs() + b.abs()));
            assert!((pair_max - 1.0).abs() < 1e-14);
        }
    }

    #[test]
    fn test_random_form_residuals_euclidean() {
        let s = mixed_form(42);
        let n = s.nrows();
        let eig = eigenvalues(s.view(), &classify_blocks(s.view()).unwrap());
        let out = eigenvectors(s.view(), None, &vec![true; n], &serial(Normalization::Euclidean))
            .unwrap();
        let r = residual(s.view(), out.vectors.view(), &eig.real, &eig.imag);
        assert!(r < 1e-12, "relative residual {:e}", r);

        let v = &out.vectors;
        assert!((norm(v.column(0)) - 1.0).abs() < 1e-14);
        let pair = norm(v.column(1)).powi(2) + norm(v.column(2)).powi(2);
        assert!((pair - 1.0).abs() < 1e-14);
    }

    #[test]
    fn test_back_transform_gives_vectors_of_original_matrix() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let s = mixed_form(3);
        let n = s.nrows();
        let q = random_orthogonal(n, &mut rng);
        let a = q.dot(&s).dot(&q.t());
        let eig = eigenvalues(s.view(), &classify_blocks(s.view()).unwrap());

        let out = eigenvectors(
            s.view(),
            Some(q.view()),
            &vec![true; n],
            &EigenvectorConfig::default(),
        )
        .unwrap();
        let r = residual(a.view(), out.vectors.view(), &eig.real, &eig.imag);
        assert!(r < 1e-11, "relative residual {:e}", r);
    }

    #[test]
    fn test_subset_selection_packs_columns_in_order() {
        let s = mixed_form(5);
        // pair at rows 1..3 and the real eigenvalue at row 3
        let selected = [false, true, true, true, false, false, false, false, false];
        let out = eigenvectors(s.view(), None, &selected, &EigenvectorConfig::default())
            .unwrap();
        assert_eq!(out.vectors.ncols(), 3);

        let full = eigenvectors(s.view(), None, &[true; 9], &EigenvectorConfig::default())
            .unwrap();
        for c in 0..3 {
            let diff = &out.vectors.column(c) - &full.vectors.column(c + 1);
            assert!(diff.iter().all(|d| d.abs() < 1e-15), "column {} differs", c);
        }
        // nothing below the last row of the selected block
        for i in 4..9 {
            assert_eq!(out.vectors[[i, 2]], 0.0);
        }
    }

    #[test]
    fn test_parallel_matches_serial() {
        let s = mixed_form(17);
        let n = s.nrows();
        let par = eigenvectors(
            s.view(),
            None,
            &vec![true; n],
            &EigenvectorConfig {
                normalization: Normalization::MaxAbs,
                parallel: true,
            },
        )
        .unwrap();
        let seq = eigenvectors(s.view(), None, &vec![true; n], &serial(Normalization::MaxAbs))
            .unwrap();
        assert_eq!(par, seq);
    }

    #[test]
    fn test_half_selected_pair_is_rejected() {
        let s = array![[1.0, 2.0, 0.5], [0.0, 0.0, 1.0], [0.0, -1.0, 0.0]];
        let err = eigenvectors(s.view(), None, &[true, true, false], &EigenvectorConfig::default())
            .unwrap_err();
        assert!(
            matches!(err, SchurError::InvalidArgument { position: 2, .. }),
            "{:?}",
            err
        );
    }

    #[test]
    fn test_empty_selection_gives_no_columns() {
        let s = mixed_form(1);
        let out = eigenvectors(s.view(), None, &[false; 9], &EigenvectorConfig::default())
            .unwrap();
        assert_eq!(out.vectors.dim(), (9, 0));
        assert!(out.is_complete());
    }

    #[test]
    fn test_wrong_sized_q_is_rejected() {
        let s = array![[1.0, 0.0], [0.0, 2.0]];
        let q = Array2::<f64>::eye(3);
        let err = eigenvectors(s.view(), Some(q.view()), &[true, true], &EigenvectorConfig::default())
            .unwrap_err();
        assert!(matches!(err, SchurError::InvalidArgument { position: 5, .. }));
    }

    #[test]
    fn test_underflowing_eigenvector_is_reported() {
        let s = array![[1.0, 1e300, 0.0], [0.0, 1.0, 1e300], [0.0, 0.0, 1.0]];
        let out = eigenvectors(
            s.view(),
            None,
            &[false, false, true],
            &serial(Normalization::MaxAbs),
        )
        .unwrap();
        assert!(!out.is_complete());
        assert_eq!(out.failed, vec![2]);
        assert_eq!(out.vectors.dim(), (3, 1));
        assert!(
            out.vectors.iter().all(|v| *v == 0.0),
            "a failed column is left at zero"
        );
    }
}

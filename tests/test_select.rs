// tests/test_select.rs

#[cfg(test)]
mod tests {
    use ndarray::{array, Array2};
    use schurvec::select::validate_selection;
    use schurvec::{
        classify_blocks, select_eigenvalues, select_generalized, sep, EigenvalueSelector,
        SchurError, Status,
    };
    use std::cell::RefCell;

    // eigenvalues 3, 1 +- 2i, -4
    fn four_by_four() -> Array2<f64> {
        array![
            [3.0, 1.0, 0.5, 2.0],
            [0.0, 1.0, 2.0, -1.0],
            [0.0, -2.0, 1.0, 0.25],
            [0.0, 0.0, 0.0, -4.0],
        ]
    }

    #[test]
    fn test_positive_real_part() {
        let s = four_by_four();
        let sel = select_eigenvalues(s.view(), |re, _| re > 0.0).unwrap();
        assert_eq!(sel.selected, vec![true, true, true, false]);
        assert_eq!(sel.count, 3);
    }

    #[test]
    fn test_predicate_sees_each_eigenvalue_once() {
        let s = four_by_four();
        let calls = RefCell::new(Vec::new());
        select_eigenvalues(s.view(), |re, im| {
            calls.borrow_mut().push((re, im));
            false
        })
        .unwrap();
        let calls = calls.into_inner();
        assert_eq!(calls.len(), 3, "one call per real eigenvalue and per pair");
        assert_eq!(calls[0], (3.0, 0.0));
        assert!((calls[1].0 - 1.0).abs() < 1e-15 && (calls[1].1 - 2.0).abs() < 1e-15);
        assert_eq!(calls[2], (-4.0, 0.0));
    }

    #[test]
    fn test_builtin_selectors() {
        let s = four_by_four();
        let pick = |sel: EigenvalueSelector| {
            select_eigenvalues(s.view(), |re, im| sel.accepts(re, im))
                .unwrap()
                .selected
        };
        assert_eq!(pick(EigenvalueSelector::All), vec![true; 4]);
        assert_eq!(pick(EigenvalueSelector::LeftHalfPlane), vec![false, false, false, true]);
        assert_eq!(pick(EigenvalueSelector::InsideUnitCircle), vec![false; 4]);
        assert_eq!(pick(EigenvalueSelector::Real), vec![true, false, false, true]);
        assert_eq!(pick(EigenvalueSelector::Complex), vec![false, true, true, false]);
    }

    #[test]
    fn test_selection_result_passes_validation() {
        let s = four_by_four();
        let blocks = classify_blocks(s.view()).unwrap();
        for sel in [
            EigenvalueSelector::All,
            EigenvalueSelector::LeftHalfPlane,
            EigenvalueSelector::Complex,
        ] {
            let out = select_eigenvalues(s.view(), |re, im| sel.accepts(re, im)).unwrap();
            assert_eq!(validate_selection(&blocks, &out.selected, 2), Ok(out.count));
        }
    }

    #[test]
    fn test_generalized_selection_with_infinite_eigenvalue() {
        // eigenvalues 1/2, 2 +- 3i and an infinite one
        let s = array![
            [1.0, 0.3, 0.1, 0.0],
            [0.0, 2.0, 3.0, 1.0],
            [0.0, -3.0, 2.0, 1.0],
            [0.0, 0.0, 0.0, 5.0],
        ];
        let t = array![
            [2.0, 1.0, 1.0, 1.0],
            [0.0, 1.0, 0.0, 1.0],
            [0.0, 0.0, 1.0, 1.0],
            [0.0, 0.0, 0.0, 0.0],
        ];
        let calls = RefCell::new(Vec::new());
        let sel = select_generalized(s.view(), t.view(), |re, im, beta| {
            calls.borrow_mut().push((re, im, beta));
            EigenvalueSelector::InsideUnitCircle.accepts_generalized(re, im, beta)
        })
        .unwrap();
        assert_eq!(sel.selected, vec![true, false, false, false]);
        assert_eq!(sel.count, 1);

        let calls = calls.into_inner();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], (1.0, 0.0, 2.0));
        assert!((calls[1].0 - 2.0).abs() < 1e-15 && (calls[1].1 - 3.0).abs() < 1e-15);
        assert_eq!(calls[2], (5.0, 0.0, 0.0));

        let unstable = select_generalized(s.view(), t.view(), |re, im, beta| {
            !EigenvalueSelector::LeftHalfPlane.accepts_generalized(re, im, beta)
        })
        .unwrap();
        assert_eq!(unstable.selected, vec![true; 4]);
    }

    #[test]
    fn test_inconsistent_form_is_reported() {
        let s = array![[1.0, 1.0], [1.0, 1.0]];
        assert!(matches!(
            select_eigenvalues(s.view(), |_, _| true),
            Err(SchurError::InconsistentInput { row: 0, .. })
        ));
    }

    #[test]
    fn test_slice_select_with_padded_storage() {
        // 4x4 matrix stored column-major with ld = 6; padding rows hold NaN
        let s = four_by_four();
        let ld = 6;
        let mut data = vec![f64::NAN; ld * 4];
        for j in 0..4 {
            for i in 0..4 {
                data[j * ld + i] = s[[i, j]];
            }
        }
        let mut selected = vec![false; 4];
        let mut num = 0;
        let status = sep::select(4, &data, ld, |re, _| re < 2.0, &mut selected, &mut num);
        assert_eq!(status, Status::Success);
        assert_eq!(selected, vec![false, true, true, true]);
        assert_eq!(num, 3);
    }

    #[test]
    fn test_slice_select_argument_codes() {
        let s = four_by_four();
        let data: Vec<f64> = s.t().iter().copied().collect();
        let mut selected = vec![false; 4];
        let mut num = 0;

        let status = sep::select(4, &data, 3, |_, _| true, &mut selected, &mut num);
        assert_eq!(status.code(), -3);

        let status = sep::select(4, &data[..10], 4, |_, _| true, &mut selected, &mut num);
        assert_eq!(status.code(), -2);

        let mut short = vec![false; 2];
        let status = sep::select(4, &data, 4, |_, _| true, &mut short, &mut num);
        assert_eq!(status.code(), -5);

        let bad = vec![1.0, 1.0, 1.0, 1.0];
        let status = sep::select(2, &bad, 2, |_, _| true, &mut selected, &mut num);
        assert_eq!(status, Status::InvalidArgument(2), "inconsistent S is charged to S");
    }
}

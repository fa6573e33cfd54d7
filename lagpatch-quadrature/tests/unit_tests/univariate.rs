use lagpatch_quadrature::univariate::gauss;
use lagpatch_quadrature::Error;
use matrixcompare::assert_scalar_eq;
use proptest::prelude::*;

#[test]
fn zero_points_is_an_error() {
    assert_eq!(gauss(0), Err(Error::NoRuleAvailable { num_points: 0 }));
}

#[test]
fn two_point_rule_matches_closed_form() {
    let rule = gauss(2).unwrap();
    let x = 1.0 / 3.0f64.sqrt();
    assert_scalar_eq!(rule.points()[0], -x, comp = abs, tol = 1e-15);
    assert_scalar_eq!(rule.points()[1], x, comp = abs, tol = 1e-15);
    assert_scalar_eq!(rule.weights()[0], 1.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(rule.weights()[1], 1.0, comp = abs, tol = 1e-14);
}

#[test]
fn odd_rules_contain_the_origin() {
    for n in [1, 3, 5, 7] {
        let rule = gauss(n).unwrap();
        assert_eq!(rule.len(), n);
        assert_scalar_eq!(rule.points()[n / 2], 0.0, comp = abs, tol = 1e-15);
    }
}

proptest! {
    #[test]
    fn gauss_integrates_monomials_exactly(n in 1..=12usize) {
        let rule = gauss(n).unwrap();
        prop_assert!(rule.points().windows(2).all(|w| w[0] < w[1]));
        for degree in 0..(2 * n) {
            let integral: f64 = rule.iter().map(|(x, w)| w * x.powi(degree as i32)).sum();
            let expected = if degree % 2 == 0 { 2.0 / (degree as f64 + 1.0) } else { 0.0 };
            prop_assert!((integral - expected).abs() < 1e-12,
                "n = {}, degree = {}: {} vs {}", n, degree, integral, expected);
        }
    }
}

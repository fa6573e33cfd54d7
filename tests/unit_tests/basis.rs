use lagpatch::basis::{lagrange_1d, LagrangeBasis};
use lagpatch::PatchError;
use matrixcompare::assert_scalar_eq;
use proptest::prelude::*;

#[test]
fn basis_is_kronecker_delta_at_nodes() {
    let mut basis = LagrangeBasis::new(3, 4);
    for b in 0..4 {
        for a in 0..3 {
            let (xi, eta) = basis.node_coordinates(a, b);
            let values = basis.evaluate(xi, eta).unwrap();
            for (loc, &n) in values.values.iter().enumerate() {
                let expected = if loc == b * 3 + a { 1.0 } else { 0.0 };
                assert_scalar_eq!(n, expected, comp = abs, tol = 1e-12);
            }
        }
    }
}

#[test]
fn quadratic_derivatives() {
    // N_0 = xi (xi - 1) / 2, N_1 = 1 - xi^2, N_2 = xi (xi + 1) / 2
    let mut n = [0.0; 3];
    let mut dn = [0.0; 3];
    lagrange_1d(3, 0.3, &mut n, &mut dn).unwrap();
    assert_scalar_eq!(n[0], 0.5 * 0.3 * (0.3 - 1.0), comp = abs, tol = 1e-14);
    assert_scalar_eq!(n[1], 1.0 - 0.09, comp = abs, tol = 1e-14);
    assert_scalar_eq!(dn[0], 0.3 - 0.5, comp = abs, tol = 1e-14);
    assert_scalar_eq!(dn[1], -0.6, comp = abs, tol = 1e-14);
    assert_scalar_eq!(dn[2], 0.3 + 0.5, comp = abs, tol = 1e-14);
}

#[test]
fn zero_order_is_an_error() {
    assert_eq!(
        lagrange_1d(0, 0.0, &mut [], &mut []),
        Err(PatchError::BasisEvaluation { order: 0 })
    );
}

proptest! {
    #[test]
    fn partition_of_unity(p1 in 1..7usize, p2 in 1..7usize, xi in -1.0..=1.0f64, eta in -1.0..=1.0f64) {
        let mut basis = LagrangeBasis::new(p1, p2);
        let values = basis.evaluate(xi, eta).unwrap();
        prop_assert_eq!(values.values.len(), p1 * p2);
        prop_assert!((values.values.sum() - 1.0).abs() < 1e-10);
        prop_assert!(values.derivatives.column(0).sum().abs() < 1e-9);
        prop_assert!(values.derivatives.column(1).sum().abs() < 1e-9);
    }
}

//! Jacobians of the map from the reference square to physical space.
//!
//! Element coordinates are stored column-wise in an `nsd x nen` matrix `X`, and the
//! parametric basis derivatives in an `nen x 2` matrix `dNdu`, so that the Jacobian is
//! `J = X dNdu` with columns `a1 = dx/dxi` and `a2 = dx/deta`.
use nalgebra::{DMatrix, Matrix2, Vector3};

fn column_as_vector3(jacobian: &DMatrix<f64>, col: usize) -> Vector3<f64> {
    let mut v = Vector3::zeros();
    for i in 0..jacobian.nrows().min(3) {
        v[i] = jacobian[(i, col)];
    }
    v
}

/// Computes `J = X dNdu` and the physical basis derivatives `dNdX = dNdu J^+`.
///
/// Returns the Jacobian determinant, which for surfaces embedded in 3D is the area stretch
/// `|a1 x a2|`. Zero is returned for a singular mapping, in which case `dndx` is zeroed.
pub fn jacobian(
    x: &DMatrix<f64>,
    dndu: &DMatrix<f64>,
    jac: &mut DMatrix<f64>,
    dndx: &mut DMatrix<f64>,
) -> f64 {
    let nsd = x.nrows();
    *jac = x * dndu;
    dndx.resize_mut(dndu.nrows(), nsd, 0.0);
    dndx.fill(0.0);

    match nsd {
        2 => {
            let j = Matrix2::new(jac[(0, 0)], jac[(0, 1)], jac[(1, 0)], jac[(1, 1)]);
            let det = j.determinant();
            if det == 0.0 {
                return 0.0;
            }
            let Some(j_inv) = j.try_inverse() else {
                return 0.0;
            };
            for n in 0..dndu.nrows() {
                for i in 0..2 {
                    dndx[(n, i)] = dndu[(n, 0)] * j_inv[(0, i)] + dndu[(n, 1)] * j_inv[(1, i)];
                }
            }
            det
        }
        _ => {
            let a1 = column_as_vector3(jac, 0);
            let a2 = column_as_vector3(jac, 1);
            let det = a1.cross(&a2).norm();
            if det == 0.0 {
                return 0.0;
            }
            // Left pseudo-inverse (J^T J)^{-1} J^T of the tall Jacobian
            let metric = Matrix2::new(a1.dot(&a1), a1.dot(&a2), a2.dot(&a1), a2.dot(&a2));
            let Some(metric_inv) = metric.try_inverse() else {
                return 0.0;
            };
            let pseudo_inverse = DMatrix::from_fn(2, nsd, |r, c| {
                metric_inv[(r, 0)] * jac[(c, 0)] + metric_inv[(r, 1)] * jac[(c, 1)]
            });
            *dndx = dndu * pseudo_inverse;
            det
        }
    }
}

/// Edge variant of [`jacobian`].
///
/// `normal_axis` is the 0-based parametric direction normal to the edge. Returns the edge
/// length stretch `|a_t|` of the tangent direction and writes the unit normal pointing
/// towards increasing values of the normal parameter into `normal`. The caller flips the
/// normal on edges at the start of their parameter range. Zero is returned, and `normal` left
/// untouched, when the mapping is singular.
pub fn edge_jacobian(
    x: &DMatrix<f64>,
    dndu: &DMatrix<f64>,
    normal_axis: usize,
    jac: &mut DMatrix<f64>,
    dndx: &mut DMatrix<f64>,
    normal: &mut Vector3<f64>,
) -> f64 {
    if jacobian(x, dndu, jac, dndx) == 0.0 {
        return 0.0;
    }

    let a1 = column_as_vector3(jac, 0);
    let a2 = column_as_vector3(jac, 1);
    let m = a1.cross(&a2);
    let (n, tangent) = if normal_axis == 0 {
        (a2.cross(&m), a2)
    } else {
        (m.cross(&a1), a1)
    };

    let length = n.norm();
    if length == 0.0 {
        return 0.0;
    }
    *normal = n / length;
    tangent.norm()
}

//! Tensor-product Lagrange basis functions on the reference square `[-1, 1]^2`.
use crate::error::PatchError;
use nalgebra::{DMatrix, DVector};

/// Equidistant interpolation nodes of a 1D Lagrange basis with `order` nodes on `[-1, 1]`.
fn reference_node(order: usize, i: usize) -> f64 {
    if order < 2 {
        0.0
    } else {
        -1.0 + 2.0 * i as f64 / (order - 1) as f64
    }
}

/// Evaluates the `order` one-dimensional Lagrange polynomials and their first derivatives at `xi`.
///
/// The polynomials interpolate the equidistant nodes `-1 + 2i/(order - 1)`, so `order` is the
/// polynomial degree plus one. Order 1 yields the constant function.
pub fn lagrange_1d(order: usize, xi: f64, values: &mut [f64], derivatives: &mut [f64]) -> Result<(), PatchError> {
    if order == 0 || values.len() != order || derivatives.len() != order {
        return Err(PatchError::BasisEvaluation { order });
    }

    for i in 0..order {
        let xi_i = reference_node(order, i);
        let mut value = 1.0;
        let mut derivative = 0.0;
        for m in (0..order).filter(|&m| m != i) {
            let xi_m = reference_node(order, m);
            let denom = xi_i - xi_m;
            // Product rule, accumulated one factor at a time
            derivative = derivative * (xi - xi_m) / denom + value / denom;
            value *= (xi - xi_m) / denom;
        }
        values[i] = value;
        derivatives[i] = derivative;
    }
    Ok(())
}

/// Basis function values and parametric derivatives at a single reference point.
#[derive(Debug, Clone, PartialEq)]
pub struct BasisValues {
    /// `N`, one entry per element node in tensor order (direction 1 fastest).
    pub values: DVector<f64>,
    /// `dN/du`, `nen x 2`.
    pub derivatives: DMatrix<f64>,
}

impl BasisValues {
    pub fn zeros(num_nodes: usize) -> Self {
        Self {
            values: DVector::zeros(num_nodes),
            derivatives: DMatrix::zeros(num_nodes, 2),
        }
    }
}

/// Tensor-product Lagrange basis of order `(p1, p2)`.
#[derive(Debug, Clone)]
pub struct LagrangeBasis {
    p1: usize,
    p2: usize,
    // 1D scratch buffers, reused across evaluations
    n1: Vec<f64>,
    dn1: Vec<f64>,
    n2: Vec<f64>,
    dn2: Vec<f64>,
}

impl LagrangeBasis {
    pub fn new(p1: usize, p2: usize) -> Self {
        Self {
            p1,
            p2,
            n1: vec![0.0; p1],
            dn1: vec![0.0; p1],
            n2: vec![0.0; p2],
            dn2: vec![0.0; p2],
        }
    }

    pub fn order(&self) -> (usize, usize) {
        (self.p1, self.p2)
    }

    pub fn num_nodes(&self) -> usize {
        self.p1 * self.p2
    }

    /// Reference coordinates of local node `(a, b)`.
    pub fn node_coordinates(&self, a: usize, b: usize) -> (f64, f64) {
        (reference_node(self.p1, a), reference_node(self.p2, b))
    }

    /// Evaluates all basis functions and their derivatives at `(xi, eta)` into `out`.
    ///
    /// `out` is resized to match the basis if necessary.
    pub fn evaluate_into(&mut self, xi: f64, eta: f64, out: &mut BasisValues) -> Result<(), PatchError> {
        lagrange_1d(self.p1, xi, &mut self.n1, &mut self.dn1)?;
        lagrange_1d(self.p2, eta, &mut self.n2, &mut self.dn2)?;

        let nen = self.num_nodes();
        if out.values.len() != nen {
            *out = BasisValues::zeros(nen);
        }

        for b in 0..self.p2 {
            for a in 0..self.p1 {
                let loc = b * self.p1 + a;
                out.values[loc] = self.n1[a] * self.n2[b];
                out.derivatives[(loc, 0)] = self.dn1[a] * self.n2[b];
                out.derivatives[(loc, 1)] = self.n1[a] * self.dn2[b];
            }
        }
        Ok(())
    }

    pub fn evaluate(&mut self, xi: f64, eta: f64) -> Result<BasisValues, PatchError> {
        let mut out = BasisValues::zeros(self.num_nodes());
        self.evaluate_into(xi, eta, &mut out)?;
        Ok(out)
    }
}

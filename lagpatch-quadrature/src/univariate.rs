//! Quadrature rules for the one-dimensional domain `[-1, 1]`.

use crate::{Error, GaussRule};
use std::f64::consts::PI;

const MAX_NEWTON_ITERATIONS: usize = 100;

/// Recurrence relation for Legendre polynomials.
///
/// Note: the derivative formula is *not* defined at |x| == 1, so it is only
/// suitable for evaluation in the open interval (-1, 1).
#[derive(Debug, Default)]
struct LegendreRecurrence {
    n: usize,
    x: f64,
    // p_n(x)
    p1: f64,
    // p_{n - 1}(x)
    p2: f64,
}

impl LegendreRecurrence {
    fn evaluate(n: usize, x: f64) -> Self {
        //  m P_m(x) = (2m - 1) * x P_{m - 1}(x) - (m - 1) P_{m - 2}(x)
        let mut p1 = 1.0;
        let mut p2 = 0.0;
        for m in 1..=n {
            let m = m as f64;
            let p3 = p2;
            p2 = p1;
            p1 = ((2.0 * m - 1.0) * x * p2 - (m - 1.0) * p3) / m;
        }
        Self { n, x, p1, p2 }
    }

    fn value(&self) -> f64 {
        self.p1
    }

    fn derivative(&self) -> f64 {
        let n = self.n as f64;
        // dp_n/dx (x) = n * (x * p_n(x) - p_{n - 1}(x)) / (x^2 - 1)
        n * (self.x * self.p1 - self.p2) / (self.x * self.x - 1.0)
    }
}

/// Gauss-Legendre quadrature for the reference interval [-1, 1].
///
/// Returns the rule with the given number of points, with abscissae in ascending order.
/// Given `n` points, the rule integrates polynomials of degree up to `2 n - 1` exactly.
/// Requesting zero points is an error.
pub fn gauss(num_points: usize) -> Result<GaussRule, Error> {
    let n = num_points;
    if n == 0 {
        return Err(Error::NoRuleAvailable { num_points });
    }

    // Roots are symmetric about the origin, so only the first half is computed
    let m = (n + 1) / 2;
    let mut roots = Vec::with_capacity(n);

    for i in 0..m {
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut recurrence = LegendreRecurrence::evaluate(n, x);
        for _ in 0..MAX_NEWTON_ITERATIONS {
            let dx = -recurrence.value() / recurrence.derivative();
            x += dx;
            recurrence = LegendreRecurrence::evaluate(n, x);
            if dx.abs() <= 1e-15 {
                break;
            }
        }
        let dp = recurrence.derivative();
        let w = 2.0 / ((1.0 - x * x) * dp * dp);
        roots.push((x, w));
    }

    // Mirror the remaining roots, taking care not to duplicate the middle root for odd n
    for i in m..n {
        let (x, w) = roots[n - i - 1];
        roots.push((-x, w));
    }
    roots.sort_by(|a, b| a.0.total_cmp(&b.0));

    let (points, weights) = roots.into_iter().unzip();
    Ok(GaussRule::from_points_and_weights(points, weights))
}

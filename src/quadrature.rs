//! Gauss point tables consumed by the integrators.
use lagpatch_quadrature::univariate::gauss;
pub use lagpatch_quadrature::GaussRule;
use std::fmt::Debug;

/// Provides one-dimensional Gauss rules on `[-1, 1]` by number of points.
pub trait QuadratureTable: Debug + Send + Sync {
    /// The rule with `num_points` points, or `None` if the table has no such rule.
    fn rule(&self, num_points: usize) -> Option<&GaussRule>;
}

/// Precomputed Gauss-Legendre rules with `1..=max_points` points.
#[derive(Debug, Clone)]
pub struct GaussLegendreTable {
    rules: Vec<GaussRule>,
}

impl GaussLegendreTable {
    pub const DEFAULT_MAX_POINTS: usize = 10;

    pub fn with_max_points(max_points: usize) -> Self {
        let rules = (1..=max_points)
            .map_while(|n| gauss(n).ok())
            .collect();
        Self { rules }
    }

    pub fn max_points(&self) -> usize {
        self.rules.len()
    }
}

impl Default for GaussLegendreTable {
    fn default() -> Self {
        Self::with_max_points(Self::DEFAULT_MAX_POINTS)
    }
}

impl QuadratureTable for GaussLegendreTable {
    fn rule(&self, num_points: usize) -> Option<&GaussRule> {
        num_points.checked_sub(1).and_then(|i| self.rules.get(i))
    }
}

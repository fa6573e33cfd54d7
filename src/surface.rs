//! Parametric surfaces that patches are generated from.
use nalgebra::Point3;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A two-parameter surface `(u, v) -> x` in 2D or 3D.
///
/// The surface carries a sequence of distinct breakpoints (knots) per parametric direction.
/// Patches place `p - 1` element node intervals in every non-empty knot span.
pub trait ParametricSurface: Debug + Send + Sync {
    /// Order (degree + 1) of the surface in the given 0-based parametric direction.
    fn order(&self, direction: usize) -> usize;

    /// Start and end parameter of the given direction.
    fn parameter_range(&self, direction: usize) -> (f64, f64);

    /// Monotone parameter values with `segments_per_span - 1` uniformly spaced values inserted
    /// into every non-empty knot span of the given direction.
    fn grid_parameters(&self, direction: usize, segments_per_span: usize) -> Vec<f64>;

    /// Physical points on the tensor grid `u x v`, with `u` running fastest.
    fn evaluate_grid(&self, u: &[f64], v: &[f64]) -> Vec<Point3<f64>>;

    /// Number of spatial dimensions (2 or 3). Points of 2D surfaces have a zero `z`.
    fn dimension(&self) -> usize;
}

/// Subdivides every non-empty span of the sorted `breakpoints` into `segments_per_span` pieces.
pub fn subdivide_spans(breakpoints: &[f64], segments_per_span: usize) -> Vec<f64> {
    let segments = segments_per_span.max(1);
    let mut params = Vec::new();
    for &t in breakpoints {
        match params.last().copied() {
            Some(prev) if t <= prev => continue,
            Some(prev) => {
                for k in 1..segments {
                    let s = k as f64 / segments as f64;
                    params.push(prev * (1.0 - s) + t * s);
                }
            }
            None => {}
        }
        params.push(t);
    }
    params
}

type PointFn = dyn Fn(f64, f64) -> Point3<f64> + Send + Sync;

/// A surface defined by a closure over the parameter domain and explicit breakpoints.
#[derive(Clone)]
pub struct FnSurface {
    breakpoints: [Vec<f64>; 2],
    order: [usize; 2],
    dimension: usize,
    map: Arc<PointFn>,
}

impl Debug for FnSurface {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSurface")
            .field("breakpoints", &self.breakpoints)
            .field("order", &self.order)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl FnSurface {
    pub fn new<F>(u_breakpoints: Vec<f64>, v_breakpoints: Vec<f64>, order: [usize; 2], dimension: usize, map: F) -> Self
    where
        F: 'static + Fn(f64, f64) -> Point3<f64> + Send + Sync,
    {
        Self {
            breakpoints: [u_breakpoints, v_breakpoints],
            order,
            dimension,
            map: Arc::new(map),
        }
    }

    /// The planar rectangle `[x0, x1] x [y0, y1]` with `n1 x n2` uniform spans, parametrized
    /// over the rectangle itself.
    pub fn rectangle(corners: ([f64; 2], [f64; 2]), spans: [usize; 2], order: [usize; 2]) -> Self {
        let ([x0, y0], [x1, y1]) = corners;
        let uniform = |a: f64, b: f64, n: usize| -> Vec<f64> {
            let n = n.max(1);
            (0..=n).map(|i| a + (b - a) * i as f64 / n as f64).collect()
        };
        Self::new(uniform(x0, x1, spans[0]), uniform(y0, y1, spans[1]), order, 2, |u, v| {
            Point3::new(u, v, 0.0)
        })
    }

    pub fn breakpoints(&self, direction: usize) -> &[f64] {
        &self.breakpoints[direction.min(1)]
    }
}

impl ParametricSurface for FnSurface {
    fn order(&self, direction: usize) -> usize {
        self.order[direction.min(1)]
    }

    fn parameter_range(&self, direction: usize) -> (f64, f64) {
        let knots = self.breakpoints(direction);
        match (knots.first(), knots.last()) {
            (Some(&a), Some(&b)) => (a, b),
            _ => (0.0, 0.0),
        }
    }

    fn grid_parameters(&self, direction: usize, segments_per_span: usize) -> Vec<f64> {
        subdivide_spans(self.breakpoints(direction), segments_per_span)
    }

    fn evaluate_grid(&self, u: &[f64], v: &[f64]) -> Vec<Point3<f64>> {
        v.iter()
            .flat_map(|&v| u.iter().map(move |&u| (self.map)(u, v)))
            .collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

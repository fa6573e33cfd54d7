//! Gauss-Legendre quadrature rules on the reference interval `[-1, 1]`.
//!
//! Rules on the reference quadrilateral are tensor products of these, formed by the element
//! loops themselves. The crate has no dependencies so that it can be used independently of
//! `lagpatch`.

use std::fmt;
use std::fmt::{Display, Formatter};

pub mod univariate;

/// Library-wide error type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Indicates that a rule satisfying the given requirements is not available.
    NoRuleAvailable { num_points: usize },
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRuleAvailable { num_points } => {
                write!(f, "There is no quadrature rule with {num_points} points available")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A one-dimensional rule with points stored as plain abscissae.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussRule {
    points: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussRule {
    pub fn from_points_and_weights(points: Vec<f64>, weights: Vec<f64>) -> Self {
        assert_eq!(points.len(), weights.len(), "Must have one weight per point.");
        Self { points, weights }
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl '_ + Iterator<Item = (f64, f64)> {
        self.points.iter().copied().zip(self.weights.iter().copied())
    }
}

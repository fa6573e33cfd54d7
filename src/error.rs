//! Error type for patch configuration, indexing and consistency failures.
use crate::grid::Edge;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Errors reported by patch operations.
///
/// Every variant is recoverable: the operation that produced it had no effect beyond what is
/// documented on the operation itself, and the patch remains usable.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PatchError {
    /// The patch has no parametric surface to generate nodes from.
    MissingSurface,
    /// Lagrange elements need at least two nodes (order 2) in each direction.
    InvalidOrder { p1: usize, p2: usize },
    /// Coordinates were already present but disagree with the freshly computed node count.
    NodeCountMismatch { existing: usize, computed: usize },
    /// A 1-based element number outside `[1, num_elements]`.
    ElementIndexOutOfRange { index: usize, num_elements: usize },
    /// A node index referenced by an element lies outside the coordinate array.
    NodeIndexOutOfRange { index: usize, num_nodes: usize },
    /// An element touching the given edge was already extended through another edge.
    DuplicateExtraordinaryEdge { element: usize, edge: Edge },
    /// Extraordinary elements were requested, but no storage for them has been reserved.
    TooFewExtraordinaryElements { reserved: usize, required: usize },
    /// Extra nodes must be added in non-empty batches.
    EmptyExtraNodes,
    /// The quadrature provider has no rule with the requested number of points.
    NoQuadratureRule { num_points: usize },
    /// The solution vector length is not a whole number of components per node.
    InvalidSolutionLength { len: usize, num_nodes: usize },
    /// The displacement vector must have `nsd` entries per node.
    DisplacementLength { len: usize, expected: usize },
    /// Lagrange basis functions of order zero do not exist.
    BasisEvaluation { order: usize },
    /// The grid parameters produced by the surface are unusable (empty or too short).
    InvalidGridParameters { direction: usize },
}

impl Display for PatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSurface => write!(f, "patch has no parametric surface"),
            Self::InvalidOrder { p1, p2 } => {
                write!(f, "invalid Lagrange element order ({p1}, {p2}), must be at least 2 in both directions")
            }
            Self::NodeCountMismatch { existing, computed } => write!(
                f,
                "patch already holds {existing} nodal coordinates, but the topology requires {computed}"
            ),
            Self::ElementIndexOutOfRange { index, num_elements } => {
                write!(f, "element index {index} out of range [1,{num_elements}]")
            }
            Self::NodeIndexOutOfRange { index, num_nodes } => {
                write!(f, "node index {index} out of range [0,{num_nodes})")
            }
            Self::DuplicateExtraordinaryEdge { element, edge } => write!(
                f,
                "element {element} on {edge:?} edge is already extended, only one extraordinary edge is allowed"
            ),
            Self::TooFewExtraordinaryElements { reserved, required } => {
                write!(f, "too few extraordinary elements: {reserved} reserved, {required} required")
            }
            Self::EmptyExtraNodes => write!(f, "number of extra nodes must be positive"),
            Self::NoQuadratureRule { num_points } => {
                write!(f, "no quadrature rule with {num_points} points available")
            }
            Self::InvalidSolutionLength { len, num_nodes } => {
                write!(f, "solution vector of length {len} is incompatible with {num_nodes} nodes")
            }
            Self::DisplacementLength { len, expected } => {
                write!(f, "invalid dimension {len} of displacement vector, should be {expected}")
            }
            Self::BasisEvaluation { order } => write!(f, "cannot evaluate Lagrange basis of order {order}"),
            Self::InvalidGridParameters { direction } => {
                write!(f, "invalid grid parameters in parametric direction {direction}")
            }
        }
    }
}

impl std::error::Error for PatchError {}

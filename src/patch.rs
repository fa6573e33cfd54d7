//! Patches and the capabilities they expose.
//!
//! A patch is split into capability traits rather than a single monolithic interface:
//! [`Topology`] for nodes, elements and coordinates, [`DomainIntegrable`] and
//! [`BoundaryIntegrable`] for assembly, and [`FieldEvaluable`] for post-processing.
//! [`LagrangePatch`] implements all of them for structured Lagrange elements.
use crate::assembly::GlobalIntegral;
use crate::error::PatchError;
use crate::grid::BoundaryItem;
use crate::integrand::{Integrand, SolutionRecovery, TimeDomain};
use nalgebra::{DMatrix, DVector, Point3};
use serde::{Deserialize, Serialize};

mod boundary;
mod domain;
mod extraordinary;
mod lagrange;
mod recovery;
mod tessellate;

pub use lagrange::LagrangePatch;
pub use tessellate::ElementBlock;

/// Monotone counters handing out global node and element ids across patches.
///
/// Ids start at 1. The counters are owned by the caller, which shares one instance between all
/// patches of a model.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalNumbering {
    num_nodes: usize,
    num_elements: usize,
}

impl GlobalNumbering {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_node(&mut self) -> usize {
        self.num_nodes += 1;
        self.num_nodes
    }

    pub fn next_element(&mut self) -> usize {
        self.num_elements += 1;
        self.num_elements
    }

    /// Number of node ids handed out so far.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }
}

/// Identity of an element slot of a patch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementId {
    /// A regular element with its global id.
    Ordinary(usize),
    /// An element extended with extra nodes along a boundary edge.
    Extraordinary(usize),
    /// An element of zero parametric area. It is skipped by every operation.
    ZeroArea,
}

impl ElementId {
    /// The global id, or `None` for zero-area elements.
    pub fn global_id(&self) -> Option<usize> {
        match self {
            Self::Ordinary(id) | Self::Extraordinary(id) => Some(*id),
            Self::ZeroArea => None,
        }
    }

    pub fn is_extraordinary(&self) -> bool {
        matches!(self, Self::Extraordinary(_))
    }
}

/// Result of locating a point of the unit square on a patch.
#[derive(Debug, Clone, PartialEq)]
pub struct PointLocation {
    /// 1-based number of the node closest to the point.
    pub node: usize,
    /// Surface parameters of the point.
    pub parameters: [f64; 2],
    /// Stored coordinates of the closest node.
    pub coordinates: Point3<f64>,
}

/// Nodes, elements and coordinates of a patch.
///
/// Node and element numbers in this interface are 1-based.
pub trait Topology {
    /// Creates nodes, coordinates and connectivity, drawing global ids from `numbering`.
    ///
    /// Calling this on a patch that already has coordinates is a no-op when the node counts
    /// agree, and an error otherwise.
    fn generate_topology(&mut self, numbering: &mut GlobalNumbering) -> Result<(), PatchError>;

    /// Removes all nodes and elements. The surface is kept only if `retain_geometry` is set.
    fn clear(&mut self, retain_geometry: bool);

    /// Number of nodes, including extra nodes without coordinates.
    fn num_nodes(&self) -> usize;

    /// Number of ordinary element slots, including zero-area elements.
    fn num_elements(&self) -> usize;

    fn coordinate(&self, node: usize) -> Option<Point3<f64>>;

    /// Sets the coordinates of a 1-based node, growing the coordinate array if `node` is beyond its end.
    fn set_coordinate(&mut self, node: usize, x: Point3<f64>) -> Result<(), PatchError>;

    /// `nsd x nen` coordinates of the regular nodes of an element.
    fn element_coordinates(&self, element: usize) -> Result<DMatrix<f64>, PatchError>;

    /// `nsd x nnod` coordinates of all nodes with coordinates.
    fn nodal_coordinates(&self) -> DMatrix<f64>;

    /// Adds a nodal displacement vector with `nsd` entries per node to the coordinates.
    fn update_coordinates(&mut self, displacement: &DVector<f64>) -> Result<(), PatchError>;
}

/// Integration over the interior of a patch.
pub trait DomainIntegrable {
    fn integrate<I, G>(&self, integrand: &I, global: &G, time: &TimeDomain) -> eyre::Result<()>
    where
        I: Integrand,
        G: GlobalIntegral<I::Local>;
}

/// Integration along one boundary edge of a patch.
pub trait BoundaryIntegrable {
    fn integrate_boundary<I, G>(
        &self,
        integrand: &mut I,
        boundary: BoundaryItem,
        global: &G,
        time: &TimeDomain,
    ) -> eyre::Result<()>
    where
        I: Integrand,
        G: GlobalIntegral<I::Local>;
}

/// Point location, field evaluation and visualization.
pub trait FieldEvaluable {
    /// Locates the node closest to the point `xi` of the unit square.
    fn evaluate_point(&self, xi: [f64; 2]) -> Result<PointLocation, PatchError>;

    /// Arranges a nodal solution vector as an `ncomp x nnod` matrix.
    fn evaluate_primary(&self, solution: &DVector<f64>) -> Result<DMatrix<f64>, PatchError>;

    /// Evaluates a recovered quantity at every node, averaged over the elements sharing it.
    fn evaluate_secondary<R: SolutionRecovery>(&self, recovery: &R) -> eyre::Result<DMatrix<f64>>;

    /// Builds a visualization grid with one cell per knot-span subdivision.
    ///
    /// `points_per_element` is the requested number of points per element and direction;
    /// implementations may override it.
    fn tessellate(&self, points_per_element: [usize; 2]) -> Result<ElementBlock, PatchError>;
}

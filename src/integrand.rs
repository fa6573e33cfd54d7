//! The contract between patch integrators and weak-form implementations.
//!
//! An [`Integrand`] sees one element at a time through a set of hooks. The integrators own the
//! element loop, the quadrature and the geometry; the integrand owns the physics and its
//! per-element accumulator ([`Integrand::Local`]), which is handed to a
//! [`GlobalIntegral`](crate::assembly::GlobalIntegral) once the element is finished.
use eyre::Result;
use nalgebra::{DMatrix, DVector, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Time level of the current evaluation.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeDomain {
    pub t: f64,
    pub dt: f64,
    /// Nonlinear iteration counter within the current time step.
    pub iteration: usize,
}

impl TimeDomain {
    pub fn at(t: f64) -> Self {
        Self { t, ..Self::default() }
    }
}

/// Reduced (selective) integration requested by an integrand.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReducedIntegration {
    /// Only the full rule is used.
    #[default]
    None,
    /// A reduced loop with the given number of points per direction precedes the full loop.
    Points(usize),
    /// The integrand wants to know the full point count but runs no reduced loop.
    Unspecified,
}

/// Features an integrand requires from the integrators.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrandFlags {
    /// Compute the mean of the element node coordinates before `init_element`.
    pub element_center: bool,
    /// Integrate boundaries over the extraordinary elements where present.
    pub extraordinary_elements: bool,
}

/// Basis values and geometry at the current integration point.
#[derive(Debug, Clone, PartialEq)]
pub struct FiniteElementValues {
    /// Global element id (always positive).
    pub element_id: usize,
    /// Reference coordinates.
    pub xi: f64,
    pub eta: f64,
    /// Surface parameters.
    pub u: f64,
    pub v: f64,
    /// Basis function values `N`.
    pub n: DVector<f64>,
    /// Physical basis derivatives `dN/dX`, `nen x nsd`.
    pub dndx: DMatrix<f64>,
    /// Jacobian determinant times quadrature weight.
    pub det_jxw: f64,
    /// Global integration point counter.
    pub integration_point: usize,
}

impl FiniteElementValues {
    pub fn new(num_nodes: usize, nsd: usize) -> Self {
        Self {
            element_id: 0,
            xi: 0.0,
            eta: 0.0,
            u: 0.0,
            v: 0.0,
            n: DVector::zeros(num_nodes),
            dndx: DMatrix::zeros(num_nodes, nsd),
            det_jxw: 0.0,
            integration_point: 0,
        }
    }
}

/// The nodes of an element as seen by an integrand.
///
/// Extraordinary elements carry trailing extra nodes, and a mask telling which of the nodes
/// may receive contributions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ElementNodes<'a> {
    nodes: &'a [usize],
    contributes: Option<&'a [bool]>,
    num_regular: usize,
}

impl<'a> ElementNodes<'a> {
    pub fn ordinary(nodes: &'a [usize]) -> Self {
        Self {
            nodes,
            contributes: None,
            num_regular: nodes.len(),
        }
    }

    /// Nodes of an extraordinary element, where `contributes` has one entry per node.
    pub fn extraordinary(nodes: &'a [usize], contributes: &'a [bool], num_regular: usize) -> Self {
        debug_assert_eq!(nodes.len(), contributes.len());
        Self {
            nodes,
            contributes: Some(contributes),
            num_regular: num_regular.min(nodes.len()),
        }
    }

    /// All nodes, regular nodes first.
    pub fn nodes(&self) -> &'a [usize] {
        self.nodes
    }

    pub fn regular_nodes(&self) -> &'a [usize] {
        &self.nodes[..self.num_regular]
    }

    pub fn extra_nodes(&self) -> &'a [usize] {
        &self.nodes[self.num_regular..]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_extraordinary(&self) -> bool {
        self.contributes.is_some()
    }

    /// Whether the local node receives residual and tangent contributions.
    pub fn contributes(&self, local_index: usize) -> bool {
        self.contributes
            .and_then(|mask| mask.get(local_index).copied())
            .unwrap_or(true)
    }
}

/// Element-level hooks of a weak form.
///
/// Hooks take `&self` so that elements can be processed concurrently. All hooks except
/// [`local_integral`](Self::local_integral) and [`evaluate`](Self::evaluate) have no-op defaults.
#[allow(unused_variables)]
pub trait Integrand: Sync {
    /// Per-element accumulator.
    type Local: Send;

    fn flags(&self) -> IntegrandFlags {
        IntegrandFlags::default()
    }

    /// Gauss points per direction for domain integration, given the default for the order.
    fn quadrature_points(&self, default: usize) -> usize {
        default
    }

    /// Gauss points along an edge, given the default for the order along the edge.
    fn boundary_quadrature_points(&self, default: usize) -> usize {
        default
    }

    /// Reduced integration request, given the number of full Gauss points per direction.
    fn reduced_integration(&self, num_gauss: usize) -> ReducedIntegration {
        ReducedIntegration::None
    }

    /// Order of the Neumann condition on the boundary about to be integrated.
    fn set_neumann_order(&mut self, order: usize) {}

    /// Creates a fresh accumulator for an element with `num_nodes` basis functions.
    fn local_integral(&self, num_nodes: usize, element_id: usize, boundary: bool) -> Self::Local;

    fn init_element(
        &self,
        nodes: ElementNodes<'_>,
        fe: &FiniteElementValues,
        center: &Point3<f64>,
        num_reduced_points: usize,
        local: &mut Self::Local,
    ) -> Result<()> {
        Ok(())
    }

    fn init_element_boundary(&self, nodes: ElementNodes<'_>, local: &mut Self::Local) -> Result<()> {
        Ok(())
    }

    /// Called at every point of the reduced rule, before the full integration loop.
    fn reduced_integral(
        &self,
        local: &mut Self::Local,
        fe: &FiniteElementValues,
        x: &Point3<f64>,
        time: &TimeDomain,
    ) -> Result<()> {
        Ok(())
    }

    /// Called at every non-singular point of the full rule.
    fn evaluate(
        &self,
        local: &mut Self::Local,
        fe: &FiniteElementValues,
        time: &TimeDomain,
        x: &Point3<f64>,
    ) -> Result<()>;

    /// Called at every non-singular point along a boundary edge, with the outward unit normal.
    fn evaluate_boundary(
        &self,
        local: &mut Self::Local,
        fe: &FiniteElementValues,
        time: &TimeDomain,
        x: &Point3<f64>,
        normal: &Vector3<f64>,
    ) -> Result<()> {
        Ok(())
    }

    /// Called once per element after the full loop, with the element's first integration point.
    fn finalize_element(&self, local: &mut Self::Local, time: &TimeDomain, first_point: usize) -> Result<()> {
        Ok(())
    }

    fn finalize_element_boundary(
        &self,
        local: &mut Self::Local,
        fe: &FiniteElementValues,
        time: &TimeDomain,
    ) -> Result<()> {
        Ok(())
    }
}

/// Evaluation of a derived (secondary) quantity from the primary solution.
pub trait SolutionRecovery: Sync {
    /// Evaluates the recovered quantity at a point of an element.
    fn evaluate_solution(&self, fe: &FiniteElementValues, x: &Point3<f64>, nodes: &[usize]) -> Result<DVector<f64>>;
}

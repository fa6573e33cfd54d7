use crate::error::PatchError;
use crate::grid::{Edge, StructuredGrid};
use crate::options::PatchOptions;
use crate::patch::extraordinary::ExtraordinaryElement;
use crate::patch::{ElementId, GlobalNumbering, Topology};
use crate::quadrature::{GaussLegendreTable, QuadratureTable};
use crate::surface::ParametricSurface;
use crate::threading::ThreadGroups;
use lagpatch_nested_vec::NestedVec;
use log::{debug, error};
use nalgebra::{DMatrix, DVector, Point3};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A structured patch of tensor-product Lagrange elements on a parametric surface.
///
/// The element order in each direction is the order of the surface. Nodes sit on the tensor
/// grid obtained by splitting every knot span of the surface into `p - 1` intervals, so each
/// element covers exactly one knot span. See [`crate::grid`] for the numbering.
#[derive(Debug, Clone)]
pub struct LagrangePatch {
    pub(super) surface: Option<Arc<dyn ParametricSurface>>,
    pub(super) quadrature: Arc<dyn QuadratureTable>,
    pub(super) options: PatchOptions,
    pub(super) nsd: usize,
    pub(super) grid: StructuredGrid,
    // Distinct knot values per direction, i.e. the element bounds
    pub(super) element_parameters: [Vec<f64>; 2],
    pub(super) coordinates: Vec<Point3<f64>>,
    // Global ids of the regular nodes followed by any extra nodes
    pub(super) node_ids: Vec<usize>,
    pub(super) element_ids: Vec<ElementId>,
    pub(super) connectivity: NestedVec<usize>,
    // Empty until extra nodes are added, then one slot per ordinary element
    pub(super) extraordinary: Vec<Option<ExtraordinaryElement>>,
    pub(super) thread_groups: ThreadGroups,
    pub(super) first_integration_point: usize,
    pub(super) first_boundary_point: BTreeMap<Edge, usize>,
}

impl LagrangePatch {
    pub fn new(surface: Arc<dyn ParametricSurface>, options: PatchOptions) -> Self {
        let nsd = surface.dimension().clamp(2, 3);
        let mut patch = Self::without_surface(nsd, options);
        patch.surface = Some(surface);
        patch
    }

    /// A patch whose nodes are set explicitly instead of generated from a surface.
    pub fn without_surface(nsd: usize, options: PatchOptions) -> Self {
        Self {
            surface: None,
            quadrature: Arc::new(GaussLegendreTable::default()),
            options,
            nsd: nsd.clamp(2, 3),
            grid: StructuredGrid::default(),
            element_parameters: [Vec::new(), Vec::new()],
            coordinates: Vec::new(),
            node_ids: Vec::new(),
            element_ids: Vec::new(),
            connectivity: NestedVec::new(),
            extraordinary: Vec::new(),
            thread_groups: ThreadGroups::new(),
            first_integration_point: 0,
            first_boundary_point: BTreeMap::new(),
        }
    }

    pub fn with_quadrature(self, quadrature: Arc<dyn QuadratureTable>) -> Self {
        Self { quadrature, ..self }
    }

    /// A copy of this patch sharing its geometry, with a different number of solution fields.
    pub fn with_num_fields(&self, num_fields: usize) -> Self {
        let mut patch = self.clone();
        patch.options.num_fields = num_fields;
        patch
    }

    pub fn surface(&self) -> Option<&Arc<dyn ParametricSurface>> {
        self.surface.as_ref()
    }

    pub fn options(&self) -> &PatchOptions {
        &self.options
    }

    /// Number of spatial dimensions of the nodal coordinates.
    pub fn nsd(&self) -> usize {
        self.nsd
    }

    /// Element order `(p1, p2)`, i.e. the number of element nodes per direction.
    pub fn order(&self) -> (usize, usize) {
        self.grid.order()
    }

    pub fn grid(&self) -> &StructuredGrid {
        &self.grid
    }

    /// Number of nodes in each parametric direction.
    pub fn grid_size(&self) -> (usize, usize) {
        (self.grid.nodes_x(), self.grid.nodes_y())
    }

    /// Number of elements in each parametric direction.
    pub fn element_grid_size(&self) -> (usize, usize) {
        (self.grid.elements_x(), self.grid.elements_y())
    }

    pub fn num_boundary_elements(&self, edge: Edge) -> usize {
        self.grid.num_boundary_elements(edge)
    }

    pub fn is_empty(&self) -> bool {
        self.element_ids.is_empty()
    }

    /// Identity of the 1-based element.
    pub fn element_id(&self, element: usize) -> Option<ElementId> {
        let index = element.checked_sub(1)?;
        self.element_ids.get(index).copied()
    }

    pub fn element_ids(&self) -> &[ElementId] {
        &self.element_ids
    }

    /// 0-based node indices of the regular nodes of the 1-based element.
    pub fn element_nodes(&self, element: usize) -> Option<&[usize]> {
        self.connectivity.get(element.checked_sub(1)?)
    }

    pub fn connectivity(&self) -> &NestedVec<usize> {
        &self.connectivity
    }

    /// Global ids of all nodes, including extra nodes.
    pub fn global_node_ids(&self) -> &[usize] {
        &self.node_ids
    }

    pub fn coordinates(&self) -> &[Point3<f64>] {
        &self.coordinates
    }

    pub fn thread_groups(&self) -> &ThreadGroups {
        &self.thread_groups
    }

    /// Checkerboard thread groups with the block size from the options.
    pub fn generate_thread_groups(&mut self) {
        let (nelx, nely) = self.element_grid_size();
        self.thread_groups = ThreadGroups::structured(nelx, nely, self.options.thread_group_block_size);
    }

    /// Thread groups from a greedy coloring of the element connectivity.
    pub fn generate_thread_groups_from_connectivity(&mut self) {
        self.thread_groups = ThreadGroups::from_connectivity(&self.connectivity);
    }

    pub fn first_integration_point(&self) -> usize {
        self.first_integration_point
    }

    /// Sets the global counter of the first domain integration point of this patch.
    pub fn set_first_integration_point(&mut self, first: usize) {
        self.first_integration_point = first;
    }

    pub fn first_boundary_point(&self, edge: Edge) -> usize {
        self.first_boundary_point.get(&edge).copied().unwrap_or(0)
    }

    pub fn set_first_boundary_point(&mut self, edge: Edge, first: usize) {
        self.first_boundary_point.insert(edge, first);
    }

    /// Fills `x` with the `nsd x nen` coordinates of the regular nodes of the 0-based element.
    pub(super) fn gather_element_coordinates(
        &self,
        element: usize,
        x: &mut DMatrix<f64>,
    ) -> Result<(), PatchError> {
        let nodes = self.connectivity.get(element).ok_or_else(|| {
            error!("Element index {} out of range [1,{}]", element + 1, self.connectivity.len());
            PatchError::ElementIndexOutOfRange {
                index: element + 1,
                num_elements: self.connectivity.len(),
            }
        })?;
        let nen = nodes.len().min(self.grid.nodes_per_element());

        x.resize_mut(self.nsd, nen, 0.0);
        for (col, &node) in nodes.iter().take(nen).enumerate() {
            let point = self.coordinates.get(node).ok_or_else(|| {
                error!("Element {} refers to node {} without coordinates", element + 1, node + 1);
                PatchError::NodeIndexOutOfRange {
                    index: node,
                    num_nodes: self.coordinates.len(),
                }
            })?;
            for i in 0..self.nsd {
                x[(i, col)] = point[i];
            }
        }
        Ok(())
    }
}

fn is_zero_span(params: &[f64], i: usize) -> bool {
    match (params.get(i), params.get(i + 1)) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

impl Topology for LagrangePatch {
    fn generate_topology(&mut self, numbering: &mut GlobalNumbering) -> Result<(), PatchError> {
        let Some(surface) = self.surface.clone() else {
            error!("Cannot generate topology of a patch without a surface");
            return Err(PatchError::MissingSurface);
        };

        let (p1, p2) = (surface.order(0), surface.order(1));
        if p1 < 2 || p2 < 2 {
            error!("Invalid Lagrange element order ({p1}, {p2})");
            return Err(PatchError::InvalidOrder { p1, p2 });
        }

        let u = surface.grid_parameters(0, p1 - 1);
        let v = surface.grid_parameters(1, p2 - 1);
        for (direction, params) in [&u, &v].into_iter().enumerate() {
            if params.is_empty() {
                error!("Surface has no grid parameters in direction {}", direction + 1);
                return Err(PatchError::InvalidGridParameters { direction });
            }
        }

        let grid = StructuredGrid::new(u.len(), v.len(), p1, p2);
        let num_nodes = grid.num_nodes();
        if !self.coordinates.is_empty() {
            return if self.coordinates.len() == num_nodes {
                debug!("Topology already generated with {num_nodes} nodes");
                self.grid = grid;
                Ok(())
            } else {
                error!(
                    "Patch holds {} coordinates, topology requires {num_nodes}",
                    self.coordinates.len()
                );
                Err(PatchError::NodeCountMismatch {
                    existing: self.coordinates.len(),
                    computed: num_nodes,
                })
            };
        }

        let (nelx, nely) = (grid.elements_x(), grid.elements_y());
        let element_parameters = [surface.grid_parameters(0, 1), surface.grid_parameters(1, 1)];
        for (direction, (params, nel)) in element_parameters.iter().zip([nelx, nely]).enumerate() {
            if params.len() != nel + 1 {
                error!(
                    "Surface has {} element bounds in direction {}, expected {}",
                    params.len(),
                    direction + 1,
                    nel + 1
                );
                return Err(PatchError::InvalidGridParameters { direction });
            }
        }

        let mut coordinates = surface.evaluate_grid(&u, &v);
        if coordinates.len() != num_nodes {
            error!("Surface evaluated {} grid points, expected {num_nodes}", coordinates.len());
            return Err(PatchError::InvalidGridParameters { direction: 0 });
        }
        if self.nsd == 2 {
            coordinates.iter_mut().for_each(|x| x.z = 0.0);
        }

        self.grid = grid;
        self.coordinates = coordinates;
        self.node_ids = (0..num_nodes).map(|_| numbering.next_node()).collect();

        self.element_ids = (0..grid.num_elements())
            .map(|iel| {
                let (i1, i2) = grid.element_position(iel);
                if is_zero_span(&element_parameters[0], i1) || is_zero_span(&element_parameters[1], i2) {
                    ElementId::ZeroArea
                } else {
                    ElementId::Ordinary(numbering.next_element())
                }
            })
            .collect();

        let num_entries = grid.num_elements() * grid.nodes_per_element();
        let mut connectivity = NestedVec::with_capacity(grid.num_elements(), num_entries);
        for i2 in 0..nely {
            for i1 in 0..nelx {
                connectivity.push_iter(grid.element_nodes(i1, i2));
            }
        }
        self.connectivity = connectivity;
        self.element_parameters = element_parameters;
        self.extraordinary.clear();
        self.generate_thread_groups();

        debug!(
            "Generated {}x{} Lagrange patch of order ({p1}, {p2}) with {num_nodes} nodes and {} elements",
            nelx,
            nely,
            grid.num_elements()
        );
        Ok(())
    }

    fn clear(&mut self, retain_geometry: bool) {
        let surface = if retain_geometry { self.surface.take() } else { None };
        *self = Self {
            surface,
            quadrature: self.quadrature.clone(),
            options: self.options.clone(),
            ..Self::without_surface(self.nsd, PatchOptions::default())
        };
    }

    fn num_nodes(&self) -> usize {
        self.node_ids.len().max(self.coordinates.len())
    }

    fn num_elements(&self) -> usize {
        self.element_ids.len()
    }

    fn coordinate(&self, node: usize) -> Option<Point3<f64>> {
        self.coordinates.get(node.checked_sub(1)?).copied()
    }

    fn set_coordinate(&mut self, node: usize, x: Point3<f64>) -> Result<(), PatchError> {
        let Some(index) = node.checked_sub(1) else {
            error!("Node numbers start at 1, cannot set coordinates of node 0");
            return Err(PatchError::NodeIndexOutOfRange {
                index: node,
                num_nodes: self.coordinates.len(),
            });
        };
        if index >= self.coordinates.len() {
            self.coordinates.resize(index + 1, Point3::origin());
        }
        self.coordinates[index] = x;
        Ok(())
    }

    fn element_coordinates(&self, element: usize) -> Result<DMatrix<f64>, PatchError> {
        let index = element
            .checked_sub(1)
            .filter(|&index| index < self.connectivity.len())
            .ok_or_else(|| {
                error!("Element index {element} out of range [1,{}]", self.connectivity.len());
                PatchError::ElementIndexOutOfRange {
                    index: element,
                    num_elements: self.connectivity.len(),
                }
            })?;
        let mut x = DMatrix::zeros(self.nsd, 0);
        self.gather_element_coordinates(index, &mut x)?;
        Ok(x)
    }

    fn nodal_coordinates(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.nsd, self.coordinates.len(), |i, node| self.coordinates[node][i])
    }

    fn update_coordinates(&mut self, displacement: &DVector<f64>) -> Result<(), PatchError> {
        let expected = self.nsd * self.coordinates.len();
        if displacement.len() != expected {
            error!(
                "Invalid dimension {} of displacement vector, should be {expected}",
                displacement.len()
            );
            return Err(PatchError::DisplacementLength {
                len: displacement.len(),
                expected,
            });
        }

        for (x, u) in self
            .coordinates
            .iter_mut()
            .zip(displacement.as_slice().chunks_exact(self.nsd))
        {
            for (i, u_i) in u.iter().enumerate() {
                x[i] += u_i;
            }
        }
        Ok(())
    }
}

//! Visualization grids for Lagrange patches.
use crate::error::PatchError;
use crate::patch::LagrangePatch;
use log::{error, info};
use nalgebra::Point3;

/// A quadrilateral visualization grid.
///
/// Each cell remembers the 1-based id of the patch element it lies in, so that element-wise
/// quantities can be displayed on the finer grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementBlock {
    points: Vec<Point3<f64>>,
    parameters: Vec<[f64; 2]>,
    // Counterclockwise vertex indices
    cells: Vec<[usize; 4]>,
    element_ids: Vec<usize>,
    nodes_per_direction: [usize; 2],
}

impl ElementBlock {
    /// A structured `n1 x n2` grid of points with `u` running fastest.
    ///
    /// All cells start out belonging to element 1.
    pub fn structured(points: Vec<Point3<f64>>, parameters: Vec<[f64; 2]>, n1: usize, n2: usize) -> Self {
        let mut cells = Vec::with_capacity(n1.saturating_sub(1) * n2.saturating_sub(1));
        for j in 0..n2.saturating_sub(1) {
            for i in 0..n1.saturating_sub(1) {
                let n0 = j * n1 + i;
                cells.push([n0, n0 + 1, n0 + n1 + 1, n0 + n1]);
            }
        }
        let element_ids = vec![1; cells.len()];
        Self {
            points,
            parameters,
            cells,
            element_ids,
            nodes_per_direction: [n1, n2],
        }
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Surface parameters of each point.
    pub fn parameters(&self) -> &[[f64; 2]] {
        &self.parameters
    }

    pub fn cells(&self) -> &[[usize; 4]] {
        &self.cells
    }

    pub fn element_ids(&self) -> &[usize] {
        &self.element_ids
    }

    pub fn nodes_per_direction(&self) -> [usize; 2] {
        self.nodes_per_direction
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Sets the element id of the 0-based cell. Out-of-range cells are ignored.
    pub fn set_element_id(&mut self, cell: usize, element_id: usize) {
        if let Some(id) = self.element_ids.get_mut(cell) {
            *id = element_id;
        }
    }
}

impl LagrangePatch {
    pub(super) fn build_element_block(&self, points_per_element: [usize; 2]) -> Result<ElementBlock, PatchError> {
        let Some(surface) = self.surface.as_ref() else {
            error!("Cannot tessellate a patch without a surface");
            return Err(PatchError::MissingSurface);
        };
        let (p1, p2) = self.grid.order();
        if p1 < 2 || p2 < 2 {
            error!("Cannot tessellate a patch before the topology is generated");
            return Err(PatchError::InvalidOrder { p1, p2 });
        }
        if points_per_element != [p1, p2] {
            info!(
                "Lagrange elements: using {p1} x {p2} visualization points per element instead of {} x {}",
                points_per_element[0], points_per_element[1]
            );
        }

        let u = surface.grid_parameters(0, p1 - 1);
        let v = surface.grid_parameters(1, p2 - 1);
        let mut points = surface.evaluate_grid(&u, &v);
        if self.nsd == 2 {
            points.iter_mut().for_each(|x| x.z = 0.0);
        }
        let parameters = v
            .iter()
            .flat_map(|&v| u.iter().map(move |&u| [u, v]))
            .collect();
        let (n1, n2) = (u.len(), v.len());
        let mut block = ElementBlock::structured(points, parameters, n1, n2);

        // Every Lagrange element spans p - 1 cells in each direction
        let nelx = self.grid.elements_x();
        for j in 0..n2.saturating_sub(1) {
            for i in 0..n1.saturating_sub(1) {
                let element = (j / (p2 - 1)) * nelx + i / (p1 - 1) + 1;
                block.set_element_id(j * (n1 - 1) + i, element);
            }
        }
        Ok(block)
    }
}

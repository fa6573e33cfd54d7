//! Discretization options for a patch.
use serde::{Deserialize, Serialize};

/// Options controlling quadrature, visualization and threading of a patch.
///
/// The defaults reproduce the order-driven behavior: the number of Gauss points per
/// direction equals the element order, and visualization uses one point per element node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchOptions {
    /// Gauss points per parametric direction. `None` selects the element order.
    pub num_gauss: Option<usize>,
    /// Requested visualization points per element in each direction.
    pub visualization_points: [usize; 2],
    /// Number of elements per direction in each block handed to a single thread.
    pub thread_group_block_size: usize,
    /// Number of primary solution components per node.
    pub num_fields: usize,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            num_gauss: None,
            visualization_points: [2, 2],
            thread_group_block_size: 1,
            num_fields: 1,
        }
    }
}

impl PatchOptions {
    pub fn with_num_gauss(self, num_gauss: usize) -> Self {
        Self {
            num_gauss: Some(num_gauss),
            ..self
        }
    }

    pub fn with_visualization_points(self, visualization_points: [usize; 2]) -> Self {
        Self {
            visualization_points,
            ..self
        }
    }

    pub fn with_thread_group_block_size(self, block_size: usize) -> Self {
        Self {
            thread_group_block_size: block_size.max(1),
            ..self
        }
    }

    pub fn with_num_fields(self, num_fields: usize) -> Self {
        Self { num_fields, ..self }
    }

    /// Number of Gauss points for a direction with the given element order.
    pub fn gauss_points_for_order(&self, order: usize) -> usize {
        match self.num_gauss {
            Some(n) if n > 0 => n,
            _ => order,
        }
    }
}

//! Index arithmetic for structured grids of tensor-product Lagrange elements.
//!
//! Nodes are numbered row by row with the first parametric direction running fastest,
//! `node = j * nx + i`. Elements are numbered the same way on the coarser element grid.
//! An element of order `(p1, p2)` at element position `(i1, i2)` owns the `p1 * p2` nodes
//! starting at its corner node `(p2 - 1) * nx * i2 + (p1 - 1) * i1`, with local node `(a, b)`
//! at local index `b * p1 + a`. All patch consumers rely on this layout.
use serde::{Deserialize, Serialize};

/// One of the four edges of a two-dimensional patch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Edge {
    /// `u = u_min`
    Left,
    /// `u = u_max`
    Right,
    /// `v = v_min`
    Bottom,
    /// `v = v_max`
    Top,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Bottom, Edge::Top];

    /// Edge from its 1-based boundary item number (1: left, 2: right, 3: bottom, 4: top).
    pub fn from_item(item: usize) -> Option<Self> {
        match item {
            1 => Some(Edge::Left),
            2 => Some(Edge::Right),
            3 => Some(Edge::Bottom),
            4 => Some(Edge::Top),
            _ => None,
        }
    }

    pub fn item(&self) -> usize {
        match self {
            Edge::Left => 1,
            Edge::Right => 2,
            Edge::Bottom => 3,
            Edge::Top => 4,
        }
    }

    /// The parametric direction normal to the edge, signed by the side of the patch.
    ///
    /// Returns one of `-1, 1, -2, 2`, where the absolute value is the 1-based direction.
    pub fn normal_direction(&self) -> i32 {
        match self {
            Edge::Left => -1,
            Edge::Right => 1,
            Edge::Bottom => -2,
            Edge::Top => 2,
        }
    }

    /// 0-based parametric direction normal to the edge.
    pub fn normal_axis(&self) -> usize {
        match self {
            Edge::Left | Edge::Right => 0,
            Edge::Bottom | Edge::Top => 1,
        }
    }

    /// 0-based parametric direction running along the edge.
    pub fn tangent_axis(&self) -> usize {
        1 - self.normal_axis()
    }

    /// Whether the edge lies at the start of its normal parametric direction.
    pub fn is_start(&self) -> bool {
        self.normal_direction() < 0
    }
}

/// A boundary edge together with the order of the Neumann condition integrated over it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundaryItem {
    pub edge: Edge,
    pub neumann_order: usize,
}

impl BoundaryItem {
    pub fn new(edge: Edge) -> Self {
        Self { edge, neumann_order: 1 }
    }

    pub fn with_neumann_order(self, neumann_order: usize) -> Self {
        Self { neumann_order, ..self }
    }

    /// Decodes a combined boundary index, where the last decimal digit is the edge item and
    /// the remaining digits are the Neumann order minus one.
    pub fn from_index(index: usize) -> Option<Self> {
        let edge = Edge::from_item(index % 10)?;
        Some(Self {
            edge,
            neumann_order: 1 + index / 10,
        })
    }
}

impl From<Edge> for BoundaryItem {
    fn from(edge: Edge) -> Self {
        Self::new(edge)
    }
}

/// Dimensions of a structured node grid and the element order living on it.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredGrid {
    nx: usize,
    ny: usize,
    p1: usize,
    p2: usize,
}

impl StructuredGrid {
    /// Grid of `nx` by `ny` nodes carrying elements of order `(p1, p2)`.
    pub fn new(nx: usize, ny: usize, p1: usize, p2: usize) -> Self {
        Self { nx, ny, p1, p2 }
    }

    pub fn nodes_x(&self) -> usize {
        self.nx
    }

    pub fn nodes_y(&self) -> usize {
        self.ny
    }

    pub fn order(&self) -> (usize, usize) {
        (self.p1, self.p2)
    }

    pub fn num_nodes(&self) -> usize {
        self.nx * self.ny
    }

    pub fn nodes_per_element(&self) -> usize {
        self.p1 * self.p2
    }

    pub fn elements_x(&self) -> usize {
        if self.p1 < 2 || self.nx == 0 {
            0
        } else {
            (self.nx - 1) / (self.p1 - 1)
        }
    }

    pub fn elements_y(&self) -> usize {
        if self.p2 < 2 || self.ny == 0 {
            0
        } else {
            (self.ny - 1) / (self.p2 - 1)
        }
    }

    pub fn num_elements(&self) -> usize {
        self.elements_x() * self.elements_y()
    }

    pub fn node_index(&self, i: usize, j: usize) -> usize {
        j * self.nx + i
    }

    pub fn element_index(&self, i1: usize, i2: usize) -> usize {
        i2 * self.elements_x() + i1
    }

    /// Element grid position `(i1, i2)` of a 0-based element index.
    pub fn element_position(&self, element: usize) -> (usize, usize) {
        let nelx = self.elements_x();
        if nelx == 0 {
            (0, 0)
        } else {
            (element % nelx, element / nelx)
        }
    }

    /// Index of the lowest-numbered node of element `(i1, i2)`.
    pub fn corner_node(&self, i1: usize, i2: usize) -> usize {
        (self.p2 - 1) * self.nx * i2 + (self.p1 - 1) * i1
    }

    pub fn local_node(&self, a: usize, b: usize) -> usize {
        b * self.p1 + a
    }

    /// Global node of local node `(a, b)` in element `(i1, i2)`.
    pub fn element_node(&self, i1: usize, i2: usize, a: usize, b: usize) -> usize {
        self.corner_node(i1, i2) + b * self.nx + a
    }

    /// The nodes of element `(i1, i2)` in local (tensor) order.
    pub fn element_nodes(&self, i1: usize, i2: usize) -> impl '_ + Iterator<Item = usize> {
        let corner = self.corner_node(i1, i2);
        (0..self.p2).flat_map(move |b| (0..self.p1).map(move |a| corner + b * self.nx + a))
    }

    /// Whether element `(i1, i2)` has a side on the given patch edge.
    pub fn element_touches_edge(&self, i1: usize, i2: usize, edge: Edge) -> bool {
        match edge {
            Edge::Left => i1 == 0,
            Edge::Right => i1 + 1 == self.elements_x(),
            Edge::Bottom => i2 == 0,
            Edge::Top => i2 + 1 == self.elements_y(),
        }
    }

    /// Whether local node `(a, b)` of an element lies on the element side facing the given edge.
    pub fn local_node_on_edge(&self, a: usize, b: usize, edge: Edge) -> bool {
        match edge {
            Edge::Left => a == 0,
            Edge::Right => a + 1 == self.p1,
            Edge::Bottom => b == 0,
            Edge::Top => b + 1 == self.p2,
        }
    }

    /// 0-based indices of the elements along the given edge, in element numbering order.
    pub fn elements_on_edge(&self, edge: Edge) -> impl '_ + Iterator<Item = usize> {
        let nelx = self.elements_x();
        (0..self.num_elements()).filter(move |&e| self.element_touches_edge(e % nelx, e / nelx, edge))
    }

    /// Number of elements along the given edge.
    pub fn num_boundary_elements(&self, edge: Edge) -> usize {
        match edge.normal_axis() {
            0 => self.elements_y(),
            _ => self.elements_x(),
        }
    }
}

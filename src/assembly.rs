//! Global accumulation of element contributions.
//!
//! A [`GlobalIntegral`] receives finished element accumulators from the integrators, possibly
//! from several threads at once. Implementations synchronize internally; the integrators only
//! guarantee that concurrently assembled elements share no nodes.
use crate::integrand::ElementNodes;
use eyre::{eyre, Result};
use nalgebra::{DMatrix, DVector};
use parking_lot::Mutex;

/// Thread-safe sink for element accumulators of type `Local`.
pub trait GlobalIntegral<Local>: Sync {
    fn assemble(&self, local: &Local, element_id: usize) -> Result<()>;
}

/// Dense element matrix and right-hand side, together with the element's global nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementMatrices {
    num_fields: usize,
    nodes: Vec<usize>,
    contributes: Vec<bool>,
    pub matrix: DMatrix<f64>,
    pub vector: DVector<f64>,
}

impl ElementMatrices {
    pub fn new(num_nodes: usize, num_fields: usize) -> Self {
        let dim = num_nodes * num_fields;
        Self {
            num_fields,
            nodes: Vec::new(),
            contributes: Vec::new(),
            matrix: DMatrix::zeros(dim, dim),
            vector: DVector::zeros(dim),
        }
    }

    /// Binds the accumulator to the nodes of the element it is integrated over.
    ///
    /// The matrix and vector are resized if the element has a different number of nodes, which
    /// happens for extraordinary elements.
    pub fn set_nodes(&mut self, nodes: ElementNodes<'_>) {
        self.nodes.clear();
        self.nodes.extend_from_slice(nodes.nodes());
        self.contributes.clear();
        self.contributes
            .extend((0..nodes.len()).map(|i| nodes.contributes(i)));

        let dim = nodes.len() * self.num_fields;
        if self.vector.len() != dim {
            self.matrix = DMatrix::zeros(dim, dim);
            self.vector = DVector::zeros(dim);
        }
    }

    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    pub fn num_fields(&self) -> usize {
        self.num_fields
    }

    pub fn contributes(&self, local_index: usize) -> bool {
        self.contributes.get(local_index).copied().unwrap_or(true)
    }
}

#[derive(Debug)]
struct DenseSystem {
    matrix: DMatrix<f64>,
    vector: DVector<f64>,
}

/// Dense global matrix and right-hand side, indexed by `num_fields * node + field`.
///
/// Rows of nodes masked out in the element accumulator receive no contributions.
#[derive(Debug)]
pub struct DenseGlobalSystem {
    num_fields: usize,
    system: Mutex<DenseSystem>,
}

impl DenseGlobalSystem {
    pub fn new(num_nodes: usize, num_fields: usize) -> Self {
        let dim = num_nodes * num_fields;
        Self {
            num_fields,
            system: Mutex::new(DenseSystem {
                matrix: DMatrix::zeros(dim, dim),
                vector: DVector::zeros(dim),
            }),
        }
    }

    pub fn dim(&self) -> usize {
        self.system.lock().vector.len()
    }

    pub fn into_parts(self) -> (DMatrix<f64>, DVector<f64>) {
        let system = self.system.into_inner();
        (system.matrix, system.vector)
    }
}

impl GlobalIntegral<ElementMatrices> for DenseGlobalSystem {
    fn assemble(&self, local: &ElementMatrices, element_id: usize) -> Result<()> {
        let nf = self.num_fields;
        if local.num_fields() != nf {
            return Err(eyre!(
                "element {element_id} has {} fields per node, system expects {nf}",
                local.num_fields()
            ));
        }

        let mut system = self.system.lock();
        let dim = system.vector.len();
        if let Some(&node) = local.nodes().iter().find(|&&node| nf * (node + 1) > dim) {
            return Err(eyre!("element {element_id} refers to node {node} outside the global system"));
        }

        for (i_local, &i_node) in local.nodes().iter().enumerate() {
            if !local.contributes(i_local) {
                continue;
            }
            for i_field in 0..nf {
                let row = nf * i_node + i_field;
                let local_row = nf * i_local + i_field;
                system.vector[row] += local.vector[local_row];
                for (j_local, &j_node) in local.nodes().iter().enumerate() {
                    for j_field in 0..nf {
                        let local_col = nf * j_local + j_field;
                        system.matrix[(row, nf * j_node + j_field)] += local.matrix[(local_row, local_col)];
                    }
                }
            }
        }
        Ok(())
    }
}

/// Sum of scalar element contributions, such as areas or error norms.
#[derive(Debug, Default)]
pub struct GlobalScalar {
    value: Mutex<f64>,
}

impl GlobalScalar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> f64 {
        *self.value.lock()
    }
}

impl GlobalIntegral<f64> for GlobalScalar {
    fn assemble(&self, local: &f64, _element_id: usize) -> Result<()> {
        *self.value.lock() += *local;
        Ok(())
    }
}

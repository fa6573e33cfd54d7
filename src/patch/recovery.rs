//! Point location and nodal field evaluation.
use crate::error::PatchError;
use crate::integrand::SolutionRecovery;
use crate::patch::domain::{blend_parameter, ElementWorkspace};
use crate::patch::tessellate::ElementBlock;
use crate::patch::{ElementId, FieldEvaluable, LagrangePatch, PointLocation, Topology};
use eyre::{eyre, Result, WrapErr};
use log::error;
use nalgebra::{DMatrix, DVector};
use rayon::iter::ParallelIterator;
use std::cell::RefCell;
use thread_local::ThreadLocal;

/// Index of the value in the sorted `params` closest to `t`, preferring the lower index on ties.
fn find_closest(params: &[f64], t: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &p) in params.iter().enumerate() {
        let distance = (p - t).abs();
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((i, distance));
        }
    }
    best.map(|(i, _)| i)
}

/// Running sum of the values recovered at one node.
#[derive(Debug, Clone, Default)]
struct NodalSum {
    sum: Option<DVector<f64>>,
    count: usize,
}

impl NodalSum {
    fn add(&mut self, value: DVector<f64>) -> Result<()> {
        match &mut self.sum {
            Some(sum) if sum.len() == value.len() => *sum += value,
            Some(sum) => {
                return Err(eyre!(
                    "recovered values of inconsistent size {} and {}",
                    sum.len(),
                    value.len()
                ))
            }
            None => self.sum = Some(value),
        }
        self.count += 1;
        Ok(())
    }
}

impl FieldEvaluable for LagrangePatch {
    fn evaluate_point(&self, xi: [f64; 2]) -> Result<PointLocation, PatchError> {
        let Some(surface) = self.surface.as_ref() else {
            error!("Cannot locate a point on a patch without a surface");
            return Err(PatchError::MissingSurface);
        };
        let (p1, p2) = self.grid.order();
        if p1 < 2 || p2 < 2 {
            error!("Cannot locate a point before the topology is generated");
            return Err(PatchError::InvalidOrder { p1, p2 });
        }

        let mut parameters = [0.0; 2];
        let mut closest = [0; 2];
        for (direction, p) in [p1, p2].into_iter().enumerate() {
            let (start, end) = surface.parameter_range(direction);
            parameters[direction] = (1.0 - xi[direction]) * start + xi[direction] * end;
            let grid_params = surface.grid_parameters(direction, p - 1);
            closest[direction] = find_closest(&grid_params, parameters[direction]).ok_or_else(|| {
                error!("Surface has no grid parameters in direction {}", direction + 1);
                PatchError::InvalidGridParameters { direction }
            })?;
        }

        let index = self.grid.node_index(closest[0], closest[1]);
        let coordinates = self.coordinates.get(index).copied().ok_or_else(|| {
            error!("Located node {} has no coordinates", index + 1);
            PatchError::NodeIndexOutOfRange {
                index,
                num_nodes: self.coordinates.len(),
            }
        })?;
        Ok(PointLocation {
            node: index + 1,
            parameters,
            coordinates,
        })
    }

    fn evaluate_primary(&self, solution: &DVector<f64>) -> Result<DMatrix<f64>, PatchError> {
        let num_points = self.coordinates.len();
        let num_nodes = self.num_nodes();
        let len = solution.len();
        let num_components = if num_nodes > 0 { len / num_nodes } else { 0 };
        if num_nodes == 0 || num_nodes < num_points || num_components * num_nodes != len {
            error!("Solution vector of length {len} is incompatible with {num_nodes} nodes");
            return Err(PatchError::InvalidSolutionLength { len, num_nodes });
        }

        Ok(DMatrix::from_fn(num_components, num_points, |c, node| {
            solution[node * num_components + c]
        }))
    }

    fn evaluate_secondary<R: SolutionRecovery>(&self, recovery: &R) -> Result<DMatrix<f64>> {
        let num_points = self.coordinates.len();
        let (p1, p2) = self.grid.order();
        let nsd = self.nsd;
        let [upar, vpar] = &self.element_parameters;

        let colors = self
            .thread_groups
            .node_subsets(&self.connectivity)
            .wrap_err("Thread groups are not node-disjoint")?;
        if let Some(index) = colors
            .iter()
            .filter_map(|color| color.max_index())
            .find(|&index| index >= num_points)
        {
            error!("Node {} has no coordinates to recover a field at", index + 1);
            return Err(PatchError::NodeIndexOutOfRange {
                index,
                num_nodes: num_points,
            }
            .into());
        }

        let mut sums = vec![NodalSum::default(); num_points];
        let workspace = ThreadLocal::new();

        for (tasks, color) in self.thread_groups.iter().zip(&colors) {
            color
                .subsets_par_iter(sums.as_mut_slice())
                .try_for_each(|mut subset| -> Result<()> {
                    let ws = &mut *workspace
                        .get_or(|| RefCell::new(ElementWorkspace::new(p1, p2, nsd)))
                        .borrow_mut();
                    let mut offset = 0;
                    for &element in tasks.get(subset.label()).unwrap_or_default() {
                        let nodes = self.connectivity.get(element).unwrap_or_default();
                        let id = match self.element_ids.get(element) {
                            Some(ElementId::ZeroArea) | None => {
                                offset += nodes.len();
                                continue;
                            }
                            Some(id) => id.global_id().unwrap_or_default(),
                        };

                        self.gather_element_coordinates(element, &mut ws.x)?;
                        ws.fe.element_id = id;
                        let (i1, i2) = self.grid.element_position(element);
                        for b in 0..p2 {
                            for a in 0..p1 {
                                let (xi, eta) = ws.basis.node_coordinates(a, b);
                                ws.fe.u = blend_parameter(upar, i1, xi).unwrap_or(ws.fe.u);
                                ws.fe.v = blend_parameter(vpar, i2, eta).unwrap_or(ws.fe.v);
                                ws.fe.det_jxw = ws.evaluate(xi, eta)?;
                                let x = ws.physical_point();
                                let value = recovery
                                    .evaluate_solution(&ws.fe, &x, nodes)
                                    .wrap_err_with(|| format!("Solution recovery failed in element {}", element + 1))?;
                                subset.get_mut(offset + b * p1 + a).add(value)?;
                            }
                        }
                        offset += nodes.len();
                    }
                    Ok(())
                })
                .map_err(|err| {
                    error!("Secondary field evaluation failed: {err:#}");
                    err
                })?;
        }

        let num_components = sums
            .iter()
            .find_map(|nodal| nodal.sum.as_ref().map(DVector::len))
            .unwrap_or(0);
        let mut field = DMatrix::zeros(num_components, num_points);
        for (node, nodal) in sums.into_iter().enumerate() {
            match nodal.sum {
                Some(sum) if sum.len() == num_components => field.set_column(node, &(sum / nodal.count as f64)),
                Some(sum) => {
                    return Err(eyre!(
                        "node {} recovered {} components, expected {num_components}",
                        node + 1,
                        sum.len()
                    ))
                }
                None => {}
            }
        }
        Ok(field)
    }

    fn tessellate(&self, points_per_element: [usize; 2]) -> Result<ElementBlock, PatchError> {
        self.build_element_block(points_per_element)
    }
}

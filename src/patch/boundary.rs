//! Integration along a boundary edge of a patch.
use crate::assembly::GlobalIntegral;
use crate::error::PatchError;
use crate::grid::BoundaryItem;
use crate::integrand::{ElementNodes, Integrand, TimeDomain};
use crate::mapping::edge_jacobian;
use crate::patch::domain::{blend_parameter, ElementWorkspace};
use crate::patch::{BoundaryIntegrable, ElementId, LagrangePatch};
use eyre::Result;
use log::{debug, error};
use nalgebra::Vector3;

impl ElementWorkspace {
    /// Edge variant of [`ElementWorkspace::evaluate`], writing the unit normal towards
    /// increasing values of the parameter in direction `normal_axis`.
    fn evaluate_edge(
        &mut self,
        xi: f64,
        eta: f64,
        normal_axis: usize,
        normal: &mut Vector3<f64>,
    ) -> Result<f64, PatchError> {
        self.basis.evaluate_into(xi, eta, &mut self.values)?;
        self.fe.xi = xi;
        self.fe.eta = eta;
        self.fe.n.copy_from(&self.values.values);
        Ok(edge_jacobian(
            &self.x,
            &self.values.derivatives,
            normal_axis,
            &mut self.jacobian,
            &mut self.fe.dndx,
            normal,
        ))
    }
}

impl LagrangePatch {
    /// Parameter value of the edge in its normal direction.
    fn edge_parameter(&self, boundary: BoundaryItem) -> f64 {
        let axis = boundary.edge.normal_axis();
        let (start, end) = match &self.surface {
            Some(surface) => surface.parameter_range(axis),
            None => {
                let params = &self.element_parameters[axis];
                (
                    params.first().copied().unwrap_or(0.0),
                    params.last().copied().unwrap_or(0.0),
                )
            }
        };
        if boundary.edge.is_start() {
            start
        } else {
            end
        }
    }
}

impl BoundaryIntegrable for LagrangePatch {
    fn integrate_boundary<I, G>(
        &self,
        integrand: &mut I,
        boundary: BoundaryItem,
        global: &G,
        time: &TimeDomain,
    ) -> Result<()>
    where
        I: Integrand,
        G: GlobalIntegral<I::Local>,
    {
        if self.is_empty() {
            return Ok(());
        }

        let edge = boundary.edge;
        let normal_axis = edge.normal_axis();
        let (p1, p2) = self.grid.order();
        let order_along_edge = if normal_axis == 0 { p2 } else { p1 };
        let num_points = integrand.boundary_quadrature_points(self.options.gauss_points_for_order(order_along_edge));
        let rule = self.quadrature.rule(num_points).ok_or_else(|| {
            error!("No quadrature rule with {num_points} points for boundary integration");
            PatchError::NoQuadratureRule { num_points }
        })?;

        let edge_parameter = self.edge_parameter(boundary);
        integrand.set_neumann_order(boundary.neumann_order);

        let use_extraordinary = integrand.flags().extraordinary_elements;
        if use_extraordinary && self.extraordinary.len() < self.element_ids.len() {
            error!(
                "Too few extraordinary elements: {} reserved, {} required",
                self.extraordinary.len(),
                self.element_ids.len()
            );
            return Err(PatchError::TooFewExtraordinaryElements {
                reserved: self.extraordinary.len(),
                required: self.element_ids.len(),
            }
            .into());
        }

        let integrand = &*integrand;
        let first_point = self.first_boundary_point(edge);
        let reference_normal_coord = if edge.is_start() { -1.0 } else { 1.0 };
        let [upar, vpar] = &self.element_parameters;
        let mut ws = ElementWorkspace::new(p1, p2, self.nsd);
        let mut normal = Vector3::zeros();
        let mut num_integrated = 0;

        for element in self.grid.elements_on_edge(edge) {
            let ordinary_id = match self.element_ids.get(element) {
                Some(ElementId::Ordinary(id)) => *id,
                _ => continue,
            };
            let (i1, i2) = self.grid.element_position(element);
            let ordinary_nodes = ElementNodes::ordinary(self.connectivity.get(element).unwrap_or_default());
            let (id, nodes) = match self.extraordinary_element(element) {
                Some(xo) if use_extraordinary => (xo.id, xo.element_nodes()),
                _ => (ordinary_id, ordinary_nodes),
            };

            let result = (|| -> Result<()> {
                self.gather_element_coordinates(element, &mut ws.x)?;
                ws.fe.element_id = id;
                let mut local = integrand.local_integral(nodes.len(), id, true);
                integrand.init_element_boundary(nodes, &mut local)?;

                let position_along_edge = if normal_axis == 0 { i2 } else { i1 };
                ws.fe.integration_point = first_point + position_along_edge * rule.len();
                for (g, w) in rule.iter() {
                    let (xi, eta) = if normal_axis == 0 {
                        ws.fe.u = edge_parameter;
                        ws.fe.v = blend_parameter(vpar, i2, g).unwrap_or(ws.fe.v);
                        (reference_normal_coord, g)
                    } else {
                        ws.fe.u = blend_parameter(upar, i1, g).unwrap_or(ws.fe.u);
                        ws.fe.v = edge_parameter;
                        (g, reference_normal_coord)
                    };

                    let det = ws.evaluate_edge(xi, eta, normal_axis, &mut normal)?;
                    if det != 0.0 {
                        if edge.is_start() {
                            normal = -normal;
                        }
                        let x = ws.physical_point();
                        ws.fe.det_jxw = det * w;
                        integrand.evaluate_boundary(&mut local, &ws.fe, time, &x, &normal)?;
                    }
                    ws.fe.integration_point += 1;
                }

                integrand.finalize_element_boundary(&mut local, &ws.fe, time)?;
                global.assemble(&local, id)
            })();

            if let Err(err) = result {
                let err = err.wrap_err(format!("Failed to integrate element {} on {edge:?} edge", element + 1));
                error!("Boundary integration failed: {err:#}");
                return Err(err);
            }
            num_integrated += 1;
        }

        debug!("Integrated {num_integrated} elements on {edge:?} edge");
        Ok(())
    }
}

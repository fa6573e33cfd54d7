//! Parallel integration over the elements of a patch.
use crate::assembly::GlobalIntegral;
use crate::basis::{BasisValues, LagrangeBasis};
use crate::error::PatchError;
use crate::integrand::{ElementNodes, FiniteElementValues, Integrand, ReducedIntegration, TimeDomain};
use crate::mapping::jacobian;
use crate::patch::{DomainIntegrable, ElementId, LagrangePatch};
use crate::quadrature::GaussRule;
use eyre::{Result, WrapErr};
use log::{debug, error};
use nalgebra::{DMatrix, Point3};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use thread_local::ThreadLocal;

/// Per-thread buffers for evaluating one element at a time.
#[derive(Debug)]
pub(super) struct ElementWorkspace {
    pub basis: LagrangeBasis,
    pub values: BasisValues,
    pub fe: FiniteElementValues,
    /// `nsd x nen` element coordinates
    pub x: DMatrix<f64>,
    pub jacobian: DMatrix<f64>,
}

impl ElementWorkspace {
    pub fn new(p1: usize, p2: usize, nsd: usize) -> Self {
        let nen = p1 * p2;
        Self {
            basis: LagrangeBasis::new(p1, p2),
            values: BasisValues::zeros(nen),
            fe: FiniteElementValues::new(nen, nsd),
            x: DMatrix::zeros(nsd, nen),
            jacobian: DMatrix::zeros(nsd, 2),
        }
    }

    /// Evaluates the basis at `(xi, eta)` and maps it to the element.
    ///
    /// Returns the Jacobian determinant, zero for a singular mapping.
    pub fn evaluate(&mut self, xi: f64, eta: f64) -> Result<f64, PatchError> {
        self.basis.evaluate_into(xi, eta, &mut self.values)?;
        self.fe.xi = xi;
        self.fe.eta = eta;
        self.fe.n.copy_from(&self.values.values);
        Ok(jacobian(&self.x, &self.values.derivatives, &mut self.jacobian, &mut self.fe.dndx))
    }

    /// Physical coordinates `X N` of the current point.
    pub fn physical_point(&self) -> Point3<f64> {
        let x = &self.x * &self.fe.n;
        let mut point = Point3::origin();
        for i in 0..x.len().min(3) {
            point[i] = x[i];
        }
        point
    }

    /// Mean of the element node coordinates.
    pub fn center(&self) -> Point3<f64> {
        let mut center = Point3::origin();
        let nen = self.x.ncols();
        if nen > 0 {
            for i in 0..self.x.nrows().min(3) {
                center[i] = self.x.row(i).sum() / nen as f64;
            }
        }
        center
    }
}

/// Linear blend between the parameters of element bounds `i` and `i + 1`.
pub(super) fn blend_parameter(params: &[f64], i: usize, xi: f64) -> Option<f64> {
    let a = params.get(i)?;
    let b = params.get(i + 1)?;
    Some(0.5 * (a * (1.0 - xi) + b * (1.0 + xi)))
}

struct DomainRules<'a> {
    full: [&'a GaussRule; 2],
    reduced: Option<&'a GaussRule>,
    // Reduced point count per direction as communicated to the integrand
    num_reduced: usize,
}

fn no_quadrature_rule(num_points: usize) -> PatchError {
    error!("No Gauss rule with {num_points} points available");
    PatchError::NoQuadratureRule { num_points }
}

impl LagrangePatch {
    fn domain_rules<I: Integrand>(&self, integrand: &I) -> Result<DomainRules<'_>, PatchError> {
        let (p1, p2) = self.grid.order();
        let mut full = Vec::with_capacity(2);
        for p in [p1, p2] {
            let num_points = integrand.quadrature_points(self.options.gauss_points_for_order(p));
            let rule = self
                .quadrature
                .rule(num_points)
                .ok_or_else(|| no_quadrature_rule(num_points))?;
            full.push(rule);
        }
        let full = [full[0], full[1]];

        let (reduced, num_reduced) = match integrand.reduced_integration(full[0].len()) {
            ReducedIntegration::Points(num_points) if num_points > 0 => {
                let rule = self
                    .quadrature
                    .rule(num_points)
                    .ok_or_else(|| no_quadrature_rule(num_points))?;
                (Some(rule), num_points)
            }
            ReducedIntegration::Unspecified => (None, full[0].len()),
            _ => (None, 0),
        };

        Ok(DomainRules {
            full,
            reduced,
            num_reduced,
        })
    }

    fn integrate_element<I, G>(
        &self,
        element: usize,
        rules: &DomainRules<'_>,
        integrand: &I,
        global: &G,
        time: &TimeDomain,
        ws: &mut ElementWorkspace,
    ) -> Result<()>
    where
        I: Integrand,
        G: GlobalIntegral<I::Local>,
    {
        let id = match self.element_ids.get(element) {
            Some(ElementId::ZeroArea) => return Ok(()),
            Some(id) => id.global_id().unwrap_or_default(),
            None => {
                error!("Element index {} out of range [1,{}]", element + 1, self.element_ids.len());
                return Err(PatchError::ElementIndexOutOfRange {
                    index: element + 1,
                    num_elements: self.element_ids.len(),
                }
                .into())
            }
        };
        let (i1, i2) = self.grid.element_position(element);
        let [upar, vpar] = &self.element_parameters;

        self.gather_element_coordinates(element, &mut ws.x)?;
        let center = if integrand.flags().element_center {
            ws.center()
        } else {
            Point3::origin()
        };

        ws.fe.element_id = id;
        let nodes = ElementNodes::ordinary(self.connectivity.get(element).unwrap_or_default());
        // The accumulator is dropped on every exit path below
        let mut local = integrand.local_integral(nodes.len(), id, false);
        integrand.init_element(nodes, &ws.fe, &center, rules.num_reduced * rules.num_reduced, &mut local)?;

        if let Some(reduced) = rules.reduced {
            for (eta, w_eta) in reduced.iter() {
                for (xi, w_xi) in reduced.iter() {
                    ws.fe.u = blend_parameter(upar, i1, xi).unwrap_or(ws.fe.u);
                    ws.fe.v = blend_parameter(vpar, i2, eta).unwrap_or(ws.fe.v);
                    let det = ws.evaluate(xi, eta)?;
                    let x = ws.physical_point();
                    ws.fe.det_jxw = det.abs() * w_xi * w_eta;
                    integrand.reduced_integral(&mut local, &ws.fe, &x, time)?;
                }
            }
        }

        let [rule_u, rule_v] = rules.full;
        let first_point = self.first_integration_point + element * rule_u.len() * rule_v.len();
        ws.fe.integration_point = first_point;
        for (eta, w_eta) in rule_v.iter() {
            for (xi, w_xi) in rule_u.iter() {
                ws.fe.u = blend_parameter(upar, i1, xi).unwrap_or(ws.fe.u);
                ws.fe.v = blend_parameter(vpar, i2, eta).unwrap_or(ws.fe.v);
                let det = ws.evaluate(xi, eta)?;
                if det != 0.0 {
                    let x = ws.physical_point();
                    ws.fe.det_jxw = det.abs() * w_xi * w_eta;
                    integrand.evaluate(&mut local, &ws.fe, time, &x)?;
                }
                ws.fe.integration_point += 1;
            }
        }

        integrand.finalize_element(&mut local, time, first_point)?;
        global.assemble(&local, id)
    }
}

impl DomainIntegrable for LagrangePatch {
    fn integrate<I, G>(&self, integrand: &I, global: &G, time: &TimeDomain) -> Result<()>
    where
        I: Integrand,
        G: GlobalIntegral<I::Local>,
    {
        if self.is_empty() {
            return Ok(());
        }

        let rules = self.domain_rules(integrand).map_err(|err| {
            error!("Domain integration failed: {err}");
            err
        })?;

        let (p1, p2) = self.grid.order();
        let nsd = self.nsd;
        let workspace = ThreadLocal::new();
        let failed = AtomicBool::new(false);
        let first_error = Mutex::new(None);

        for group in self.thread_groups.iter() {
            if failed.load(Ordering::Relaxed) {
                break;
            }
            (0..group.len()).into_par_iter().for_each(|task| {
                let ws = &mut *workspace
                    .get_or(|| RefCell::new(ElementWorkspace::new(p1, p2, nsd)))
                    .borrow_mut();
                for &element in group.get(task).unwrap_or_default() {
                    if failed.load(Ordering::Relaxed) {
                        return;
                    }
                    let result = self
                        .integrate_element(element, &rules, integrand, global, time, ws)
                        .wrap_err_with(|| format!("Failed to integrate element {}", element + 1));
                    if let Err(err) = result {
                        failed.store(true, Ordering::Relaxed);
                        first_error.lock().get_or_insert(err);
                        return;
                    }
                }
            });
        }

        match first_error.into_inner() {
            Some(err) => {
                error!("Domain integration failed: {err:#}");
                Err(err)
            }
            None => {
                debug!(
                    "Integrated {} elements in {} thread groups",
                    self.element_ids.len(),
                    self.thread_groups.num_groups()
                );
                Ok(())
            }
        }
    }
}

use crate::{rectangle_patch, MeasureIntegrand};
use eyre::Result;
use lagpatch::assembly::{GlobalIntegral, GlobalScalar};
use lagpatch::grid::{BoundaryItem, Edge};
use lagpatch::integrand::{FiniteElementValues, Integrand, TimeDomain};
use lagpatch::patch::{BoundaryIntegrable, GlobalNumbering, LagrangePatch, Topology};
use lagpatch::surface::FnSurface;
use lagpatch::PatchOptions;
use matrixcompare::assert_scalar_eq;
use nalgebra::{Point3, Vector3};
use parking_lot::Mutex;
use std::f64::consts::PI;
use std::sync::Arc;

fn edge_length(patch: &LagrangePatch, boundary: BoundaryItem) -> f64 {
    let global = GlobalScalar::new();
    let mut integrand = MeasureIntegrand::default();
    patch
        .integrate_boundary(&mut integrand, boundary, &global, &TimeDomain::default())
        .unwrap();
    assert_eq!(integrand.neumann_order, boundary.neumann_order);
    global.value()
}

#[test]
fn edge_lengths_of_rectangle() {
    let patch = rectangle_patch(([0.0, 0.0], [2.0, 3.0]), [3, 2], [3, 3]);
    assert_scalar_eq!(edge_length(&patch, Edge::Left.into()), 3.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(edge_length(&patch, Edge::Right.into()), 3.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(edge_length(&patch, Edge::Bottom.into()), 2.0, comp = abs, tol = 1e-12);
    let top = BoundaryItem::from_index(14).unwrap();
    assert_scalar_eq!(edge_length(&patch, top), 2.0, comp = abs, tol = 1e-12);
}

/// Checks the normal against the expected outward normal at every boundary point.
struct NormalChecker<F> {
    expected: F,
    tolerance: f64,
    // (element id, integration points)
    records: Mutex<Vec<(usize, Vec<usize>)>>,
}

impl<F: Fn(&Point3<f64>) -> Vector3<f64> + Sync> NormalChecker<F> {
    fn new(expected: F, tolerance: f64) -> Self {
        Self {
            expected,
            tolerance,
            records: Mutex::new(Vec::new()),
        }
    }
}

impl<F: Fn(&Point3<f64>) -> Vector3<f64> + Sync> Integrand for NormalChecker<F> {
    type Local = (usize, Vec<usize>);

    fn local_integral(&self, _num_nodes: usize, element_id: usize, boundary: bool) -> Self::Local {
        assert!(boundary);
        (element_id, Vec::new())
    }

    fn evaluate(
        &self,
        _local: &mut Self::Local,
        _fe: &FiniteElementValues,
        _time: &TimeDomain,
        _x: &Point3<f64>,
    ) -> Result<()> {
        unreachable!("domain integration is not used here")
    }

    fn evaluate_boundary(
        &self,
        local: &mut Self::Local,
        fe: &FiniteElementValues,
        _time: &TimeDomain,
        x: &Point3<f64>,
        normal: &Vector3<f64>,
    ) -> Result<()> {
        let expected = (self.expected)(x);
        assert!(
            (normal - expected).norm() < self.tolerance,
            "normal {normal:?} at {x:?}, expected {expected:?}"
        );
        assert_scalar_eq!(normal.norm(), 1.0, comp = abs, tol = 1e-12);
        local.1.push(fe.integration_point);
        Ok(())
    }

    fn finalize_element_boundary(
        &self,
        local: &mut Self::Local,
        _fe: &FiniteElementValues,
        _time: &TimeDomain,
    ) -> Result<()> {
        self.records.lock().push(std::mem::take(local));
        Ok(())
    }
}

/// Accepts and drops every element contribution.
struct Discard;

impl<Local> GlobalIntegral<Local> for Discard {
    fn assemble(&self, _local: &Local, _element_id: usize) -> Result<()> {
        Ok(())
    }
}

#[test]
fn rectangle_normals_point_outwards() {
    let patch = rectangle_patch(([0.0, 0.0], [1.0, 1.0]), [2, 2], [2, 2]);
    let cases = [
        (Edge::Left, Vector3::new(-1.0, 0.0, 0.0)),
        (Edge::Right, Vector3::new(1.0, 0.0, 0.0)),
        (Edge::Bottom, Vector3::new(0.0, -1.0, 0.0)),
        (Edge::Top, Vector3::new(0.0, 1.0, 0.0)),
    ];
    for (edge, n) in cases {
        let mut checker = NormalChecker::new(move |_: &Point3<f64>| n, 1e-12);
        patch
            .integrate_boundary(&mut checker, edge.into(), &Discard, &TimeDomain::default())
            .unwrap();
        assert_eq!(checker.records.lock().len(), 2);
    }
}

#[test]
fn annulus_normals_are_radial() {
    let radii = vec![1.0, 1.5, 2.0];
    let angles = (0..=16).map(|i| 0.5 * PI * i as f64 / 16.0).collect();
    let surface = FnSurface::new(radii, angles, [4, 4], 2, |r, theta| {
        Point3::new(r * theta.cos(), r * theta.sin(), 0.0)
    });
    let mut patch = LagrangePatch::new(Arc::new(surface), PatchOptions::default());
    patch.generate_topology(&mut GlobalNumbering::new()).unwrap();

    let radial = |x: &Point3<f64>| x.coords.normalize();
    let mut outer = NormalChecker::new(radial, 1e-3);
    patch
        .integrate_boundary(&mut outer, Edge::Right.into(), &Discard, &TimeDomain::default())
        .unwrap();
    assert_eq!(outer.records.lock().len(), 16);

    let mut inner = NormalChecker::new(|x: &Point3<f64>| -x.coords.normalize(), 1e-3);
    patch
        .integrate_boundary(&mut inner, Edge::Left.into(), &Discard, &TimeDomain::default())
        .unwrap();

    let mut bottom = NormalChecker::new(|_: &Point3<f64>| Vector3::new(0.0, -1.0, 0.0), 1e-12);
    patch
        .integrate_boundary(&mut bottom, Edge::Bottom.into(), &Discard, &TimeDomain::default())
        .unwrap();
    assert_eq!(bottom.records.lock().len(), 2);
}

#[test]
fn boundary_point_counters_follow_the_edge() {
    // 3 x 2 quadratic elements, three Gauss points per element edge
    let mut patch = rectangle_patch(([0.0, 0.0], [3.0, 2.0]), [3, 2], [3, 3]);
    patch.set_first_boundary_point(Edge::Top, 50);
    let mut checker = NormalChecker::new(|_: &Point3<f64>| Vector3::new(0.0, 1.0, 0.0), 1e-12);
    patch
        .integrate_boundary(&mut checker, Edge::Top.into(), &Discard, &TimeDomain::default())
        .unwrap();

    let records = checker.records.into_inner();
    let ids: Vec<_> = records.iter().map(|(id, _)| *id).collect();
    let points: Vec<_> = records.into_iter().flat_map(|(_, points)| points).collect();
    assert_eq!(ids, vec![4, 5, 6]);
    assert_eq!(points, (50..59).collect::<Vec<_>>());
    assert_eq!(patch.first_boundary_point(Edge::Bottom), 0);
}

/// Records the surface parameters seen along an edge.
#[derive(Default)]
struct ParameterRecorder {
    parameters: Mutex<Vec<(f64, f64)>>,
}

impl Integrand for ParameterRecorder {
    type Local = ();

    fn local_integral(&self, _num_nodes: usize, _element_id: usize, _boundary: bool) -> Self::Local {}

    fn evaluate(&self, _local: &mut (), _fe: &FiniteElementValues, _time: &TimeDomain, _x: &Point3<f64>) -> Result<()> {
        Ok(())
    }

    fn evaluate_boundary(
        &self,
        _local: &mut (),
        fe: &FiniteElementValues,
        _time: &TimeDomain,
        x: &Point3<f64>,
        _normal: &Vector3<f64>,
    ) -> Result<()> {
        assert_scalar_eq!(fe.u, x.x, comp = abs, tol = 1e-12);
        assert_scalar_eq!(fe.v, x.y, comp = abs, tol = 1e-12);
        self.parameters.lock().push((fe.u, fe.v));
        Ok(())
    }
}

#[test]
fn edge_parameters_match_the_surface() {
    let patch = rectangle_patch(([1.0, -1.0], [3.0, 1.0]), [2, 2], [2, 2]);
    let mut recorder = ParameterRecorder::default();
    patch
        .integrate_boundary(&mut recorder, Edge::Right.into(), &Discard, &TimeDomain::default())
        .unwrap();
    let parameters = recorder.parameters.into_inner();
    assert_eq!(parameters.len(), 4);
    assert!(parameters.iter().all(|&(u, _)| u == 3.0));
    assert!(parameters.windows(2).all(|w| w[0].1 < w[1].1));
}

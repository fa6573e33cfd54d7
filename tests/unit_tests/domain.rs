use crate::{rectangle_patch, MeasureIntegrand};
use eyre::{eyre, Result};
use lagpatch::assembly::{GlobalIntegral, GlobalScalar};
use lagpatch::integrand::{
    ElementNodes, FiniteElementValues, Integrand, IntegrandFlags, ReducedIntegration, TimeDomain,
};
use lagpatch::patch::{DomainIntegrable, GlobalNumbering, LagrangePatch, Topology};
use lagpatch::surface::FnSurface;
use lagpatch::PatchOptions;
use matrixcompare::assert_scalar_eq;
use nalgebra::Point3;
use parking_lot::Mutex;
use std::f64::consts::PI;
use std::sync::Arc;

/// Accepts and drops every element contribution.
struct Discard;

impl<Local> GlobalIntegral<Local> for Discard {
    fn assemble(&self, _local: &Local, _element_id: usize) -> Result<()> {
        Ok(())
    }
}

fn surface_patch(surface: FnSurface, options: PatchOptions) -> LagrangePatch {
    let mut patch = LagrangePatch::new(Arc::new(surface), options);
    patch.generate_topology(&mut GlobalNumbering::new()).unwrap();
    patch
}

fn area(patch: &LagrangePatch) -> f64 {
    let global = GlobalScalar::new();
    patch
        .integrate(&MeasureIntegrand::default(), &global, &TimeDomain::default())
        .unwrap();
    global.value()
}

#[test]
fn area_of_rectangle() {
    let patch = rectangle_patch(([0.0, 0.0], [2.0, 3.0]), [3, 2], [3, 3]);
    assert_scalar_eq!(area(&patch), 6.0, comp = abs, tol = 1e-12);
}

#[test]
fn area_of_annulus_sector() {
    // Quarter of the annulus 1 <= r <= 2
    let radii = vec![1.0, 1.25, 1.5, 1.75, 2.0];
    let angles = (0..=8).map(|i| 0.5 * PI * i as f64 / 8.0).collect();
    let surface = FnSurface::new(radii, angles, [4, 4], 2, |r, theta| {
        Point3::new(r * theta.cos(), r * theta.sin(), 0.0)
    });
    let patch = surface_patch(surface, PatchOptions::default());
    assert_scalar_eq!(area(&patch), 0.75 * PI, comp = abs, tol = 1e-4);
}

#[test]
fn area_of_inclined_plane_in_3d() {
    let surface = FnSurface::new(vec![0.0, 0.5, 1.0], vec![0.0, 1.0], [2, 2], 3, |u, v| {
        Point3::new(u, v, u + v)
    });
    let patch = surface_patch(surface, PatchOptions::default());
    assert_eq!(patch.nsd(), 3);
    assert_scalar_eq!(area(&patch), 3.0f64.sqrt(), comp = abs, tol = 1e-12);
}

#[test]
fn area_is_independent_of_thread_groups() {
    let mut patch = rectangle_patch(([0.0, 0.0], [1.0, 1.0]), [7, 5], [3, 2]);
    let checkerboard = area(&patch);
    patch.generate_thread_groups_from_connectivity();
    let greedy = area(&patch);
    let blocked = {
        let surface = patch.surface().cloned().unwrap();
        let mut patch = LagrangePatch::new(surface, PatchOptions::default().with_thread_group_block_size(3));
        patch.generate_topology(&mut GlobalNumbering::new()).unwrap();
        assert!(patch.thread_groups().verify(patch.connectivity()));
        area(&patch)
    };
    assert_scalar_eq!(checkerboard, 1.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(greedy, 1.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(blocked, 1.0, comp = abs, tol = 1e-12);
}

/// Counts the points at which the integrand is evaluated.
#[derive(Default)]
struct PointCounter {
    count: Mutex<usize>,
}

impl Integrand for PointCounter {
    type Local = f64;

    fn local_integral(&self, _num_nodes: usize, _element_id: usize, _boundary: bool) -> f64 {
        0.0
    }

    fn evaluate(&self, local: &mut f64, fe: &FiniteElementValues, _time: &TimeDomain, _x: &Point3<f64>) -> Result<()> {
        assert!(fe.det_jxw.is_finite());
        assert!(fe.dndx.iter().all(|d| d.is_finite()));
        *self.count.lock() += 1;
        *local += fe.det_jxw;
        Ok(())
    }
}

#[test]
fn singular_points_are_skipped() {
    // The first element is collapsed onto the x axis, the second is a triangle of area 1/2
    let surface = FnSurface::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0], [2, 2], 2, |u, v| {
        Point3::new(u, v * (u - 1.0).max(0.0), 0.0)
    });
    let patch = surface_patch(surface, PatchOptions::default());
    let counter = PointCounter::default();
    let global = GlobalScalar::new();
    patch.integrate(&counter, &global, &TimeDomain::default()).unwrap();

    assert_eq!(*counter.count.lock(), 4);
    assert_scalar_eq!(global.value(), 0.5, comp = abs, tol = 1e-12);
}

/// Records the integration point counters seen by each element.
#[derive(Default)]
struct PointRecorder {
    reduced: ReducedIntegration,
    // (element id, first point, evaluated points, reduced points seen in init)
    records: Mutex<Vec<(usize, usize, Vec<usize>, usize)>>,
    reduced_calls: Mutex<usize>,
}

impl Integrand for PointRecorder {
    type Local = (usize, Vec<usize>, usize);

    fn flags(&self) -> IntegrandFlags {
        IntegrandFlags {
            element_center: true,
            ..IntegrandFlags::default()
        }
    }

    fn reduced_integration(&self, _num_gauss: usize) -> ReducedIntegration {
        self.reduced
    }

    fn local_integral(&self, _num_nodes: usize, element_id: usize, boundary: bool) -> Self::Local {
        assert!(!boundary);
        (element_id, Vec::new(), 0)
    }

    fn init_element(
        &self,
        nodes: ElementNodes<'_>,
        fe: &FiniteElementValues,
        center: &Point3<f64>,
        num_reduced_points: usize,
        local: &mut Self::Local,
    ) -> Result<()> {
        assert_eq!(nodes.len(), 4);
        assert!(!nodes.is_extraordinary());
        assert_eq!(fe.element_id, local.0);
        // Unit elements on [0, 2] x [0, 2]
        assert!(center.x == 0.5 || center.x == 1.5);
        assert!(center.y == 0.5 || center.y == 1.5);
        local.2 = num_reduced_points;
        Ok(())
    }

    fn reduced_integral(
        &self,
        _local: &mut Self::Local,
        _fe: &FiniteElementValues,
        _x: &Point3<f64>,
        _time: &TimeDomain,
    ) -> Result<()> {
        *self.reduced_calls.lock() += 1;
        Ok(())
    }

    fn evaluate(
        &self,
        local: &mut Self::Local,
        fe: &FiniteElementValues,
        time: &TimeDomain,
        x: &Point3<f64>,
    ) -> Result<()> {
        assert_eq!(time.t, 0.5);
        // The surface parameters coincide with the coordinates of the rectangle
        assert_scalar_eq!(fe.u, x.x, comp = abs, tol = 1e-12);
        assert_scalar_eq!(fe.v, x.y, comp = abs, tol = 1e-12);
        local.1.push(fe.integration_point);
        Ok(())
    }

    fn finalize_element(&self, local: &mut Self::Local, _time: &TimeDomain, first_point: usize) -> Result<()> {
        let (id, points, reduced) = std::mem::take(local);
        self.records.lock().push((id, first_point, points, reduced));
        Ok(())
    }
}

#[test]
fn integration_point_counters_are_element_local() {
    let mut patch = rectangle_patch(([0.0, 0.0], [2.0, 2.0]), [2, 2], [2, 2]);
    patch.set_first_integration_point(100);
    let recorder = PointRecorder::default();
    patch.integrate(&recorder, &Discard, &TimeDomain::at(0.5)).unwrap();

    let mut records = recorder.records.into_inner();
    records.sort();
    assert_eq!(records.len(), 4);
    for (iel, (id, first_point, points, reduced)) in records.into_iter().enumerate() {
        assert_eq!(id, iel + 1);
        assert_eq!(first_point, 100 + 4 * iel);
        assert_eq!(points, (first_point..first_point + 4).collect::<Vec<_>>());
        assert_eq!(reduced, 0);
    }
    assert_eq!(*recorder.reduced_calls.lock(), 0);
}

#[test]
fn reduced_integration_runs_before_the_full_loop() {
    let patch = rectangle_patch(([0.0, 0.0], [2.0, 2.0]), [2, 2], [2, 2]);
    let recorder = PointRecorder {
        reduced: ReducedIntegration::Points(1),
        ..PointRecorder::default()
    };
    patch.integrate(&recorder, &Discard, &TimeDomain::at(0.5)).unwrap();
    assert_eq!(*recorder.reduced_calls.lock(), 4);
    assert!(recorder.records.lock().iter().all(|record| record.3 == 1));

    let recorder = PointRecorder {
        reduced: ReducedIntegration::Unspecified,
        ..PointRecorder::default()
    };
    patch.integrate(&recorder, &Discard, &TimeDomain::at(0.5)).unwrap();
    assert_eq!(*recorder.reduced_calls.lock(), 0);
    assert!(recorder.records.lock().iter().all(|record| record.3 == 4));
}

/// Fails on one element.
struct FailingIntegrand {
    failing_element: usize,
}

impl Integrand for FailingIntegrand {
    type Local = f64;

    fn local_integral(&self, _num_nodes: usize, _element_id: usize, _boundary: bool) -> f64 {
        0.0
    }

    fn evaluate(&self, _local: &mut f64, fe: &FiniteElementValues, _time: &TimeDomain, _x: &Point3<f64>) -> Result<()> {
        if fe.element_id == self.failing_element {
            Err(eyre!("material point {} diverged", fe.integration_point))
        } else {
            Ok(())
        }
    }
}

#[test]
fn integrand_failure_aborts_integration() {
    let patch = rectangle_patch(([0.0, 0.0], [1.0, 1.0]), [4, 4], [2, 2]);
    let global = GlobalScalar::new();
    let err = patch
        .integrate(&FailingIntegrand { failing_element: 7 }, &global, &TimeDomain::default())
        .unwrap_err();
    assert!(err.root_cause().to_string().contains("diverged"));
    assert!(format!("{err:#}").contains("Failed to integrate element 7"));
}

#[test]
fn missing_quadrature_rule_is_an_error() {
    let surface = FnSurface::rectangle(([0.0, 0.0], [1.0, 1.0]), [1, 1], [2, 2]);
    let patch = surface_patch(surface, PatchOptions::default().with_num_gauss(11));
    let global = GlobalScalar::new();
    assert!(patch
        .integrate(&MeasureIntegrand::default(), &global, &TimeDomain::default())
        .is_err());
}

#[test]
fn empty_patch_integrates_to_nothing() {
    let patch = LagrangePatch::without_surface(2, PatchOptions::default());
    let global = GlobalScalar::new();
    patch
        .integrate(&FailingIntegrand { failing_element: 1 }, &global, &TimeDomain::default())
        .unwrap();
    assert_eq!(global.value(), 0.0);
}

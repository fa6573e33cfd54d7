use crate::{rectangle_patch, MeasureIntegrand};
use lagpatch::assembly::GlobalScalar;
use lagpatch::integrand::TimeDomain;
use lagpatch::io::lagrange::LagrangeMesh;
use lagpatch::patch::{DomainIntegrable, ElementId, GlobalNumbering, LagrangePatch, Topology};
use lagpatch::surface::{FnSurface, ParametricSurface};
use lagpatch::{PatchError, PatchOptions};
use matrixcompare::assert_scalar_eq;
use nalgebra::{DMatrix, DVector, Point3};
use std::sync::Arc;

#[test]
fn single_bilinear_element() {
    let patch = rectangle_patch(([0.0, 0.0], [1.0, 1.0]), [1, 1], [2, 2]);
    assert_eq!(patch.num_nodes(), 4);
    assert_eq!(patch.num_elements(), 1);
    assert_eq!(patch.grid_size(), (2, 2));
    assert_eq!(patch.element_grid_size(), (1, 1));
    assert_eq!(patch.element_nodes(1), Some(&[0, 1, 2, 3][..]));
    assert_eq!(patch.element_id(1), Some(ElementId::Ordinary(1)));
    assert_eq!(patch.global_node_ids(), &[1, 2, 3, 4]);
    assert_eq!(
        patch.coordinates(),
        &[
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0)
        ]
    );

    assert_eq!(patch.coordinate(4), Some(Point3::new(1.0, 1.0, 0.0)));
    assert_eq!(patch.coordinate(0), None);
    assert_eq!(patch.coordinate(5), None);
    assert_eq!(patch.element_id(0), None);
    assert_eq!(patch.element_id(2), None);
}

#[test]
fn quadratic_patch_topology() {
    let patch = rectangle_patch(([0.0, 0.0], [2.0, 1.0]), [2, 1], [3, 3]);
    assert_eq!(patch.order(), (3, 3));
    assert_eq!(patch.grid_size(), (5, 3));
    assert_eq!(patch.num_elements(), 2);
    assert_eq!(patch.element_nodes(2), Some(&[2, 3, 4, 7, 8, 9, 12, 13, 14][..]));

    // Nodes split every knot span into two intervals
    let x = patch.element_coordinates(2).unwrap();
    assert_eq!(x.shape(), (2, 9));
    assert_eq!(x.row(0).iter().copied().collect::<Vec<_>>(), vec![1.0, 1.5, 2.0, 1.0, 1.5, 2.0, 1.0, 1.5, 2.0]);
    assert_eq!(x.row(1).iter().copied().collect::<Vec<_>>(), vec![0.0, 0.0, 0.0, 0.5, 0.5, 0.5, 1.0, 1.0, 1.0]);

    assert_eq!(
        patch.element_coordinates(3),
        Err(PatchError::ElementIndexOutOfRange {
            index: 3,
            num_elements: 2
        })
    );
    assert!(patch.element_coordinates(0).is_err());
    assert_eq!(patch.nodal_coordinates().shape(), (2, 15));
}

#[test]
fn numbering_is_shared_between_patches() {
    let mut numbering = GlobalNumbering::new();
    let surface = Arc::new(FnSurface::rectangle(([0.0, 0.0], [1.0, 1.0]), [2, 1], [2, 2]));
    let mut first = LagrangePatch::new(surface.clone(), PatchOptions::default());
    let mut second = LagrangePatch::new(surface, PatchOptions::default());
    first.generate_topology(&mut numbering).unwrap();
    second.generate_topology(&mut numbering).unwrap();

    assert_eq!(first.global_node_ids(), &[1, 2, 3, 4, 5, 6]);
    assert_eq!(second.global_node_ids(), &[7, 8, 9, 10, 11, 12]);
    assert_eq!(second.element_ids(), &[ElementId::Ordinary(3), ElementId::Ordinary(4)]);
    assert_eq!(numbering.num_nodes(), 12);
    assert_eq!(numbering.num_elements(), 4);
}

#[test]
fn regenerating_topology_is_a_no_op() {
    let mut numbering = GlobalNumbering::new();
    let surface = FnSurface::rectangle(([0.0, 0.0], [1.0, 1.0]), [2, 2], [2, 2]);
    let mut patch = LagrangePatch::new(Arc::new(surface), PatchOptions::default());
    patch.generate_topology(&mut numbering).unwrap();
    let ids = patch.global_node_ids().to_vec();

    patch.generate_topology(&mut numbering).unwrap();
    assert_eq!(patch.global_node_ids(), ids.as_slice());
    assert_eq!(numbering.num_nodes(), 9);

    // One coordinate too many
    patch.set_coordinate(10, Point3::new(5.0, 5.0, 0.0)).unwrap();
    assert_eq!(
        patch.generate_topology(&mut numbering),
        Err(PatchError::NodeCountMismatch {
            existing: 10,
            computed: 9
        })
    );
}

#[test]
fn failed_generation_leaves_patch_unchanged() {
    let mut numbering = GlobalNumbering::new();
    let surface = FnSurface::rectangle(([0.0, 0.0], [2.0, 2.0]), [2, 2], [2, 2]);
    let mut patch = LagrangePatch::new(Arc::new(surface), PatchOptions::default());
    for node in 1..=3 {
        patch.set_coordinate(node, Point3::new(node as f64, 0.0, 0.0)).unwrap();
    }

    assert_eq!(
        patch.generate_topology(&mut numbering),
        Err(PatchError::NodeCountMismatch {
            existing: 3,
            computed: 9
        })
    );
    assert_eq!(patch.grid_size(), (0, 0));
    assert_eq!(patch.element_grid_size(), (0, 0));
    assert_eq!(patch.num_elements(), 0);
    assert_eq!(patch.num_nodes(), 3);
    assert_eq!(patch.coordinate(2), Some(Point3::new(2.0, 0.0, 0.0)));
    assert_eq!(numbering, GlobalNumbering::new());
}

#[test]
fn topology_requires_surface_and_order() {
    let mut numbering = GlobalNumbering::new();
    let mut patch = LagrangePatch::without_surface(2, PatchOptions::default());
    assert_eq!(patch.generate_topology(&mut numbering), Err(PatchError::MissingSurface));

    let surface = FnSurface::rectangle(([0.0, 0.0], [1.0, 1.0]), [2, 2], [1, 3]);
    let mut patch = LagrangePatch::new(Arc::new(surface), PatchOptions::default());
    assert_eq!(
        patch.generate_topology(&mut numbering),
        Err(PatchError::InvalidOrder { p1: 1, p2: 3 })
    );
    assert!(patch.is_empty());
    assert_eq!(numbering, GlobalNumbering::new());
}

#[test]
fn clear_optionally_retains_the_surface() {
    let mut patch = rectangle_patch(([0.0, 0.0], [1.0, 1.0]), [2, 2], [2, 2]);
    patch.clear(true);
    assert!(patch.is_empty());
    assert_eq!(patch.num_nodes(), 0);
    assert!(patch.surface().is_some());
    patch.generate_topology(&mut GlobalNumbering::new()).unwrap();
    assert_eq!(patch.num_elements(), 4);

    patch.clear(false);
    assert!(patch.surface().is_none());
    assert_eq!(
        patch.generate_topology(&mut GlobalNumbering::new()),
        Err(PatchError::MissingSurface)
    );
}

#[test]
fn explicit_coordinates() {
    let mut patch = LagrangePatch::without_surface(3, PatchOptions::default());
    patch.set_coordinate(2, Point3::new(1.0, 2.0, 3.0)).unwrap();
    assert_eq!(patch.num_nodes(), 2);
    assert_eq!(patch.coordinate(1), Some(Point3::origin()));
    assert_eq!(
        patch.nodal_coordinates(),
        DMatrix::from_column_slice(3, 2, &[0.0, 0.0, 0.0, 1.0, 2.0, 3.0])
    );
    // Node numbers are 1-based
    assert_eq!(
        patch.set_coordinate(0, Point3::new(9.0, 9.0, 9.0)),
        Err(PatchError::NodeIndexOutOfRange { index: 0, num_nodes: 2 })
    );
    assert_eq!(patch.num_nodes(), 2);
    assert_eq!(patch.coordinate(2), Some(Point3::new(1.0, 2.0, 3.0)));
}

#[test]
fn update_coordinates_adds_displacements() {
    let mut patch = rectangle_patch(([0.0, 0.0], [1.0, 1.0]), [1, 1], [2, 2]);
    let displacement = DVector::from_fn(8, |i, _| if i % 2 == 0 { 1.0 } else { -0.5 });
    patch.update_coordinates(&displacement).unwrap();
    assert_eq!(patch.coordinate(1), Some(Point3::new(1.0, -0.5, 0.0)));
    assert_eq!(patch.coordinate(4), Some(Point3::new(2.0, 0.5, 0.0)));

    assert_eq!(
        patch.update_coordinates(&DVector::zeros(3)),
        Err(PatchError::DisplacementLength { len: 3, expected: 8 })
    );
    assert_eq!(patch.coordinate(1), Some(Point3::new(1.0, -0.5, 0.0)));
}

/// The unit square with a repeated breakpoint at `u = 0.5`.
#[derive(Debug)]
struct RepeatedKnotSurface;

impl ParametricSurface for RepeatedKnotSurface {
    fn order(&self, _direction: usize) -> usize {
        2
    }

    fn parameter_range(&self, _direction: usize) -> (f64, f64) {
        (0.0, 1.0)
    }

    fn grid_parameters(&self, direction: usize, _segments_per_span: usize) -> Vec<f64> {
        match direction {
            0 => vec![0.0, 0.5, 0.5, 1.0],
            _ => vec![0.0, 1.0],
        }
    }

    fn evaluate_grid(&self, u: &[f64], v: &[f64]) -> Vec<Point3<f64>> {
        v.iter()
            .flat_map(|&v| u.iter().map(move |&u| Point3::new(u, v, 0.0)))
            .collect()
    }

    fn dimension(&self) -> usize {
        2
    }
}

#[test]
fn zero_area_elements_are_skipped() {
    let mut numbering = GlobalNumbering::new();
    let mut patch = LagrangePatch::new(Arc::new(RepeatedKnotSurface), PatchOptions::default());
    patch.generate_topology(&mut numbering).unwrap();

    assert_eq!(
        patch.element_ids(),
        &[ElementId::Ordinary(1), ElementId::ZeroArea, ElementId::Ordinary(2)]
    );
    assert_eq!(ElementId::ZeroArea.global_id(), None);
    assert_eq!(numbering.num_elements(), 2);
    assert_eq!(patch.num_elements(), 3);

    let global = GlobalScalar::new();
    patch
        .integrate(&MeasureIntegrand::default(), &global, &TimeDomain::default())
        .unwrap();
    assert_scalar_eq!(global.value(), 1.0, comp = abs, tol = 1e-12);

    let mesh = LagrangeMesh::from_patch(&patch);
    assert_eq!(mesh.connectivity.len(), 2);
    assert_eq!(mesh.coordinates.len(), 8);
}

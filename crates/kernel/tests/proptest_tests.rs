//! Property-based tests for kernel invariants using the `proptest` crate.

use proptest::prelude::*;

use bool_kernel::build::face::{split_ring_by_plane, Polygon3d, SplitOutcome};
use bool_kernel::dataset::interference::{Interference, InterferenceKind, Locus};
use bool_kernel::dataset::pave::{Pave, PaveSet};
use bool_kernel::geometry::point::Point3d;
use bool_kernel::geometry::surfaces::Plane;
use bool_kernel::geometry::transform::BoundingBox;
use bool_kernel::geometry::vector::Vec3;
use bool_kernel::topology::brep::EntityStore;
use bool_kernel::topology::primitives::make_box;

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_point() -> impl Strategy<Value = (f64, f64, f64)> {
    (-100.0f64..100.0, -100.0f64..100.0, -100.0f64..100.0)
}

fn arb_positive_dim() -> impl Strategy<Value = f64> {
    0.1f64..100.0
}

/// Interior parameters for paves on a [0, 10] edge, spaced enough apart
/// that none merge with each other or the boundaries.
fn arb_interior_params() -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(0.5f64..9.5, 0..8).prop_map(|mut v| {
        v.sort_by(|a, b| a.partial_cmp(b).unwrap());
        v.dedup_by(|a, b| (*a - *b).abs() < 1e-3);
        v
    })
}

const TOL: f64 = 1e-9;

// ---------------------------------------------------------------------------
// 1. Pave ordering: any insertion sequence leaves parameters strictly
//    increasing.
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn pave_insertion_keeps_strict_order(params in arb_interior_params()) {
        let mut set = PaveSet::new(
            0,
            Pave { vertex: 0, t: 0.0, tolerance: 1e-7 },
            Pave { vertex: 1, t: 10.0, tolerance: 1e-7 },
        );
        for (i, t) in params.iter().enumerate() {
            set.insert(Pave { vertex: 2 + i, t: *t, tolerance: 1e-7 }, 1e-7);
        }
        prop_assert!(set.is_strictly_ordered());
    }
}

// ---------------------------------------------------------------------------
// 2. Pave blocks tile the edge range: no gaps, no overlaps, exact span.
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn pave_blocks_tile_the_edge_range(params in arb_interior_params()) {
        let mut set = PaveSet::new(
            3,
            Pave { vertex: 0, t: 0.0, tolerance: 1e-7 },
            Pave { vertex: 1, t: 10.0, tolerance: 1e-7 },
        );
        for (i, t) in params.iter().enumerate() {
            set.insert(Pave { vertex: 2 + i, t: *t, tolerance: 1e-7 }, 1e-7);
        }
        let blocks = set.blocks();
        prop_assert!(!blocks.is_empty());
        prop_assert!((blocks[0].range().0 - 0.0).abs() < TOL);
        for w in blocks.windows(2) {
            prop_assert_eq!(w[0].range().1, w[1].range().0);
        }
        prop_assert!((blocks.last().unwrap().range().1 - 10.0).abs() < TOL);
        let total: f64 = blocks.iter().map(|b| b.range().1 - b.range().0).sum();
        prop_assert!((total - 10.0).abs() < 1e-9);
    }
}

// ---------------------------------------------------------------------------
// 3. Interference tolerance is never below either participant's tolerance.
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn interference_tolerance_is_monotone(
        achieved in 1e-9f64..1e-2,
        t1 in 1e-9f64..1e-2,
        t2 in 1e-9f64..1e-2,
    ) {
        let rec = Interference::new(
            InterferenceKind::EE,
            0,
            1,
            Locus::Point(Point3d::ORIGIN),
            achieved,
            t1,
            t2,
        );
        prop_assert!(rec.tolerance >= t1);
        prop_assert!(rec.tolerance >= t2);
        prop_assert!(rec.tolerance >= achieved);
    }
}

// ---------------------------------------------------------------------------
// 4. Box volume matches width * depth * height exactly.
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn box_volume_is_exact(
        (x, y, z) in arb_point(),
        dx in arb_positive_dim(),
        dy in arb_positive_dim(),
        dz in arb_positive_dim(),
    ) {
        let mut store = EntityStore::new();
        let solid = make_box(&mut store, x, y, z, x + dx, y + dy, z + dz);
        let vol = store.solid_volume(solid).unwrap();
        let expected = dx * dy * dz;
        prop_assert!(
            (vol - expected).abs() < 1e-6 * expected.max(1.0),
            "volume {} expected {}",
            vol,
            expected
        );
    }
}

// ---------------------------------------------------------------------------
// 5. Splitting a ring by a plane conserves area and winding.
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn ring_split_conserves_area(cut in 0.05f64..0.95) {
        let ring = vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(1.0, 1.0, 0.0),
            Point3d::new(0.0, 1.0, 0.0),
        ];
        let plane = Plane::new(Point3d::new(cut, 0.0, 0.0), Vec3::X);
        match split_ring_by_plane(&ring, &plane, 1e-9) {
            SplitOutcome::Split { front, back } => {
                let f = Polygon3d::new(front).unwrap();
                let b = Polygon3d::new(back).unwrap();
                prop_assert!((f.area() + b.area() - 1.0).abs() < 1e-9);
                prop_assert!(f.normal.dot(&Vec3::Z) > 0.99);
                prop_assert!(b.normal.dot(&Vec3::Z) > 0.99);
            }
            other => prop_assert!(false, "expected split, got {:?}", other),
        }
    }
}

// ---------------------------------------------------------------------------
// 6. Bounding-box intersection is symmetric and contains both centers when
//    one box contains the other.
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn bbox_intersection_is_symmetric(
        (ax, ay, az) in arb_point(),
        da in arb_positive_dim(),
        (bx, by, bz) in arb_point(),
        db in arb_positive_dim(),
    ) {
        let a = BoundingBox::from_points(&[
            Point3d::new(ax, ay, az),
            Point3d::new(ax + da, ay + da, az + da),
        ]);
        let b = BoundingBox::from_points(&[
            Point3d::new(bx, by, bz),
            Point3d::new(bx + db, by + db, bz + db),
        ]);
        prop_assert_eq!(a.intersects(&b), b.intersects(&a));
    }
}

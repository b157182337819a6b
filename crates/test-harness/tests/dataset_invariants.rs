//! Invariants of the intersection dataset after a full Boolean run:
//! pave ordering, block tiling, and monotonic tolerance propagation.

use bool_kernel::algo::{BoolOp, BooleanOperation};
use bool_kernel::dataset::OperandTag;
use bool_kernel::topology::brep::EntityStore;
use bool_kernel::topology::primitives::make_box;
use bool_kernel::topology::shape::Shape;

fn run_fuse(store: &mut EntityStore) -> BooleanOperation {
    let a = make_box(store, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
    let b = make_box(store, 0.5, 0.0, 0.0, 1.5, 1.0, 1.0);
    let mut op = BooleanOperation::new(BoolOp::Fuse, Shape::solid(a), Shape::solid(b));
    op.perform(store).expect("fuse must succeed");
    op
}

#[test]
fn paves_are_strictly_ordered_after_all_stages() {
    let mut store = EntityStore::new();
    let op = run_fuse(&mut store);
    let ds = op.dataset().expect("dataset available after perform");

    let touched = ds.touched_edges();
    assert!(
        !touched.is_empty(),
        "overlapping cubes must produce split edges"
    );
    for edge_idx in touched {
        let set = ds.pave_set(edge_idx).unwrap();
        assert!(
            set.is_strictly_ordered(),
            "paves out of order on edge {edge_idx}"
        );
    }
}

#[test]
fn pave_blocks_reconstruct_each_edge_exactly() {
    let mut store = EntityStore::new();
    let op = run_fuse(&mut store);
    let ds = op.dataset().unwrap();

    for edge_idx in ds.touched_edges() {
        let edge_id = ds.edge_id(edge_idx).unwrap();
        let edge = &store.edges[edge_id];
        let blocks = ds.pave_set(edge_idx).unwrap().blocks();

        assert!((blocks[0].range().0 - edge.first).abs() < 1e-12);
        for w in blocks.windows(2) {
            assert_eq!(
                w[0].range().1,
                w[1].range().0,
                "gap or overlap between pave blocks on edge {edge_idx}"
            );
        }
        assert!((blocks.last().unwrap().range().1 - edge.last).abs() < 1e-12);
    }
}

#[test]
fn interference_tolerances_are_monotone() {
    let mut store = EntityStore::new();
    let op = run_fuse(&mut store);
    let ds = op.dataset().unwrap();

    let base = bool_kernel::Tolerance::default().coincidence;
    assert!(!ds.interferences().is_empty());
    for rec in ds.interferences() {
        // Every input sub-shape starts at the default tolerance, so every
        // record must sit at or above it, and post-processing must have
        // widened the participants at least that far.
        assert!(rec.tolerance >= base);
        assert!(ds.info(rec.i1).tolerance >= rec.tolerance);
        assert!(ds.info(rec.i2).tolerance >= rec.tolerance);
    }
}

#[test]
fn split_edges_are_recorded_in_history() {
    let mut store = EntityStore::new();
    let op = run_fuse(&mut store);
    let ds = op.dataset().unwrap();
    let history = op.history();

    let mut recorded = 0;
    for edge_idx in ds.touched_edges() {
        let replacements = history.modified(edge_idx);
        let blocks = ds.pave_set(edge_idx).unwrap().blocks();
        assert_eq!(
            replacements.len(),
            blocks.len(),
            "every pave block of edge {edge_idx} must yield one sub-edge"
        );
        recorded += replacements.len();
    }
    assert!(recorded > 0);
}

#[test]
fn shared_sub_shapes_are_indexed_once() {
    let mut store = EntityStore::new();
    // Face-touching cubes share four vertices, four edges and the contact
    // face, all deduplicated by geometric identity.
    let a = make_box(&mut store, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
    let b = make_box(&mut store, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0);
    let mut op = BooleanOperation::new(BoolOp::Fuse, Shape::solid(a), Shape::solid(b));
    op.perform(&mut store).expect("fuse must succeed");
    let ds = op.dataset().unwrap();

    let shared = (0..ds.len())
        .filter(|&i| ds.info(i).from_a && ds.info(i).from_b)
        .count();
    assert_eq!(shared, 9);
    // The shared square belongs to both operands' face lists.
    let faces_a = ds.faces_of(OperandTag::A);
    let faces_b = ds.faces_of(OperandTag::B);
    assert!(faces_a.iter().any(|f| faces_b.contains(f)));
}

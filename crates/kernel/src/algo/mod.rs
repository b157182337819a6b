//! Boolean operation orchestration.
//!
//! `BooleanOperation` drives the pipeline
//! ArgumentCheck -> DsFilling -> Intersection (VV, VE, EE, VF, EF, FF) ->
//! Building -> PostProcess, collecting warnings for recoverable conditions
//! and reserving hard failure for rejected input, aborts and topological
//! inconsistency in the rebuilt result.

pub mod classify;
pub(crate) mod filler;
pub mod history;
pub mod progress;

pub use classify::{classify_point, PointClass};
pub use history::History;
pub use progress::{ProgressMonitor, RecordingProgress, SilentProgress, Stage};

use std::collections::HashMap;

use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::analyze::{ArgumentAnalyzer, Fault};
use crate::build::face::{split_patch_by_planes, FacePatch, Polygon3d};
use crate::build::solid::SolidBuilder;
use crate::dataset::{
    InterferenceKind, IntersectionDataset, Locus, OperandTag, SubShape,
};
use crate::geometry::curves::{Curve, Line3d};
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::Surface;
use crate::intersect::NotDoneReason;
use crate::topology::brep::{audit_closure, Edge, EntityStore, FaceId, SolidId};
use crate::topology::shape::Shape;
use crate::Tolerance;

/// The requested Boolean operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    Fuse,
    Common,
    Cut,
    /// Only the intersection locus (edges and tangency vertices).
    Section,
}

/// Unrecoverable failure of a Boolean operation.
#[derive(Debug, Clone, Error)]
pub enum BooleanError {
    #[error("arguments rejected: {fault_count} fault(s) found by the analyzer")]
    ArgumentsRejected { fault_count: usize },
    #[error("operation aborted between stages")]
    Aborted,
    #[error("rebuilt boundary is non-manifold ({segments} over-shared segments)")]
    NonManifoldResult { segments: usize },
}

/// Recoverable conditions, attached to the involved dataset indices and
/// reported alongside the result.
#[derive(Debug, Clone)]
pub enum Warning {
    /// An intersection sub-step could not resolve this pair; the result is
    /// best-effort around it.
    PairNotResolved {
        i1: usize,
        i2: usize,
        reason: NotDoneReason,
    },
    /// A face could not be split and was classified as a whole.
    FaceNotSplit { index: usize },
    /// The rebuilt boundary has open segments (degraded, not fatal).
    ResultNotClosed { open_segments: usize },
}

/// State of the operation after `perform`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Ready,
    Done,
    Failed,
}

/// A two-operand Boolean operation.
pub struct BooleanOperation {
    op: BoolOp,
    a: Shape,
    b: Shape,
    tol: Tolerance,
    check_arguments: bool,
    state: OperationState,
    warnings: Vec<Warning>,
    faults: Vec<Fault>,
    errors: Vec<BooleanError>,
    history: History,
    ds: Option<IntersectionDataset>,
    result: Option<Shape>,
}

impl BooleanOperation {
    pub fn new(op: BoolOp, a: Shape, b: Shape) -> Self {
        Self {
            op,
            a,
            b,
            tol: Tolerance::default(),
            check_arguments: true,
            state: OperationState::Ready,
            warnings: Vec::new(),
            faults: Vec::new(),
            errors: Vec::new(),
            history: History::new(),
            ds: None,
            result: None,
        }
    }

    /// Widen the coincidence tolerance for this operation only.
    pub fn with_fuzzy(mut self, fuzzy: f64) -> Self {
        self.tol = Tolerance::with_fuzzy(fuzzy);
        self
    }

    /// Skip the argument pre-check (callers that already validated input).
    pub fn without_argument_check(mut self) -> Self {
        self.check_arguments = false;
        self
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Analyzer faults from the argument-check stage.
    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }

    pub fn errors(&self) -> &[BooleanError] {
        &self.errors
    }

    pub fn result(&self) -> Option<&Shape> {
        self.result.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// The intersection dataset, available read-only after `perform`.
    pub fn dataset(&self) -> Option<&IntersectionDataset> {
        self.ds.as_ref()
    }

    /// Run the operation with a silent progress monitor.
    pub fn perform(&mut self, store: &mut EntityStore) -> Result<Shape, BooleanError> {
        let mut silent = SilentProgress;
        self.perform_with(store, &mut silent)
    }

    /// Run the operation, polling `progress` between stages.
    #[instrument(skip_all, fields(op = ?self.op))]
    pub fn perform_with(
        &mut self,
        store: &mut EntityStore,
        progress: &mut dyn ProgressMonitor,
    ) -> Result<Shape, BooleanError> {
        self.warnings.clear();
        self.faults.clear();
        self.errors.clear();
        self.history = History::new();
        self.result = None;

        let result = self.run_pipeline(store, progress);
        match &result {
            Ok(shape) => {
                self.state = OperationState::Done;
                self.result = Some(shape.clone());
                info!(warnings = self.warnings.len(), "boolean operation done");
            }
            Err(err) => {
                self.state = OperationState::Failed;
                self.errors.push(err.clone());
                warn!(error = %err, "boolean operation failed");
            }
        }
        result
    }

    fn run_pipeline(
        &mut self,
        store: &mut EntityStore,
        progress: &mut dyn ProgressMonitor,
    ) -> Result<Shape, BooleanError> {
        let enter = |p: &mut dyn ProgressMonitor, stage: Stage| -> Result<(), BooleanError> {
            p.enter_stage(stage);
            if p.should_abort() {
                Err(BooleanError::Aborted)
            } else {
                Ok(())
            }
        };

        if self.check_arguments {
            enter(progress, Stage::ArgumentCheck)?;
            let mut analyzer = ArgumentAnalyzer::new(Default::default(), self.tol);
            analyzer.perform(store, &[&self.a, &self.b]);
            self.faults = analyzer.faults().to_vec();
            if analyzer.has_errors() {
                return Err(BooleanError::ArgumentsRejected {
                    fault_count: self.faults.len(),
                });
            }
        }

        // Degenerate operands resolve without the pipeline.
        if let Some(shortcut) = self.empty_operand_shortcut() {
            return Ok(shortcut);
        }

        enter(progress, Stage::DsFilling)?;
        let mut ds = IntersectionDataset::init(store, &self.a, &self.b, self.tol);

        enter(progress, Stage::IntersectionVV)?;
        filler::perform_vv(&mut ds, store);
        enter(progress, Stage::IntersectionVE)?;
        filler::perform_ve(&mut ds, store);
        enter(progress, Stage::IntersectionEE)?;
        filler::perform_ee(&mut ds, store, &mut self.warnings);
        enter(progress, Stage::IntersectionVF)?;
        filler::perform_vf(&mut ds, store);
        enter(progress, Stage::IntersectionEF)?;
        filler::perform_ef(&mut ds, store, &mut self.warnings);
        enter(progress, Stage::IntersectionFF)?;
        filler::perform_ff(&mut ds, store, &mut self.warnings);

        enter(progress, Stage::Building)?;
        let shape = if self.op == BoolOp::Section {
            self.build_section(store, &mut ds)
        } else {
            self.build_boolean(store, &mut ds)?
        };

        enter(progress, Stage::PostProcess)?;
        self.post_process(store, &mut ds, &shape)?;

        self.ds = Some(ds);
        Ok(shape)
    }

    fn empty_operand_shortcut(&self) -> Option<Shape> {
        let a_empty = self.a.is_empty();
        let b_empty = self.b.is_empty();
        if !a_empty && !b_empty {
            return None;
        }
        let shape = match self.op {
            BoolOp::Fuse => {
                if a_empty && b_empty {
                    Shape::empty_compound()
                } else if a_empty {
                    self.b.clone()
                } else {
                    self.a.clone()
                }
            }
            // Subtracting nothing changes nothing; subtracting from nothing
            // leaves nothing.
            BoolOp::Cut => {
                if a_empty {
                    Shape::empty_compound()
                } else {
                    self.a.clone()
                }
            }
            BoolOp::Common | BoolOp::Section => Shape::empty_compound(),
        };
        Some(shape)
    }

    // ── Building ───────────────────────────────────────────────────────────

    fn build_boolean(
        &mut self,
        store: &mut EntityStore,
        ds: &mut IntersectionDataset,
    ) -> Result<Shape, BooleanError> {
        let splitting = splitting_planes(ds, store);
        let faces_a: Vec<FaceId> = self.a.faces(store);
        let faces_b: Vec<FaceId> = self.b.faces(store);

        let mut builder = SolidBuilder::new(1e-6);
        let mut kept_sources: Vec<usize> = Vec::new();

        for (tag, own_faces, other_faces) in [
            (OperandTag::A, &faces_a, &faces_b),
            (OperandTag::B, &faces_b, &faces_a),
        ] {
            for &face_id in own_faces {
                let Some(face_idx) = ds.index_of_face(face_id) else {
                    continue;
                };
                // A sub-shape shared by both operands is processed once, as
                // part of operand A.
                if tag == OperandTag::B && ds.info(face_idx).from_a {
                    continue;
                }
                let face = &store.faces[face_id];
                if face.surface.is_planar() {
                    let kept = self.process_planar_face(
                        store,
                        ds,
                        &splitting,
                        face_idx,
                        face_id,
                        tag,
                        other_faces,
                        &mut builder,
                    );
                    if kept {
                        kept_sources.push(face_idx);
                    }
                } else {
                    let kept = self.process_curved_face(
                        store,
                        face_idx,
                        face_id,
                        tag,
                        other_faces,
                        &mut builder,
                    );
                    if kept {
                        kept_sources.push(face_idx);
                    }
                }
            }
        }

        let build = builder.build(store);
        for (source, new_face) in &build.face_origins {
            self.history.add_modified(*source, SubShape::Face(*new_face));
        }
        for tag in [OperandTag::A, OperandTag::B] {
            for face_idx in ds.faces_of(tag) {
                if !kept_sources.contains(&face_idx) {
                    self.history.set_deleted(face_idx);
                }
            }
        }

        Ok(solids_to_shape(build.solids))
    }

    /// Split one planar face by the section planes and feed the surviving
    /// patches to the solid builder. Returns whether anything was kept.
    #[allow(clippy::too_many_arguments)]
    fn process_planar_face(
        &mut self,
        store: &EntityStore,
        ds: &IntersectionDataset,
        splitting: &HashMap<usize, Vec<crate::geometry::surfaces::Plane>>,
        face_idx: usize,
        face_id: FaceId,
        tag: OperandTag,
        other_faces: &[FaceId],
        builder: &mut SolidBuilder,
    ) -> bool {
        let points = store.face_points(face_id);
        let Some(ring) = Polygon3d::new(points) else {
            self.warnings.push(Warning::FaceNotSplit { index: face_idx });
            return false;
        };
        if !store.faces[face_id].inner_loops.is_empty() {
            // Holes survive untouched faces but block splitting.
            if splitting.contains_key(&face_idx) {
                self.warnings.push(Warning::FaceNotSplit { index: face_idx });
            }
        }
        let patch = FacePatch {
            source: face_idx,
            ring,
            tolerance: ds.info(face_idx).tolerance,
        };
        let planes = splitting.get(&face_idx).cloned().unwrap_or_default();
        let pieces = split_patch_by_planes(&patch, &planes, self.tol.merge_distance());

        let mut kept_any = false;
        for piece in pieces {
            let probe = piece.ring.centroid();
            let class = classify_point(store, other_faces, &probe, &self.tol);
            let keep = match (self.op, tag, class) {
                (BoolOp::Fuse, _, PointClass::Outside) => Keep::AsIs,
                (BoolOp::Common, _, PointClass::Inside) => Keep::AsIs,
                (BoolOp::Cut, OperandTag::A, PointClass::Outside) => Keep::AsIs,
                (BoolOp::Cut, OperandTag::B, PointClass::Inside) => Keep::Reversed,
                (_, OperandTag::A, PointClass::OnBoundary) => {
                    let agrees = classify::boundary_normal_agrees(
                        store,
                        other_faces,
                        &probe,
                        &piece.ring.normal,
                        &self.tol,
                    );
                    match (self.op, agrees) {
                        (BoolOp::Fuse, true) | (BoolOp::Common, true) => Keep::AsIs,
                        (BoolOp::Cut, false) => Keep::AsIs,
                        _ => Keep::No,
                    }
                }
                _ => Keep::No,
            };
            match keep {
                Keep::AsIs => {
                    builder.add_patch(piece);
                    kept_any = true;
                }
                Keep::Reversed => {
                    builder.add_patch(piece.reversed());
                    kept_any = true;
                }
                Keep::No => {}
            }
        }
        kept_any
    }

    /// Whole-face classification for faces the splitter cannot carve
    /// (curved surfaces): sample the surface and take the majority.
    fn process_curved_face(
        &mut self,
        store: &EntityStore,
        face_idx: usize,
        face_id: FaceId,
        tag: OperandTag,
        other_faces: &[FaceId],
        builder: &mut SolidBuilder,
    ) -> bool {
        let surface = store.faces[face_id].surface.clone();
        let samples = sample_surface(&surface);
        let mut inside = 0usize;
        let mut outside = 0usize;
        for p in &samples {
            match classify_point(store, other_faces, p, &self.tol) {
                PointClass::Inside => inside += 1,
                PointClass::Outside => outside += 1,
                PointClass::OnBoundary => {}
            }
        }
        if inside > 0 && outside > 0 {
            // Partially overlapping curved pair: classified as a whole,
            // with degraded fidelity.
            self.warnings.push(Warning::FaceNotSplit { index: face_idx });
        }
        let class = if inside > outside {
            PointClass::Inside
        } else {
            PointClass::Outside
        };
        let keep = match (self.op, tag, class) {
            (BoolOp::Fuse, _, PointClass::Outside) => Keep::AsIs,
            (BoolOp::Common, _, PointClass::Inside) => Keep::AsIs,
            (BoolOp::Cut, OperandTag::A, PointClass::Outside) => Keep::AsIs,
            (BoolOp::Cut, OperandTag::B, PointClass::Inside) => Keep::Reversed,
            _ => Keep::No,
        };
        match keep {
            Keep::AsIs => {
                builder.add_curved_face(face_id, false, face_idx);
                true
            }
            Keep::Reversed => {
                builder.add_curved_face(face_id, true, face_idx);
                true
            }
            Keep::No => false,
        }
    }

    /// Assemble the section result: edges for every section segment and
    /// curve, vertices for point tangencies.
    fn build_section(&mut self, store: &mut EntityStore, ds: &mut IntersectionDataset) -> Shape {
        let mut children: Vec<Shape> = Vec::new();
        let records: Vec<_> = ds
            .interferences_of(InterferenceKind::FF)
            .into_iter()
            .cloned()
            .collect();

        for rec in records {
            match rec.locus {
                Locus::Segment(p_lo, p_hi) => {
                    let iv_lo = ds.add_intersection_vertex(store, p_lo, rec.tolerance);
                    let iv_hi = ds.add_intersection_vertex(store, p_hi, rec.tolerance);
                    let length = p_lo.distance_to(&p_hi);
                    let Some(line) = Line3d::from_points(p_lo, p_hi) else {
                        continue;
                    };
                    let edge = store.edges.insert(Edge {
                        curve: Curve::Line(line),
                        first: 0.0,
                        last: length,
                        start_vertex: ds.vertex_id(iv_lo).expect("section vertex"),
                        end_vertex: ds.vertex_id(iv_hi).expect("section vertex"),
                        tolerance: rec.tolerance,
                    });
                    self.history.add_generated(rec.i1, SubShape::Edge(edge));
                    self.history.add_generated(rec.i2, SubShape::Edge(edge));
                    children.push(Shape::edge(edge));
                }
                Locus::Point(p) => {
                    let iv = ds.add_intersection_vertex(store, p, rec.tolerance);
                    let vid = ds.vertex_id(iv).expect("section vertex");
                    self.history.add_generated(rec.i1, SubShape::Vertex(vid));
                    self.history.add_generated(rec.i2, SubShape::Vertex(vid));
                    children.push(Shape::vertex(vid));
                }
                Locus::Curve(ref curve) => {
                    if let Curve::Circle(circle) = curve {
                        let anchor = circle.evaluate(0.0);
                        let iv = ds.add_intersection_vertex(store, anchor, rec.tolerance);
                        let vid = ds.vertex_id(iv).expect("section vertex");
                        let edge = store.edges.insert(Edge {
                            curve: curve.clone(),
                            first: 0.0,
                            last: 2.0 * std::f64::consts::PI,
                            start_vertex: vid,
                            end_vertex: vid,
                            tolerance: rec.tolerance,
                        });
                        self.history.add_generated(rec.i1, SubShape::Edge(edge));
                        self.history.add_generated(rec.i2, SubShape::Edge(edge));
                        children.push(Shape::edge(edge));
                    }
                }
            }
        }

        Shape::compound(children)
    }

    // ── Post-processing ────────────────────────────────────────────────────

    fn post_process(
        &mut self,
        store: &mut EntityStore,
        ds: &mut IntersectionDataset,
        result: &Shape,
    ) -> Result<(), BooleanError> {
        // Consume pave blocks: split every touched edge into sub-edges.
        for edge_idx in ds.touched_edges() {
            let Some(edge_id) = ds.edge_id(edge_idx) else {
                continue;
            };
            let edge = store.edges[edge_id].clone();
            let blocks = match ds.pave_set(edge_idx) {
                Some(set) => set.blocks(),
                None => continue,
            };
            for block in blocks {
                let (first, last) = block.range();
                let start_vertex = ds.vertex_id(block.pave1.vertex);
                let end_vertex = ds.vertex_id(block.pave2.vertex);
                let (Some(sv), Some(ev)) = (start_vertex, end_vertex) else {
                    continue;
                };
                let sub_edge = store.edges.insert(Edge {
                    curve: edge.curve.clone(),
                    first,
                    last,
                    start_vertex: sv,
                    end_vertex: ev,
                    tolerance: edge
                        .tolerance
                        .max(block.pave1.tolerance)
                        .max(block.pave2.tolerance),
                });
                self.history.add_modified(edge_idx, SubShape::Edge(sub_edge));
            }
        }

        // Propagate interference tolerances onto the participants.
        let updates: Vec<(usize, f64)> = ds
            .interferences()
            .iter()
            .flat_map(|rec| [(rec.i1, rec.tolerance), (rec.i2, rec.tolerance)])
            .collect();
        for (idx, tolerance) in updates {
            ds.widen_tolerance(idx, tolerance);
        }

        // Audit the rebuilt boundary.
        let solids: Vec<SolidId> = result.solids();
        if !solids.is_empty() {
            let mut faces = Vec::new();
            for solid in &solids {
                faces.extend(store.solid_faces(*solid));
            }
            let audit = audit_closure(store, &faces, 1e-6);
            if audit.non_manifold_segments > 0 {
                return Err(BooleanError::NonManifoldResult {
                    segments: audit.non_manifold_segments,
                });
            }
            if audit.open_segments > 0 {
                self.warnings.push(Warning::ResultNotClosed {
                    open_segments: audit.open_segments,
                });
            }
        }
        Ok(())
    }
}

enum Keep {
    No,
    AsIs,
    Reversed,
}

/// Section planes per face index, from the transversal FF records.
fn splitting_planes(
    ds: &IntersectionDataset,
    store: &EntityStore,
) -> HashMap<usize, Vec<crate::geometry::surfaces::Plane>> {
    let mut out: HashMap<usize, Vec<crate::geometry::surfaces::Plane>> = HashMap::new();
    for rec in ds.interferences_of(InterferenceKind::FF) {
        if !matches!(rec.locus, Locus::Segment(_, _)) {
            continue;
        }
        for (this, other) in [(rec.i1, rec.i2), (rec.i2, rec.i1)] {
            let Some(other_face) = ds.face_id(other) else {
                continue;
            };
            if let Surface::Plane(plane) = &store.faces[other_face].surface {
                out.entry(this).or_default().push(*plane);
            }
        }
    }
    out
}

/// Sample points spread over a curved surface for whole-face classification.
fn sample_surface(surface: &Surface) -> Vec<Point3d> {
    let mut out = Vec::new();
    let two_pi = 2.0 * std::f64::consts::PI;
    match surface {
        Surface::Sphere(_) => {
            for iu in 0..4 {
                for iv in -1..=1 {
                    let u = iu as f64 * two_pi / 4.0;
                    let v = iv as f64 * std::f64::consts::FRAC_PI_4;
                    out.push(surface.evaluate(u, v));
                }
            }
        }
        Surface::Cylinder(_) | Surface::Cone(_) => {
            for iu in 0..4 {
                for iv in -1..=1 {
                    let u = iu as f64 * two_pi / 4.0;
                    out.push(surface.evaluate(u, iv as f64));
                }
            }
        }
        Surface::Plane(_) => out.push(surface.evaluate(0.0, 0.0)),
    }
    out
}

fn solids_to_shape(solids: Vec<SolidId>) -> Shape {
    match solids.len() {
        0 => Shape::empty_compound(),
        1 => Shape::solid(solids[0]),
        _ => Shape::compound(solids.into_iter().map(Shape::solid).collect()),
    }
}

// ─── Engine trait ───────────────────────────────────────────────────────────

/// Trait surface for Boolean backends, so alternative engines or mocks can
/// be slotted in behind the same calls.
pub trait BooleanEngine {
    fn fuse(&self, store: &mut EntityStore, a: &Shape, b: &Shape) -> Result<Shape, BooleanError>;
    fn common(&self, store: &mut EntityStore, a: &Shape, b: &Shape)
        -> Result<Shape, BooleanError>;
    fn cut(&self, store: &mut EntityStore, a: &Shape, b: &Shape) -> Result<Shape, BooleanError>;
    fn section(&self, store: &mut EntityStore, a: &Shape, b: &Shape)
        -> Result<Shape, BooleanError>;
}

/// Default engine backed by `BooleanOperation`.
pub struct DefaultBooleanEngine;

impl DefaultBooleanEngine {
    fn run(
        op: BoolOp,
        store: &mut EntityStore,
        a: &Shape,
        b: &Shape,
    ) -> Result<Shape, BooleanError> {
        BooleanOperation::new(op, a.clone(), b.clone()).perform(store)
    }
}

impl BooleanEngine for DefaultBooleanEngine {
    fn fuse(&self, store: &mut EntityStore, a: &Shape, b: &Shape) -> Result<Shape, BooleanError> {
        Self::run(BoolOp::Fuse, store, a, b)
    }

    fn common(
        &self,
        store: &mut EntityStore,
        a: &Shape,
        b: &Shape,
    ) -> Result<Shape, BooleanError> {
        Self::run(BoolOp::Common, store, a, b)
    }

    fn cut(&self, store: &mut EntityStore, a: &Shape, b: &Shape) -> Result<Shape, BooleanError> {
        Self::run(BoolOp::Cut, store, a, b)
    }

    fn section(
        &self,
        store: &mut EntityStore,
        a: &Shape,
        b: &Shape,
    ) -> Result<Shape, BooleanError> {
        Self::run(BoolOp::Section, store, a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::primitives::make_box;

    #[test]
    fn fuse_of_disjoint_boxes_is_a_compound() {
        let mut store = EntityStore::new();
        let a = make_box(&mut store, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let b = make_box(&mut store, 5.0, 0.0, 0.0, 6.0, 1.0, 1.0);
        let mut op = BooleanOperation::new(BoolOp::Fuse, Shape::solid(a), Shape::solid(b));
        let result = op.perform(&mut store).unwrap();
        assert_eq!(result.solids().len(), 2);
        assert_eq!(op.state(), OperationState::Done);
        assert!(!op.has_errors());
    }

    #[test]
    fn common_of_disjoint_boxes_is_empty_not_an_error() {
        let mut store = EntityStore::new();
        let a = make_box(&mut store, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let b = make_box(&mut store, 5.0, 0.0, 0.0, 6.0, 1.0, 1.0);
        let mut op = BooleanOperation::new(BoolOp::Common, Shape::solid(a), Shape::solid(b));
        let result = op.perform(&mut store).unwrap();
        assert!(result.is_empty());
        assert!(!op.has_errors());
    }

    #[test]
    fn cut_by_empty_compound_returns_the_operand() {
        let mut store = EntityStore::new();
        let a = make_box(&mut store, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0);
        let mut op = BooleanOperation::new(BoolOp::Cut, Shape::solid(a), Shape::empty_compound());
        let result = op.perform(&mut store).unwrap();
        assert_eq!(result.solids(), vec![a]);
    }

    #[test]
    fn progress_monitor_sees_stages_in_order() {
        let mut store = EntityStore::new();
        let a = make_box(&mut store, 0.0, 0.0, 0.0, 2.0, 1.0, 1.0);
        let b = make_box(&mut store, 1.0, 0.0, 0.0, 3.0, 1.0, 1.0);
        let mut op = BooleanOperation::new(BoolOp::Common, Shape::solid(a), Shape::solid(b));
        let mut monitor = RecordingProgress::default();
        op.perform_with(&mut store, &mut monitor).unwrap();
        assert_eq!(monitor.stages.first(), Some(&Stage::ArgumentCheck));
        assert_eq!(monitor.stages.last(), Some(&Stage::PostProcess));
        let ff_pos = monitor
            .stages
            .iter()
            .position(|s| *s == Stage::IntersectionFF)
            .unwrap();
        let ee_pos = monitor
            .stages
            .iter()
            .position(|s| *s == Stage::IntersectionEE)
            .unwrap();
        assert!(ee_pos < ff_pos, "EE must resolve before FF");
    }

    #[test]
    fn abort_between_stages_fails_the_operation() {
        let mut store = EntityStore::new();
        let a = make_box(&mut store, 0.0, 0.0, 0.0, 2.0, 1.0, 1.0);
        let b = make_box(&mut store, 1.0, 0.0, 0.0, 3.0, 1.0, 1.0);
        let mut op = BooleanOperation::new(BoolOp::Fuse, Shape::solid(a), Shape::solid(b));
        let mut monitor = RecordingProgress {
            stages: vec![],
            abort_after: Some(2),
        };
        let result = op.perform_with(&mut store, &mut monitor);
        assert!(matches!(result, Err(BooleanError::Aborted)));
        assert_eq!(op.state(), OperationState::Failed);
        assert!(op.has_errors());
    }

    #[test]
    fn engine_trait_round_trip() {
        let mut store = EntityStore::new();
        let a = make_box(&mut store, 0.0, 0.0, 0.0, 2.0, 2.0, 2.0);
        let b = make_box(&mut store, 5.0, 5.0, 5.0, 6.0, 6.0, 6.0);
        let engine = DefaultBooleanEngine;
        let fused = engine
            .fuse(&mut store, &Shape::solid(a), &Shape::solid(b))
            .unwrap();
        assert_eq!(fused.solids().len(), 2);
    }
}

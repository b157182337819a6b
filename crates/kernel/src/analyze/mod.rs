//! Pre-check layer validating operand shapes before the Boolean pipeline.
//!
//! Runs a configurable set of checks over the inputs and accumulates a
//! per-shape fault report without mutating anything. Designed to fail fast
//! on malformed input so the expensive pipeline never sees it.

use tracing::{info, instrument};

use crate::algo::filler::{clip_line_to_polygon, intersect_intervals};
use crate::geometry::curves::Curve;
use crate::geometry::surfaces::Surface;
use crate::intersect::{surface_surface, SurfaceSection};
use crate::topology::brep::{audit_closure, EdgeId, EntityStore, FaceId, SolidId, VertexId};
use crate::topology::shape::Shape;
use crate::Tolerance;

/// The individual checks the analyzer can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    /// Faces of one operand intersect each other away from shared boundary.
    SelfInterference,
    /// An edge is shorter than the coincidence tolerance.
    SmallEdge,
    /// An entity tolerance exceeds the configured maximum.
    ExcessiveTolerance,
    /// An edge's end vertices do not sit on its curve.
    VertexOffCurve,
    /// A boundary edge does not lie on its face's surface.
    CurveOffSurface,
    /// The shell of a solid is open or non-manifold.
    OpenShell,
    /// The operand contains no geometry.
    EmptyOperand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultSeverity {
    /// The pipeline would produce garbage; the operation is rejected.
    Error,
    /// Suspicious but workable input.
    Warning,
}

/// Store entity a fault refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultEntity {
    Vertex(VertexId),
    Edge(EdgeId),
    Face(FaceId),
    Solid(SolidId),
    Operand(usize),
}

/// One accumulated finding.
#[derive(Debug, Clone)]
pub struct Fault {
    pub check: CheckKind,
    pub severity: FaultSeverity,
    /// Index of the operand the fault belongs to.
    pub operand: usize,
    pub entity: FaultEntity,
}

/// Which checks to run and their thresholds.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    pub self_interference: bool,
    pub small_edge: bool,
    pub excessive_tolerance: bool,
    pub vertex_off_curve: bool,
    pub curve_off_surface: bool,
    pub open_shell: bool,
    pub max_tolerance: f64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            self_interference: true,
            small_edge: true,
            excessive_tolerance: true,
            vertex_off_curve: true,
            curve_off_surface: true,
            open_shell: true,
            max_tolerance: 1e-3,
        }
    }
}

/// The pre-check pass.
pub struct ArgumentAnalyzer {
    config: AnalyzerConfig,
    tol: Tolerance,
    faults: Vec<Fault>,
}

impl ArgumentAnalyzer {
    pub fn new(config: AnalyzerConfig, tol: Tolerance) -> Self {
        Self {
            config,
            tol,
            faults: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(AnalyzerConfig::default(), Tolerance::default())
    }

    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }

    pub fn has_faults(&self) -> bool {
        !self.faults.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.faults
            .iter()
            .any(|f| f.severity == FaultSeverity::Error)
    }

    /// Run every enabled check over the operands. Inputs are not mutated.
    #[instrument(skip_all)]
    pub fn perform(&mut self, store: &EntityStore, operands: &[&Shape]) -> &[Fault] {
        self.faults.clear();

        for (op_idx, shape) in operands.iter().enumerate() {
            if shape.is_empty() {
                self.faults.push(Fault {
                    check: CheckKind::EmptyOperand,
                    severity: FaultSeverity::Warning,
                    operand: op_idx,
                    entity: FaultEntity::Operand(op_idx),
                });
                continue;
            }

            let faces = shape.faces(store);
            let edges = collect_edges(store, &faces);

            if self.config.small_edge || self.config.vertex_off_curve {
                self.check_edges(store, op_idx, &edges);
            }
            if self.config.excessive_tolerance {
                self.check_tolerances(store, op_idx, &faces, &edges);
            }
            if self.config.curve_off_surface {
                self.check_curve_on_surface(store, op_idx, &faces);
            }
            if self.config.open_shell {
                for solid in shape.solids() {
                    let solid_faces = store.solid_faces(solid);
                    let audit = audit_closure(store, &solid_faces, 1e-6);
                    if !audit.is_closed() {
                        self.faults.push(Fault {
                            check: CheckKind::OpenShell,
                            severity: FaultSeverity::Error,
                            operand: op_idx,
                            entity: FaultEntity::Solid(solid),
                        });
                    }
                }
            }
            if self.config.self_interference {
                self.check_self_interference(store, op_idx, &faces);
            }
        }

        info!(
            fault_count = self.faults.len(),
            errors = self.has_errors(),
            "argument analysis complete"
        );
        &self.faults
    }

    fn check_edges(&mut self, store: &EntityStore, op_idx: usize, edges: &[EdgeId]) {
        let merge = self.tol.merge_distance();
        for &edge_id in edges {
            let edge = &store.edges[edge_id];
            let p_first = edge.curve.evaluate(edge.first);
            let p_last = edge.curve.evaluate(edge.last);

            if self.config.small_edge && p_first.distance_to(&p_last) < merge {
                self.faults.push(Fault {
                    check: CheckKind::SmallEdge,
                    severity: FaultSeverity::Warning,
                    operand: op_idx,
                    entity: FaultEntity::Edge(edge_id),
                });
            }

            if self.config.vertex_off_curve {
                let sv = &store.vertices[edge.start_vertex];
                let ev = &store.vertices[edge.end_vertex];
                let budget_s = (edge.tolerance + sv.tolerance).max(merge);
                let budget_e = (edge.tolerance + ev.tolerance).max(merge);
                if sv.point.distance_to(&p_first) > budget_s
                    || ev.point.distance_to(&p_last) > budget_e
                {
                    self.faults.push(Fault {
                        check: CheckKind::VertexOffCurve,
                        severity: FaultSeverity::Error,
                        operand: op_idx,
                        entity: FaultEntity::Edge(edge_id),
                    });
                }
            }
        }
    }

    fn check_tolerances(
        &mut self,
        store: &EntityStore,
        op_idx: usize,
        faces: &[FaceId],
        edges: &[EdgeId],
    ) {
        let max = self.config.max_tolerance;
        for &face_id in faces {
            if store.faces[face_id].tolerance > max {
                self.faults.push(Fault {
                    check: CheckKind::ExcessiveTolerance,
                    severity: FaultSeverity::Warning,
                    operand: op_idx,
                    entity: FaultEntity::Face(face_id),
                });
            }
        }
        for &edge_id in edges {
            if store.edges[edge_id].tolerance > max {
                self.faults.push(Fault {
                    check: CheckKind::ExcessiveTolerance,
                    severity: FaultSeverity::Warning,
                    operand: op_idx,
                    entity: FaultEntity::Edge(edge_id),
                });
            }
        }
    }

    fn check_curve_on_surface(&mut self, store: &EntityStore, op_idx: usize, faces: &[FaceId]) {
        for &face_id in faces {
            let face = &store.faces[face_id];
            let plane = match &face.surface {
                Surface::Plane(p) => *p,
                _ => continue,
            };
            let mut loop_ids = vec![face.outer_loop];
            loop_ids.extend(face.inner_loops.iter().copied());
            for loop_id in loop_ids {
                if !store.loops.contains_key(loop_id) {
                    continue;
                }
                for eu in &store.loops[loop_id].edges {
                    let edge = &store.edges[eu.edge];
                    let mid = edge.curve.evaluate((edge.first + edge.last) * 0.5);
                    let budget =
                        (edge.tolerance + face.tolerance).max(self.tol.merge_distance());
                    if plane.signed_distance(&mid).abs() > budget {
                        self.faults.push(Fault {
                            check: CheckKind::CurveOffSurface,
                            severity: FaultSeverity::Error,
                            operand: op_idx,
                            entity: FaultEntity::Edge(eu.edge),
                        });
                    }
                }
            }
        }
    }

    /// Planar faces of the same operand must not cross away from their
    /// shared boundary edges.
    fn check_self_interference(&mut self, store: &EntityStore, op_idx: usize, faces: &[FaceId]) {
        let merge = self.tol.merge_distance();
        for i in 0..faces.len() {
            for j in i + 1..faces.len() {
                let (fa, fb) = (faces[i], faces[j]);
                if shares_an_edge(store, fa, fb) {
                    continue;
                }
                let (pa, pb) = match (&store.faces[fa].surface, &store.faces[fb].surface) {
                    (Surface::Plane(a), Surface::Plane(b)) => (*a, *b),
                    _ => continue,
                };
                let section = surface_surface(
                    &Surface::Plane(pa),
                    &Surface::Plane(pb),
                    &self.tol,
                );
                let SurfaceSection::Curve {
                    curve: Curve::Line(line),
                    ..
                } = section
                else {
                    continue;
                };
                let ia = clip_line_to_polygon(&line, &store.face_points(fa), &pa, merge);
                let ib = clip_line_to_polygon(&line, &store.face_points(fb), &pb, merge);
                let common = intersect_intervals(&ia, &ib, merge);
                // A genuine crossing has positive length well beyond the
                // corner-touch tolerance.
                if common.iter().any(|(lo, hi)| hi - lo > merge * 10.0) {
                    self.faults.push(Fault {
                        check: CheckKind::SelfInterference,
                        severity: FaultSeverity::Error,
                        operand: op_idx,
                        entity: FaultEntity::Face(fa),
                    });
                }
            }
        }
    }
}

fn collect_edges(store: &EntityStore, faces: &[FaceId]) -> Vec<EdgeId> {
    let mut out = Vec::new();
    for &face_id in faces {
        let face = &store.faces[face_id];
        let mut loop_ids = vec![face.outer_loop];
        loop_ids.extend(face.inner_loops.iter().copied());
        for loop_id in loop_ids {
            if !store.loops.contains_key(loop_id) {
                continue;
            }
            for eu in &store.loops[loop_id].edges {
                if !out.contains(&eu.edge) {
                    out.push(eu.edge);
                }
            }
        }
    }
    out
}

fn shares_an_edge(store: &EntityStore, a: FaceId, b: FaceId) -> bool {
    let edges_a = collect_edges(store, &[a]);
    let edges_b = collect_edges(store, &[b]);
    edges_a.iter().any(|e| edges_b.contains(e))
}

//! Interference detection stages.
//!
//! The stages run in strictly increasing dimension pairs (VV, VE, EE, VF,
//! EF, FF) so that every stage can reuse the vertices and paves the lower
//! stages already put into the dataset. Face/face candidate pairs are
//! evaluated in parallel; all dataset writes happen serially afterwards.

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::dataset::{
    Interference, InterferenceKind, IntersectionDataset, Locus, OperandTag, Pave,
};
use crate::geometry::curves::{Curve, Line3d};
use crate::geometry::intersection::{point_in_polygon_2d, polygon_boundary_distance_2d};
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::{Plane, Surface};
use crate::intersect::{
    surface_surface, CurveCurveIntersector, CurveSurfaceIntersector, NotDoneReason, Status,
    SurfaceSection,
};
use crate::topology::brep::{EntityStore, FaceId};

use super::Warning;

/// Vertex/vertex interferences between the two operands.
#[instrument(skip_all)]
pub(crate) fn perform_vv(ds: &mut IntersectionDataset, store: &EntityStore) {
    let tol = *ds.tolerance();
    let va = ds.vertices_of(OperandTag::A);
    let vb = ds.vertices_of(OperandTag::B);
    let mut found = Vec::new();

    for &ia in &va {
        for &ib in &vb {
            if ia == ib {
                // Shared geometry was merged at indexing time.
                continue;
            }
            let pa = store.vertices[ds.vertex_id(ia).expect("vertex index")].point;
            let pb = store.vertices[ds.vertex_id(ib).expect("vertex index")].point;
            let d = pa.distance_to(&pb);
            let threshold = ds.info(ia).tolerance + ds.info(ib).tolerance + tol.fuzzy;
            if d < threshold.max(tol.coincidence) {
                found.push(Interference::new(
                    InterferenceKind::VV,
                    ia,
                    ib,
                    Locus::Point(pa.midpoint(&pb)),
                    d * 0.5,
                    ds.info(ia).tolerance,
                    ds.info(ib).tolerance,
                ));
            }
        }
    }

    debug!(count = found.len(), "vertex/vertex interferences");
    for rec in found {
        ds.add_interference(rec);
    }
}

/// Vertex/edge interferences; each hit puts a pave on the edge.
#[instrument(skip_all)]
pub(crate) fn perform_ve(ds: &mut IntersectionDataset, store: &EntityStore) {
    let tol = *ds.tolerance();
    let mut found = Vec::new();

    for (v_tag, e_tag) in [(OperandTag::A, OperandTag::B), (OperandTag::B, OperandTag::A)] {
        for &iv in &ds.vertices_of(v_tag) {
            let vid = ds.vertex_id(iv).expect("vertex index");
            let point = store.vertices[vid].point;
            for &ie in &ds.edges_of(e_tag) {
                let eid = ds.edge_id(ie).expect("edge index");
                let edge = &store.edges[eid];
                if ds.index_of_vertex(edge.start_vertex) == Some(iv)
                    || ds.index_of_vertex(edge.end_vertex) == Some(iv)
                {
                    continue;
                }
                if !ds.info(ie).bbox.expanded(tol.merge_distance()).contains_point(&point) {
                    continue;
                }
                let t = edge.curve.project(&point).clamp(edge.first, edge.last);
                let on_curve = edge.curve.evaluate(t);
                let d = point.distance_to(&on_curve);
                let threshold =
                    (ds.info(iv).tolerance + ds.info(ie).tolerance + tol.fuzzy).max(tol.coincidence);
                if d < threshold {
                    found.push((iv, ie, t, d, on_curve));
                }
            }
        }
    }

    debug!(count = found.len(), "vertex/edge interferences");
    for (iv, ie, t, d, locus) in found {
        ds.add_interference(Interference::new(
            InterferenceKind::VE,
            iv,
            ie,
            Locus::Point(locus),
            d,
            ds.info(iv).tolerance,
            ds.info(ie).tolerance,
        ));
        let pave_tol = ds.info(iv).tolerance.max(d);
        ds.pave_set_mut(store, ie).insert(
            Pave {
                vertex: iv,
                t,
                tolerance: pave_tol,
            },
            tol.merge_distance(),
        );
    }
}

/// Edge/edge interferences; crossings create new intersection vertices and
/// paves on both edges.
#[instrument(skip_all)]
pub(crate) fn perform_ee(
    ds: &mut IntersectionDataset,
    store: &mut EntityStore,
    warnings: &mut Vec<Warning>,
) {
    let tol = *ds.tolerance();
    let ea = ds.edges_of(OperandTag::A);
    let eb = ds.edges_of(OperandTag::B);

    for &ia in &ea {
        for &ib in &eb {
            if ia == ib {
                continue;
            }
            let margin = ds.info(ia).tolerance + ds.info(ib).tolerance + tol.merge_distance();
            if !ds.info(ia).bbox.expanded(margin).intersects(&ds.info(ib).bbox) {
                continue;
            }
            let e1 = store.edges[ds.edge_id(ia).expect("edge index")].clone();
            let e2 = store.edges[ds.edge_id(ib).expect("edge index")].clone();

            let mut ix = CurveCurveIntersector::new(
                &e1.curve,
                (e1.first, e1.last),
                &e2.curve,
                (e2.first, e2.last),
                tol,
            );
            match ix.perform() {
                Status::Done => {
                    let points: Vec<_> = ix.points().to_vec();
                    for hit in points {
                        let iv = ds.add_intersection_vertex(
                            store,
                            hit.point,
                            hit.achieved_tolerance,
                        );
                        ds.add_interference(Interference::new(
                            InterferenceKind::EE,
                            ia,
                            ib,
                            Locus::Point(hit.point),
                            hit.achieved_tolerance,
                            ds.info(ia).tolerance,
                            ds.info(ib).tolerance,
                        ));
                        let pave_tol = ds.info(iv).tolerance;
                        ds.pave_set_mut(store, ia).insert(
                            Pave {
                                vertex: iv,
                                t: hit.t1.clamp(e1.first, e1.last),
                                tolerance: pave_tol,
                            },
                            tol.merge_distance(),
                        );
                        ds.pave_set_mut(store, ib).insert(
                            Pave {
                                vertex: iv,
                                t: hit.t2.clamp(e2.first, e2.last),
                                tolerance: pave_tol,
                            },
                            tol.merge_distance(),
                        );
                    }
                }
                Status::InfiniteSolutions => {
                    if let Some((lo, hi)) = ix.overlap_range() {
                        let p_lo = e1.curve.evaluate(lo);
                        let p_hi = e1.curve.evaluate(hi);
                        ds.add_interference(Interference::new(
                            InterferenceKind::EE,
                            ia,
                            ib,
                            Locus::Segment(p_lo, p_hi),
                            tol.coincidence,
                            ds.info(ia).tolerance,
                            ds.info(ib).tolerance,
                        ));
                        for p in [p_lo, p_hi] {
                            let iv = ds.add_intersection_vertex(store, p, tol.coincidence);
                            let pave_tol = ds.info(iv).tolerance;
                            let t1 = e1.curve.project(&p).clamp(e1.first, e1.last);
                            let t2 = e2.curve.project(&p).clamp(e2.first, e2.last);
                            ds.pave_set_mut(store, ia).insert(
                                Pave { vertex: iv, t: t1, tolerance: pave_tol },
                                tol.merge_distance(),
                            );
                            ds.pave_set_mut(store, ib).insert(
                                Pave { vertex: iv, t: t2, tolerance: pave_tol },
                                tol.merge_distance(),
                            );
                        }
                    }
                }
                Status::NotDone(reason) => {
                    if reason != NotDoneReason::DegenerateOperand {
                        warnings.push(Warning::PairNotResolved {
                            i1: ia,
                            i2: ib,
                            reason,
                        });
                    }
                }
            }
        }
    }
}

/// Vertex/face interferences (vertex strictly interior to the face).
#[instrument(skip_all)]
pub(crate) fn perform_vf(ds: &mut IntersectionDataset, store: &EntityStore) {
    let tol = *ds.tolerance();
    let merge = tol.merge_distance();
    let mut found = Vec::new();

    for (v_tag, f_tag) in [(OperandTag::A, OperandTag::B), (OperandTag::B, OperandTag::A)] {
        for &iv in &ds.vertices_of(v_tag) {
            let point = store.vertices[ds.vertex_id(iv).expect("vertex index")].point;
            for &f in &ds.faces_of(f_tag) {
                let face_id = ds.face_id(f).expect("face index");
                if !ds.info(f).bbox.expanded(merge).contains_point(&point) {
                    continue;
                }
                let threshold =
                    (ds.info(iv).tolerance + ds.info(f).tolerance + tol.fuzzy).max(tol.coincidence);
                if let Some(d) = distance_to_face_interior(store, face_id, &point, merge) {
                    if d < threshold {
                        found.push((iv, f, d, point));
                    }
                }
            }
        }
    }

    debug!(count = found.len(), "vertex/face interferences");
    for (iv, f, d, point) in found {
        ds.add_interference(Interference::new(
            InterferenceKind::VF,
            iv,
            f,
            Locus::Point(point),
            d,
            ds.info(iv).tolerance,
            ds.info(f).tolerance,
        ));
    }
}

/// Distance from a point to a face, `None` when the projection falls outside
/// the face or within `boundary_margin` of its boundary (boundary contacts
/// belong to the lower-dimension stages).
fn distance_to_face_interior(
    store: &EntityStore,
    face_id: FaceId,
    point: &Point3d,
    boundary_margin: f64,
) -> Option<f64> {
    let face = &store.faces[face_id];
    match &face.surface {
        Surface::Plane(plane) => {
            let d = plane.signed_distance(point).abs();
            let (px, py) = plane.parameters_of(point);
            let ring: Vec<(f64, f64)> = store
                .face_points(face_id)
                .iter()
                .map(|p| plane.parameters_of(p))
                .collect();
            if ring.len() < 3 {
                return None;
            }
            if !point_in_polygon_2d(px, py, &ring) {
                return None;
            }
            if polygon_boundary_distance_2d(px, py, &ring) < boundary_margin {
                return None;
            }
            Some(d)
        }
        Surface::Sphere(s) => Some((point.distance_to(&s.center) - s.radius).abs()),
        Surface::Cylinder(c) => Some((c.distance_to_axis(point) - c.radius).abs()),
        Surface::Cone(_) => None,
    }
}

/// Edge/face interferences; transversal crossings create new vertices and
/// paves on the edge.
#[instrument(skip_all)]
pub(crate) fn perform_ef(
    ds: &mut IntersectionDataset,
    store: &mut EntityStore,
    warnings: &mut Vec<Warning>,
) {
    let tol = *ds.tolerance();
    let merge = tol.merge_distance();

    for (e_tag, f_tag) in [(OperandTag::A, OperandTag::B), (OperandTag::B, OperandTag::A)] {
        for &ie in &ds.edges_of(e_tag) {
            for &f in &ds.faces_of(f_tag) {
                if ie == f {
                    continue;
                }
                let margin = ds.info(ie).tolerance + ds.info(f).tolerance + merge;
                if !ds.info(ie).bbox.expanded(margin).intersects(&ds.info(f).bbox) {
                    continue;
                }
                let edge = store.edges[ds.edge_id(ie).expect("edge index")].clone();
                let face_id = ds.face_id(f).expect("face index");
                let surface = store.faces[face_id].surface.clone();

                let mut ix =
                    CurveSurfaceIntersector::new(&edge.curve, (edge.first, edge.last), &surface, tol);
                match ix.perform() {
                    Status::Done => {
                        let hits: Vec<_> = ix.points().to_vec();
                        for hit in hits {
                            // Boundary and endpoint contacts belong to the
                            // EE/VE stages; only interior crossings count.
                            if distance_to_face_interior(store, face_id, &hit.point, merge)
                                .is_none()
                            {
                                continue;
                            }
                            let at_end = (hit.t1 - edge.first).abs() < merge
                                || (hit.t1 - edge.last).abs() < merge;
                            if at_end {
                                continue;
                            }
                            let iv = ds.add_intersection_vertex(
                                store,
                                hit.point,
                                hit.achieved_tolerance,
                            );
                            ds.add_interference(Interference::new(
                                InterferenceKind::EF,
                                ie,
                                f,
                                Locus::Point(hit.point),
                                hit.achieved_tolerance,
                                ds.info(ie).tolerance,
                                ds.info(f).tolerance,
                            ));
                            let pave_tol = ds.info(iv).tolerance;
                            ds.pave_set_mut(store, ie).insert(
                                Pave {
                                    vertex: iv,
                                    t: hit.t1.clamp(edge.first, edge.last),
                                    tolerance: pave_tol,
                                },
                                merge,
                            );
                        }
                    }
                    Status::InfiniteSolutions => {
                        // Edge lies in the surface; the face/face stage owns
                        // coplanar contact.
                    }
                    Status::NotDone(reason) => {
                        if reason != NotDoneReason::DegenerateOperand {
                            warnings.push(Warning::PairNotResolved {
                                i1: ie,
                                i2: f,
                                reason,
                            });
                        }
                    }
                }
            }
        }
    }
}

/// One face/face candidate outcome, computed read-only and merged serially.
struct FfOutcome {
    fa: usize,
    fb: usize,
    section: SurfaceSection,
    /// Transversal section segments clipped to both faces.
    segments: Vec<(Point3d, Point3d)>,
}

/// Face/face interferences.
///
/// Candidate pairs are independent read-only computations and run on the
/// rayon pool; the dataset merge below stays single-threaded because pave
/// insertion into a shared edge does not commute.
#[instrument(skip_all)]
pub(crate) fn perform_ff(
    ds: &mut IntersectionDataset,
    store: &mut EntityStore,
    warnings: &mut Vec<Warning>,
) {
    let tol = *ds.tolerance();
    let merge = tol.merge_distance();

    let fa = ds.faces_of(OperandTag::A);
    let fb = ds.faces_of(OperandTag::B);
    let mut pairs = Vec::new();
    for &a in &fa {
        for &b in &fb {
            if a == b {
                continue;
            }
            let margin = ds.info(a).tolerance + ds.info(b).tolerance + merge;
            if ds.info(a).bbox.expanded(margin).intersects(&ds.info(b).bbox) {
                pairs.push((a, b));
            }
        }
    }
    debug!(candidates = pairs.len(), "face/face candidate pairs");

    let ds_ref = &*ds;
    let store_ref = &*store;
    let outcomes: Vec<FfOutcome> = pairs
        .par_iter()
        .map(|&(a, b)| {
            let face_a = ds_ref.face_id(a).expect("face index");
            let face_b = ds_ref.face_id(b).expect("face index");
            let sa = &store_ref.faces[face_a].surface;
            let sb = &store_ref.faces[face_b].surface;
            let section = surface_surface(sa, sb, &tol);
            let segments = match (&section, sa, sb) {
                (
                    SurfaceSection::Curve {
                        curve: Curve::Line(line),
                        ..
                    },
                    Surface::Plane(pa),
                    Surface::Plane(pb),
                ) => {
                    let ia = clip_line_to_polygon(
                        line,
                        &store_ref.face_points(face_a),
                        pa,
                        merge,
                    );
                    let ib = clip_line_to_polygon(
                        line,
                        &store_ref.face_points(face_b),
                        pb,
                        merge,
                    );
                    intersect_intervals(&ia, &ib, merge)
                        .into_iter()
                        .map(|(lo, hi)| (line.evaluate(lo), line.evaluate(hi)))
                        .collect()
                }
                _ => Vec::new(),
            };
            FfOutcome {
                fa: a,
                fb: b,
                section,
                segments,
            }
        })
        .collect();

    for outcome in outcomes {
        let (a, b) = (outcome.fa, outcome.fb);
        match outcome.section {
            SurfaceSection::Point {
                point,
                achieved_tolerance,
            } => {
                ds.add_interference(Interference::new(
                    InterferenceKind::FF,
                    a,
                    b,
                    Locus::Point(point),
                    achieved_tolerance,
                    ds.info(a).tolerance,
                    ds.info(b).tolerance,
                ));
                ds.add_intersection_vertex(store, point, achieved_tolerance);
            }
            SurfaceSection::Curve {
                curve: Curve::Circle(circle),
                achieved_tolerance,
            } => {
                ds.add_interference(Interference::new(
                    InterferenceKind::FF,
                    a,
                    b,
                    Locus::Curve(Curve::Circle(circle)),
                    achieved_tolerance,
                    ds.info(a).tolerance,
                    ds.info(b).tolerance,
                ));
            }
            SurfaceSection::Curve { .. } | SurfaceSection::TwoCurves { .. } => {
                for (p_lo, p_hi) in &outcome.segments {
                    if p_lo.distance_to(p_hi) < merge {
                        continue;
                    }
                    ds.add_interference(Interference::new(
                        InterferenceKind::FF,
                        a,
                        b,
                        Locus::Segment(*p_lo, *p_hi),
                        tol.coincidence,
                        ds.info(a).tolerance,
                        ds.info(b).tolerance,
                    ));
                    for p in [*p_lo, *p_hi] {
                        let iv = ds.add_intersection_vertex(store, p, tol.coincidence);
                        pave_boundary_edges(ds, store, a, iv, &p);
                        pave_boundary_edges(ds, store, b, iv, &p);
                    }
                }
            }
            SurfaceSection::Coincident => {
                // Coplanar overlap has no lower-dimensional locus; the
                // building stage resolves it by boundary classification.
            }
            SurfaceSection::None => {}
            SurfaceSection::NotDone(reason) => {
                warnings.push(Warning::PairNotResolved {
                    i1: a,
                    i2: b,
                    reason,
                });
            }
        }
    }
}

/// Put a pave for `iv` on every boundary edge of face `f` that carries the
/// point within tolerance.
fn pave_boundary_edges(
    ds: &mut IntersectionDataset,
    store: &EntityStore,
    f: usize,
    iv: usize,
    point: &Point3d,
) {
    let tol = *ds.tolerance();
    let merge = tol.merge_distance();
    let face_id = match ds.face_id(f) {
        Some(id) => id,
        None => return,
    };
    let face = &store.faces[face_id];
    let mut loop_ids = vec![face.outer_loop];
    loop_ids.extend(face.inner_loops.iter().copied());

    for loop_id in loop_ids {
        if !store.loops.contains_key(loop_id) {
            continue;
        }
        for eu in store.loops[loop_id].edges.clone() {
            let Some(ie) = ds.index_of_edge(eu.edge) else {
                continue;
            };
            let edge = &store.edges[eu.edge];
            let t = edge.curve.project(point).clamp(edge.first, edge.last);
            if edge.curve.evaluate(t).distance_to(point) < merge {
                let pave_tol = ds.info(iv).tolerance;
                ds.pave_set_mut(store, ie).insert(
                    Pave {
                        vertex: iv,
                        t,
                        tolerance: pave_tol,
                    },
                    merge,
                );
            }
        }
    }
}

// ─── Section-line clipping ──────────────────────────────────────────────────

/// Intervals of `line` (by parameter) that run inside the polygon, boundary
/// included. Produced by collecting every boundary crossing and vertex
/// contact, then testing the midpoint of each candidate span.
pub(crate) fn clip_line_to_polygon(
    line: &Line3d,
    ring: &[Point3d],
    plane: &Plane,
    merge: f64,
) -> Vec<(f64, f64)> {
    if ring.len() < 3 {
        return Vec::new();
    }
    let ring_2d: Vec<(f64, f64)> = ring.iter().map(|p| plane.parameters_of(p)).collect();
    let (ox, oy) = plane.parameters_of(&line.origin);
    let probe = line.origin + line.direction;
    let (px, py) = plane.parameters_of(&probe);
    let (dx, dy) = (px - ox, py - oy);

    let mut ts: Vec<f64> = Vec::new();
    let n = ring.len();
    for i in 0..n {
        let (ax, ay) = ring_2d[i];
        let (bx, by) = ring_2d[(i + 1) % n];
        let (ex, ey) = (bx - ax, by - ay);
        let denom = dx * ey - dy * ex;
        if denom.abs() > 1e-12 {
            // Solve O + tD = A + sE by 2D cross products.
            let s = ((ax - ox) * dy - (ay - oy) * dx) / denom;
            if (-1e-9..=1.0 + 1e-9).contains(&s) {
                let t = ((ax - ox) * ey - (ay - oy) * ex) / denom;
                ts.push(t);
            }
        } else {
            // Boundary edge parallel to the line: its endpoints bound a
            // possible collinear span.
            let dist = ((ax - ox) * dy - (ay - oy) * dx).abs() / (dx * dx + dy * dy).sqrt();
            if dist < merge {
                for &(vx, vy) in &[(ax, ay), (bx, by)] {
                    let t = (vx - ox) * dx + (vy - oy) * dy;
                    ts.push(t / (dx * dx + dy * dy));
                }
            }
        }
    }

    if ts.is_empty() {
        return Vec::new();
    }
    ts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    ts.dedup_by(|a, b| (*a - *b).abs() < merge);

    let mut intervals = Vec::new();
    for w in ts.windows(2) {
        let (lo, hi) = (w[0], w[1]);
        if hi - lo < merge {
            continue;
        }
        let mid = (lo + hi) * 0.5;
        let (mx, my) = (ox + mid * dx, oy + mid * dy);
        let inside = point_in_polygon_2d(mx, my, &ring_2d)
            || polygon_boundary_distance_2d(mx, my, &ring_2d) < merge;
        if inside {
            intervals.push((lo, hi));
        }
    }
    merge_adjacent_intervals(intervals, merge)
}

fn merge_adjacent_intervals(intervals: Vec<(f64, f64)>, merge: f64) -> Vec<(f64, f64)> {
    let mut out: Vec<(f64, f64)> = Vec::new();
    for (lo, hi) in intervals {
        match out.last_mut() {
            Some(last) if lo - last.1 < merge => last.1 = hi,
            _ => out.push((lo, hi)),
        }
    }
    out
}

/// Pairwise intersection of two sorted interval lists.
pub(crate) fn intersect_intervals(
    a: &[(f64, f64)],
    b: &[(f64, f64)],
    merge: f64,
) -> Vec<(f64, f64)> {
    let mut out = Vec::new();
    for &(a_lo, a_hi) in a {
        for &(b_lo, b_hi) in b {
            let lo = a_lo.max(b_lo);
            let hi = a_hi.min(b_hi);
            if hi - lo > merge {
                out.push((lo, hi));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::vector::Vec3;

    fn unit_square_z0() -> Vec<Point3d> {
        vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(1.0, 1.0, 0.0),
            Point3d::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn clip_line_through_square() {
        let plane = Plane::xy();
        let line = Line3d::new(Point3d::new(-1.0, 0.5, 0.0), Vec3::X).unwrap();
        let intervals = clip_line_to_polygon(&line, &unit_square_z0(), &plane, 1e-7);
        assert_eq!(intervals.len(), 1);
        let (lo, hi) = intervals[0];
        assert!((lo - 1.0).abs() < 1e-9);
        assert!((hi - 2.0).abs() < 1e-9);
    }

    #[test]
    fn clip_line_missing_square() {
        let plane = Plane::xy();
        let line = Line3d::new(Point3d::new(-1.0, 2.5, 0.0), Vec3::X).unwrap();
        assert!(clip_line_to_polygon(&line, &unit_square_z0(), &plane, 1e-7).is_empty());
    }

    #[test]
    fn clip_line_along_boundary_edge() {
        let plane = Plane::xy();
        // Collinear with the bottom edge of the square.
        let line = Line3d::new(Point3d::new(-1.0, 0.0, 0.0), Vec3::X).unwrap();
        let intervals = clip_line_to_polygon(&line, &unit_square_z0(), &plane, 1e-7);
        assert_eq!(intervals.len(), 1);
        let (lo, hi) = intervals[0];
        assert!((lo - 1.0).abs() < 1e-9);
        assert!((hi - 2.0).abs() < 1e-9);
    }

    #[test]
    fn interval_intersection() {
        let a = vec![(0.0, 2.0), (3.0, 5.0)];
        let b = vec![(1.0, 4.0)];
        let out = intersect_intervals(&a, &b, 1e-9);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], (1.0, 2.0));
        assert_eq!(out[1], (3.0, 4.0));
    }
}

//! Face rebuilding: planar rings, plane splitting and wire nesting.
//!
//! During the building stage every planar face is handled as a polygon ring;
//! the section planes found by the interference stages carve it into patches
//! whose boundaries do not self-intersect, and the classifier then decides
//! which patches survive into the result.

use crate::geometry::intersection::point_in_polygon_2d;
use crate::geometry::point::Point3d;
use crate::geometry::surfaces::Plane;
use crate::geometry::vector::Vec3;

/// A planar polygon ring, counter-clockwise about `normal`.
#[derive(Debug, Clone)]
pub struct Polygon3d {
    pub points: Vec<Point3d>,
    pub normal: Vec3,
}

impl Polygon3d {
    /// Build from an ordered ring; the normal comes from Newell's method,
    /// so the winding of `points` defines the orientation.
    /// Consecutive duplicate points (as produced by splitting through a
    /// vertex) are removed first.
    pub fn new(points: Vec<Point3d>) -> Option<Self> {
        let mut points = points;
        points.dedup_by(|a, b| a.distance_to(b) < 1e-12);
        if points.len() > 1 && points[0].distance_to(points.last()?) < 1e-12 {
            points.pop();
        }
        if points.len() < 3 {
            return None;
        }
        let normal = newell_normal(&points)?;
        Some(Self { points, normal })
    }

    pub fn plane(&self) -> Plane {
        Plane::new(self.points[0], self.normal)
    }

    pub fn area(&self) -> f64 {
        let mut cross_sum = Vec3::ZERO;
        let anchor = self.points[0].to_vec3();
        for i in 1..self.points.len() - 1 {
            let b = self.points[i].to_vec3() - anchor;
            let c = self.points[i + 1].to_vec3() - anchor;
            cross_sum = cross_sum + b.cross(&c);
        }
        cross_sum.dot(&self.normal) * 0.5
    }

    /// Area-weighted centroid; robust for non-convex rings.
    pub fn centroid(&self) -> Point3d {
        let anchor = self.points[0];
        let mut weighted = Vec3::ZERO;
        let mut total = 0.0;
        for i in 1..self.points.len() - 1 {
            let b = self.points[i];
            let c = self.points[i + 1];
            let area = (b - anchor).cross(&(c - anchor)).dot(&self.normal) * 0.5;
            let centroid =
                (anchor.to_vec3() + b.to_vec3() + c.to_vec3()) / 3.0;
            weighted = weighted + centroid * area;
            total += area;
        }
        if total.abs() < 1e-30 {
            return anchor;
        }
        let v = weighted / total;
        Point3d::new(v.x, v.y, v.z)
    }

    /// A copy with reversed winding (and flipped normal).
    pub fn reversed(&self) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self {
            points,
            normal: -self.normal,
        }
    }
}

fn newell_normal(points: &[Point3d]) -> Option<Vec3> {
    let mut n = Vec3::ZERO;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    n.normalized()
}

/// A polygon patch carved from an input face, tagged with its provenance.
#[derive(Debug, Clone)]
pub struct FacePatch {
    /// Dataset index of the face this patch came from.
    pub source: usize,
    pub ring: Polygon3d,
    pub tolerance: f64,
}

impl FacePatch {
    pub fn reversed(&self) -> Self {
        Self {
            source: self.source,
            ring: self.ring.reversed(),
            tolerance: self.tolerance,
        }
    }
}

/// Outcome of dividing a ring by a plane.
#[derive(Debug)]
pub enum SplitOutcome {
    /// Entirely on the positive side (or touching the plane).
    AllFront,
    /// Entirely on the negative side (or touching the plane).
    AllBack,
    /// The ring lies in the plane.
    Coplanar,
    Split {
        front: Vec<Point3d>,
        back: Vec<Point3d>,
    },
}

/// Divide a ring by a plane, inserting crossing points on both halves.
/// Vertices within `eps` of the plane belong to both halves.
pub fn split_ring_by_plane(points: &[Point3d], plane: &Plane, eps: f64) -> SplitOutcome {
    const FRONT: i8 = 1;
    const BACK: i8 = -1;
    const ON: i8 = 0;

    let sides: Vec<i8> = points
        .iter()
        .map(|p| {
            let d = plane.signed_distance(p);
            if d > eps {
                FRONT
            } else if d < -eps {
                BACK
            } else {
                ON
            }
        })
        .collect();

    let has_front = sides.contains(&FRONT);
    let has_back = sides.contains(&BACK);
    match (has_front, has_back) {
        (false, false) => return SplitOutcome::Coplanar,
        (true, false) => return SplitOutcome::AllFront,
        (false, true) => return SplitOutcome::AllBack,
        (true, true) => {}
    }

    let mut front: Vec<Point3d> = Vec::with_capacity(points.len() + 2);
    let mut back: Vec<Point3d> = Vec::with_capacity(points.len() + 2);

    for i in 0..points.len() {
        let j = (i + 1) % points.len();
        let (p_i, s_i) = (points[i], sides[i]);
        let (p_j, s_j) = (points[j], sides[j]);

        match s_i {
            ON => {
                front.push(p_i);
                back.push(p_i);
            }
            FRONT => front.push(p_i),
            _ => back.push(p_i),
        }

        if s_i * s_j == -1 {
            // True crossing: interpolate the plane hit.
            let d_i = plane.signed_distance(&p_i);
            let d_j = plane.signed_distance(&p_j);
            let t = d_i / (d_i - d_j);
            let hit = p_i.lerp(&p_j, t);
            front.push(hit);
            back.push(hit);
        }
    }

    SplitOutcome::Split { front, back }
}

/// Successively carve a patch by a set of planes.
///
/// Over-splitting is harmless: every emitted patch still classifies
/// unambiguously against the other operand.
pub fn split_patch_by_planes(patch: &FacePatch, planes: &[Plane], eps: f64) -> Vec<FacePatch> {
    let mut patches = vec![patch.clone()];
    for plane in planes {
        let mut next = Vec::with_capacity(patches.len() + 1);
        for p in patches {
            match split_ring_by_plane(&p.ring.points, plane, eps) {
                SplitOutcome::Split { front, back } => {
                    for ring_points in [front, back] {
                        if let Some(ring) = Polygon3d::new(ring_points) {
                            if ring.area().abs() > eps * eps {
                                next.push(FacePatch {
                                    source: p.source,
                                    ring,
                                    tolerance: p.tolerance,
                                });
                            }
                        }
                    }
                }
                _ => next.push(p),
            }
        }
        patches = next;
    }
    patches
}

/// A nesting of candidate wires on one surface: the outer boundary and the
/// holes it contains.
#[derive(Debug)]
pub struct RingNest {
    pub outer: Polygon3d,
    pub holes: Vec<Polygon3d>,
}

/// Group coplanar rings into faces: counter-clockwise rings (about
/// `reference_normal`) are boundaries, clockwise rings are holes, and each
/// hole belongs to the smallest boundary containing it (2D point-in-wire
/// classification at the ring's first vertex).
pub fn nest_rings(rings: Vec<Polygon3d>, reference_normal: &Vec3) -> Vec<RingNest> {
    let mut outers: Vec<RingNest> = Vec::new();
    let mut holes: Vec<Polygon3d> = Vec::new();

    for ring in rings {
        if ring.normal.dot(reference_normal) >= 0.0 {
            outers.push(RingNest {
                outer: ring,
                holes: vec![],
            });
        } else {
            holes.push(ring);
        }
    }

    for hole in holes {
        let probe = hole.points[0];
        let mut best: Option<(usize, f64)> = None;
        for (i, nest) in outers.iter().enumerate() {
            let plane = nest.outer.plane();
            let ring_2d: Vec<(f64, f64)> = nest
                .outer
                .points
                .iter()
                .map(|p| plane.parameters_of(p))
                .collect();
            let (px, py) = plane.parameters_of(&probe);
            if point_in_polygon_2d(px, py, &ring_2d) {
                let area = nest.outer.area().abs();
                if best.map_or(true, |(_, a)| area < a) {
                    best = Some((i, area));
                }
            }
        }
        if let Some((i, _)) = best {
            outers[i].holes.push(hole);
        }
    }

    outers
}

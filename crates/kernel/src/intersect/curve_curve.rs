use crate::geometry::curves::{Circle3d, Curve, Line3d};
use crate::geometry::intersection::line_line_closest;
use crate::geometry::point::Point3d;
use crate::Tolerance;

use super::{order_by_first_parameter, IntersectionPoint, NotDoneReason, PointKind, Status};

/// Curve/curve intersector over bounded parameter ranges.
///
/// Produces a finite sequence of intersection points ordered by the first
/// operand's parameter, each with the achieved tolerance. Coincident operands
/// over an interval report `InfiniteSolutions`; the overlap interval on the
/// first operand is then available from `overlap_range()`.
pub struct CurveCurveIntersector<'a> {
    c1: &'a Curve,
    range1: (f64, f64),
    c2: &'a Curve,
    range2: (f64, f64),
    tol: Tolerance,
    status: Status,
    points: Vec<IntersectionPoint>,
    overlap: Option<(f64, f64)>,
}

impl<'a> CurveCurveIntersector<'a> {
    pub fn new(
        c1: &'a Curve,
        range1: (f64, f64),
        c2: &'a Curve,
        range2: (f64, f64),
        tol: Tolerance,
    ) -> Self {
        Self {
            c1,
            range1,
            c2,
            range2,
            tol,
            status: Status::NotDone(NotDoneReason::ToleranceNotAchieved),
            points: Vec::new(),
            overlap: None,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn points(&self) -> &[IntersectionPoint] {
        &self.points
    }

    /// Overlap interval on the first operand when `InfiniteSolutions`.
    pub fn overlap_range(&self) -> Option<(f64, f64)> {
        self.overlap
    }

    pub fn perform(&mut self) -> Status {
        if self.range1.1 - self.range1.0 < self.tol.parametric
            || self.range2.1 - self.range2.0 < self.tol.parametric
        {
            self.status = Status::NotDone(NotDoneReason::DegenerateOperand);
            return self.status;
        }

        self.status = match (self.c1, self.c2) {
            (Curve::Line(l1), Curve::Line(l2)) => self.line_line(*l1, *l2),
            (Curve::Line(l), Curve::Circle(c)) => self.line_circle(*l, *c, false),
            (Curve::Circle(c), Curve::Line(l)) => self.line_circle(*l, *c, true),
            (Curve::Circle(c1), Curve::Circle(c2)) => self.circle_circle(*c1, *c2),
        };
        order_by_first_parameter(&mut self.points);
        self.status
    }

    fn in_ranges(&self, t1: f64, t2: f64) -> bool {
        let pt = self.tol.parametric;
        t1 >= self.range1.0 - pt
            && t1 <= self.range1.1 + pt
            && t2 >= self.range2.0 - pt
            && t2 <= self.range2.1 + pt
    }

    fn line_line(&mut self, l1: Line3d, l2: Line3d) -> Status {
        let merge = self.tol.merge_distance();
        match line_line_closest(&l1, &l2) {
            Some((p1, t1, p2, t2, dist)) => {
                if dist < merge && self.in_ranges(t1, t2) {
                    let angle = l1.direction.angle_to(&l2.direction);
                    let kind = if angle < self.tol.angular
                        || (std::f64::consts::PI - angle) < self.tol.angular
                    {
                        PointKind::Tangent
                    } else {
                        PointKind::Crossing
                    };
                    self.points.push(IntersectionPoint {
                        point: p1.midpoint(&p2),
                        t1,
                        t2,
                        kind,
                        achieved_tolerance: (dist * 0.5).max(self.tol.coincidence),
                    });
                }
                Status::Done
            }
            None => {
                // Parallel lines: coincident within tolerance means an
                // interval overlap, otherwise no intersection at all.
                if l2.distance_to_point(&l1.origin) < merge {
                    let (_, ta) = l1.closest_point(&l2.evaluate(self.range2.0));
                    let (_, tb) = l1.closest_point(&l2.evaluate(self.range2.1));
                    let (lo, hi) = (ta.min(tb).max(self.range1.0), ta.max(tb).min(self.range1.1));
                    if hi - lo > self.tol.parametric {
                        self.overlap = Some((lo, hi));
                        return Status::InfiniteSolutions;
                    }
                }
                Status::Done
            }
        }
    }

    fn line_circle(&mut self, line: Line3d, circle: Circle3d, swapped: bool) -> Status {
        if circle.radius < self.tol.coincidence {
            return Status::NotDone(NotDoneReason::DegenerateOperand);
        }
        let merge = self.tol.merge_distance();

        // Work in the circle plane: the line must pierce it or lie in it.
        let plane_dist = (line.origin - circle.center).dot(&circle.normal);
        let dir_dot = line.direction.dot(&circle.normal);

        let candidates: Vec<(Point3d, f64)> = if dir_dot.abs() < self.tol.angular {
            if plane_dist.abs() > merge {
                return Status::Done;
            }
            // In-plane line: classic line/circle quadratic on |P(t) - C| = r.
            let oc = line.origin - circle.center;
            let b = 2.0 * oc.dot(&line.direction);
            let c = oc.dot(&oc) - circle.radius * circle.radius;
            let disc = b * b - 4.0 * c;
            if disc < -merge {
                return Status::Done;
            }
            let sq = disc.max(0.0).sqrt();
            let mut out = vec![];
            for t in [(-b - sq) / 2.0, (-b + sq) / 2.0] {
                out.push((line.evaluate(t), t));
            }
            if disc.abs() <= merge {
                out.truncate(1);
            }
            out
        } else {
            // Transverse line: single candidate where it pierces the plane.
            let t = -plane_dist / dir_dot;
            vec![(line.evaluate(t), t)]
        };

        for (p, t_line) in candidates {
            let radial_gap = (p.distance_to(&circle.center) - circle.radius).abs();
            let off_plane = (p - circle.center).dot(&circle.normal).abs();
            let dist = radial_gap.max(off_plane);
            if dist < merge {
                let t_circle = circle.project(&p);
                let on_circle = circle.evaluate(t_circle);
                let tangent = circle.derivative(t_circle);
                let kind = if line.direction.is_parallel_to(&tangent, self.tol.angular) {
                    PointKind::Tangent
                } else {
                    PointKind::Crossing
                };
                let (t1, t2) = if swapped {
                    (t_circle, t_line)
                } else {
                    (t_line, t_circle)
                };
                if self.in_ranges(t1, t2) {
                    self.points.push(IntersectionPoint {
                        point: p.midpoint(&on_circle),
                        t1,
                        t2,
                        kind,
                        achieved_tolerance: dist.max(self.tol.coincidence),
                    });
                }
            }
        }
        Status::Done
    }

    fn circle_circle(&mut self, c1: Circle3d, c2: Circle3d) -> Status {
        if c1.radius < self.tol.coincidence || c2.radius < self.tol.coincidence {
            return Status::NotDone(NotDoneReason::DegenerateOperand);
        }
        let merge = self.tol.merge_distance();

        if !c1.normal.is_parallel_to(&c2.normal, self.tol.angular) {
            // Non-coplanar circles are not needed by the planar pipeline.
            return Status::NotDone(NotDoneReason::UnsupportedPair);
        }
        let off_plane = (c2.center - c1.center).dot(&c1.normal).abs();
        if off_plane > merge {
            return Status::Done;
        }

        let d = c1.center.distance_to(&c2.center);
        if d < merge && (c1.radius - c2.radius).abs() < merge {
            self.overlap = Some(self.range1);
            return Status::InfiniteSolutions;
        }
        if d > c1.radius + c2.radius + merge || d < (c1.radius - c2.radius).abs() - merge {
            return Status::Done;
        }

        // In-plane two-circle intersection.
        let axis = (c2.center - c1.center).normalized_or(c1.x_axis);
        let a = (d * d + c1.radius * c1.radius - c2.radius * c2.radius) / (2.0 * d);
        let h2 = c1.radius * c1.radius - a * a;
        let base = c1.center + axis * a;

        if h2 < merge * merge {
            // External or internal tangency: one touch point.
            let t1 = c1.project(&base);
            let t2 = c2.project(&base);
            if self.in_ranges(t1, t2) {
                self.points.push(IntersectionPoint {
                    point: base,
                    t1,
                    t2,
                    kind: PointKind::Tangent,
                    achieved_tolerance: h2.abs().sqrt().max(self.tol.coincidence),
                });
            }
            return Status::Done;
        }

        let h = h2.sqrt();
        let perp = c1.normal.cross(&axis);
        for sign in [-1.0, 1.0] {
            let p = base + perp * (h * sign);
            let (t1, t2) = (c1.project(&p), c2.project(&p));
            if self.in_ranges(t1, t2) {
                self.points.push(IntersectionPoint {
                    point: p,
                    t1,
                    t2,
                    kind: PointKind::Crossing,
                    achieved_tolerance: self.tol.coincidence,
                });
            }
        }
        Status::Done
    }
}

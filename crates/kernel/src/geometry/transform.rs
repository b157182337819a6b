use serde::{Deserialize, Serialize};

use super::point::Point3d;
use super::vector::Vec3;

/// A 4x4 affine transformation matrix stored in column-major order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub m: [f64; 16],
}

impl Transform {
    pub fn identity() -> Self {
        #[rustfmt::skip]
        let m = [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        Self { m }
    }

    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        #[rustfmt::skip]
        let m = [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            dx,  dy,  dz,  1.0,
        ];
        Self { m }
    }

    /// Rotation around the Z axis by `angle` radians.
    pub fn rotation_z(angle: f64) -> Self {
        let c = angle.cos();
        let s = angle.sin();
        #[rustfmt::skip]
        let m = [
            c,   s,   0.0, 0.0,
            -s,  c,   0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        Self { m }
    }

    pub fn apply_point(&self, p: &Point3d) -> Point3d {
        let m = &self.m;
        Point3d::new(
            m[0] * p.x + m[4] * p.y + m[8] * p.z + m[12],
            m[1] * p.x + m[5] * p.y + m[9] * p.z + m[13],
            m[2] * p.x + m[6] * p.y + m[10] * p.z + m[14],
        )
    }

    /// Vectors ignore the translation column.
    pub fn apply_vec(&self, v: &Vec3) -> Vec3 {
        let m = &self.m;
        Vec3::new(
            m[0] * v.x + m[4] * v.y + m[8] * v.z,
            m[1] * v.x + m[5] * v.y + m[9] * v.z,
            m[2] * v.x + m[6] * v.y + m[10] * v.z,
        )
    }

    pub fn compose(&self, other: &Self) -> Self {
        let a = &self.m;
        let b = &other.m;
        let mut m = [0.0; 16];
        for col in 0..4 {
            for row in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += a[k * 4 + row] * b[col * 4 + k];
                }
                m[col * 4 + row] = sum;
            }
        }
        Self { m }
    }
}

/// An axis-aligned bounding box.
///
/// Used as the cheap rejection filter before any pairwise interference test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3d,
    pub max: Point3d,
}

impl BoundingBox {
    /// An inverted box that any `expand_to_include` fixes up.
    pub fn empty() -> Self {
        Self {
            min: Point3d::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3d::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn from_points(points: &[Point3d]) -> Self {
        let mut bb = Self::empty();
        for p in points {
            bb.expand_to_include(p);
        }
        bb
    }

    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    pub fn expand_to_include(&mut self, p: &Point3d) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn merge(&mut self, other: &Self) {
        self.expand_to_include(&other.min);
        self.expand_to_include(&other.max);
    }

    /// Uniformly enlarge the box on all sides.
    pub fn expanded(&self, margin: f64) -> Self {
        let d = Vec3::new(margin, margin, margin);
        Self {
            min: self.min - d,
            max: self.max + d,
        }
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn contains_point(&self, p: &Point3d) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn center(&self) -> Point3d {
        self.min.midpoint(&self.max)
    }

    pub fn diagonal(&self) -> f64 {
        if self.is_valid() {
            self.min.distance_to(&self.max)
        } else {
            0.0
        }
    }

    pub fn volume(&self) -> f64 {
        if !self.is_valid() {
            return 0.0;
        }
        (self.max.x - self.min.x) * (self.max.y - self.min.y) * (self.max.z - self.min.z)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn transform_translation() {
        let t = Transform::translation(1.0, 2.0, 3.0);
        let p = t.apply_point(&Point3d::ORIGIN);
        assert_eq!(p, Point3d::new(1.0, 2.0, 3.0));
        // Vectors are unaffected by translation.
        assert_eq!(t.apply_vec(&Vec3::X), Vec3::X);
    }

    #[test]
    fn rotation_z_quarter_turn() {
        let t = Transform::rotation_z(std::f64::consts::FRAC_PI_2);
        let p = t.apply_point(&Point3d::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn compose_applies_right_to_left() {
        let t = Transform::translation(1.0, 0.0, 0.0)
            .compose(&Transform::rotation_z(std::f64::consts::FRAC_PI_2));
        let p = t.apply_point(&Point3d::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn bbox_overlap_with_margin() {
        let a = BoundingBox::from_points(&[Point3d::ORIGIN, Point3d::new(1.0, 1.0, 1.0)]);
        let b = BoundingBox::from_points(&[
            Point3d::new(1.1, 0.0, 0.0),
            Point3d::new(2.0, 1.0, 1.0),
        ]);
        assert!(!a.intersects(&b));
        assert!(a.expanded(0.2).intersects(&b));
    }

    #[test]
    fn empty_bbox_is_invalid() {
        let bb = BoundingBox::empty();
        assert!(!bb.is_valid());
        assert_eq!(bb.volume(), 0.0);
    }
}

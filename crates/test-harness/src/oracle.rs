//! Sampling volume oracle.
//!
//! The exact divergence integral only covers polyhedral results; curved
//! solids are measured by classifying pseudo-random points of the bounding
//! box. The generator is a fixed-seed LCG so runs are reproducible.

use bool_kernel::algo::{classify_point, PointClass};
use bool_kernel::geometry::point::Point3d;
use bool_kernel::topology::brep::{EntityStore, SolidId};
use bool_kernel::Tolerance;

/// Monte Carlo volume estimate of a solid.
pub fn estimate_volume(store: &EntityStore, solid_id: SolidId, num_samples: usize) -> f64 {
    let bb = store.solid_bounding_box(solid_id);
    if !bb.is_valid() {
        return 0.0;
    }
    let bb = bb.expanded(0.01);
    let faces = store.solid_faces(solid_id);
    let tol = Tolerance::default();

    let mut rng_state: u64 = 12345;
    let mut next = || {
        rng_state = rng_state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (rng_state >> 33) as f64 / (u32::MAX as f64)
    };

    let mut inside = 0usize;
    for _ in 0..num_samples {
        let point = Point3d::new(
            bb.min.x + next() * (bb.max.x - bb.min.x),
            bb.min.y + next() * (bb.max.y - bb.min.y),
            bb.min.z + next() * (bb.max.z - bb.min.z),
        );
        if classify_point(store, &faces, &point, &tol) == PointClass::Inside {
            inside += 1;
        }
    }

    bb.volume() * (inside as f64 / num_samples as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bool_kernel::topology::primitives::{make_box, make_sphere};

    #[test]
    fn box_estimate_tracks_exact_volume() {
        let mut store = EntityStore::new();
        let solid = make_box(&mut store, 0.0, 0.0, 0.0, 10.0, 10.0, 10.0);
        let vol = estimate_volume(&store, solid, 10_000);
        assert!(
            (vol - 1000.0).abs() / 1000.0 < 0.15,
            "estimate {vol} too far from 1000"
        );
    }

    #[test]
    fn sphere_estimate_tracks_analytic_volume() {
        let mut store = EntityStore::new();
        let solid = make_sphere(&mut store, Point3d::ORIGIN, 1.0);
        let vol = estimate_volume(&store, solid, 20_000);
        let expected = 4.0 / 3.0 * std::f64::consts::PI;
        assert!(
            (vol - expected).abs() / expected < 0.15,
            "estimate {vol} too far from {expected}"
        );
    }
}

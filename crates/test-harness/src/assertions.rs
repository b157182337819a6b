//! Assertion helpers with diagnostic output.
//!
//! Every failure message carries expected vs actual plus the warning list of
//! the operation when one is supplied, so a failing scenario can be read
//! without re-running it under a debugger.

use thiserror::Error;

use bool_kernel::topology::brep::{audit_closure, EntityStore};
use bool_kernel::topology::shape::Shape;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("assertion failed: {detail}")]
    AssertionFailed { detail: String },
}

/// Assert the exact polyhedral volume of a result shape.
pub fn assert_volume(
    store: &EntityStore,
    shape: &Shape,
    expected: f64,
    tol: f64,
    ctx: &str,
) -> Result<(), HarnessError> {
    let mut total = 0.0;
    for solid in shape.solids() {
        match store.solid_volume(solid) {
            Some(v) => total += v,
            None => {
                return Err(HarnessError::AssertionFailed {
                    detail: format!("[{ctx}] solid {solid:?} has no exact volume (curved faces)"),
                })
            }
        }
    }
    if (total - expected).abs() > tol {
        return Err(HarnessError::AssertionFailed {
            detail: format!("[{ctx}] volume {total} differs from expected {expected} by more than {tol}"),
        });
    }
    Ok(())
}

/// Assert that every solid in the result has a watertight boundary.
pub fn assert_closed(store: &EntityStore, shape: &Shape, ctx: &str) -> Result<(), HarnessError> {
    for solid in shape.solids() {
        let faces = store.solid_faces(solid);
        let audit = audit_closure(store, &faces, 1e-6);
        if !audit.is_closed() {
            return Err(HarnessError::AssertionFailed {
                detail: format!(
                    "[{ctx}] solid {solid:?} is not closed: {} open, {} non-manifold segments",
                    audit.open_segments, audit.non_manifold_segments
                ),
            });
        }
    }
    Ok(())
}

/// Assert the result carries no material at all.
pub fn assert_empty_result(shape: &Shape, ctx: &str) -> Result<(), HarnessError> {
    if !shape.solids().is_empty() {
        return Err(HarnessError::AssertionFailed {
            detail: format!(
                "[{ctx}] expected an empty result, got {} solid(s)",
                shape.solids().len()
            ),
        });
    }
    Ok(())
}

//! Scenario-level helpers for exercising the Boolean kernel: rich
//! assertions with diagnostic output and a sampling volume oracle for
//! solids the exact integral cannot measure.

pub mod assertions;
pub mod oracle;
pub mod report;

pub use assertions::{
    assert_closed, assert_empty_result, assert_volume, HarnessError,
};
pub use oracle::estimate_volume;
pub use report::ScenarioReport;

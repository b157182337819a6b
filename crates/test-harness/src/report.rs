//! Machine-readable scenario summaries.
//!
//! Scenario runs emit one JSON record each, so regression tooling can diff
//! volumes and warning counts across kernel changes without parsing test
//! output.

use serde::{Deserialize, Serialize};

use bool_kernel::algo::{BooleanOperation, OperationState};
use bool_kernel::topology::brep::EntityStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub state: String,
    pub solids: usize,
    pub volume: Option<f64>,
    pub warnings: usize,
    pub faults: usize,
}

impl ScenarioReport {
    /// Summarize a performed operation.
    pub fn from_operation(name: &str, store: &EntityStore, op: &BooleanOperation) -> Self {
        let (solids, volume) = match op.result() {
            Some(shape) => {
                let ids = shape.solids();
                let mut total = Some(0.0);
                for &id in &ids {
                    total = match (total, store.solid_volume(id)) {
                        (Some(acc), Some(v)) => Some(acc + v),
                        _ => None,
                    };
                }
                (ids.len(), total)
            }
            None => (0, None),
        };
        Self {
            name: name.to_string(),
            state: match op.state() {
                OperationState::Ready => "ready",
                OperationState::Done => "done",
                OperationState::Failed => "failed",
            }
            .to_string(),
            solids,
            volume,
            warnings: op.warnings().len(),
            faults: op.faults().len(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

//! Nexus Stages: the three phases every adapter is built from.
//!
//! # Pipeline Flow
//!
//! ```text
//! Raw → InputStage → TransformStage → OutputStage → String
//!          ↓               ↓               ↓
//!        Tagged         Enriched        Rendered
//! ```
//!
//! Stages hold no per-call state, so a single instance of each can be
//! shared by every pipeline in a registry.

mod format;
mod input;
mod output;
mod transform;

pub use format::{format_average, format_reading};
pub use input::InputStage;
pub use output::OutputStage;
pub use transform::{TransformStage, TransformStats};

use nexus_core::{AdapterKind, Pipeline, Stage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Names a stage in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Input,
    Transform,
    Output,
}

impl StageKind {
    /// The full normalize → transform → format sequence
    pub const STANDARD: [StageKind; 3] = [StageKind::Input, StageKind::Transform, StageKind::Output];
}

/// One shared instance of each stage.
#[derive(Clone, Default)]
pub struct StageSet {
    pub input: Arc<InputStage>,
    pub transform: Arc<TransformStage>,
    pub output: Arc<OutputStage>,
}

impl StageSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: StageKind) -> Arc<dyn Stage> {
        match kind {
            StageKind::Input => self.input.clone(),
            StageKind::Transform => self.transform.clone(),
            StageKind::Output => self.output.clone(),
        }
    }
}

// ============================================================================
// CONVENIENCE BUILDERS
// ============================================================================

/// Build a pipeline from an explicit stage list
pub fn build_pipeline(
    id: impl Into<String>,
    adapter: AdapterKind,
    kinds: &[StageKind],
    stages: &StageSet,
) -> Pipeline {
    kinds
        .iter()
        .fold(Pipeline::new(id, adapter), |pipeline, kind| {
            pipeline.add_stage(stages.get(*kind))
        })
}

/// Create the standard 3-stage pipeline: Input → Transform → Output
pub fn standard_pipeline(id: impl Into<String>, adapter: AdapterKind, stages: &StageSet) -> Pipeline {
    build_pipeline(id, adapter, &StageKind::STANDARD, stages)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_standard_pipeline() {
        let stages = StageSet::new();
        let pipeline = standard_pipeline("JSON_001", AdapterKind::Json, &stages);
        assert_eq!(pipeline.len(), 3);
        assert_eq!(pipeline.stage_ids(), vec!["input.v1", "transform.v1", "output.v1"]);

        let output = pipeline.process(json!({ "sensor": "temp", "value": 23.5, "unit": "C" }));
        assert_eq!(
            output.as_deref(),
            Some("Processed temperature reading: 23.5°C (Normal range)")
        );
    }

    #[test]
    fn test_stage_set_shares_instances() {
        let stages = StageSet::new();
        let a = standard_pipeline("A", AdapterKind::Csv, &stages);
        let b = standard_pipeline("B", AdapterKind::Csv, &stages);

        assert_eq!(a.process(json!("user,action,t1")).as_deref(), Some("User activity logged: 1 actions processed"));
        assert_eq!(stages.transform.last_stats().records_seen, 1);

        assert_eq!(b.process(json!("x,y,z\nuser,action,t")).as_deref(), Some("User activity logged: 1 actions processed"));
        assert_eq!(stages.transform.last_stats().records_seen, 2);
    }

    #[test]
    fn test_stage_kind_names() {
        let kinds: Vec<StageKind> = serde_json::from_value(json!(["input", "transform", "output"])).unwrap();
        assert_eq!(kinds, StageKind::STANDARD.to_vec());
    }
}

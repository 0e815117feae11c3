//! Execution Context: per-call identity threaded through every stage
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub pipeline_id: String,
    pub trace_id: String,
    pub started_at: DateTime<Utc>,
}

impl ExecutionContext {
    pub fn new(pipeline_id: impl Into<String>) -> Self {
        Self {
            pipeline_id: pipeline_id.into(),
            trace_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
        }
    }
}

//! Pipeline Runner: chains stages in order, isolates failures, collects traces
use crate::context::ExecutionContext;
use crate::data_model::{RawPayload, StageValue, Tag};
use crate::stage::{Stage, StageError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

pub const RECOVERY_INITIATED: &str = "Recovery initiated: Switching to backup processor";
pub const RECOVERY_COMPLETED: &str = "Recovery successful: Pipeline restored, processing resumed";

/// Payload shape a pipeline is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
    Json,
    Csv,
    Stream,
}

impl AdapterKind {
    pub fn tag(self) -> Tag {
        match self {
            Self::Json => Tag::Json,
            Self::Csv => Tag::Csv,
            Self::Stream => Tag::Stream,
        }
    }
}

impl std::fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}Adapter", self.tag())
    }
}

/// Per-call state machine. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running { stage: usize },
    Completed,
    Failed { stage: usize, error: StageError },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTrace {
    pub id: String,
    pub in_hash: String,
    /// `None` when the stage failed
    pub out_hash: Option<String>,
    pub latency_ms: u64,
}

/// Everything observed during one call to [`Pipeline::run`].
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub pipeline_id: String,
    pub trace_id: String,
    pub started_at: DateTime<Utc>,
    pub state: RunState,
    pub output: Option<StageValue>,
    pub stages: Vec<StageTrace>,
}

impl PipelineRun {
    pub fn is_completed(&self) -> bool {
        self.state == RunState::Completed
    }

    /// 1-based index of the stage that failed, if any
    pub fn failed_stage(&self) -> Option<usize> {
        match self.state {
            RunState::Failed { stage, .. } => Some(stage),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&StageError> {
        match &self.state {
            RunState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// An adapter: an identifier plus an ordered, append-only list of stages.
pub struct Pipeline {
    id: String,
    adapter: AdapterKind,
    stages: Vec<Arc<dyn Stage>>,
}

impl Pipeline {
    pub fn new(id: impl Into<String>, adapter: AdapterKind) -> Self {
        Self {
            id: id.into(),
            adapter,
            stages: Vec::new(),
        }
    }

    pub fn json_adapter(id: impl Into<String>) -> Self {
        Self::new(id, AdapterKind::Json)
    }

    pub fn csv_adapter(id: impl Into<String>) -> Self {
        Self::new(id, AdapterKind::Csv)
    }

    pub fn stream_adapter(id: impl Into<String>) -> Self {
        Self::new(id, AdapterKind::Stream)
    }

    /// Append a stage to the pipeline
    pub fn add_stage(mut self, stage: Arc<dyn Stage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn adapter(&self) -> AdapterKind {
        self.adapter
    }

    pub fn stage_ids(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order. The first `StageError` aborts this call,
    /// is logged with its 1-based stage index, and leaves `output` empty.
    pub fn run(&self, input: StageValue) -> PipelineRun {
        let ctx = ExecutionContext::new(&self.id);
        let span = tracing::info_span!(
            "pipeline",
            id = %self.id,
            adapter = %self.adapter,
            trace_id = %ctx.trace_id
        );
        let _enter = span.enter();

        let mut state = RunState::Idle;
        trace!(?state, phase = input.phase(), "payload accepted");

        let mut traces = Vec::with_capacity(self.stages.len());
        let mut current = input;

        for (index, stage) in self.stages.iter().enumerate() {
            let position = index + 1;
            state = RunState::Running { stage: position };
            trace!(?state, stage = stage.id(), "stage started");

            let start = Instant::now();
            let in_hash = fingerprint(&current);

            match stage.process(current, &ctx) {
                Ok(next) => {
                    traces.push(StageTrace {
                        id: stage.id().to_string(),
                        in_hash,
                        out_hash: Some(fingerprint(&next)),
                        latency_ms: start.elapsed().as_millis() as u64,
                    });
                    current = next;
                }
                Err(error) => {
                    traces.push(StageTrace {
                        id: stage.id().to_string(),
                        in_hash,
                        out_hash: None,
                        latency_ms: start.elapsed().as_millis() as u64,
                    });
                    warn!(
                        stage = position,
                        origin = %error.origin(),
                        "Error detected in Stage {}: {}",
                        position,
                        error
                    );
                    info!("{}", RECOVERY_INITIATED);
                    info!("{}", RECOVERY_COMPLETED);

                    return PipelineRun {
                        pipeline_id: self.id.clone(),
                        trace_id: ctx.trace_id,
                        started_at: ctx.started_at,
                        state: RunState::Failed { stage: position, error },
                        output: None,
                        stages: traces,
                    };
                }
            }
        }

        debug!(stages = traces.len(), phase = current.phase(), "pipeline completed");

        PipelineRun {
            pipeline_id: self.id.clone(),
            trace_id: ctx.trace_id,
            started_at: ctx.started_at,
            state: RunState::Completed,
            output: Some(current),
            stages: traces,
        }
    }

    /// Run a raw payload end to end. `None` is the NoResult sentinel: some
    /// stage failed, or the stages never produced rendered text.
    pub fn process(&self, payload: RawPayload) -> Option<String> {
        let output = self.run(StageValue::Raw(payload)).output?;
        let phase = output.phase();
        let rendered = output.into_rendered();
        if rendered.is_none() {
            warn!(id = %self.id, phase, "pipeline completed without rendered output");
        }
        rendered
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("id", &self.id)
            .field("adapter", &self.adapter)
            .field("stages", &self.stage_ids())
            .finish()
    }
}

fn fingerprint(value: &StageValue) -> String {
    match serde_json::to_vec(value) {
        Ok(bytes) => format!("blake3:{}", blake3::hash(&bytes)),
        Err(_) => "blake3:unavailable".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::TransformError;
    use serde_json::json;

    struct Echo;

    impl Stage for Echo {
        fn id(&self) -> &'static str {
            "echo.v1"
        }

        fn process(&self, value: StageValue, _ctx: &ExecutionContext) -> Result<StageValue, StageError> {
            match value {
                StageValue::Raw(v) => Ok(StageValue::Rendered(v.to_string())),
                other => Ok(other),
            }
        }
    }

    struct Broken;

    impl Stage for Broken {
        fn id(&self) -> &'static str {
            "broken.v1"
        }

        fn process(&self, _value: StageValue, _ctx: &ExecutionContext) -> Result<StageValue, StageError> {
            Err(TransformError::NoValidTemperatureSamples.into())
        }
    }

    #[test]
    fn test_completed_run_threads_values() {
        let pipeline = Pipeline::json_adapter("P1")
            .add_stage(Arc::new(Echo))
            .add_stage(Arc::new(Echo));

        let run = pipeline.run(StageValue::Raw(json!(1)));
        assert!(run.is_completed());
        assert_eq!(run.output, Some(StageValue::Rendered("1".to_string())));
        assert_eq!(run.stages.len(), 2);
        assert!(run.stages.iter().all(|t| t.out_hash.is_some()));
    }

    #[test]
    fn test_failure_reports_one_based_stage() {
        let pipeline = Pipeline::csv_adapter("P2")
            .add_stage(Arc::new(Echo))
            .add_stage(Arc::new(Broken))
            .add_stage(Arc::new(Echo));

        let run = pipeline.run(StageValue::Raw(json!("x")));
        assert_eq!(run.failed_stage(), Some(2));
        assert!(run.output.is_none());
        // the third stage never ran
        assert_eq!(run.stages.len(), 2);
        assert!(run.stages[1].out_hash.is_none());
        assert_eq!(
            run.error(),
            Some(&StageError::Transform(TransformError::NoValidTemperatureSamples))
        );
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn captured_logs(pipeline: &Pipeline, input: StageValue) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            pipeline.run(input);
        });

        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_failure_logs_diagnostic_and_recovery_notices() {
        let pipeline = Pipeline::json_adapter("P5")
            .add_stage(Arc::new(Echo))
            .add_stage(Arc::new(Broken));

        let logs = captured_logs(&pipeline, StageValue::Raw(json!({})));
        assert!(logs.contains("Error detected in Stage 2: Not given temperature data"));

        let initiated = logs.find(RECOVERY_INITIATED).unwrap();
        let completed = logs.find(RECOVERY_COMPLETED).unwrap();
        assert!(initiated < completed);
    }

    #[test]
    fn test_completed_run_logs_no_recovery() {
        let pipeline = Pipeline::json_adapter("P6").add_stage(Arc::new(Echo));

        let logs = captured_logs(&pipeline, StageValue::Raw(json!(1)));
        assert!(!logs.contains("Error detected"));
        assert!(!logs.contains(RECOVERY_INITIATED));
    }

    #[test]
    fn test_process_requires_rendered_output() {
        let empty = Pipeline::stream_adapter("P3");
        assert!(empty.is_empty());
        assert_eq!(empty.process(json!([])), None);

        let echo = Pipeline::stream_adapter("P4").add_stage(Arc::new(Echo));
        assert_eq!(echo.process(json!("a")), Some("\"a\"".to_string()));
    }

    #[test]
    fn test_adapter_display() {
        assert_eq!(AdapterKind::Json.to_string(), "JSONAdapter");
        assert_eq!(format!("{:?}", Pipeline::csv_adapter("C").add_stage(Arc::new(Echo))),
            "Pipeline { id: \"C\", adapter: Csv, stages: [\"echo.v1\"] }");
    }
}

//! Stage Trait: single capability shared by every pipeline phase
use crate::context::ExecutionContext;
use crate::data_model::StageValue;
use serde::Serialize;
use thiserror::Error;

/// One phase of a pipeline.
///
/// Stages are stateless between calls: whatever they keep (statistics, for
/// instance) is overwritten on the next call and never feeds back into the
/// value they produce.
pub trait Stage: Send + Sync {
    /// Unique stage id (ex: "transform.v1")
    fn id(&self) -> &'static str;

    /// Executes the stage on the value produced by the previous one
    fn process(&self, value: StageValue, ctx: &ExecutionContext) -> Result<StageValue, StageError>;
}

/// Which phase raised a `StageError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StageOrigin {
    Input,
    Transform,
    Output,
}

impl std::fmt::Display for StageOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Transform => write!(f, "transform"),
            Self::Output => write!(f, "output"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("Invalid input: {0}")]
    Input(String),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("Invalid output: {0}")]
    Output(String),
}

impl StageError {
    pub fn origin(&self) -> StageOrigin {
        match self {
            Self::Input(_) => StageOrigin::Input,
            Self::Transform(_) => StageOrigin::Transform,
            Self::Output(_) => StageOrigin::Output,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("Unregistered sensor type: {0}")]
    UnregisteredSensorType(String),

    #[error("Invalid numeric value: {0}")]
    InvalidNumericValue(String),

    #[error("Invalid data format: row {line} has {fields} fields, expected 3")]
    MalformedRow { line: usize, fields: usize },

    #[error("Not given temperature data")]
    NoValidTemperatureSamples,

    #[error("Invalid data format: {0}")]
    MalformedRecord(String),

    #[error("Invalid data type: {0}")]
    UnexpectedInput(String),
}

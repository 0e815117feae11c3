//! Registry-level error model
use thiserror::Error;

/// Errors that escape to the caller of the registry.
///
/// Stage failures never show up here: a pipeline turns them into a logged
/// diagnostic and `NoResult`. Only routing and configuration defects do.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NexusError {
    #[error("Error: Pipeline not found: {id}")]
    NotFoundPipeline { id: String },

    #[error("Error: Pipeline already registered: {id}")]
    DuplicatePipeline { id: String },

    #[error("CONFIG/{0}")]
    Config(String),
}

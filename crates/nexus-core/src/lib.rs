//! Nexus Core: Stage Trait, Pipeline Runner and Data Model
//!
//! Three-phase pipeline core (normalize → transform → format) with a single
//! stage contract and per-call failure isolation.

pub mod stage;
pub mod runner;
pub mod data_model;
pub mod error;
pub mod context;

pub use stage::{Stage, StageError, StageOrigin, TransformError};
pub use runner::{AdapterKind, Pipeline, PipelineRun, RunState, StageTrace};
pub use data_model::{
    ActivityCount, EnrichedValue, RawPayload, Reading, SensorRecord, StageValue, StreamSummary,
    Tag, TaggedValue,
};
pub use context::ExecutionContext;
pub use error::NexusError;

/// Nexus engine version
pub const NEXUS_VERSION: &str = "1.0.0";

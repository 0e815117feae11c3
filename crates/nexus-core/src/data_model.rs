//! Data Model: tagged payloads, enriched values and sensor records
use crate::stage::TransformError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The only sensor type the transform stage knows how to read.
pub const TEMPERATURE_SENSOR: &str = "temp";

/// A raw payload as handed to a pipeline: a mapping, a string or a sequence.
/// Anything else is rejected by the input stage.
pub type RawPayload = Value;

/// Discriminator selecting the transform and format logic for a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    Json,
    Csv,
    Stream,
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "JSON"),
            Self::Csv => write!(f, "CSV"),
            Self::Stream => write!(f, "Stream"),
        }
    }
}

/// A classified payload. The variant is the tag, so the carried value can
/// never disagree with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaggedValue {
    /// A single sensor record
    Json(Map<String, Value>),
    /// Newline separated rows of comma separated fields
    Csv(String),
    /// Ordered sensor records
    Stream(Vec<Value>),
}

impl TaggedValue {
    pub fn tag(&self) -> Tag {
        match self {
            Self::Json(_) => Tag::Json,
            Self::Csv(_) => Tag::Csv,
            Self::Stream(_) => Tag::Stream,
        }
    }
}

/// A single formatted reading, ex: `temperature` → `23.5°C (Normal range)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCount {
    pub action_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub total_processed: u64,
    /// Average already rendered with its unit, ex: `22.1°C`
    pub avg: String,
}

/// Output of the transform stage, one shape per tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EnrichedValue {
    Json(Reading),
    Csv(ActivityCount),
    Stream(StreamSummary),
}

impl EnrichedValue {
    pub fn tag(&self) -> Tag {
        match self {
            Self::Json(_) => Tag::Json,
            Self::Csv(_) => Tag::Csv,
            Self::Stream(_) => Tag::Stream,
        }
    }
}

/// Whatever flows between two stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageValue {
    Raw(RawPayload),
    Tagged(TaggedValue),
    Enriched(EnrichedValue),
    Rendered(String),
}

impl StageValue {
    /// Short phase name used in diagnostics
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Raw(_) => "raw",
            Self::Tagged(_) => "tagged",
            Self::Enriched(_) => "enriched",
            Self::Rendered(_) => "rendered",
        }
    }

    pub fn into_rendered(self) -> Option<String> {
        match self {
            Self::Rendered(text) => Some(text),
            _ => None,
        }
    }
}

impl From<Value> for StageValue {
    fn from(value: Value) -> Self {
        Self::Raw(value)
    }
}

impl From<TaggedValue> for StageValue {
    fn from(value: TaggedValue) -> Self {
        Self::Tagged(value)
    }
}

impl From<EnrichedValue> for StageValue {
    fn from(value: EnrichedValue) -> Self {
        Self::Enriched(value)
    }
}

/// JSON kind name used in error messages
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A sensor reading extracted from a record.
///
/// `value` and `unit` are only required once the record is known to be a
/// temperature reading, so they are resolved lazily through accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorRecord {
    pub sensor: String,
    value: Option<Value>,
    unit: Option<String>,
}

impl SensorRecord {
    pub fn from_map(record: &Map<String, Value>) -> Result<Self, TransformError> {
        let sensor = record
            .get("sensor")
            .map(text_of)
            .ok_or_else(|| TransformError::MalformedRecord("missing key 'sensor'".to_string()))?;

        Ok(Self {
            sensor,
            value: record.get("value").cloned(),
            unit: record.get("unit").map(text_of),
        })
    }

    pub fn from_value(record: &Value) -> Result<Self, TransformError> {
        match record {
            Value::Object(map) => Self::from_map(map),
            other => Err(TransformError::UnexpectedInput(format!(
                "expected a sensor record, got {}",
                value_kind(other)
            ))),
        }
    }

    pub fn is_temperature(&self) -> bool {
        self.sensor == TEMPERATURE_SENSOR
    }

    pub fn unit(&self) -> Result<&str, TransformError> {
        self.unit
            .as_deref()
            .ok_or_else(|| TransformError::MalformedRecord("missing key 'unit'".to_string()))
    }

    pub fn numeric_value(&self) -> Result<f64, TransformError> {
        let value = self
            .value
            .as_ref()
            .ok_or_else(|| TransformError::MalformedRecord("missing key 'value'".to_string()))?;
        parse_numeric(value)
    }
}

/// Numbers pass through, strings are trimmed and parsed. Everything else is
/// rejected.
pub fn parse_numeric(value: &Value) -> Result<f64, TransformError> {
    match value {
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| TransformError::InvalidNumericValue(number.to_string())),
        Value::String(text) => text.trim().parse::<f64>().map_err(|_| {
            TransformError::InvalidNumericValue(format!("could not convert string to float: '{}'", text))
        }),
        other => Err(TransformError::InvalidNumericValue(format!(
            "expected a number, got {}",
            value_kind(other)
        ))),
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

use crate::format::{format_average, format_reading};
use nexus_core::{
    ActivityCount, EnrichedValue, ExecutionContext, Reading, SensorRecord, Stage, StageError,
    StageValue, StreamSummary, TaggedValue, TransformError,
};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Exclusive bounds of the normal range for Celsius readings
const NORMAL_RANGE_C: (f64, f64) = (15.0, 35.0);
const NORMAL_RANGE_NOTE: &str = "(Normal range)";
const CSV_FIELDS: usize = 3;

/// Counters describing the most recent call. Each call overwrites them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformStats {
    pub records_seen: usize,
    pub records_used: usize,
    pub records_skipped: usize,
}

impl TransformStats {
    fn new(seen: usize, used: usize) -> Self {
        Self {
            records_seen: seen,
            records_used: used,
            records_skipped: seen - used,
        }
    }
}

/// Per-tag enrichment: sensor reading formatting for JSON, action counting
/// for CSV and temperature averaging for streams.
///
/// The exposed statistics are last-call-wins; reading them while another
/// call is in flight on the same instance gives no consistency guarantee.
#[derive(Default)]
pub struct TransformStage {
    seen: AtomicUsize,
    used: AtomicUsize,
    skipped: AtomicUsize,
}

impl TransformStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_stats(&self) -> TransformStats {
        TransformStats {
            records_seen: self.seen.load(Ordering::Relaxed),
            records_used: self.used.load(Ordering::Relaxed),
            records_skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    fn store_stats(&self, stats: TransformStats) {
        self.seen.store(stats.records_seen, Ordering::Relaxed);
        self.used.store(stats.records_used, Ordering::Relaxed);
        self.skipped.store(stats.records_skipped, Ordering::Relaxed);
    }

    pub fn transform(&self, tagged: &TaggedValue) -> Result<EnrichedValue, TransformError> {
        self.store_stats(TransformStats::default());

        let (enriched, stats) = match tagged {
            TaggedValue::Json(record) => {
                let reading = transform_json(record)?;
                (EnrichedValue::Json(reading), TransformStats::new(1, 1))
            }
            TaggedValue::Csv(text) => {
                let (count, stats) = transform_csv(text)?;
                (EnrichedValue::Csv(count), stats)
            }
            TaggedValue::Stream(records) => {
                let (summary, stats) = transform_stream(records)?;
                (EnrichedValue::Stream(summary), stats)
            }
        };

        self.store_stats(stats);
        Ok(enriched)
    }
}

impl Stage for TransformStage {
    fn id(&self) -> &'static str {
        "transform.v1"
    }

    fn process(&self, value: StageValue, ctx: &ExecutionContext) -> Result<StageValue, StageError> {
        let tagged = match value {
            StageValue::Tagged(tagged) => tagged,
            other => {
                return Err(TransformError::UnexpectedInput(format!(
                    "expected a tagged value, got {} value",
                    other.phase()
                ))
                .into())
            }
        };

        let enriched = self.transform(&tagged)?;
        let stats = self.last_stats();
        debug!(
            trace_id = %ctx.trace_id,
            tag = %enriched.tag(),
            seen = stats.records_seen,
            used = stats.records_used,
            skipped = stats.records_skipped,
            "payload transformed"
        );
        Ok(StageValue::Enriched(enriched))
    }
}

fn transform_json(record: &Map<String, Value>) -> Result<Reading, TransformError> {
    let record = SensorRecord::from_map(record)?;
    if !record.is_temperature() {
        return Err(TransformError::UnregisteredSensorType(record.sensor));
    }

    let value = record.numeric_value()?;
    let unit = record.unit()?;
    let annotation = if unit == "C" && NORMAL_RANGE_C.0 < value && value < NORMAL_RANGE_C.1 {
        NORMAL_RANGE_NOTE
    } else {
        ""
    };

    Ok(Reading {
        field: "temperature".to_string(),
        value: format!("{}°{} {}", format_reading(value), unit, annotation),
    })
}

/// Every row must carry exactly three fields; one bad row discards the batch.
fn transform_csv(text: &str) -> Result<(ActivityCount, TransformStats), TransformError> {
    let mut rows = 0;
    let mut action_count = 0;

    for (index, row) in text.split('\n').enumerate() {
        let fields: Vec<&str> = row.split(',').collect();
        if fields.len() != CSV_FIELDS {
            return Err(TransformError::MalformedRow {
                line: index + 1,
                fields: fields.len(),
            });
        }
        rows += 1;
        if fields[0] == "user" && fields[1] == "action" {
            action_count += 1;
        }
    }

    Ok((
        ActivityCount {
            action_count: action_count as u64,
        },
        TransformStats::new(rows, action_count),
    ))
}

/// The first temperature record fixes the unit; later temperature records
/// in another unit are skipped rather than rejected.
fn transform_stream(records: &[Value]) -> Result<(StreamSummary, TransformStats), TransformError> {
    let mut expected_unit: Option<String> = None;
    let mut total = 0.0;
    let mut used = 0;

    for raw in records {
        let record = SensorRecord::from_value(raw)?;
        if !record.is_temperature() {
            continue;
        }

        let unit = record.unit()?;
        let expected = expected_unit.get_or_insert_with(|| unit.to_string());
        if expected.as_str() != unit {
            continue;
        }

        total += record.numeric_value()?;
        used += 1;
    }

    let unit = match expected_unit {
        Some(unit) if used > 0 => unit,
        _ => return Err(TransformError::NoValidTemperatureSamples),
    };

    Ok((
        StreamSummary {
            total_processed: records.len() as u64,
            avg: format_average(total / used as f64, &unit),
        },
        TransformStats::new(records.len(), used),
    ))
}

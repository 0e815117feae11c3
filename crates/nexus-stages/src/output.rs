//! Output formatting backed by Handlebars.
//!
//! Templates are compiled once and shared by every `OutputStage`. Strict
//! mode turns a missing key into a render error instead of an empty string.

use handlebars::Handlebars;
use nexus_core::{EnrichedValue, ExecutionContext, Stage, StageError, StageValue, Tag};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use tracing::debug;

const JSON_TEMPLATE: &str = "Processed {{field}} reading: {{value}}";
const CSV_TEMPLATE: &str = "User activity logged: {{action_count}} actions processed";
const STREAM_TEMPLATE: &str = "Stream summary: {{total_processed}} readings, avg: {{avg}}";

static TEMPLATES: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(true);
    handlebars.register_escape_fn(handlebars::no_escape);

    for (name, template) in [
        (Tag::Json, JSON_TEMPLATE),
        (Tag::Csv, CSV_TEMPLATE),
        (Tag::Stream, STREAM_TEMPLATE),
    ] {
        // A template that fails to compile surfaces as a render error
        let _ = handlebars.register_template_string(&name.to_string(), template);
    }

    handlebars
});

#[derive(Default)]
pub struct OutputStage;

impl OutputStage {
    pub fn render(&self, enriched: &EnrichedValue) -> Result<String, StageError> {
        let data = template_data(enriched);
        self.render_tagged(enriched.tag(), &data)
    }

    /// Render loosely structured data with the template for `tag`.
    /// Missing keys are reported as output errors.
    pub fn render_tagged(&self, tag: Tag, data: &Value) -> Result<String, StageError> {
        TEMPLATES
            .render(&tag.to_string(), data)
            .map_err(|e| StageError::Output(format!("Render error: {}", e)))
    }
}

impl Stage for OutputStage {
    fn id(&self) -> &'static str {
        "output.v1"
    }

    fn process(&self, value: StageValue, ctx: &ExecutionContext) -> Result<StageValue, StageError> {
        let enriched = match value {
            StageValue::Enriched(enriched) => enriched,
            other => {
                return Err(StageError::Output(format!(
                    "expected an enriched value, got {} value",
                    other.phase()
                )))
            }
        };

        let rendered = self.render(&enriched)?;
        debug!(trace_id = %ctx.trace_id, tag = %enriched.tag(), "output rendered");
        Ok(StageValue::Rendered(rendered))
    }
}

fn template_data(enriched: &EnrichedValue) -> Value {
    match enriched {
        EnrichedValue::Json(reading) => json!({
            "field": reading.field,
            "value": reading.value,
        }),
        EnrichedValue::Csv(count) => json!({ "action_count": count.action_count }),
        EnrichedValue::Stream(summary) => json!({
            "total_processed": summary.total_processed,
            "avg": summary.avg,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_core::{ActivityCount, Reading, StreamSummary};

    #[test]
    fn test_render_per_tag() {
        let stage = OutputStage;

        let json = stage
            .render(&EnrichedValue::Json(Reading {
                field: "temperature".into(),
                value: "40.0°C ".into(),
            }))
            .unwrap();
        assert_eq!(json, "Processed temperature reading: 40.0°C ");

        let csv = stage
            .render(&EnrichedValue::Csv(ActivityCount { action_count: 1 }))
            .unwrap();
        assert_eq!(csv, "User activity logged: 1 actions processed");

        let stream = stage
            .render(&EnrichedValue::Stream(StreamSummary {
                total_processed: 5,
                avg: "22.1°C".into(),
            }))
            .unwrap();
        assert_eq!(stream, "Stream summary: 5 readings, avg: 22.1°C");
    }

    #[test]
    fn test_missing_keys_are_output_errors() {
        let err = OutputStage
            .render_tagged(Tag::Stream, &json!({ "total_processed": 3 }))
            .unwrap_err();
        assert!(matches!(err, StageError::Output(_)));
    }

    #[test]
    fn test_process_rejects_unenriched_values() {
        let err = OutputStage
            .process(StageValue::Raw(json!([1, 2])), &ExecutionContext::new("test"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid output: expected an enriched value, got raw value");
    }
}

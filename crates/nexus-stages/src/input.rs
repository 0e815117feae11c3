use nexus_core::data_model::value_kind;
use nexus_core::{ExecutionContext, Stage, StageError, StageValue, TaggedValue};
use serde_json::Value;
use tracing::debug;

/// Classifies a raw payload by shape only: mapping → JSON, string → CSV,
/// sequence → Stream. Content is left for the transform stage.
#[derive(Default)]
pub struct InputStage;

impl InputStage {
    pub fn classify(&self, raw: Value) -> Result<TaggedValue, StageError> {
        match raw {
            Value::Object(record) => Ok(TaggedValue::Json(record)),
            Value::String(text) => Ok(TaggedValue::Csv(text)),
            Value::Array(records) => Ok(TaggedValue::Stream(records)),
            other => Err(StageError::Input(format!(
                "Invalid data type {}",
                value_kind(&other)
            ))),
        }
    }
}

impl Stage for InputStage {
    fn id(&self) -> &'static str {
        "input.v1"
    }

    fn process(&self, value: StageValue, ctx: &ExecutionContext) -> Result<StageValue, StageError> {
        let raw = match value {
            StageValue::Raw(raw) => raw,
            other => {
                return Err(StageError::Input(format!(
                    "expected a raw payload, got {} value",
                    other.phase()
                )))
            }
        };

        let tagged = self.classify(raw)?;
        debug!(trace_id = %ctx.trace_id, tag = %tagged.tag(), "payload classified");
        Ok(StageValue::Tagged(tagged))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_core::Tag;
    use serde_json::json;

    fn run(value: Value) -> Result<StageValue, StageError> {
        InputStage.process(StageValue::Raw(value), &ExecutionContext::new("test"))
    }

    #[test]
    fn test_classifies_by_shape() {
        let cases = [
            (json!({ "sensor": "temp" }), Tag::Json),
            (json!("user,action,t1"), Tag::Csv),
            (json!([{ "sensor": "temp" }]), Tag::Stream),
            // shape only: an empty mapping is still JSON
            (json!({}), Tag::Json),
        ];

        for (raw, expected) in cases {
            match run(raw).unwrap() {
                StageValue::Tagged(tagged) => assert_eq!(tagged.tag(), expected),
                other => panic!("unexpected value {:?}", other),
            }
        }
    }

    #[test]
    fn test_rejects_scalars() {
        for raw in [json!(42), json!(true), json!(null)] {
            let err = run(raw).unwrap_err();
            assert!(matches!(err, StageError::Input(_)));
        }
    }

    #[test]
    fn test_rejects_already_classified_values() {
        let err = InputStage
            .process(
                StageValue::Tagged(TaggedValue::Csv("a,b,c".into())),
                &ExecutionContext::new("test"),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: expected a raw payload, got tagged value");
    }
}

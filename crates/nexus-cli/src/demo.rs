//! Demonstration flow: multi-format processing, chaining and recovery.
use nexus_core::{AdapterKind, RawPayload, StageValue};
use nexus_registry::{NexusConfig, Registry};
use nexus_stages::{build_pipeline, StageKind, StageSet};
use serde_json::{json, Value};
use std::io::Write;
use std::time::Instant;
use tracing::info;

const CHAIN_RECORDS: usize = 100;

pub fn run<W: Write>(config: &NexusConfig, out: &mut W) -> anyhow::Result<()> {
    writeln!(out, "=== CODE NEXUS - ENTERPRISE PIPELINE SYSTEM ===\n")?;

    writeln!(out, "Initializing Nexus Manager...")?;
    let stages = StageSet::new();
    let registry = Registry::from_config_with(config, &stages)?;
    writeln!(out, "Registered pipelines: {}\n", registry.ids().join(", "))?;

    writeln!(out, "Creating Data Processing Pipeline...")?;
    writeln!(out, "Stage 1: Input validation and parsing")?;
    writeln!(out, "Stage 2: Data transformation and enrichment")?;
    writeln!(out, "Stage 3: Output formatting and delivery\n")?;

    multi_format(&registry, out)?;
    chaining(&registry, &stages, out)?;
    error_recovery(&registry, out)?;

    writeln!(out, "Nexus Integration complete. All systems operational.")?;
    Ok(())
}

fn sample_inputs() -> Vec<(&'static str, RawPayload)> {
    vec![
        ("JSON_001", json!({ "sensor": "temp", "value": 23.5, "unit": "C" })),
        ("CSV_001", json!("user,action,timestamp")),
        (
            "Stream_001",
            json!([
                { "sensor": "temp", "value": 22.0, "unit": "C" },
                { "sensor": "temp", "value": 22.5, "unit": "C" },
                { "sensor": "temp", "value": 21.8, "unit": "C" },
                { "sensor": "temp", "value": 22.1, "unit": "C" },
                { "sensor": "temp", "value": 22.0, "unit": "C" },
            ]),
        ),
        ("UNKNOWN_001", json!("user,action,timestamp")),
    ]
}

fn multi_format<W: Write>(registry: &Registry, out: &mut W) -> anyhow::Result<()> {
    writeln!(out, "=== Multi-Format Data Processing ===\n")?;

    for (id, payload) in sample_inputs() {
        let label = id.split('_').next().unwrap_or(id);
        writeln!(out, "Processing {} data through pipeline...", label)?;

        let output = match registry.dispatch(id, payload.clone()) {
            Ok(output) => output,
            Err(e) => {
                writeln!(out, "{}\n", e)?;
                continue;
            }
        };

        match &payload {
            Value::Object(_) => {
                writeln!(out, "Input: {}", payload)?;
                writeln!(out, "Transform: Enriched with metadata and validation")?;
            }
            Value::String(text) => {
                writeln!(out, "Input: \"{}\"", text)?;
                writeln!(out, "Transform: Parsed and structured data")?;
            }
            _ => {
                writeln!(out, "Input: Real-time sensor stream")?;
                writeln!(out, "Transform: Aggregated and filtered")?;
            }
        }
        writeln!(out, "Output: {}\n", output.as_deref().unwrap_or("<no result>"))?;
    }

    Ok(())
}

const CHAIN: [(&str, AdapterKind, StageKind); 3] = [
    ("JSON_002", AdapterKind::Json, StageKind::Input),
    ("CSV_002", AdapterKind::Csv, StageKind::Transform),
    ("Stream_002", AdapterKind::Stream, StageKind::Output),
];

/// Three single-stage pipelines fed one after the other. The configured
/// pipelines are used when every chain id is registered.
fn chaining<W: Write>(configured: &Registry, stages: &StageSet, out: &mut W) -> anyhow::Result<()> {
    writeln!(out, "=== Pipeline Chaining Demo ===\n")?;
    writeln!(out, "Pipeline A -> Pipeline B -> Pipeline C")?;
    writeln!(out, "Data flow: Raw -> Processed -> Analyzed -> Stored\n")?;

    let builtin;
    let registry = if CHAIN.iter().all(|(id, _, _)| configured.get(id).is_some()) {
        writeln!(out, "Chain source: configured pipelines")?;
        configured
    } else {
        let mut chain_registry = Registry::new();
        for (id, adapter, kind) in CHAIN {
            chain_registry.register(build_pipeline(id, adapter, &[kind], stages))?;
        }
        builtin = chain_registry;
        writeln!(out, "Chain source: built-in pipelines")?;
        &builtin
    };

    let records: Vec<Value> = (0..CHAIN_RECORDS)
        .map(|i| json!({ "sensor": "temp", "value": 20.0 + (i % 10) as f64 * 0.1, "unit": "C" }))
        .collect();

    let start = Instant::now();
    let mut current = Some(StageValue::Raw(Value::Array(records)));
    for (id, _, _) in CHAIN {
        current = match current {
            Some(value) => registry.dispatch_value(id, value)?,
            None => break,
        };
    }
    let elapsed = start.elapsed();

    match current.and_then(StageValue::into_rendered) {
        Some(summary) => {
            writeln!(out, "Chain result: {} records processed through 3-stage pipeline", CHAIN_RECORDS)?;
            writeln!(out, "{}", summary)?;
        }
        None => writeln!(out, "Chain result: no output produced")?,
    }
    info!(elapsed_ms = elapsed.as_millis() as u64, "chain finished");
    writeln!(out, "Performance: {:.3}s total processing time\n", elapsed.as_secs_f64())?;

    Ok(())
}

fn error_recovery<W: Write>(registry: &Registry, out: &mut W) -> anyhow::Result<()> {
    writeln!(out, "=== Error Recovery Test ===\n")?;
    writeln!(out, "Simulating pipeline failure...")?;

    let bad = json!({ "sensor": "temp", "value": "missing", "unit": "C" });
    match registry.dispatch("JSON_001", bad) {
        Ok(Some(output)) => writeln!(out, "Unexpected output: {}\n", output)?,
        Ok(None) => writeln!(out, "Failing record discarded, pipeline still available\n")?,
        Err(e) => writeln!(out, "{}\n", e)?,
    }

    Ok(())
}

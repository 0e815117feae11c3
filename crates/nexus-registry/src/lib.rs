//! Nexus Registry: routes payloads to pipelines by identifier
//!
//! The registry is built once at startup and only read afterwards. Data
//! problems stay inside the pipeline that hit them (`Ok(None)`); an unknown
//! pipeline id is a routing defect and comes back as an error.
pub mod config;

pub use config::{NexusConfig, PipelineSpec};

use nexus_core::{NexusError, Pipeline, PipelineRun, RawPayload, StageValue};
use nexus_stages::{build_pipeline, StageSet};
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct Registry {
    pipelines: HashMap<String, Pipeline>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every configured pipeline over one shared set of stages
    pub fn from_config(config: &NexusConfig) -> Result<Self, NexusError> {
        Self::from_config_with(config, &StageSet::new())
    }

    pub fn from_config_with(config: &NexusConfig, stages: &StageSet) -> Result<Self, NexusError> {
        config.validate()?;

        let mut registry = Self::new();
        for spec in &config.pipelines {
            registry.register(build_pipeline(&spec.id, spec.adapter, &spec.stages, stages))?;
        }
        Ok(registry)
    }

    /// Add a pipeline. Identifiers are unique within a registry.
    pub fn register(&mut self, pipeline: Pipeline) -> Result<(), NexusError> {
        if self.pipelines.contains_key(pipeline.id()) {
            return Err(NexusError::DuplicatePipeline {
                id: pipeline.id().to_string(),
            });
        }

        info!(
            id = pipeline.id(),
            adapter = %pipeline.adapter(),
            stages = pipeline.len(),
            "pipeline registered"
        );
        self.pipelines.insert(pipeline.id().to_string(), pipeline);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Pipeline> {
        self.pipelines.get(id)
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.pipelines.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    fn lookup(&self, id: &str) -> Result<&Pipeline, NexusError> {
        self.pipelines.get(id).ok_or_else(|| {
            warn!(id, "no pipeline registered under this id");
            NexusError::NotFoundPipeline { id: id.to_string() }
        })
    }

    /// Route a raw payload end to end. `Ok(None)` means the pipeline ran
    /// but some stage failed.
    pub fn dispatch(&self, id: &str, payload: RawPayload) -> Result<Option<String>, NexusError> {
        let pipeline = self.lookup(id)?;
        debug!(id, "dispatching payload");
        Ok(pipeline.process(payload))
    }

    /// Route an intermediate value, so that partial pipelines can be chained
    pub fn dispatch_value(&self, id: &str, value: StageValue) -> Result<Option<StageValue>, NexusError> {
        Ok(self.run(id, value)?.output)
    }

    /// Full record of a single call, including per-stage traces
    pub fn run(&self, id: &str, value: StageValue) -> Result<PipelineRun, NexusError> {
        let pipeline = self.lookup(id)?;
        debug!(id, phase = value.phase(), "dispatching value");
        Ok(pipeline.run(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_core::AdapterKind;
    use nexus_stages::standard_pipeline;
    use serde_json::json;

    #[test]
    fn test_register_and_dispatch() {
        let stages = StageSet::new();
        let mut registry = Registry::new();
        registry
            .register(standard_pipeline("CSV_001", AdapterKind::Csv, &stages))
            .unwrap();

        let out = registry.dispatch("CSV_001", json!("user,action,t1\nadmin,login,t2")).unwrap();
        assert_eq!(out.as_deref(), Some("User activity logged: 1 actions processed"));
    }

    #[test]
    fn test_unknown_id_is_a_hard_failure() {
        let registry = Registry::from_config(&NexusConfig::default()).unwrap();
        let err = registry.dispatch("UNKNOWN_ID", json!({})).unwrap_err();
        assert_eq!(err, NexusError::NotFoundPipeline { id: "UNKNOWN_ID".into() });

        let err = registry.dispatch_value("UNKNOWN_ID", StageValue::Raw(json!("x"))).unwrap_err();
        assert!(matches!(err, NexusError::NotFoundPipeline { .. }));
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let stages = StageSet::new();
        let mut registry = Registry::new();
        registry
            .register(standard_pipeline("P", AdapterKind::Json, &stages))
            .unwrap();

        let err = registry
            .register(standard_pipeline("P", AdapterKind::Stream, &stages))
            .unwrap_err();
        assert_eq!(err, NexusError::DuplicatePipeline { id: "P".into() });
        assert_eq!(registry.get("P").map(|p| p.adapter()), Some(AdapterKind::Json));
    }

    #[test]
    fn test_from_config_lists_ids() {
        let registry = Registry::from_config(&NexusConfig::default()).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.ids(), vec!["CSV_001", "JSON_001", "Stream_001"]);
    }
}

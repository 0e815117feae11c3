//! Declarative pipeline table
use nexus_core::{AdapterKind, NexusError};
use nexus_stages::StageKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Top-level configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NexusConfig {
    #[serde(default = "default_version")]
    pub version: String,
    pub pipelines: Vec<PipelineSpec>,
}

/// A single pipeline definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    pub id: String,
    pub adapter: AdapterKind,
    #[serde(default = "standard_stages")]
    pub stages: Vec<StageKind>,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn standard_stages() -> Vec<StageKind> {
    StageKind::STANDARD.to_vec()
}

impl PipelineSpec {
    pub fn standard(id: &str, adapter: AdapterKind) -> Self {
        Self {
            id: id.to_string(),
            adapter,
            stages: standard_stages(),
        }
    }
}

impl Default for NexusConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            pipelines: vec![
                PipelineSpec::standard("JSON_001", AdapterKind::Json),
                PipelineSpec::standard("CSV_001", AdapterKind::Csv),
                PipelineSpec::standard("Stream_001", AdapterKind::Stream),
            ],
        }
    }
}

impl NexusConfig {
    /// Load a configuration from a YAML file
    pub fn load(path: &str) -> Result<Self, NexusError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NexusError::Config(format!("Failed to read config file {}: {}", path, e)))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, NexusError> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| NexusError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), NexusError> {
        let mut seen = HashSet::new();
        for spec in &self.pipelines {
            if spec.id.trim().is_empty() {
                return Err(NexusError::Config("pipeline id must not be empty".to_string()));
            }
            if !seen.insert(spec.id.as_str()) {
                return Err(NexusError::DuplicatePipeline { id: spec.id.clone() });
            }
        }
        Ok(())
    }
}

//! Nexus CLI: runs the demonstration flow over a configured registry
pub mod demo;

use anyhow::Context;
use nexus_registry::NexusConfig;

/// Reads the pipeline table from NEXUS_CONFIG, or falls back to the three
/// standard adapters.
pub fn load_config() -> anyhow::Result<NexusConfig> {
    match std::env::var("NEXUS_CONFIG") {
        Ok(path) => NexusConfig::load(&path).with_context(|| format!("loading config from {}", path)),
        Err(_) => Ok(NexusConfig::default()),
    }
}

pub fn run(config: &NexusConfig) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    demo::run(config, &mut out)
}

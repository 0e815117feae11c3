//! Binary entrypoint for the Nexus demo.
use tracing::Level;

fn main() -> anyhow::Result<()> {
    // Log level can be overridden with NEXUS_LOG
    let level = std::env::var("NEXUS_LOG")
        .ok()
        .and_then(|v| v.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let config = nexus_cli::load_config()?;
    nexus_cli::run(&config)
}

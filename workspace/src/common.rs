//! Setup shared by the driver binaries.

use std::path::Path;
use anyhow::Context;
use tracing_subscriber::{ fmt, prelude::*, EnvFilter };
use wavepacket::SimConfig;

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let env_filter
        = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

/// Load a configuration file, or fall back to the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<SimConfig> {
    match path {
        Some(path) => {
            let config
                = SimConfig::load(path)
                .with_context(|| format!("loading config from {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            Ok(config)
        },
        None => {
            tracing::debug!("no config given; using defaults");
            Ok(SimConfig::default())
        },
    }
}

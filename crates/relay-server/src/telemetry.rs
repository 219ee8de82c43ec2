//! Process-wide `tracing` subscriber.

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LogLevel};

const WORKSPACE_CRATES: [&str; 7] = [
    "relay_server",
    "relay_ops",
    "relay_chain",
    "relay_store",
    "relay_notify",
    "relay_crypto",
    "tower_http",
];

/// Default filter enabling the workspace crates at `level`.
pub fn default_filter(level: LogLevel) -> String {
    let level: Level = level.into();
    WORKSPACE_CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn setup_tracing(level: LogLevel, format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(level)));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().pretty().with_env_filter(env_filter).init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().with_env_filter(env_filter).init(),
    }
}

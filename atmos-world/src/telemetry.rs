//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use atmos_core::config::GeneralConfig;

/// Output format for the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Build the filter: `RUST_LOG` wins, otherwise `general.log_level`.
#[must_use]
pub fn env_filter(general: &GeneralConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&general.log_level))
}

/// Install the global subscriber. Returns false if one was already set.
pub fn init_tracing(general: &GeneralConfig, format: LogFormat) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(general))
        .with_target(true);
    let installed = match format {
        LogFormat::Pretty => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    };
    if installed {
        tracing::info!(level = %general.log_level, ?format, "tracing initialised");
    }
    installed
}

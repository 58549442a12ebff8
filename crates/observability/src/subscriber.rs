//! Tracing subscriber installation.

use tracing_subscriber::EnvFilter;

use crate::format::LogFormat;

/// Install the global subscriber using [`LogFormat::from_env`].
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with(LogFormat::from_env());
}

/// Install the global subscriber with an explicit output format.
///
/// Filtering follows `RUST_LOG`, defaulting to `info`.
pub fn init_with(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .with_target(false)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .pretty()
            .with_target(true)
            .try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(%format, "tracing initialized");
    }
}

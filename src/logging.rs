//! Logging macros shared by every module.
//!
//! All events go through `tracing` under a single target so the default
//! filter (`cv_tailor=info`) catches them regardless of module.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::core::config_manager::AppConfig;

pub const LOG_TARGET: &str = "cv_tailor";

const DEFAULT_FILTER: &str = "cv_tailor=info,rocket::server=off";

#[macro_export]
macro_rules! app_log {
    ($level:ident, $($arg:tt)+) => {
        ::tracing::$level!(target: $crate::logging::LOG_TARGET, $($arg)+)
    };
}

#[macro_export]
macro_rules! app_span {
    ($name:expr) => {
        ::tracing::info_span!(target: $crate::logging::LOG_TARGET, $name)
    };
    ($name:expr, $($fields:tt)+) => {
        ::tracing::info_span!(target: $crate::logging::LOG_TARGET, $name, $($fields)+)
    };
}

/// Install the global subscriber. JSON lines go to `log_file` when one is
/// configured, human-readable output to stdout otherwise.
pub fn init(config: &AppConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    match &config.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| anyhow::anyhow!("Failed to open log file {}: {}", path.display(), e))?;

            Registry::default()
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::sync::Mutex::new(file))
                        .with_current_span(true)
                        .with_span_list(false),
                )
                .with(filter)
                .try_init()?;
        }
        None => {
            Registry::default()
                .with(fmt::layer())
                .with(filter)
                .try_init()?;
        }
    }

    Ok(())
}

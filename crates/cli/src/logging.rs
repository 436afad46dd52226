//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from `--log-level` when given, otherwise from the
//! `SITEGATE_LOG` environment variable (any `EnvFilter` directive), otherwise
//! `info`. Logs go to stderr so stdout carries only command output.

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "SITEGATE_LOG";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<&str>) -> Result<()> {
    let filter = match cli_level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    Ok(())
}

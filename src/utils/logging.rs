//! Logging initialization.
//!
//! Supports three formats:
//! - `pretty`: multi-line, coloured, for local debugging
//! - `component`: compact `[timestamp] LEVEL target message {fields}`; agents,
//!   the gateway and the correlation store tag their events with a `component`
//!   field (via [`log_component!`] or `component = "..."`) so one subsystem can
//!   be grepped out of the interleaved agent output
//! - `json`: structured JSON lines, optionally appended to a file

use std::fs::OpenOptions;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::Result;

/// Initialize the global tracing subscriber from config.
///
/// Call this once at startup before any tracing events are emitted.
/// Falls back to `RUST_LOG` env var; if unset, uses `cfg.level`.
///
/// # Errors
/// Returns `BridgeError::Io` if the JSON log file cannot be opened.
pub fn init_logging(cfg: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));

    match cfg.format {
        LogFormat::Json => match &cfg.file {
            Some(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(std::sync::Mutex::new(file))
                    .init();
            }
            None => {
                tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
        },
        LogFormat::Pretty => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .pretty()
                .init();
        }
        LogFormat::Component => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact()
                .init();
        }
    }
    Ok(())
}

/// Emit a component-tagged tracing event.
///
/// Works with any tracing level (`trace`, `debug`, `info`, `warn`, `error`).
///
/// ```
/// # use gamestore_bridge::log_component;
/// log_component!(info, "gateway", "ingress drained");
/// log_component!(warn, "provider", "catalog lookup failed", agent = "gamestop", pending = 3u64);
/// ```
#[macro_export]
macro_rules! log_component {
    ($level:ident, $component:expr, $msg:expr) => {
        tracing::$level!(component = $component, $msg)
    };
    ($level:ident, $component:expr, $msg:expr, $($key:ident = $val:expr),+ $(,)?) => {
        tracing::$level!(component = $component, $($key = $val,)+ $msg)
    };
}

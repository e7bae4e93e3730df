//! Observability infrastructure for Federa.
//!
//! Structured logging with consistent spans. The sync path emits one span per
//! table reconciliation so every event carries the database and table name.

use std::str::FromStr;
use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing::Span;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::Error;

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(Error::InvalidInput(format!(
                "log format must be one of json, pretty (got {other})"
            ))),
        }
    }
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops, as is a call made after another global
/// subscriber was installed.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `federa_catalog=debug`)
///
/// # Example
///
/// ```rust
/// use federa_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let installed = match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .try_init()
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .try_init()
            }
        };
        if installed.is_err() {
            tracing::debug!("global subscriber already installed; keeping it");
        }
    });
}

/// Creates a span for a single table synchronization.
///
/// # Example
///
/// ```rust
/// use federa_core::observability::sync_span;
///
/// let span = sync_span("sync_table", "sales", "orders");
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn sync_span(operation: &str, db_name: &str, table_name: &str) -> Span {
    tracing::info_span!("sync", op = operation, db = db_name, table = table_name)
}

/// Creates a span for backup operations.
#[must_use]
pub fn backup_span(backup_id: &str, target: &str) -> Span {
    tracing::info_span!("backup", backup_id = backup_id, target = target)
}

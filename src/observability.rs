//! Logging initialisation.
//!
//! `RUST_LOG` controls levels and defaults to `info`. Production deployments
//! use JSON lines; local runs use the pretty formatter. Logs go to stderr so
//! stdout stays free for command output.

use std::fmt;
use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt as log_fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logs.
    #[default]
    Json,
    /// Human-readable multi-line logs.
    Pretty,
}

impl LogFormat {
    /// Parses `json` or `pretty`, ignoring case and surrounding whitespace.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }

    /// Returns the format name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Installs the global subscriber.
///
/// Only the first call has any effect, so tests and binaries may both call
/// it freely.
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(env_filter);
        let installed = match format {
            LogFormat::Json => registry
                .with(log_fmt::layer().json().with_writer(std::io::stderr))
                .try_init(),
            LogFormat::Pretty => registry
                .with(log_fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init(),
        };
        if let Err(err) = installed {
            tracing::debug!(error = %err, "a global subscriber was already installed");
        }
    });
}

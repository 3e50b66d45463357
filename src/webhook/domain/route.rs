//! Webhook route selection.

use super::WebhookError;
use serde::Serialize;
use std::fmt;

/// Handler selected for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookRoute {
    /// Task status change.
    Task,
    /// Version status change.
    Version,
    /// Version created.
    VersionCreated,
}

impl WebhookRoute {
    /// Selects the route from the last non-empty segment of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::UnknownRoute`] when the segment names no
    /// handler.
    pub fn from_path(path: &str) -> Result<Self, WebhookError> {
        let segment = path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default();
        Self::try_from(segment)
    }

    /// Returns the canonical route name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Version => "version",
            Self::VersionCreated => "version_created",
        }
    }

    /// Returns `true` for routes that only act on `sg_status_list` changes.
    #[must_use]
    pub const fn requires_status_attribute(self) -> bool {
        matches!(self, Self::Task | Self::Version)
    }
}

impl TryFrom<&str> for WebhookRoute {
    type Error = WebhookError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "task" | "task_webhook" => Ok(Self::Task),
            "version" | "status" | "version_webhook" => Ok(Self::Version),
            "version_created" | "version-created" | "version_created_webhook" => {
                Ok(Self::VersionCreated)
            }
            _ => Err(WebhookError::UnknownRoute(value.to_owned())),
        }
    }
}

impl fmt::Display for WebhookRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

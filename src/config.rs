//! Process configuration.
//!
//! Settings come from environment variables, optionally seeded from a JSON
//! document named by `STATUSFLOW_CONFIG` that uses the upper-case keys of the
//! environment (`SHOTGRID_URL`, `SHOTGRID_SCRIPT_NAME`, `SHOTGRID_API_KEY`,
//! `SECRET_TOKEN`). Environment values win over the document.

use crate::observability::LogFormat;
use crate::propagation::adapters::shotgrid::ShotgridSettings;
use crate::propagation::domain::{MappingConfigError, StatusMappingTable};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::Deserialize;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Mapping document used when `STATUSFLOW_MAPPING` is unset.
pub const DEFAULT_MAPPING_PATH: &str = "config/status_mapping.yaml";

/// Port used when neither `STATUSFLOW_BIND` nor `PORT` is set.
pub const DEFAULT_PORT: u16 = 8080;

const SHOTGRID_URL: &str = "SHOTGRID_URL";
const SHOTGRID_SCRIPT_NAME: &str = "SHOTGRID_SCRIPT_NAME";
const SHOTGRID_API_KEY: &str = "SHOTGRID_API_KEY";
const SECRET_TOKEN: &str = "SECRET_TOKEN";
const CONFIG_FILE: &str = "STATUSFLOW_CONFIG";
const MAPPING: &str = "STATUSFLOW_MAPPING";
const BIND: &str = "STATUSFLOW_BIND";
const PORT: &str = "PORT";
const DISPATCH_TIMEOUT_SECS: &str = "STATUSFLOW_DISPATCH_TIMEOUT_SECS";
const LOG_FORMAT: &str = "STATUSFLOW_LOG_FORMAT";

/// Errors raised while assembling the process configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required setting is absent from both the environment and the file.
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// A setting is present but unusable.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// Setting name.
        key: &'static str,
        /// Why the value was refused.
        reason: String,
    },

    /// The configuration document could not be read or parsed.
    #[error("failed to load configuration document '{path}': {reason}")]
    File {
        /// Document path.
        path: String,
        /// Underlying failure.
        reason: String,
    },
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(rename = "SHOTGRID_URL")]
    shotgrid_url: Option<String>,
    #[serde(rename = "SHOTGRID_SCRIPT_NAME")]
    script_name: Option<String>,
    #[serde(rename = "SHOTGRID_API_KEY")]
    api_key: Option<String>,
    #[serde(rename = "SECRET_TOKEN")]
    secret_token: Option<String>,
}

impl ConfigFile {
    fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            SHOTGRID_URL => self.shotgrid_url.as_ref(),
            SHOTGRID_SCRIPT_NAME => self.script_name.as_ref(),
            SHOTGRID_API_KEY => self.api_key.as_ref(),
            SECRET_TOKEN => self.secret_token.as_ref(),
            _ => None,
        };
        value.filter(|text| !text.trim().is_empty()).cloned()
    }
}

/// Settings the request pipeline needs regardless of which tracker backs it.
#[derive(Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    secret_token: String,
    mapping_path: Utf8PathBuf,
    dispatch_timeout: Option<Duration>,
}

impl PipelineConfig {
    /// Reads the pipeline settings from the process environment, seeded from
    /// the `STATUSFLOW_CONFIG` document when one is named.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `SECRET_TOKEN` is missing, the dispatch
    /// budget cannot be parsed, or the document is unreadable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the pipeline settings through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`Self::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_sources(&Sources::open(lookup)?)
    }

    fn from_sources<F>(sources: &Sources<F>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            secret_token: sources.required(SECRET_TOKEN)?,
            mapping_path: sources.env(MAPPING).map_or_else(
                || Utf8PathBuf::from(DEFAULT_MAPPING_PATH),
                Utf8PathBuf::from,
            ),
            dispatch_timeout: dispatch_timeout(sources.env(DISPATCH_TIMEOUT_SECS).as_deref())?,
        })
    }

    /// Returns the shared webhook secret.
    #[must_use]
    pub fn secret_token(&self) -> &str {
        &self.secret_token
    }

    /// Returns the mapping document path.
    #[must_use]
    pub fn mapping_path(&self) -> &Utf8Path {
        &self.mapping_path
    }

    /// Returns the per-request dispatch budget, if any.
    #[must_use]
    pub const fn dispatch_timeout(&self) -> Option<Duration> {
        self.dispatch_timeout
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("secret_token", &"<redacted>")
            .field("mapping_path", &self.mapping_path)
            .field("dispatch_timeout", &self.dispatch_timeout)
            .finish()
    }
}

/// Everything the service needs to start.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    shotgrid_url: String,
    script_name: String,
    api_key: String,
    pipeline: PipelineConfig,
    bind: SocketAddr,
    log_format: LogFormat,
}

impl ServiceConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required setting is missing, a value
    /// cannot be parsed, or the `STATUSFLOW_CONFIG` document is unreadable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which plays the role of the
    /// environment.
    ///
    /// # Errors
    ///
    /// See [`Self::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sources = Sources::open(lookup)?;
        let log_format = match sources.env(LOG_FORMAT) {
            Some(value) => LogFormat::parse(&value).ok_or_else(|| ConfigError::Invalid {
                key: LOG_FORMAT,
                reason: format!("expected 'json' or 'pretty', got '{value}'"),
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            shotgrid_url: sources.required(SHOTGRID_URL)?,
            script_name: sources.required(SHOTGRID_SCRIPT_NAME)?,
            api_key: sources.required(SHOTGRID_API_KEY)?,
            pipeline: PipelineConfig::from_sources(&sources)?,
            bind: bind_address(
                sources.env(BIND).as_deref(),
                sources.env(PORT).as_deref(),
            )?,
            log_format,
        })
    }

    /// Returns the ShotGrid connection settings.
    #[must_use]
    pub fn shotgrid_settings(&self) -> ShotgridSettings {
        ShotgridSettings::new(&self.shotgrid_url, &self.script_name, &self.api_key)
    }

    /// Returns the tracker-independent pipeline settings.
    #[must_use]
    pub const fn pipeline(&self) -> &PipelineConfig {
        &self.pipeline
    }

    /// Returns the shared webhook secret.
    #[must_use]
    pub fn secret_token(&self) -> &str {
        self.pipeline.secret_token()
    }

    /// Returns the mapping document path.
    #[must_use]
    pub fn mapping_path(&self) -> &Utf8Path {
        self.pipeline.mapping_path()
    }

    /// Returns the listen address.
    #[must_use]
    pub const fn bind(&self) -> SocketAddr {
        self.bind
    }

    /// Returns the per-request dispatch budget, if any.
    #[must_use]
    pub const fn dispatch_timeout(&self) -> Option<Duration> {
        self.pipeline.dispatch_timeout()
    }

    /// Returns the log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("shotgrid_url", &self.shotgrid_url)
            .field("script_name", &self.script_name)
            .field("api_key", &"<redacted>")
            .field("pipeline", &self.pipeline)
            .field("bind", &self.bind)
            .field("log_format", &self.log_format)
            .finish()
    }
}

/// Environment lookup layered over the optional configuration document.
struct Sources<F> {
    lookup: F,
    file: ConfigFile,
}

impl<F> Sources<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn open(lookup: F) -> Result<Self, ConfigError> {
        let file = match non_blank(lookup(CONFIG_FILE)) {
            Some(path) => load_config_file(Utf8Path::new(&path))?,
            None => ConfigFile::default(),
        };
        Ok(Self { lookup, file })
    }

    fn env(&self, key: &str) -> Option<String> {
        non_blank((self.lookup)(key))
    }

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        self.env(key)
            .or_else(|| self.file.get(key))
            .ok_or(ConfigError::Missing(key))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

fn bind_address(bind: Option<&str>, port: Option<&str>) -> Result<SocketAddr, ConfigError> {
    if let Some(address) = bind {
        return address.trim().parse().map_err(|err| ConfigError::Invalid {
            key: BIND,
            reason: format!("{err}"),
        });
    }
    let port_number = match port {
        Some(value) => value.trim().parse::<u16>().map_err(|err| ConfigError::Invalid {
            key: PORT,
            reason: format!("{err}"),
        })?,
        None => DEFAULT_PORT,
    };
    Ok(SocketAddr::from(([0, 0, 0, 0], port_number)))
}

fn dispatch_timeout(value: Option<&str>) -> Result<Option<Duration>, ConfigError> {
    value
        .map(|text| {
            text.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|err| ConfigError::Invalid {
                    key: DISPATCH_TIMEOUT_SECS,
                    reason: format!("{err}"),
                })
        })
        .transpose()
}

fn load_config_file(path: &Utf8Path) -> Result<ConfigFile, ConfigError> {
    let file_error = |reason: String| ConfigError::File {
        path: path.to_string(),
        reason,
    };
    let source = read_utf8(path).map_err(|err| file_error(err.to_string()))?;
    serde_json::from_str(&source).map_err(|err| file_error(err.to_string()))
}

/// Loads and validates the status mapping document at `path`.
///
/// # Errors
///
/// Returns [`MappingConfigError::Read`] when the file cannot be read, or any
/// parse and validation error from [`StatusMappingTable::from_yaml_str`].
pub fn load_mapping_table(path: &Utf8Path) -> Result<StatusMappingTable, MappingConfigError> {
    let source = read_utf8(path).map_err(|err| MappingConfigError::Read {
        path: path.to_string(),
        reason: err.to_string(),
    })?;
    StatusMappingTable::from_yaml_str(&source)
}

/// Reads a UTF-8 file through a capability handle on its parent directory.
///
/// # Errors
///
/// Returns the I/O error from opening the directory or reading the file.
pub fn read_utf8(path: &Utf8Path) -> io::Result<String> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("'{path}' names no file"))
    })?;
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    Dir::open_ambient_dir(parent, ambient_authority())?.read_to_string(file_name)
}

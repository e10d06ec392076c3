//! Client configuration file naming the gist and the files to mirror.
//!
//! ```yaml
//! gist_id: abc123
//! check_interval: 30s
//! mappings:
//!   - gist_file: nginx.conf
//!     local_path: /etc/nginx/nginx.conf
//!     exec: systemctl reload nginx
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::serde_yaml;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::local_fs::LocalFile;
use crate::sync::{Mapping, MappingTable};

/// Poll interval used when the file omits `check_interval`.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Errors raised while loading the client configuration.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ClientConfigError {
    /// Raised when the file cannot be read.
    #[error("failed to read {path}: {message}")]
    Io {
        /// Path that could not be read.
        path: Utf8PathBuf,
        /// Human-readable error message.
        message: String,
    },
    /// Raised when the file is not valid YAML for this schema.
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// Path that could not be parsed.
        path: Utf8PathBuf,
        /// Parser message.
        message: String,
    },
    /// Raised when `check_interval` is not a duration.
    #[error("invalid check_interval {value:?}: {message}")]
    Interval {
        /// Raw value from the file.
        value: String,
        /// Parser message.
        message: String,
    },
    /// Raised when a parsed file is semantically invalid.
    #[error("invalid client configuration: {0}")]
    Invalid(String),
}

/// One `mappings` entry.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct MappingEntry {
    /// Name of the file inside the gist.
    pub gist_file: String,
    /// Destination on the local filesystem.
    pub local_path: String,
    /// Shell command run after the file is updated.
    #[serde(default)]
    pub exec: Option<String>,
    #[serde(flatten)]
    unknown: BTreeMap<String, serde_yaml::Value>,
}

/// Parsed client configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct ClientConfig {
    /// Gist to mirror.
    #[serde(default)]
    pub gist_id: String,
    /// Poll interval in `humantime` syntax, such as `30s` or `5m`.
    #[serde(default)]
    pub check_interval: Option<String>,
    /// Files to mirror, in processing order.
    #[serde(default)]
    pub mappings: Vec<MappingEntry>,
    #[serde(flatten)]
    unknown: BTreeMap<String, serde_yaml::Value>,
}

impl ClientConfig {
    /// Reads and parses the file at `path`. Call [`Self::validate`] after
    /// applying any overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ClientConfigError::Io`] when the file cannot be read and
    /// [`ClientConfigError::Parse`] when it is malformed.
    pub fn load(path: &Utf8Path) -> Result<Self, ClientConfigError> {
        let contents = read_file(path)?;
        Self::from_yaml(path, &contents)
    }

    /// Parses YAML without validating it. `path` is used in error messages.
    /// Unrecognised keys are logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ClientConfigError::Parse`] for malformed YAML.
    pub fn from_yaml(path: &Utf8Path, contents: &str) -> Result<Self, ClientConfigError> {
        let config: Self =
            serde_yaml::from_str(contents).map_err(|err| ClientConfigError::Parse {
                path: path.to_path_buf(),
                message: err.to_string(),
            })?;
        for key in config.unknown_keys() {
            warn!(path = %path, key = %key, "ignoring unknown client configuration key");
        }
        Ok(config)
    }

    /// Keys present in the file that this version does not recognise, with
    /// mapping keys prefixed by their position.
    #[must_use]
    pub fn unknown_keys(&self) -> Vec<String> {
        let top = self.unknown.keys().cloned();
        let nested = self.mappings.iter().enumerate().flat_map(|(index, entry)| {
            entry
                .unknown
                .keys()
                .map(move |key| format!("mappings[{index}].{key}"))
        });
        top.chain(nested).collect()
    }

    /// Replaces the gist id when `id` is present and non-blank.
    #[must_use]
    pub fn with_gist_id(mut self, id: Option<&str>) -> Self {
        if let Some(value) = id.map(str::trim).filter(|value| !value.is_empty()) {
            value.clone_into(&mut self.gist_id);
        }
        self
    }

    /// Parsed poll interval, defaulting to ten seconds.
    ///
    /// # Errors
    ///
    /// Returns [`ClientConfigError::Interval`] when the value does not parse.
    pub fn check_interval(&self) -> Result<Duration, ClientConfigError> {
        let Some(raw) = self.check_interval.as_deref() else {
            return Ok(DEFAULT_CHECK_INTERVAL);
        };
        humantime::parse_duration(raw.trim()).map_err(|err| ClientConfigError::Interval {
            value: raw.to_owned(),
            message: err.to_string(),
        })
    }

    /// Checks the file has everything the watcher needs. Two mappings may
    /// share a `gist_file` to place copies in several locations.
    ///
    /// # Errors
    ///
    /// Returns [`ClientConfigError::Invalid`] or
    /// [`ClientConfigError::Interval`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ClientConfigError> {
        if self.gist_id.trim().is_empty() {
            return Err(ClientConfigError::Invalid(String::from(
                "gist_id is required: add it to the file, pass --gist-id, or set GIST_ID",
            )));
        }
        if self.mappings.is_empty() {
            return Err(ClientConfigError::Invalid(String::from(
                "at least one entry under mappings is required",
            )));
        }
        for (index, entry) in self.mappings.iter().enumerate() {
            if entry.gist_file.trim().is_empty() {
                return Err(ClientConfigError::Invalid(format!(
                    "mappings[{index}].gist_file must not be empty"
                )));
            }
            if entry.local_path.trim().is_empty() {
                return Err(ClientConfigError::Invalid(format!(
                    "mappings[{index}].local_path must not be empty"
                )));
            }
        }
        self.check_interval()?;
        Ok(())
    }

    /// Builds the engine's mapping table in file order.
    #[must_use]
    pub fn mapping_table(&self) -> MappingTable {
        self.mappings
            .iter()
            .map(|entry| {
                Mapping::new(
                    entry.gist_file.trim(),
                    Utf8PathBuf::from(entry.local_path.trim()),
                    entry.exec.clone(),
                )
            })
            .collect()
    }
}

fn read_file(path: &Utf8Path) -> Result<String, ClientConfigError> {
    let file = LocalFile::resolve(path).ok_or_else(|| ClientConfigError::Io {
        path: path.to_path_buf(),
        message: String::from("path is missing a filename"),
    })?;
    file.read_to_string().map_err(|err| ClientConfigError::Io {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

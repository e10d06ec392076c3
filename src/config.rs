//! Layered settings loaded via `ortho-config`.
//!
//! These settings hold credentials and endpoint overrides. The list of files
//! to mirror lives in the client configuration file instead (see
//! [`crate::client_config`]).

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::gist::{GistClient, GistError};

/// GitHub access settings derived from environment variables and
/// configuration files.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "GIST",
    discovery(
        app_name = "conf-sync",
        env_var = "CONF_SYNC_CONFIG_PATH",
        config_file_name = "conf-sync.yaml",
        dotfile_name = ".conf-sync.yaml",
        project_file_name = "conf-sync.yaml"
    )
)]
pub struct GistConfig {
    /// Personal access token. Without it the client runs anonymously and
    /// can neither upload nor delete.
    pub token: Option<String>,
    /// Gist identifier. Overrides the value in the client configuration
    /// file.
    pub id: Option<String>,
    /// REST API root. Defaults to the public GitHub endpoint.
    #[ortho_config(default = "https://api.github.com".to_owned())]
    pub api_url: String,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    yaml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, yaml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            yaml_key,
        }
    }

    fn message(&self) -> String {
        format!(
            "empty {}: set {} or add {} to conf-sync.yaml",
            self.description, self.env_var, self.yaml_key
        )
    }
}

impl GistConfig {
    fn reject_blank(value: Option<&str>, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        match value {
            Some(text) if text.trim().is_empty() => {
                Err(ConfigError::MissingField(metadata.message()))
            }
            _ => Ok(()),
        }
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("conf-sync")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation. Absent values are fine; present but
    /// blank values are rejected with guidance.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a value is blank.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::reject_blank(
            Some(self.api_url.as_str()),
            &FieldMetadata::new("GitHub API URL", "GIST_API_URL", "api_url"),
        )?;
        Self::reject_blank(
            self.token.as_deref(),
            &FieldMetadata::new("GitHub token", "GIST_TOKEN", "token"),
        )?;
        Self::reject_blank(
            self.id.as_deref(),
            &FieldMetadata::new("gist ID", "GIST_ID", "id"),
        )?;
        Ok(())
    }

    /// Builds a client for `gist_id`, authenticated when a token is set.
    ///
    /// # Errors
    ///
    /// Returns [`GistError`] when the API URL is invalid or the HTTP client
    /// cannot be built.
    pub fn client(&self, gist_id: &str) -> Result<GistClient, GistError> {
        GistClient::with_base_url(&self.api_url, gist_id, self.token.clone())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn settings() -> GistConfig {
        GistConfig {
            token: Some(String::from("ghp_example")),
            id: None,
            api_url: String::from("https://api.github.com"),
        }
    }

    #[rstest]
    #[case::token(|cfg: &mut GistConfig| cfg.token = Some(String::from(" ")), "GIST_TOKEN")]
    #[case::id(|cfg: &mut GistConfig| cfg.id = Some(String::new()), "GIST_ID")]
    #[case::api_url(|cfg: &mut GistConfig| cfg.api_url.clear(), "GIST_API_URL")]
    fn blank_values_name_their_env_var(
        mut settings: GistConfig,
        #[case] mutate: fn(&mut GistConfig),
        #[case] env_var: &str,
    ) {
        mutate(&mut settings);
        let Err(ConfigError::MissingField(message)) = settings.validate() else {
            panic!("validation should reject a blank value");
        };
        assert!(message.contains(env_var), "message should name {env_var}: {message}");
        assert!(message.contains("conf-sync.yaml"), "message should name the file: {message}");
    }

    #[rstest]
    fn absent_token_builds_anonymous_client(mut settings: GistConfig) {
        settings.token = None;
        assert_eq!(settings.validate(), Ok(()));
        let client = settings
            .client("abc123")
            .unwrap_or_else(|err| panic!("client should build: {err}"));
        assert!(!client.is_authenticated());
    }
}

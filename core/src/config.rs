//! Application-level parser settings.
//!
//! [`ParserSettings`] carries the policy defaults every command inherits from
//! and the [`AppInfo`] shown by help and version renderers. Settings can be
//! kept in a YAML file next to the application:
//!
//! ```yaml
//! policy:
//!   ignore_unknown_options: true
//! app:
//!   name: deploy
//!   version: 1.4.0
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::fs;
use std::path::Path;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::policy::ParserPolicy;

/// Errors that can occur while loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed YAML or unexpected field types.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Application metadata for help and version output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppInfo {
    /// Program name used in usage lines.
    pub name: String,
    /// Application version.
    pub version: Option<String>,
    /// Author or copyright holder.
    pub author: Option<String>,
    /// Copyright year; the current year unless configured.
    pub year: i32,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: None,
            author: None,
            year: chrono::Local::now().year(),
        }
    }
}

impl AppInfo {
    /// Creates metadata for the named program.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Sets the application version.
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// Sets the author.
    pub fn with_author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    /// Overrides the copyright year.
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = year;
        self
    }
}

/// Policy defaults plus application metadata.
///
/// # Examples
///
/// ```
/// use command_tree_core::ParserSettings;
///
/// let settings = ParserSettings::from_yaml_str(
///     "policy:\n  provide_version_command: false\napp:\n  name: tool\n",
/// )
/// .unwrap();
/// assert_eq!(settings.app.name, "tool");
/// assert!(!settings.policy.provide_version_command);
/// assert!(settings.policy.provide_help_command);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    /// Policies in effect where no command overrides them.
    pub policy: ParserPolicy,
    /// Application metadata.
    pub app: AppInfo,
}

impl ParserSettings {
    /// Default policies for the given application.
    pub fn new(app: AppInfo) -> Self {
        Self {
            policy: ParserPolicy::default(),
            app,
        }
    }

    /// Replaces the policy defaults.
    pub fn with_policy(mut self, policy: ParserPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Parses settings from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] when the text is not valid settings YAML.
    pub fn from_yaml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Loads settings from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if it cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    /// Writes the settings to a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}

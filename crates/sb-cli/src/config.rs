//! Process settings
//!
//! Layered, later wins:
//! 1. Built-in defaults
//! 2. `settings.toml`
//! 3. `.secrets.toml`
//! 4. Environment variables
//!
//! Each file may keep its values under a `[default]` table. Keys are matched
//! in lower case, so `SLACK_USER_TOKEN = "..."` works as well as
//! `slack_user_token = "..."`.

use sb_directory::{DirectoryConfig, DEFAULT_SCIM_BASE, DEFAULT_WEB_API_BASE};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings files, in load order
pub const SETTINGS_FILES: [&str; 2] = ["settings.toml", ".secrets.toml"];

/// Settings loading errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// File exists but cannot be read
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Merged values do not fit the settings shape
    #[error("invalid settings: {0}")]
    Invalid(#[source] toml::de::Error),

    /// Environment override is not a boolean
    #[error("{name}={value} is not a boolean")]
    InvalidBool { name: &'static str, value: String },
}

/// Effective process settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// User token with admin scopes
    pub slack_user_token: String,
    /// Log to stderr
    pub log_to_console: bool,
    /// Log to a daily rotated file in `log_dir`
    pub log_to_file: bool,
    /// Log every debounce wait at info
    pub log_debouncing: bool,
    /// Directory for log files
    pub log_dir: PathBuf,
    /// Suffix appended to workspace domains
    pub domain_suffix: String,
    /// Web API base URL
    pub web_api_base: String,
    /// SCIM base URL
    pub scim_base: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            slack_user_token: String::new(),
            log_to_console: true,
            log_to_file: false,
            log_debouncing: false,
            log_dir: PathBuf::from("/tmp"),
            domain_suffix: "misr".to_string(),
            web_api_base: DEFAULT_WEB_API_BASE.to_string(),
            scim_base: DEFAULT_SCIM_BASE.to_string(),
        }
    }
}

impl Settings {
    /// Load files from `dir`, then apply the process environment
    ///
    /// # Errors
    /// - `SettingsError::Read` / `Parse` for an unreadable or invalid file
    /// - `SettingsError::InvalidBool` for a bad boolean override
    pub fn load(dir: &Path) -> Result<Self, SettingsError> {
        let mut settings = Self::from_files(dir)?;
        settings.apply_env(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    /// Merge the settings files found in `dir`; missing files are skipped
    ///
    /// # Errors
    /// - `SettingsError::Read` / `Parse` / `Invalid`
    pub fn from_files(dir: &Path) -> Result<Self, SettingsError> {
        let mut merged = toml::Table::new();

        for name in SETTINGS_FILES {
            let path = dir.join(name);
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(source) => return Err(SettingsError::Read { path, source }),
            };
            let table: toml::Table = text
                .parse()
                .map_err(|source| SettingsError::Parse { path: path.clone(), source })?;
            tracing::debug!(path = %path.display(), "Loaded settings file");
            merged.extend(normalize(section(table)));
        }

        toml::Value::Table(merged)
            .try_into()
            .map_err(SettingsError::Invalid)
    }

    /// Apply environment overrides through `lookup`
    ///
    /// # Errors
    /// - `SettingsError::InvalidBool` if a boolean variable does not parse
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("SLACK_USER_TOKEN") {
            self.slack_user_token = token;
        }
        if let Some(value) = lookup("LOG_TO_CONSOLE") {
            self.log_to_console = parse_bool("LOG_TO_CONSOLE", value)?;
        }
        if let Some(value) = lookup("LOG_TO_FILE") {
            self.log_to_file = parse_bool("LOG_TO_FILE", value)?;
        }
        if let Some(value) = lookup("LOG_DEBOUNCING") {
            self.log_debouncing = parse_bool("LOG_DEBOUNCING", value)?;
        }
        if let Some(dir) = lookup("LOG_DIR") {
            self.log_dir = PathBuf::from(dir);
        }
        if let Some(suffix) = lookup("DOMAIN_SUFFIX") {
            self.domain_suffix = suffix;
        }
        Ok(())
    }

    /// Directory client configuration derived from these settings
    #[must_use]
    pub fn directory_config(&self) -> DirectoryConfig {
        let mut config = DirectoryConfig::new()
            .with_log_debouncing(self.log_debouncing)
            .with_domain_suffix(self.domain_suffix.clone());
        config.web_api_base.clone_from(&self.web_api_base);
        config.scim_base.clone_from(&self.scim_base);
        config
    }
}

/// `[default]` table if present, otherwise the whole file
fn section(mut table: toml::Table) -> toml::Table {
    let default_key = table
        .keys()
        .find(|key| key.eq_ignore_ascii_case("default"))
        .cloned();
    match default_key.and_then(|key| table.remove(&key)) {
        Some(toml::Value::Table(default)) => default,
        _ => table,
    }
}

fn normalize(table: toml::Table) -> toml::Table {
    table
        .into_iter()
        .map(|(key, value)| (key.to_ascii_lowercase(), value))
        .collect()
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, SettingsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(SettingsError::InvalidBool { name, value }),
    }
}

//! Runtime settings for the Workline CLI.
//!
//! Settings come from a JSON file (`~/.config/workline/config.json` on most
//! platforms, or the path in `WORKLINE_CONFIG_PATH`) with individual values
//! overridable through `WORKLINE_*` environment variables. A missing file
//! yields the defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use dirs_next::config_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::expand_tilde;

/// Environment variable overriding the settings file path.
pub const CONFIG_PATH_ENV: &str = "WORKLINE_CONFIG_PATH";

pub const FILES_DIR_ENV: &str = "WORKLINE_FILES_DIR";
pub const PROCESSES_DIR_ENV: &str = "WORKLINE_PROCESSES_DIR";
pub const RECORDS_PATH_ENV: &str = "WORKLINE_RECORDS_PATH";
pub const SMTP_HOST_ENV: &str = "WORKLINE_SMTP_HOST";
pub const SMTP_PORT_ENV: &str = "WORKLINE_SMTP_PORT";
pub const SMTP_USERNAME_ENV: &str = "WORKLINE_SMTP_USERNAME";
pub const SMTP_PASSWORD_ENV: &str = "WORKLINE_SMTP_PASSWORD";
pub const SMTP_TLS_ENV: &str = "WORKLINE_SMTP_TLS";
pub const MAIL_FROM_ENV: &str = "WORKLINE_MAIL_FROM";
pub const HTTP_TIMEOUT_ENV: &str = "WORKLINE_HTTP_TIMEOUT_SECS";

const CONFIG_FILE_NAME: &str = "config.json";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
/// Port conventionally served with implicit TLS (SMTPS).
const SMTPS_PORT: u16 = 465;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("environment variable {name} has invalid value '{value}'")]
    InvalidEnv { name: &'static str, value: String },

    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory PDF templates are read from and rendered files written to.
    pub files_dir: PathBuf,
    /// Directory holding process definition files.
    pub processes_dir: PathBuf,
    /// JSON file holding persisted records.
    pub records_path: PathBuf,
    /// Sender applied to outgoing mail that names none.
    pub mail_from: Option<String>,
    pub http: HttpSettings,
    pub smtp: Option<SmtpSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            files_dir: PathBuf::from("./files"),
            processes_dir: PathBuf::from("./processes"),
            records_path: PathBuf::from("./records.json"),
            mail_from: None,
            http: HttpSettings::default(),
            smtp: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmtpSettings {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Connection security; derived from the port when unset.
    #[serde(default)]
    pub tls: Option<SmtpTls>,
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpTls {
    /// Implicit TLS from the first byte, usually port 465.
    Wrapper,
    /// Plaintext greeting upgraded with `STARTTLS`, usually ports 587 and 25.
    Starttls,
    /// No encryption. Only for local relays.
    None,
}

impl std::str::FromStr for SmtpTls {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "wrapper" => Ok(SmtpTls::Wrapper),
            "starttls" => Ok(SmtpTls::Starttls),
            "none" => Ok(SmtpTls::None),
            _ => Err(()),
        }
    }
}

impl SmtpSettings {
    /// The configured mode, or implicit TLS on port 465 and `STARTTLS`
    /// everywhere else.
    pub fn tls_mode(&self) -> SmtpTls {
        match (self.tls, self.port) {
            (Some(mode), _) => mode,
            (None, Some(SMTPS_PORT)) | (None, None) => SmtpTls::Wrapper,
            (None, Some(_)) => SmtpTls::Starttls,
        }
    }
}

impl Settings {
    /// Loads settings from the default location and applies environment
    /// overrides.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(&default_settings_path())
    }

    /// Loads settings from `path` and applies environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let mut settings = read_settings_file(path)?;
        settings.apply_env_overrides()?;
        settings.expand_paths();
        settings.validate()?;
        Ok(settings)
    }

    /// Applies every `WORKLINE_*` override that is set and non-empty.
    pub fn apply_env_overrides(&mut self) -> Result<(), SettingsError> {
        if let Some(value) = env_value(FILES_DIR_ENV) {
            self.files_dir = PathBuf::from(value);
        }
        if let Some(value) = env_value(PROCESSES_DIR_ENV) {
            self.processes_dir = PathBuf::from(value);
        }
        if let Some(value) = env_value(RECORDS_PATH_ENV) {
            self.records_path = PathBuf::from(value);
        }
        if let Some(value) = env_value(MAIL_FROM_ENV) {
            self.mail_from = Some(value);
        }
        if let Some(value) = env_value(HTTP_TIMEOUT_ENV) {
            self.http.timeout_secs = parse_env(HTTP_TIMEOUT_ENV, value)?;
        }

        if let Some(host) = env_value(SMTP_HOST_ENV) {
            self.smtp.get_or_insert_with(SmtpSettings::default).host = host;
        }
        if let Some(value) = env_value(SMTP_PORT_ENV) {
            self.smtp.get_or_insert_with(SmtpSettings::default).port = Some(parse_env(SMTP_PORT_ENV, value)?);
        }
        if let Some(username) = env_value(SMTP_USERNAME_ENV) {
            self.smtp.get_or_insert_with(SmtpSettings::default).username = Some(username);
        }
        if let Some(password) = env_value(SMTP_PASSWORD_ENV) {
            self.smtp.get_or_insert_with(SmtpSettings::default).password = Some(password);
        }
        if let Some(value) = env_value(SMTP_TLS_ENV) {
            self.smtp.get_or_insert_with(SmtpSettings::default).tls = Some(parse_env(SMTP_TLS_ENV, value)?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.http.timeout_secs == 0 {
            return Err(SettingsError::Invalid("http.timeout_secs must be greater than zero".into()));
        }
        if let Some(smtp) = &self.smtp
            && smtp.host.trim().is_empty()
        {
            return Err(SettingsError::Invalid("smtp.host is required when smtp is configured".into()));
        }
        Ok(())
    }

    fn expand_paths(&mut self) {
        for path in [&mut self.files_dir, &mut self.processes_dir, &mut self.records_path] {
            if let Some(raw) = path.to_str() {
                *path = expand_tilde(raw);
            }
        }
    }
}

/// `WORKLINE_CONFIG_PATH`, or `config.json` under the platform config
/// directory.
pub fn default_settings_path() -> PathBuf {
    if let Some(path) = env_value(CONFIG_PATH_ENV) {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("workline")
        .join(CONFIG_FILE_NAME)
}

fn read_settings_file(path: &Path) -> Result<Settings, SettingsError> {
    match fs::read_to_string(path) {
        Ok(data) => serde_json::from_str(&data).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        }),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "settings file not found; using defaults");
            Ok(Settings::default())
        }
        Err(source) => Err(SettingsError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, SettingsError> {
    value.parse().map_err(|_| SettingsError::InvalidEnv { name, value })
}

//! Startup configuration read from the environment

use crate::phrases::{Locale, Phrases};
use crate::state_machine::ChatIdentity;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const REVIEWER_KEY: &str = "REVIEWER_CHAT_ID";
const LEGACY_REVIEWER_KEY: &str = "HR_TELEGRAM_ID";
const DEFAULT_CREDENTIALS_PATH: &str = "service_account.json";
const DEFAULT_LOG_PATH: &str = "applicants.csv";
const DEFAULT_IDLE_SECS: u64 = 600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error("cannot write credentials to {path}: {source}")]
    CredentialsWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone)]
pub struct Config {
    pub bot_token: String,
    pub reviewer: ChatIdentity,
    pub spreadsheet_id: String,
    pub worksheet: String,
    pub drive_folder_id: String,
    /// Raw service-account JSON, persisted to `credentials_path` at startup
    pub credentials_json: String,
    pub credentials_path: PathBuf,
    pub log_path: PathBuf,
    pub locale: Locale,
    pub worker_idle_timeout: Duration,
}

// Secrets stay out of debug output
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("reviewer", &self.reviewer)
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("worksheet", &self.worksheet)
            .field("drive_folder_id", &self.drive_folder_id)
            .field("credentials_path", &self.credentials_path)
            .field("log_path", &self.log_path)
            .field("locale", &self.locale)
            .field("worker_idle_timeout", &self.worker_idle_timeout)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        // Older deployments name the reviewer HR_TELEGRAM_ID
        let (reviewer_key, reviewer_raw) = get(REVIEWER_KEY)
            .map(|raw| (REVIEWER_KEY, raw))
            .or_else(|| get(LEGACY_REVIEWER_KEY).map(|raw| (LEGACY_REVIEWER_KEY, raw)))
            .ok_or(ConfigError::Missing(REVIEWER_KEY))?;
        let reviewer = reviewer_raw
            .trim()
            .parse::<i64>()
            .map(ChatIdentity)
            .map_err(|e| ConfigError::Invalid {
                key: reviewer_key,
                value: reviewer_raw.clone(),
                reason: e.to_string(),
            })?;

        let locale = match get("INTAKE_LOCALE") {
            Some(raw) => raw.parse::<Locale>().map_err(|reason| ConfigError::Invalid {
                key: "INTAKE_LOCALE",
                value: raw.clone(),
                reason,
            })?,
            None => Locale::default(),
        };

        let idle_secs = match get("INTAKE_WORKER_IDLE_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    key: "INTAKE_WORKER_IDLE_SECS",
                    value: raw.clone(),
                    reason: "expected a positive number of seconds".to_string(),
                })?,
            None => DEFAULT_IDLE_SECS,
        };

        Ok(Self {
            bot_token: require("BOT_TOKEN")?,
            reviewer,
            spreadsheet_id: require("GOOGLE_SHEET_ID")?,
            worksheet: get("SHEET_NAME")
                .unwrap_or_else(|| Phrases::for_locale(locale).default_worksheet.to_string()),
            drive_folder_id: require("DRIVE_FOLDER_ID")?,
            credentials_json: require("GOOGLE_CREDENTIALS_JSON")?,
            credentials_path: get("GOOGLE_CREDENTIALS_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_PATH), PathBuf::from),
            log_path: get("INTAKE_LOG_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_LOG_PATH), PathBuf::from),
            locale,
            worker_idle_timeout: Duration::from_secs(idle_secs),
        })
    }

    /// Persist the credentials payload with owner-only permissions
    pub fn write_credentials(&self) -> Result<&Path, ConfigError> {
        let path = self.credentials_path.as_path();
        let io_err = |source| ConfigError::CredentialsWrite {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path).map_err(io_err)?;
        file.write_all(self.credentials_json.as_bytes())
            .map_err(io_err)?;

        // `mode` only applies on creation; tighten a pre-existing file too
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .map_err(io_err)?;
        }

        Ok(path)
    }
}

//! Configuration types.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::files::DriveConfig;
use crate::notify::SmtpConfig;

/// Service configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// libSQL database file.
    pub db_path: PathBuf,
    /// HTTP listen port.
    pub port: u16,
    /// Public URL used in student-facing links.
    pub base_url: String,
    /// Optional JSON step table replacing the built-in one.
    pub steps_file: Option<PathBuf>,
    /// School name printed on contracts.
    pub provider_name: String,
    /// `token=role[:email]` list. See `StaticTokenIdentity::parse`.
    pub staff_tokens: SecretString,
    /// Used when Drive is not configured.
    pub upload_dir: PathBuf,
    pub smtp: Option<SmtpConfig>,
    pub drive: Option<DriveConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from any variable source.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match var("ONBOARDING_PORT") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "ONBOARDING_PORT".to_string(),
                message: format!("{e}"),
            })?,
            None => 8080,
        };

        let base_url = var("ONBOARDING_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "ONBOARDING_BASE_URL".to_string(),
                message: format!("'{base_url}' is not an http(s) URL"),
            });
        }

        Ok(Self {
            db_path: var("ONBOARDING_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/onboarding.db")),
            port,
            base_url,
            steps_file: var("ONBOARDING_STEPS_FILE")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            provider_name: var("ONBOARDING_PROVIDER_NAME")
                .unwrap_or_else(|| "The Language Corp".to_string()),
            staff_tokens: SecretString::from(var("ONBOARDING_STAFF_TOKENS").unwrap_or_default()),
            upload_dir: var("ONBOARDING_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/uploads")),
            smtp: SmtpConfig::from_vars(&var)?,
            drive: DriveConfig::from_vars(&var)?,
        })
    }
}

use crate::errors::{AppError, AppResult};
use crate::i18n::Locale;
use crate::models::{FilterInput, Identity};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Resolved configuration with all values filled in.
///
/// This struct holds the connection and output defaults and can be deserialized
/// from the `[server]` table of a TOML file. Only `session_cookie` and
/// `request_timeout_secs` are genuinely optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolvedConfig {
    /// Base URL of the API server, e.g. `https://api.example.com`
    pub base_url: String,
    /// User id sent in the `New-Api-User` header
    pub user_id: String,
    /// Session cookie sent with every request, e.g. `session=...`
    pub session_cookie: Option<String>,
    /// Whether the caller is an administrator. Only administrators may export.
    pub is_admin: bool,
    /// Directory the exported CSV files are saved into
    pub output_dir: PathBuf,
    /// Language of user-facing messages: `en` or `zh`
    pub locale: String,
    /// Raw quota units per currency unit, used to render consumed quota
    pub quota_per_unit: f64,
    /// Request timeout in seconds. Unset means requests may wait indefinitely.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            user_id: String::new(),
            session_cookie: None,
            is_admin: false,
            output_dir: PathBuf::from("."),
            locale: "en".to_string(),
            quota_per_unit: 500_000.0,
            request_timeout_secs: None,
        }
    }
}

impl ResolvedConfig {
    /// Checks values that serde cannot: URL syntax, identity, positive numbers.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` (or `UrlError` for the base URL) describing the first bad value.
    pub fn validate(&self) -> AppResult<()> {
        self.base_url()?;
        self.locale()?;
        if self.user_id.trim().is_empty() {
            return Err(AppError::InvalidInput("User id must not be empty".into()));
        }
        if !(self.quota_per_unit > 0.0) {
            return Err(AppError::InvalidInput(
                "Quota per unit must be greater than 0".into(),
            ));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(AppError::InvalidInput(
                "Request timeout must be greater than 0 when set".into(),
            ));
        }
        Ok(())
    }

    pub fn base_url(&self) -> AppResult<Url> {
        let url = Url::parse(&self.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::UrlError(format!(
                "Base URL must use http or https, got: {}",
                self.base_url
            )));
        }
        Ok(url)
    }

    pub fn locale(&self) -> AppResult<Locale> {
        self.locale.parse()
    }

    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id.clone(),
            session_cookie: self.session_cookie.clone(),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Configuration that can be loaded from a TOML file.
///
/// Both tables are optional:
///
/// ```toml
/// [server]
/// base_url = "https://api.example.com"
/// user_id = "1"
/// is_admin = true
///
/// [filters]
/// username = "alice"
/// start_timestamp = "2024-01-01 00:00:00"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolvedConfigFile {
    /// Connection, identity and output settings
    pub server: ResolvedConfig,
    /// Filter values for the export
    pub filters: FilterInput,
}

impl ResolvedConfigFile {
    /// Loads configuration from a TOML file.
    ///
    /// Rejects unknown keys to prevent typos from being silently ignored.
    /// Semantic validation is left to [`ResolvedConfig::validate`] so that
    /// command-line overrides can be applied first.
    ///
    /// # Errors
    ///
    /// Returns `IoError` if the file cannot be read and `InvalidInput` if the
    /// TOML is malformed or contains unknown keys.
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| AppError::InvalidInput(format!("Failed to parse config: {e}")))
    }
}

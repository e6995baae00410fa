//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "token": { "secret": "<hex>", "ttlHours": 24, "issuer": "eaglebank" },
//!   "retry": { "maxAttempts": 3, "delayMs": 10 },
//!   "logging": { "level": "info", "format": "text" }
//! }
//! ```
//! Every section and field is optional. Keys this crate does not know are
//! preserved when the file is written back.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::services::token::DEFAULT_TTL_HOURS;
use crate::services::transaction::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY_MS};
use crate::services::{RetryPolicy, TokenService};

pub const SETTINGS_FILE: &str = "settings.json";

/// Hex-encoded signing secret; takes precedence over the file
pub const ENV_TOKEN_SECRET: &str = "EAGLEBANK_TOKEN_SECRET";

/// Log filter directive; takes precedence over the file
pub const ENV_LOG_LEVEL: &str = "EAGLEBANK_LOG_LEVEL";

const DEFAULT_ISSUER: &str = "eaglebank";

/// Longest token lifetime accepted from settings (one year)
pub const MAX_TTL_HOURS: i64 = 24 * 365;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    token: TokenSettings,
    #[serde(default)]
    retry: RetrySettings,
    #[serde(default)]
    logging: LoggingSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secret: Option<String>,
    #[serde(default = "default_ttl_hours")]
    ttl_hours: i64,
    #[serde(default = "default_issuer")]
    issuer: String,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            secret: None,
            ttl_hours: DEFAULT_TTL_HOURS,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,
    #[serde(default = "default_delay_ms")]
    delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoggingSettings {
    #[serde(default = "default_log_level")]
    level: String,
    #[serde(default)]
    format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_ttl_hours() -> i64 {
    DEFAULT_TTL_HOURS
}

fn default_issuer() -> String {
    DEFAULT_ISSUER.to_string()
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_delay_ms() -> u64 {
    DEFAULT_RETRY_DELAY_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Where the signing secret came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    Environment,
    File,
    /// Freshly generated; not on disk until [`Config::save`]
    Generated,
}

/// Eaglebank configuration (resolved view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub token_secret: Vec<u8>,
    pub secret_source: SecretSource,
    pub token_ttl_hours: i64,
    pub token_issuer: String,
    pub retry: RetryPolicy,
    pub log_level: String,
    pub log_format: LogFormat,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Config {
    /// Load config from the data directory, applying environment overrides
    ///
    /// A missing file yields defaults. A file that is present but does not
    /// parse is an error rather than silently replaced.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(data_dir)?;

        let (token_secret, secret_source) = match std::env::var(ENV_TOKEN_SECRET) {
            Ok(hex_secret) if !hex_secret.trim().is_empty() => (
                decode_secret(&hex_secret).with_context(|| format!("invalid {}", ENV_TOKEN_SECRET))?,
                SecretSource::Environment,
            ),
            _ => match raw.token.secret.as_deref() {
                Some(hex_secret) => (
                    decode_secret(hex_secret).context("invalid token.secret in settings.json")?,
                    SecretSource::File,
                ),
                None => (TokenService::generate_secret(), SecretSource::Generated),
            },
        };

        if raw.token.ttl_hours <= 0 {
            bail!("token.ttlHours must be positive, got {}", raw.token.ttl_hours);
        }
        if raw.token.ttl_hours > MAX_TTL_HOURS {
            bail!(
                "token.ttlHours must be at most {}, got {}",
                MAX_TTL_HOURS,
                raw.token.ttl_hours
            );
        }
        if raw.retry.max_attempts == 0 {
            bail!("retry.maxAttempts must be at least 1");
        }

        let log_level = std::env::var(ENV_LOG_LEVEL)
            .ok()
            .filter(|level| !level.trim().is_empty())
            .unwrap_or_else(|| raw.logging.level.clone());

        Ok(Self {
            token_secret,
            secret_source,
            token_ttl_hours: raw.token.ttl_hours,
            token_issuer: raw.token.issuer.clone(),
            retry: RetryPolicy::new(
                raw.retry.max_attempts,
                Duration::from_millis(raw.retry.delay_ms),
            ),
            log_level,
            log_format: raw.logging.format,
            _raw_settings: raw,
        })
    }

    /// Load, and persist a freshly generated secret so tokens survive restarts
    pub fn load_or_init(data_dir: &Path) -> Result<Self> {
        let mut config = Self::load(data_dir)?;
        if config.secret_source == SecretSource::Generated {
            std::fs::create_dir_all(data_dir)
                .with_context(|| format!("cannot create {}", data_dir.display()))?;
            config.save(data_dir)?;
            config.secret_source = SecretSource::File;
            tracing::info!(dir = %data_dir.display(), "generated token secret");
        }
        Ok(config)
    }

    /// Save config to the data directory
    /// Preserves other settings that this crate doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join(SETTINGS_FILE);

        // Re-read so concurrent edits to unmanaged keys survive
        let mut settings = read_settings(data_dir).unwrap_or_else(|_| self._raw_settings.clone());

        // A secret supplied through the environment never lands on disk
        if self.secret_source != SecretSource::Environment {
            settings.token.secret = Some(hex::encode(&self.token_secret));
        }
        settings.token.ttl_hours = self.token_ttl_hours;
        settings.token.issuer = self.token_issuer.clone();
        settings.retry.max_attempts = self.retry.max_attempts;
        settings.retry.delay_ms = self.retry.delay.as_millis() as u64;
        settings.logging.format = self.log_format;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)
            .with_context(|| format!("cannot write {}", settings_path.display()))?;
        Ok(())
    }

    /// Token service configured from these settings
    pub fn token_service(&self) -> Result<TokenService> {
        let ttl = chrono::Duration::try_hours(self.token_ttl_hours)
            .with_context(|| format!("token ttl of {} hours is out of range", self.token_ttl_hours))?;
        Ok(TokenService::new(self.token_secret.clone())?
            .with_ttl(ttl)
            .with_issuer(self.token_issuer.clone()))
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("cannot read {}", settings_path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid {}", settings_path.display()))
}

fn decode_secret(hex_secret: &str) -> Result<Vec<u8>> {
    let secret = hex::decode(hex_secret.trim())?;
    if secret.is_empty() {
        bail!("secret is empty");
    }
    Ok(secret)
}

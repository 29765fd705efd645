//! Shared configuration for Nurtura tools.
//!
//! TOML profiles, access-token resolution (env + keyring + plaintext), and
//! translation to `nurtura_core::DashboardConfig`. The CLI layers its flag
//! overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use nurtura_core::{DashboardConfig, QueryOptions};

/// Keyring service name for stored access tokens.
pub const KEYRING_SERVICE: &str = "nurtura";

/// Environment variable consulted after a profile's own `token_env`.
pub const TOKEN_ENV: &str = "NURTURA_TOKEN";

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "NURTURA_CONFIG";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API URL configured (set NURTURA_API_URL or api_url in the config file)")]
    NoApiUrl,

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("no access token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// REST base URL, e.g. `https://api.nurtura.app/api/v1`.
    pub api_url: Option<String>,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// How long query results stay fresh.
    #[serde(default = "default_stale_time_secs")]
    pub stale_time_secs: u64,

    /// Retries after a transient query failure.
    #[serde(default = "default_retry")]
    pub retry: u32,

    /// How long unobserved stale entries are kept.
    #[serde(default = "default_gc_time_secs")]
    pub gc_time_secs: u64,

    #[serde(default = "default_realtime_namespace")]
    pub realtime_namespace: String,

    /// Handed to the identity provider when a 401 signs the user out.
    #[serde(default = "default_sign_out_callback")]
    pub sign_out_callback: String,

    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            timeout_secs: default_timeout_secs(),
            stale_time_secs: default_stale_time_secs(),
            retry: default_retry(),
            gc_time_secs: default_gc_time_secs(),
            realtime_namespace: default_realtime_namespace(),
            sign_out_callback: default_sign_out_callback(),
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

/// Presentation defaults for the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    20
}
fn default_stale_time_secs() -> u64 {
    60
}
fn default_retry() -> u32 {
    1
}
fn default_gc_time_secs() -> u64 {
    300
}
fn default_realtime_namespace() -> String {
    "/chat".into()
}
fn default_sign_out_callback() -> String {
    "/login".into()
}
fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// A named backend profile (production, staging, local).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// Overrides the top-level `api_url`.
    pub api_url: Option<String>,

    /// Account the token belongs to, for display.
    pub email: Option<String>,

    /// Access token (plaintext; prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable holding the access token.
    pub token_env: Option<String>,

    /// Overrides the top-level `timeout_secs`.
    pub timeout_secs: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `NURTURA_CONFIG`, else the platform
/// config directory.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("app", "nurtura", "nurtura").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("nurtura");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing file is fine) layered under `NURTURA_*` env.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NURTURA_").only(&[
            "api_url",
            "timeout_secs",
            "stale_time_secs",
            "retry",
            "gc_time_secs",
            "realtime_namespace",
            "sign_out_callback",
            "default_profile",
        ]));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Profiles ────────────────────────────────────────────────────────

impl Config {
    /// Name of the profile to use: explicit, else `default_profile`, else `"default"`.
    pub fn profile_name<'a>(&'a self, explicit: Option<&'a str>) -> &'a str {
        explicit
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
    }

    /// Look up a profile. An explicitly requested profile must exist; the
    /// implicit default may be absent.
    pub fn profile(&self, explicit: Option<&str>) -> Result<Option<&Profile>, ConfigError> {
        let name = self.profile_name(explicit);
        match (self.profiles.get(name), explicit) {
            (Some(profile), _) => Ok(Some(profile)),
            (None, Some(_)) => Err(ConfigError::UnknownProfile { name: name.into() }),
            (None, None) => Ok(None),
        }
    }
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the access token for `profile_name`:
/// profile `token_env` → `NURTURA_TOKEN` → keyring → plaintext.
pub fn resolve_token(
    profile: Option<&Profile>,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    resolve_token_with(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        |account| {
            keyring::Entry::new(KEYRING_SERVICE, account)
                .and_then(|entry| entry.get_password())
                .ok()
        },
    )
}

fn resolve_token_with(
    profile: Option<&Profile>,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's token_env → env var lookup
    if let Some(env_name) = profile.and_then(|p| p.token_env.as_deref()) {
        if let Some(val) = env(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. Global env var
    if let Some(val) = env(TOKEN_ENV) {
        return Ok(SecretString::from(val));
    }

    // 3. System keyring
    if let Some(secret) = keyring(&keyring_account(profile_name)) {
        return Ok(SecretString::from(secret));
    }

    // 4. Plaintext in config
    if let Some(token) = profile.and_then(|p| p.token.clone()) {
        return Ok(SecretString::from(token));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store an access token for `profile_name` in the system keyring.
pub fn store_token(profile_name: &str, token: &SecretString) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_account(profile_name))?;
    entry.set_password(token.expose_secret())?;
    Ok(())
}

fn keyring_account(profile_name: &str) -> String {
    format!("{profile_name}/token")
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `DashboardConfig` from the file config and an optional profile.
pub fn to_dashboard_config(
    cfg: &Config,
    profile: Option<&Profile>,
) -> Result<DashboardConfig, ConfigError> {
    let raw = profile
        .and_then(|p| p.api_url.as_deref())
        .or(cfg.api_url.as_deref())
        .ok_or(ConfigError::NoApiUrl)?;

    let api_url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "api_url".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    if !matches!(api_url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("expected http or https, got {}", api_url.scheme()),
        });
    }

    let timeout_secs = profile
        .and_then(|p| p.timeout_secs)
        .unwrap_or(cfg.timeout_secs);

    let mut dashboard = DashboardConfig::new(api_url)
        .with_timeout(Duration::from_secs(timeout_secs))
        .with_query_options(
            QueryOptions::default()
                .stale_time(Duration::from_secs(cfg.stale_time_secs))
                .retry(cfg.retry),
        );
    dashboard.gc_time = Duration::from_secs(cfg.gc_time_secs);
    dashboard.realtime.namespace.clone_from(&cfg.realtime_namespace);
    dashboard.sign_out_callback.clone_from(&cfg.sign_out_callback);

    Ok(dashboard)
}

//! Shared configuration for the aMotion CLI.
//!
//! TOML profiles (one per unit), password resolution (env + keyring +
//! plaintext), and translation to `amotion_core::SessionConfig`. The CLI
//! adds `GlobalOpts`-aware overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use amotion_core::{Credentials, DeviceInfo, SessionConfig, endpoint_for_host};
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Keyring service name.
const KEYRING_SERVICE: &str = "amotion";
pub const PASSWORD_ENV: &str = "AMOTION_PASSWORD";
pub const USERNAME_ENV: &str = "AMOTION_USERNAME";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

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
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named unit profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Pick `name`, or the default profile.
    pub fn profile<'a>(&'a self, name: Option<&'a str>) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name.or(self.default_profile.as_deref()).unwrap_or("default");
        self.profiles
            .get(name)
            .map(|profile| (name, profile))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// WebSocket handshake timeout, seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Health monitor period for long-running commands, seconds.
    #[serde(default = "default_health_interval")]
    pub health_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            health_interval: default_health_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_health_interval() -> u64 {
    60
}

/// One unit.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Host name or address of the unit, optionally `host:port`, or a
    /// full `ws://` URL.
    pub host: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Plaintext password. Prefer the keyring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    // Identity recorded at onboarding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_number: Option<String>,

    /// Override the handshake timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Profile {
    pub fn device(&self) -> DeviceInfo {
        DeviceInfo {
            model: self.model.clone(),
            version: self.version.clone(),
            production_number: self.production_number.clone(),
            board_number: self.board_number.clone(),
        }
    }

    /// Record identity learned from the unit.
    pub fn set_device(&mut self, device: &DeviceInfo) {
        self.model.clone_from(&device.model);
        self.version.clone_from(&device.version);
        self.production_number.clone_from(&device.production_number);
        self.board_number.clone_from(&device.board_number);
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "amotion", "amotion").map_or_else(
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
    p.push("amotion");
    p
}

// ── Loading and saving ──────────────────────────────────────────────

/// Load the full Config from the canonical file + environment. A missing
/// file yields defaults; a file that does not parse is an error.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Defaults, then `path`, then `AMOTION__*` environment overrides
/// (`AMOTION__DEFAULTS__OUTPUT=json`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("AMOTION__").split("__"));

    Ok(figment.extract()?)
}

pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, toml::to_string_pretty(cfg)?)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

pub fn resolve_username(profile: &Profile, profile_name: &str) -> Result<String, ConfigError> {
    profile
        .username
        .clone()
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

/// Env var, then system keyring, then plaintext in the profile.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_password_from(
        profile,
        profile_name,
        std::env::var(PASSWORD_ENV).ok(),
        || load_keyring_password(profile_name),
    )
}

/// Resolution order with the env and keyring lookups supplied by the caller.
pub fn resolve_password_from(
    profile: &Profile,
    profile_name: &str,
    env: Option<String>,
    keyring: impl FnOnce() -> Option<String>,
) -> Result<SecretString, ConfigError> {
    env.filter(|pw| !pw.is_empty())
        .or_else(keyring)
        .or_else(|| profile.password.clone())
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })
}

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
}

fn load_keyring_password(profile_name: &str) -> Option<String> {
    keyring_entry(profile_name).and_then(|entry| entry.get_password()).ok()
}

pub fn store_keyring_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password.expose_secret())?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `SessionConfig` from a profile, with no CLI overrides.
pub fn profile_to_session_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<SessionConfig, ConfigError> {
    let username = resolve_username(profile, profile_name)?;
    let password = resolve_password(profile, profile_name)?;
    session_config_with(profile, profile_name, defaults, Credentials::new(username, password))
}

/// Like [`profile_to_session_config`] with credentials already resolved.
pub fn session_config_with(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    credentials: Credentials,
) -> Result<SessionConfig, ConfigError> {
    let endpoint = endpoint_for_host(&profile.host).map_err(|e| ConfigError::Validation {
        field: "host".into(),
        reason: e.to_string(),
    })?;

    let mut config = SessionConfig::new(profile_name, endpoint, credentials);
    config.device = profile.device();
    config.handshake_timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.health_interval = Some(Duration::from_secs(defaults.health_interval.max(1)));
    Ok(config)
}

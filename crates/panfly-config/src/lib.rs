//! Configuration for panfly consumers.
//!
//! TOML device profiles, credential resolution (env + plaintext), and
//! translation to `panfly_core::DeviceConfig` and `DeviceContext`. Values
//! layer as built-in defaults, then the config file, then `PANFLY_`
//! environment variables (`__` separates nesting levels).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use panfly_core::{
    CoreError, DeviceConfig, DeviceContext, DeviceKind, PollSettings, RetrySettings,
    TlsVerification,
};

/// Environment variable consulted for an API key when a profile names none.
pub const API_KEY_ENV: &str = "PANFLY_API_KEY";
const ENV_PREFIX: &str = "PANFLY_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API key configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

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

impl From<ConfigError> for CoreError {
    fn from(err: ConfigError) -> Self {
        CoreError::Config {
            message: err.to_string(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named device profiles.
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
    /// Look up a profile by name, falling back to `default_profile`.
    pub fn profile<'a>(&'a self, name: Option<&'a str>) -> Result<(&'a str, &'a Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .ok_or_else(|| ConfigError::UnknownProfile {
                name: "<default>".into(),
            })?;
        self.profiles
            .get(name)
            .map(|profile| (name, profile))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

/// Settings shared by every profile unless the profile overrides them.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_vsys")]
    pub default_vsys: String,

    /// Attempts per idempotent request, including the first.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Seconds between job polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// When set, the poll delay doubles from `poll_interval` up to this many
    /// seconds. Unset means a fixed interval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll_max_interval: Option<u64>,

    /// Longest wait for a commit job, in seconds.
    #[serde(default = "default_commit_timeout")]
    pub commit_timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            insecure: false,
            timeout: default_timeout(),
            default_vsys: default_vsys(),
            retry_attempts: default_retry_attempts(),
            poll_interval: default_poll_interval(),
            poll_max_interval: None,
            commit_timeout: default_commit_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_vsys() -> String {
    "vsys1".into()
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_poll_interval() -> u64 {
    2
}
fn default_commit_timeout() -> u64 {
    600
}

/// A named device profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Management URL (e.g., "https://fw01.example.net").
    pub url: String,

    #[serde(default)]
    pub kind: DeviceKind,

    /// API key (plaintext; prefer `api_key_env`).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Skip certificate checks. Unset inherits `defaults.insecure`; without
    /// it or `ca_cert`, the system roots verify the device.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// Override the default vsys.
    pub default_vsys: Option<String>,

    // Context selectors.
    pub vsys: Option<String>,
    pub device_group: Option<String>,
    pub template: Option<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("net", "panfly", "panfly").map_or_else(
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
    p.push("panfly");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from a specific file + environment. A missing file contributes
/// nothing.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "loading config");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

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

// ── Credential resolution ───────────────────────────────────────────

/// Resolve an API key: the profile's `api_key_env`, then `PANFLY_API_KEY`,
/// then the plaintext key in the profile.
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's api_key_env → env var lookup
    if let Some(ref env_name) = profile.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            debug!(profile = profile_name, source = %env_name, "API key from environment");
            return Ok(SecretString::from(val));
        }
    }

    // 2. Global env var
    if let Ok(val) = std::env::var(API_KEY_ENV) {
        debug!(profile = profile_name, source = API_KEY_ENV, "API key from environment");
        return Ok(SecretString::from(val));
    }

    // 3. Plaintext in config
    if let Some(ref key) = profile.api_key {
        debug!(profile = profile_name, "API key from config file");
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

// ── Translation to core types ───────────────────────────────────────

/// The context a profile's selectors describe.
pub fn profile_context(profile: &Profile) -> Result<DeviceContext, ConfigError> {
    DeviceContext::from_selectors(
        profile.kind,
        profile.vsys.as_deref(),
        profile.device_group.as_deref(),
        profile.template.as_deref(),
    )
    .map_err(|e| ConfigError::Validation {
        field: "vsys/device_group/template".into(),
        reason: e.to_string(),
    })
}

/// Build a `DeviceConfig` from a profile and the shared defaults.
pub fn profile_to_device_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<DeviceConfig, ConfigError> {
    let url: url::Url = profile.url.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {}", profile.url),
    })?;

    let api_key = resolve_api_key(profile, profile_name)?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    if defaults.poll_interval == 0 {
        return Err(ConfigError::Validation {
            field: "poll_interval".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    let mut config = DeviceConfig::new(url, api_key);
    config.kind = profile.kind;
    config.tls = tls;
    config.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.default_vsys = profile
        .default_vsys
        .clone()
        .unwrap_or_else(|| defaults.default_vsys.clone());
    config.retry = RetrySettings {
        max_attempts: defaults.retry_attempts,
        ..RetrySettings::default()
    };
    let interval = Duration::from_secs(defaults.poll_interval);
    let max_wait = Duration::from_secs(defaults.commit_timeout);
    config.poll = match defaults.poll_max_interval {
        Some(max) => PollSettings {
            interval,
            max_interval: Duration::from_secs(max.max(defaults.poll_interval)),
            max_wait,
        },
        None => PollSettings::fixed(interval, max_wait),
    };
    Ok(config)
}

/// Resolve a named (or the default) profile into everything needed to open
/// a device and target it.
pub fn resolve_profile(
    config: &Config,
    name: Option<&str>,
) -> Result<(DeviceConfig, DeviceContext), ConfigError> {
    let (name, profile) = config.profile(name)?;
    let device = profile_to_device_config(profile, name, &config.defaults)?;
    let context = profile_context(profile)?;
    Ok((device, context))
}

// ── Runtime connection configuration ──
//
// These types describe how to reach one device and how patiently to wait
// on it. They carry credential data and tuning, but never touch disk.
// panfly-config (or any embedding service) builds a `DeviceConfig` and
// hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::context::{DEFAULT_VSYS, DeviceKind};

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification. Management interfaces ship self-signed certs.
    #[default]
    DangerAcceptInvalid,
}

impl TlsVerification {
    pub(crate) fn to_tls_mode(&self) -> panfly_api::TlsMode {
        match self {
            Self::SystemDefaults => panfly_api::TlsMode::System,
            Self::CustomCa(path) => panfly_api::TlsMode::CustomCa(path.clone()),
            Self::DangerAcceptInvalid => panfly_api::TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Retry tuning for idempotent requests. Commits are never retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrySettings {
    /// Total attempts including the first. 1 disables retry.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetrySettings {
    pub(crate) fn to_policy(&self) -> panfly_api::RetryPolicy {
        panfly_api::RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            initial_delay: self.initial_backoff,
            max_delay: self.max_backoff.max(self.initial_backoff),
            ..panfly_api::RetryPolicy::default()
        }
    }
}

/// Job polling cadence.
///
/// Polls are `interval` apart by default. Raising `max_interval` above
/// `interval` makes the delay double up to that cap instead. Waiting stops
/// with a timeout once `max_wait` has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::fixed(Duration::from_secs(2), Duration::from_secs(600))
    }
}

impl PollSettings {
    /// Constant-interval polling.
    pub fn fixed(interval: Duration, max_wait: Duration) -> Self {
        Self {
            interval,
            max_interval: interval,
            max_wait,
        }
    }

    /// Delay after the given delay.
    pub(crate) fn next_delay(&self, current: Duration) -> Duration {
        current
            .saturating_mul(2)
            .min(self.max_interval.max(self.interval))
    }
}

/// Configuration for talking to a single device.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Management URL, e.g. `https://fw01.example.net`.
    pub url: Url,
    pub api_key: SecretString,
    pub kind: DeviceKind,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetrySettings,
    /// Vsys for firewall contexts that name none, and inside templates.
    pub default_vsys: String,
    pub poll: PollSettings,
}

impl DeviceConfig {
    /// Defaults for everything but the address and key.
    pub fn new(url: Url, api_key: SecretString) -> Self {
        Self {
            url,
            api_key,
            kind: DeviceKind::default(),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            retry: RetrySettings::default(),
            default_vsys: DEFAULT_VSYS.into(),
            poll: PollSettings::default(),
        }
    }

    pub(crate) fn transport(&self) -> panfly_api::TransportConfig {
        panfly_api::TransportConfig {
            tls: self.tls.to_tls_mode(),
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            ..panfly_api::TransportConfig::default()
        }
    }
}

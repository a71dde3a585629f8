// ── Core error types ──
//
// Domain-level errors from panfly-core. Callers see object types, entry
// names and xpaths here, never reqwest or XML parser internals. The
// `From<panfly_api::Error>` impl translates transport-layer errors;
// `CoreError::from_api` does the same while attaching the object being
// worked on.

use std::time::Duration;

use thiserror::Error;

use crate::model::{ObjectType, ValidationResult};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Local input errors ───────────────────────────────────────────
    #[error("Validation failed for {object_type} '{entry_name}': {result}")]
    Validation {
        object_type: ObjectType,
        entry_name: String,
        result: ValidationResult,
    },

    #[error("Unknown object type: {name}")]
    UnknownObjectType { name: String },

    #[error("Invalid device context: {reason}")]
    InvalidContext { reason: String },

    #[error("Invalid entry name '{name}': {reason}")]
    InvalidEntryName { name: String, reason: String },

    #[error("{object_type} objects cannot be addressed in {scope}")]
    UnsupportedLocation {
        object_type: ObjectType,
        scope: String,
    },

    // ── Device-reported errors ───────────────────────────────────────
    #[error("Device rejected request{}: {message}", describe_target(.object_type.as_ref(), .entry_name.as_deref(), .xpath.as_deref()))]
    DeviceApi {
        code: Option<u16>,
        message: String,
        xpath: Option<String>,
        object_type: Option<ObjectType>,
        entry_name: Option<String>,
        transient: bool,
    },

    #[error("{object_type} '{entry_name}' not found")]
    NotFound {
        object_type: ObjectType,
        entry_name: String,
        xpath: String,
    },

    // ── Commit lifecycle ─────────────────────────────────────────────
    #[error("Commit job {job_id} failed: {details}")]
    CommitFailure { job_id: u64, details: String },

    #[error("Gave up waiting for job {job_id} after {}s", .waited.as_secs())]
    PollTimeout { job_id: u64, waited: Duration },

    #[error("Wait for job {job_id} was cancelled")]
    Cancelled { job_id: u64 },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to device at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Device request timed out")]
    Timeout,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

fn describe_target(
    object_type: Option<&ObjectType>,
    entry_name: Option<&str>,
    xpath: Option<&str>,
) -> String {
    let mut out = String::new();
    match (object_type, entry_name) {
        (Some(ot), Some(name)) => out.push_str(&format!(" for {ot} '{name}'")),
        (Some(ot), None) => out.push_str(&format!(" for {ot}")),
        _ => {}
    }
    if let Some(xpath) = xpath {
        out.push_str(&format!(" at {xpath}"));
    }
    out
}

impl CoreError {
    /// `true` when retrying the same call could succeed without changes.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::DeviceApi { transient, .. } => *transient,
            Self::ConnectionFailed { .. } | Self::Timeout => true,
            _ => false,
        }
    }

    /// Translate an api error, attaching the object it concerned.
    pub fn from_api(
        err: panfly_api::Error,
        object_type: ObjectType,
        entry_name: Option<&str>,
    ) -> Self {
        match Self::from(err) {
            Self::DeviceApi {
                code,
                message,
                xpath,
                transient,
                ..
            } => Self::DeviceApi {
                code,
                message,
                xpath,
                object_type: Some(object_type),
                entry_name: entry_name.map(String::from),
                transient,
            },
            other => other,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<panfly_api::Error> for CoreError {
    fn from(err: panfly_api::Error) -> Self {
        let transient = err.is_transient();
        match err {
            panfly_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            panfly_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e.url().map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::DeviceApi {
                        code: None,
                        message: e.to_string(),
                        xpath: None,
                        object_type: None,
                        entry_name: None,
                        transient,
                    }
                }
            }
            panfly_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            panfly_api::Error::Timeout { .. } => CoreError::Timeout,
            panfly_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            panfly_api::Error::Http { status, message } => CoreError::DeviceApi {
                code: None,
                message: format!("HTTP {status}: {message}"),
                xpath: None,
                object_type: None,
                entry_name: None,
                transient,
            },
            panfly_api::Error::DeviceApi {
                code,
                message,
                xpath,
            } => CoreError::DeviceApi {
                code,
                message,
                xpath,
                object_type: None,
                entry_name: None,
                transient,
            },
            panfly_api::Error::MalformedResponse { message, body: _ } => {
                CoreError::Internal(format!("Malformed device response: {message}"))
            }
            panfly_api::Error::Xml(message) => CoreError::Internal(format!("XML error: {message}")),
        }
    }
}

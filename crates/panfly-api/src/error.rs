use std::time::Duration;

use thiserror::Error;

use crate::xmlapi::codes;

/// Top-level error type for the `panfly-api` crate.
///
/// Covers every failure mode of the XML API surface: authentication,
/// transport, HTTP status, the `<response status="error">` envelope, and
/// malformed payloads. `panfly-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The device rejected the API key (HTTP 401/403).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, reset, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out. `after` is the configured limit when known.
    #[error("Request timed out{}", .after.map(|d| format!(" after {d:?}")).unwrap_or_default())]
    Timeout { after: Option<Duration> },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Non-success HTTP status outside the auth range.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    // ── Device API ──────────────────────────────────────────────────
    /// Parsed from a `<response status="error" code="N">` envelope.
    ///
    /// `xpath` is attached by the client for configuration calls so the
    /// caller can tell which location the device refused.
    #[error("Device API error: {message}")]
    DeviceApi {
        code: Option<u16>,
        message: String,
        xpath: Option<String>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// The body was XML but not the envelope we expected.
    #[error("Malformed response: {message}")]
    MalformedResponse { message: String, body: String },

    /// The body could not be parsed (or a fragment could not be written) as XML.
    #[error("XML error: {0}")]
    Xml(String),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    ///
    /// Connection failures, timeouts, HTTP 5xx / 429, and the device's
    /// internal-error codes qualify. Anything the device rejected on its
    /// merits (bad xpath, invalid object, malformed command) never does.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Timeout { .. } => true,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::DeviceApi { code: Some(code), .. } => codes::is_internal_error(*code),
            _ => false,
        }
    }

    /// Returns `true` if the device reported the addressed object as absent.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::DeviceApi {
                code: Some(codes::OBJECT_NOT_PRESENT),
                ..
            } | Self::Http { status: 404, .. }
        )
    }

    /// The xpath the failing request targeted, if it was a configuration call.
    pub fn xpath(&self) -> Option<&str> {
        match self {
            Self::DeviceApi { xpath, .. } => xpath.as_deref(),
            _ => None,
        }
    }

    /// Attach the request xpath to a device error for diagnostics.
    #[must_use]
    pub fn with_xpath(self, target: Option<&str>) -> Self {
        match (self, target) {
            (
                Self::DeviceApi {
                    code,
                    message,
                    xpath: None,
                },
                Some(target),
            ) => Self::DeviceApi {
                code,
                message,
                xpath: Some(target.to_owned()),
            },
            (other, _) => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(code: u16) -> Error {
        Error::DeviceApi {
            code: Some(code),
            message: "boom".into(),
            xpath: None,
        }
    }

    #[test]
    fn device_validation_codes_are_not_transient() {
        for code in [
            codes::BAD_XPATH,
            codes::INVALID_OBJECT,
            codes::MALFORMED_COMMAND,
        ] {
            assert!(!device(code).is_transient(), "code {code} must not retry");
        }
    }

    #[test]
    fn server_side_failures_are_transient() {
        assert!(device(codes::INTERNAL_ERROR).is_transient());
        assert!(
            Error::Http {
                status: 503,
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            !Error::Http {
                status: 400,
                message: String::new()
            }
            .is_transient()
        );
    }

    #[test]
    fn with_xpath_only_fills_device_errors() {
        let err = device(codes::BAD_XPATH).with_xpath(Some("/config/shared"));
        assert_eq!(err.xpath(), Some("/config/shared"));

        let err = Error::Tls("x".into()).with_xpath(Some("/config/shared"));
        assert!(err.xpath().is_none());
    }

    #[test]
    fn object_not_present_is_not_found() {
        assert!(device(codes::OBJECT_NOT_PRESENT).is_not_found());
        assert!(!device(codes::OBJECT_NOT_UNIQUE).is_not_found());
    }
}

// XML API HTTP client
//
// Wraps `reqwest::Client` with API-key header injection, form-encoded
// request construction, envelope unwrapping, and the retry policy.
// Endpoint groups (config, operational) are implemented as inherent
// methods in sibling files to keep this module focused on transport.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::retry::RetryPolicy;
use crate::transport::TransportConfig;
use crate::xmlapi::models::ApiResponse;

const API_KEY_HEADER: &str = "x-pan-key";

/// Raw HTTP client for the device's XML API.
///
/// One instance owns one connection pool. It is `Send + Sync`; share it
/// behind an `Arc` and issue calls from as many tasks as needed. Calls are
/// independent: nothing here serializes requests.
#[derive(Debug)]
pub struct XmlApiClient {
    http: reqwest::Client,
    api_url: Url,
    retry: RetryPolicy,
    /// Request timeout the pool was built with, if this client built it.
    timeout: Option<Duration>,
}

impl XmlApiClient {
    /// Build from an API key and transport config.
    ///
    /// Injects `X-PAN-KEY` as a sensitive default header on every request.
    /// `base_url` is the management address, e.g. `https://fw.example.net`.
    pub fn from_api_key(
        base_url: &Url,
        api_key: &SecretString,
        transport: &TransportConfig,
        retry: RetryPolicy,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut key_value =
            HeaderValue::from_str(api_key.expose_secret()).map_err(|e| Error::Authentication {
                message: format!("invalid API key header value: {e}"),
            })?;
        key_value.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key_value);

        let http = transport.build_client_with_headers(headers)?;
        Ok(Self {
            http,
            api_url: Self::api_url(base_url)?,
            retry,
            timeout: Some(transport.timeout),
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn with_client(
        http: reqwest::Client,
        base_url: &Url,
        retry: RetryPolicy,
    ) -> Result<Self, Error> {
        Ok(Self {
            http,
            api_url: Self::api_url(base_url)?,
            retry,
            timeout: None,
        })
    }

    /// `{base}/api/`
    fn api_url(base_url: &Url) -> Result<Url, Error> {
        let base = base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/api/"))?)
    }

    /// The endpoint every request is posted to.
    pub fn endpoint(&self) -> &Url {
        &self.api_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Release the connection pool.
    ///
    /// Consumes the client so no call can race the shutdown. Idle
    /// connections close when the last handle to the pool is dropped here.
    pub fn close(self) {
        debug!(endpoint = %self.api_url, "closing XML API client");
        drop(self.http);
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a request under the retry policy and unwrap the envelope.
    ///
    /// `xpath` is attached to any device error for diagnostics.
    pub(crate) async fn request(
        &self,
        operation: &str,
        params: &[(&str, &str)],
        xpath: Option<&str>,
    ) -> Result<ApiResponse, Error> {
        self.retry
            .run(operation, || self.send_once(operation, params))
            .await
            .map_err(|e| e.with_xpath(xpath))
    }

    /// Send a request exactly once, bypassing the retry policy.
    ///
    /// Used for operations where a duplicate delivery is not harmless.
    pub(crate) async fn request_once(
        &self,
        operation: &str,
        params: &[(&str, &str)],
    ) -> Result<ApiResponse, Error> {
        self.send_once(operation, params).await
    }

    async fn send_once(&self, operation: &str, params: &[(&str, &str)]) -> Result<ApiResponse, Error> {
        debug!(operation, "POST {}", self.api_url);

        let resp = self
            .http
            .post(self.api_url.clone())
            .form(params)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        self.parse_envelope(resp).await
    }

    fn transport_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                after: self.timeout,
            }
        } else {
            Error::Transport(err)
        }
    }

    /// Parse the `<response>` envelope, returning it on `status="success"`
    /// or an `Error::DeviceApi` on `status="error"`.
    async fn parse_envelope(&self, resp: reqwest::Response) -> Result<ApiResponse, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;
        trace!(%status, body = preview(&body), "response");

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let message = ApiResponse::parse(&body)
                .ok()
                .and_then(|r| r.message())
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(Error::Authentication { message });
        }

        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                message: preview(&body).to_owned(),
            });
        }

        let response = ApiResponse::parse(&body)?;
        if response.is_success() {
            return Ok(response);
        }

        let message = response.message().unwrap_or_else(|| match response.code {
            Some(code) => format!(
                "device returned error code {code} ({})",
                super::codes::describe(code)
            ),
            None => "device returned an error without a message".into(),
        });
        Err(Error::DeviceApi {
            code: response.code,
            message,
            xpath: None,
        })
    }
}

fn preview(body: &str) -> &str {
    let mut end = body.len().min(200);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

// Configuration endpoints (`type=config`)
//
// `get` reads the candidate configuration, `show` the running one.
// `set` merges an element under the xpath, `edit` replaces the element at
// the xpath, `delete` removes it. All of them are retried on transient
// failures only; a device rejection surfaces immediately.

use tracing::debug;

use crate::error::Error;
use crate::xmlapi::client::XmlApiClient;
use crate::xmlapi::models::ApiResponse;

impl XmlApiClient {
    /// Read the candidate configuration at `xpath`.
    ///
    /// `type=config&action=get&xpath=...`
    pub async fn get_config(&self, xpath: &str) -> Result<ApiResponse, Error> {
        debug!(xpath, "config get");
        self.request(
            "config.get",
            &[("type", "config"), ("action", "get"), ("xpath", xpath)],
            Some(xpath),
        )
        .await
    }

    /// Read the running configuration at `xpath`.
    ///
    /// `type=config&action=show&xpath=...`
    pub async fn show_config(&self, xpath: &str) -> Result<ApiResponse, Error> {
        debug!(xpath, "config show");
        self.request(
            "config.show",
            &[("type", "config"), ("action", "show"), ("xpath", xpath)],
            Some(xpath),
        )
        .await
    }

    /// Merge `element` into the node at `xpath` (creates it if absent).
    ///
    /// `type=config&action=set&xpath=...&element=...`
    pub async fn set_config(&self, xpath: &str, element: &str) -> Result<ApiResponse, Error> {
        debug!(xpath, "config set");
        self.request(
            "config.set",
            &[
                ("type", "config"),
                ("action", "set"),
                ("xpath", xpath),
                ("element", element),
            ],
            Some(xpath),
        )
        .await
    }

    /// Replace the node at `xpath` with `element`.
    ///
    /// `type=config&action=edit&xpath=...&element=...`
    pub async fn edit_config(&self, xpath: &str, element: &str) -> Result<ApiResponse, Error> {
        debug!(xpath, "config edit");
        self.request(
            "config.edit",
            &[
                ("type", "config"),
                ("action", "edit"),
                ("xpath", xpath),
                ("element", element),
            ],
            Some(xpath),
        )
        .await
    }

    /// Remove the node at `xpath`.
    ///
    /// `type=config&action=delete&xpath=...`
    pub async fn delete_config(&self, xpath: &str) -> Result<ApiResponse, Error> {
        debug!(xpath, "config delete");
        self.request(
            "config.delete",
            &[("type", "config"), ("action", "delete"), ("xpath", xpath)],
            Some(xpath),
        )
        .await
    }
}

//! Google Drive API client
//!
//! Thin wrapper around `reqwest::Client` that knows the two Drive v3 base
//! URLs (metadata and media upload) and attaches the bearer token to every
//! request. The client holds no credential: callers pass the token per call,
//! so a renewed token is picked up without rebuilding anything.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pawsync_core::domain::{AccessToken, FolderId};
//! use pawsync_drive::client::DriveClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = DriveClient::new(std::time::Duration::from_secs(60))?;
//! let token = AccessToken::new("ya29.example")?;
//! let folder = client.find_or_create_folder(&token, "PawSync_Data").await?;
//! println!("backup folder: {folder}");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use pawsync_core::config::{DriveConfig, DEFAULT_API_BASE_URL, DEFAULT_UPLOAD_BASE_URL};
use pawsync_core::domain::AccessToken;
use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::debug;

use crate::DriveError;

/// HTTP client for Google Drive v3 calls
#[derive(Debug, Clone)]
pub struct DriveClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for metadata requests (`/files`)
    api_base_url: String,
    /// Base URL for media uploads
    upload_base_url: String,
}

impl DriveClient {
    /// Creates a client against the public Google endpoints
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            upload_base_url: DEFAULT_UPLOAD_BASE_URL.to_string(),
        })
    }

    /// Creates a client with custom base URLs (useful for testing)
    pub fn with_base_urls(
        api_base_url: impl Into<String>,
        upload_base_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_base_url: trim_trailing_slash(api_base_url.into()),
            upload_base_url: trim_trailing_slash(upload_base_url.into()),
        }
    }

    /// Creates a client from the `drive` configuration section
    pub fn from_config(config: &DriveConfig) -> Result<Self> {
        let mut client = Self::new(Duration::from_secs(config.request_timeout_secs))?;
        client.api_base_url = trim_trailing_slash(config.api_base_url.clone());
        client.upload_base_url = trim_trailing_slash(config.upload_base_url.clone());
        Ok(client)
    }

    /// Creates an authenticated request against the metadata API
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path relative to the base URL (e.g., "/files")
    /// * `token` - Bearer token for this request
    pub fn request(&self, method: Method, path: &str, token: &AccessToken) -> RequestBuilder {
        let url = format!("{}{}", self.api_base_url, path);
        debug!(%method, %url, "Drive request");
        self.client.request(method, &url).bearer_auth(token.secret())
    }

    /// Creates an authenticated request against the upload API
    pub fn upload_request(
        &self,
        method: Method,
        path: &str,
        token: &AccessToken,
    ) -> RequestBuilder {
        let url = format!("{}{}", self.upload_base_url, path);
        debug!(%method, %url, "Drive upload request");
        self.client.request(method, &url).bearer_auth(token.secret())
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    pub fn upload_base_url(&self) -> &str {
        &self.upload_base_url
    }
}

/// Sends a request and turns any non-success status into [`DriveError::Status`]
///
/// The response body text is kept in the error so that the message shown to
/// the user carries the API's explanation.
pub(crate) async fn send_checked(
    request: RequestBuilder,
    operation: &'static str,
) -> Result<Response, DriveError> {
    let response = request
        .send()
        .await
        .map_err(|e| DriveError::network(operation, e))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!(operation, status = status.as_u16(), "Drive request failed");
    Err(DriveError::Status {
        operation,
        status: status.as_u16(),
        body,
    })
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> AccessToken {
        AccessToken::new("test-token").unwrap()
    }

    #[test]
    fn test_default_endpoints() {
        let client = DriveClient::new(Duration::from_secs(5)).unwrap();
        assert_eq!(client.api_base_url(), "https://www.googleapis.com/drive/v3");
        assert_eq!(
            client.upload_base_url(),
            "https://www.googleapis.com/upload/drive/v3"
        );
    }

    #[test]
    fn test_request_builder_adds_bearer() {
        let client = DriveClient::with_base_urls("http://localhost:1234/", "http://localhost:1234");
        let request = client
            .request(Method::GET, "/files", &token())
            .build()
            .unwrap();

        assert_eq!(request.url().as_str(), "http://localhost:1234/files");
        assert_eq!(
            request.headers().get("authorization").unwrap(),
            "Bearer test-token"
        );
    }

    #[test]
    fn test_upload_request_uses_upload_base() {
        let client = DriveClient::with_base_urls("http://api", "http://upload");
        let request = client
            .upload_request(Method::PATCH, "/files/abc", &token())
            .build()
            .unwrap();
        assert_eq!(request.url().as_str(), "http://upload/files/abc");
        assert_eq!(request.method(), Method::PATCH);
    }

    #[test]
    fn test_from_config() {
        let config = DriveConfig {
            api_base_url: "http://mock/drive/v3/".into(),
            upload_base_url: "http://mock/upload/drive/v3".into(),
            ..DriveConfig::default()
        };
        let client = DriveClient::from_config(&config).unwrap();
        assert_eq!(client.api_base_url(), "http://mock/drive/v3");
        assert_eq!(client.upload_base_url(), "http://mock/upload/drive/v3");
    }
}

//! HTTP client for video platform API requests

use crate::platform::transport::{AuthToken, TransportError};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::debug;

/// Default product identifier sent with every sign-in
pub const DEFAULT_SOURCE: &str = concat!("rup-", env!("CARGO_PKG_VERSION"));

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Timeout for API calls (sign-in, upload token); uploads are not bounded by it
    pub timeout: Duration,
    /// Connection establishment timeout, applied to every request
    pub connect_timeout: Duration,
    /// User agent string
    pub user_agent: Option<String>,
    /// Proxy URL
    pub proxy_url: Option<String>,
    /// Application name reported to the service
    pub source: String,
    /// Force HTTP/1.1 only (disable HTTP/2)
    pub http1_only: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: None,
            proxy_url: None,
            source: DEFAULT_SOURCE.to_string(),
            http1_only: false,
        }
    }
}

/// Platform API client carrying the developer key
pub struct ApiClient {
    client: Client,
    config: HttpClientConfig,
    developer_key: String,
}

impl ApiClient {
    /// Create a new API client with default configuration
    pub fn new(developer_key: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_config(developer_key, HttpClientConfig::default())
    }

    /// Create a new API client with custom configuration
    pub fn with_config(
        developer_key: impl Into<String>,
        config: HttpClientConfig,
    ) -> Result<Self, TransportError> {
        let mut builder = ClientBuilder::new()
            .connect_timeout(config.connect_timeout)
            .cookie_store(true)
            .gzip(true)
            .brotli(true);

        if config.http1_only {
            builder = builder.http1_only();
        }

        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("{} (gzip)", config.source));
        builder = builder.user_agent(user_agent);

        if let Some(proxy_url) = &config.proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        let client = builder.build()?;
        debug!("Built API client (timeout {:?})", config.timeout);

        Ok(Self {
            client,
            config,
            developer_key: developer_key.into(),
        })
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Get client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    pub fn developer_key(&self) -> &str {
        &self.developer_key
    }

    /// Create an API request bounded by the configured timeout
    pub fn create_request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .timeout(self.config.timeout)
            .header("Accept", "*/*")
            .header("Accept-Language", "en-US,en;q=0.9")
    }

    /// Create an API request signed with the developer key and a sign-in token
    pub fn create_authorized_request(
        &self,
        method: reqwest::Method,
        url: &str,
        token: &AuthToken,
    ) -> reqwest::RequestBuilder {
        self.create_request(method, url)
            .header("Authorization", format!("GoogleLogin auth={}", token.as_str()))
            .header("GData-Version", "2")
            .header("X-GData-Key", format!("key={}", self.developer_key))
    }

    /// Create an upload request; only the connect timeout applies
    pub fn create_upload_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("Accept", "*/*")
            .header("Connection", "keep-alive")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ApiClient::new("dev-key").unwrap();
        assert_eq!(client.config().timeout, Duration::from_secs(30));
        assert_eq!(client.config().connect_timeout, Duration::from_secs(10));
        assert_eq!(client.developer_key(), "dev-key");
        assert!(client.config().source.starts_with("rup-"));
    }

    #[test]
    fn test_client_with_config() {
        let config = HttpClientConfig {
            timeout: Duration::from_secs(60),
            user_agent: Some("Custom Agent".to_string()),
            http1_only: true,
            ..Default::default()
        };

        let client = ApiClient::with_config("dev-key", config).unwrap();
        assert_eq!(client.config().timeout, Duration::from_secs(60));
        assert_eq!(client.config().user_agent, Some("Custom Agent".to_string()));
    }

    #[test]
    fn test_authorized_request_headers() {
        let client = ApiClient::new("dev-key").unwrap();
        let request = client
            .create_authorized_request(
                reqwest::Method::POST,
                "https://example.com/action",
                &AuthToken::new("tok"),
            )
            .build()
            .unwrap();

        let headers = request.headers();
        assert_eq!(headers["Authorization"], "GoogleLogin auth=tok");
        assert_eq!(headers["X-GData-Key"], "key=dev-key");
        assert_eq!(request.timeout(), Some(&Duration::from_secs(30)));
    }
}

//! HTTP transport over reqwest.

use crate::error::{ClientError, ClientResult};
use crate::transport::{Method, Request, Response, Transport};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Connection settings for the remote store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Root URL of the store (e.g. `http://127.0.0.1:8080`).
    pub base_url: String,
    /// Sent as `X-API-KEY` on every request when non-empty.
    pub api_key: String,
    /// Path segment between the base URL and the endpoint paths.
    pub api_prefix: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Skip TLS certificate verification. Only for local test stores.
    pub accept_invalid_certs: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            api_key: String::new(),
            api_prefix: "api".to_string(),
            timeout_secs: 60,
            accept_invalid_certs: false,
        }
    }
}

impl ClientConfig {
    /// Full URL for a path relative to the API root.
    pub fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        match self.api_prefix.trim_matches('/') {
            "" => format!("{base}/{path}"),
            prefix => format!("{base}/{prefix}/{path}"),
        }
    }
}

/// [`Transport`] backed by a reqwest client.
pub struct HttpTransport {
    config: ClientConfig,
    client: Client,
}

impl HttpTransport {
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(ClientError::Config("base_url is empty".into()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: Request) -> ClientResult<Response> {
        let url = self.config.url(&request.path);
        debug!("{} {}", request.method, url);

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &url);
        if !self.config.api_key.is_empty() {
            builder = builder.header(API_KEY_HEADER, &self.config.api_key);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = resp.text().await?;
        debug!("{} {} -> {}", request.method, url, status);

        Ok(Response {
            status,
            body,
            headers,
        })
    }
}

//! Upstream HTTP client shared by the built-in catalog backends.
//!
//! Features:
//! - Browser-like default headers (see [`crate::fingerprint`])
//! - Cookie store, so session cookies set by one page reach the next
//! - Brotli, Gzip and Deflate decompression (auto-negotiated)
//! - Connect and total timeouts from [`HttpSettings`]
//!
//! A client is built per backend instance, which means per request: no
//! cookies or connections leak between callers.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use crate::config::HttpSettings;
use crate::fingerprint::profile_for;

/// HTTP client bound to one catalog origin.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    client: Client,
    base: Url,
}

impl CatalogClient {
    /// Create a client for `base_url` with the configured fingerprint.
    pub fn new(base_url: &str, settings: &HttpSettings) -> Result<Self> {
        let base = Url::parse(base_url).with_context(|| format!("invalid base URL {base_url}"))?;
        let headers = profile_for(settings.browser)
            .to_headers()
            .context("invalid browser profile header")?;

        let client = Client::builder()
            .default_headers(headers)
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(10))
            .cookie_store(true)
            .build()?;

        Ok(Self { client, base })
    }

    /// Origin this client talks to.
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve `path` (absolute, relative or protocol-relative) against the base.
    pub fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .with_context(|| format!("cannot resolve {path} against {}", self.base))
    }

    /// Start a GET request against `path`.
    pub fn get(&self, path: &str) -> Result<RequestBuilder> {
        Ok(self.client.get(self.url(path)?))
    }

    /// Start a POST request against `path`.
    pub fn post(&self, path: &str) -> Result<RequestBuilder> {
        Ok(self.client.post(self.url(path)?))
    }

    /// Headers of an in-page XHR call, which some catalogs require.
    pub fn xhr_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("X-Requested-With", HeaderValue::from_static("XMLHttpRequest"));
        if let Ok(referer) = HeaderValue::from_str(self.base.as_str()) {
            headers.insert(REFERER, referer);
        }
        headers
    }

    /// Send the request and return the body of a successful response.
    #[instrument(skip(self, request))]
    pub async fn text(&self, request: RequestBuilder, what: &str) -> Result<String> {
        let response = request.send().await.with_context(|| format!("{what}: request failed"))?;
        let status = response.status();
        debug!(%status, url = %response.url(), "Response received");
        if !status.is_success() {
            return Err(anyhow!("{what}: upstream returned {status}"));
        }
        response
            .text()
            .await
            .with_context(|| format!("{what}: failed to read body"))
    }

    /// Send the request and decode a successful JSON response.
    pub async fn json<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T> {
        let body = self.text(request, what).await?;
        serde_json::from_str(&body).with_context(|| format!("{what}: unexpected response shape"))
    }
}

//! HTTP access with global admission control
//!
//! [`Fetcher`] is the single point every request of a crawl goes through. It
//! holds one counting semaphore sized by [`ClientConfig::concurrency`] and
//! delegates the actual request to a [`Transport`]. [`HttpTransport`] is the
//! `reqwest` implementation; tests plug in their own transports.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use crate::error::{CrawlError, Result};

/// Default User-Agent mimicking a modern browser
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/105.0.0.0 Safari/537.36 Edg/105.0.1343.53";

/// Query parameters sent with every catalog listing request
pub const LISTING_PARAMS: &[(&str, &str)] = &[("schema", "1"), ("limit", "9999")];

/// Which network path a request takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Through the configured proxy (catalog endpoints)
    Proxied,
    /// Straight to the host (caption CDN)
    Direct,
}

/// Normalized response: status code and body text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// A single GET request as seen by a [`Transport`]
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    pub params: &'a [(&'a str, &'a str)],
    pub route: Route,
}

/// Performs one GET request without any admission control.
///
/// Implementations must return [`CrawlError::ProxyUnreachable`] when a
/// [`Route::Proxied`] request cannot reach the proxy; any other status is
/// returned as an ordinary [`FetchResponse`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: FetchRequest<'_>) -> Result<FetchResponse>;
}

/// Configuration for the HTTP layer
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum number of requests in flight at once (default: 8)
    pub concurrency: usize,
    /// Proxy URL for catalog requests (`http://`, `https://` or `socks5://`)
    pub proxy: Option<String>,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// User-Agent header value
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            proxy: None,
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// `reqwest`-backed [`Transport`].
///
/// Keeps one client per [`Route`]; both share the cookie store behaviour of
/// `reqwest`, so the session cookie picked up by the first proxied request is
/// replayed on later catalog requests.
pub struct HttpTransport {
    direct: reqwest::Client,
    proxied: reqwest::Client,
    has_proxy: bool,
}

impl HttpTransport {
    /// Build the transport from `config`.
    ///
    /// # Errors
    /// - `CrawlError::InvalidConfig` if the proxy URL cannot be parsed
    /// - `CrawlError::Http` if the HTTP client cannot be created
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let direct = Self::builder(config).build()?;

        let proxied = match &config.proxy {
            Some(proxy) => {
                let proxy = reqwest::Proxy::all(proxy.as_str()).map_err(|e| {
                    CrawlError::InvalidConfig(format!("invalid proxy {proxy}: {e}"))
                })?;
                Self::builder(config).proxy(proxy).build()?
            }
            None => direct.clone(),
        };

        Ok(Self {
            direct,
            proxied,
            has_proxy: config.proxy.is_some(),
        })
    }

    fn builder(config: &ClientConfig) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: FetchRequest<'_>) -> Result<FetchResponse> {
        let client = match request.route {
            Route::Proxied => &self.proxied,
            Route::Direct => &self.direct,
        };

        let response = match client.get(request.url).query(request.params).send().await {
            Ok(response) => response,
            Err(e) if request.route == Route::Proxied && self.has_proxy && e.is_connect() => {
                return Err(CrawlError::ProxyUnreachable {
                    url: request.url.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(FetchResponse { status, body })
    }
}

/// Concurrency-capped front for a [`Transport`]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    permits: Arc<Semaphore>,
    limit: usize,
}

impl Fetcher {
    /// Create a fetcher allowing at most `concurrency` requests in flight.
    ///
    /// # Errors
    /// Returns `CrawlError::InvalidConfig` if `concurrency` is 0
    pub fn new(transport: Arc<dyn Transport>, concurrency: usize) -> Result<Self> {
        if concurrency == 0 {
            return Err(CrawlError::InvalidConfig(
                "concurrency limit must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            transport,
            permits: Arc::new(Semaphore::new(concurrency)),
            limit: concurrency,
        })
    }

    /// Create a fetcher backed by [`HttpTransport`].
    pub fn with_config(config: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        Self::new(Arc::new(transport), config.concurrency)
    }

    /// Issue a GET request once a permit is available.
    ///
    /// The permit is held until the body has been read, whatever the outcome.
    ///
    /// # Errors
    /// - `CrawlError::ProxyUnreachable` - the proxy could not be reached; fatal
    /// - `CrawlError::Http` - any other transport failure
    pub async fn fetch(
        &self,
        url: &str,
        params: &[(&str, &str)],
        route: Route,
    ) -> Result<FetchResponse> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| CrawlError::InvalidConfig("request semaphore closed".to_string()))?;

        info!(url, ?route, "fetching");
        let result = self.transport.get(FetchRequest { url, params, route }).await;

        match &result {
            Ok(response) => debug!(url, status = response.status, "fetched"),
            Err(CrawlError::ProxyUnreachable { .. }) => error!(url, "proxy unreachable"),
            Err(e) => debug!(url, error = %e, "fetch failed"),
        }
        result
    }

    /// Configured concurrency limit
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Permits not currently held by a request
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::time::Duration;

use crate::core::constants::DEFAULT_USER_AGENT;
use crate::traits::TileFetcher;
use crate::{MapError, Result};

/// Shared async HTTP client with a custom User-Agent so that public tile
/// servers don't reject the request. Building the client once avoids the cost
/// of TLS and connection pool setup for every tile.
pub(crate) static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .user_agent(DEFAULT_USER_AGENT)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .expect("failed to build reqwest async client")
});

/// Configuration for [`HttpFetcher`]
#[derive(Debug, Clone, Default)]
pub struct HttpFetcherConfig {
    /// Per-request timeout; `None` waits for the server indefinitely
    pub timeout: Option<Duration>,
    /// Overrides the shared client's user agent
    pub user_agent: Option<String>,
}

/// [`TileFetcher`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl HttpFetcher {
    /// Fetcher on the shared client, without a timeout
    pub fn new() -> Self {
        Self {
            client: HTTP_CLIENT.clone(),
            timeout: None,
        }
    }

    pub fn with_config(config: HttpFetcherConfig) -> Result<Self> {
        let client = match &config.user_agent {
            Some(agent) => reqwest::Client::builder().user_agent(agent.as_str()).build()?,
            None => HTTP_CLIENT.clone(),
        };
        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TileFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let mut request = self.client.get(url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MapError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        log::trace!("fetched {} ({} bytes)", url, bytes.len());
        Ok(bytes.to_vec())
    }
}

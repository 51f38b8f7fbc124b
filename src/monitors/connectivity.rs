use std::time::Duration;

use async_trait::async_trait;
use tracing::{instrument, trace, warn};

/// Cheap reachability check run before every monitoring cycle.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Returns `false` on any failure. Never retries.
    async fn has_connectivity(&self) -> bool;
}

/// Probe that issues a single GET request against a known-good URL.
///
/// Only transport errors count as failure, the response status is ignored.
#[derive(Debug, Clone)]
pub struct HttpConnectivityProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpConnectivityProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivityProbe {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn has_connectivity(&self) -> bool {
        match self.client.get(&self.url).send().await {
            Ok(response) => {
                trace!("connectivity check answered with {}", response.status());
                true
            }
            Err(e) => {
                warn!("connectivity check failed: {e}");
                false
            }
        }
    }
}

//! HTTP transport used by the feed fetchers.
//!
//! Fetchers are generic over [`HttpFetch`] so tests can serve canned bodies
//! without touching the network.

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use std::future::Future;

pub trait HttpFetch: Send + Sync {
    /// GET `url` and return the body. A non-success status is an error.
    fn get(&self, url: &str) -> impl Future<Output = Result<Bytes>> + Send;
}

/// Production transport backed by reqwest.
///
/// No timeout is configured here: the caller owns the request deadline.
#[derive(Clone)]
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fleetwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

impl HttpFetch for ReqwestFetch {
    async fn get(&self, url: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("{} responded with status: {}", url, status));
        }

        response
            .bytes()
            .await
            .with_context(|| format!("Error reading body from {}", url))
    }
}

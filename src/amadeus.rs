//! Flight and hotel provider client
//!
//! Thin wrapper over the provider's REST API that adds bearer authentication
//! from an owned [`TokenCache`].

use crate::auth::{TokenCache, TokenState};
use crate::config::AmadeusConfig;
use crate::{Result, http};
use reqwest::{Client, Response};
use std::time::Instant;
use tracing::debug;

pub const PROVIDER: &str = "amadeus";

pub struct AmadeusClient {
    client: Client,
    base_url: String,
    tokens: TokenCache,
}

impl AmadeusClient {
    /// Create a client with its own, initially expired, token cache
    pub fn new(config: &AmadeusConfig) -> Result<Self> {
        let client = http::build_client(config.timeout_seconds)?;
        let tokens = TokenCache::new(
            client.clone(),
            config.base_url.clone(),
            config.client_id.clone(),
            config.client_secret.clone(),
        );

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            tokens,
        })
    }

    pub async fn token_state(&self) -> TokenState {
        self.tokens.state().await
    }

    /// Authorized GET. The response is returned as-is so callers decide how
    /// to treat non-success statuses.
    pub async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Response> {
        let token = self.tokens.acquire_token().await?;
        let url = http::endpoint(&self.base_url, path, params)?;

        let started = Instant::now();
        let response = self.client.get(url).bearer_auth(token).send().await?;
        debug!(
            path,
            status = response.status().as_u16(),
            "Amadeus request finished in {:.3}s",
            started.elapsed().as_secs_f64()
        );
        Ok(response)
    }
}

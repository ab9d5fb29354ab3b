//! Client-credentials bearer token cache
//!
//! Each provider client owns one `TokenCache`, created together with the
//! client. The cache is in one of two states:
//!
//! - **Expired**: nothing cached yet, or `now >= expires_at`. The next
//!   `acquire_token` performs a credential exchange.
//! - **Valid**: `now < expires_at`. `acquire_token` returns the cached token
//!   without touching the network.
//!
//! `expires_at` is stored already reduced by [`SAFETY_MARGIN_SECS`], so a
//! token is never handed out during the last minute of its lifetime.

use crate::http;
use crate::{Result, TravelCrewError};
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Seconds subtracted from the provider-reported lifetime
pub const SAFETY_MARGIN_SECS: i64 = 60;

/// Path of the token endpoint relative to the provider base URL
pub const TOKEN_PATH: &str = "/v1/security/oauth2/token";

/// Access token together with its effective expiry
#[derive(Debug, Clone, PartialEq)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Build a token from the provider TTL, applying the safety margin.
    /// A lifetime that does not fit a timestamp is an [`TravelCrewError::AuthFailure`].
    pub fn from_ttl(access_token: String, expires_in_secs: i64, now: DateTime<Utc>) -> Result<Self> {
        let expires_at = expires_in_secs
            .checked_sub(SAFETY_MARGIN_SECS)
            .and_then(TimeDelta::try_seconds)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                TravelCrewError::auth(format!("invalid expires_in {expires_in_secs} in token response"))
            })?;

        Ok(Self {
            access_token,
            expires_at,
        })
    }

    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Observable lifecycle state of a [`TokenCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Expired,
    Valid,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Per-client token cache for the OAuth2 client-credentials grant
pub struct TokenCache {
    client: Client,
    base_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    token: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    /// Create an empty (expired) cache
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            client_id,
            client_secret,
            token: Mutex::new(None),
        }
    }

    /// Current lifecycle state
    pub async fn state(&self) -> TokenState {
        match self.token.lock().await.as_ref() {
            Some(token) if token.is_valid_at(Utc::now()) => TokenState::Valid,
            _ => TokenState::Expired,
        }
    }

    /// Return a valid access token, exchanging credentials when the cached one expired
    #[instrument(name = "acquire_token", level = "debug", skip(self))]
    pub async fn acquire_token(&self) -> Result<String> {
        // Held across the exchange so concurrent callers wait for one refresh.
        let mut slot = self.token.lock().await;

        if let Some(token) = slot.as_ref() {
            if token.is_valid_at(Utc::now()) {
                debug!("Reusing cached access token until {}", token.expires_at);
                return Ok(token.access_token.clone());
            }
            debug!("Cached access token expired at {}", token.expires_at);
        }

        let token = self.exchange().await?;
        let access_token = token.access_token.clone();
        *slot = Some(token);
        Ok(access_token)
    }

    async fn exchange(&self) -> Result<CachedToken> {
        let (client_id, client_secret) = match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => (id, secret),
            _ => {
                return Err(TravelCrewError::config(
                    "Missing Amadeus credentials. Set AMADEUS_CLIENT_ID and AMADEUS_CLIENT_SECRET.",
                ));
            }
        };

        let url = http::endpoint(&self.base_url, TOKEN_PATH, &[])?;
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
        ];

        let response = self.client.post(url).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TravelCrewError::auth(body));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| TravelCrewError::auth(format!("invalid token response: {e}")))?;

        let token = CachedToken::from_ttl(parsed.access_token, parsed.expires_in, Utc::now())?;
        info!("Obtained new access token valid until {}", token.expires_at);
        Ok(token)
    }
}

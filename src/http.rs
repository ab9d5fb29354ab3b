//! Shared HTTP plumbing for provider clients

use crate::{Result, TravelCrewError};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("TravelCrew/", env!("CARGO_PKG_VERSION"));

/// Build a reqwest client with the crate user agent and the given timeout
pub fn build_client(timeout_seconds: u32) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds.into()))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| TravelCrewError::config(format!("Failed to create HTTP client: {e}")))
}

/// Join `base_url` and `path` and append query parameters
pub fn endpoint(base_url: &str, path: &str, params: &[(&str, &str)]) -> Result<Url> {
    let raw = format!("{}{}", base_url.trim_end_matches('/'), path);
    let mut url = Url::parse(&raw)
        .map_err(|e| TravelCrewError::config(format!("Invalid provider URL '{raw}': {e}")))?;
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url)
}

/// Turn a non-success status into a provider error carrying the response body
pub async fn ensure_success(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => format!("<unreadable response body: {e}>"),
    };
    warn!(provider, status = status.as_u16(), "Provider returned an error status");
    Err(TravelCrewError::provider(provider, Some(status.as_u16()), body))
}

/// Read the body and decode it as JSON, reporting malformed payloads as provider errors
pub async fn decode_json<T: DeserializeOwned>(provider: &str, response: Response) -> Result<T> {
    let status = response.status().as_u16();
    let body = response.text().await?;
    debug!(provider, bytes = body.len(), "Decoding provider response");

    serde_json::from_str(&body).map_err(|e| {
        TravelCrewError::provider(provider, Some(status), format!("invalid response: {e}"))
    })
}

//! Google Calendar API client
//!
//! Provides a typed HTTP client for the Google Calendar v3 API. Handles
//! bearer authentication, bounded-exponential-backoff retry on 429/5xx,
//! one-shot access-token refresh on 401, and typed surfacing of 410 Gone
//! (sync-cursor invalidation).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use calsync_google::client::GoogleClient;
//! use calsync_core::config::GoogleConfig;
//! use calsync_core::ports::Tokens;
//! use chrono::Utc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let tokens = Tokens {
//!     access_token: "ya29.token".into(),
//!     refresh_token: Some("1//refresh".into()),
//!     expires_at: Utc::now() + chrono::Duration::hours(1),
//! };
//! let client = GoogleClient::new(tokens, &GoogleConfig::default());
//! let current = client.current_tokens().await;
//! println!("token: {}", current.access_token);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use calsync_core::config::GoogleConfig;
use calsync_core::ports::{ProviderError, Tokens};

/// First backoff delay; doubled on each further attempt.
const BASE_DELAY: Duration = Duration::from_secs(1);

/// Maximum attempts per request when none is configured.
const DEFAULT_MAX_RETRIES: u32 = 5;

/// Response from the OAuth token endpoint on refresh
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Seconds until expiry
    expires_in: i64,
    /// Google usually omits this on refresh; the old one stays valid
    refresh_token: Option<String>,
}

/// HTTP client for Google Calendar API calls
///
/// Wraps `reqwest::Client` with bearer authentication and base URL
/// construction. Tokens live behind a `tokio::sync::Mutex` so a 401-
/// triggered refresh can swap them under `&self`.
pub struct GoogleClient {
    client: Client,
    base_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    tokens: Mutex<Tokens>,
    max_retries: u32,
}

impl GoogleClient {
    /// Creates a new client from workspace tokens and API settings
    pub fn new(tokens: Tokens, config: &GoogleConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.api_base_url.clone(),
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            tokens: Mutex::new(tokens),
            max_retries: config.max_retries.max(1),
        }
    }

    /// Creates a client against custom API and token endpoints (useful
    /// for testing against a mock server)
    pub fn with_base_url(
        tokens: Tokens,
        base_url: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            token_url: token_url.into(),
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
            tokens: Mutex::new(tokens),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Overrides the attempt budget. A minimum of one attempt is kept.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Returns the tokens currently in use, reflecting any refresh
    pub async fn current_tokens(&self) -> Tokens {
        self.tokens.lock().await.clone()
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Executes a request with bounded-exponential-backoff retry.
    ///
    /// Per attempt:
    /// - 429: sleep for `Retry-After` when present, otherwise the
    ///   backoff delay, then retry.
    /// - 5xx: sleep for the backoff delay, then retry.
    /// - 401: refresh the access token once per call and retry
    ///   immediately; a second 401 fails with `ProviderError::Auth`.
    /// - 410: surfaced as `ProviderError::CursorExpired`.
    /// - Any other non-success status fails with `ProviderError::Upstream`.
    pub async fn execute_with_retry(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Response, ProviderError> {
        let mut refreshed = false;
        let mut delay = BASE_DELAY;
        let mut attempt = 0;

        // Not a for loop: the 401-refresh branch re-sends without
        // spending an attempt, so even max_retries = 1 gets its retry
        // with the fresh token.
        while attempt < self.max_retries {
            let access_token = { self.tokens.lock().await.access_token.clone() };
            let response = self
                .client
                .request(method.clone(), url)
                .query(query)
                .bearer_auth(&access_token)
                .send()
                .await
                .map_err(|e| ProviderError::Upstream(format!("Request to {url} failed: {e}")))?;

            let status = response.status();

            if status.is_success() {
                if attempt > 0 {
                    info!(url, attempt, "Request succeeded after retry");
                }
                return Ok(response);
            }

            match status {
                StatusCode::GONE => return Err(ProviderError::CursorExpired),
                StatusCode::UNAUTHORIZED => {
                    if refreshed {
                        return Err(ProviderError::Auth(
                            "Access token rejected after refresh".to_string(),
                        ));
                    }
                    debug!(url, "Received 401, refreshing access token");
                    self.refresh_access_token().await?;
                    refreshed = true;
                    // Re-send immediately; `attempt` is not incremented
                    continue;
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    let wait = response
                        .headers()
                        .get("Retry-After")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.trim().parse::<u64>().ok())
                        .map(Duration::from_secs)
                        .unwrap_or(delay);
                    warn!(url, attempt, wait_ms = wait.as_millis() as u64, "Rate limited, backing off");
                    tokio::time::sleep(wait).await;
                }
                s if s.is_server_error() => {
                    warn!(url, attempt, status = %s, delay_ms = delay.as_millis() as u64, "Server error, backing off");
                    tokio::time::sleep(delay).await;
                }
                s => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ProviderError::Upstream(format!(
                        "{url} returned {s}: {body}"
                    )));
                }
            }

            delay *= 2;
            attempt += 1;
        }

        Err(ProviderError::Upstream(format!(
            "{url} still failing after {} attempts",
            self.max_retries
        )))
    }

    /// Exchanges the refresh token for a new access token and swaps it
    /// into the client.
    pub async fn refresh_access_token(&self) -> Result<Tokens, ProviderError> {
        let refresh_token = {
            let tokens = self.tokens.lock().await;
            tokens
                .refresh_token
                .clone()
                .ok_or_else(|| ProviderError::Auth("No refresh token available".to_string()))?
        };

        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Auth(format!("Token refresh request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Auth(format!(
                "Token refresh returned {status}: {body}"
            )));
        }

        let refreshed: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Auth(format!("Invalid token refresh response: {e}")))?;

        let mut tokens = self.tokens.lock().await;
        tokens.access_token = refreshed.access_token;
        tokens.expires_at = Utc::now() + chrono::Duration::seconds(refreshed.expires_in);
        if let Some(new_refresh) = refreshed.refresh_token {
            tokens.refresh_token = Some(new_refresh);
        }

        info!("Access token refreshed");
        Ok(tokens.clone())
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth access token management.
//!
//! The refresh token is long-lived and supplied up front. Access tokens are
//! short-lived; they are fetched on first use and refreshed whenever the
//! cached one is about to expire.

use crate::error::{ExportError, Result};
use crate::models::Credentials;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

/// Margin before token expiration when we proactively refresh (60 seconds).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

/// Token refresh response from Strava.
#[derive(Debug, Clone, Deserialize)]
struct TokenRefreshResponse {
    access_token: String,
    expires_at: i64,
}

/// Owns the credentials and hands out valid access tokens.
pub struct TokenManager {
    http: reqwest::Client,
    token_url: String,
    /// Held across the refresh exchange so concurrent callers share one refresh.
    credentials: Mutex<Credentials>,
}

impl TokenManager {
    pub fn new(http: reqwest::Client, token_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            credentials: Mutex::new(credentials),
        }
    }

    /// Get a valid (non-expired) access token, refreshing if needed.
    ///
    /// Any failure here is an [`ExportError::Auth`]: nothing can be fetched
    /// without a token.
    pub async fn get_valid_access_token(&self) -> Result<String> {
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);
        let mut credentials = self.credentials.lock().await;

        if let Some(token) = credentials.valid_access_token(Utc::now(), margin) {
            return Ok(token.to_string());
        }

        tracing::info!(
            expires_at = ?credentials.expires_at(),
            "Access token missing or expiring, refreshing"
        );

        let refreshed = self.refresh(&credentials).await?;
        let expires_at = DateTime::from_timestamp(refreshed.expires_at, 0).ok_or_else(|| {
            ExportError::Auth(format!(
                "Token response has invalid expires_at {}",
                refreshed.expires_at
            ))
        })?;

        credentials.set_access_token(refreshed.access_token.clone(), expires_at);
        tracing::info!(%expires_at, "Access token refreshed");
        Ok(refreshed.access_token)
    }

    /// Exchange the refresh token for a new access token.
    async fn refresh(&self, credentials: &Credentials) -> Result<TokenRefreshResponse> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", credentials.client_id()),
                ("client_secret", credentials.client_secret()),
                ("refresh_token", credentials.refresh_token()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| ExportError::Auth(format!("Token refresh request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Strava token refresh failed");
            return Err(ExportError::Auth(format!(
                "Token refresh failed with status {}; {}",
                status,
                ExportError::REAUTHORIZE_HINT
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ExportError::Auth(format!("Failed to parse token response: {}", e)))
    }
}

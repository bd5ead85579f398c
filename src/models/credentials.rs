// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! OAuth credentials held by the token manager.

use chrono::{DateTime, Utc};

/// Client credentials plus the current access token, if any.
///
/// Only the token manager mutates this; the refresh token never changes.
#[derive(Clone)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    access_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    pub fn new(client_id: String, client_secret: String, refresh_token: String) -> Self {
        Self {
            client_id,
            client_secret,
            refresh_token,
            access_token: None,
            expires_at: None,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Access token still valid `margin` from `now`.
    pub fn valid_access_token(
        &self,
        now: DateTime<Utc>,
        margin: chrono::Duration,
    ) -> Option<&str> {
        match (&self.access_token, self.expires_at) {
            (Some(token), Some(expires_at)) if now + margin < expires_at => Some(token),
            _ => None,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub(crate) fn set_access_token(&mut self, access_token: String, expires_at: DateTime<Utc>) {
        self.access_token = Some(access_token);
        self.expires_at = Some(expires_at);
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("has_access_token", &self.access_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_access_token_respects_margin() {
        let now = Utc::now();
        let mut creds = Credentials::new("id".into(), "secret".into(), "refresh".into());
        assert!(creds.valid_access_token(now, Duration::seconds(60)).is_none());

        creds.set_access_token("abc".into(), now + Duration::seconds(30));
        assert!(creds.valid_access_token(now, Duration::seconds(60)).is_none());

        creds.set_access_token("abc".into(), now + Duration::seconds(3600));
        assert_eq!(creds.valid_access_token(now, Duration::seconds(60)), Some("abc"));
        assert_eq!(creds.refresh_token(), "refresh");
    }

    #[test]
    fn test_debug_hides_secrets() {
        let creds = Credentials::new("id".into(), "hunter2".into(), "refresh-xyz".into());
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("refresh-xyz"));
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access token acquisition and caching.
//!
//! ## Behaviour
//!
//! - Tokens are obtained with the OAuth2 JWT-bearer grant
//! - A token is reused until it is within [`REFRESH_MARGIN`] of expiry
//! - Refresh is single-flight: callers queued behind an in-flight request
//!   share its outcome, success or failure
//! - Failures are never cached beyond the callers that waited on them; the
//!   next caller triggers a fresh attempt

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::error::AuthError;
use super::identity::ServiceIdentity;

/// Tokens closer than this to expiry are refreshed.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Longest lifetime accepted from the token endpoint; larger values are capped.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// A bearer token and the instant it stops being valid.
#[derive(Clone)]
pub struct AccessToken {
    secret: Arc<str>,
    expires_at: Instant,
}

impl AccessToken {
    fn new(secret: impl Into<Arc<str>>, expires_in: Duration) -> Self {
        Self {
            secret: secret.into(),
            expires_at: Instant::now() + expires_in.min(MAX_TOKEN_LIFETIME),
        }
    }

    /// The raw token, for an `Authorization: Bearer` header.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    fn is_fresh(&self) -> bool {
        Instant::now() + REFRESH_MARGIN < self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Default)]
struct TokenSlot {
    token: Option<AccessToken>,
    last_failure: Option<AuthError>,
}

struct Inner {
    identity: ServiceIdentity,
    http: reqwest::Client,
    slot: Mutex<TokenSlot>,
    /// Completed token requests, successful or not.
    attempts: AtomicU64,
}

/// Process-wide source of access tokens for the service identity.
///
/// Cheap to clone; every clone shares the same cache.
#[derive(Clone)]
pub struct CredentialProvider {
    inner: Arc<Inner>,
}

impl CredentialProvider {
    /// Wrap `identity`, fetching tokens through `http`.
    ///
    /// The client's timeout bounds every token request.
    pub fn new(identity: ServiceIdentity, http: reqwest::Client) -> Self {
        Self {
            inner: Arc::new(Inner {
                identity,
                http,
                slot: Mutex::new(TokenSlot::default()),
                attempts: AtomicU64::new(0),
            }),
        }
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.inner.identity
    }

    /// Whether `other` is a clone of this provider.
    pub fn shares_cache_with(&self, other: &CredentialProvider) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of token requests issued so far.
    pub fn token_requests(&self) -> u64 {
        self.inner.attempts.load(Ordering::Acquire)
    }

    /// Whether a token outside the refresh margin is cached.
    pub async fn is_cached(&self) -> bool {
        let slot = self.inner.slot.lock().await;
        slot.token.as_ref().is_some_and(AccessToken::is_fresh)
    }

    /// Failure of the most recent token request, cleared by the next success.
    pub async fn last_failure(&self) -> Option<AuthError> {
        self.inner.slot.lock().await.last_failure.clone()
    }

    /// Get a valid access token, refreshing it if needed.
    pub async fn token(&self) -> Result<AccessToken, AuthError> {
        let observed = self.inner.attempts.load(Ordering::Acquire);
        let mut slot = self.inner.slot.lock().await;

        if let Some(token) = slot.token.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.clone());
        }

        // An attempt finished while we were queued on the lock: share its failure.
        if self.inner.attempts.load(Ordering::Acquire) != observed {
            if let Some(err) = &slot.last_failure {
                return Err(err.clone());
            }
        }

        let result = self.fetch().await;
        self.inner.attempts.fetch_add(1, Ordering::AcqRel);

        match result {
            Ok(token) => {
                slot.token = Some(token.clone());
                slot.last_failure = None;
                Ok(token)
            }
            Err(err) => {
                warn!(
                    error_code = err.error_code(),
                    error = %err,
                    "Access token request failed"
                );
                slot.token = None;
                slot.last_failure = Some(err.clone());
                Err(err)
            }
        }
    }

    async fn fetch(&self) -> Result<AccessToken, AuthError> {
        let identity = &self.inner.identity;
        let assertion = identity.assertion(chrono::Utc::now().timestamp())?;

        let response = self
            .inner
            .http
            .post(identity.token_uri())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // Only the OAuth2 error fields are kept; the raw body is not echoed.
            let reason = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| match e.error_description {
                    Some(desc) => format!("{}: {desc}", e.error),
                    None => e.error,
                })
                .unwrap_or_else(|_| "unrecognized error response".to_string());
            return Err(AuthError::TokenRejected {
                status: status.as_u16(),
                reason,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidTokenResponse(e.to_string()))?;

        if token.access_token.trim().is_empty() {
            return Err(AuthError::InvalidTokenResponse(
                "response did not include access_token".to_string(),
            ));
        }

        let expires_in =
            Duration::from_secs(token.expires_in.unwrap_or(3600)).min(MAX_TOKEN_LIFETIME);
        info!(
            client_email = %identity.client_email(),
            expires_in_secs = expires_in.as_secs(),
            "Access token refreshed"
        );

        Ok(AccessToken::new(token.access_token, expires_in))
    }
}

fn map_transport_error(e: reqwest::Error) -> AuthError {
    if e.is_timeout() {
        AuthError::Timeout
    } else {
        AuthError::TokenEndpoint(e.to_string())
    }
}

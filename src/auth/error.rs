// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential errors.

/// Failure while turning the service identity into an access token.
///
/// Every variant except [`AuthError::Timeout`] is an authentication failure
/// and is shared verbatim with every caller waiting on the same refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Private key could not be parsed or used for signing
    InvalidKey(String),
    /// The JWT assertion could not be built
    Signing(String),
    /// Token endpoint rejected the assertion (revoked key, clock skew, ...)
    TokenRejected { status: u16, reason: String },
    /// Token endpoint could not be reached
    TokenEndpoint(String),
    /// Token endpoint answered with something that is not a token
    InvalidTokenResponse(String),
    /// Token endpoint did not answer within the downstream timeout
    Timeout,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Timeout => "downstream_timeout",
            _ => "auth_failed",
        }
    }

    /// Whether this is an authentication failure rather than a timeout.
    pub fn is_auth_failed(&self) -> bool {
        !matches!(self, AuthError::Timeout)
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidKey(msg) => write!(f, "Service account key is invalid: {msg}"),
            AuthError::Signing(msg) => write!(f, "Failed to sign token assertion: {msg}"),
            AuthError::TokenRejected { status, reason } => {
                write!(f, "Token endpoint rejected the assertion (HTTP {status}): {reason}")
            }
            AuthError::TokenEndpoint(msg) => write!(f, "Token endpoint unreachable: {msg}"),
            AuthError::InvalidTokenResponse(msg) => {
                write!(f, "Token endpoint returned an invalid response: {msg}")
            }
            AuthError::Timeout => write!(f, "Token endpoint timed out"),
        }
    }
}

impl std::error::Error for AuthError {}

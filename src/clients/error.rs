// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::auth::AuthError;

use super::Capability;

/// Failure of a downstream capability call.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The credential provider could not produce a token.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("{capability} client unavailable: {reason}")]
    ClientUnavailable {
        capability: Capability,
        reason: String,
    },

    #[error("{capability} call timed out")]
    DownstreamTimeout { capability: Capability },

    /// The remote API answered with an application-level error.
    #[error("{capability} rejected the request (HTTP {status}): {message}")]
    DownstreamRejected {
        capability: Capability,
        status: u16,
        message: String,
    },

    #[error("{capability} returned an unexpected response: {reason}")]
    InvalidResponse {
        capability: Capability,
        reason: String,
    },
}

impl ClientError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            ClientError::Auth(e) => e.error_code(),
            ClientError::ClientUnavailable { .. } => "client_unavailable",
            ClientError::DownstreamTimeout { .. } => "downstream_timeout",
            ClientError::DownstreamRejected { .. } => "downstream_rejected",
            ClientError::InvalidResponse { .. } => "invalid_response",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ClientError::DownstreamTimeout { .. } | ClientError::Auth(AuthError::Timeout)
        )
    }

    /// Capability that failed; `None` when no token could be obtained.
    pub fn capability(&self) -> Option<Capability> {
        match self {
            ClientError::Auth(_) => None,
            ClientError::ClientUnavailable { capability, .. }
            | ClientError::DownstreamTimeout { capability }
            | ClientError::DownstreamRejected { capability, .. }
            | ClientError::InvalidResponse { capability, .. } => Some(*capability),
        }
    }

    /// HTTP status the remote API answered with, if it rejected the call.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ClientError::DownstreamRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn transport(capability: Capability, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::DownstreamTimeout { capability }
        } else {
            ClientError::ClientUnavailable {
                capability,
                reason: e.to_string(),
            }
        }
    }
}

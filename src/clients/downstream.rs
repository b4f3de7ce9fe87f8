// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authorized request plumbing shared by every capability client.

use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Capability, ClientError};
use crate::auth::CredentialProvider;

#[derive(Debug, Deserialize)]
struct GoogleErrorResponse {
    error: GoogleErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// HTTP client plus credential provider for one capability.
#[derive(Clone)]
pub struct Downstream {
    capability: Capability,
    http: reqwest::Client,
    provider: CredentialProvider,
}

impl Downstream {
    pub fn new(
        capability: Capability,
        http: reqwest::Client,
        provider: CredentialProvider,
    ) -> Self {
        Self {
            capability,
            http,
            provider,
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn provider(&self) -> &CredentialProvider {
        &self.provider
    }

    /// Attach a bearer token, send, and turn non-2xx answers into errors.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let token = self.provider.token().await?;

        let response = request
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(|e| ClientError::transport(self.capability, e))?;

        let status = response.status();
        debug!(
            capability = %self.capability,
            status = status.as_u16(),
            "Downstream call finished"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::DownstreamRejected {
                capability: self.capability,
                status: status.as_u16(),
                message: google_error_message(&body),
            });
        }

        Ok(response)
    }

    /// POST `body` as JSON and decode a JSON answer.
    pub async fn post_json<B, R>(&self, url: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self.execute(self.http.post(url).json(body)).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse {
                capability: self.capability,
                reason: e.to_string(),
            })
    }
}

/// Pull `error.message` out of a Google API error body.
fn google_error_message(body: &str) -> String {
    match serde_json::from_str::<GoogleErrorResponse>(body) {
        Ok(parsed) => match (parsed.error.status, parsed.error.message) {
            (Some(status), Some(message)) => format!("{status}: {message}"),
            (None, Some(message)) => message,
            (Some(status), None) => status,
            (None, None) => "no error message".to_string(),
        },
        Err(_) => body.chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_google_error_message() {
        let body = r#"{"error":{"code":400,"message":"Invalid recognition 'config': bad encoding.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            google_error_message(body),
            "INVALID_ARGUMENT: Invalid recognition 'config': bad encoding."
        );
    }

    #[test]
    fn truncates_non_json_bodies() {
        let body = "x".repeat(500);
        assert_eq!(google_error_message(&body).len(), 200);
    }
}

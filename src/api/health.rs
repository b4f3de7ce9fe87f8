// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Degraded,
    Unavailable,
}

/// Gateway readiness report.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// "ok" when the gateway is serving with a usable credential.
    pub status: CheckStatus,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Startup lifecycle state ("serving" once the listener is up).
    pub lifecycle: String,
    /// Whether an access token is cached or can be obtained.
    pub credential: CheckStatus,
    /// Service account the gateway acts as.
    pub identity: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: CheckStatus,
}

/// A cached token counts as ok and a recorded failure as unavailable.
/// Only when neither is known is a refresh attempted.
async fn credential_status(state: &AppState) -> CheckStatus {
    let provider = state.clients.provider();
    if provider.is_cached().await {
        return CheckStatus::Ok;
    }
    if let Some(err) = provider.last_failure().await {
        warn!(error_code = err.error_code(), error = %err, "Credential unavailable");
        return CheckStatus::Unavailable;
    }
    match provider.token().await {
        Ok(_) => CheckStatus::Ok,
        Err(e) => {
            warn!(error_code = e.error_code(), error = %e, "Credential check failed");
            CheckStatus::Unavailable
        }
    }
}

async fn report(state: &AppState) -> (StatusCode, Json<ReadyResponse>) {
    let credential = credential_status(state).await;
    let ready = state.lifecycle.is_serving() && credential == CheckStatus::Ok;

    let body = ReadyResponse {
        status: if ready {
            CheckStatus::Ok
        } else {
            CheckStatus::Degraded
        },
        checks: HealthChecks {
            lifecycle: state.lifecycle.state().to_string(),
            credential,
            identity: state.clients.provider().identity().client_email().to_string(),
        },
    };
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Serving with a usable credential", body = ReadyResponse),
        (status = 503, description = "Not serving or no credential", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    report(&state).await
}

/// Liveness probe; never touches the credential.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Process is running", body = HealthResponse)
    )
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: CheckStatus::Ok,
    })
}

#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready to forward requests", body = ReadyResponse),
        (status = 503, description = "Not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    report(&state).await
}

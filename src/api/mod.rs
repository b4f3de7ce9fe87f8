// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{
        FileUploadForm, StoredFileResponse, SynthesizeRequest, SynthesizeResponse, TranscribeForm,
        TranscribeFromUrlRequest, TranscriptionResponse, TranslateRequest, TranslationResponse,
    },
    state::AppState,
};

pub mod health;
pub mod storage;
pub mod synthesize;
pub mod transcribe;
pub mod translate;
pub mod upload;

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    let routes = Router::new()
        .route("/transcribe", post(transcribe::transcribe))
        .route("/transcribeFromUrl", post(transcribe::transcribe_from_url))
        .route("/synthesize", post(synthesize::synthesize))
        .route("/translate", post(translate::translate))
        .route("/storage/file", post(storage::upload_file))
        .route("/storage/file/{name}", get(storage::download_file))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        transcribe::transcribe,
        transcribe::transcribe_from_url,
        synthesize::synthesize,
        translate::translate,
        storage::upload_file,
        storage::download_file,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            TranscribeForm,
            TranscribeFromUrlRequest,
            TranscriptionResponse,
            SynthesizeRequest,
            SynthesizeResponse,
            TranslateRequest,
            TranslationResponse,
            FileUploadForm,
            StoredFileResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::CheckStatus,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Speech", description = "Transcription and speech synthesis"),
        (name = "Translation", description = "Text translation"),
        (name = "Storage", description = "File upload and download"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;

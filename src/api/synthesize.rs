// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::{
    clients::ObjectBody,
    config::SynthesizeDelivery,
    error::{ApiError, Operation},
    models::{SynthesizeRequest, SynthesizeResponse},
    state::AppState,
};

const UPLOADED_MESSAGE: &str = "Audio synthesized and uploaded successfully.";

/// Object name for synthesized audio created at `millis` (unix ms).
pub fn synthesized_object_name(folder: &str, millis: i64) -> String {
    format!("{folder}/synthesized_audio_{millis}.mp3")
}

#[utoipa::path(
    post,
    path = "/synthesize",
    tag = "Speech",
    request_body = SynthesizeRequest,
    responses(
        (status = 200, description = "Signed link to the uploaded MP3, or `audio/mpeg` bytes when inline delivery is configured", body = SynthesizeResponse),
        (status = 400, description = "No text provided"),
        (status = 500, description = "Synthesis or upload failed")
    )
)]
pub async fn synthesize(
    State(state): State<AppState>,
    request: Result<Json<SynthesizeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = request.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let text = request
        .text
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("No text provided."))?;
    let language_code = request
        .language_code
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(&state.config.default_language);

    let audio = state
        .clients
        .synthesis()
        .map_err(|e| ApiError::downstream(Operation::Synthesize, e))?
        .synthesize(text, language_code)
        .await
        .map_err(|e| ApiError::downstream(Operation::Synthesize, e))?;

    match state.config.synthesize_delivery {
        SynthesizeDelivery::Inline => {
            Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response())
        }
        SynthesizeDelivery::SignedUrl => {
            let storage = state
                .clients
                .storage()
                .map_err(|e| ApiError::downstream(Operation::Synthesize, e))?;
            let name = synthesized_object_name(
                &state.config.storage_folder,
                chrono::Utc::now().timestamp_millis(),
            );

            storage
                .store(&name, ObjectBody::Bytes(audio), "audio/mpeg")
                .await
                .map_err(|e| ApiError::downstream(Operation::Synthesize, e))?;
            let file_url = storage
                .signed_url(&name, state.config.signed_url_ttl)
                .map_err(|e| ApiError::downstream(Operation::Synthesize, e))?;

            Ok(Json(SynthesizeResponse {
                message: UPLOADED_MESSAGE.to_string(),
                file_url,
            })
            .into_response())
        }
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    Json,
};
use tracing::{error, warn};
use url::Url;

use super::upload::read_form;
use crate::{
    error::{ApiError, Operation},
    models::{TranscribeForm, TranscribeFromUrlRequest, TranscriptionResponse},
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/transcribe",
    tag = "Speech",
    request_body(content = TranscribeForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, body = TranscriptionResponse),
        (status = 400, description = "No audio part in the form"),
        (status = 500, description = "Transcription failed")
    )
)]
pub async fn transcribe(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TranscriptionResponse>, ApiError> {
    let multipart = multipart.map_err(|_| ApiError::bad_request("No file uploaded."))?;
    let form = read_form(
        multipart,
        "audio",
        state.config.upload_buffering,
        state.config.upload_dir.as_deref(),
    )
    .await?;

    let Some(file) = form.file.as_ref().filter(|f| !f.is_empty()) else {
        return Err(ApiError::bad_request("No file uploaded."));
    };
    let language_code = form
        .field("languageCode")
        .unwrap_or(&state.config.default_language);

    let audio = file.bytes().await.map_err(|e| {
        error!(error = %e, "Failed to read buffered upload");
        ApiError::failed(Operation::Transcribe)
    })?;

    let transcription = state
        .clients
        .speech()
        .map_err(|e| ApiError::downstream(Operation::Transcribe, e))?
        .recognize(&audio, language_code)
        .await
        .map_err(|e| ApiError::downstream(Operation::Transcribe, e))?;

    Ok(Json(TranscriptionResponse { transcription }))
}

#[utoipa::path(
    post,
    path = "/transcribeFromUrl",
    tag = "Speech",
    request_body = TranscribeFromUrlRequest,
    responses(
        (status = 200, body = TranscriptionResponse),
        (status = 400, description = "Missing or unsupported audio URL"),
        (status = 500, description = "Download or transcription failed")
    )
)]
pub async fn transcribe_from_url(
    State(state): State<AppState>,
    request: Result<Json<TranscribeFromUrlRequest>, JsonRejection>,
) -> Result<Json<TranscriptionResponse>, ApiError> {
    let Json(request) = request.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let raw_url = request
        .audio_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("No audio URL provided."))?;
    let audio_url = Url::parse(raw_url)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .ok_or_else(|| ApiError::bad_request("Audio URL must be an http or https URL."))?;
    let language_code = request
        .language_code
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(&state.config.default_language);

    let audio = fetch_audio(&state, audio_url).await?;

    let transcription = state
        .clients
        .speech()
        .map_err(|e| ApiError::downstream(Operation::TranscribeFromUrl, e))?
        .recognize(&audio, language_code)
        .await
        .map_err(|e| ApiError::downstream(Operation::TranscribeFromUrl, e))?;

    Ok(Json(TranscriptionResponse { transcription }))
}

/// Download `url`, refusing bodies larger than the upload limit.
async fn fetch_audio(state: &AppState, url: Url) -> Result<Vec<u8>, ApiError> {
    let limit = state.config.max_upload_bytes;
    let failed = |reason: String| {
        warn!(reason = %reason, "Audio download failed");
        ApiError::failed(Operation::TranscribeFromUrl)
    };

    let mut response = state
        .clients
        .http()
        .get(url)
        .send()
        .await
        .map_err(|e| failed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status().as_u16())));
    }
    if response.content_length().is_some_and(|len| len > limit as u64) {
        return Err(failed("declared length exceeds the upload limit".to_string()));
    }

    let mut audio = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| failed(e.to_string()))? {
        if audio.len() + chunk.len() > limit {
            return Err(failed("body exceeds the upload limit".to_string()));
        }
        audio.extend_from_slice(&chunk);
    }
    Ok(audio)
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::{
    error::{ApiError, Operation},
    models::{TranslateRequest, TranslationResponse},
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/translate",
    tag = "Translation",
    request_body = TranslateRequest,
    responses(
        (status = 200, body = TranslationResponse),
        (status = 400, description = "Missing required parameters"),
        (status = 500, description = "Translation failed")
    )
)]
pub async fn translate(
    State(state): State<AppState>,
    request: Result<Json<TranslateRequest>, JsonRejection>,
) -> Result<Json<TranslationResponse>, ApiError> {
    let Json(request) = request.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let non_blank = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
    let (Some(text), Some(source), Some(target)) = (
        non_blank(&request.text),
        non_blank(&request.source_language),
        non_blank(&request.target_language),
    ) else {
        return Err(ApiError::bad_request("Missing required parameters."));
    };

    let translation = state
        .clients
        .translation()
        .map_err(|e| ApiError::downstream(Operation::Translate, e))?
        .translate(&text, source.trim(), target.trim())
        .await
        .map_err(|e| ApiError::downstream(Operation::Translate, e))?;

    Ok(Json(TranslationResponse { translation }))
}

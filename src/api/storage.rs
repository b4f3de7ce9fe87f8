// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;
use uuid::Uuid;

use super::upload::read_form;
use crate::{
    error::{ApiError, Operation},
    models::{FileUploadForm, StoredFileResponse},
    state::AppState,
};

/// Reduce a client-supplied file name to `[A-Za-z0-9._-]`.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_matches('.').chars().take(100).collect()
}

/// `{folder}/{uuid}` plus the sanitized original name, if any.
fn upload_object_name(folder: &str, file_name: Option<&str>) -> String {
    let id = Uuid::new_v4();
    match file_name.map(sanitize_file_name).filter(|n| !n.is_empty()) {
        Some(name) => format!("{folder}/{id}-{name}"),
        None => format!("{folder}/{id}"),
    }
}

#[utoipa::path(
    post,
    path = "/storage/file",
    tag = "Storage",
    request_body(content = FileUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, body = StoredFileResponse),
        (status = 400, description = "No file part in the form"),
        (status = 500, description = "Upload failed")
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<StoredFileResponse>), ApiError> {
    let multipart = multipart.map_err(|_| ApiError::bad_request("No file uploaded."))?;
    let form = read_form(
        multipart,
        "file",
        state.config.upload_buffering,
        state.config.upload_dir.as_deref(),
    )
    .await?;
    let Some(file) = form.file.as_ref() else {
        return Err(ApiError::bad_request("No file uploaded."));
    };

    let name = upload_object_name(&state.config.storage_folder, file.file_name.as_deref());
    let content_type = file
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream");
    let body = file.object_body().await.map_err(|e| {
        error!(error = %e, "Failed to reopen buffered upload");
        ApiError::failed(Operation::Upload)
    })?;

    let storage = state
        .clients
        .storage()
        .map_err(|e| ApiError::downstream(Operation::Upload, e))?;
    storage
        .store(&name, body, content_type)
        .await
        .map_err(|e| ApiError::downstream(Operation::Upload, e))?;
    let file_url = storage
        .signed_url(&name, state.config.signed_url_ttl)
        .map_err(|e| ApiError::downstream(Operation::Upload, e))?;

    Ok((
        StatusCode::CREATED,
        Json(StoredFileResponse {
            file_path: name,
            file_url,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/storage/file/{name}",
    params(
        ("name" = String, Path, description = "Object name inside the storage folder")
    ),
    tag = "Storage",
    responses(
        (status = 200, description = "Raw object bytes"),
        (status = 400, description = "Invalid object name"),
        (status = 404, description = "No such object"),
        (status = 500, description = "Download failed")
    )
)]
pub async fn download_file(
    Path(name): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(ApiError::bad_request("Invalid file name."));
    }
    let object = format!("{}/{name}", state.config.storage_folder);

    let storage = state
        .clients
        .storage()
        .map_err(|e| ApiError::downstream(Operation::Download, e))?;
    let stored = match storage.retrieve(&object).await {
        Ok(stored) => stored,
        Err(e) if e.upstream_status() == Some(404) => {
            return Err(ApiError::not_found("File not found."))
        }
        Err(e) => return Err(ApiError::downstream(Operation::Download, e)),
    };

    let content_type = stored
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());
    Ok(([(header::CONTENT_TYPE, content_type)], stored.bytes).into_response())
}

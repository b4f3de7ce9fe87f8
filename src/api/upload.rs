// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Multipart upload buffering.
//!
//! The file part is held either in memory or in a temporary file inside the
//! configured upload directory. Temporary files are [`TempPath`]s, so they
//! are removed when the buffered upload is dropped, whichever way the
//! request ends.

use std::collections::HashMap;
use std::path::Path;

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

use crate::clients::ObjectBody;
use crate::config::UploadBuffering;
use crate::error::ApiError;

/// Where an uploaded file's bytes live until the request finishes.
#[derive(Debug)]
pub enum BufferedData {
    Memory(Vec<u8>),
    Disk { path: TempPath, len: u64 },
}

#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: BufferedData,
}

impl UploadedFile {
    pub fn len(&self) -> u64 {
        match &self.data {
            BufferedData::Memory(bytes) => bytes.len() as u64,
            BufferedData::Disk { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The whole file in memory.
    pub async fn bytes(&self) -> std::io::Result<Vec<u8>> {
        match &self.data {
            BufferedData::Memory(bytes) => Ok(bytes.clone()),
            BufferedData::Disk { path, .. } => tokio::fs::read(path).await,
        }
    }

    /// An upload body that streams from disk when the file was buffered there.
    pub async fn object_body(&self) -> std::io::Result<ObjectBody> {
        match &self.data {
            BufferedData::Memory(bytes) => Ok(ObjectBody::Bytes(bytes.clone())),
            BufferedData::Disk { path, len } => Ok(ObjectBody::File {
                file: tokio::fs::File::open(path).await?,
                len: *len,
            }),
        }
    }
}

/// A parsed multipart form: at most one file plus text fields.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl UploadForm {
    /// A text field, trimmed, if present and non-blank.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Read `multipart`, buffering the part named `file_field`.
///
/// Other parts are read as text fields. A second file part is ignored.
pub async fn read_form(
    mut multipart: Multipart,
    file_field: &str,
    buffering: UploadBuffering,
    upload_dir: Option<&Path>,
) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == file_field {
            if form.file.is_some() {
                continue;
            }
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let data = match buffering {
                UploadBuffering::Memory => buffer_in_memory(field).await?,
                UploadBuffering::Disk => buffer_on_disk(field, upload_dir).await?,
            };
            form.file = Some(UploadedFile {
                file_name,
                content_type,
                data,
            });
        } else {
            let text = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, text);
        }
    }

    Ok(form)
}

async fn buffer_in_memory(mut field: Field<'_>) -> Result<BufferedData, ApiError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        bytes.extend_from_slice(&chunk);
    }
    Ok(BufferedData::Memory(bytes))
}

async fn buffer_on_disk(
    mut field: Field<'_>,
    dir: Option<&Path>,
) -> Result<BufferedData, ApiError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("upload-").suffix(".part");
    let named = match dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .map_err(disk_error)?;

    // From here on the path is removed when `path` drops.
    let (file, path) = named.into_parts();
    let mut file = tokio::fs::File::from_std(file);
    let mut len = 0u64;

    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        file.write_all(&chunk).await.map_err(disk_error)?;
        len += chunk.len() as u64;
    }
    file.flush().await.map_err(disk_error)?;

    debug!(path = %path.display(), bytes = len, "Upload buffered to disk");
    Ok(BufferedData::Disk { path, len })
}

fn multipart_error(e: MultipartError) -> ApiError {
    ApiError::new(e.status(), e.body_text())
}

fn disk_error(e: std::io::Error) -> ApiError {
    error!(error = %e, "Failed to buffer upload on disk");
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store the uploaded file.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::FromRequest;
    use tempfile::TempDir;

    use crate::testing::multipart_request;

    async fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Multipart {
        Multipart::from_request(multipart_request("/", parts), &()).await.unwrap()
    }

    #[tokio::test]
    async fn memory_buffering_keeps_file_and_fields() {
        let mp = multipart(&[
            ("languageCode", None, b" fr-FR "),
            ("audio", Some("clip.mp3"), b"ID3 data"),
        ])
        .await;

        let form = read_form(mp, "audio", UploadBuffering::Memory, None).await.unwrap();

        let file = form.file.as_ref().unwrap();
        assert_eq!(file.file_name.as_deref(), Some("clip.mp3"));
        assert_eq!(file.content_type.as_deref(), Some("audio/mpeg"));
        assert_eq!(file.bytes().await.unwrap(), b"ID3 data");
        assert_eq!(form.field("languageCode"), Some("fr-FR"));
        assert_eq!(form.field("missing"), None);
    }

    #[tokio::test]
    async fn disk_buffering_removes_file_on_drop() {
        let dir = TempDir::new().unwrap();
        let mp = multipart(&[("audio", Some("clip.mp3"), b"ID3 on disk")]).await;

        let form = read_form(mp, "audio", UploadBuffering::Disk, Some(dir.path()))
            .await
            .unwrap();

        let file = form.file.as_ref().unwrap();
        assert_eq!(file.len(), 11);
        assert_eq!(file.bytes().await.unwrap(), b"ID3 on disk");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        drop(form);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn missing_file_part_is_none() {
        let mp = multipart(&[("languageCode", None, b"en-US")]).await;

        let form = read_form(mp, "audio", UploadBuffering::Memory, None).await.unwrap();

        assert!(form.file.is_none());
    }
}

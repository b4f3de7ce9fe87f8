// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP error responses.
//!
//! Validation problems are answered with 400 and a specific message. Any
//! failure past validation is logged and answered with the operation's
//! fixed 500 message; upstream details never reach the caller.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::clients::ClientError;

/// A gateway route whose failures share one public message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Transcribe,
    TranscribeFromUrl,
    Synthesize,
    Translate,
    Upload,
    Download,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Transcribe => "transcribe",
            Operation::TranscribeFromUrl => "transcribe_from_url",
            Operation::Synthesize => "synthesize",
            Operation::Translate => "translate",
            Operation::Upload => "upload",
            Operation::Download => "download",
        }
    }

    /// Body of the 500 returned when this operation fails.
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::Transcribe => "An error occurred during transcription.",
            Operation::TranscribeFromUrl => "An error occurred during transcription from URL.",
            Operation::Synthesize => "An error occurred during text-to-speech synthesis.",
            Operation::Translate => "An error occurred during translation.",
            Operation::Upload => "An error occurred during file upload.",
            Operation::Download => "An error occurred while retrieving the file.",
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 500 for `op`. The caller logs the cause.
    pub fn failed(op: Operation) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, op.failure_message())
    }

    /// Log a downstream failure and answer with `op`'s 500.
    pub fn downstream(op: Operation, err: ClientError) -> Self {
        error!(
            operation = op.as_str(),
            capability = err.capability().map(|c| c.as_str()),
            error_code = err.error_code(),
            timeout = err.is_timeout(),
            error = %err,
            "Downstream call failed"
        );
        Self::failed(op)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: &self.message })).into_response()
    }
}

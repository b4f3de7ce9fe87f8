// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies of the gateway routes. Field names are
//! camelCase on the wire.
//!
//! Request fields are optional at the type level so that missing input is
//! answered with the route's own 400 message instead of a generic
//! deserialization error.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Transcription
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeFromUrlRequest {
    /// `http` or `https` URL of an MP3 file.
    pub audio_url: Option<String>,
    /// BCP-47 language code, defaults to `en-US`.
    pub language_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct TranscriptionResponse {
    pub transcription: String,
}

/// Multipart form accepted by `/transcribe` (documentation only).
#[derive(Deserialize, ToSchema)]
#[allow(dead_code)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeForm {
    #[schema(value_type = String, format = Binary)]
    pub audio: Vec<u8>,
    pub language_code: Option<String>,
}

// =============================================================================
// Synthesis
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeRequest {
    pub text: Option<String>,
    pub language_code: Option<String>,
}

/// Returned when synthesized audio is delivered as a signed link.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeResponse {
    pub message: String,
    pub file_url: String,
}

// =============================================================================
// Translation
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub text: Option<String>,
    pub source_language: Option<String>,
    pub target_language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct TranslationResponse {
    pub translation: String,
}

// =============================================================================
// Storage
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredFileResponse {
    /// Object name inside the bucket.
    pub file_path: String,
    /// Time-limited signed download URL.
    pub file_url: String,
}

/// Multipart form accepted by `POST /storage/file` (documentation only).
#[derive(Deserialize, ToSchema)]
#[allow(dead_code)]
pub struct FileUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_accept_camel_case() {
        let req: TranslateRequest = serde_json::from_str(
            r#"{"text":"hi","sourceLanguage":"en","targetLanguage":"fr"}"#,
        )
        .unwrap();
        assert_eq!(req.source_language.as_deref(), Some("en"));
        assert_eq!(req.target_language.as_deref(), Some("fr"));

        let req: TranscribeFromUrlRequest =
            serde_json::from_str(r#"{"audioUrl":"https://x/a.mp3"}"#).unwrap();
        assert_eq!(req.audio_url.as_deref(), Some("https://x/a.mp3"));
        assert!(req.language_code.is_none());
    }

    #[test]
    fn responses_serialize_camel_case() {
        let json = serde_json::to_value(StoredFileResponse {
            file_path: "APIstorage/a.mp3".into(),
            file_url: "https://signed".into(),
        })
        .unwrap();
        assert_eq!(json["filePath"], "APIstorage/a.mp3");
        assert_eq!(json["fileUrl"], "https://signed");
    }
}

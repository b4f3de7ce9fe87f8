// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cloud Speech-to-Text client.

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::downstream::Downstream;
use super::ClientError;

/// Uploads are always MP3 recorded at 16 kHz.
const AUDIO_ENCODING: &str = "MP3";
const SAMPLE_RATE_HERTZ: u32 = 16_000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig<'a> {
    encoding: &'static str,
    sample_rate_hertz: u32,
    language_code: &'a str,
}

#[derive(Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio,
}

#[derive(Debug, Default, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

#[derive(Clone)]
pub struct SpeechClient {
    downstream: Downstream,
    recognize_url: String,
}

impl SpeechClient {
    pub(crate) fn new(downstream: Downstream, base_url: &str) -> Self {
        Self {
            downstream,
            recognize_url: format!(
                "{}/v1p1beta1/speech:recognize",
                base_url.trim_end_matches('/')
            ),
        }
    }

    pub(crate) fn downstream(&self) -> &Downstream {
        &self.downstream
    }

    /// Transcribe MP3 `audio` spoken in `language_code`.
    ///
    /// Returns the top alternative of every result, one per line. Silence
    /// yields an empty string.
    pub async fn recognize(
        &self,
        audio: &[u8],
        language_code: &str,
    ) -> Result<String, ClientError> {
        let request = RecognizeRequest {
            config: RecognitionConfig {
                encoding: AUDIO_ENCODING,
                sample_rate_hertz: SAMPLE_RATE_HERTZ,
                language_code,
            },
            audio: RecognitionAudio {
                content: Base64::encode_string(audio),
            },
        };

        let response: RecognizeResponse = self
            .downstream
            .post_json(&self.recognize_url, &request)
            .await?;

        let transcription = join_transcripts(response);
        info!(
            language_code = %language_code,
            audio_bytes = audio.len(),
            transcript_chars = transcription.chars().count(),
            "Audio transcribed"
        );
        Ok(transcription)
    }
}

fn join_transcripts(response: RecognizeResponse) -> String {
    response
        .results
        .into_iter()
        .filter_map(|r| r.alternatives.into_iter().next())
        .map(|a| a.transcript)
        .collect::<Vec<_>>()
        .join("\n")
}

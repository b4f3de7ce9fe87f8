// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cloud Text-to-Speech client.

use base64ct::{Base64, Encoding};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::downstream::Downstream;
use super::ClientError;

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    ssml_gender: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: String,
}

#[derive(Clone)]
pub struct SynthesisClient {
    downstream: Downstream,
    synthesize_url: String,
}

impl SynthesisClient {
    pub(crate) fn new(downstream: Downstream, base_url: &str) -> Self {
        Self {
            downstream,
            synthesize_url: format!("{}/v1/text:synthesize", base_url.trim_end_matches('/')),
        }
    }

    pub(crate) fn downstream(&self) -> &Downstream {
        &self.downstream
    }

    /// Render `text` as MP3 audio with a neutral voice.
    pub async fn synthesize(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<Vec<u8>, ClientError> {
        let request = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code,
                ssml_gender: "NEUTRAL",
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };

        let response: SynthesizeResponse = self
            .downstream
            .post_json(&self.synthesize_url, &request)
            .await?;

        let audio = Base64::decode_vec(&response.audio_content).map_err(|_| {
            ClientError::InvalidResponse {
                capability: self.downstream.capability(),
                reason: "audioContent is not valid base64".to_string(),
            }
        })?;

        info!(
            language_code = %language_code,
            text_chars = text.chars().count(),
            audio_bytes = audio.len(),
            "Speech synthesized"
        );
        Ok(audio)
    }
}

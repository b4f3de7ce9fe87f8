// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cloud Translation (v2) client.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::downstream::Downstream;
use super::ClientError;

#[derive(Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Deserialize)]
struct TranslateResponse {
    data: TranslationList,
}

#[derive(Deserialize)]
struct TranslationList {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

#[derive(Clone)]
pub struct TranslationClient {
    downstream: Downstream,
    translate_url: String,
}

impl TranslationClient {
    pub(crate) fn new(downstream: Downstream, base_url: &str) -> Self {
        Self {
            downstream,
            translate_url: format!("{}/language/translate/v2", base_url.trim_end_matches('/')),
        }
    }

    pub(crate) fn downstream(&self) -> &Downstream {
        &self.downstream
    }

    /// Translate plain `text` from `source` to `target`.
    pub async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, ClientError> {
        let request = TranslateRequest {
            q: text,
            source,
            target,
            format: "text",
        };

        let response: TranslateResponse = self
            .downstream
            .post_json(&self.translate_url, &request)
            .await?;

        let translation = response
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| ClientError::InvalidResponse {
                capability: self.downstream.capability(),
                reason: "no translations returned".to_string(),
            })?;

        info!(source = %source, target = %target, "Text translated");
        Ok(translation)
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cloud Storage client: media upload, download and V4 signed URLs.
//!
//! ## Signed URLs
//!
//! URLs are signed with the `GOOG4-RSA-SHA256` scheme using the service
//! account key directly, so no extra API call is needed. Only the `host`
//! header is signed and the payload is `UNSIGNED-PAYLOAD`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use ring::digest::{digest, SHA256};
use tokio_util::io::ReaderStream;
use tracing::info;
use url::Url;

use super::downstream::Downstream;
use super::ClientError;
use crate::config::MAX_SIGNED_URL_TTL;

const SIGNING_ALGORITHM: &str = "GOOG4-RSA-SHA256";

/// Payload of an upload.
pub enum ObjectBody {
    Bytes(Vec<u8>),
    /// Streamed from an open file of known length.
    File { file: tokio::fs::File, len: u64 },
}

impl ObjectBody {
    fn len(&self) -> u64 {
        match self {
            ObjectBody::Bytes(bytes) => bytes.len() as u64,
            ObjectBody::File { len, .. } => *len,
        }
    }

    fn into_body(self) -> reqwest::Body {
        match self {
            ObjectBody::Bytes(bytes) => reqwest::Body::from(bytes),
            ObjectBody::File { file, .. } => reqwest::Body::wrap_stream(ReaderStream::new(file)),
        }
    }
}

/// A downloaded object.
#[derive(Debug)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Clone)]
pub struct StorageClient {
    downstream: Downstream,
    api_base: String,
    signed_url_base: Url,
    bucket: String,
}

impl StorageClient {
    pub(crate) fn new(
        downstream: Downstream,
        api_base: &str,
        signed_url_base: Url,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            downstream,
            api_base: api_base.trim_end_matches('/').to_string(),
            signed_url_base,
            bucket: bucket.into(),
        }
    }

    pub(crate) fn downstream(&self) -> &Downstream {
        &self.downstream
    }

    /// Upload `body` as object `name`.
    pub async fn store(
        &self,
        name: &str,
        body: ObjectBody,
        content_type: &str,
    ) -> Result<(), ClientError> {
        let url = format!("{}/upload/storage/v1/b/{}/o", self.api_base, self.bucket);
        let len = body.len();

        let request = self
            .downstream
            .http()
            .post(url)
            .query(&[("uploadType", "media"), ("name", name)])
            .header(CONTENT_TYPE, content_type)
            .header(CONTENT_LENGTH, len)
            .body(body.into_body());

        self.downstream.execute(request).await?;

        info!(bucket = %self.bucket, object = %name, bytes = len, "Object stored");
        Ok(())
    }

    /// Download object `name`.
    pub async fn retrieve(&self, name: &str) -> Result<StoredObject, ClientError> {
        let url = format!(
            "{}/storage/v1/b/{}/o/{}",
            self.api_base,
            self.bucket,
            percent_encode(name, false)
        );

        let request = self.downstream.http().get(url).query(&[("alt", "media")]);
        let response = self.downstream.execute(request).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::transport(self.downstream.capability(), e))?
            .to_vec();

        info!(bucket = %self.bucket, object = %name, bytes = bytes.len(), "Object retrieved");
        Ok(StoredObject {
            bytes,
            content_type,
        })
    }

    /// A V4 signed GET URL for `name`, valid for `ttl` (at most seven days).
    pub fn signed_url(&self, name: &str, ttl: Duration) -> Result<String, ClientError> {
        self.signed_url_at(name, ttl, Utc::now())
    }

    pub(crate) fn signed_url_at(
        &self,
        name: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, ClientError> {
        let identity = self.downstream.provider().identity();
        let ttl = ttl.min(MAX_SIGNED_URL_TTL).as_secs().max(1);

        let host = match (self.signed_url_base.host_str(), self.signed_url_base.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(ClientError::ClientUnavailable {
                    capability: self.downstream.capability(),
                    reason: "signed URL base has no host".to_string(),
                })
            }
        };

        let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
        let scope = format!("{}/auto/storage/goog4_request", now.format("%Y%m%d"));
        let credential = format!("{}/{scope}", identity.client_email());
        let resource = format!("/{}/{}", self.bucket, percent_encode(name, true));

        // Already in lexicographic order.
        let query = [
            ("X-Goog-Algorithm", SIGNING_ALGORITHM.to_string()),
            ("X-Goog-Credential", credential),
            ("X-Goog-Date", timestamp.clone()),
            ("X-Goog-Expires", ttl.to_string()),
            ("X-Goog-SignedHeaders", "host".to_string()),
        ]
        .iter()
        .map(|(k, v)| format!("{k}={}", percent_encode(v, false)))
        .collect::<Vec<_>>()
        .join("&");

        let canonical_request =
            format!("GET\n{resource}\n{query}\nhost:{host}\n\nhost\nUNSIGNED-PAYLOAD");
        let string_to_sign = format!(
            "{SIGNING_ALGORITHM}\n{timestamp}\n{scope}\n{}",
            hex::encode(digest(&SHA256, canonical_request.as_bytes()))
        );

        let signature = identity.sign_rsa_sha256(string_to_sign.as_bytes())?;

        Ok(format!(
            "{}://{host}{resource}?{query}&X-Goog-Signature={}",
            self.signed_url_base.scheme(),
            hex::encode(&signature)
        ))
    }
}

/// RFC 3986 percent-encoding of everything but unreserved characters.
fn percent_encode(input: &str, keep_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            b'/' if keep_slash => out.push('/'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

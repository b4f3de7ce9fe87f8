// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Capability Clients
//!
//! Typed clients for the Google Cloud APIs the gateway fronts.
//!
//! ## Capabilities
//!
//! - **Transcription**: Speech-to-Text `speech:recognize`
//! - **Synthesis**: Text-to-Speech `text:synthesize`
//! - **Translation**: Translation v2
//! - **Storage**: Cloud Storage media upload/download and V4 signed URLs
//!
//! ## Factory
//!
//! [`ClientFactory`] builds each client on first use and keeps it for the
//! life of the process. All clients share one `reqwest::Client` and one
//! [`CredentialProvider`], so a token fetched for one capability serves the
//! others.

pub mod downstream;
pub mod error;
pub mod speech;
pub mod storage;
pub mod synthesis;
pub mod translation;

use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

use url::Url;

use crate::auth::CredentialProvider;
use crate::config::Endpoints;

pub use downstream::Downstream;
pub use error::ClientError;
pub use speech::SpeechClient;
pub use storage::{ObjectBody, StorageClient, StoredObject};
pub use synthesis::SynthesisClient;
pub use translation::TranslationClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Transcription,
    Synthesis,
    Translation,
    Storage,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Transcription,
        Capability::Synthesis,
        Capability::Translation,
        Capability::Storage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Transcription => "transcription",
            Capability::Synthesis => "synthesis",
            Capability::Translation => "translation",
            Capability::Storage => "storage",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A client for one capability.
#[derive(Clone)]
pub enum Client {
    Transcription(SpeechClient),
    Synthesis(SynthesisClient),
    Translation(TranslationClient),
    Storage(StorageClient),
}

impl Client {
    pub fn capability(&self) -> Capability {
        self.downstream().capability()
    }

    pub fn provider(&self) -> &CredentialProvider {
        self.downstream().provider()
    }

    fn downstream(&self) -> &Downstream {
        match self {
            Client::Transcription(c) => c.downstream(),
            Client::Synthesis(c) => c.downstream(),
            Client::Translation(c) => c.downstream(),
            Client::Storage(c) => c.downstream(),
        }
    }
}

/// Build the HTTP client shared by token fetches and API calls.
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ClientError::ClientUnavailable {
            capability: Capability::Transcription,
            reason: format!("failed to build HTTP client: {e}"),
        })
}

/// Lazily built, process-wide capability clients.
pub struct ClientFactory {
    provider: CredentialProvider,
    http: reqwest::Client,
    endpoints: Endpoints,
    bucket: String,
    speech: OnceLock<SpeechClient>,
    synthesis: OnceLock<SynthesisClient>,
    translation: OnceLock<TranslationClient>,
    storage: OnceLock<StorageClient>,
}

impl ClientFactory {
    pub fn new(
        provider: CredentialProvider,
        http: reqwest::Client,
        endpoints: Endpoints,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            http,
            endpoints,
            bucket: bucket.into(),
            speech: OnceLock::new(),
            synthesis: OnceLock::new(),
            translation: OnceLock::new(),
            storage: OnceLock::new(),
        }
    }

    pub fn provider(&self) -> &CredentialProvider {
        &self.provider
    }

    /// The shared HTTP client, for unauthenticated fetches.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Get the client for `capability`, building it on first use.
    pub fn client(&self, capability: Capability) -> Result<Client, ClientError> {
        Ok(match capability {
            Capability::Transcription => Client::Transcription(self.speech()?),
            Capability::Synthesis => Client::Synthesis(self.synthesis()?),
            Capability::Translation => Client::Translation(self.translation()?),
            Capability::Storage => Client::Storage(self.storage()?),
        })
    }

    pub fn speech(&self) -> Result<SpeechClient, ClientError> {
        get_or_build(&self.speech, || {
            let base = self.base_url(Capability::Transcription, &self.endpoints.speech)?;
            Ok(SpeechClient::new(self.downstream(Capability::Transcription), base.as_str()))
        })
    }

    pub fn synthesis(&self) -> Result<SynthesisClient, ClientError> {
        get_or_build(&self.synthesis, || {
            let base = self.base_url(Capability::Synthesis, &self.endpoints.tts)?;
            Ok(SynthesisClient::new(self.downstream(Capability::Synthesis), base.as_str()))
        })
    }

    pub fn translation(&self) -> Result<TranslationClient, ClientError> {
        get_or_build(&self.translation, || {
            let base = self.base_url(Capability::Translation, &self.endpoints.translate)?;
            Ok(TranslationClient::new(
                self.downstream(Capability::Translation),
                base.as_str(),
            ))
        })
    }

    pub fn storage(&self) -> Result<StorageClient, ClientError> {
        get_or_build(&self.storage, || {
            let api = self.base_url(Capability::Storage, &self.endpoints.storage)?;
            let signed = self.base_url(Capability::Storage, &self.endpoints.signed_url_base)?;
            Ok(StorageClient::new(
                self.downstream(Capability::Storage),
                api.as_str(),
                signed,
                self.bucket.clone(),
            ))
        })
    }

    fn downstream(&self, capability: Capability) -> Downstream {
        Downstream::new(capability, self.http.clone(), self.provider.clone())
    }

    fn base_url(&self, capability: Capability, raw: &str) -> Result<Url, ClientError> {
        let url = Url::parse(raw).map_err(|e| ClientError::ClientUnavailable {
            capability,
            reason: format!("invalid endpoint '{raw}': {e}"),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::ClientUnavailable {
                capability,
                reason: format!("endpoint '{raw}' is not http(s)"),
            });
        }
        Ok(url)
    }
}

/// Return the cached client or build and cache one.
///
/// Two racing first callers may both build; only the first is kept.
fn get_or_build<T, F>(cell: &OnceLock<T>, build: F) -> Result<T, ClientError>
where
    T: Clone,
    F: FnOnce() -> Result<T, ClientError>,
{
    if let Some(client) = cell.get() {
        return Ok(client.clone());
    }
    let client = build()?;
    Ok(cell.get_or_init(|| client).clone())
}

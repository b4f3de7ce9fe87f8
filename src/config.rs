// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! [`GatewayConfig`] loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `3000` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `GATEWAY_CREDENTIAL_SOURCE` | `encrypted_blob` or `plain_key_file` | `encrypted_blob` |
//! | `GATEWAY_SECRET_PATH` | Sealed service-account blob | `keys/service-account.sealed` |
//! | `GATEWAY_SECRET_PASSPHRASE` | Passphrase for the sealed blob | Required for `encrypted_blob` |
//! | `GATEWAY_KEY_FILE` | Plain service-account JSON key | Required for `plain_key_file` |
//! | `GATEWAY_SERVICE_ACCOUNT_EMAIL` | Account email when the blob holds a bare PEM key | Optional |
//! | `GATEWAY_SCOPES` | Comma-separated OAuth2 scopes | `cloud-platform` |
//! | `GATEWAY_TOKEN_URI` | OAuth2 token endpoint override | key file's `token_uri`, then Google |
//! | `GATEWAY_STORAGE_BUCKET` | Cloud Storage bucket | Required |
//! | `GATEWAY_STORAGE_FOLDER` | Object prefix for uploads | `APIstorage` |
//! | `GATEWAY_UPLOAD_BUFFERING` | `memory` or `disk` | `memory` |
//! | `GATEWAY_UPLOAD_DIR` | Directory for disk-buffered uploads | OS temp dir |
//! | `GATEWAY_MAX_UPLOAD_BYTES` | Request body limit | `26214400` |
//! | `GATEWAY_SYNTHESIZE_DELIVERY` | `inline` or `signed_url` | `signed_url` |
//! | `GATEWAY_SIGNED_URL_TTL_SECS` | Signed URL lifetime (max 7 days) | `604800` |
//! | `GATEWAY_DOWNSTREAM_TIMEOUT_SECS` | Timeout for every outbound call | `30` |
//! | `GATEWAY_DEFAULT_LANGUAGE` | Language used when a request omits one | `en-US` |
//! | `GATEWAY_SPEECH_URL` | Speech-to-Text base URL | `https://speech.googleapis.com` |
//! | `GATEWAY_TTS_URL` | Text-to-Speech base URL | `https://texttospeech.googleapis.com` |
//! | `GATEWAY_TRANSLATE_URL` | Translation base URL | `https://translation.googleapis.com` |
//! | `GATEWAY_STORAGE_URL` | Cloud Storage JSON API base URL | `https://storage.googleapis.com` |
//! | `GATEWAY_SIGNED_URL_BASE` | Host used in signed URLs | `https://storage.googleapis.com` |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const CREDENTIAL_SOURCE_ENV: &str = "GATEWAY_CREDENTIAL_SOURCE";
pub const SECRET_PATH_ENV: &str = "GATEWAY_SECRET_PATH";
/// Never logged, never echoed back.
pub const SECRET_PASSPHRASE_ENV: &str = "GATEWAY_SECRET_PASSPHRASE";
pub const KEY_FILE_ENV: &str = "GATEWAY_KEY_FILE";
pub const SERVICE_ACCOUNT_EMAIL_ENV: &str = "GATEWAY_SERVICE_ACCOUNT_EMAIL";
pub const SCOPES_ENV: &str = "GATEWAY_SCOPES";
pub const TOKEN_URI_ENV: &str = "GATEWAY_TOKEN_URI";
pub const STORAGE_BUCKET_ENV: &str = "GATEWAY_STORAGE_BUCKET";
pub const STORAGE_FOLDER_ENV: &str = "GATEWAY_STORAGE_FOLDER";
pub const UPLOAD_BUFFERING_ENV: &str = "GATEWAY_UPLOAD_BUFFERING";
pub const UPLOAD_DIR_ENV: &str = "GATEWAY_UPLOAD_DIR";
pub const MAX_UPLOAD_BYTES_ENV: &str = "GATEWAY_MAX_UPLOAD_BYTES";
pub const SYNTHESIZE_DELIVERY_ENV: &str = "GATEWAY_SYNTHESIZE_DELIVERY";
pub const SIGNED_URL_TTL_ENV: &str = "GATEWAY_SIGNED_URL_TTL_SECS";
pub const DOWNSTREAM_TIMEOUT_ENV: &str = "GATEWAY_DOWNSTREAM_TIMEOUT_SECS";
pub const DEFAULT_LANGUAGE_ENV: &str = "GATEWAY_DEFAULT_LANGUAGE";
pub const SPEECH_URL_ENV: &str = "GATEWAY_SPEECH_URL";
pub const TTS_URL_ENV: &str = "GATEWAY_TTS_URL";
pub const TRANSLATE_URL_ENV: &str = "GATEWAY_TRANSLATE_URL";
pub const STORAGE_URL_ENV: &str = "GATEWAY_STORAGE_URL";
pub const SIGNED_URL_BASE_ENV: &str = "GATEWAY_SIGNED_URL_BASE";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SECRET_PATH: &str = "keys/service-account.sealed";
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_STORAGE_FOLDER: &str = "APIstorage";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
pub const DEFAULT_DOWNSTREAM_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// V4 signed URLs cannot outlive seven days.
pub const MAX_SIGNED_URL_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub const DEFAULT_SPEECH_URL: &str = "https://speech.googleapis.com";
pub const DEFAULT_TTS_URL: &str = "https://texttospeech.googleapis.com";
pub const DEFAULT_TRANSLATE_URL: &str = "https://translation.googleapis.com";
pub const DEFAULT_STORAGE_URL: &str = "https://storage.googleapis.com";

/// Configuration errors raised while reading the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required configuration {0} is missing")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Where multipart uploads are held while a request is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadBuffering {
    #[default]
    Memory,
    Disk,
}

/// How `/synthesize` hands the audio back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SynthesizeDelivery {
    /// Raw `audio/mpeg` bytes in the response body.
    Inline,
    /// Upload to the bucket and return a time-limited signed link.
    #[default]
    SignedUrl,
}

/// Where the service-account key comes from.
pub enum CredentialSource {
    EncryptedBlob {
        path: PathBuf,
        passphrase: SecretString,
    },
    PlainKeyFile {
        path: PathBuf,
    },
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::EncryptedBlob { path, .. } => f
                .debug_struct("EncryptedBlob")
                .field("path", path)
                .field("passphrase", &"[REDACTED]")
                .finish(),
            CredentialSource::PlainKeyFile { path } => {
                f.debug_struct("PlainKeyFile").field("path", path).finish()
            }
        }
    }
}

/// Base URLs of the downstream APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub speech: String,
    pub tts: String,
    pub translate: String,
    pub storage: String,
    pub signed_url_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            speech: DEFAULT_SPEECH_URL.to_string(),
            tts: DEFAULT_TTS_URL.to_string(),
            translate: DEFAULT_TRANSLATE_URL.to_string(),
            storage: DEFAULT_STORAGE_URL.to_string(),
            signed_url_base: DEFAULT_STORAGE_URL.to_string(),
        }
    }
}

/// Everything the gateway reads from its environment.
#[derive(Debug)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub credential_source: CredentialSource,
    pub service_account_email: Option<String>,
    pub scopes: Vec<String>,
    /// Overrides the key document's `token_uri` when set.
    pub token_uri: Option<String>,
    pub storage_bucket: String,
    pub storage_folder: String,
    pub upload_buffering: UploadBuffering,
    pub upload_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
    pub synthesize_delivery: SynthesizeDelivery,
    pub signed_url_ttl: Duration,
    pub downstream_timeout: Duration,
    pub default_language: String,
    pub endpoints: Endpoints,
}

impl GatewayConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let credential_source = match get(CREDENTIAL_SOURCE_ENV).as_deref() {
            None | Some("encrypted_blob") => CredentialSource::EncryptedBlob {
                path: get(SECRET_PATH_ENV)
                    .unwrap_or_else(|| DEFAULT_SECRET_PATH.to_string())
                    .into(),
                // Passphrases are taken verbatim; only blank ones are rejected.
                passphrase: lookup(SECRET_PASSPHRASE_ENV)
                    .filter(|v| !v.trim().is_empty())
                    .map(SecretString::from)
                    .ok_or(ConfigError::Missing(SECRET_PASSPHRASE_ENV))?,
            },
            Some("plain_key_file") => CredentialSource::PlainKeyFile {
                path: get(KEY_FILE_ENV)
                    .ok_or(ConfigError::Missing(KEY_FILE_ENV))?
                    .into(),
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: CREDENTIAL_SOURCE_ENV,
                    reason: format!("unknown credential source '{other}'"),
                })
            }
        };

        let upload_buffering = match get(UPLOAD_BUFFERING_ENV).as_deref() {
            None | Some("memory") => UploadBuffering::Memory,
            Some("disk") => UploadBuffering::Disk,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: UPLOAD_BUFFERING_ENV,
                    reason: format!("expected 'memory' or 'disk', got '{other}'"),
                })
            }
        };

        let synthesize_delivery = match get(SYNTHESIZE_DELIVERY_ENV).as_deref() {
            None | Some("signed_url") => SynthesizeDelivery::SignedUrl,
            Some("inline") => SynthesizeDelivery::Inline,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: SYNTHESIZE_DELIVERY_ENV,
                    reason: format!("expected 'inline' or 'signed_url', got '{other}'"),
                })
            }
        };

        let scopes: Vec<String> = get(SCOPES_ENV)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_else(|| vec![DEFAULT_SCOPE.to_string()]);
        if scopes.is_empty() {
            return Err(ConfigError::Invalid {
                name: SCOPES_ENV,
                reason: "at least one scope is required".to_string(),
            });
        }

        let signed_url_ttl = Duration::from_secs(parse_or(
            &get,
            SIGNED_URL_TTL_ENV,
            MAX_SIGNED_URL_TTL.as_secs(),
        )?);
        if signed_url_ttl.is_zero() || signed_url_ttl > MAX_SIGNED_URL_TTL {
            return Err(ConfigError::Invalid {
                name: SIGNED_URL_TTL_ENV,
                reason: format!("must be between 1 and {}", MAX_SIGNED_URL_TTL.as_secs()),
            });
        }

        let downstream_timeout = Duration::from_secs(parse_or(
            &get,
            DOWNSTREAM_TIMEOUT_ENV,
            DEFAULT_DOWNSTREAM_TIMEOUT.as_secs(),
        )?);
        if downstream_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                name: DOWNSTREAM_TIMEOUT_ENV,
                reason: "must be greater than zero".to_string(),
            });
        }

        let storage_url = get(STORAGE_URL_ENV).unwrap_or_else(|| DEFAULT_STORAGE_URL.to_string());
        let endpoints = Endpoints {
            speech: get(SPEECH_URL_ENV).unwrap_or_else(|| DEFAULT_SPEECH_URL.to_string()),
            tts: get(TTS_URL_ENV).unwrap_or_else(|| DEFAULT_TTS_URL.to_string()),
            translate: get(TRANSLATE_URL_ENV).unwrap_or_else(|| DEFAULT_TRANSLATE_URL.to_string()),
            signed_url_base: get(SIGNED_URL_BASE_ENV).unwrap_or_else(|| storage_url.clone()),
            storage: storage_url,
        };

        Ok(Self {
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&get, PORT_ENV, DEFAULT_PORT)?,
            credential_source,
            service_account_email: get(SERVICE_ACCOUNT_EMAIL_ENV),
            scopes,
            token_uri: get(TOKEN_URI_ENV),
            storage_bucket: get(STORAGE_BUCKET_ENV)
                .ok_or(ConfigError::Missing(STORAGE_BUCKET_ENV))?,
            storage_folder: get(STORAGE_FOLDER_ENV)
                .map(|f| f.trim_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_STORAGE_FOLDER.to_string()),
            upload_buffering,
            upload_dir: get(UPLOAD_DIR_ENV).map(PathBuf::from),
            max_upload_bytes: parse_or(&get, MAX_UPLOAD_BYTES_ENV, DEFAULT_MAX_UPLOAD_BYTES)?,
            synthesize_delivery,
            signed_url_ttl,
            downstream_timeout,
            default_language: get(DEFAULT_LANGUAGE_ENV)
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            endpoints,
        })
    }

    /// `host:port` string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reading service-account material from disk.

use std::fs;
use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{envelope, SecretError, SecretResult};
use crate::config::CredentialSource;

/// A Google service-account key document.
#[derive(Debug)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: SecretString,
    pub token_uri: Option<String>,
    pub project_id: Option<String>,
    pub private_key_id: Option<String>,
}

#[derive(Deserialize)]
struct RawServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    private_key_id: Option<String>,
}

/// Plaintext recovered from the secret store.
#[derive(Debug)]
pub enum DecryptedSecret {
    /// A full service-account JSON document.
    ServiceAccount(ServiceAccountKey),
    /// A bare PEM private key; the account email comes from configuration.
    PrivateKeyPem(SecretString),
}

/// Read and decrypt the sealed blob at `path`.
pub fn load(path: &Path, passphrase: &SecretString) -> SecretResult<DecryptedSecret> {
    let encoded = read_text(path)?;
    let plaintext = envelope::open(&encoded, passphrase.expose_secret())?;
    interpret(plaintext)
}

/// Read an unencrypted service-account JSON key.
pub fn load_plain_key_file(path: &Path) -> SecretResult<DecryptedSecret> {
    let text = SecretString::from(read_text(path)?);
    parse_service_account(text.expose_secret()).map(DecryptedSecret::ServiceAccount)
}

/// Load the secret from whichever source the gateway is configured with.
pub fn load_from_source(source: &CredentialSource) -> SecretResult<DecryptedSecret> {
    match source {
        CredentialSource::EncryptedBlob { path, passphrase } => load(path, passphrase),
        CredentialSource::PlainKeyFile { path } => load_plain_key_file(path),
    }
}

fn read_text(path: &Path) -> SecretResult<String> {
    fs::read_to_string(path).map_err(|source| SecretError::SecretUnreadable {
        path: path.to_path_buf(),
        source,
    })
}

fn interpret(plaintext: Vec<u8>) -> SecretResult<DecryptedSecret> {
    let text = SecretString::from(
        String::from_utf8(plaintext)
            .map_err(|_| SecretError::SecretMalformed("plaintext is not UTF-8".to_string()))?,
    );
    let trimmed = text.expose_secret().trim();

    if trimmed.starts_with('{') {
        return parse_service_account(trimmed).map(DecryptedSecret::ServiceAccount);
    }

    if trimmed.starts_with("-----BEGIN") {
        let normalized = normalize_pem(trimmed);
        pem::parse(&normalized).map_err(|_| {
            SecretError::SecretMalformed("private key is not a valid PEM block".to_string())
        })?;
        return Ok(DecryptedSecret::PrivateKeyPem(SecretString::from(normalized)));
    }

    Err(SecretError::SecretMalformed(
        "plaintext is neither a service-account document nor a PEM key".to_string(),
    ))
}

fn parse_service_account(text: &str) -> SecretResult<ServiceAccountKey> {
    // serde_json messages can quote input values, so only the position is kept.
    let raw: RawServiceAccountKey = serde_json::from_str(text).map_err(|e| {
        SecretError::SecretMalformed(format!(
            "invalid service-account document (line {}, column {})",
            e.line(),
            e.column()
        ))
    })?;

    if raw.client_email.trim().is_empty() {
        return Err(SecretError::SecretMalformed(
            "client_email is empty".to_string(),
        ));
    }
    if raw.private_key.trim().is_empty() {
        return Err(SecretError::SecretMalformed(
            "private_key is empty".to_string(),
        ));
    }

    Ok(ServiceAccountKey {
        client_email: raw.client_email.trim().to_string(),
        private_key: SecretString::from(normalize_pem(&raw.private_key)),
        token_uri: raw.token_uri,
        project_id: raw.project_id,
        private_key_id: raw.private_key_id,
    })
}

/// Keys pasted through env files often carry literal `\n` sequences.
fn normalize_pem(pem: &str) -> String {
    pem.replace("\\n", "\n").trim().to_string()
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The fixed service identity the gateway authenticates as.

use std::fmt;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use ring::rand::SystemRandom;
use ring::signature::{RsaKeyPair, RSA_PKCS1_SHA256};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::error::AuthError;
use crate::config::{GatewayConfig, DEFAULT_TOKEN_URI};
use crate::secrets::{DecryptedSecret, SecretError};

/// Lifetime requested for each JWT assertion (Google's maximum).
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Errors while assembling the identity from decrypted material.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Service account email, private key, scopes and token endpoint.
///
/// The private key is parsed once into the two forms it is used in: a
/// `jsonwebtoken` key for RS256 assertions and a `ring` key pair for signed
/// storage URLs. The PEM text itself is not retained.
pub struct ServiceIdentity {
    client_email: String,
    key_id: Option<String>,
    scopes: Vec<String>,
    token_uri: String,
    encoding_key: EncodingKey,
    key_pair: RsaKeyPair,
}

impl ServiceIdentity {
    /// Build an identity from an email and a PEM private key.
    pub fn new(
        client_email: impl Into<String>,
        private_key: &SecretString,
        scopes: Vec<String>,
        token_uri: impl Into<String>,
    ) -> Result<Self, AuthError> {
        let pem_text = private_key.expose_secret();

        let encoding_key = EncodingKey::from_rsa_pem(pem_text.as_bytes())
            .map_err(|e| AuthError::InvalidKey(format!("not an RSA PEM key: {e}")))?;

        let block = pem::parse(pem_text)
            .map_err(|_| AuthError::InvalidKey("not a PEM block".to_string()))?;
        let key_pair = match block.tag() {
            "PRIVATE KEY" => RsaKeyPair::from_pkcs8(block.contents()),
            "RSA PRIVATE KEY" => RsaKeyPair::from_der(block.contents()),
            other => {
                return Err(AuthError::InvalidKey(format!(
                    "unsupported PEM block '{other}'"
                )))
            }
        }
        .map_err(|e| AuthError::InvalidKey(format!("RSA key rejected: {e}")))?;

        Ok(Self {
            client_email: client_email.into(),
            key_id: None,
            scopes,
            token_uri: token_uri.into(),
            encoding_key,
            key_pair,
        })
    }

    /// Combine decrypted secret material with the gateway configuration.
    ///
    /// A bare PEM key needs `GATEWAY_SERVICE_ACCOUNT_EMAIL`. The configured
    /// token endpoint wins over the one in the key document.
    pub fn from_secret(
        secret: DecryptedSecret,
        config: &GatewayConfig,
    ) -> Result<Self, IdentityError> {
        match secret {
            DecryptedSecret::ServiceAccount(key) => {
                let token_uri = config
                    .token_uri
                    .clone()
                    .or(key.token_uri)
                    .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());
                let mut identity = Self::new(
                    key.client_email,
                    &key.private_key,
                    config.scopes.clone(),
                    token_uri,
                )?;
                identity.key_id = key.private_key_id;
                Ok(identity)
            }
            DecryptedSecret::PrivateKeyPem(pem) => {
                let email = config.service_account_email.clone().ok_or_else(|| {
                    SecretError::SecretMalformed(
                        "bare PEM key requires GATEWAY_SERVICE_ACCOUNT_EMAIL".to_string(),
                    )
                })?;
                let token_uri = config
                    .token_uri
                    .clone()
                    .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());
                Ok(Self::new(email, &pem, config.scopes.clone(), token_uri)?)
            }
        }
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    /// Sign an OAuth2 JWT-bearer assertion issued at `now` (unix seconds).
    pub fn assertion(&self, now: i64) -> Result<String, AuthError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();

        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: self.scopes.join(" "),
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        jsonwebtoken::encode(&header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// RSASSA-PKCS1-v1_5 SHA-256 signature over `message`.
    pub fn sign_rsa_sha256(&self, message: &[u8]) -> Result<Vec<u8>, AuthError> {
        let rng = SystemRandom::new();
        let mut signature = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(&RSA_PKCS1_SHA256, &rng, message, &mut signature)
            .map_err(|_| AuthError::Signing("RSA signing failed".to_string()))?;
        Ok(signature)
    }

    /// DER-encoded RSA public key, for verifying signatures in tests.
    #[cfg(test)]
    pub(crate) fn public_key_der(&self) -> Vec<u8> {
        self.key_pair.public().as_ref().to_vec()
    }
}

impl fmt::Debug for ServiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceIdentity")
            .field("client_email", &self.client_email)
            .field("scopes", &self.scopes)
            .field("token_uri", &self.token_uri)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

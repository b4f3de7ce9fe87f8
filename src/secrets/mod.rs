// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Secret Store
//!
//! Loads the service-account key the gateway authenticates with.
//!
//! ## Sources
//!
//! - **Encrypted blob**: a base64 text file holding a sealed envelope
//!   (PBKDF2-HMAC-SHA256 key derivation, AES-256-GCM with a random nonce).
//!   Produced offline with the `seal-secret` binary.
//! - **Plain key file**: an unencrypted service-account JSON document.
//!
//! ## Security
//!
//! - Decrypted material only lives in memory, wrapped in `SecretString`
//! - Nothing is written back to disk
//! - The passphrase is never logged

pub mod envelope;
pub mod loader;

use std::io;
use std::path::PathBuf;

pub use envelope::{
    open, seal, seal_with_iterations, DEFAULT_ITERATIONS, MAX_ITERATIONS, MIN_ITERATIONS,
};
pub use loader::{load, load_from_source, load_plain_key_file, DecryptedSecret, ServiceAccountKey};

/// Errors raised while reading or decrypting the service-account secret.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret at {path} is unreadable: {source}")]
    SecretUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("secret decryption failed: {0}")]
    DecryptionFailed(&'static str),

    #[error("decrypted secret is malformed: {0}")]
    SecretMalformed(String),

    #[error("sealing failed: {0}")]
    SealFailed(&'static str),
}

pub type SecretResult<T> = Result<T, SecretError>;

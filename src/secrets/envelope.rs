// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Passphrase-sealed envelopes.
//!
//! ## Layout
//!
//! ```text
//! magic   "SGB1"        4 bytes
//! iters   u32 BE        4 bytes   PBKDF2-HMAC-SHA256 iteration count
//! salt                  16 bytes
//! nonce                 12 bytes  AES-256-GCM nonce
//! body                  rest      ciphertext || 16-byte tag
//! ```
//!
//! The whole 36-byte header is the AEAD associated data, so changing the
//! iteration count, salt or magic makes decryption fail. The envelope is
//! stored as standard base64 text.

use std::num::NonZeroU32;

use base64ct::{Base64, Encoding};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};

use super::{SecretError, SecretResult};

const MAGIC: &[u8; 4] = b"SGB1";
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;
const TAG_LEN: usize = 16;
const HEADER_LEN: usize = MAGIC.len() + 4 + SALT_LEN + NONCE_LEN;

/// Iterations used by [`seal`].
pub const DEFAULT_ITERATIONS: u32 = 600_000;

/// Envelopes declaring fewer iterations are rejected outright.
pub const MIN_ITERATIONS: u32 = 1_000;

/// Envelopes declaring more iterations are rejected before key derivation.
pub const MAX_ITERATIONS: u32 = 10 * DEFAULT_ITERATIONS;

/// Seal `plaintext` under `passphrase` with [`DEFAULT_ITERATIONS`].
pub fn seal(plaintext: &[u8], passphrase: &str) -> SecretResult<String> {
    seal_with_iterations(plaintext, passphrase, DEFAULT_ITERATIONS)
}

/// Seal `plaintext` with an explicit PBKDF2 iteration count.
///
/// A fresh salt and nonce are drawn for every call.
pub fn seal_with_iterations(
    plaintext: &[u8],
    passphrase: &str,
    iterations: u32,
) -> SecretResult<String> {
    if passphrase.is_empty() {
        return Err(SecretError::SealFailed("passphrase is empty"));
    }
    if iterations < MIN_ITERATIONS {
        return Err(SecretError::SealFailed("iteration count is below the minimum"));
    }
    if iterations > MAX_ITERATIONS {
        return Err(SecretError::SealFailed("iteration count is above the maximum"));
    }

    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    rng.fill(&mut salt)
        .map_err(|_| SecretError::SealFailed("system randomness unavailable"))?;
    rng.fill(&mut nonce)
        .map_err(|_| SecretError::SealFailed("system randomness unavailable"))?;

    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(MAGIC);
    header.extend_from_slice(&iterations.to_be_bytes());
    header.extend_from_slice(&salt);
    header.extend_from_slice(&nonce);

    let key = derive_key(passphrase, &salt, iterations)
        .map_err(|_| SecretError::SealFailed("key derivation failed"))?;

    let mut body = plaintext.to_vec();
    key.seal_in_place_append_tag(
        Nonce::assume_unique_for_key(nonce),
        Aad::from(header.as_slice()),
        &mut body,
    )
    .map_err(|_| SecretError::SealFailed("encryption failed"))?;

    header.extend_from_slice(&body);
    Ok(Base64::encode_string(&header))
}

/// Open a sealed envelope, returning the original plaintext.
///
/// Whitespace anywhere in `encoded` is ignored so wrapped files load.
pub fn open(encoded: &str, passphrase: &str) -> SecretResult<Vec<u8>> {
    if passphrase.is_empty() {
        return Err(SecretError::DecryptionFailed("passphrase is empty"));
    }

    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let bytes = Base64::decode_vec(&compact)
        .map_err(|_| SecretError::DecryptionFailed("blob is not valid base64"))?;

    if bytes.len() < HEADER_LEN + TAG_LEN {
        return Err(SecretError::DecryptionFailed("blob is truncated"));
    }
    if &bytes[..MAGIC.len()] != MAGIC {
        return Err(SecretError::DecryptionFailed("blob has an unknown format"));
    }

    let mut iter_bytes = [0u8; 4];
    iter_bytes.copy_from_slice(&bytes[4..8]);
    let iterations = u32::from_be_bytes(iter_bytes);
    if iterations < MIN_ITERATIONS {
        return Err(SecretError::DecryptionFailed("blob declares too few iterations"));
    }
    if iterations > MAX_ITERATIONS {
        return Err(SecretError::DecryptionFailed("blob declares too many iterations"));
    }

    let salt = &bytes[8..8 + SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&bytes[8 + SALT_LEN..HEADER_LEN]);

    let key = derive_key(passphrase, salt, iterations)
        .map_err(|_| SecretError::DecryptionFailed("key derivation failed"))?;

    let (header, body) = bytes.split_at(HEADER_LEN);
    let mut body = body.to_vec();
    let plaintext = key
        .open_in_place(
            Nonce::assume_unique_for_key(nonce),
            Aad::from(header),
            &mut body,
        )
        .map_err(|_| SecretError::DecryptionFailed("wrong passphrase or corrupted blob"))?;

    Ok(plaintext.to_vec())
}

fn derive_key(
    passphrase: &str,
    salt: &[u8],
    iterations: u32,
) -> Result<LessSafeKey, ring::error::Unspecified> {
    let iterations = NonZeroU32::new(iterations).ok_or(ring::error::Unspecified)?;
    let mut key = [0u8; KEY_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        salt,
        passphrase.as_bytes(),
        &mut key,
    );
    let unbound = UnboundKey::new(&AES_256_GCM, &key)?;
    key.fill(0);
    Ok(LessSafeKey::new(unbound))
}

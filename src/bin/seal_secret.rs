// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Seal a service-account key for the gateway.
//!
//! ```text
//! GATEWAY_SECRET_PASSPHRASE=... seal-secret <plaintext-file> <output-file>
//! ```
//!
//! The output is the base64 envelope read back at startup from
//! `GATEWAY_SECRET_PATH`.

use std::fs;
use std::process::ExitCode;

use cloud_speech_gateway::config::SECRET_PASSPHRASE_ENV;
use cloud_speech_gateway::secrets::{open, seal, SecretError};
use secrecy::{ExposeSecret, SecretString};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        let program = args.first().map(String::as_str).unwrap_or("seal-secret");
        eprintln!("Usage: {program} <plaintext-file> <output-file>");
        eprintln!("\nThe passphrase is read from {SECRET_PASSPHRASE_ENV}.");
        return ExitCode::from(2);
    }

    let passphrase = match std::env::var(SECRET_PASSPHRASE_ENV) {
        Ok(value) if !value.is_empty() => SecretString::from(value),
        _ => {
            eprintln!("error: {SECRET_PASSPHRASE_ENV} is not set");
            return ExitCode::FAILURE;
        }
    };

    let plaintext = match fs::read(&args[1]) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("error: cannot read {}: {e}", args[1]);
            return ExitCode::FAILURE;
        }
    };

    let sealed = match seal_and_verify(&plaintext, &passphrase) {
        Ok(sealed) => sealed,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = fs::write(&args[2], format!("{sealed}\n")) {
        eprintln!("error: cannot write {}: {e}", args[2]);
        return ExitCode::FAILURE;
    }

    println!("Sealed {} bytes into {}", plaintext.len(), args[2]);
    ExitCode::SUCCESS
}

fn seal_and_verify(plaintext: &[u8], passphrase: &SecretString) -> Result<String, SecretError> {
    let sealed = seal(plaintext, passphrase.expose_secret())?;
    let reopened = open(&sealed, passphrase.expose_secret())?;
    if reopened != plaintext {
        return Err(SecretError::SealFailed("envelope did not round-trip"));
    }
    Ok(sealed)
}

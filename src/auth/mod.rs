// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Outbound authentication of the gateway against Google Cloud APIs.
//!
//! ## Auth Flow
//!
//! 1. The secret store yields a service-account key
//! 2. [`ServiceIdentity`] parses it once (RS256 signer + RSA key pair)
//! 3. [`CredentialProvider`] signs a JWT assertion and exchanges it at the
//!    token endpoint for a bearer token
//! 4. Downstream clients attach `Authorization: Bearer <token>` to each call
//!
//! ## Security
//!
//! - Exactly one identity per process, never rotated
//! - Key material and tokens are redacted from `Debug` output
//! - Token endpoint error bodies are reduced to the OAuth2 error fields

pub mod error;
pub mod identity;
pub mod provider;

pub use error::AuthError;
pub use identity::{IdentityError, ServiceIdentity};
pub use provider::{AccessToken, CredentialProvider};

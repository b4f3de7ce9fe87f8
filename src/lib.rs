// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cloud Speech Gateway - HTTP façade for Google Cloud speech services
//!
//! Forwards transcription, speech synthesis, translation and file storage
//! requests to Google Cloud APIs, authenticating as a single service account
//! whose key is sealed on disk and opened at startup.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Service identity and access token provider
//! - `clients` - Typed clients for each Google API
//! - `lifecycle` - Startup state machine and bootstrap
//! - `secrets` - Sealed secret envelope and key loading
//! - `telemetry` - Tracing subscriber setup

pub mod api;
pub mod auth;
pub mod clients;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod secrets;
pub mod state;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

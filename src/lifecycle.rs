// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Startup Lifecycle
//!
//! ```text
//! Uninitialized -> SecretLoaded -> CredentialReady -> Serving
//! ```
//!
//! Transitions are strictly forward and happen once. [`bootstrap`] performs
//! the first three; the binary advances to `Serving` only after the listener
//! is bound. A failure at any step leaves the state where it stopped.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::auth::{AuthError, CredentialProvider, IdentityError, ServiceIdentity};
use crate::clients::{build_http_client, ClientError, ClientFactory};
use crate::config::{ConfigError, GatewayConfig};
use crate::secrets::{load_from_source, SecretError};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LifecycleState {
    Uninitialized = 0,
    SecretLoaded = 1,
    CredentialReady = 2,
    Serving = 3,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LifecycleState::SecretLoaded,
            2 => LifecycleState::CredentialReady,
            3 => LifecycleState::Serving,
            _ => LifecycleState::Uninitialized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::SecretLoaded => "secret_loaded",
            LifecycleState::CredentialReady => "credential_ready",
            LifecycleState::Serving => "serving",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid lifecycle transition {from} -> {to}")]
pub struct TransitionError {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

/// Current lifecycle state, shared between bootstrap, `main` and health checks.
#[derive(Debug)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Uninitialized as u8),
        }
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_serving(&self) -> bool {
        self.state() == LifecycleState::Serving
    }

    /// Move to `next`, which must be the immediate successor of the current state.
    pub fn advance(&self, next: LifecycleState) -> Result<(), TransitionError> {
        let expected = (next as u8).wrapping_sub(1);
        self.state
            .compare_exchange(expected, next as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| info!(state = %next, "Lifecycle advanced"))
            .map_err(|current| TransitionError {
                from: LifecycleState::from_u8(current),
                to: next,
            })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("secret store error: {0}")]
    Secret(#[from] SecretError),

    #[error("credential error: {0}")]
    Auth(#[from] AuthError),

    #[error("client setup error: {0}")]
    Client(#[from] ClientError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("startup task failed: {0}")]
    Task(String),
}

impl From<IdentityError> for BootError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::Secret(e) => BootError::Secret(e),
            IdentityError::Auth(e) => BootError::Auth(e),
        }
    }
}

/// Load the secret, build the credential provider and client factory.
///
/// On success `lifecycle` is at `CredentialReady` and a first access token
/// has been fetched, so a bad or revoked key fails startup.
pub async fn bootstrap(
    config: GatewayConfig,
    lifecycle: Arc<Lifecycle>,
) -> Result<AppState, BootError> {
    let config = Arc::new(config);

    // PBKDF2 blocks; run it on the blocking pool.
    let loader_config = config.clone();
    let secret =
        tokio::task::spawn_blocking(move || load_from_source(&loader_config.credential_source))
            .await
            .map_err(|e| BootError::Task(e.to_string()))??;
    lifecycle.advance(LifecycleState::SecretLoaded)?;

    let identity = ServiceIdentity::from_secret(secret, &config)?;
    info!(
        client_email = %identity.client_email(),
        scopes = ?identity.scopes(),
        "Service identity loaded"
    );

    let http = build_http_client(config.downstream_timeout)?;
    let provider = CredentialProvider::new(identity, http.clone());
    provider.token().await?;
    lifecycle.advance(LifecycleState::CredentialReady)?;

    let clients = ClientFactory::new(
        provider,
        http,
        config.endpoints.clone(),
        config.storage_bucket.clone(),
    );

    Ok(AppState::new(config, clients, lifecycle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::Capability;
    use crate::secrets::{seal_with_iterations, MIN_ITERATIONS};
    use crate::testing::{
        service_account_json, write_sealed_key, FakeGoogle, TEST_EMAIL, TEST_PASSPHRASE, TEST_PEM,
    };
    use tempfile::TempDir;

    #[test]
    fn transitions_are_strictly_forward() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);

        let err = lifecycle.advance(LifecycleState::CredentialReady).unwrap_err();
        assert_eq!(err.from, LifecycleState::Uninitialized);

        lifecycle.advance(LifecycleState::SecretLoaded).unwrap();
        lifecycle.advance(LifecycleState::CredentialReady).unwrap();
        assert!(lifecycle.advance(LifecycleState::SecretLoaded).is_err());
        assert!(lifecycle.advance(LifecycleState::CredentialReady).is_err());
        lifecycle.advance(LifecycleState::Serving).unwrap();
        assert!(lifecycle.is_serving());
        assert!(lifecycle.advance(LifecycleState::Serving).is_err());
    }

    #[test]
    fn uninitialized_cannot_be_reentered() {
        let lifecycle = Lifecycle::new();
        assert!(lifecycle.advance(LifecycleState::Uninitialized).is_err());
    }

    #[tokio::test]
    async fn missing_secret_never_reaches_serving() {
        let fake = FakeGoogle::start().await;
        let config = fake.config(&[("GATEWAY_SECRET_PATH", "/nonexistent/service-account.sealed")]);
        let lifecycle = Arc::new(Lifecycle::new());

        let err = bootstrap(config, lifecycle.clone()).await.err().unwrap();

        assert!(matches!(err, BootError::Secret(SecretError::SecretUnreadable { .. })));
        assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);
        assert_eq!(fake.token_requests(), 0);
    }

    #[tokio::test]
    async fn wrong_passphrase_fails_boot() {
        let fake = FakeGoogle::start().await;
        let dir = TempDir::new().unwrap();
        let blob = write_sealed_key(dir.path());
        let config = fake.config(&[
            ("GATEWAY_SECRET_PATH", blob.to_str().unwrap()),
            ("GATEWAY_SECRET_PASSPHRASE", "not the passphrase"),
        ]);
        let lifecycle = Arc::new(Lifecycle::new());

        let err = bootstrap(config, lifecycle.clone()).await.err().unwrap();

        assert!(matches!(err, BootError::Secret(SecretError::DecryptionFailed(_))));
        assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);
    }

    #[tokio::test]
    async fn valid_secret_reaches_credential_ready() {
        let fake = FakeGoogle::start().await;
        let dir = TempDir::new().unwrap();
        let blob = write_sealed_key(dir.path());
        let config = fake.config(&[("GATEWAY_SECRET_PATH", blob.to_str().unwrap())]);
        let lifecycle = Arc::new(Lifecycle::new());

        let state = bootstrap(config, lifecycle.clone()).await.unwrap();

        assert_eq!(lifecycle.state(), LifecycleState::CredentialReady);
        assert_eq!(fake.token_requests(), 1);
        assert_eq!(state.clients.provider().identity().client_email(), TEST_EMAIL);

        lifecycle.advance(LifecycleState::Serving).unwrap();
        for capability in Capability::ALL {
            state.clients.client(capability).unwrap();
        }
        assert!(state.lifecycle.is_serving());
        assert_eq!(fake.token_requests(), 1);
    }

    #[tokio::test]
    async fn plain_key_file_source_boots() {
        let fake = FakeGoogle::start().await;
        let dir = TempDir::new().unwrap();
        let key = dir.path().join("key.json");
        std::fs::write(&key, service_account_json()).unwrap();
        let config = fake.config(&[
            ("GATEWAY_CREDENTIAL_SOURCE", "plain_key_file"),
            ("GATEWAY_KEY_FILE", key.to_str().unwrap()),
        ]);
        let lifecycle = Arc::new(Lifecycle::new());

        bootstrap(config, lifecycle.clone()).await.unwrap();

        assert_eq!(lifecycle.state(), LifecycleState::CredentialReady);
    }

    fn write_sealed_pem(dir: &std::path::Path) -> String {
        let sealed =
            seal_with_iterations(TEST_PEM.as_bytes(), TEST_PASSPHRASE, MIN_ITERATIONS).unwrap();
        let path = dir.join("bare-key.sealed");
        std::fs::write(&path, sealed).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn sealed_bare_pem_boots_with_configured_email() {
        let fake = FakeGoogle::start().await;
        let dir = TempDir::new().unwrap();
        let blob = write_sealed_pem(dir.path());
        let config = fake.config(&[
            ("GATEWAY_SECRET_PATH", blob.as_str()),
            ("GATEWAY_SERVICE_ACCOUNT_EMAIL", TEST_EMAIL),
        ]);
        let lifecycle = Arc::new(Lifecycle::new());

        let state = bootstrap(config, lifecycle.clone()).await.unwrap();

        assert_eq!(lifecycle.state(), LifecycleState::CredentialReady);
        assert_eq!(state.clients.provider().identity().client_email(), TEST_EMAIL);
        assert_eq!(fake.token_requests(), 1);
    }

    #[tokio::test]
    async fn sealed_bare_pem_without_email_fails_boot() {
        let fake = FakeGoogle::start().await;
        let dir = TempDir::new().unwrap();
        let blob = write_sealed_pem(dir.path());
        let config = fake.config(&[("GATEWAY_SECRET_PATH", blob.as_str())]);
        let lifecycle = Arc::new(Lifecycle::new());

        let err = bootstrap(config, lifecycle.clone()).await.err().unwrap();

        assert!(matches!(err, BootError::Secret(SecretError::SecretMalformed(_))));
        assert_eq!(lifecycle.state(), LifecycleState::SecretLoaded);
        assert_eq!(fake.token_requests(), 0);
    }

    #[tokio::test]
    async fn revoked_key_fails_boot_after_secret_load() {
        let fake = FakeGoogle::start().await;
        fake.revoke_key();
        let dir = TempDir::new().unwrap();
        let blob = write_sealed_key(dir.path());
        let config = fake.config(&[("GATEWAY_SECRET_PATH", blob.to_str().unwrap())]);
        let lifecycle = Arc::new(Lifecycle::new());

        let err = bootstrap(config, lifecycle.clone()).await.err().unwrap();

        match err {
            BootError::Auth(auth) => assert!(auth.is_auth_failed()),
            other => panic!("expected auth failure, got {other:?}"),
        }
        assert_eq!(lifecycle.state(), LifecycleState::SecretLoaded);
    }
}

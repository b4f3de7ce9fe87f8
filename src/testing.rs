// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test fixtures: a fake Google backend served on a loopback port.
//!
//! The fake implements just enough of the OAuth2 token endpoint, Speech,
//! Text-to-Speech, Translation and Cloud Storage for the gateway's calls.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Path as UrlPath, Query, State},
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use base64ct::{Base64, Encoding};
use secrecy::SecretString;
use serde_json::{json, Value};

use crate::auth::{CredentialProvider, ServiceIdentity};
use crate::clients::ClientFactory;
use crate::config::{Endpoints, GatewayConfig};
use crate::lifecycle::{bootstrap, Lifecycle, LifecycleState};
use crate::secrets::{seal_with_iterations, MIN_ITERATIONS};
use crate::state::AppState;

pub const TEST_PEM: &str = include_str!("../testdata/test-service-account.pem");
pub const TEST_EMAIL: &str = "useapis@chitchat.iam.gserviceaccount.com";
pub const TEST_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
pub const TEST_BUCKET: &str = "chitchat-test.appspot.com";
pub const TEST_PASSPHRASE: &str = "correct horse battery staple";

/// Bytes served at `/media/sample.mp3`.
pub const SAMPLE_AUDIO: &[u8] = b"ID3\x04\x00fake sample audio";

pub fn test_identity(token_uri: &str) -> ServiceIdentity {
    ServiceIdentity::new(
        TEST_EMAIL,
        &SecretString::from(TEST_PEM.to_string()),
        vec![TEST_SCOPE.to_string()],
        token_uri,
    )
    .unwrap()
}

/// A service-account JSON document for the test key.
pub fn service_account_json() -> String {
    json!({
        "type": "service_account",
        "project_id": "chitchat",
        "private_key_id": "0123456789abcdef",
        "private_key": TEST_PEM,
        "client_email": TEST_EMAIL,
        "token_uri": "https://oauth2.googleapis.com/token",
    })
    .to_string()
}

/// Seal the test service account into `dir` and return the blob path.
pub fn write_sealed_key(dir: &Path) -> PathBuf {
    let sealed =
        seal_with_iterations(service_account_json().as_bytes(), TEST_PASSPHRASE, MIN_ITERATIONS)
            .unwrap();
    let path = dir.join("service-account.sealed");
    std::fs::write(&path, sealed).unwrap();
    path
}

const BOUNDARY: &str = "gateway-test-boundary";

/// A multipart POST to `uri`; each part is `(name, file name, bytes)`.
///
/// Parts with a file name are sent as `audio/mpeg`.
pub fn multipart_request(uri: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, file_name, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match file_name {
            Some(file_name) => format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                 Content-Type: audio/mpeg\r\n\r\n"
            ),
            None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[derive(Default)]
struct FakeState {
    token_requests: AtomicU64,
    token_lifetime: AtomicU64,
    token_delay_ms: AtomicU64,
    token_body: Mutex<Option<String>>,
    translate_delay_ms: AtomicU64,
    revoked: AtomicBool,
    speech_requests: Mutex<Vec<Value>>,
    objects: Mutex<HashMap<(String, String), (Vec<u8>, String)>>,
}

/// In-process stand-in for the Google APIs.
pub struct FakeGoogle {
    base_url: String,
    state: Arc<FakeState>,
}

impl FakeGoogle {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        state.token_lifetime.store(3600, Ordering::SeqCst);

        let router = Router::new()
            .route("/token", post(token))
            .route("/v1p1beta1/speech:recognize", post(recognize))
            .route("/v1/text:synthesize", post(synthesize))
            .route("/language/translate/v2", post(translate))
            .route("/upload/storage/v1/b/{bucket}/o", post(upload))
            .route("/storage/v1/b/{bucket}/o/{object}", get(download))
            .route("/media/sample.mp3", get(sample_audio))
            .layer(DefaultBodyLimit::disable())
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_uri(&self) -> String {
        format!("{}/token", self.base_url)
    }

    pub fn sample_audio_url(&self) -> String {
        format!("{}/media/sample.mp3", self.base_url)
    }

    /// Token requests received, including rejected ones.
    pub fn token_requests(&self) -> u64 {
        self.state.token_requests.load(Ordering::SeqCst)
    }

    pub fn set_token_lifetime(&self, secs: u64) {
        self.state.token_lifetime.store(secs, Ordering::SeqCst);
    }

    pub fn set_token_delay(&self, delay: Duration) {
        self.state
            .token_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Answer token requests with 200 and `body` verbatim.
    pub fn set_token_body(&self, body: &str) {
        *self.state.token_body.lock().unwrap() = Some(body.to_string());
    }

    pub fn set_translate_delay(&self, delay: Duration) {
        self.state
            .translate_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Make the token endpoint reject the service account key.
    pub fn revoke_key(&self) {
        self.state.revoked.store(true, Ordering::SeqCst);
    }

    pub fn restore_key(&self) {
        self.state.revoked.store(false, Ordering::SeqCst);
    }

    pub fn last_speech_request(&self) -> Option<Value> {
        self.state.speech_requests.lock().unwrap().last().cloned()
    }

    pub fn stored_object(&self, bucket: &str, name: &str) -> Option<Vec<u8>> {
        self.state
            .objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), name.to_string()))
            .map(|(bytes, _)| bytes.clone())
    }

    pub fn stored_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .state
            .objects
            .lock()
            .unwrap()
            .keys()
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn put_object(&self, bucket: &str, name: &str, bytes: &[u8], content_type: &str) {
        self.state.objects.lock().unwrap().insert(
            (bucket.to_string(), name.to_string()),
            (bytes.to_vec(), content_type.to_string()),
        );
    }

    /// The MP3 bytes the fake synthesizes for `text`.
    pub fn synthesized_audio(text: &str) -> Vec<u8> {
        format!("ID3 synthesized: {text}").into_bytes()
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            speech: self.base_url.clone(),
            tts: self.base_url.clone(),
            translate: self.base_url.clone(),
            storage: self.base_url.clone(),
            signed_url_base: self.base_url.clone(),
        }
    }

    pub fn provider(&self) -> CredentialProvider {
        CredentialProvider::new(test_identity(&self.token_uri()), reqwest::Client::new())
    }

    pub fn factory(&self) -> ClientFactory {
        ClientFactory::new(
            self.provider(),
            reqwest::Client::new(),
            self.endpoints(),
            TEST_BUCKET,
        )
    }

    /// Gateway configuration pointed at this fake, plus `extra` variables.
    pub fn config(&self, extra: &[(&str, &str)]) -> GatewayConfig {
        let mut vars: HashMap<String, String> = [
            ("GATEWAY_TOKEN_URI", self.token_uri()),
            ("GATEWAY_SPEECH_URL", self.base_url.clone()),
            ("GATEWAY_TTS_URL", self.base_url.clone()),
            ("GATEWAY_TRANSLATE_URL", self.base_url.clone()),
            ("GATEWAY_STORAGE_URL", self.base_url.clone()),
            ("GATEWAY_STORAGE_BUCKET", TEST_BUCKET.to_string()),
            ("GATEWAY_SECRET_PASSPHRASE", TEST_PASSPHRASE.to_string()),
            ("GATEWAY_DOWNSTREAM_TIMEOUT_SECS", "5".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        for (k, v) in extra {
            vars.insert(k.to_string(), v.to_string());
        }
        GatewayConfig::from_lookup(|name| vars.get(name).cloned()).unwrap()
    }

    /// Bootstrap a gateway against this fake and mark it serving.
    pub async fn serving_state(&self, dir: &Path, extra: &[(&str, &str)]) -> AppState {
        let blob = write_sealed_key(dir);
        let blob = blob.to_string_lossy().into_owned();
        let mut vars = vec![("GATEWAY_SECRET_PATH", blob.as_str())];
        vars.extend_from_slice(extra);

        let lifecycle = Arc::new(Lifecycle::new());
        let state = bootstrap(self.config(&vars), lifecycle.clone()).await.unwrap();
        lifecycle.advance(LifecycleState::Serving).unwrap();
        state
    }
}

fn google_error(status: StatusCode, reason: &str, message: &str) -> Response {
    (
        status,
        Json(json!({
            "error": { "code": status.as_u16(), "message": message, "status": reason }
        })),
    )
        .into_response()
}

fn authorized(headers: &HeaderMap) -> Result<(), Response> {
    let ok = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer fake-token-"));
    if ok {
        Ok(())
    } else {
        Err(google_error(
            StatusCode::UNAUTHORIZED,
            "UNAUTHENTICATED",
            "Request had invalid authentication credentials.",
        ))
    }
}

async fn token(
    State(state): State<Arc<FakeState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let n = state.token_requests.fetch_add(1, Ordering::SeqCst) + 1;

    let delay = state.token_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let grant_ok = form.get("grant_type").map(String::as_str)
        == Some("urn:ietf:params:oauth:grant-type:jwt-bearer")
        && form
            .get("assertion")
            .is_some_and(|a| a.split('.').count() == 3);
    if !grant_ok {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "unsupported_grant_type" })),
        )
            .into_response();
    }

    if state.revoked.load(Ordering::SeqCst) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid JWT Signature."
            })),
        )
            .into_response();
    }

    if let Some(body) = state.token_body.lock().unwrap().clone() {
        return ([(header::CONTENT_TYPE, "application/json")], body).into_response();
    }

    Json(json!({
        "access_token": format!("fake-token-{n}"),
        "expires_in": state.token_lifetime.load(Ordering::SeqCst),
        "token_type": "Bearer"
    }))
    .into_response()
}

async fn recognize(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    if body["config"]["languageCode"] == "xx-INVALID" {
        return google_error(
            StatusCode::BAD_REQUEST,
            "INVALID_ARGUMENT",
            "Invalid recognition 'config': bad language code.",
        );
    }
    state.speech_requests.lock().unwrap().push(body);

    Json(json!({
        "results": [
            { "alternatives": [{ "transcript": "hello world", "confidence": 0.93 }] },
            { "alternatives": [{ "transcript": "from the fake backend", "confidence": 0.88 }] }
        ]
    }))
    .into_response()
}

async fn synthesize(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    let text = body["input"]["text"].as_str().unwrap_or_default();
    Json(json!({
        "audioContent": Base64::encode_string(&FakeGoogle::synthesized_audio(text))
    }))
    .into_response()
}

async fn translate(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    let delay = state.translate_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let q = body["q"].as_str().unwrap_or_default();
    if q.is_empty() {
        return Json(json!({ "data": { "translations": [] } })).into_response();
    }
    let source = body["source"].as_str().unwrap_or_default();
    let target = body["target"].as_str().unwrap_or_default();
    Json(json!({
        "data": { "translations": [{ "translatedText": format!("[{source}->{target}] {q}") }] }
    }))
    .into_response()
}

async fn upload(
    State(state): State<Arc<FakeState>>,
    UrlPath(bucket): UrlPath<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    let upload_type = query.get("uploadType").map(String::as_str);
    let (Some("media"), Some(name)) = (upload_type, query.get("name")) else {
        return google_error(
            StatusCode::BAD_REQUEST,
            "INVALID_ARGUMENT",
            "Missing upload parameters.",
        );
    };
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let size = body.len();
    state
        .objects
        .lock()
        .unwrap()
        .insert((bucket.clone(), name.clone()), (body.to_vec(), content_type));

    Json(json!({ "bucket": bucket, "name": name, "size": size.to_string() })).into_response()
}

async fn download(
    State(state): State<Arc<FakeState>>,
    UrlPath((bucket, object)): UrlPath<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Err(denied) = authorized(&headers) {
        return denied;
    }
    let found = state.objects.lock().unwrap().get(&(bucket, object)).cloned();
    match found {
        Some((bytes, content_type)) => {
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        None => google_error(StatusCode::NOT_FOUND, "NOT_FOUND", "No such object."),
    }
}

async fn sample_audio() -> Response {
    ([(header::CONTENT_TYPE, "audio/mpeg")], SAMPLE_AUDIO).into_response()
}

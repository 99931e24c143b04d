//! Shared test support: an in-process stub of the remote auth API plus
//! recording implementations of the notification and navigation seams.

use crate::config::ClientConfig;
use crate::notify::Notifier;
use crate::routes::Navigate;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared, inspectable state of the stub server.
pub struct StubState {
    /// Number of `POST /auth/refresh` requests received.
    pub refresh_calls: AtomicUsize,
    /// Number of `GET /auth/me` requests received.
    pub me_calls: AtomicUsize,
    /// Force the next N `GET /auth/me` requests to 401 regardless of token.
    pub fail_me: AtomicUsize,
    /// Whether `POST /auth/refresh` accepts the valid refresh token.
    pub refresh_ok: AtomicBool,
}

impl Default for StubState {
    fn default() -> Self {
        Self {
            refresh_calls: AtomicUsize::new(0),
            me_calls: AtomicUsize::new(0),
            fail_me: AtomicUsize::new(0),
            refresh_ok: AtomicBool::new(true),
        }
    }
}

/// An in-process auth API bound to an ephemeral port.
///
/// Accepts the demo credentials `emilys` / `emilyspass`, issues the token
/// pair `t1` / `r1`, and refreshes `r1` to `t2` / `r2`. Bearer tokens `t1`
/// and `t2` are valid on authenticated endpoints.
pub struct StubApi {
    pub addr: SocketAddr,
    pub state: Arc<StubState>,
}

impl StubApi {
    pub async fn spawn() -> Self {
        let state = Arc::new(StubState::default());
        let app = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/refresh", post(refresh))
            .route("/auth/me", get(me))
            .route("/users", get(users))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Client configuration pointed at the stub.
pub fn stub_config(stub: &StubApi, data_dir: &Path) -> ClientConfig {
    ClientConfig {
        base_url: stub.base_url(),
        expires_in_mins: 30,
        data_dir: data_dir.to_path_buf(),
    }
}

fn emily_fields() -> Value {
    json!({
        "id": 1,
        "firstName": "Emily",
        "lastName": "Johnson",
        "email": "emily@x.com",
        "image": "http://x/img.png",
        "gender": "female"
    })
}

fn michael_fields() -> Value {
    json!({
        "id": 2,
        "firstName": "Michael",
        "lastName": "Williams",
        "email": "michael@x.com",
        "image": "http://x/img2.png"
    })
}

fn with_tokens(mut fields: Value, token: &str, refresh_token: &str) -> Value {
    fields["token"] = json!(token);
    fields["refreshToken"] = json!(refresh_token);
    fields
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    if username == "emilys" && password == "emilyspass" {
        (
            StatusCode::OK,
            Json(with_tokens(emily_fields(), "t1", "r1")),
        )
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"message": "Invalid credentials"})),
        )
    }
}

async fn refresh(
    State(state): State<Arc<StubState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let token = body["refreshToken"].as_str().unwrap_or_default();
    if state.refresh_ok.load(Ordering::SeqCst) && token == "r1" {
        (
            StatusCode::OK,
            Json(with_tokens(emily_fields(), "t2", "r2")),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid refresh token"})),
        )
    }
}

async fn me(State(state): State<Arc<StubState>>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    state.me_calls.fetch_add(1, Ordering::SeqCst);
    if state
        .fail_me
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
    {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Token expired"})),
        );
    }
    match bearer(&headers) {
        Some("t1") | Some("t2") => (StatusCode::OK, Json(emily_fields())),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid or expired token"})),
        ),
    }
}

async fn users(
    State(_state): State<Arc<StubState>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    match bearer(&headers) {
        Some("t1") | Some("t2") => (
            StatusCode::OK,
            Json(json!({
                "users": [emily_fields(), michael_fields()],
                "total": 2,
                "skip": 0,
                "limit": 30
            })),
        ),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Invalid or expired token"})),
        ),
    }
}

/// Notifier that records every notice.
#[derive(Default)]
pub struct RecordingNotifier {
    pub successes: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.successes.lock().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().push(message.to_string());
    }
}

/// Navigator that records every forced redirect.
#[derive(Default)]
pub struct RecordingNavigator {
    pub targets: Mutex<Vec<String>>,
}

impl Navigate for RecordingNavigator {
    fn force_navigate(&self, path: &str) {
        self.targets.lock().push(path.to_string());
    }
}

//! Stub reservation backend and fixture builders for tests.
//!
//! The stub is a real axum server on an ephemeral loopback port. Responses
//! are canned per `(method, path)`; every request is recorded so tests can
//! assert on headers and bodies the client actually sent.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use crate::net::api::ApiClient;
use crate::net::config::ApiConfig;
use crate::net::types::{Role, User};
use crate::state::session::SessionStore;
use crate::util::credentials::{CredentialStorage, MemoryStorage, save_credentials};
use crate::util::navigation::{Location, Navigator};

#[derive(Clone, Debug)]
struct Canned {
    status: u16,
    body: String,
    delay: Option<Duration>,
}

/// A request as the stub received it.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Default)]
struct StubState {
    routes: Mutex<HashMap<(Method, String), Canned>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct StubBackend {
    addr: SocketAddr,
    state: Arc<StubState>,
}

impl StubBackend {
    pub async fn start() -> Self {
        let state = Arc::new(StubState::default());
        let app = Router::new().fallback(handle).with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind stub backend");
        let addr = listener.local_addr().expect("stub local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        self.respond_raw(method, path, status, &body.to_string());
    }

    pub fn respond_raw(&self, method: Method, path: &str, status: u16, body: &str) {
        self.insert(method, path, Canned { status, body: body.to_owned(), delay: None });
    }

    pub fn respond_delayed(&self, method: Method, path: &str, status: u16, body: Value, delay: Duration) {
        self.insert(method, path, Canned { status, body: body.to_string(), delay: Some(delay) });
    }

    fn insert(&self, method: Method, path: &str, canned: Canned) {
        self.state.routes.lock().unwrap().insert((method, path.to_owned()), canned);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.requests().pop().expect("stub received no requests")
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.lock().unwrap().len()
    }
}

async fn handle(
    State(state): State<Arc<StubState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_owned();
    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().map(str::to_owned),
        headers,
        body,
    });

    let canned = state.routes.lock().unwrap().get(&(method, path)).cloned();
    let Some(canned) = canned else {
        return (StatusCode::NOT_FOUND, json!({ "error": "not found" }).to_string()).into_response();
    };
    if let Some(delay) = canned.delay {
        tokio::time::sleep(delay).await;
    }
    let status = StatusCode::from_u16(canned.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], canned.body).into_response()
}

// =============================================================================
// FIXTURES
// =============================================================================

/// A loopback URL nothing is listening on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind probe");
    let addr = listener.local_addr().expect("probe addr");
    drop(listener);
    format!("http://{addr}")
}

#[must_use]
pub fn alice() -> User {
    User { id: 1, username: "alice".to_owned(), role: Role::User }
}

#[must_use]
pub fn root_user() -> User {
    User { id: 2, username: "admin".to_owned(), role: Role::Root }
}

pub fn user_json(user: &User) -> Value {
    serde_json::to_value(user).expect("user encodes")
}

pub fn api_client(stub: &StubBackend, storage: Arc<MemoryStorage>) -> ApiClient {
    ApiClient::new(ApiConfig::new(stub.base_url()), storage).expect("api client")
}

/// Storage pre-seeded with a credential pair.
pub fn seeded_storage(token: &str, user: &User) -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new());
    save_credentials(storage.as_ref() as &dyn CredentialStorage, token, user).expect("seed credentials");
    storage
}

pub struct SessionFixture {
    pub session: SessionStore,
    pub storage: Arc<MemoryStorage>,
    pub location: Arc<Location>,
}

pub fn session_with(stub: &StubBackend, storage: Arc<MemoryStorage>) -> SessionFixture {
    let api = api_client(stub, storage.clone());
    let location = Arc::new(Location::default());
    let session = SessionStore::new(api, location.clone() as Arc<dyn Navigator>);
    SessionFixture { session, storage, location }
}

pub fn fresh_session(stub: &StubBackend) -> SessionFixture {
    session_with(stub, Arc::new(MemoryStorage::new()))
}

//! Shared test fixtures: an in-process stub IdP and gateway helpers.
//!
//! The stub speaks just enough of the IdP admin API for the gateway: the
//! token endpoint per realm, client CRUD with secrets, user provisioning and
//! the admin root used by health probes. Every upstream call is recorded so
//! tests can assert which calls were made and with which bearer token.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    Form, Json, Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use idp_gateway::config::{Config, IdpConfig};
use idp_gateway::gateway::{AppState, create_router};
use idp_gateway::idp::IdpClient;

/// Rejection body the stub token endpoint answers for unknown credentials.
pub const REJECTION_BODY: &str =
    r#"{"error":"invalid_grant","error_description":"Invalid user credentials"}"#;

/// Failure body the stub admin API answers when [`StubState::fail`] is set.
pub const FAILURE_BODY: &str = "Test Idp API Failure";

/// One recorded upstream call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub path: String,
    pub token: Option<String>,
    pub body: Option<Value>,
}

/// A client held by the stub realm.
#[derive(Debug, Clone)]
pub struct StubClient {
    pub id: String,
    pub client_id: String,
    pub definition: Value,
}

/// A user held by the stub realm.
#[derive(Debug, Clone)]
pub struct StubUser {
    pub id: String,
    pub username: String,
}

/// Mutable state behind the stub IdP.
#[derive(Default)]
pub struct StubState {
    pub calls: Mutex<Vec<RecordedCall>>,
    pub clients: Mutex<Vec<StubClient>>,
    pub secrets: Mutex<HashMap<String, String>>,
    pub users: Mutex<Vec<StubUser>>,
    /// Admin endpoints answer 500 with [`FAILURE_BODY`] while set
    pub fail: AtomicBool,
    /// Token endpoint answers 200 with an unparseable body while set
    pub bad_token: AtomicBool,
}

impl StubState {
    fn record(&self, method: &str, path: String, token: Option<String>, body: Option<Value>) {
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.to_string(),
            path,
            token,
            body,
        });
    }

    /// Recorded calls whose path contains `fragment`.
    pub fn calls_matching(&self, fragment: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.path.contains(fragment))
            .cloned()
            .collect()
    }

    /// Seed a client with its internal id and live secret.
    pub fn seed_client(&self, client_id: &str, id: &str, secret: &str) {
        self.clients.lock().unwrap().push(StubClient {
            id: id.to_string(),
            client_id: client_id.to_string(),
            definition: json!({"clientId": client_id}),
        });
        self.secrets
            .lock()
            .unwrap()
            .insert(id.to_string(), secret.to_string());
    }

    /// Definition last submitted for `client_id`, as the stub stored it.
    pub fn stored_definition(&self, client_id: &str) -> Option<Value> {
        self.clients
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.client_id == client_id)
            .map(|c| c.definition.clone())
    }
}

/// A running stub IdP.
pub struct StubIdp {
    pub addr: SocketAddr,
    pub state: Arc<StubState>,
}

impl StubIdp {
    /// Start the stub on an ephemeral port.
    pub async fn start() -> Self {
        let state = Arc::new(StubState::default());
        let router = stub_router(Arc::clone(&state));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Self { addr, state }
    }

    /// Gateway configuration pointing at this stub.
    pub fn gateway_config(&self) -> Config {
        let mut config = Config::default();
        config.idp = IdpConfig {
            url: format!("http://{}", self.addr),
            realm: "apps".to_string(),
            public_client_id: "gateway".to_string(),
            public_client_secret: "gateway-secret".to_string(),
            admin_client_id: "admin-cli".to_string(),
            admin_client_secret: "admin-secret".to_string(),
            admin_username: "admin".to_string(),
            admin_password: "changeme".to_string(),
        };
        config
    }

    /// An [`IdpClient`] wired to this stub, for driving the client directly.
    pub fn idp_client(&self) -> IdpClient {
        IdpClient::new(reqwest::Client::new(), self.gateway_config().idp)
    }
}

/// Build the gateway router under test, wired to the given configuration.
pub fn app(config: Config) -> Router {
    let state = Arc::new(AppState {
        idp: IdpClient::new(reqwest::Client::new(), config.idp.clone()),
        config: Arc::new(config),
    });
    create_router(state)
}

/// Basic Authorization header value for `user:pass`.
pub fn basic_auth(user: &str, pass: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")))
}

/// Request builder for a JSON mutation against the gateway under test.
pub fn client_request(method: &str, auth: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri("/api/v1/client")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response) -> Value {
    use http_body_util::BodyExt;
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect a response body as a string.
pub async fn body_string(response: Response) -> String {
    use http_body_util::BodyExt;
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// ── Stub IdP internals ───────────────────────────────────────────────────

fn stub_router(state: Arc<StubState>) -> Router {
    Router::new()
        .route(
            "/auth/realms/{realm}/protocol/openid-connect/token",
            post(token),
        )
        .route("/auth/admin", get(admin_root))
        .route(
            "/auth/admin/realms/{realm}/clients",
            get(list_clients).post(create_client),
        )
        .route(
            "/auth/admin/realms/{realm}/clients/{id}",
            put(update_client).delete(delete_client),
        )
        .route(
            "/auth/admin/realms/{realm}/clients/{id}/client-secret",
            get(client_secret),
        )
        .route(
            "/auth/admin/realms/{realm}/users",
            get(list_users).post(create_user),
        )
        .route("/auth/admin/realms/{realm}/users/{id}", delete(delete_user))
        .route(
            "/auth/admin/realms/{realm}/users/{id}/reset-password",
            put(reset_password),
        )
        .with_state(state)
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(String::from)
}

fn param(form: &HashMap<String, String>, key: &str) -> String {
    form.get(key).cloned().unwrap_or_default()
}

async fn token(
    State(state): State<Arc<StubState>>,
    Path(realm): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.record(
        "POST",
        format!("/auth/realms/{realm}/protocol/openid-connect/token"),
        None,
        None,
    );

    if state.bad_token.load(Ordering::SeqCst) {
        return (StatusCode::OK, r#"{"access_token": oops"#).into_response();
    }

    let grant = param(&form, "grant_type");
    let identity = match (realm.as_str(), grant.as_str()) {
        ("master", "password")
            if param(&form, "client_id") == "admin-cli"
                && param(&form, "client_secret") == "admin-secret"
                && param(&form, "username") == "admin"
                && param(&form, "password") == "changeme" =>
        {
            Some("admin")
        }
        ("apps", "password")
            if param(&form, "client_id") == "gateway"
                && param(&form, "client_secret") == "gateway-secret"
                && param(&form, "username") == "alice"
                && param(&form, "password") == "wonderland" =>
        {
            Some("alice")
        }
        ("apps", "client_credentials")
            if param(&form, "client_id") == "svc-client"
                && param(&form, "client_secret") == "svc-secret" =>
        {
            Some("svc-client")
        }
        _ => None,
    };

    match identity {
        Some(identity) => Json(json!({
            "access_token": format!("tok-{identity}"),
            "expires_in": 60,
            "token_type": "Bearer",
        }))
        .into_response(),
        None => (StatusCode::UNAUTHORIZED, REJECTION_BODY).into_response(),
    }
}

async fn admin_root(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    state.record("GET", "/auth/admin".to_string(), bearer(&headers), None);
    if state.fail.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, FAILURE_BODY).into_response();
    }
    StatusCode::OK.into_response()
}

async fn list_clients(
    State(state): State<Arc<StubState>>,
    Path(realm): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.record(
        "GET",
        format!("/auth/admin/realms/{realm}/clients"),
        bearer(&headers),
        None,
    );
    if state.fail.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, FAILURE_BODY).into_response();
    }

    let records: Vec<Value> = state
        .clients
        .lock()
        .unwrap()
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "clientId": c.client_id,
                "protocol": "openid-connect",
                "surrogateAuthRequired": false,
            })
        })
        .collect();
    Json(records).into_response()
}

async fn create_client(
    State(state): State<Arc<StubState>>,
    Path(realm): Path<String>,
    headers: HeaderMap,
    Json(definition): Json<Value>,
) -> Response {
    state.record(
        "POST",
        format!("/auth/admin/realms/{realm}/clients"),
        bearer(&headers),
        Some(definition.clone()),
    );
    if state.fail.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, FAILURE_BODY).into_response();
    }

    let client_id = definition["clientId"].as_str().unwrap_or_default().to_string();
    let id = format!("{client_id}-id");
    state
        .secrets
        .lock()
        .unwrap()
        .insert(id.clone(), format!("{client_id}-secret"));
    state.clients.lock().unwrap().push(StubClient {
        id,
        client_id,
        definition,
    });
    StatusCode::CREATED.into_response()
}

async fn update_client(
    State(state): State<Arc<StubState>>,
    Path((realm, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(definition): Json<Value>,
) -> Response {
    state.record(
        "PUT",
        format!("/auth/admin/realms/{realm}/clients/{id}"),
        bearer(&headers),
        Some(definition.clone()),
    );

    let mut clients = state.clients.lock().unwrap();
    match clients.iter_mut().find(|c| c.id == id) {
        Some(client) => {
            client.definition = definition;
            StatusCode::NO_CONTENT.into_response()
        }
        None => (StatusCode::NOT_FOUND, "client not found").into_response(),
    }
}

async fn delete_client(
    State(state): State<Arc<StubState>>,
    Path((realm, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    state.record(
        "DELETE",
        format!("/auth/admin/realms/{realm}/clients/{id}"),
        bearer(&headers),
        None,
    );
    state.clients.lock().unwrap().retain(|c| c.id != id);
    state.secrets.lock().unwrap().remove(&id);
    StatusCode::NO_CONTENT.into_response()
}

async fn client_secret(
    State(state): State<Arc<StubState>>,
    Path((realm, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    state.record(
        "GET",
        format!("/auth/admin/realms/{realm}/clients/{id}/client-secret"),
        bearer(&headers),
        None,
    );
    if state.fail.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, FAILURE_BODY).into_response();
    }

    match state.secrets.lock().unwrap().get(&id) {
        Some(secret) => Json(json!({"type": "secret", "value": secret})).into_response(),
        None => (StatusCode::NOT_FOUND, "no secret").into_response(),
    }
}

async fn list_users(
    State(state): State<Arc<StubState>>,
    Path(realm): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.record(
        "GET",
        format!("/auth/admin/realms/{realm}/users"),
        bearer(&headers),
        None,
    );

    let records: Vec<Value> = state
        .users
        .lock()
        .unwrap()
        .iter()
        .map(|u| json!({"id": u.id, "username": u.username, "enabled": true}))
        .collect();
    Json(records).into_response()
}

async fn create_user(
    State(state): State<Arc<StubState>>,
    Path(realm): Path<String>,
    headers: HeaderMap,
    Json(definition): Json<Value>,
) -> Response {
    state.record(
        "POST",
        format!("/auth/admin/realms/{realm}/users"),
        bearer(&headers),
        Some(definition.clone()),
    );

    let username = definition["username"].as_str().unwrap_or_default().to_string();
    let id = format!("{username}-uid");
    state.users.lock().unwrap().push(StubUser { id, username });
    StatusCode::CREATED.into_response()
}

async fn delete_user(
    State(state): State<Arc<StubState>>,
    Path((realm, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    state.record(
        "DELETE",
        format!("/auth/admin/realms/{realm}/users/{id}"),
        bearer(&headers),
        None,
    );
    state.users.lock().unwrap().retain(|u| u.id != id);
    StatusCode::NO_CONTENT.into_response()
}

async fn reset_password(
    State(state): State<Arc<StubState>>,
    Path((realm, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(credential): Json<Value>,
) -> Response {
    state.record(
        "PUT",
        format!("/auth/admin/realms/{realm}/users/{id}/reset-password"),
        bearer(&headers),
        Some(credential),
    );
    StatusCode::NO_CONTENT.into_response()
}

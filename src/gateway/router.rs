//! HTTP router and handlers
//!
//! | Method | Path           | Auth  | Success                       |
//! |--------|----------------|-------|-------------------------------|
//! | POST   | /api/v1/client | Basic | 201, `{"value": "<secret>"}`  |
//! | PUT    | /api/v1/client | Basic | 201, empty                    |
//! | DELETE | /api/v1/client | Basic | 201, empty                    |
//! | GET    | /health        | none  | 200, empty                    |
//! | GET    | /swagger.yml   | none  | 200, the OpenAPI document     |
//!
//! Mutations address the target through the `clientId` in the body, not the
//! path. PUT and DELETE additionally carry a `clientSecret` proof that is
//! checked against the live secret before anything is changed.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::{catch_panic::CatchPanicLayer, compression::CompressionLayer, trace::TraceLayer};
use tracing::info;

use crate::auth;
use crate::config::Config;
use crate::idp::{ClientDefinition, IdpClient, MutationPayload};
use crate::{Error, Result};

/// Shared application state
pub struct AppState {
    /// Service configuration
    pub config: Arc<Config>,
    /// IdP admin client
    pub idp: IdpClient,
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/v1/client",
            post(create_client).put(update_client).delete(delete_client),
        )
        .route("/health", get(health))
        .route("/swagger.yml", get(swagger))
        .fallback(fallback)
        .layer(CatchPanicLayer::new())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST /api/v1/client - create a client and answer its generated secret
async fn create_client(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let caller = auth::authenticate_caller(&state.idp, &state.config.idp, &headers).await?;

    let mut definition: ClientDefinition =
        serde_json::from_slice(&body).map_err(|_| Error::InvalidPayload)?;
    definition.validate()?;
    definition.derive_redirect_urls();

    let admin = auth::authenticate_admin(&state.idp, &state.config.idp).await?;

    // Gateway-managed clients are always confidential
    definition.public_client = false;
    definition.description = format!("Client created by {}", caller.identity);

    state.idp.create_client(&admin.token, &definition).await?;
    let record = state
        .idp
        .lookup_client(&admin.token, &definition.client_id)
        .await?;
    let secret = state.idp.get_client_secret(&admin.token, &record.id).await?;

    info!(client_id = %definition.client_id, identity = %caller.identity, "Client created");
    Ok((StatusCode::CREATED, Json(secret)).into_response())
}

/// PUT /api/v1/client - update a client after proving control of its secret
async fn update_client(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    auth::authenticate_caller(&state.idp, &state.config.idp, &headers).await?;

    let mut payload: MutationPayload =
        serde_json::from_slice(&body).map_err(|_| Error::InvalidPayload)?;
    payload.validate_for_update()?;
    payload.definition.derive_redirect_urls();

    let admin = auth::authenticate_admin(&state.idp, &state.config.idp).await?;

    payload.definition.public_client = false;
    let record = state
        .idp
        .lookup_client(&admin.token, &payload.definition.client_id)
        .await?;
    let live = state.idp.get_client_secret(&admin.token, &record.id).await?;
    if !auth::secret_matches(&payload.client_secret, &live.value) {
        return Err(Error::BadClientSecret);
    }

    state
        .idp
        .update_client(&admin.token, &record.id, &payload.definition)
        .await?;

    info!(client_id = %payload.definition.client_id, "Client updated");
    Ok(created_empty())
}

/// DELETE /api/v1/client - delete a client after proving control of its secret
async fn delete_client(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    auth::authenticate_caller(&state.idp, &state.config.idp, &headers).await?;

    let payload: MutationPayload =
        serde_json::from_slice(&body).map_err(|_| Error::InvalidPayload)?;
    payload.validate_for_delete()?;

    let admin = auth::authenticate_admin(&state.idp, &state.config.idp).await?;

    let record = state
        .idp
        .lookup_client(&admin.token, &payload.definition.client_id)
        .await?;
    let live = state.idp.get_client_secret(&admin.token, &record.id).await?;
    if !auth::secret_matches(&payload.client_secret, &live.value) {
        return Err(Error::BadClientSecret);
    }

    state.idp.delete_client(&admin.token, &record.id).await?;

    info!(client_id = %payload.definition.client_id, "Client deleted");
    Ok(created_empty())
}

/// GET /health - probe the IdP admin root
async fn health(State(state): State<Arc<AppState>>) -> Result<Response> {
    state.idp.check_health().await?;
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, "application/json")]).into_response())
}

/// GET /swagger.yml - serve the service's OpenAPI document
async fn swagger(State(state): State<Arc<AppState>>) -> Result<Response> {
    let doc = tokio::fs::read_to_string(&state.config.server.swagger_file).await?;
    Ok(([(header::CONTENT_TYPE, "text/yaml")], doc).into_response())
}

/// Unknown routes answer the 404 body of the API contract.
async fn fallback() -> Response {
    Error::NotFound("Endpoint Not Found".to_string()).into_response()
}

/// Empty 201 with a json content type, the shape mutations answer with.
fn created_empty() -> Response {
    (
        StatusCode::CREATED,
        [(header::CONTENT_TYPE, "application/json")],
    )
        .into_response()
}

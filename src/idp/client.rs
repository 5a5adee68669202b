//! IdP Admin Client
//!
//! Thin typed client over the IdP admin REST API. Every call goes through
//! one send-and-normalize path that treats exactly 200, 201 and 204 as
//! success and surfaces any other reply as an upstream failure carrying the
//! raw response text.

use reqwest::{Client, StatusCode};
use tracing::{debug, error, warn};

use super::model::{
    ClientDefinition, ClientRecord, ClientSecret, UserCredential, UserDefinition, UserRecord,
};
use crate::config::IdpConfig;
use crate::{Error, Result};

/// Client for the IdP admin REST API and token endpoints.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Debug, Clone)]
pub struct IdpClient {
    /// HTTP client, shared across the gateway
    http: Client,

    /// IdP endpoint configuration
    config: IdpConfig,
}

impl IdpClient {
    /// Create a new IdP client.
    #[must_use]
    pub fn new(http: Client, config: IdpConfig) -> Self {
        Self { http, config }
    }

    /// Exchange grant parameters for a token at `token_url`.
    ///
    /// Returns the raw success body; callers parse the token out of it so
    /// that a malformed reply from a winning grant stays distinct from a
    /// rejected grant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Upstream`] when the IdP rejects the grant and
    /// [`Error::Transport`] when the request cannot be delivered.
    pub async fn exchange_token(
        &self,
        token_url: &str,
        form: &[(String, String)],
    ) -> Result<String> {
        self.execute(self.http.post(token_url).form(form)).await
    }

    /// Create a client in the configured realm.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Upstream`] when the IdP refuses the definition.
    pub async fn create_client(&self, token: &str, definition: &ClientDefinition) -> Result<()> {
        debug!(client_id = %definition.client_id, "Creating client");
        self.execute(
            self.http
                .post(self.config.clients_url())
                .bearer_auth(token)
                .json(definition),
        )
        .await?;
        Ok(())
    }

    /// List every client in the configured realm.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Upstream`] on a non-success reply and [`Error::Json`]
    /// when the collection body does not parse.
    pub async fn fetch_clients(&self, token: &str) -> Result<Vec<ClientRecord>> {
        let body = self
            .execute(self.http.get(self.config.clients_url()).bearer_auth(token))
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Resolve a public client id to its record, including the IdP-internal
    /// UUID. The collection endpoint has no exact-match filter, so the whole
    /// realm is listed and filtered here.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no client carries `client_id`.
    pub async fn lookup_client(&self, token: &str, client_id: &str) -> Result<ClientRecord> {
        debug!(client_id, "Looking up client");
        let clients = self.fetch_clients(token).await?;
        select_client(clients, client_id)
    }

    /// Fetch the secret for a client addressed by its internal UUID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Upstream`] on a non-success reply and [`Error::Json`]
    /// when the secret body does not parse.
    pub async fn get_client_secret(&self, token: &str, id: &str) -> Result<ClientSecret> {
        let body = self
            .execute(
                self.http
                    .get(self.config.client_secret_url(id))
                    .bearer_auth(token),
            )
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Replace the definition of the client addressed by its internal UUID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Upstream`] when the IdP refuses the update.
    pub async fn update_client(
        &self,
        token: &str,
        id: &str,
        definition: &ClientDefinition,
    ) -> Result<()> {
        debug!(client_id = %definition.client_id, id, "Updating client");
        self.execute(
            self.http
                .put(self.config.client_url(id))
                .bearer_auth(token)
                .json(definition),
        )
        .await?;
        Ok(())
    }

    /// Delete the client addressed by its internal UUID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Upstream`] when the IdP refuses the deletion.
    pub async fn delete_client(&self, token: &str, id: &str) -> Result<()> {
        debug!(id, "Deleting client");
        self.execute(self.http.delete(self.config.client_url(id)).bearer_auth(token))
            .await?;
        Ok(())
    }

    /// Create a user account in the configured realm.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Upstream`] when the IdP refuses the definition.
    pub async fn create_user(&self, token: &str, definition: &UserDefinition) -> Result<()> {
        debug!(username = %definition.username, "Creating user");
        self.execute(
            self.http
                .post(self.config.users_url())
                .bearer_auth(token)
                .json(definition),
        )
        .await?;
        Ok(())
    }

    /// Resolve a username to its record, including the IdP-internal UUID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no user carries `username`.
    pub async fn lookup_user(&self, token: &str, username: &str) -> Result<UserRecord> {
        debug!(username, "Looking up user");
        let body = self
            .execute(self.http.get(self.config.users_url()).bearer_auth(token))
            .await?;
        let users: Vec<UserRecord> = serde_json::from_str(&body)?;
        select_user(users, username)
    }

    /// Delete the user addressed by its internal UUID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Upstream`] when the IdP refuses the deletion.
    pub async fn delete_user(&self, token: &str, id: &str) -> Result<()> {
        debug!(id, "Deleting user");
        self.execute(self.http.delete(self.config.user_url(id)).bearer_auth(token))
            .await?;
        Ok(())
    }

    /// Set a credential on the user addressed by its internal UUID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Upstream`] when the IdP refuses the credential.
    pub async fn set_user_password(
        &self,
        token: &str,
        id: &str,
        credential: &UserCredential,
    ) -> Result<()> {
        debug!(id, "Resetting user password");
        self.execute(
            self.http
                .put(self.config.reset_password_url(id))
                .bearer_auth(token)
                .json(credential),
        )
        .await?;
        Ok(())
    }

    /// Probe the IdP admin root.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Upstream`] or [`Error::Transport`] when the IdP is
    /// unreachable or unhealthy.
    pub async fn check_health(&self) -> Result<()> {
        self.execute(self.http.get(self.config.check_url())).await?;
        Ok(())
    }

    /// Issue a request and normalize the outcome.
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<String> {
        let request = request.build()?;
        let method = request.method().clone();
        let url = request.url().clone();

        let response = self.http.execute(request).await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if is_success(status) {
            Ok(body)
        } else {
            error!(%method, %url, %status, "IdP request failed");
            Err(Error::Upstream(body))
        }
    }
}

/// Exactly 200, 201 and 204 count as success; redirects and everything else
/// are failures.
fn is_success(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT
    )
}

/// Pick the first client matching `client_id`. More than one match is an IdP
/// anomaly worth logging, not failing.
fn select_client(clients: Vec<ClientRecord>, client_id: &str) -> Result<ClientRecord> {
    let mut found: Vec<ClientRecord> = clients
        .into_iter()
        .filter(|c| c.client_id == client_id)
        .collect();
    if found.is_empty() {
        return Err(Error::NotFound(format!("client {client_id}")));
    }
    if found.len() > 1 {
        warn!(client_id, matches = found.len(), "Multiple clients share an id, using the first");
    }
    Ok(found.swap_remove(0))
}

/// Pick the first user matching `username`, mirroring [`select_client`].
fn select_user(users: Vec<UserRecord>, username: &str) -> Result<UserRecord> {
    let mut found: Vec<UserRecord> = users
        .into_iter()
        .filter(|u| u.username == username)
        .collect();
    if found.is_empty() {
        return Err(Error::NotFound(format!("user {username}")));
    }
    if found.len() > 1 {
        warn!(username, matches = found.len(), "Multiple users share a name, using the first");
    }
    Ok(found.swap_remove(0))
}

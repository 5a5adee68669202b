//! Wire types for the IdP admin API and the inbound surface.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// OAuth client definition, as submitted by callers and as sent to the IdP.
///
/// Every field defaults so partial inbound bodies decode; required fields are
/// checked by [`ClientDefinition::validate`] afterwards, keeping "body does
/// not decode" and "body lacks required fields" as distinct failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientDefinition {
    /// Public client identifier, required on input
    pub client_id: String,
    /// Whether the client is public (forced to `false` before any mutation)
    pub public_client: bool,
    /// Allowed redirect URIs
    pub redirect_uris: Vec<String>,
    /// Root URL of the client application
    pub root_url: String,
    /// Allowed web origins
    pub web_origins: Vec<String>,
    /// Admin URL of the client application
    pub admin_url: String,
    /// Resource-owner password grant allowed
    pub direct_access_grants_enabled: bool,
    /// Service account (client-credentials grant) enabled
    pub service_accounts_enabled: bool,
    /// Authorization-code flow enabled
    pub standard_flow_enabled: bool,
    /// Implicit flow enabled
    pub implicit_flow_enabled: bool,
    /// Free-text description; set to the creating identity on create
    pub description: String,
}

impl ClientDefinition {
    /// Check required fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRequiredFields`] when `clientId` is empty.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(Error::MissingRequiredFields);
        }
        Ok(())
    }

    /// Default console URLs from the redirect list when the standard flow is
    /// on: the first redirect URI becomes root and admin URL, the whole list
    /// becomes the web origins.
    pub fn derive_redirect_urls(&mut self) {
        if self.standard_flow_enabled && !self.redirect_uris.is_empty() {
            self.root_url.clone_from(&self.redirect_uris[0]);
            self.admin_url.clone_from(&self.redirect_uris[0]);
            self.web_origins.clone_from(&self.redirect_uris);
        }
    }
}

/// A client as returned by the IdP collection endpoint. Only the fields the
/// gateway consumes; the IdP sends many more, which serde drops.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientRecord {
    /// IdP-internal UUID, the address for update/delete/secret calls
    pub id: String,
    /// Public client identifier
    pub client_id: String,
    /// Whether the client is public
    pub public_client: bool,
    /// Resource-owner password grant allowed
    pub direct_access_grants_enabled: bool,
    /// Service account enabled
    pub service_accounts_enabled: bool,
    /// Authorization-code flow enabled
    pub standard_flow_enabled: bool,
    /// Implicit flow enabled
    pub implicit_flow_enabled: bool,
}

/// Client secret, both as parsed from the IdP and as answered to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSecret {
    /// The secret string
    pub value: String,
}

/// Mutation request body: a client definition plus the secret proof.
#[derive(Debug, Clone, Deserialize)]
pub struct MutationPayload {
    /// The submitted client definition
    #[serde(flatten)]
    pub definition: ClientDefinition,
    /// Caller-submitted proof of control over the targeted client
    #[serde(rename = "clientSecret", default)]
    pub client_secret: String,
}

impl MutationPayload {
    /// Update requires the client id and a non-empty secret proof.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRequiredFields`] when either is empty.
    pub fn validate_for_update(&self) -> Result<()> {
        self.definition.validate()?;
        if self.client_secret.is_empty() {
            return Err(Error::MissingRequiredFields);
        }
        Ok(())
    }

    /// Delete requires only the client id; an absent proof simply fails the
    /// secret comparison later.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRequiredFields`] when `clientId` is empty.
    pub fn validate_for_delete(&self) -> Result<()> {
        self.definition.validate()
    }
}

/// Token endpoint reply; only the access token is consumed.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    /// The bearer token
    pub access_token: String,
}

/// User definition for provisioning operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDefinition {
    /// Account name, required
    pub username: String,
    /// Whether the account is enabled
    pub enabled: bool,
}

/// A user as returned by the IdP collection endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    /// IdP-internal UUID
    pub id: String,
    /// Account name
    pub username: String,
    /// Whether the account is enabled
    pub enabled: bool,
}

/// Credential payload for the reset-password endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCredential {
    /// Credential type, `password` for this surface
    #[serde(rename = "type")]
    pub credential_type: String,
    /// Credential value
    pub value: String,
    /// Whether the credential must be rotated on first login
    pub temporary: bool,
}

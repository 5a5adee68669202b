//! Authentication negotiation
//!
//! Inbound Basic credentials are not tied to a single grant type: the same
//! pair may belong to a realm user or to a service client. The negotiator
//! expands one credential pair into an ordered list of token-endpoint
//! attempts and takes the first grant the IdP accepts. Administrative calls
//! use a single fixed password grant against the master realm.
//!
//! Secret values inside an attempt are replaced with a placeholder the
//! moment the attempt has been issued, so no log record ever carries a
//! password or client secret.

use std::fmt;

use axum::http::{HeaderMap, header};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::config::IdpConfig;
use crate::idp::{IdpClient, TokenResponse};
use crate::{Error, Result};

/// Placeholder written over secret parameters once an attempt is issued.
const REDACTED: &str = "xxx";

/// Credential pair lifted from an inbound Basic header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Username, or a client id when the pair names a service client
    pub username: String,
    /// Password, or a client secret
    pub password: String,
}

/// One prepared call against a token endpoint.
#[derive(Debug, Clone)]
pub struct GrantAttempt {
    /// Label of the identity this attempt would authenticate
    pub identity: String,
    /// Form parameters for the token endpoint, in wire order
    pub params: Vec<(String, String)>,
}

impl GrantAttempt {
    /// Build an attempt from form parameters. The identity label is the
    /// `username` parameter when present, otherwise the `client_id`.
    #[must_use]
    pub fn new(params: Vec<(String, String)>) -> Self {
        let identity = params
            .iter()
            .find(|(key, _)| key == "username")
            .or_else(|| params.iter().find(|(key, _)| key == "client_id"))
            .map(|(_, value)| value.clone())
            .unwrap_or_default();
        Self { identity, params }
    }

    /// Overwrite secret parameter values with a placeholder. Called right
    /// after the attempt is issued, before anything gets logged.
    pub fn redact(&mut self) {
        for (key, value) in &mut self.params {
            if key == "password" || key == "client_secret" {
                *value = REDACTED.to_string();
            }
        }
    }
}

impl fmt::Display for GrantAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.params {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value}")?;
            first = false;
        }
        Ok(())
    }
}

/// Identity and token of a grant the IdP accepted.
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    /// Bearer token for subsequent admin API calls
    pub token: String,
    /// Label of the authenticated identity
    pub identity: String,
}

/// Parse the Basic Authorization header into a credential pair.
///
/// # Errors
///
/// Returns [`Error::InvalidBasicAuth`] when the header is absent, not Basic,
/// not valid base64, or lacks the `user:password` shape.
pub fn basic_credentials(headers: &HeaderMap) -> Result<Credentials> {
    let encoded = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            v.strip_prefix("Basic ")
                .or_else(|| v.strip_prefix("basic "))
        })
        .ok_or(Error::InvalidBasicAuth)?;

    let decoded = STANDARD
        .decode(encoded)
        .map_err(|_| Error::InvalidBasicAuth)?;
    let decoded = String::from_utf8(decoded).map_err(|_| Error::InvalidBasicAuth)?;

    let (username, password) = decoded.split_once(':').ok_or(Error::InvalidBasicAuth)?;
    Ok(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Expand caller credentials into the attempt order: first a resource-owner
/// password grant through the configured public client, then the pair itself
/// as a client-credentials grant.
#[must_use]
pub fn caller_grant_attempts(credentials: &Credentials, idp: &IdpConfig) -> Vec<GrantAttempt> {
    let password_grant = GrantAttempt::new(vec![
        ("grant_type".to_string(), "password".to_string()),
        ("client_id".to_string(), idp.public_client_id.clone()),
        ("client_secret".to_string(), idp.public_client_secret.clone()),
        ("username".to_string(), credentials.username.clone()),
        ("password".to_string(), credentials.password.clone()),
    ]);
    let client_credentials_grant = GrantAttempt::new(vec![
        ("grant_type".to_string(), "client_credentials".to_string()),
        ("client_id".to_string(), credentials.username.clone()),
        ("client_secret".to_string(), credentials.password.clone()),
    ]);
    vec![password_grant, client_credentials_grant]
}

/// The administrative grant: a password grant with the configured admin
/// account, always against the master realm.
#[must_use]
pub fn admin_grant_attempt(idp: &IdpConfig) -> GrantAttempt {
    GrantAttempt::new(vec![
        ("grant_type".to_string(), "password".to_string()),
        ("client_id".to_string(), idp.admin_client_id.clone()),
        ("client_secret".to_string(), idp.admin_client_secret.clone()),
        ("username".to_string(), idp.admin_username.clone()),
        ("password".to_string(), idp.admin_password.clone()),
    ])
}

/// Run attempts in order and return the first accepted grant.
///
/// A rejected grant or an unreachable endpoint moves on to the next attempt;
/// the last rejection message is kept for the final error. A grant that is
/// accepted but answers an unparseable token body fails the negotiation
/// outright rather than falling through.
///
/// # Errors
///
/// Returns [`Error::AuthenticationFailed`] carrying the last rejection text
/// when no attempt succeeds.
pub async fn negotiate(
    idp: &IdpClient,
    token_url: &str,
    attempts: Vec<GrantAttempt>,
) -> Result<AuthOutcome> {
    let mut last_rejection = String::new();

    for mut attempt in attempts {
        let outcome = idp.exchange_token(token_url, &attempt.params).await;
        attempt.redact();
        match outcome {
            Ok(body) => {
                debug!(identity = %attempt.identity, %attempt, "Grant accepted");
                let token: TokenResponse = serde_json::from_str(&body)?;
                return Ok(AuthOutcome {
                    token: token.access_token,
                    identity: attempt.identity,
                });
            }
            Err(Error::Upstream(message)) => {
                debug!(identity = %attempt.identity, %attempt, "Grant rejected");
                last_rejection = message;
            }
            Err(Error::Transport(e)) => {
                debug!(identity = %attempt.identity, %attempt, "Token endpoint unreachable");
                last_rejection = e.to_string();
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::AuthenticationFailed(last_rejection))
}

/// Authenticate the caller behind `headers` against the configured realm.
///
/// # Errors
///
/// Returns [`Error::InvalidBasicAuth`] for a missing or malformed header,
/// without touching the IdP, and [`Error::AuthenticationFailed`] when every
/// grant attempt is rejected.
pub async fn authenticate_caller(
    idp: &IdpClient,
    config: &IdpConfig,
    headers: &HeaderMap,
) -> Result<AuthOutcome> {
    let credentials = basic_credentials(headers)?;
    let attempts = caller_grant_attempts(&credentials, config);
    negotiate(idp, &config.caller_token_url(), attempts).await
}

/// Authenticate the configured administrative account.
///
/// # Errors
///
/// Returns [`Error::AuthenticationFailed`] when the IdP rejects the admin
/// grant.
pub async fn authenticate_admin(idp: &IdpClient, config: &IdpConfig) -> Result<AuthOutcome> {
    let attempt = admin_grant_attempt(config);
    negotiate(idp, &config.admin_token_url(), vec![attempt]).await
}

/// Constant-time comparison of the caller-submitted secret proof against the
/// live secret.
#[must_use]
pub fn secret_matches(provided: &str, live: &str) -> bool {
    provided.as_bytes().ct_eq(live.as_bytes()).into()
}

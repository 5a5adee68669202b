//! Configuration management

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Realm holding the administrative account. Fixed by the IdP, not by the
/// configured realm.
pub const ADMIN_REALM: &str = "master";

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// IdP connection configuration
    pub idp: IdpConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Path of the OpenAPI document served at `GET /swagger.yml`
    pub swagger_file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            swagger_file: PathBuf::from("swagger.yml"),
        }
    }
}

/// IdP connection and account configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct IdpConfig {
    /// IdP base URL, e.g. `https://idp.example.com`
    pub url: String,
    /// Realm holding the managed clients and the caller accounts
    pub realm: String,
    /// Public client used for the resource-owner password grant
    pub public_client_id: String,
    /// Secret of the public client
    pub public_client_secret: String,
    /// Client used for the administrative grant
    pub admin_client_id: String,
    /// Secret of the administrative client
    pub admin_client_secret: String,
    /// Administrative account name
    pub admin_username: String,
    /// Administrative account password
    pub admin_password: String,
}

impl Config {
    /// Load configuration: defaults, then optional YAML file, then
    /// `IDP_GATEWAY_*` environment variables (`__` as nesting separator).
    ///
    /// `.env.local` and `.env` in the working directory are loaded into the
    /// process environment first, so they participate in the environment
    /// layer. `.env.local` takes precedence for overlapping keys.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // dotenvy never overwrites keys that are already set, so the
        // higher-precedence file goes first. Missing files are skipped.
        for file in [".env.local", ".env"] {
            if let Ok(p) = dotenvy::from_filename(file) {
                tracing::debug!(path = %p.display(), "Loaded env file");
            }
        }

        let mut figment = Figment::new();

        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        figment = figment.merge(Env::prefixed("IDP_GATEWAY_").split("__"));

        let mut config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        // Endpoint templates assume no trailing slash on the base URL
        config.idp.url = config.idp.url.trim_end_matches('/').to_string();

        Ok(config)
    }

    /// Check that every field the gateway cannot run without is present.
    ///
    /// # Errors
    ///
    /// Returns a [`Error::Config`] naming the first missing or invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.idp.url.is_empty() {
            return Err(Error::Config("idp.url is required".to_string()));
        }
        Url::parse(&self.idp.url)
            .map_err(|e| Error::Config(format!("idp.url is not a valid URL: {e}")))?;
        if self.idp.realm.is_empty() {
            return Err(Error::Config("idp.realm is required".to_string()));
        }
        if self.idp.public_client_id.is_empty() {
            return Err(Error::Config("idp.public_client_id is required".to_string()));
        }
        if self.idp.admin_client_id.is_empty() {
            return Err(Error::Config("idp.admin_client_id is required".to_string()));
        }
        if self.idp.admin_username.is_empty() {
            return Err(Error::Config("idp.admin_username is required".to_string()));
        }
        Ok(())
    }
}

impl IdpConfig {
    /// Token endpoint of a realm
    #[must_use]
    pub fn token_url(&self, realm: &str) -> String {
        format!(
            "{}/auth/realms/{realm}/protocol/openid-connect/token",
            self.url
        )
    }

    /// Token endpoint used for caller negotiation (configured realm)
    #[must_use]
    pub fn caller_token_url(&self) -> String {
        self.token_url(&self.realm)
    }

    /// Token endpoint used for administrative negotiation (`master` realm)
    #[must_use]
    pub fn admin_token_url(&self) -> String {
        self.token_url(ADMIN_REALM)
    }

    /// Clients collection endpoint
    #[must_use]
    pub fn clients_url(&self) -> String {
        format!("{}/auth/admin/realms/{}/clients", self.url, self.realm)
    }

    /// Single client endpoint, addressed by the internal UUID
    #[must_use]
    pub fn client_url(&self, id: &str) -> String {
        format!("{}/{id}", self.clients_url())
    }

    /// Client secret endpoint, addressed by the internal UUID
    #[must_use]
    pub fn client_secret_url(&self, id: &str) -> String {
        format!("{}/{id}/client-secret", self.clients_url())
    }

    /// Users collection endpoint
    #[must_use]
    pub fn users_url(&self) -> String {
        format!("{}/auth/admin/realms/{}/users", self.url, self.realm)
    }

    /// Single user endpoint, addressed by the internal UUID
    #[must_use]
    pub fn user_url(&self, id: &str) -> String {
        format!("{}/{id}", self.users_url())
    }

    /// Password reset endpoint of a user
    #[must_use]
    pub fn reset_password_url(&self, id: &str) -> String {
        format!("{}/{id}/reset-password", self.users_url())
    }

    /// Admin console root, probed by the health check
    #[must_use]
    pub fn check_url(&self) -> String {
        format!("{}/auth/admin", self.url)
    }
}

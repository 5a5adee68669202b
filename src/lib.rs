//! IdP Gateway Library
//!
//! HTTP façade in front of an identity provider's admin REST API for
//! self-service OAuth client management.
//!
//! # Features
//!
//! - **Grant Negotiation**: one Basic credential pair tried as a password
//!   grant, then as a client-credentials grant; first accepted grant wins
//! - **Secret-Gated Mutations**: update and delete require proof of the
//!   live client secret, compared in constant time
//! - **Typed IdP Client**: client CRUD, secret retrieval, user provisioning
//!   and health probing with normalized upstream errors
//! - **Stable Error Contract**: decimal error codes with upstream failure
//!   text passed through verbatim

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod idp;

pub use error::{ApiError, Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}

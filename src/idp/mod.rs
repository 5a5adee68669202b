//! IdP integration
//!
//! Typed client and wire types for the identity provider's admin REST API:
//! token exchange, client CRUD with secret retrieval, and user provisioning.

mod client;
pub mod model;

pub use client::IdpClient;
pub use model::{
    ClientDefinition, ClientRecord, ClientSecret, MutationPayload, TokenResponse, UserCredential,
    UserDefinition, UserRecord,
};

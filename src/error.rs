//! Error types for the IdP gateway

use std::io;

use axum::{Json, http::StatusCode, response::IntoResponse, response::Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for the IdP gateway
pub type Result<T> = std::result::Result<T, Error>;

/// IdP gateway errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Inbound request carried no usable Basic-Auth header
    #[error("Invalid basic auth headers")]
    InvalidBasicAuth,

    /// Every grant attempt was rejected by the IdP.
    /// Carries the raw upstream message of the last attempt.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Submitted client secret does not match the IdP-held secret
    #[error("Bad client secret")]
    BadClientSecret,

    /// Inbound request body does not decode
    #[error("Invalid request payload")]
    InvalidPayload,

    /// Inbound request body decodes but lacks required fields
    #[error("Missing required fields")]
    MissingRequiredFields,

    /// Resource or endpoint not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// IdP answered outside the success statuses.
    /// Carries the raw upstream body text.
    #[error("IdP error: {0}")]
    Upstream(String),

    /// Transport error reaching the IdP
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// JSON error (malformed IdP response body)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error body shape returned to inbound callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Decimal error code string, see [`codes`]
    pub code: String,
    /// Diagnostic text; raw upstream body for code `10000`
    pub message: String,
}

impl ApiError {
    /// Create an error body
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl Error {
    /// HTTP status this error answers with
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidBasicAuth | Self::AuthenticationFailed(_) | Self::BadClientSecret => {
                StatusCode::UNAUTHORIZED
            }
            Self::InvalidPayload | Self::MissingRequiredFields => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Wire body for this error
    #[must_use]
    pub fn api_error(&self) -> ApiError {
        match self {
            Self::InvalidBasicAuth => ApiError::new(codes::INVALID_BASIC_AUTH, "Invalid basic auth headers"),
            Self::AuthenticationFailed(message) => ApiError::new(codes::UPSTREAM_FAILURE, message.clone()),
            Self::BadClientSecret => ApiError::new(codes::BAD_CLIENT_SECRET, "Bad client secret"),
            Self::InvalidPayload => ApiError::new(codes::INVALID_REQUEST_PAYLOAD, "Invalid Request payload"),
            Self::MissingRequiredFields => ApiError::new(codes::MISSING_REQUIRED_FIELDS, "Missing required fields"),
            Self::NotFound(message) => ApiError::new(codes::NOT_FOUND, message.clone()),
            Self::Upstream(body) => ApiError::new(codes::UPSTREAM_FAILURE, body.clone()),
            Self::Transport(e) => ApiError::new(codes::UPSTREAM_FAILURE, e.to_string()),
            Self::Config(m) | Self::Internal(m) => ApiError::new(codes::INTERNAL_SERVER_ERROR, m.clone()),
            Self::Json(e) => ApiError::new(codes::INTERNAL_SERVER_ERROR, e.to_string()),
            Self::Io(e) => ApiError::new(codes::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status(), Json(self.api_error())).into_response()
    }
}

/// API error codes, decimal strings on the wire.
///
/// The full vocabulary of the API contract; 1001-1002 and 1004-1006 are
/// reserved and not produced by the current surface.
pub mod codes {
    /// Endpoint or resource not found
    pub const NOT_FOUND: &str = "1000";
    /// Endpoint exists but is not implemented
    pub const NOT_IMPLEMENTED: &str = "1001";
    /// Invalid object id
    pub const INVALID_ID: &str = "1002";
    /// Request payload does not decode
    pub const INVALID_REQUEST_PAYLOAD: &str = "1003";
    /// Query param specified but value missing
    pub const MISSING_QUERY_PARAM: &str = "1004";
    /// Bad `start` query param value
    pub const BAD_START_PARAM: &str = "1005";
    /// Bad `count` query param value
    pub const BAD_COUNT_PARAM: &str = "1006";
    /// Required fields missing from payload
    pub const MISSING_REQUIRED_FIELDS: &str = "1007";
    /// Basic-Auth header absent or undecodable
    pub const INVALID_BASIC_AUTH: &str = "1008";
    /// Submitted client secret does not match
    pub const BAD_CLIENT_SECRET: &str = "1009";
    /// Internal server error
    pub const INTERNAL_SERVER_ERROR: &str = "1010";
    /// IdP reported a failure; message carries the upstream body
    pub const UPSTREAM_FAILURE: &str = "10000";
}

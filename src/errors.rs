use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Startup configuration failures.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Failures of the session store while resolving or managing a session.
///
/// The access gate never surfaces these: a request whose session cannot be resolved is
/// handled as anonymous.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Transport-level failure talking to the auth service.
    #[error("auth service unreachable: {0}")]
    Unreachable(#[from] reqwest::Error),

    /// The auth service answered with a server-side error.
    #[error("auth service returned {status}")]
    Backend { status: u16 },

    /// Credentials rejected on sign-in.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The auth service issued a token this server cannot verify.
    #[error("issued token rejected: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

/// Failures of the profile directory and catalog lookups.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A profile row carries a role string outside the known set.
    #[error("unknown role {0:?}")]
    InvalidRole(String),
}

/// Errors returned by HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Session(SessionError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            ApiError::Session(_) => StatusCode::BAD_GATEWAY,
            ApiError::Lookup(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client; backend details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Session(SessionError::InvalidCredentials) => "Invalid credentials".to_string(),
            ApiError::Session(_) => "Authentication service unavailable".to_string(),
            ApiError::Lookup(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(json!({ "error": self.user_message() }))).into_response()
    }
}

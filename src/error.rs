//! Error types for the HTTP front door

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use eks_toggle_common::ErrorKind;
use tracing::warn;

use crate::server::ToggleResponse;

/// Result type for front-door operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for front-door operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failure reported by the toggle crates
    #[error(transparent)]
    Toggle(#[from] eks_toggle_common::Error),

    /// Listener or runtime failure
    #[error("server error: {0}")]
    Server(String),
}

impl Error {
    pub(crate) fn status(&self) -> StatusCode {
        match self {
            Error::Toggle(e) if e.kind() == ErrorKind::Validation => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            Error::Toggle(e) => e.public_message(),
            Error::Server(_) => "unexpected internal error".to_string(),
        }
    }

    /// Response body; same envelope as toggle responses so chat clients render both
    pub(crate) fn envelope(&self) -> ToggleResponse {
        let outcome = if self.status() == StatusCode::BAD_REQUEST {
            "invalid_request"
        } else {
            "failure"
        };

        if let Error::Toggle(e) = self {
            warn!(
                cluster = e.cluster().unwrap_or("-"),
                provider = e.provider().unwrap_or("-"),
                error = %e,
                "Request rejected"
            );
        }

        ToggleResponse {
            response_type: "ephemeral".to_string(),
            text: self.public_message(),
            outcome: outcome.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (self.status(), axum::Json(self.envelope())).into_response()
    }
}

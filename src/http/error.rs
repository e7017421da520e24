//! Caller-facing errors.
//!
//! Anything that goes wrong before the backend answered, or on the viewer
//! paths, ends here. Callers only ever see a bare status line; details go to
//! the log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::storage::StoreError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Which body could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySide {
    Inbound,
    Backend,
}

impl std::fmt::Display for BodySide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BodySide::Inbound => write!(f, "inbound request"),
            BodySide::Backend => write!(f, "backend response"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("backend unavailable: {0}")]
    UpstreamUnavailable(#[source] reqwest::Error),

    #[error("failed to read {side} body: {source}")]
    BodyRead {
        side: BodySide,
        #[source]
        source: BoxError,
    },

    #[error("call record {0} not found")]
    NotFound(i64),

    #[error("stored {which} body is not a chat completion payload: {source}")]
    MalformedStoredPayload {
        which: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("call store: {0}")]
    Store(#[from] StoreError),

    #[error("forwarding task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }
        let reason = status.canonical_reason().unwrap_or("Error");
        (status, reason).into_response()
    }
}

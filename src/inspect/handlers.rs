use axum::{
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse},
};

use crate::capture::codec;
use crate::http::error::GatewayError;
use crate::http::server::AppState;
use crate::inspect::payload::{ChatRequest, ChatResponse};
use crate::inspect::render::{self, CallDetail};

/// Parse a `/_show/{id}` segment. Signs are accepted, anything else is not.
pub fn parse_call_id(raw: &str) -> Result<i64, GatewayError> {
    raw.parse::<i64>()
        .map_err(|_| GatewayError::BadRequest(format!("`{raw}` is not a call id")))
}

pub async fn list_calls(State(state): State<AppState>) -> Result<Html<String>, GatewayError> {
    let records = state.store.recent(state.config.storage.list_limit).await?;
    Ok(Html(render::render_list(&records)))
}

pub async fn show_call(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Html<String>, GatewayError> {
    let id = parse_call_id(&raw_id)?;
    let record = state.store.get(id).await?.ok_or(GatewayError::NotFound(id))?;

    let request: ChatRequest = serde_json::from_slice(&record.request_body).map_err(|source| {
        GatewayError::MalformedStoredPayload {
            which: "request",
            source,
        }
    })?;

    let response_body = codec::decode_for_display(&record.response_body).unwrap_or_else(|e| {
        tracing::warn!(id, error = %e, "Stored response does not decode, parsing as stored");
        std::borrow::Cow::Borrowed(record.response_body.as_slice())
    });
    let response: ChatResponse = serde_json::from_slice(&response_body).map_err(|source| {
        GatewayError::MalformedStoredPayload {
            which: "response",
            source,
        }
    })?;

    Ok(Html(render::render_show(&CallDetail {
        record: &record,
        response_len: response_body.len(),
        request: &request,
        response: &response,
    })))
}

pub async fn show_missing_id() -> GatewayError {
    GatewayError::BadRequest("missing call id".into())
}

/// Blank icon so browsers stop asking the backend for one.
pub async fn favicon() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/x-icon")], "")
}

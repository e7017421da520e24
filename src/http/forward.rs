//! Forwarding engine.
//!
//! # Responsibilities
//! - Buffer the inbound body and rebuild the request against the backend
//! - Copy every inbound header, then inject the configured credentials
//! - Time the wait for backend response headers
//! - Capture both bodies into one call record
//! - Return the backend's status, headers and raw bytes untouched
//!
//! # Design Decisions
//! - Failures before the backend answers become a generic 500 with no record
//! - Failures after it answers (dump, decode, insert) are advisory: logged,
//!   never shown to the caller
//! - No retries and no timeout beyond the transport defaults
//! - A caller disconnect never cancels a call the backend may already be
//!   serving; the exchange runs on a detached task

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::header::{CONTENT_ENCODING, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use axum::http::uri::PathAndQuery;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::Response;
use tracing::Instrument;

use crate::capture::codec::{self, DecodeError};
use crate::capture::Credentials;
use crate::config::{BackendConfig, CaptureConfig};
use crate::http::error::{BodySide, GatewayError};
use crate::observability::{advisory, metrics};
use crate::storage::{CallStore, NewCallRecord, StoreError};

/// Why a call was answered but not recorded.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("decode response for storage: {0}")]
    Decode(#[from] DecodeError),

    #[error("persist call record: {0}")]
    Persist(#[from] StoreError),
}

/// Everything captured from one completed round trip.
struct CapturedCall<'a> {
    url_path: String,
    duration_ms: i64,
    request_body: &'a [u8],
    response_body: &'a [u8],
    content_encoding: Option<&'a HeaderValue>,
}

/// Forwards calls to the single configured backend and records them.
pub struct Forwarder {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    store: CallStore,
    response_dump_path: Option<PathBuf>,
}

impl Forwarder {
    pub fn new(
        backend: &BackendConfig,
        capture: &CaptureConfig,
        credentials: Credentials,
        store: CallStore,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if !backend.use_system_proxy {
            builder = builder.no_proxy();
        }
        let response_dump_path = Some(capture.response_dump_path.trim())
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            client: builder.build()?,
            base_url: backend.base_url.trim_end_matches('/').to_string(),
            credentials,
            store,
            response_dump_path,
        })
    }

    pub fn store(&self) -> &CallStore {
        &self.store
    }

    /// Like [`Forwarder::forward`], but on its own task.
    ///
    /// The backend exchange and its capture run to completion even when the
    /// caller hangs up and the handler future is dropped.
    pub async fn forward_detached(
        self: Arc<Self>,
        request: Request,
    ) -> Result<Response, GatewayError> {
        let exchange = async move { self.forward(request).await };
        tokio::spawn(exchange.instrument(tracing::Span::current())).await?
    }

    /// Forward one inbound request and return the backend's answer verbatim.
    pub async fn forward(&self, request: Request) -> Result<Response, GatewayError> {
        let (parts, body) = request.into_parts();
        let method = parts.method.to_string();
        let url_path = parts.uri.path().to_string();

        let request_body = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| GatewayError::BodyRead {
                side: BodySide::Inbound,
                source: e.into(),
            })?;

        let outbound = self
            .client
            .request(parts.method, target_url(&self.base_url, &parts.uri))
            .headers(outbound_headers(&parts.headers, &self.credentials))
            .body(request_body.clone())
            .build()
            .map_err(|e| {
                metrics::record_upstream_error(&method);
                GatewayError::UpstreamUnavailable(e)
            })?;

        let started = Instant::now();
        let result = self.client.execute(outbound).await;
        let backend_wait = started.elapsed();

        let response = result.map_err(|e| {
            metrics::record_upstream_error(&method);
            GatewayError::UpstreamUnavailable(e)
        })?;
        let duration_ms = i64::try_from(backend_wait.as_millis()).unwrap_or(i64::MAX);
        let status = response.status();
        let headers = response.headers().clone();
        metrics::record_forwarded(&method, status.as_u16(), backend_wait);

        let response_body = response.bytes().await.map_err(|e| GatewayError::BodyRead {
            side: BodySide::Backend,
            source: e.into(),
        })?;

        tracing::info!(
            method = %method,
            path = %url_path,
            status = status.as_u16(),
            duration_ms,
            "Forwarded call"
        );

        let call = CapturedCall {
            url_path,
            duration_ms,
            request_body: &request_body,
            response_body: &response_body,
            content_encoding: headers.get(CONTENT_ENCODING),
        };
        advisory::report("capture call record", self.capture(call).await);

        Ok(passthrough_response(status, &headers, response_body))
    }

    async fn capture(&self, call: CapturedCall<'_>) -> Result<i64, CaptureError> {
        if let Some(path) = &self.response_dump_path {
            advisory::quiet(
                "write response dump",
                tokio::fs::write(path, call.response_body).await,
            );
        }

        let stored = codec::decode_for_storage(call.response_body, call.content_encoding)
            .inspect_err(|_| metrics::record_capture_failure("decode"))?;

        let record = NewCallRecord {
            url_path: call.url_path,
            duration_ms: call.duration_ms,
            request_body: call.request_body.to_vec(),
            response_body: stored.into_owned(),
        };
        let id = self
            .store
            .insert(record)
            .await
            .inspect_err(|_| metrics::record_capture_failure("persist"))?;

        tracing::debug!(id, "Call recorded");
        Ok(id)
    }
}

/// `<base><path>?<query>`; the base has no trailing slash.
fn target_url(base_url: &str, uri: &Uri) -> String {
    let path_and_query = uri
        .path_and_query()
        .map(PathAndQuery::as_str)
        .unwrap_or("/");
    format!("{base_url}{path_and_query}")
}

/// Headers the HTTP client derives from the target URL and body.
fn is_transport_owned(name: &HeaderName) -> bool {
    *name == HOST || *name == CONTENT_LENGTH || *name == TRANSFER_ENCODING
}

fn outbound_headers(inbound: &HeaderMap, credentials: &Credentials) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len() + 2);
    for (name, value) in inbound {
        if is_transport_owned(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    credentials.apply(&mut headers);
    headers
}

fn passthrough_response(status: StatusCode, headers: &HeaderMap, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    let out = response.headers_mut();
    for (name, value) in headers {
        // Framing is redone by our own connection.
        if *name == TRANSFER_ENCODING {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    response
}

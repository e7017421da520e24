//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: inspection views plus the forwarding fallback
//! - Wire up middleware (per-request tracing span with a request ID)
//! - Serve on a bound listener until shutdown

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    response::Response,
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::capture::Credentials;
use crate::config::GatewayConfig;
use crate::http::error::GatewayError;
use crate::http::forward::Forwarder;
use crate::inspect;
use crate::lifecycle::shutdown::signalled;
use crate::storage::CallStore;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub forwarder: Arc<Forwarder>,
    pub store: CallStore,
}

/// HTTP server for the capture gateway.
pub struct GatewayServer {
    router: Router,
    config: Arc<GatewayConfig>,
}

impl GatewayServer {
    /// Create a new server. The store must already be open.
    pub fn new(
        config: GatewayConfig,
        store: CallStore,
        credentials: Credentials,
    ) -> Result<Self, reqwest::Error> {
        let config = Arc::new(config);
        let forwarder = Forwarder::new(
            &config.backend,
            &config.capture,
            credentials,
            store.clone(),
        )?;

        let state = AppState {
            config: config.clone(),
            forwarder: Arc::new(forwarder),
            store,
        };

        Ok(Self {
            router: Self::build_router(state),
            config,
        })
    }

    /// Reserved paths are served locally; everything else is forwarded.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/_list", get(inspect::handlers::list_calls))
            .route("/_show/", get(inspect::handlers::show_missing_id))
            .route("/_show/{*id}", get(inspect::handlers::show_call))
            .route("/favicon.ico", any(inspect::handlers::favicon))
            .fallback(forward_call)
            .with_state(state)
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "request",
                    request_id = %Uuid::new_v4(),
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend = %self.config.backend.base_url,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(signalled(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn forward_call(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, GatewayError> {
    state.forwarder.forward_detached(request).await
}

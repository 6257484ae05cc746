//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router with the request entry point
//! - Wire up middleware (request ID, tracing, timeout)
//! - Run every request in its own worker task behind the recovery middleware
//! - Stream the worker's output back to the client
//! - Bind server to listener and shut down gracefully

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::Instrument;

use crate::config::AppConfig;
use crate::handlers;
use crate::http::middleware::Recovery;
use crate::http::{Handler, HttpSink, X_REQUEST_ID};
use crate::routing::RouteError;

/// Application state injected into the entry handler.
#[derive(Clone)]
pub struct AppState {
    pub recovery: Arc<Recovery>,
}

/// HTTP server wrapping every request in panic recovery.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AppConfig) -> Result<Self, RouteError> {
        let routes = handlers::router(&config)?;
        let recovery = Arc::new(Recovery::new(Arc::new(routes), &config.recovery));

        tracing::debug!(
            mode = %config.recovery.mode,
            debug_path = %config.recovery.debug_path,
            "Recovery middleware installed"
        );

        let router = Self::build_router(&config, AppState { recovery });
        Ok(Self { router, config })
    }

    /// Build the axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered axum router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            mode = %self.config.recovery.mode,
            "HTTP server starting"
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

fn request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

/// Entry point for every request.
///
/// Spawns the request's worker task and answers with whatever that worker
/// writes into its sink.
async fn dispatch(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (mut sink, pending) = HttpSink::channel();
    let recovery = state.recovery.clone();

    tokio::spawn(
        async move {
            recovery.serve(request, &mut sink).await;
        }
        .instrument(tracing::Span::current()),
    );

    pending.into_response().await
}

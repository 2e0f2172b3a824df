//! Demo HTTP server.
//!
//! # Responsibilities
//! - Serve `GET /hello/{name}`
//! - Translate the axum request into a `ServerRequest` and dispatch it through
//!   the host valve
//! - Shut down gracefully on Ctrl+C

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::demo::valve::{DemoError, HostValve};
use crate::trace::ServerRequest;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub valve: Arc<HostValve>,
}

impl AppState {
    pub fn new(valve: HostValve) -> Self {
        Self {
            valve: Arc::new(valve),
        }
    }
}

/// Build the demo router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/hello/{name}", get(hello_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the server until Ctrl+C.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    serve_with_shutdown(listener, state, shutdown_signal()).await
}

/// Run the server until `signal` completes.
pub async fn serve_with_shutdown<S>(listener: TcpListener, state: AppState, signal: S) -> Result<(), std::io::Error>
where
    S: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(address = %addr, "Demo server starting");

    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app).with_graceful_shutdown(signal).await?;

    tracing::info!("Demo server stopped");
    Ok(())
}

async fn hello_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(name): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> impl IntoResponse {
    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let mut request = ServerRequest::new(method.as_str(), target).with_remote_addr(addr);
    for (header, value) in &headers {
        if let Ok(value) = value.to_str() {
            request = request.with_header(header.as_str(), value);
        }
    }

    match state.valve.invoke(&request, &name) {
        Ok(greeting) => (StatusCode::OK, greeting),
        Err(e) => {
            tracing::debug!(error = %e, name = %name, "Greeting rejected");
            let status = match e {
                DemoError::MissingMember { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            };
            (status, e.to_string())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

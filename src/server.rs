//! HTTP invocation boundary.
//!
//! Two request shapes reach the coordinator:
//!
//! - `GET /?key=1280x720/wind/surfing.jpg`
//! - `GET /1280x720/wind/surfing.jpg`
//!
//! The `accept` header is forwarded for encoding negotiation. The coordinator
//! runs on the blocking pool, since it does file I/O and CPU-bound resizing.
//! If that task dies, the request still gets a redirect to the master (or a
//! 403 for keys that never resolve): this boundary never answers 5xx.

use crate::coordinator::RequestCoordinator;
use crate::imaging::ImageBackend;
use crate::response::ResponseDescriptor;
use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Debug, Deserialize)]
struct KeyQuery {
    key: Option<String>,
}

/// Build the router for a shared coordinator.
pub fn router<B: ImageBackend + 'static>(coordinator: Arc<RequestCoordinator<B>>) -> Router {
    Router::new()
        .route("/", get(by_query::<B>))
        .route("/{*key}", get(by_path::<B>))
        .layer(TraceLayer::new_for_http())
        .with_state(coordinator)
}

async fn by_query<B: ImageBackend + 'static>(
    State(coordinator): State<Arc<RequestCoordinator<B>>>,
    Query(query): Query<KeyQuery>,
    headers: HeaderMap,
) -> Response {
    dispatch(coordinator, query.key.unwrap_or_default(), accept(&headers)).await
}

async fn by_path<B: ImageBackend + 'static>(
    State(coordinator): State<Arc<RequestCoordinator<B>>>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Response {
    dispatch(coordinator, key, accept(&headers)).await
}

fn accept(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

async fn dispatch<B: ImageBackend + 'static>(
    coordinator: Arc<RequestCoordinator<B>>,
    key: String,
    accept: Option<String>,
) -> Response {
    let worker = Arc::clone(&coordinator);
    let worker_key = key.clone();
    let task =
        tokio::task::spawn_blocking(move || worker.respond(&worker_key, accept.as_deref()));

    let descriptor = match task.await {
        Ok(descriptor) => descriptor,
        Err(e) => {
            error!(key = %key, error = %e, "request task failed");
            coordinator.describe(&coordinator.fallback_for(&key))
        }
    };
    into_response(descriptor)
}

/// Convert a descriptor into an HTTP response.
///
/// Header values are passed through as bytes, so keys with non-ASCII
/// characters still produce a `Location` header.
pub fn into_response(descriptor: ResponseDescriptor) -> Response {
    let status =
        StatusCode::from_u16(descriptor.status_code).unwrap_or(StatusCode::MOVED_PERMANENTLY);
    let mut headers = HeaderMap::new();
    for (name, value) in &descriptor.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(header = %name, "dropping unrepresentable header"),
        }
    }
    (status, headers, descriptor.body).into_response()
}

/// Serve until Ctrl-C.
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    info!(address = %listener.local_addr()?, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

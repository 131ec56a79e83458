//! Serves whatever path is given at `/file?path=...`, absolute or relative
//! to the working directory. There is no path restriction, so run it only
//! for local testing.
//!
//! ```text
//! cargo run --example serve
//! curl -H 'Range: bytes=0-99' 'http://127.0.0.1:3000/file?path=test/fixture.txt'
//! ```

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use range_stream::{RangeStreamer, StreamConfig, StreamError};

#[derive(Debug, Clone, Deserialize)]
struct FileRequest {
    path: String,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let shutdown = CancellationToken::new();
    let router = Router::new()
        .route("/", get(|| async { "Hello, World!" }))
        .route("/file", get(get_file))
        .with_state(shutdown.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await.unwrap();
    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            shutdown.cancel();
        })
        .await
        .unwrap();
}

async fn get_file(
    State(shutdown): State<CancellationToken>,
    headers: HeaderMap,
    Query(q): Query<FileRequest>,
) -> Response {
    let streamer = match RangeStreamer::from_headers(&q.path, &headers, StreamConfig::default()).await {
        Ok(streamer) => streamer,
        Err(StreamError::NotFound(path)) => {
            return (StatusCode::NOT_FOUND, format!("File not found: {}", path.display())).into_response();
        }
        Err(e) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)).into_response();
        }
    };

    // hyper drops the body when the client goes away, which releases the
    // file; the token also cuts long downloads short on shutdown
    let descriptor = streamer.response();
    match streamer.into_body_with(shutdown) {
        Some(body) => (descriptor.status(), descriptor.header_map(), body).into_response(),
        None => descriptor.into_response(),
    }
}

use std::net::SocketAddr;

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use range_stream::{RangeStreamer, StreamConfig, StreamError};

const FIXTURE: &str = "Hello world this is a file to test range requests on!\n";

#[derive(Debug, Deserialize)]
struct FileRequest {
    path: String,
}

async fn get_file(headers: HeaderMap, Query(q): Query<FileRequest>) -> Response {
    let config = StreamConfig { buffer_size: 8, ..StreamConfig::default() };
    match RangeStreamer::from_headers(&q.path, &headers, config).await {
        Ok(streamer) => streamer.into_response(),
        Err(StreamError::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new().route("/file", get(get_file));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{}/file?path={}", addr, path)
}

#[tokio::test]
async fn test_full_file() {
    let addr = spawn_server().await;
    let response = reqwest::get(url(addr, "test/fixture.txt")).await.unwrap();

    assert_eq!(reqwest::StatusCode::OK, response.status());
    let headers = response.headers();
    assert_eq!(headers["content-length"], "54");
    assert_eq!(headers["content-type"], "text/plain");
    assert_eq!(headers["accept-ranges"], "0-53");
    assert_eq!(headers["cache-control"], "max-age=2592000, public");
    assert_eq!(headers["content-disposition"], "inline; filename=\"fixture.txt\"");
    assert!(headers.contains_key("expires"));
    assert!(headers.contains_key("last-modified"));
    assert!(!headers.contains_key("content-range"));

    assert_eq!(FIXTURE, response.text().await.unwrap());
}

#[tokio::test]
async fn test_partial_content() {
    let addr = spawn_server().await;
    let response = reqwest::Client::new()
        .get(url(addr, "test/fixture.txt"))
        .header("Range", "bytes=12-29")
        .send()
        .await
        .unwrap();

    assert_eq!(reqwest::StatusCode::PARTIAL_CONTENT, response.status());
    assert_eq!(response.headers()["content-range"], "bytes 12-29/54");
    assert_eq!(response.headers()["content-length"], "18");
    assert_eq!("this is a file to ", response.text().await.unwrap());
}

#[tokio::test]
async fn test_range_not_satisfiable() {
    let addr = spawn_server().await;
    let response = reqwest::Client::new()
        .get(url(addr, "test/fixture.txt"))
        .header("Range", "bytes=1000000-2000000")
        .send()
        .await
        .unwrap();

    assert_eq!(reqwest::StatusCode::RANGE_NOT_SATISFIABLE, response.status());
    assert_eq!(response.headers()["content-range"], "bytes 1000000-2000000/54");
    assert_eq!(response.headers()["accept-ranges"], "0-53");
    assert!(!response.headers().contains_key("content-type"));
    assert!(response.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_file() {
    let addr = spawn_server().await;
    let response = reqwest::get(url(addr, "test/nope.mp4")).await.unwrap();
    assert_eq!(reqwest::StatusCode::NOT_FOUND, response.status());
}

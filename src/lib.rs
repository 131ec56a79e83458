//! # range-stream
//!
//! Serves one file over HTTP with single byte-range support, for clients
//! such as video players that seek inside large media files.
//!
//! A [`RangeStreamer`] is created from a path and the raw value of the
//! request's `Range` header. It stats the file, resolves the range, and
//! then hands out a [`ResponseDescriptor`] (status and headers) and a
//! [`RangedStream`] body that reads the requested span in bounded chunks.
//! The streamer also implements axum's [`IntoResponse`] directly.
//!
//! ```no_run
//! use axum::Router;
//! use axum::http::HeaderMap;
//! use axum::response::{IntoResponse, Response};
//! use axum::routing::get;
//!
//! use range_stream::{RangeStreamer, StreamConfig, StreamError};
//!
//! async fn movie(headers: HeaderMap) -> Response {
//!     match RangeStreamer::from_headers("movie.mp4", &headers, StreamConfig::default()).await {
//!         Ok(streamer) => streamer.into_response(),
//!         Err(StreamError::NotFound(_)) => axum::http::StatusCode::NOT_FOUND.into_response(),
//!         Err(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response(),
//!     }
//! }
//!
//! let _app = Router::<()>::new().route("/movie", get(movie));
//! ```

mod config;
mod error;
mod file;
mod range;
mod response;
mod stream;

use std::path::Path;
use std::time::SystemTime;

use axum::body::Body;
use axum::http::header::RANGE;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeek};
use tokio_util::sync::CancellationToken;

pub use config::{StreamConfig, DEFAULT_BUFFER_SIZE, DEFAULT_CACHE_MAX_AGE, DEFAULT_MIME};
pub use error::{StreamError, StreamResult};
pub use file::FileDescriptor;
pub use range::ByteRange;
pub use response::ResponseDescriptor;
pub use stream::RangedStream;

/// A readable, seekable byte source a [`RangedStream`] can serve from.
pub trait RangeSource: AsyncRead + AsyncSeek + Unpin + Send + 'static {}

impl<T: AsyncRead + AsyncSeek + Unpin + Send + 'static> RangeSource for T {}

/// Range negotiation for a single file and a single request.
///
/// Construction only stats the file. The handle is opened when the body is
/// first polled, so [`StreamError::OpenFailed`] surfaces from the body
/// stream rather than from [`RangeStreamer::create`].
#[derive(Debug, Clone)]
pub struct RangeStreamer {
    file: FileDescriptor,
    range: ByteRange,
    partial: bool,
    config: StreamConfig,
}

impl RangeStreamer {
    /// Creates a streamer with the default [`StreamConfig`].
    ///
    /// `range` is the raw `Range` header value, if the request had one.
    pub async fn create(path: impl AsRef<Path>, range: Option<&str>) -> StreamResult<RangeStreamer> {
        RangeStreamer::with_config(path, range, StreamConfig::default()).await
    }

    /// Creates a streamer, validating `config` first.
    pub async fn with_config(
        path: impl AsRef<Path>,
        range: Option<&str>,
        config: StreamConfig,
    ) -> StreamResult<RangeStreamer> {
        config.validate()?;

        let file = FileDescriptor::stat(path, &config.default_mime).await?;
        let size = file.byte_size();
        let partial = range.is_some();
        let range = match range {
            Some(value) => range::parse_range_header(value).resolve(size),
            None => ByteRange::full(size),
        };

        tracing::debug!(
            path = %file.path().display(),
            size,
            mime = file.mime(),
            start = range.start,
            end = range.end,
            partial,
            satisfiable = range.is_satisfiable(size),
            "resolved range"
        );

        Ok(RangeStreamer { file, range, partial, config })
    }

    /// Like [`RangeStreamer::with_config`], reading `Range` from a request's
    /// headers. Bytes that are not valid UTF-8 are replaced before parsing,
    /// so such a header still counts as present.
    pub async fn from_headers(
        path: impl AsRef<Path>,
        headers: &HeaderMap,
        config: StreamConfig,
    ) -> StreamResult<RangeStreamer> {
        let range = headers
            .get(RANGE)
            .map(|value| String::from_utf8_lossy(value.as_bytes()));
        RangeStreamer::with_config(path, range.as_deref(), config).await
    }

    pub fn file(&self) -> &FileDescriptor {
        &self.file
    }

    /// The resolved range. For an unsatisfiable request this is the range as
    /// asked for, not clamped to the file.
    pub fn range(&self) -> ByteRange {
        self.range
    }

    /// Whether the request carried a `Range` header.
    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub fn is_satisfiable(&self) -> bool {
        self.range.is_satisfiable(self.file.byte_size())
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Status and headers for this request. `Expires` is computed from the
    /// current time.
    pub fn response(&self) -> ResponseDescriptor {
        ResponseDescriptor::build(&self.file, self.range, self.partial, &self.config, SystemTime::now())
    }

    /// The body for this request, or `None` when the range is not
    /// satisfiable and nothing may be streamed.
    pub fn into_body(self) -> Option<RangedStream<File>> {
        if !self.is_satisfiable() {
            return None;
        }
        let path = self.file.path().to_path_buf();
        let open = FileDescriptor::open(path.clone());
        Some(RangedStream::new(open, path, self.range, self.config.buffer_size))
    }

    /// Like [`RangeStreamer::into_body`], stopping with
    /// [`StreamError::Cancelled`] once `cancel` fires.
    pub fn into_body_with(self, cancel: CancellationToken) -> Option<RangedStream<File>> {
        self.into_body().map(|stream| stream.with_cancellation(cancel))
    }
}

impl IntoResponse for RangeStreamer {
    fn into_response(self) -> Response {
        let descriptor = self.response();
        let body = match self.into_body() {
            Some(stream) => Body::new(stream),
            None => Body::empty(),
        };

        let mut response = Response::new(body);
        *response.status_mut() = descriptor.status();
        *response.headers_mut() = descriptor.header_map();
        response
    }
}

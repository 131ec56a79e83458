use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::response::{IntoResponse, Response};
use bytes::{BufMut, Bytes, BytesMut};
use futures::future::BoxFuture;
use futures::Stream;
use http_body::{Body, Frame, SizeHint};
use pin_project::pin_project;
use tokio::io::AsyncSeek;
use tokio_util::io::poll_read_buf;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::{ByteRange, RangeSource, StreamError};

/// Response body for one byte range. Implements [`Stream`], [`Body`], and
/// [`IntoResponse`].
///
/// The source is opened on the first poll, and dropped as soon as the range
/// is exhausted, end of file is reached, an error is returned, or the
/// cancellation token fires. Dropping the stream early drops the source
/// with it. No chunk is longer than the configured buffer size.
#[pin_project]
pub struct RangedStream<B> {
    state: StreamState<B>,
    source: Option<B>,
    path: PathBuf,
    range: ByteRange,
    buffer_size: usize,
    #[pin]
    cancelled: Option<WaitForCancellationFutureOwned>,
}

enum StreamState<B> {
    Opening(BoxFuture<'static, io::Result<B>>),
    Seeking { remaining: u64 },
    Reading { buffer: BytesMut, remaining: u64 },
    Done,
}

impl<B: RangeSource> RangedStream<B> {
    /// `open` is not polled until the first chunk is requested.
    pub(crate) fn new<F>(open: F, path: PathBuf, range: ByteRange, buffer_size: usize) -> Self
    where
        F: Future<Output = io::Result<B>> + Send + 'static,
    {
        RangedStream {
            state: StreamState::Opening(Box::pin(open)),
            source: None,
            path,
            range,
            buffer_size,
            cancelled: None,
        }
    }

    pub(crate) fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancelled = Some(token.cancelled_owned());
        self
    }

    /// The span this stream produces.
    pub fn range(&self) -> ByteRange {
        self.range
    }

    /// Whether the source is currently held open.
    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }
}

impl<B> std::fmt::Debug for RangedStream<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangedStream")
            .field("path", &self.path)
            .field("range", &self.range)
            .field("buffer_size", &self.buffer_size)
            .field("open", &self.source.is_some())
            .finish()
    }
}

impl<B: RangeSource> IntoResponse for RangedStream<B> {
    fn into_response(self) -> Response {
        Response::new(axum::body::Body::new(self))
    }
}

impl<B: RangeSource> Body for RangedStream<B> {
    type Data = Bytes;
    type Error = StreamError;

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.range.len())
    }

    fn is_end_stream(&self) -> bool {
        matches!(self.state, StreamState::Done)
    }

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>)
        -> Poll<Option<Result<Frame<Bytes>, StreamError>>>
    {
        self.poll_next(cx).map(|item| item.map(|result| result.map(Frame::data)))
    }
}

impl<B: RangeSource> Stream for RangedStream<B> {
    type Item = Result<Bytes, StreamError>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, StreamError>>> {
        let mut this = self.project();

        if matches!(*this.state, StreamState::Done) {
            return Poll::Ready(None);
        }

        if let Some(cancelled) = this.cancelled.as_mut().as_pin_mut() {
            if cancelled.poll(cx).is_ready() {
                tracing::warn!(path = %this.path.display(), "stream cancelled");
                this.cancelled.set(None);
                release(this.state, this.source, this.path);
                return Poll::Ready(Some(Err(StreamError::Cancelled)));
            }
        }

        loop {
            match &mut *this.state {
                StreamState::Opening(open) => {
                    let mut source = match open.as_mut().poll(cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Err(source)) => {
                            tracing::warn!(path = %this.path.display(), error = %source, "open failed");
                            *this.state = StreamState::Done;
                            let path = this.path.clone();
                            return Poll::Ready(Some(Err(StreamError::OpenFailed { path, source })));
                        }
                        Poll::Ready(Ok(source)) => source,
                    };
                    tracing::debug!(path = %this.path.display(), "opened file handle");

                    let start = io::SeekFrom::Start(this.range.start);
                    if let Err(e) = Pin::new(&mut source).start_seek(start) {
                        *this.state = StreamState::Done;
                        return Poll::Ready(Some(Err(e.into())));
                    }
                    *this.source = Some(source);
                    *this.state = StreamState::Seeking { remaining: this.range.len() };
                }

                StreamState::Seeking { remaining } => {
                    let remaining = *remaining;
                    let Some(source) = this.source.as_mut() else {
                        *this.state = StreamState::Done;
                        return Poll::Ready(None);
                    };
                    match Pin::new(source).poll_complete(cx) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Err(e)) => {
                            release(this.state, this.source, this.path);
                            return Poll::Ready(Some(Err(e.into())));
                        }
                        Poll::Ready(Ok(_)) => {
                            let buffer = BytesMut::new();
                            *this.state = StreamState::Reading { buffer, remaining };
                        }
                    }
                }

                StreamState::Reading { buffer, remaining } => {
                    if *remaining == 0 {
                        release(this.state, this.source, this.path);
                        return Poll::Ready(None);
                    }
                    let Some(source) = this.source.as_mut() else {
                        *this.state = StreamState::Done;
                        return Poll::Ready(None);
                    };

                    // never read past the end of the range, even when the
                    // buffer could hold more
                    let nbytes = std::cmp::min(
                        *this.buffer_size,
                        usize::try_from(*remaining).unwrap_or(usize::MAX),
                    );
                    buffer.reserve(nbytes);

                    let mut limited = (&mut *buffer).limit(nbytes);
                    match poll_read_buf(Pin::new(source), cx, &mut limited) {
                        Poll::Pending => return Poll::Pending,
                        Poll::Ready(Err(e)) => {
                            release(this.state, this.source, this.path);
                            return Poll::Ready(Some(Err(e.into())));
                        }
                        Poll::Ready(Ok(0)) => {
                            tracing::debug!(path = %this.path.display(), remaining = *remaining, "end of file before end of range");
                            release(this.state, this.source, this.path);
                            return Poll::Ready(None);
                        }
                        Poll::Ready(Ok(n)) => {
                            // n <= nbytes <= remaining, so this cannot underflow
                            *remaining -= n as u64;
                            tracing::trace!(len = n, remaining = *remaining, "read chunk");
                            return Poll::Ready(Some(Ok(buffer.split().freeze())));
                        }
                    }
                }

                StreamState::Done => return Poll::Ready(None),
            }
        }
    }
}

fn release<B>(state: &mut StreamState<B>, source: &mut Option<B>, path: &Path) {
    *state = StreamState::Done;
    if source.take().is_some() {
        tracing::debug!(path = %path.display(), "released file handle");
    }
}

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop a file from being streamed.
///
/// An unsatisfiable range is not one of these: it is a normal outcome
/// rendered as a `416` [`ResponseDescriptor`](crate::ResponseDescriptor).
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to open {} for reading", path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("file size unavailable for {}", .0.display())]
    SizeUnavailable(PathBuf),

    #[error("buffer size must be greater than zero")]
    InvalidBufferSize,

    #[error("stream cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StreamResult<T> = Result<T, StreamError>;

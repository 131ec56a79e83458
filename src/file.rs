use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::{StreamError, StreamResult};

/// Metadata snapshot of the file being served, taken once when the
/// streamer is created.
///
/// The size is never re-read: if the file changes while it is being
/// streamed, the response still describes the size observed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    path: PathBuf,
    name: String,
    byte_size: u64,
    mime: String,
    modified: SystemTime,
}

impl FileDescriptor {
    /// Stats `path` and sniffs its leading bytes for a MIME type.
    ///
    /// Fails with [`StreamError::NotFound`] unless `path` resolves to a
    /// regular file, and with [`StreamError::SizeUnavailable`] when that
    /// file is empty. The type comes from the file's content, then its
    /// extension, then `default_mime`. A file that cannot be read here is
    /// not an error yet; that surfaces when the body is streamed.
    pub async fn stat(path: impl AsRef<Path>, default_mime: &str) -> StreamResult<FileDescriptor> {
        let requested = path.as_ref();
        let not_found = || StreamError::NotFound(requested.to_path_buf());

        let path = tokio::fs::canonicalize(requested).await.map_err(|_| not_found())?;
        let metadata = tokio::fs::metadata(&path).await.map_err(|_| not_found())?;
        if !metadata.is_file() {
            return Err(not_found());
        }

        let byte_size = metadata.len();
        if byte_size == 0 {
            return Err(StreamError::SizeUnavailable(path));
        }

        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mime = match sniff_mime(&path).await {
            Some(mime) => mime,
            None => mime_guess::from_path(&path).first_raw().unwrap_or(default_mime),
        }
        .to_string();

        let modified = metadata.modified().unwrap_or(UNIX_EPOCH);

        Ok(FileDescriptor { path, name, byte_size, mime, modified })
    }

    /// Absolute path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base name, used for `Content-Disposition`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub(crate) async fn open(path: PathBuf) -> std::io::Result<File> {
        File::open(path).await
    }
}

const SNIFF_LEN: u64 = 8192;

async fn sniff_mime(path: &Path) -> Option<&'static str> {
    let file = File::open(path).await.ok()?;
    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    file.take(SNIFF_LEN).read_to_end(&mut head).await.ok()?;
    infer::get(&head).map(|kind| kind.mime_type())
}

use serde::Deserialize;

use crate::{StreamError, StreamResult};

/// Default number of bytes read from disk per chunk (512 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 512 * 1024;

/// MIME type used when neither the content nor the file name identify one.
pub const DEFAULT_MIME: &str = "video/mp4";

/// Thirty days, in seconds.
pub const DEFAULT_CACHE_MAX_AGE: u64 = 2_592_000;

/// Settings an embedding server may override per streamer.
///
/// Every field has a default, so a partial table deserializes cleanly:
///
/// ```
/// let config: range_stream::StreamConfig =
///     serde_json::from_str(r#"{ "buffer_size": 65536 }"#).unwrap();
/// assert_eq!(65536, config.buffer_size);
/// assert_eq!("video/mp4", config.default_mime);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Upper bound on the length of every emitted chunk.
    pub buffer_size: usize,
    pub default_mime: String,
    /// `max-age` for `Cache-Control`, also used to compute `Expires`.
    pub cache_max_age: u64,
    /// Sent as `Content-Type` in place of the detected type.
    pub mime: Option<String>,
    /// Sent in `Content-Disposition` in place of the file's base name.
    pub file_name: Option<String>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            buffer_size: DEFAULT_BUFFER_SIZE,
            default_mime: DEFAULT_MIME.to_string(),
            cache_max_age: DEFAULT_CACHE_MAX_AGE,
            mime: None,
            file_name: None,
        }
    }
}

impl StreamConfig {
    pub(crate) fn validate(&self) -> StreamResult<()> {
        if self.buffer_size == 0 {
            return Err(StreamError::InvalidBufferSize);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = StreamConfig::default();
        assert_eq!(524288, config.buffer_size);
        assert_eq!("video/mp4", config.default_mime);
        assert_eq!(2592000, config.cache_max_age);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_deserialize() {
        let config: StreamConfig = serde_json::from_str(
            r#"{ "default_mime": "audio/ogg", "cache_max_age": 60 }"#,
        ).unwrap();
        assert_eq!(DEFAULT_BUFFER_SIZE, config.buffer_size);
        assert_eq!("audio/ogg", config.default_mime);
        assert_eq!(60, config.cache_max_age);
        assert_eq!(None, config.mime);
        assert_eq!(None, config.file_name);
    }

    #[test]
    fn test_overrides_deserialize() {
        let config: StreamConfig = serde_json::from_str(
            r#"{ "mime": "video/webm", "file_name": "trailer.webm" }"#,
        ).unwrap();
        assert_eq!(Some("video/webm"), config.mime.as_deref());
        assert_eq!(Some("trailer.webm"), config.file_name.as_deref());
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let config = StreamConfig { buffer_size: 0, ..StreamConfig::default() };
        assert_matches!(config.validate(), Err(StreamError::InvalidBufferSize));
    }
}

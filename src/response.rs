use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::http::header::{
    ACCEPT_RANGES, CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_RANGE,
    CONTENT_TYPE, EXPIRES, LAST_MODIFIED,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::headers::{Expires, Header, LastModified};

use crate::{ByteRange, FileDescriptor, StreamConfig};

/// 9999-12-31T23:59:59Z, the last instant an HTTP date can express.
const LATEST_HTTP_DATE: Duration = Duration::from_secs(253_402_300_799);

/// Status line and headers for one request, computed before any body byte
/// is read.
///
/// A `416` descriptor is terminal: it carries only `Content-Range` and
/// `Accept-Ranges`, and no body may follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDescriptor {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    range: ByteRange,
}

impl ResponseDescriptor {
    pub(crate) fn build(
        file: &FileDescriptor,
        range: ByteRange,
        partial: bool,
        config: &StreamConfig,
        now: SystemTime,
    ) -> ResponseDescriptor {
        let size = file.byte_size();
        let content_range = format!("bytes {}-{}/{}", range.start, range.end, size);
        // not the `bytes` token; existing players rely on this exact value
        let accept_ranges = format!("0-{}", size.saturating_sub(1));

        if !range.is_satisfiable(size) {
            return ResponseDescriptor {
                status: StatusCode::RANGE_NOT_SATISFIABLE,
                headers: vec![
                    (CONTENT_RANGE, text_value(&content_range)),
                    (ACCEPT_RANGES, text_value(&accept_ranges)),
                ],
                range,
            };
        }

        let mut headers = Vec::with_capacity(8);
        let (status, content_length) = if partial {
            headers.push((CONTENT_RANGE, text_value(&content_range)));
            (StatusCode::PARTIAL_CONTENT, range.len())
        } else {
            (StatusCode::OK, size)
        };

        let expires = now
            .checked_add(Duration::from_secs(config.cache_max_age))
            .unwrap_or(UNIX_EPOCH + LATEST_HTTP_DATE);
        let cache_control = format!("max-age={}, public", config.cache_max_age);
        let mime = config.mime.as_deref().unwrap_or(file.mime());
        let name = config.file_name.as_deref().unwrap_or(file.name());
        let disposition = format!("inline; filename=\"{}\"", name);

        headers.push((CONTENT_TYPE, text_value(mime)));
        headers.push((CACHE_CONTROL, text_value(&cache_control)));
        headers.push((EXPIRES, http_date::<Expires>(expires)));
        headers.push((LAST_MODIFIED, http_date::<LastModified>(file.modified())));
        headers.push((ACCEPT_RANGES, text_value(&accept_ranges)));
        headers.push((CONTENT_LENGTH, HeaderValue::from(content_length)));
        headers.push((CONTENT_DISPOSITION, text_value(&disposition)));

        ResponseDescriptor { status, headers, range }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Headers in the order they are sent.
    pub fn headers(&self) -> &[(HeaderName, HeaderValue)] {
        &self.headers
    }

    /// First value of `name`, if present.
    pub fn header(&self, name: &HeaderName) -> Option<&HeaderValue> {
        self.headers.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// The resolved range, unclamped for a `416`.
    pub fn range(&self) -> ByteRange {
        self.range
    }

    /// True for `416`: the caller must stop after writing the headers.
    pub fn is_terminal(&self) -> bool {
        self.status == StatusCode::RANGE_NOT_SATISFIABLE
    }

    pub fn header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            map.append(name.clone(), value.clone());
        }
        map
    }
}

/// Headers only, with an empty body.
impl IntoResponse for ResponseDescriptor {
    fn into_response(self) -> Response {
        (self.status, self.header_map()).into_response()
    }
}

/// Encodes `time` as an RFC 1123 GMT date through the typed header,
/// clamped to the years 1970 through 9999.
fn http_date<H: Header + From<SystemTime>>(time: SystemTime) -> HeaderValue {
    let time = time.clamp(UNIX_EPOCH, UNIX_EPOCH + LATEST_HTTP_DATE);
    let mut values = Vec::with_capacity(1);
    H::from(time).encode(&mut values);
    values
        .pop()
        .unwrap_or_else(|| HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT"))
}

// file names may hold bytes a header cannot carry; drop those
fn text_value(text: &str) -> HeaderValue {
    HeaderValue::from_str(text)
        .or_else(|_| HeaderValue::from_bytes(text.as_bytes()))
        .or_else(|_| {
            let cleaned: String = text.chars().filter(|c| !c.is_control()).collect();
            HeaderValue::from_bytes(cleaned.as_bytes())
        })
        .unwrap_or_else(|_| HeaderValue::from_static(""))
}

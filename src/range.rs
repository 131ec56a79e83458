/// Inclusive span of byte offsets, `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        ByteRange { start, end }
    }

    /// The whole of a file of `size` bytes.
    pub fn full(size: u64) -> Self {
        ByteRange { start: 0, end: size.saturating_sub(1) }
    }

    /// Number of bytes covered, zero when `end < start`.
    pub fn len(&self) -> u64 {
        match self.end.checked_sub(self.start) {
            Some(span) => span.saturating_add(1),
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this span can be served from a file of `size` bytes.
    pub fn is_satisfiable(&self, size: u64) -> bool {
        self.start <= self.end && self.end < size && self.start < size
    }
}

/// Bounds captured from a `Range` header value, before the file size is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RangeSpec {
    pub start: u64,
    pub end: Option<u64>,
}

impl RangeSpec {
    /// Resolves an unspecified end to the last byte of the file.
    ///
    /// An explicit end of `0` after a non-zero start is read as the
    /// `bytes=N-` shorthand; `bytes=0-0` keeps its literal meaning.
    pub fn resolve(self, size: u64) -> ByteRange {
        let last = size.saturating_sub(1);
        let end = match self.end {
            None => last,
            Some(0) if self.start > 0 => last,
            Some(end) => end,
        };
        ByteRange::new(self.start, end)
    }
}

/// Finds the first `bytes=START-END?` occurrence in a `Range` header value.
///
/// Parsing is tolerant: a value with no such occurrence yields a start of
/// `0` and an open end, which resolves to the whole file. Any further
/// ranges after the first are ignored.
pub(crate) fn parse_range_header(value: &str) -> RangeSpec {
    value
        .match_indices("bytes=")
        .find_map(|(idx, unit)| parse_bounds(&value[idx + unit.len()..]))
        .unwrap_or(RangeSpec { start: 0, end: None })
}

fn parse_bounds(s: &str) -> Option<RangeSpec> {
    let (start, rest) = split_digits(s);
    let start = parse_offset(start)?;
    let rest = rest.strip_prefix('-')?;
    let (end, _) = split_digits(rest);
    Some(RangeSpec { start, end: parse_offset(end) })
}

fn split_digits(s: &str) -> (&str, &str) {
    let n = s.bytes().take_while(u8::is_ascii_digit).count();
    s.split_at(n)
}

// digit runs too long for a u64 saturate, and then fail validation
fn parse_offset(digits: &str) -> Option<u64> {
    if digits.is_empty() {
        return None;
    }
    Some(digits.parse().unwrap_or(u64::MAX))
}

use std::str::FromStr;

use crate::error::StreamError;

const BYTES_UNIT: &str = "bytes";

/// A single validated byte range, both ends inclusive.
///
/// Always satisfies `start <= end < total_size` for the resource it was
/// parsed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Exclusive upper bound, as used by [`axum_extra::headers::ContentRange::bytes`].
    pub fn end_exclusive(&self) -> u64 {
        self.end + 1
    }
}

/// Parses a `Range` header value against a resource of `total_size` bytes.
///
/// Accepts `bytes=start-end`, `bytes=start-` and the suffix form
/// `bytes=-length`, with the unit matched case-insensitively. An `end` past
/// the resource is clamped to the last byte. Multiple ranges are not served
/// and are rejected as malformed.
pub fn parse_range(spec: &str, total_size: u64) -> Result<ByteRange, StreamError> {
    let malformed = || StreamError::MalformedRange { spec: spec.to_string(), total_size };
    let unsatisfiable = || StreamError::UnsatisfiableRange { spec: spec.to_string(), total_size };

    let (unit, set) = spec.trim().split_once('=').ok_or_else(malformed)?;
    if !unit.eq_ignore_ascii_case(BYTES_UNIT) {
        return Err(malformed());
    }
    if set.contains(',') {
        return Err(malformed());
    }
    let (first, last) = set.trim().split_once('-').ok_or_else(malformed)?;

    let range = match (first, last) {
        ("", "") => return Err(malformed()),
        // suffix: the final `length` bytes
        ("", length) => {
            let length = parse_digits::<u64>(length).ok_or_else(malformed)?;
            if length == 0 || total_size == 0 {
                return Err(unsatisfiable());
            }
            ByteRange { start: total_size.saturating_sub(length), end: total_size - 1 }
        }
        (start, "") => {
            let start = parse_digits::<u64>(start).ok_or_else(malformed)?;
            if start >= total_size {
                return Err(unsatisfiable());
            }
            ByteRange { start, end: total_size - 1 }
        }
        (start, end) => {
            let start = parse_digits::<u64>(start).ok_or_else(malformed)?;
            let end = parse_digits::<u64>(end).ok_or_else(malformed)?;
            if start > end || start >= total_size {
                return Err(unsatisfiable());
            }
            ByteRange { start, end: end.min(total_size - 1) }
        }
    };

    Ok(range)
}

/// Only plain ASCII digits; rejects signs, whitespace and overflow.
pub(crate) fn parse_digits<T: FromStr>(raw: &str) -> Option<T> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn range(start: u64, end: u64) -> ByteRange {
        ByteRange { start, end }
    }

    #[test]
    fn test_parse_range() {
        let tests = [
            ("bytes=0-99", 1000, range(0, 99)),
            ("bytes=900-2000", 1000, range(900, 999)),
            ("bytes=0-", 500, range(0, 499)),
            ("bytes=100-", 500, range(100, 499)),
            ("bytes=0-0", 500, range(0, 0)),
            ("bytes=499-499", 500, range(499, 499)),
            ("bytes=-100", 500, range(400, 499)),
            ("bytes=-1", 500, range(499, 499)),
            ("bytes=-9000", 500, range(0, 499)),
            ("bytes=0-24646", 500, range(0, 499)),
            (" bytes=10-19 ", 500, range(10, 19)),
            ("Bytes=0-1", 500, range(0, 1)),
            ("BYTES=-5", 500, range(495, 499)),
        ];

        for (i, (spec, total_size, expected)) in tests.iter().enumerate() {
            let result = parse_range(spec, *total_size)
                .unwrap_or_else(|e| panic!("#{i} {spec:?} failed: {e}"));
            assert_eq!(*expected, result, "#{i} {spec:?}");
        }
    }

    #[test]
    fn test_malformed() {
        let tests = [
            "bytes=abc-def",
            "bytes=1a-5",
            "bytes=+1-5",
            "bytes=0x10-20",
            "bytes=-",
            "bytes=",
            "bytes=5",
            "bytes=1-2-3",
            "bytes=0-4,-1",
            "bytes=99999999999999999999-",
            "bleets=100-324",
            "bytes =0-1",
            "bytesx=0-1",
            "none",
            "",
        ];

        for spec in tests {
            assert_matches!(
                parse_range(spec, 1000),
                Err(StreamError::MalformedRange { total_size: 1000, .. }),
                "{spec:?}"
            );
        }
    }

    #[test]
    fn test_unsatisfiable() {
        let tests = [
            ("bytes=30-29", 54),
            ("bytes=54-", 54),
            ("bytes=99-120", 54),
            ("bytes=-0", 54),
            ("bytes=0-", 0),
            ("bytes=-10", 0),
        ];

        for (spec, total_size) in tests {
            assert_matches!(
                parse_range(spec, total_size),
                Err(StreamError::UnsatisfiableRange { .. }),
                "{spec:?}"
            );
        }
    }

    #[test]
    fn test_len() {
        assert_eq!(100, range(0, 99).len());
        assert_eq!(1, range(7, 7).len());
        assert_eq!(1000, range(900, 999).end_exclusive());
    }
}

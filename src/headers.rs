use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::headers::{AcceptRanges, ContentLength, ContentRange, ContentType, HeaderMapExt};
use mime_guess::mime::Mime;

use crate::config::{DeliveryConfig, Pacing};
use crate::range::ByteRange;

/// Shape of a successful `/stream` response, decided from the presence of a
/// validated range. Unsatisfiable ranges never get this far, see
/// [`crate::StreamError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsePlan {
    /// No range header, the whole resource with `200 OK`.
    Full { total_size: u64 },
    /// One satisfiable range with `206 Partial Content`.
    Partial { range: ByteRange, total_size: u64 },
}

impl ResponsePlan {
    pub fn new(range: Option<ByteRange>, total_size: u64) -> Self {
        match range {
            None => ResponsePlan::Full { total_size },
            Some(range) => ResponsePlan::Partial { range, total_size },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ResponsePlan::Full { .. } => StatusCode::OK,
            ResponsePlan::Partial { .. } => StatusCode::PARTIAL_CONTENT,
        }
    }

    /// First byte offset the body starts at.
    pub fn start(&self) -> u64 {
        match self {
            ResponsePlan::Full { .. } => 0,
            ResponsePlan::Partial { range, .. } => range.start,
        }
    }

    /// Number of body bytes, i.e. the `Content-Length`.
    pub fn content_length(&self) -> u64 {
        match self {
            ResponsePlan::Full { total_size } => *total_size,
            ResponsePlan::Partial { range, .. } => range.len(),
        }
    }

    pub fn pacing(&self, config: &DeliveryConfig) -> Pacing {
        match self {
            ResponsePlan::Full { .. } => config.full_pacing(),
            ResponsePlan::Partial { .. } => config.ranged_pacing(),
        }
    }

    /// Entity headers for this plan. Cross-origin headers belong to the
    /// router and are not touched here.
    pub fn headers(&self, content_type: &Mime) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let ResponsePlan::Partial { range, total_size } = self {
            let content_range = ContentRange::bytes(range.start..range.end_exclusive(), *total_size)
                .expect("ContentRange::bytes cannot panic in this usage");
            headers.typed_insert(content_range);
        }
        headers.typed_insert(ContentLength(self.content_length()));
        headers.typed_insert(AcceptRanges::bytes());
        headers.typed_insert(ContentType::from(content_type.clone()));
        headers
    }

    /// Attaches status and headers to a body.
    pub fn respond(&self, content_type: &Mime, body: impl IntoResponse) -> Response {
        (self.status(), self.headers(content_type), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE};

    use super::*;
    use crate::config::guess_content_type;

    fn audio() -> Mime {
        guess_content_type("record.mp3".as_ref())
    }

    #[test]
    fn test_full_headers() {
        let plan = ResponsePlan::new(None, 1000);
        assert_eq!(StatusCode::OK, plan.status());
        assert_eq!(0, plan.start());

        let headers = plan.headers(&audio());
        assert_eq!("1000", headers[CONTENT_LENGTH]);
        assert_eq!("bytes", headers[ACCEPT_RANGES]);
        assert_eq!("audio/mpeg", headers[CONTENT_TYPE]);
        assert!(headers.get(CONTENT_RANGE).is_none());
    }

    #[test]
    fn test_partial_headers() {
        let plan = ResponsePlan::new(Some(ByteRange { start: 900, end: 999 }), 1000);
        assert_eq!(StatusCode::PARTIAL_CONTENT, plan.status());
        assert_eq!(900, plan.start());

        let headers = plan.headers(&audio());
        assert_eq!("bytes 900-999/1000", headers[CONTENT_RANGE]);
        assert_eq!("100", headers[CONTENT_LENGTH]);
        assert_eq!("bytes", headers[ACCEPT_RANGES]);
        assert_eq!("audio/mpeg", headers[CONTENT_TYPE]);
    }

    #[test]
    fn test_single_byte_range() {
        let plan = ResponsePlan::new(Some(ByteRange { start: 0, end: 0 }), 54);
        let headers = plan.headers(&audio());
        assert_eq!("bytes 0-0/54", headers[CONTENT_RANGE]);
        assert_eq!("1", headers[CONTENT_LENGTH]);
    }

    #[test]
    fn test_pacing_follows_response_shape() {
        let config = DeliveryConfig::default();
        assert_eq!(Pacing::Paced(config.pace_interval), ResponsePlan::new(None, 10).pacing(&config));
        let partial = ResponsePlan::new(Some(ByteRange { start: 0, end: 4 }), 10);
        assert_eq!(Pacing::Unpaced, partial.pacing(&config));
    }

    #[test]
    fn test_respond_keeps_body_headers() {
        let plan = ResponsePlan::new(Some(ByteRange { start: 0, end: 4 }), 10);
        let response = plan.respond(&audio(), "01234");
        assert_eq!(StatusCode::PARTIAL_CONTENT, response.status());
        assert_eq!("bytes 0-4/10", response.headers()[CONTENT_RANGE]);
        assert_eq!("audio/mpeg", response.headers()[CONTENT_TYPE]);
    }
}

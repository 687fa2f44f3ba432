use std::io;
use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::headers::ContentRange;
use axum_extra::TypedHeader;

/// Every way a `/stream` request can fail. Implements [`IntoResponse`].
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("malformed range header: {spec:?}")]
    MalformedRange { spec: String, total_size: u64 },

    #[error("range {spec:?} not satisfiable for {total_size} bytes")]
    UnsatisfiableRange { spec: String, total_size: u64 },

    #[error("invalid {param}: {reason}")]
    InvalidConfig { param: &'static str, reason: String },

    #[error("media resource {} unavailable", .path.display())]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read media resource")]
    StreamReadFailure(#[source] io::Error),
}

impl StreamError {
    pub fn status(&self) -> StatusCode {
        match self {
            StreamError::MalformedRange { .. } | StreamError::UnsatisfiableRange { .. } => {
                StatusCode::RANGE_NOT_SATISFIABLE
            }
            StreamError::InvalidConfig { .. } => StatusCode::BAD_REQUEST,
            StreamError::ResourceUnavailable { .. } => StatusCode::NOT_FOUND,
            StreamError::StreamReadFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StreamError {
    fn into_response(self) -> Response {
        match self {
            StreamError::MalformedRange { total_size, .. }
            | StreamError::UnsatisfiableRange { total_size, .. } => {
                tracing::debug!("{self}");
                RangeNotSatisfiable(ContentRange::unsatisfied_bytes(total_size)).into_response()
            }
            StreamError::ResourceUnavailable { ref path, ref source } => {
                tracing::debug!("media resource {} unavailable: {source}", path.display());
                (self.status(), "media resource unavailable").into_response()
            }
            StreamError::StreamReadFailure(ref source) => {
                tracing::warn!("stream read failure: {source}");
                (self.status(), "Stream error").into_response()
            }
            _ => {
                tracing::debug!("{self}");
                (self.status(), self.to_string()).into_response()
            }
        }
    }
}

/// Error type indicating that the requested range was not satisfiable. Implements [`IntoResponse`].
#[derive(Debug, Clone)]
pub struct RangeNotSatisfiable(pub ContentRange);

impl IntoResponse for RangeNotSatisfiable {
    fn into_response(self) -> Response {
        let status = StatusCode::RANGE_NOT_SATISFIABLE;
        let header = TypedHeader(self.0);
        (status, header, ()).into_response()
    }
}

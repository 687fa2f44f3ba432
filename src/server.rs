//! HTTP surface: `/stream`, its preflight, and the informational index page.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::RANGE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{Html, Response};
use axum::routing::get;
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::{DeliveryQuery, ServerConfig};
use crate::error::StreamError;
use crate::headers::ResponsePlan;
use crate::range::parse_range;
use crate::resource::MediaResource;
use crate::session::DeliverySession;

const CROSS_ORIGIN_HEADERS: [(&str, &str); 6] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "GET, HEAD, OPTIONS"),
    ("access-control-allow-headers", "Content-Type, Range"),
    ("cross-origin-embedder-policy", "credentialless"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "cross-origin"),
];

const INDEX_PAGE: &str = r#"<html>
<head>
  <title>Streaming Server</title>
</head>
<body>
  <h2>Stream Query Params</h2>
  <ul>
    <li>/stream?buffer=true - pace ranged responses too</li>
    <li>/stream?buffer=false - ranged responses go out unpaced (default)</li>
    <li>/stream?delay=500 - delay after each chunk in ms (default 500)</li>
    <li>/stream?chunkSize=65536 - chunk size in bytes (default 64KB)</li>
  </ul>
</body>
</html>
"#;

/// Builds the application around an immutable [`ServerConfig`].
pub fn router(config: ServerConfig) -> Router {
    let router = Router::new()
        .route("/", get(index))
        .route("/stream", get(stream).options(preflight))
        .with_state(Arc::new(config));

    CROSS_ORIGIN_HEADERS.iter().fold(router, |router, &(name, value)| {
        router.layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ))
    })
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn stream(
    method: Method,
    State(config): State<Arc<ServerConfig>>,
    Query(query): Query<DeliveryQuery>,
    headers: HeaderMap,
) -> Result<Response, StreamError> {
    let delivery = query.resolve(&config.delivery_defaults)?;
    let resource = MediaResource::resolve(&config.media_path).await?;
    let total_size = resource.total_size();

    let range = match headers.get(RANGE) {
        None => None,
        Some(value) => {
            let spec = value.to_str().map_err(|_| StreamError::MalformedRange {
                spec: String::from_utf8_lossy(value.as_bytes()).into_owned(),
                total_size,
            })?;
            Some(parse_range(spec, total_size)?)
        }
    };

    let plan = ResponsePlan::new(range, total_size);
    tracing::debug!(?plan, ?delivery, %method, "serving {}", resource.path().display());

    if method == Method::HEAD {
        return Ok(plan.respond(&config.content_type, ()));
    }

    let body = resource.open().await?;
    let session = DeliverySession::start(
        body,
        plan.start(),
        plan.content_length(),
        delivery.chunk_size,
        plan.pacing(&delivery),
    )
    .await?;

    Ok(plan.respond(&config.content_type, session))
}

#[cfg(test)]
mod tests {
    use axum::http::header::{
        ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    };

    use super::*;

    #[test]
    fn test_cross_origin_header_names() {
        assert_eq!(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderName::from_static(CROSS_ORIGIN_HEADERS[0].0));
        assert_eq!(ACCESS_CONTROL_ALLOW_METHODS, HeaderName::from_static(CROSS_ORIGIN_HEADERS[1].0));
        assert_eq!(ACCESS_CONTROL_ALLOW_HEADERS, HeaderName::from_static(CROSS_ORIGIN_HEADERS[2].0));
    }
}

//! Request tracking middleware
//!
//! Every request gets a TypeID request id (`req_...`) in `x-request-id`,
//! echoed back on the response. Credentials are marked sensitive so the
//! trace layer never prints them.

use http::HeaderName;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
};

use crate::ids::MakeTypedRequestId;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Headers masked in logs
pub const SENSITIVE_HEADERS: [HeaderName; 4] = [
    http::header::AUTHORIZATION,
    http::header::COOKIE,
    http::header::SET_COOKIE,
    HeaderName::from_static("x-api-key"),
];

/// Generate a `req_` TypeID for requests that arrive without one
pub fn request_id_layer() -> SetRequestIdLayer<MakeTypedRequestId> {
    SetRequestIdLayer::x_request_id(MakeTypedRequestId)
}

/// Copy the request id onto the response
pub fn request_id_propagation_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

pub fn sensitive_headers_layer() -> SetSensitiveRequestHeadersLayer {
    SetSensitiveRequestHeadersLayer::new(SENSITIVE_HEADERS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use tower::ServiceExt;

    #[test]
    fn test_sensitive_headers() {
        assert!(SENSITIVE_HEADERS.contains(&http::header::AUTHORIZATION));
        assert!(SENSITIVE_HEADERS
            .iter()
            .any(|h| h.as_str() == "x-api-key"));
    }

    #[tokio::test]
    async fn test_request_id_is_generated_and_propagated() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(request_id_propagation_layer())
            .layer(request_id_layer());

        let response = app
            .oneshot(http::Request::builder().uri("/").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();

        let id = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
        assert!(id.starts_with("req_"));
    }

    #[tokio::test]
    async fn test_incoming_request_id_is_kept() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(request_id_propagation_layer())
            .layer(request_id_layer());

        let request = http::Request::builder()
            .uri("/")
            .header(REQUEST_ID_HEADER, "req_upstream")
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.headers()[REQUEST_ID_HEADER], "req_upstream");
    }
}

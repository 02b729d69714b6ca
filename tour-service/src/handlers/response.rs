//! Success envelope
//!
//! Successful responses wrap their payload under a single named key:
//!
//! ```json
//! { "status": "success", "results": 2, "data": { "tours": [ ... ] } }
//! ```
//!
//! `results` only appears on list responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::store::Document;

/// Success envelope with its HTTP status
///
/// # Example
///
/// ```rust
/// use axum::http::StatusCode;
/// use serde_json::json;
/// use tour_service::handlers::SuccessResponse;
///
/// let response = SuccessResponse::created("tour", json!({"name": "The Sea Explorer"}));
/// assert_eq!(response.status_code(), StatusCode::CREATED);
/// assert_eq!(
///     serde_json::to_value(&response).unwrap(),
///     json!({"status": "success", "data": {"tour": {"name": "The Sea Explorer"}}})
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuccessResponse {
    #[serde(skip)]
    code: StatusCode,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<usize>,
    data: Map<String, Value>,
}

impl SuccessResponse {
    fn keyed(code: StatusCode, key: &str, value: Value) -> Self {
        let mut data = Map::new();
        data.insert(key.to_string(), value);
        Self {
            code,
            status: "success",
            results: None,
            data,
        }
    }

    /// 200 with a single payload
    pub fn ok(key: &str, value: impl Into<Value>) -> Self {
        Self::keyed(StatusCode::OK, key, value.into())
    }

    /// 201 with the created document
    pub fn created(key: &str, value: impl Into<Value>) -> Self {
        Self::keyed(StatusCode::CREATED, key, value.into())
    }

    /// 200 with a list and its length
    pub fn list(key: &str, docs: Vec<Document>) -> Self {
        let results = docs.len();
        let items = docs.into_iter().map(Value::Object).collect();
        Self {
            results: Some(results),
            ..Self::keyed(StatusCode::OK, key, Value::Array(items))
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.code
    }

    #[must_use]
    pub fn results(&self) -> Option<usize> {
        self.results
    }

    #[must_use]
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }
}

impl IntoResponse for SuccessResponse {
    fn into_response(self) -> Response {
        let code = self.code;
        (code, Json(self)).into_response()
    }
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// How a collection wraps its payloads; the dashboard's backends disagree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStyle {
    /// `[...]` for lists, the record itself for writes
    BareArray,
    /// `{ "data": ... }`
    Data,
    /// `{ "success": true, "data": ... }`
    #[default]
    Success,
}

impl EnvelopeStyle {
    pub fn wrap(&self, payload: Value) -> Value {
        match self {
            EnvelopeStyle::BareArray => payload,
            EnvelopeStyle::Data => json!({ "data": payload }),
            EnvelopeStyle::Success => json!({ "success": true, "data": payload }),
        }
    }
}

/// Enveloped JSON reply with an optional non-200 status
#[derive(Debug)]
pub struct MockResponse {
    pub body: Value,
    pub status_code: Option<StatusCode>,
}

impl MockResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self::styled(EnvelopeStyle::Success, data)
    }

    pub fn styled<T: Serialize>(style: EnvelopeStyle, data: T) -> Self {
        let body = match serde_json::to_value(&data) {
            Ok(value) => style.wrap(value),
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return Self {
                    body: json!({ "success": false, "error": "Failed to serialize response data" }),
                    status_code: Some(StatusCode::INTERNAL_SERVER_ERROR),
                };
            }
        };
        Self { body, status_code: None }
    }

    pub fn created(mut self) -> Self {
        self.status_code = Some(StatusCode::CREATED);
        self
    }

    pub fn no_content() -> Self {
        Self { body: Value::Null, status_code: Some(StatusCode::NO_CONTENT) }
    }
}

impl IntoResponse for MockResponse {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);
        if status == StatusCode::NO_CONTENT {
            return status.into_response();
        }
        (status, Json(self.body)).into_response()
    }
}

pub type MockResult = Result<MockResponse, super::error::MockError>;

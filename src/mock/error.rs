// HTTP error types of the development backend
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// Backend error with the status code and body a real deployment would send
#[derive(Debug)]
pub enum MockError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 422 Unprocessable Entity, one entry per offending field
    Validation(Vec<(String, String)>),

    // Canned failure queued by a test
    Injected { status: u16, body: Value },
}

impl MockError {
    pub fn status_code(&self) -> u16 {
        match self {
            MockError::BadRequest(_) => 400,
            MockError::Unauthorized(_) => 401,
            MockError::Forbidden(_) => 403,
            MockError::NotFound(_) => 404,
            MockError::Validation(_) => 422,
            MockError::Injected { status, .. } => *status,
        }
    }

    pub fn message(&self) -> String {
        match self {
            MockError::BadRequest(msg)
            | MockError::Unauthorized(msg)
            | MockError::Forbidden(msg)
            | MockError::NotFound(msg) => msg.clone(),
            MockError::Validation(errors) => errors
                .iter()
                .map(|(field, msg)| format!("{}: {}", field, msg))
                .collect::<Vec<_>>()
                .join("\n"),
            MockError::Injected { status, .. } => format!("injected failure {}", status),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            MockError::BadRequest(_) => "BAD_REQUEST",
            MockError::Unauthorized(_) => "UNAUTHORIZED",
            MockError::Forbidden(_) => "FORBIDDEN",
            MockError::NotFound(_) => "NOT_FOUND",
            MockError::Validation(_) => "VALIDATION_ERROR",
            MockError::Injected { .. } => "INJECTED",
        }
    }

    /// Validation failures use the FastAPI `detail` list layout
    pub fn to_json(&self) -> Value {
        match self {
            MockError::Validation(errors) => json!({
                "detail": errors
                    .iter()
                    .map(|(field, msg)| json!({
                        "loc": ["body", field],
                        "msg": msg,
                        "type": "value_error"
                    }))
                    .collect::<Vec<_>>()
            }),
            MockError::Injected { body, .. } => body.clone(),
            _ => json!({
                "success": false,
                "message": self.message(),
                "code": self.error_code()
            }),
        }
    }
}

impl MockError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        MockError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        MockError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        MockError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        MockError::NotFound(message.into())
    }
}

impl std::fmt::Display for MockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for MockError {}

impl IntoResponse for MockError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", self);
        }
        (status, Json(self.to_json())).into_response()
    }
}

// Client-side error taxonomy
use thiserror::Error;

pub const UNREACHABLE_MESSAGE: &str = "Could not reach server";

/// Every failure a collection, selector or resolver can surface to the user
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    /// The request never produced a response (connection refused, timeout, DNS)
    #[error("{UNREACHABLE_MESSAGE}: {0}")]
    Transport(String),

    /// Response status outside 2xx
    #[error("{message}")]
    Http { status: u16, message: String },

    /// 2xx response whose envelope carried `success: false`
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// Client-side checks that short-circuit before any request
    #[error("{0}")]
    Validation(String),

    /// Misconfigured endpoint or missing session data needed to build a path
    #[error("Configuration error: {0}")]
    Config(String),

    /// Response was received but could not be interpreted
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        ClientError::Http { status, message: message.into() }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        ClientError::Rejected { status, message: message.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        ClientError::Config(message.into())
    }

    /// The single string shown inline next to the triggering control
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Transport(_) => UNREACHABLE_MESSAGE.to_string(),
            ClientError::Http { message, .. } => message.clone(),
            ClientError::Rejected { message, .. } => message.clone(),
            ClientError::Validation(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Stable machine-readable kind, used in JSON CLI output
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::Transport(_) => "transport",
            ClientError::Http { .. } => "http",
            ClientError::Rejected { .. } => "rejected",
            ClientError::Validation(_) => "validation",
            ClientError::Config(_) => "config",
            ClientError::Decode(_) => "decode",
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } | ClientError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else if err.is_builder() {
            ClientError::Config(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::Config(format!("invalid URL: {}", err))
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_user_message_hides_details() {
        let err = ClientError::Transport("tcp connect error: connection refused".into());
        assert_eq!(err.user_message(), UNREACHABLE_MESSAGE);
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn http_error_exposes_status() {
        let err = ClientError::http(500, "db locked");
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.user_message(), "db locked");
    }
}

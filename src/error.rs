//! Failures crossing the price-tracker API boundary.

use reqwest::StatusCode;
use thiserror::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response: unreachable host, DNS, timeout.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    /// The body did not have the expected shape.
    #[error("{context} (unexpected response: {detail})")]
    Decode {
        context: &'static str,
        detail: String,
    },

    #[error("invalid API base URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ApiError {
    /// Message suitable for an inline banner, or `fallback` if this error
    /// carries none.
    pub fn user_message(&self, fallback: &str) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            fallback.to_string()
        } else {
            message
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_displays_message_only() {
        let err = ApiError::Status {
            status: StatusCode::NOT_FOUND,
            message: "Failed to fetch chart data".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to fetch chart data");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_user_message_falls_back_when_empty() {
        let err = ApiError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: String::new(),
        };
        assert_eq!(err.user_message("generic"), "generic");
    }

    #[test]
    fn test_decode_error_keeps_operation_message() {
        let err = ApiError::Decode {
            context: "Failed to fetch RAM options",
            detail: "expected array".to_string(),
        };
        assert!(err.user_message("x").starts_with("Failed to fetch RAM options"));
        assert_eq!(err.status(), None);
    }
}

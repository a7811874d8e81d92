//! Errors returned by the dashboard client.

use thiserror::Error;

/// Message used when a failed response carries no readable message.
pub const FALLBACK_ERROR_MESSAGE: &str = "Request failed";

#[derive(Debug, Error)]
pub enum ClientError {
    /// The backend answered with a non-success status
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// No response within the request timeout
    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    /// Connection or protocol failure before a response arrived
    #[error("{}", FALLBACK_ERROR_MESSAGE)]
    Transport(#[source] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Token storage error: {0}")]
    TokenStore(#[from] std::io::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message suitable for showing to the user.
    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err)
        } else {
            Self::Transport(err)
        }
    }
}

/// Result type alias for client calls
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_displays_message_only() {
        let err = ClientError::Api {
            status: 404,
            code: Some("RESOURCE_NOT_FOUND".to_string()),
            message: "未找到交易 T1".to_string(),
        };
        assert_eq!(err.message(), "未找到交易 T1");
        assert!(err.is_not_found());
        assert!(!err.is_unauthorized());
    }
}

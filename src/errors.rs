use thiserror::Error;

use crate::response::ResponseBody;

/// Category of a failed request, derived from its status code alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    AuthError,
    ValidationError,
    ServerError,
    NetworkError,
    Other,
}

impl ErrorCategory {
    /// Predicates are checked in declaration order; the first match wins.
    pub fn from_status(status_code: u16) -> Self {
        if matches!(status_code, 401 | 403) {
            ErrorCategory::AuthError
        } else if matches!(status_code, 400 | 422) {
            ErrorCategory::ValidationError
        } else if status_code >= 500 {
            ErrorCategory::ServerError
        } else if status_code == 0 {
            ErrorCategory::NetworkError
        } else {
            ErrorCategory::Other
        }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, ErrorCategory::AuthError)
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, ErrorCategory::ValidationError)
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, ErrorCategory::ServerError)
    }

    pub fn is_network_error(&self) -> bool {
        matches!(self, ErrorCategory::NetworkError)
    }
}

/// A request that did not produce a success response.
///
/// `status_code` is 0 when no response was received or the body could not be
/// decoded.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RequestFailure {
    pub message: String,
    pub status_code: u16,
    pub payload: Option<ResponseBody>,
}

impl RequestFailure {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: 0,
            payload: None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_status(self.status_code)
    }

    pub fn is_auth_error(&self) -> bool {
        self.category().is_auth_error()
    }

    pub fn is_validation_error(&self) -> bool {
        self.category().is_validation_error()
    }

    pub fn is_server_error(&self) -> bool {
        self.category().is_server_error()
    }

    pub fn is_network_error(&self) -> bool {
        self.category().is_network_error()
    }

    /// The server answers a rejected anti-forgery token with a 403 whose
    /// payload carries `"type": "csrf_error"`.
    pub fn is_csrf_error(&self) -> bool {
        if self.status_code != 403 {
            return false;
        }
        self.payload
            .as_ref()
            .and_then(ResponseBody::as_json)
            .and_then(|v| v.pointer("/error/type"))
            .and_then(|t| t.as_str())
            == Some("csrf_error")
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid base URL {url}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid header {0}")]
    InvalidHeader(String),
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

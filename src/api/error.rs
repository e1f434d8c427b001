//! Properties service error types

use thiserror::Error;

/// Errors that can occur when talking to the properties service
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// 401 / 403 - token missing, invalid or lacking permissions
    #[error("properties service: unauthorized ({status})")]
    Unauthorized { status: u16 },

    /// 404 - no property with this id
    #[error("property '{0}' not found")]
    NotFound(String),

    /// 429 Rate Limited
    #[error("properties service: rate limited")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Network or timeout error
    #[error("properties service: network error - {0}")]
    Network(String),

    /// Other HTTP errors
    #[error("properties service: HTTP {status} - {message}")]
    Http { status: u16, message: String },

    /// Response body could not be decoded
    #[error("properties service: invalid response - {0}")]
    Decode(String),

    /// No base URL or credentials configured
    #[error("properties service not configured: {0}")]
    NotConfigured(String),
}

impl ServiceError {
    pub fn network(message: impl Into<String>) -> Self {
        ServiceError::Network(message.into())
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        ServiceError::Http {
            status,
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        ServiceError::Decode(message.into())
    }

    /// Map a non-success HTTP status to an error
    pub fn from_status(status: u16, id: Option<&str>, body: String) -> Self {
        match status {
            401 | 403 => ServiceError::Unauthorized { status },
            404 => ServiceError::NotFound(id.unwrap_or_default().to_string()),
            429 => ServiceError::RateLimited {
                retry_after_secs: None,
            },
            _ => ServiceError::http(status, body),
        }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, ServiceError::Unauthorized { .. })
    }

    /// Transient failures worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Network(_) | ServiceError::RateLimited { .. } => true,
            ServiceError::Http { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }
}

use thiserror::Error;

use super::common::ApiErrorDetails;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    ApiError {
        status: u16,
        message: String,
        #[source]
        details: Option<Box<ApiErrorDetails>>,
    },

    #[error("Invalid endpoint URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,
}

impl ApiError {
    /// 404, and 403 which the platform returns for some objects that do not
    /// exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::ApiError { status: 403 | 404, .. })
    }

    /// The request never produced an answer from the platform
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ApiError::RequestError(_)
                | ApiError::Timeout(_)
                | ApiError::RateLimited
                | ApiError::ServiceUnavailable
        )
    }
}

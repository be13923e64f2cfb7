//! Cookie error types.
//!
//! Parse failures are recoverable:
//! [`CookieManager::put`](crate::cookies::manager::CookieManager::put) logs and
//! skips the offending header value instead of aborting the response.

use thiserror::Error;

/// Errors raised while parsing, building, or persisting cookies.
#[derive(Debug, Error)]
pub enum CookieError {
    #[error("empty cookie header")]
    EmptyHeader,
    #[error("invalid cookie name-value pair")]
    InvalidNameValuePair,
    #[error("illegal cookie name: {0:?}")]
    IllegalName(String),
    #[error("illegal cookie max-age attribute: {0:?}")]
    IllegalMaxAge(String),
    #[error("cookie version should be 0 or 1, got {0}")]
    IllegalVersion(u32),
    #[error("invalid request url: {0}")]
    InvalidUrl(String),

    #[error("cookie file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "json")]
    #[error("cookie file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for cookie operations.
pub type Result<T> = std::result::Result<T, CookieError>;

impl CookieError {
    /// Create an illegal name error.
    pub fn illegal_name(name: impl Into<String>) -> Self {
        CookieError::IllegalName(name.into())
    }

    /// Create an invalid url error for a url lacking a host.
    pub fn missing_host(url: &url::Url) -> Self {
        CookieError::InvalidUrl(format!("{} has no host", url))
    }

    /// Whether this error came from the header grammar rather than I/O.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            CookieError::EmptyHeader
                | CookieError::InvalidNameValuePair
                | CookieError::IllegalName(_)
                | CookieError::IllegalMaxAge(_)
        )
    }
}

//! Error types for the portal API client.
//!
//! # Design
//! Every non-2xx response lands in `ApiError::Http` with the raw status code
//! and body. Transport failures (no response at all) are `Network`. Storage
//! and configuration problems get their own enums so callers of `logout` or
//! `ClientConfig::from_env` never have to match on HTTP variants.

use thiserror::Error;

/// Longest body excerpt rendered by `Display`. The full body stays in the
/// variant.
const MAX_DISPLAY_BODY_LENGTH: usize = 500;

/// Errors returned by `PortalClient` and `Api`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or no response was received.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {}", truncate_body(.body))]
    Http { status: u16, body: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    /// Status code of an `Http` error, `None` for every other variant.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// 401: no credential or one the server does not accept.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// 403: authenticated, but not allowed.
    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }
}

fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_DISPLAY_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_DISPLAY_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

/// Errors from persistent session storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is corrupt: {0}")]
    Corrupt(String),
}

/// Errors raised while assembling a `ClientConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("invalid page URL {url:?}: {reason}")]
    InvalidPageUrl { url: String, reason: String },

    #[error("same-origin API mode needs a page origin; set PORTAL_PAGE_URL or PORTAL_API_ORIGIN")]
    MissingPageOrigin,
}

//! Unified error type.

use thiserror::Error;

/// Boxed error produced by handlers and middlewares.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type returned by tsuji's fallible operations.
///
/// Application-level failures (404, 422, etc.) are expressed as
/// [`Response`](crate::Response) values, not as `Error`s. This type covers
/// registration problems caught up front and infrastructure failures.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("duplicate capture `{name}` in pattern `{pattern}`")]
    DuplicateCapture { pattern: String, name: String },

    #[error("unknown http method `{0}`")]
    UnknownMethod(String),

    /// A handler or middleware panicked.
    #[error("panicked: {0}")]
    Panicked(String),
}

impl Error {
    pub(crate) fn invalid_pattern(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPattern { pattern: pattern.to_owned(), reason: reason.into() }
    }
}

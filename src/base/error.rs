//! Crate-wide error taxonomy.
//!
//! Every failure surfaced by this library is a [`RestError`]. Callers are
//! expected to branch on the error *kind* (via the `is_*` classifiers or
//! pattern matching) and on the structured fields, never on message text.

use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

use crate::http::response::Response;

/// Boxed source error for variants that wrap foreign failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum RestError {
    /// Failure building or sending a single attempt: missing or malformed
    /// URL, unsupported method, or a transport-level failure.
    #[error("request {op} failed for {url}: {message}")]
    Request {
        /// Operation tag, e.g. `"parse_url"`, `"send"`.
        op: &'static str,
        url: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A received response the caller judged to be a failure.
    ///
    /// Carries the original [`Response`] so callers can inspect headers and
    /// body without re-fetching state.
    #[error("HTTP {status} {status_text} for {url}")]
    Response {
        status: u16,
        status_text: String,
        url: String,
        body: Bytes,
        response: Box<Response>,
    },

    /// A deadline elapsed before the attempt completed.
    #[error("request to {url} timed out after {elapsed:?}")]
    Timeout { url: String, elapsed: Duration },

    /// Network-level or connection-establishment failure.
    #[error("connection to {url} failed: {source}")]
    Connection {
        url: String,
        #[source]
        source: BoxError,
    },

    /// Terminal failure after exhausting a retry policy.
    ///
    /// Unwraps (via [`std::error::Error::source`]) to the last underlying
    /// error observed by the executor.
    #[error("max retries exceeded after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<RestError>,
    },

    /// Failure converting a value into wire bytes.
    #[error("encoding as {content_type} failed: {message}")]
    Encode {
        content_type: String,
        message: String,
    },

    /// Failure converting wire bytes into a value.
    #[error("decoding as {content_type} failed: {message}")]
    Decode {
        content_type: String,
        message: String,
    },

    /// A panic recovered by [`crate::middleware::Recover`] and surfaced as a
    /// normal error instead of unwinding through the call stack.
    #[error("handler panicked: {0}")]
    Panic(String),

    /// The caller's cancellation token fired before or between attempts.
    #[error("request cancelled")]
    Cancelled,
}

impl RestError {
    /// Build a [`RestError::Request`] without an underlying cause.
    pub fn request(op: &'static str, url: impl Into<String>, message: impl Into<String>) -> Self {
        RestError::Request {
            op,
            url: url.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Build a [`RestError::Request`] wrapping an underlying cause.
    pub fn request_with(
        op: &'static str,
        url: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        let source = source.into();
        RestError::Request {
            op,
            url: url.into(),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Wrap a non-success [`Response`] as an error, preserving the response.
    pub fn from_response(url: impl Into<String>, response: Response) -> Self {
        RestError::Response {
            status: response.status().as_u16(),
            status_text: response.status_text().to_string(),
            url: url.into(),
            body: response.body().clone(),
            response: Box::new(response),
        }
    }

    /// The HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            RestError::Response { status, .. } => Some(*status),
            RestError::RetryExhausted { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Whether this failure is plausibly transient.
    ///
    /// Timeouts, connection failures, and 5xx/429 responses qualify.
    pub fn is_temporary(&self) -> bool {
        match self {
            RestError::Timeout { .. } | RestError::Connection { .. } => true,
            RestError::Response { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RestError::Timeout { .. })
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, RestError::Connection { .. })
    }

    /// Identity check for the "max retries exceeded" condition.
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, RestError::RetryExhausted { .. })
    }

    /// The last underlying error of an exhausted retry loop.
    ///
    /// `std::error::Error::source` yields the boxed error as an opaque
    /// `dyn Error`; this accessor keeps it typed so callers can branch on
    /// its kind.
    pub fn last_error(&self) -> Option<&RestError> {
        match self {
            RestError::RetryExhausted { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, RestError::Decode { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RestError::Cancelled)
    }
}

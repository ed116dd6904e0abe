//! Received response with a captured body.

use bytes::Bytes;
use cookie::Cookie;
use http::header::{CONTENT_TYPE, SET_COOKIE};
use http::{HeaderMap, StatusCode, Version};
use serde::de::DeserializeOwned;
use url::Url;

use crate::base::error::RestError;
use crate::codec;

/// A response whose body has been captured once as an immutable byte
/// buffer. Read-only after construction; repeated body reads need no
/// further I/O.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    body: Bytes,
    url: Url,
}

impl Response {
    /// Assemble a response from captured parts.
    pub fn new(
        status: StatusCode,
        version: Version,
        headers: HeaderMap,
        body: Bytes,
        url: Url,
    ) -> Self {
        Self {
            status,
            version,
            headers,
            body,
            url,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Canonical status text, empty for unknown codes.
    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Protocol string, e.g. `"HTTP/1.1"`.
    pub fn protocol(&self) -> &'static str {
        match self.version {
            Version::HTTP_09 => "HTTP/0.9",
            Version::HTTP_10 => "HTTP/1.0",
            Version::HTTP_11 => "HTTP/1.1",
            Version::HTTP_2 => "HTTP/2.0",
            Version::HTTP_3 => "HTTP/3.0",
            _ => "HTTP/?",
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The captured body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as lossy UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The `Content-Type` header value, if present and valid UTF-8.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Cookies parsed from `Set-Cookie` headers. Unparseable headers are
    /// skipped.
    pub fn cookies(&self) -> Vec<Cookie<'static>> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|s| Cookie::parse(s.to_string()).ok())
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body according to the response content type.
    ///
    /// Resolution goes through the global codec registry; unknown or missing
    /// content types fall back to JSON, XML-family types to the XML codec.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, RestError> {
        codec::registry::global().decode_body(self.content_type().unwrap_or(""), &self.body)
    }

    /// Convert a non-success response into a [`RestError::Response`].
    pub fn error_for_status(self) -> Result<Self, RestError> {
        if self.status.is_client_error() || self.status.is_server_error() {
            let url = self.url.to_string();
            Err(RestError::from_response(url, self))
        } else {
            Ok(self)
        }
    }
}

//! Outgoing request data model.

use http::{HeaderMap, Method};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::base::error::RestError;
use crate::http::body::Body;
use crate::http::multipart::Form;
use crate::retry::RetryPolicy;

/// The nine standard HTTP verbs accepted by [`Request`].
pub const STANDARD_METHODS: [Method; 9] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
    Method::TRACE,
    Method::CONNECT,
];

/// Validate that a method is one of the nine standard verbs.
pub fn validate_method(method: &Method, url: &str) -> Result<(), RestError> {
    if STANDARD_METHODS.contains(method) {
        Ok(())
    } else {
        Err(RestError::request(
            "validate_method",
            url,
            format!("unsupported HTTP method {method}"),
        ))
    }
}

/// Parse a method string, accepting only the nine standard verbs.
pub fn parse_method(s: &str, url: &str) -> Result<Method, RestError> {
    let method = s
        .parse::<Method>()
        .map_err(|_| RestError::request("parse_method", url, format!("invalid HTTP method {s}")))?;
    validate_method(&method, url)?;
    Ok(method)
}

/// A fully constructed request, ready for the execution pipeline.
///
/// A `Request` is produced once per logical call. `Clone` deep-copies the
/// method, URL, headers, captured body bytes, and form/file metadata; a live
/// streaming body is shared by reference (see [`Body`]). The cancellation
/// token is shared so that cancelling the logical call reaches every clone.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Body,
    form: Vec<(String, String)>,
    multipart: Option<Form>,
    timeout: Option<Duration>,
    retry: Option<RetryPolicy>,
    cancel: CancellationToken,
}

impl Request {
    /// Build a request from a method and URL string.
    pub fn new(method: Method, url: &str) -> Result<Self, RestError> {
        validate_method(&method, url)?;
        let parsed = Url::parse(url).map_err(|e| RestError::request_with("parse_url", url, e))?;
        Ok(Self::from_parts(method, parsed))
    }

    /// Build a request from pre-parsed parts.
    pub fn from_parts(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Body::Empty,
            form: Vec::new(),
            multipart: None,
            timeout: None,
            retry: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn url_mut(&mut self) -> &mut Url {
        &mut self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.body = body.into();
    }

    /// Accumulated form fields, retained so the body can be rebuilt per
    /// retry attempt.
    pub fn form(&self) -> &[(String, String)] {
        &self.form
    }

    pub fn push_form(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.form.push((name.into(), value.into()));
    }

    pub fn multipart(&self) -> Option<&Form> {
        self.multipart.as_ref()
    }

    pub fn set_multipart(&mut self, form: Form) {
        self.multipart = Some(form);
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    /// Per-request retry policy override.
    pub fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }

    pub fn set_retry_policy(&mut self, policy: RetryPolicy) {
        self.retry = Some(policy);
    }

    /// The cancellation token observed before each attempt and during
    /// backoff waits.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn set_cancel_token(&mut self, token: CancellationToken) {
        self.cancel = token;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn rejects_extension_methods() {
        let custom = Method::from_bytes(b"PURGE").unwrap();
        let err = validate_method(&custom, "http://example.com/").unwrap_err();
        match err {
            RestError::Request { op, .. } => assert_eq!(op, "validate_method"),
            other => panic!("expected Request error, got {other:?}"),
        }
    }

    #[test]
    fn parses_standard_methods() {
        for verb in ["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS", "TRACE", "CONNECT"]
        {
            parse_method(verb, "http://example.com/").unwrap();
        }
    }

    #[test]
    fn rejects_malformed_urls() {
        let err = Request::new(Method::GET, "not a url").unwrap_err();
        match err {
            RestError::Request { op, url, .. } => {
                assert_eq!(op, "parse_url");
                assert_eq!(url, "not a url");
            }
            other => panic!("expected Request error, got {other:?}"),
        }
    }

    #[test]
    fn clone_decouples_headers_and_body() {
        let mut req = Request::new(Method::POST, "http://example.com/upload").unwrap();
        req.set_body(Bytes::from_static(b"payload"));
        req.headers_mut()
            .insert("x-original", "yes".parse().unwrap());

        let mut copy = req.clone();
        copy.headers_mut().insert("x-copy", "yes".parse().unwrap());
        copy.set_body(Bytes::from_static(b"other"));

        assert!(req.headers().get("x-copy").is_none());
        assert_eq!(req.body().as_bytes().unwrap().as_ref(), b"payload");
    }

    #[test]
    fn clone_shares_cancellation() {
        let req = Request::new(Method::GET, "http://example.com/").unwrap();
        let copy = req.clone();
        req.cancel_token().cancel();
        assert!(copy.cancel_token().is_cancelled());
    }
}

//! Pluggable request transport.
//!
//! The pipeline places no contract on a transport beyond "accepts one
//! request, returns one response or an error"; retries call it repeatedly
//! with clones of the same logical request. [`HyperTransport`] is the
//! built-in implementation for plain HTTP.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use http::header::{HeaderValue, CONTENT_TYPE};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as LegacyClient;
use hyper_util::rt::TokioExecutor;
use std::io;

use crate::base::error::RestError;
use crate::http::body::Body;
use crate::http::request::Request;
use crate::http::response::Response;

// Unsync: a boxed byte stream is Send but not Sync.
type OutboundBody = UnsyncBoxBody<Bytes, io::Error>;

/// Transport capability consumed by the request pipeline.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one HTTP exchange.
    async fn perform(&self, request: &Request) -> Result<Response, RestError>;
}

/// Default transport backed by hyper's pooled HTTP client.
pub struct HyperTransport {
    client: LegacyClient<HttpConnector, OutboundBody>,
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransport {
    pub fn new() -> Self {
        Self {
            client: LegacyClient::builder(TokioExecutor::new()).build_http(),
        }
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn perform(&self, request: &Request) -> Result<Response, RestError> {
        let url = request.url().to_string();

        let uri: http::Uri = url
            .parse()
            .map_err(|e| RestError::request_with("parse_uri", url.clone(), e))?;

        let (body, content_type) = assemble_body(request);

        let mut http_request = http::Request::builder()
            .method(request.method().clone())
            .uri(uri)
            .body(body)
            .map_err(|e| RestError::request_with("build_request", url.clone(), e))?;

        for (name, value) in request.headers() {
            http_request.headers_mut().append(name, value.clone());
        }
        if let Some(ct) = content_type {
            if !http_request.headers().contains_key(CONTENT_TYPE) {
                http_request.headers_mut().insert(CONTENT_TYPE, ct);
            }
        }

        tracing::debug!(method = %request.method(), url = %url, "dispatching request");

        let response = self.client.request(http_request).await.map_err(|e| {
            if e.is_connect() {
                RestError::Connection {
                    url: url.clone(),
                    source: Box::new(e),
                }
            } else {
                RestError::request_with("send", url.clone(), e)
            }
        })?;

        let (parts, incoming) = response.into_parts();
        let collected = incoming
            .collect()
            .await
            .map_err(|e| RestError::request_with("read_body", url.clone(), e))?
            .to_bytes();

        tracing::debug!(status = parts.status.as_u16(), bytes = collected.len(), "response captured");

        Ok(Response::new(
            parts.status,
            parts.version,
            parts.headers,
            collected,
            request.url().clone(),
        ))
    }
}

/// Build the outbound body. Precedence: multipart, then form fields, then
/// the raw body. Returns the implied content type when one applies and the
/// caller has not set one.
fn assemble_body(request: &Request) -> (OutboundBody, Option<HeaderValue>) {
    if let Some(form) = request.multipart() {
        let content_type = HeaderValue::from_str(&form.content_type()).ok();
        return (full_body(form.to_bytes()), content_type);
    }

    if !request.form().is_empty() {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(request.form().iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish();
        return (
            full_body(Bytes::from(encoded)),
            Some(HeaderValue::from_static("application/x-www-form-urlencoded")),
        );
    }

    match request.body() {
        Body::Empty => (full_body(Bytes::new()), None),
        Body::Bytes(bytes) => (full_body(bytes.clone()), None),
        Body::Stream(shared) => match shared.take() {
            Some(stream) => {
                let frames = stream.map(|chunk| chunk.map(http_body::Frame::data));
                (BodyExt::boxed_unsync(StreamBody::new(frames)), None)
            }
            // Stream already consumed by an earlier attempt.
            None => (full_body(Bytes::new()), None),
        },
    }
}

fn full_body(bytes: Bytes) -> OutboundBody {
    Full::new(bytes).map_err(|never| match never {}).boxed_unsync()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn multipart_takes_precedence_over_form_and_body() {
        let mut request = Request::new(Method::POST, "http://example.com/upload").unwrap();
        request.push_form("ignored", "yes");
        request.set_body(Bytes::from_static(b"ignored too"));
        request.set_multipart(crate::http::Form::new().text("field", "value"));

        let (_, content_type) = assemble_body(&request);
        let ct = content_type.unwrap();
        assert!(ct.to_str().unwrap().starts_with("multipart/form-data"));
    }

    #[test]
    fn form_fields_encode_urlencoded() {
        let mut request = Request::new(Method::POST, "http://example.com/login").unwrap();
        request.push_form("user", "ada lovelace");
        request.push_form("role", "admin");

        let (_, content_type) = assemble_body(&request);
        assert_eq!(
            content_type.unwrap().to_str().unwrap(),
            "application/x-www-form-urlencoded"
        );
    }

    #[test]
    fn stream_body_is_assembled_and_consumed_once() {
        let mut request = Request::new(Method::POST, "http://example.com/stream").unwrap();
        let chunks = futures::stream::iter(vec![Ok::<_, io::Error>(Bytes::from_static(b"chunk"))]);
        request.set_body(Body::from_stream(Box::pin(chunks)));

        let (_, content_type) = assemble_body(&request);
        assert!(content_type.is_none());

        // A later attempt sees the spent stream and sends an empty body.
        let _ = assemble_body(&request);
        let Body::Stream(shared) = request.body() else {
            panic!("expected stream body");
        };
        assert!(!shared.is_available());
    }

    #[test]
    fn raw_body_implies_no_content_type() {
        let mut request = Request::new(Method::PUT, "http://example.com/raw").unwrap();
        request.set_body(Bytes::from_static(b"raw"));
        let (_, content_type) = assemble_body(&request);
        assert!(content_type.is_none());
    }
}

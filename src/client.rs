//! HTTP client with builder pattern and the request execution pipeline.
//!
//! [`Client::execute`] is the composition point: it layers, outermost to
//! innermost, user middleware, the hook-triggering layer, the retry
//! executor, and the per-attempt timeout around [`Transport::perform`].
//! Hooks fire once per logical call; the transport may run once per
//! attempt.
//!
//! # Example
//!
//! ```rust,ignore
//! use restnet::Client;
//!
//! let client = Client::builder()
//!     .timeout(std::time::Duration::from_secs(10))
//!     .build();
//!
//! let user: restnet::Decoded<User> = client
//!     .get("https://api.example.com/users/1")
//!     .send_decoded()
//!     .await?;
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use http::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::base::error::RestError;
use crate::codec::{encode_with, JsonCodec, XmlCodec};
use crate::hooks::Hooks;
use crate::http::body::Body;
use crate::http::decoded::Decoded;
use crate::http::multipart::Form;
use crate::http::request::{validate_method, Request};
use crate::http::response::Response;
use crate::middleware::{MiddlewareChain, TerminalHandler};
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::transport::{HyperTransport, Transport};

/// HTTP client for making requests.
///
/// Use [`Client::builder()`] to configure and create a client. Cloning is
/// cheap; clones share the transport and hooks but may extend middleware
/// independently via [`ClientBuilder`].
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    middleware: MiddlewareChain,
    hooks: Arc<Hooks>,
    retry: RetryPolicy,
    timeout: Option<Duration>,
    default_headers: HeaderMap,
    // Set when a default header failed conversion; every request built from
    // this client then fails rather than sending without the header.
    invalid_header: Option<Arc<str>>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a client with default settings and the hyper transport.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Observation hooks for this client. Registration is safe at any
    /// time, including while requests are in flight.
    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Start building a GET request.
    pub fn get<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Start building a POST request.
    pub fn post<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Start building a PUT request.
    pub fn put<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    /// Start building a PATCH request.
    pub fn patch<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    /// Start building a DELETE request.
    pub fn delete<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    /// Start building a HEAD request.
    pub fn head<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::HEAD, url)
    }

    /// Start building an OPTIONS request.
    pub fn options<U: AsRef<str>>(&self, url: U) -> RequestBuilder {
        self.request(Method::OPTIONS, url)
    }

    /// Start building a request with an arbitrary standard method.
    pub fn request<U: AsRef<str>>(&self, method: Method, url: U) -> RequestBuilder {
        RequestBuilder {
            client: self.clone(),
            method,
            url: url.as_ref().to_string(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            form: Vec::new(),
            body: None,
            multipart: None,
            timeout: None,
            retry: None,
            cancel: None,
            deferred_error: None,
        }
    }

    /// Execute a constructed request through the full pipeline.
    pub async fn execute(&self, request: Request) -> Result<Response, RestError> {
        let policy = request
            .retry_policy()
            .cloned()
            .unwrap_or_else(|| self.retry.clone());
        let timeout = request.timeout().or(self.timeout);
        let hooks = Arc::clone(&self.hooks);
        let transport = Arc::clone(&self.transport);

        let terminal: Box<TerminalHandler> = Box::new(move |mut req: Request| {
            let hooks = Arc::clone(&hooks);
            let transport = Arc::clone(&transport);
            let policy = policy.clone();
            Box::pin(async move {
                hooks.trigger_request(&mut req);

                let started = Instant::now();
                let cancel = req.cancel_token().clone();
                let executor = RetryExecutor::new(policy);
                let outcome = executor
                    .execute(&cancel, || {
                        let transport = Arc::clone(&transport);
                        let attempt = req.clone();
                        async move { perform_attempt(transport, attempt, timeout).await }
                    })
                    .await;

                match &outcome {
                    Ok(response) => {
                        tracing::debug!(
                            method = %req.method(),
                            url = %req.url(),
                            status = response.status().as_u16(),
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "request complete"
                        );
                        hooks.trigger_response(&req, response, started.elapsed());
                    }
                    Err(error) => {
                        tracing::debug!(
                            method = %req.method(),
                            url = %req.url(),
                            error = %error,
                            "request failed"
                        );
                        hooks.trigger_error(&req, error);
                    }
                }
                outcome
            })
        });

        self.middleware.execute(request, terminal.as_ref()).await
    }
}

/// One retry attempt: the transport call under the per-attempt deadline.
async fn perform_attempt(
    transport: Arc<dyn Transport>,
    request: Request,
    timeout: Option<Duration>,
) -> Result<Response, RestError> {
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, transport.perform(&request)).await {
            Ok(result) => result,
            Err(_) => Err(RestError::Timeout {
                url: request.url().to_string(),
                elapsed: limit,
            }),
        },
        None => transport.perform(&request).await,
    }
}

/// Builder for creating a [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    middleware: MiddlewareChain,
    retry: Option<RetryPolicy>,
    timeout: Option<Duration>,
    default_headers: HeaderMap,
    invalid_header: Option<String>,
}

impl ClientBuilder {
    /// Replace the transport. Defaults to [`HyperTransport`].
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Replace the transport with a shared instance.
    pub fn transport_arc(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Append a middleware to the chain. Middleware run in registration
    /// order around every request this client executes.
    pub fn middleware(mut self, middleware: impl crate::middleware::Middleware + 'static) -> Self {
        self.middleware.with(middleware);
        self
    }

    /// Set the client-wide retry policy.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Set the client-wide per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a header sent with every request.
    ///
    /// An invalid value is remembered and reported when a request is built,
    /// never silently dropped.
    pub fn default_header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: http::header::IntoHeaderName,
        V: TryInto<HeaderValue>,
        V::Error: Into<http::Error>,
    {
        match value.try_into() {
            Ok(val) => {
                self.default_headers.insert(key, val);
            }
            Err(e) => {
                let err: http::Error = e.into();
                self.invalid_header = Some(err.to_string());
            }
        }
        self
    }

    /// Build the client.
    pub fn build(self) -> Client {
        Client {
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(HyperTransport::new())),
            middleware: self.middleware,
            hooks: Arc::new(Hooks::new()),
            retry: self.retry.unwrap_or_default(),
            timeout: self.timeout,
            default_headers: self.default_headers,
            invalid_header: self.invalid_header.map(Arc::from),
        }
    }
}

/// Builder for a single request.
pub struct RequestBuilder {
    client: Client,
    method: Method,
    url: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    form: Vec<(String, String)>,
    body: Option<Body>,
    multipart: Option<Form>,
    timeout: Option<Duration>,
    retry: Option<RetryPolicy>,
    cancel: Option<CancellationToken>,
    deferred_error: Option<RestError>,
}

impl RequestBuilder {
    /// Add a header.
    ///
    /// An invalid value is deferred and surfaced by [`RequestBuilder::build`]
    /// as a `RestError::Request`, never silently dropped.
    pub fn header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: http::header::IntoHeaderName,
        V: TryInto<HeaderValue>,
        V::Error: Into<http::Error>,
    {
        match value.try_into() {
            Ok(val) => {
                self.headers.insert(key, val);
            }
            Err(e) => {
                let err: http::Error = e.into();
                self.deferred_error = Some(RestError::request(
                    "set_header",
                    self.url.clone(),
                    err.to_string(),
                ));
            }
        }
        self
    }

    /// Add a query-string parameter.
    pub fn query<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a form field (body becomes `application/x-www-form-urlencoded`).
    pub fn form<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.form.push((key.into(), value.into()));
        self
    }

    /// Set a raw request body.
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set a JSON body and the matching `Content-Type`.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        match encode_with(&JsonCodec, value) {
            Ok(bytes) => {
                self.body = Some(Body::from(bytes));
                self.headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            Err(e) => self.deferred_error = Some(e),
        }
        self
    }

    /// Set an XML body and the matching `Content-Type`.
    pub fn xml<T: Serialize>(mut self, value: &T) -> Self {
        match encode_with(&XmlCodec, value) {
            Ok(bytes) => {
                self.body = Some(Body::from(bytes));
                self.headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/xml"));
            }
            Err(e) => self.deferred_error = Some(e),
        }
        self
    }

    /// Attach a multipart form.
    pub fn multipart(mut self, form: Form) -> Self {
        self.multipart = Some(form);
        self
    }

    /// Set HTTP basic authentication.
    pub fn basic_auth(self, username: &str, password: Option<&str>) -> Self {
        let credentials = match password {
            Some(pass) => format!("{username}:{pass}"),
            None => format!("{username}:"),
        };
        let encoded = BASE64.encode(credentials);
        self.header(AUTHORIZATION, format!("Basic {encoded}"))
    }

    /// Set a bearer token.
    pub fn bearer_auth(self, token: &str) -> Self {
        self.header(AUTHORIZATION, format!("Bearer {token}"))
    }

    /// Set the per-attempt timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the client's retry policy for this request.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Observe an external cancellation token.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Finalize into a [`Request`] without sending it.
    pub fn build(self) -> Result<Request, RestError> {
        if let Some(error) = self.deferred_error {
            return Err(error);
        }
        if let Some(message) = &self.client.invalid_header {
            return Err(RestError::request(
                "default_header",
                self.url.clone(),
                message.to_string(),
            ));
        }
        if self.url.is_empty() {
            return Err(RestError::request("parse_url", "", "missing URL"));
        }
        validate_method(&self.method, &self.url)?;

        let mut url = Url::parse(&self.url)
            .map_err(|e| RestError::request_with("parse_url", self.url.clone(), e))?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }

        let mut request = Request::from_parts(self.method, url);

        for (name, value) in &self.client.default_headers {
            request.headers_mut().insert(name, value.clone());
        }
        for (name, value) in &self.headers {
            request.headers_mut().insert(name, value.clone());
        }

        if let Some(body) = self.body {
            request.set_body(body);
        }
        for (name, value) in self.form {
            request.push_form(name, value);
        }
        if let Some(form) = self.multipart {
            request.set_multipart(form);
        }
        if let Some(timeout) = self.timeout {
            request.set_timeout(timeout);
        }
        if let Some(policy) = self.retry {
            request.set_retry_policy(policy);
        }
        if let Some(token) = self.cancel {
            request.set_cancel_token(token);
        }

        Ok(request)
    }

    /// Send the request through the pipeline.
    pub async fn send(self) -> Result<Response, RestError> {
        let client = self.client.clone();
        let request = self.build()?;
        client.execute(request).await
    }

    /// Send the request and decode the response body by content type.
    pub async fn send_decoded<T: DeserializeOwned>(self) -> Result<Decoded<T>, RestError> {
        let response = self.send().await?;
        let value = response.decode()?;
        Ok(Decoded::new(value, response))
    }
}

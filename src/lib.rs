//! # restnet
//!
//! An ergonomic HTTP client library for Rust.
//!
//! `restnet` wraps a pluggable transport in a layered request pipeline:
//! user middleware, observation hooks, automatic retries with exponential
//! backoff, and content-type-driven body codecs.
//!
//! ## Features
//!
//! - **Middleware Chain**: onion-model interceptors with short-circuiting
//! - **Automatic Retries**: exponential backoff, jitter, custom predicates
//! - **Hooks**: lock-free observer callbacks for request, response, error
//! - **Codec Registry**: JSON and XML built in, extensible by content type
//! - **Typed Decoding**: deserialize bodies straight into your structs
//! - **Cancellation**: cooperative, token-based, honored between attempts
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use restnet::Client;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = Client::new();
//!     let user = client
//!         .get("https://api.example.com/users/1")
//!         .send_decoded::<User>()
//!         .await
//!         .unwrap();
//!     println!("id: {}", user.value().id);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Core error definitions
//! - [`client`] - High-level client and request builders
//! - [`codec`] - Content-type codecs and the codec registry
//! - [`hooks`] - Pipeline observation callbacks
//! - [`http`] - Request, response, body, and multipart types
//! - [`middleware`] - Interceptor chain
//! - [`retry`] - Retry policy and executor
//! - [`transport`] - Pluggable transport trait and the hyper transport

pub mod base;
pub mod client;
pub mod codec;
pub mod hooks;
pub mod http;
pub mod middleware;
pub mod retry;
pub mod transport;

pub use base::error::RestError;
pub use client::{Client, ClientBuilder, RequestBuilder};
pub use codec::{Codec, CodecRegistry, JsonCodec, XmlCodec};
pub use hooks::Hooks;
pub use http::{Body, Decoded, Form, Part, Request, Response};
pub use middleware::{Middleware, MiddlewareChain, Next, Recover};
pub use retry::{RetryExecutor, RetryPolicy};
pub use transport::{HyperTransport, Transport};

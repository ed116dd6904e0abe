//! Request/response interceptor chain.
//!
//! Middleware wrap the pipeline's terminal handler in registration order:
//! "before" phases run first-to-last, "after" phases unwind last-to-first,
//! like a call stack. A middleware short-circuits by returning without
//! invoking [`Next`]; earlier middleware still receive control back and may
//! act on the short-circuited result.

pub mod recover;

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

use crate::base::error::RestError;
use crate::http::request::Request;
use crate::http::response::Response;

pub use recover::Recover;

/// Terminal handler invoked when the chain is exhausted.
pub type TerminalHandler =
    dyn Fn(Request) -> BoxFuture<'static, Result<Response, RestError>> + Send + Sync;

/// A single interceptor in the chain.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Handle the request, deciding whether and when to call `next`.
    async fn handle(&self, request: Request, next: Next<'_>) -> Result<Response, RestError>;
}

/// Continuation handle passed to a middleware; consuming it invokes the
/// rest of the chain.
pub struct Next<'a> {
    rest: &'a [Arc<dyn Middleware>],
    terminal: &'a TerminalHandler,
}

impl<'a> Next<'a> {
    /// Invoke the next middleware, or the terminal handler if none remain.
    pub fn run(self, request: Request) -> BoxFuture<'a, Result<Response, RestError>> {
        match self.rest.split_first() {
            Some((head, tail)) => {
                let next = Next {
                    rest: tail,
                    terminal: self.terminal,
                };
                head.handle(request, next)
            }
            None => (self.terminal)(request),
        }
    }
}

/// An ordered sequence of middleware.
///
/// `with` is not safe to call concurrently with `execute`; clone the chain
/// first for independent extension.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    stack: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware to the chain.
    pub fn with(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.stack.push(Arc::new(middleware));
        self
    }

    /// Append an already-shared middleware.
    pub fn with_arc(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.stack.push(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Run the request through every middleware and finally the terminal
    /// handler. An empty chain invokes the terminal handler directly.
    pub async fn execute(
        &self,
        request: Request,
        terminal: &TerminalHandler,
    ) -> Result<Response, RestError> {
        Next {
            rest: &self.stack,
            terminal,
        }
        .run(request)
        .await
    }
}

//! Panic recovery middleware.

use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;

use crate::base::error::RestError;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::middleware::{Middleware, Next};

/// Converts panics from inner layers into [`RestError::Panic`] instead of
/// unwinding through the caller.
///
/// Layer this outermost; nothing else in the pipeline shields panics.
#[derive(Debug, Default, Clone, Copy)]
pub struct Recover;

#[async_trait]
impl Middleware for Recover {
    async fn handle(&self, request: Request, next: Next<'_>) -> Result<Response, RestError> {
        match AssertUnwindSafe(next.run(request)).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(message = %message, "recovered panic in request pipeline");
                Err(RestError::Panic(message))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

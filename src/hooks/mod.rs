//! Observation hooks fired at pipeline events.
//!
//! Three independent, ordered callback lists (request, response, error) are
//! held as an immutable snapshot behind an [`ArcSwap`]. Registration is
//! copy-on-write under a write mutex and publishes atomically, so triggering
//! never takes a lock and never observes a partially updated list. The O(n)
//! copy per registration is acceptable: registration is rare, triggering is
//! frequent.

use arc_swap::ArcSwap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::base::error::RestError;
use crate::http::request::Request;
use crate::http::response::Response;

/// Callback fired before a request is handed to the retry layer.
///
/// Receives the request mutably: hooks may adjust fields the transport has
/// not yet consumed (headers before send, for example). Hooks needing
/// observe-only semantics must avoid mutation by convention.
pub type RequestHook = Arc<dyn Fn(&mut Request) + Send + Sync>;

/// Callback fired once per logical call after a successful response, with
/// the total elapsed duration.
pub type ResponseHook = Arc<dyn Fn(&Request, &Response, Duration) + Send + Sync>;

/// Callback fired once per logical call when the pipeline fails.
pub type ErrorHook = Arc<dyn Fn(&Request, &RestError) + Send + Sync>;

#[derive(Default)]
struct HookSet {
    request: Vec<RequestHook>,
    response: Vec<ResponseHook>,
    error: Vec<ErrorHook>,
}

/// Ordered observer callbacks for the request pipeline.
pub struct Hooks {
    set: ArcSwap<HookSet>,
    // Serializes registrations; triggers never take it.
    write: Mutex<()>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self::new()
    }
}

impl Hooks {
    pub fn new() -> Self {
        Self {
            set: ArcSwap::from_pointee(HookSet::default()),
            write: Mutex::new(()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut HookSet)) {
        let _guard = self.write.lock().expect("hooks write lock poisoned");
        let current = self.set.load();
        let mut next = HookSet {
            request: current.request.clone(),
            response: current.response.clone(),
            error: current.error.clone(),
        };
        apply(&mut next);
        self.set.store(Arc::new(next));
    }

    /// Register a request hook. Safe to call concurrently with triggering.
    pub fn on_request(&self, hook: impl Fn(&mut Request) + Send + Sync + 'static) {
        self.update(|set| set.request.push(Arc::new(hook)));
    }

    /// Register a response hook.
    pub fn on_response(&self, hook: impl Fn(&Request, &Response, Duration) + Send + Sync + 'static) {
        self.update(|set| set.response.push(Arc::new(hook)));
    }

    /// Register an error hook.
    pub fn on_error(&self, hook: impl Fn(&Request, &RestError) + Send + Sync + 'static) {
        self.update(|set| set.error.push(Arc::new(hook)));
    }

    /// Fire all request hooks in registration order, synchronously, in the
    /// calling task.
    pub fn trigger_request(&self, request: &mut Request) {
        let set = self.set.load_full();
        for hook in &set.request {
            hook(request);
        }
    }

    /// Fire all response hooks in registration order.
    pub fn trigger_response(&self, request: &Request, response: &Response, elapsed: Duration) {
        let set = self.set.load_full();
        for hook in &set.response {
            hook(request, response, elapsed);
        }
    }

    /// Fire all error hooks in registration order.
    pub fn trigger_error(&self, request: &Request, error: &RestError) {
        let set = self.set.load_full();
        for hook in &set.error {
            hook(request, error);
        }
    }

    /// Copy all three current lists into a fresh independent instance.
    pub fn clone_hooks(&self) -> Self {
        let current = self.set.load();
        Self {
            set: ArcSwap::from_pointee(HookSet {
                request: current.request.clone(),
                response: current.response.clone(),
                error: current.error.clone(),
            }),
            write: Mutex::new(()),
        }
    }

    /// Atomically replace the bundle with three empty lists.
    pub fn clear(&self) {
        let _guard = self.write.lock().expect("hooks write lock poisoned");
        self.set.store(Arc::new(HookSet::default()));
    }
}

impl Clone for Hooks {
    fn clone(&self) -> Self {
        self.clone_hooks()
    }
}

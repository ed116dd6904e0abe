//! Typed decode result paired with its originating response.

use cookie::Cookie;
use http::HeaderMap;
use once_cell::sync::Lazy;

use crate::http::response::Response;

static EMPTY_HEADERS: Lazy<HeaderMap> = Lazy::new(HeaderMap::new);

/// A decoded value of type `T` together with the [`Response`] it came from.
///
/// Metadata accessors degrade to zero-ish defaults (status 0, empty strings
/// and slices) when the response is absent, so callers never need to
/// nil-check the response just to read metadata after a successful decode.
#[derive(Debug)]
pub struct Decoded<T> {
    value: T,
    response: Option<Response>,
}

impl<T> Decoded<T> {
    pub fn new(value: T, response: Response) -> Self {
        Self {
            value,
            response: Some(response),
        }
    }

    /// A decoded value with no originating response.
    pub fn detached(value: T) -> Self {
        Self {
            value,
            response: None,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn into_parts(self) -> (T, Option<Response>) {
        (self.value, self.response)
    }

    /// Status code, or 0 when no response is attached.
    pub fn status(&self) -> u16 {
        self.response
            .as_ref()
            .map(|r| r.status().as_u16())
            .unwrap_or(0)
    }

    /// Canonical status text, or `""` when no response is attached.
    pub fn status_text(&self) -> &str {
        self.response.as_ref().map(|r| r.status_text()).unwrap_or("")
    }

    pub fn headers(&self) -> &HeaderMap {
        self.response
            .as_ref()
            .map(|r| r.headers())
            .unwrap_or(&EMPTY_HEADERS)
    }

    pub fn cookies(&self) -> Vec<Cookie<'static>> {
        self.response
            .as_ref()
            .map(|r| r.cookies())
            .unwrap_or_default()
    }

    pub fn body(&self) -> &[u8] {
        self.response
            .as_ref()
            .map(|r| r.body().as_ref())
            .unwrap_or(&[])
    }
}

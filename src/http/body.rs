//! Request body representations.

use bytes::Bytes;
use futures::stream::BoxStream;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex};

/// Byte stream type accepted for streaming request bodies.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Body attached to an outgoing request.
///
/// Captured byte bodies are cheap to clone and can be re-sent on every retry
/// attempt. A streaming body cannot be duplicated: cloning shares the live
/// stream by reference, and once a transport has consumed it a retry attempt
/// sends an empty body. Callers needing retry-after-partial-read must use a
/// captured body.
#[derive(Clone, Default)]
pub enum Body {
    /// No body (GET, HEAD, ...).
    #[default]
    Empty,
    /// Body captured as raw bytes.
    Bytes(Bytes),
    /// Streaming body, shared by reference across clones.
    Stream(SharedStream),
}

impl Body {
    /// Wrap a stream of byte chunks as a request body.
    pub fn from_stream(stream: ByteStream) -> Self {
        Body::Stream(SharedStream::new(stream))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Bytes(b) => b.is_empty(),
            Body::Stream(_) => false,
        }
    }

    /// Length in bytes, if known up front.
    pub fn len(&self) -> Option<usize> {
        match self {
            Body::Empty => Some(0),
            Body::Bytes(b) => Some(b.len()),
            Body::Stream(_) => None,
        }
    }

    /// The captured bytes, if this is a byte body.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Body::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => f.write_str("Body::Empty"),
            Body::Bytes(b) => write!(f, "Body::Bytes({} bytes)", b.len()),
            Body::Stream(_) => f.write_str("Body::Stream(..)"),
        }
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Bytes(Bytes::from(s))
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Body::Bytes(Bytes::from_static(s.as_bytes()))
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(v))
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Body::Bytes(b)
    }
}

/// A streaming body source shared by reference.
///
/// The first consumer takes the stream; later takers observe `None`.
#[derive(Clone)]
pub struct SharedStream {
    inner: Arc<Mutex<Option<ByteStream>>>,
}

impl SharedStream {
    fn new(stream: ByteStream) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(stream))),
        }
    }

    /// Take the stream out for consumption.
    pub fn take(&self) -> Option<ByteStream> {
        self.inner.lock().ok().and_then(|mut guard| guard.take())
    }

    /// Whether the stream is still available.
    pub fn is_available(&self) -> bool {
        self.inner
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }
}

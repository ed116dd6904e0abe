//! Two-tier codec registry.
//!
//! Lookup checks a lock-free fast cache first, then falls back to a
//! read-locked registry map. The fast cache is additive-only: once a key is
//! populated it always wins over the guarded registry for that key, which
//! enables override-free fast paths for hot content types.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::base::error::RestError;
use crate::codec::{
    decode_with, encode_with, normalize_content_type, Codec, JsonCodec, XmlCodec,
};

static JSON_FALLBACK: Lazy<Arc<dyn Codec>> = Lazy::new(|| Arc::new(JsonCodec));
static XML_FALLBACK: Lazy<Arc<dyn Codec>> = Lazy::new(|| Arc::new(XmlCodec));

/// Process-global registry, initialized exactly once with the built-in
/// JSON and XML codecs.
static GLOBAL: Lazy<CodecRegistry> = Lazy::new(CodecRegistry::with_defaults);

/// The global default registry used by [`crate::http::Response::decode`].
pub fn global() -> &'static CodecRegistry {
    &GLOBAL
}

/// Maps normalized content types to codecs.
pub struct CodecRegistry {
    fast: DashMap<String, Arc<dyn Codec>>,
    guarded: RwLock<HashMap<String, Arc<dyn Codec>>>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            fast: DashMap::new(),
            guarded: RwLock::new(HashMap::new()),
        }
    }

    /// A registry pre-populated with the built-in codecs: JSON on the fast
    /// path (under `application/json` and `text/json`), XML in the guarded
    /// registry (under `application/xml` and `text/xml`).
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register_fast("application/json", JSON_FALLBACK.clone());
        registry.register_fast("text/json", JSON_FALLBACK.clone());
        registry.register("application/xml", XML_FALLBACK.clone());
        registry.register("text/xml", XML_FALLBACK.clone());
        registry
    }

    /// Register a codec under a content type in the guarded registry.
    pub fn register(&self, content_type: &str, codec: Arc<dyn Codec>) {
        let key = normalize_content_type(content_type);
        tracing::debug!(content_type = %key, codec = codec.content_type(), "registering codec");
        self.guarded
            .write()
            .expect("codec registry lock poisoned")
            .insert(key, codec);
    }

    /// Register a codec and additionally place it in the lock-free fast
    /// cache, for hot, frequently-resolved content types.
    pub fn register_fast(&self, content_type: &str, codec: Arc<dyn Codec>) {
        let key = normalize_content_type(content_type);
        self.guarded
            .write()
            .expect("codec registry lock poisoned")
            .insert(key.clone(), codec.clone());
        self.fast.insert(key, codec);
    }

    /// Resolve a codec for a content type, fast cache first.
    pub fn get(&self, content_type: &str) -> Option<Arc<dyn Codec>> {
        let key = normalize_content_type(content_type);
        if let Some(hit) = self.fast.get(&key) {
            return Some(hit.value().clone());
        }
        self.guarded
            .read()
            .expect("codec registry lock poisoned")
            .get(&key)
            .cloned()
    }

    /// Narrowing view over [`CodecRegistry::get`] for encoding callers.
    pub fn get_encoder(&self, content_type: &str) -> Option<Arc<dyn Codec>> {
        self.get(content_type)
    }

    /// Narrowing view over [`CodecRegistry::get`] for decoding callers.
    pub fn get_decoder(&self, content_type: &str) -> Option<Arc<dyn Codec>> {
        self.get(content_type)
    }

    /// Resolve a codec, falling back by content-type family: `*/xml` types
    /// map to the XML codec, everything else (empty and unknown types
    /// included) to JSON.
    pub fn resolve(&self, content_type: &str) -> Arc<dyn Codec> {
        if let Some(codec) = self.get(content_type) {
            return codec;
        }
        let key = normalize_content_type(content_type);
        if key.ends_with("xml") {
            XML_FALLBACK.clone()
        } else {
            JSON_FALLBACK.clone()
        }
    }

    /// Decode a body according to its content type, with fallback dispatch.
    pub fn decode_body<T: DeserializeOwned>(
        &self,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<T, RestError> {
        let codec = self.resolve(content_type);
        decode_with(codec.as_ref(), bytes)
    }

    /// Encode a value according to a content type, with fallback dispatch.
    pub fn encode_body<T: Serialize>(
        &self,
        content_type: &str,
        value: &T,
    ) -> Result<Vec<u8>, RestError> {
        let codec = self.resolve(content_type);
        encode_with(codec.as_ref(), value)
    }
}

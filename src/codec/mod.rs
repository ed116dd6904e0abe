//! Content-type driven encoding and decoding.
//!
//! A [`Codec`] pairs an encoder and decoder for one content type. Codecs are
//! registered in a [`registry::CodecRegistry`] and resolved by normalized
//! content type. The trait is object-safe via `erased-serde`, so callers use
//! the generic [`encode_with`] / [`decode_with`] helpers rather than the
//! erased methods directly.

pub mod json;
pub mod registry;
pub mod xml;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::base::error::RestError;

pub use json::JsonCodec;
pub use registry::CodecRegistry;
pub use xml::XmlCodec;

/// Encoder/decoder pair for one content type.
pub trait Codec: Send + Sync {
    /// Canonical content type, e.g. `"application/json"`.
    fn content_type(&self) -> &'static str;

    /// Encode a value into wire bytes.
    fn encode(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>, RestError>;

    /// Decode wire bytes, feeding the erased deserializer into `sink`.
    fn decode(&self, bytes: &[u8], sink: &mut dyn DecodeSink) -> Result<(), RestError>;
}

/// Receiver for an erased deserializer; the typed side of [`Codec::decode`].
pub trait DecodeSink {
    fn receive(
        &mut self,
        deserializer: &mut dyn erased_serde::Deserializer<'_>,
    ) -> Result<(), erased_serde::Error>;
}

struct TypedSink<T>(Option<T>);

impl<T: DeserializeOwned> DecodeSink for TypedSink<T> {
    fn receive(
        &mut self,
        deserializer: &mut dyn erased_serde::Deserializer<'_>,
    ) -> Result<(), erased_serde::Error> {
        self.0 = Some(erased_serde::deserialize(deserializer)?);
        Ok(())
    }
}

/// Encode a serializable value with the given codec.
pub fn encode_with<T: Serialize>(codec: &dyn Codec, value: &T) -> Result<Vec<u8>, RestError> {
    codec.encode(value)
}

/// Decode bytes into a typed value with the given codec.
pub fn decode_with<T: DeserializeOwned>(
    codec: &dyn Codec,
    bytes: &[u8],
) -> Result<T, RestError> {
    let mut sink = TypedSink::<T>(None);
    codec.decode(bytes, &mut sink)?;
    sink.0.ok_or_else(|| RestError::Decode {
        content_type: codec.content_type().to_string(),
        message: "decoder produced no value".to_string(),
    })
}

/// Normalize a content type for registry lookup: parameters after `;` are
/// stripped, surrounding whitespace trimmed, and the result lowercased.
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_parameters_and_case() {
        assert_eq!(
            normalize_content_type("application/json; charset=utf-8"),
            "application/json"
        );
        assert_eq!(normalize_content_type("APPLICATION/JSON"), "application/json");
        assert_eq!(normalize_content_type("  text/xml  "), "text/xml");
        assert_eq!(normalize_content_type(""), "");
    }
}

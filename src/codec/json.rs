//! JSON codec.

use crate::base::error::RestError;
use crate::codec::{Codec, DecodeSink};

/// Codec for `application/json` (and aliases such as `text/json`).
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>, RestError> {
        let mut buf = Vec::new();
        let mut serializer = serde_json::Serializer::new(&mut buf);
        let mut erased = <dyn erased_serde::Serializer>::erase(&mut serializer);
        value
            .erased_serialize(&mut erased)
            .map_err(|e| RestError::Encode {
                content_type: self.content_type().to_string(),
                message: e.to_string(),
            })?;
        Ok(buf)
    }

    fn decode(&self, bytes: &[u8], sink: &mut dyn DecodeSink) -> Result<(), RestError> {
        let mut deserializer = serde_json::Deserializer::from_slice(bytes);
        let mut erased = <dyn erased_serde::Deserializer>::erase(&mut deserializer);
        sink.receive(&mut erased).map_err(|e| RestError::Decode {
            content_type: self.content_type().to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_with, encode_with};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        id: u64,
        name: String,
    }

    #[test]
    fn round_trips_structs() {
        let user = User {
            id: 7,
            name: "ada".into(),
        };
        let bytes = encode_with(&JsonCodec, &user).unwrap();
        let back: User = decode_with(&JsonCodec, &bytes).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn decode_failure_names_content_type() {
        let err = decode_with::<User>(&JsonCodec, b"{not json").unwrap_err();
        match err {
            RestError::Decode { content_type, .. } => {
                assert_eq!(content_type, "application/json");
            }
            other => panic!("expected Decode error, got {other:?}"),
        }
    }
}

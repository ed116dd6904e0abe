//! XML codec backed by quick-xml's serde integration.

use crate::base::error::RestError;
use crate::codec::{Codec, DecodeSink};

/// Codec for `application/xml` and the wider `*/xml` family.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlCodec;

impl Codec for XmlCodec {
    fn content_type(&self) -> &'static str {
        "application/xml"
    }

    fn encode(&self, value: &dyn erased_serde::Serialize) -> Result<Vec<u8>, RestError> {
        let mut out = String::new();
        let serializer = quick_xml::se::Serializer::new(&mut out);
        let mut erased = <dyn erased_serde::Serializer>::erase(serializer);
        value
            .erased_serialize(&mut erased)
            .map_err(|e| RestError::Encode {
                content_type: self.content_type().to_string(),
                message: e.to_string(),
            })?;
        Ok(out.into_bytes())
    }

    fn decode(&self, bytes: &[u8], sink: &mut dyn DecodeSink) -> Result<(), RestError> {
        let text = std::str::from_utf8(bytes).map_err(|e| RestError::Decode {
            content_type: self.content_type().to_string(),
            message: e.to_string(),
        })?;
        let mut deserializer = quick_xml::de::Deserializer::from_str(text);
        let mut erased = <dyn erased_serde::Deserializer>::erase(&mut deserializer);
        sink.receive(&mut erased).map_err(|e| RestError::Decode {
            content_type: self.content_type().to_string(),
            message: e.to_string(),
        })
    }
}

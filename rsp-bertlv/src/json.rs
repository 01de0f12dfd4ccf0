//! JSON form of a TLV
//!
//! The ES9+ HTTP binding carries ASN.1 elements inside JSON bodies as the
//! standard base64 encoding of their BER bytes.

use crate::tlv::Tlv;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::de::{self, Deserializer, Visitor};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

impl Tlv {
    /// Base64 of the encoded tree
    pub fn to_base64(&self) -> rsp_core::RspResult<String> {
        Ok(STANDARD.encode(self.encode()?))
    }

    /// Decode a tree from base64 of its BER bytes
    pub fn from_base64(encoded: &str) -> rsp_core::RspResult<Self> {
        let data = STANDARD
            .decode(encoded.trim())
            .map_err(|e| rsp_core::RspError::InvalidData(format!("invalid base64: {}", e)))?;
        let (tlv, _) = Tlv::decode_slice(&data)?;
        Ok(tlv)
    }
}

impl Serialize for Tlv {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = self.to_base64().map_err(ser::Error::custom)?;
        serializer.serialize_str(&encoded)
    }
}

struct TlvVisitor;

impl Visitor<'_> for TlvVisitor {
    type Value = Tlv;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a base64 encoded BER-TLV")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Tlv, E> {
        Tlv::from_base64(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Tlv {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(TlvVisitor)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Tag, Tlv};

    #[test]
    fn test_tlv_json() {
        let tlv = Tlv::constructed(Tag::short(0xA0), vec![Tlv::primitive(Tag::short(0x80), vec![0x01])]);
        let json = serde_json::to_string(&tlv).unwrap();
        assert_eq!(json, "\"oAOAAQE=\"");
        let back: Tlv = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tlv);
    }

    #[test]
    fn test_tlv_json_rejects_garbage() {
        assert!(serde_json::from_str::<Tlv>("\"not base64!\"").is_err());
        assert!(serde_json::from_str::<Tlv>("\"gAU=\"").is_err());
        assert!(serde_json::from_str::<Tlv>("42").is_err());
    }

    #[test]
    fn test_optional_tlv_json() {
        #[derive(serde::Deserialize)]
        struct Body {
            element: Option<Tlv>,
        }
        let body: Body = serde_json::from_str(r#"{"element":null}"#).unwrap();
        assert!(body.element.is_none());
    }
}

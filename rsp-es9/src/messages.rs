//! ES9+ HTTP/JSON request and response bodies

use crate::header::Header;
use rsp_bertlv::Tlv;
use serde::{Deserialize, Serialize};

/// `POST /gsma/rsp2/es9plus/initiateAuthentication` request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateAuthenticationRequest {
    #[serde(with = "base64_bytes")]
    pub euicc_challenge: Vec<u8>,
    pub smdp_address: String,
    pub euicc_info1: Tlv,
}

/// `POST /gsma/rsp2/es9plus/initiateAuthentication` response body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateAuthenticationResponse {
    #[serde(default)]
    pub header: Header,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub transaction_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_signed1: Option<Tlv>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_signature1: Option<Tlv>,
    #[serde(default, rename = "euiccCiPKIdToBeUsed", skip_serializing_if = "Option::is_none")]
    pub euicc_ci_pkid_to_be_used: Option<Tlv>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_certificate: Option<Tlv>,
}

/// `POST /gsma/rsp2/es9plus/authenticateClient` request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateClientRequest {
    pub transaction_id: String,
    pub authenticate_server_response: Tlv,
}

/// Serde adapter for byte strings carried as standard base64
pub mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.trim())
            .map_err(serde::de::Error::custom)
    }
}

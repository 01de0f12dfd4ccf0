//! AuthenticateServerResponse classification
//!
//! ```text
//! AuthenticateServerResponse ::= [56] CHOICE {
//!     authenticateResponseOk    [0] AuthenticateResponseOk,
//!     authenticateResponseError [1] AuthenticateResponseError
//! }
//! ```
//!
//! The relay branches on the first child of the response: a success
//! carries the eUICC report, an error carries a one-byte
//! `authenticateErrorCode`.

use crate::tags;
use rsp_bertlv::{Tag, Tlv};
use rsp_core::{RspError, RspResult};

/// `authenticateErrorCode` values and their ASN.1 names
pub static AUTHENTICATE_ERROR_CODES: &[(u8, &str)] = &[
    (1, "invalidCertificate"),
    (2, "invalidSignature"),
    (3, "unsupportedCurve"),
    (4, "noSessionContext"),
    (5, "invalidOid"),
    (6, "euiccChallengeMismatch"),
    (7, "ciPKUnknown"),
];

/// Name used for codes missing from [`AUTHENTICATE_ERROR_CODES`]
pub const UNDEFINED_ERROR: &str = "undefinedError";

/// Look up the ASN.1 name of an `authenticateErrorCode`
pub fn error_code_reason(code: u8) -> &'static str {
    AUTHENTICATE_ERROR_CODES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, reason)| *reason)
        .unwrap_or(UNDEFINED_ERROR)
}

/// The branch an AuthenticateServerResponse took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticateServerResponse<'a> {
    /// `authenticateResponseOk`, holding the `[0]` node itself
    Ok(&'a Tlv),
    /// `authenticateResponseError` with its error code
    Error { code: u8 },
    /// Anything else; holds the leading tag when there is one
    Unknown(Option<Tag>),
}

impl<'a> AuthenticateServerResponse<'a> {
    /// Classify a decoded AuthenticateServerResponse
    ///
    /// # Arguments
    /// * `response` - The `[56]` node (its tag itself is not checked)
    ///
    /// # Errors
    /// Returns `MissingElement` if an error branch lacks its error code.
    pub fn classify(response: &'a Tlv) -> RspResult<Self> {
        let Some(first) = response.at(0) else {
            return Ok(Self::Unknown(None));
        };
        match first.tag() {
            tags::CONSTRUCTED_0 => Ok(Self::Ok(first)),
            tags::CONSTRUCTED_1 => {
                let code = first
                    .first(tags::INTEGER)
                    .and_then(|code| code.value().first().copied())
                    .ok_or(RspError::MissingElement("authenticateErrorCode"))?;
                Ok(Self::Error { code })
            }
            other => Ok(Self::Unknown(Some(other))),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// The error this branch reports to the client
    ///
    /// A success is not an error by itself; the relay decides what a
    /// success turns into once the report has been handled.
    pub fn to_error(&self) -> Option<RspError> {
        match *self {
            Self::Ok(_) => None,
            Self::Error { code } => Some(RspError::AuthenticateResponse {
                code,
                reason: error_code_reason(code),
            }),
            Self::Unknown(_) => Some(RspError::UnknownServerError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(children: Vec<Tlv>) -> Tlv {
        Tlv::constructed(tags::AUTHENTICATE_SERVER_RESPONSE, children)
    }

    #[test]
    fn test_error_branch() {
        let tlv = response(vec![Tlv::constructed(
            tags::CONSTRUCTED_1,
            vec![Tlv::primitive(tags::INTEGER, vec![0x03])],
        )]);
        let branch = AuthenticateServerResponse::classify(&tlv).unwrap();
        assert_eq!(branch, AuthenticateServerResponse::Error { code: 3 });
        let err = branch.to_error().unwrap();
        assert_eq!(err.to_string(), "AuthenticateResponseError: unsupportedCurve (3)");
    }

    #[test]
    fn test_undefined_error_code() {
        assert_eq!(error_code_reason(7), "ciPKUnknown");
        assert_eq!(error_code_reason(0), UNDEFINED_ERROR);
        let err = AuthenticateServerResponse::Error { code: 127 }.to_error().unwrap();
        assert_eq!(err.to_string(), "AuthenticateResponseError: undefinedError (127)");
    }

    #[test]
    fn test_ok_branch() {
        let ok = Tlv::constructed(tags::CONSTRUCTED_0, vec![Tlv::constructed(Tag::short(0x30), vec![])]);
        let tlv = response(vec![ok.clone()]);
        let branch = AuthenticateServerResponse::classify(&tlv).unwrap();
        assert!(branch.is_ok());
        assert_eq!(branch, AuthenticateServerResponse::Ok(&ok));
        assert!(branch.to_error().is_none());
    }

    #[test]
    fn test_unknown_branch() {
        let tlv = response(vec![Tlv::primitive(Tag::short(0x82), vec![0x01])]);
        let branch = AuthenticateServerResponse::classify(&tlv).unwrap();
        assert_eq!(branch, AuthenticateServerResponse::Unknown(Some(Tag::short(0x82))));
        assert!(matches!(branch.to_error(), Some(RspError::UnknownServerError)));

        let empty = response(vec![]);
        assert_eq!(
            AuthenticateServerResponse::classify(&empty).unwrap(),
            AuthenticateServerResponse::Unknown(None)
        );
    }

    #[test]
    fn test_error_branch_without_code() {
        let tlv = response(vec![Tlv::constructed(tags::CONSTRUCTED_1, vec![])]);
        assert!(matches!(
            AuthenticateServerResponse::classify(&tlv),
            Err(RspError::MissingElement("authenticateErrorCode"))
        ));
    }
}

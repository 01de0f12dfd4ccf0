//! Tags of the SGP.22 ASN.1 elements the relay reads or writes

use rsp_bertlv::Tag;

/// `InitiateAuthenticationRequest ::= [57]`
pub const INITIATE_AUTHENTICATION_REQUEST: Tag = Tag::long(0xBF, 0x39);
/// `AuthenticateClientRequest ::= [59]`
pub const AUTHENTICATE_CLIENT_REQUEST: Tag = Tag::long(0xBF, 0x3B);
/// `AuthenticateServerResponse ::= [56]`
pub const AUTHENTICATE_SERVER_RESPONSE: Tag = Tag::long(0xBF, 0x38);
/// `EUICCInfo1 ::= [32]`
pub const EUICC_INFO1: Tag = Tag::long(0xBF, 0x20);
/// `EUICCInfo2 ::= [34]`
pub const EUICC_INFO2: Tag = Tag::long(0xBF, 0x22);

/// `[0]` transactionId / matchingId / platformLabel
pub const CONTEXT_0: Tag = Tag::short(0x80);
/// `[1]` euiccChallenge / profileVersion / discoveryBaseURL
pub const CONTEXT_1: Tag = Tag::short(0x81);
/// `[2]` svn
pub const SVN: Tag = Tag::short(0x82);
/// `[3]` smdpAddress / serverAddress / euiccFirmwareVer
pub const CONTEXT_3: Tag = Tag::short(0x83);

/// `[9] euiccCiPKIdListForVerification`
pub const CI_PKID_LIST_FOR_VERIFICATION: Tag = Tag::short(0xA9);
/// `[10] euiccCiPKIdListForSigning`
pub const CI_PKID_LIST_FOR_SIGNING: Tag = Tag::short(0xAA);
/// `SubjectKeyIdentifier ::= OCTET STRING`
pub const OCTET_STRING: Tag = Tag::short(0x04);

/// `[0] authenticateResponseOk` / `[0] initiateAuthenticationOk` / `[0] ctxParams1`
pub const CONSTRUCTED_0: Tag = Tag::short(0xA0);
/// `[1] authenticateResponseError` / `[1] deviceInfo`
pub const CONSTRUCTED_1: Tag = Tag::short(0xA1);
/// `authenticateErrorCode INTEGER`
pub const INTEGER: Tag = Tag::short(0x02);

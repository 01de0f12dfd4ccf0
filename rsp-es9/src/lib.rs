//! ES9+ binding for the RSP dump relay
//!
//! This crate provides the pieces of SGP.22 the relay speaks on top of the
//! BER-TLV codec:
//!
//! - [`messages`]: ES9+ HTTP/JSON request and response bodies
//! - [`header`]: the `functionExecutionStatus` envelope
//! - [`authenticate`]: AuthenticateServerResponse success/error branches
//! - [`report`]: `EUICCInfo2` and certificate report extraction
//! - [`tags`]: tags of the elements the relay reads or rewrites
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use rsp_es9::{AuthenticateServerResponse, Report};
//!
//! if let AuthenticateServerResponse::Ok(ok) = AuthenticateServerResponse::classify(&response)? {
//!     let report = Report::extract(ok);
//!     println!("{}", report.euicc_info2_json()?);
//! }
//! ```

pub mod authenticate;
pub mod header;
pub mod messages;
pub mod report;
pub mod tags;

pub use authenticate::{AUTHENTICATE_ERROR_CODES, AuthenticateServerResponse, error_code_reason};
pub use header::{FunctionExecutionStatus, GeneralResponse, Header, Status, StatusCodeData};
pub use messages::{AuthenticateClientRequest, InitiateAuthenticationRequest, InitiateAuthenticationResponse};
pub use report::{CertificationData, DeviceInfo, EuiccCategory, EuiccInfo2, Report};

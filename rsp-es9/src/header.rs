//! ES9+ response header and function execution status
//!
//! Every ES9+ JSON response starts with a header:
//!
//! ```text
//! {"header":{"functionExecutionStatus":{
//!     "status":"Failed",
//!     "statusCodeData":{"subjectCode":"8.11.1","reasonCode":"3.9","message":"..."}}}}
//! ```
//!
//! `statusCodeData` is only present when the function did not succeed.

use rsp_core::RspError;
use serde::{Deserialize, Serialize};

/// Outcome of an ES9+ function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[default]
    #[serde(rename = "Executed-Success")]
    ExecutedSuccess,
    #[serde(rename = "Executed-WithWarning")]
    ExecutedWithWarning,
    #[serde(rename = "Failed")]
    Failed,
    #[serde(rename = "Expired")]
    Expired,
}

impl Status {
    pub fn is_success(self) -> bool {
        matches!(self, Status::ExecutedSuccess | Status::ExecutedWithWarning)
    }
}

/// Subject/reason code pair with an optional diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCodeData {
    pub subject_code: String,
    pub reason_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Subject code 8.11.1 (CI Public Key), reason 3.9 (Unknown)
const CI_PUBLIC_KEY_UNKNOWN: (&str, &str) = ("8.11.1", "3.9");
/// Generic subject/reason used for every other failure
const GENERIC_FAILURE: (&str, &str) = ("1.1", "1.1");

impl StatusCodeData {
    pub fn new(subject_code: &str, reason_code: &str, message: impl Into<String>) -> Self {
        Self {
            subject_code: subject_code.to_string(),
            reason_code: reason_code.to_string(),
            subject_identifier: None,
            message: Some(message.into()),
        }
    }

    /// Status code data describing a relay error
    pub fn from_error(error: &RspError) -> Self {
        let (subject, reason) = match error {
            RspError::IssuerNotFound => CI_PUBLIC_KEY_UNKNOWN,
            _ => GENERIC_FAILURE,
        };
        Self::new(subject, reason, error.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionExecutionStatus {
    #[serde(default)]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code_data: Option<StatusCodeData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    #[serde(default)]
    pub function_execution_status: FunctionExecutionStatus,
}

impl Header {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn failed(data: StatusCodeData) -> Self {
        Self {
            function_execution_status: FunctionExecutionStatus {
                status: Status::Failed,
                status_code_data: Some(data),
            },
        }
    }

    pub fn from_error(error: &RspError) -> Self {
        Self::failed(StatusCodeData::from_error(error))
    }

    pub fn status(&self) -> Status {
        self.function_execution_status.status
    }

    pub fn is_success(&self) -> bool {
        self.status().is_success()
    }
}

/// Header-only response body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralResponse {
    #[serde(default)]
    pub header: Header,
}

impl GeneralResponse {
    pub fn from_error(error: &RspError) -> Self {
        Self {
            header: Header::from_error(error),
        }
    }
}

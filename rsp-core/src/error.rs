use thiserror::Error;

/// Main error type for RSP relay operations
///
/// Codec errors (`MalformedTag` through `InputTooLarge`) abort decoding or
/// encoding of a single TLV subtree. Relay errors abort only the current
/// authentication attempt and are reported to the caller as an ES9+ status
/// envelope.
#[derive(Error, Debug)]
pub enum RspError {
    #[error("malformed tag: {0}")]
    MalformedTag(String),

    #[error("unsupported tag length: tags are at most 3 bytes, got {0}")]
    UnsupportedTagLength(usize),

    #[error("unsupported length encoding: first byte 0x{0:02X}")]
    UnsupportedLengthEncoding(u8),

    #[error("truncated length: need {needed} bytes, got {available}")]
    TruncatedLength { needed: usize, available: usize },

    #[error("tag {tag}: indicated value end {end} is out of bounds (buffer holds {available} bytes)")]
    LengthOutOfBounds {
        tag: String,
        end: usize,
        available: usize,
    },

    #[error("tag {tag}: invalid child object at offset {offset}: {source}")]
    MalformedChild {
        tag: String,
        offset: usize,
        #[source]
        source: Box<RspError>,
    },

    #[error("value too large: {0} bytes (max 65535)")]
    ValueTooLarge(usize),

    #[error("nesting depth exceeds {0}")]
    DepthExceeded(usize),

    #[error("input too large: {size} bytes (max {max})")]
    InputTooLarge { size: usize, max: usize },

    #[error("no upstream SM-DP+ is registered for the requested issuer")]
    IssuerNotFound,

    #[error("InitiateAuthenticationResponse: issuer is mismatch ({0})")]
    IssuerMismatch(String),

    #[error("ES10b#AuthenticateServer: An unknown error occurred")]
    UnknownServerError,

    #[error("AuthenticateResponseError: {reason} ({code})")]
    AuthenticateResponse { code: u8, reason: &'static str },

    #[error("AuthenticateResponseOk: extract information finished")]
    ExtractionFinished,

    #[error("missing element: {0}")]
    MissingElement(&'static str),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("report error: {0}")]
    Report(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RspError {
    /// Wrap a child decode failure with its parent tag and byte offset
    pub fn in_child(self, tag: impl Into<String>, offset: usize) -> Self {
        RspError::MalformedChild {
            tag: tag.into(),
            offset,
            source: Box::new(self),
        }
    }
}

/// Result type alias for RSP relay operations
pub type RspResult<T> = Result<T, RspError>;

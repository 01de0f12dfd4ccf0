//! rsp-dump - SM-DP+ impersonating relay for GSMA eSIM RSP
//!
//! The relay stands in for an SM-DP+ during the ES9+ mutual
//! authentication, forwards InitiateAuthentication to a real SM-DP+ of the
//! eUICC's CI, and turns the eUICC's AuthenticateServer response into a
//! capability report instead of downloading a profile.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `rsp-core`: Error handling, version triples, key identifiers
//! - `rsp-bertlv`: BER-TLV encoding/decoding
//! - `rsp-es9`: ES9+ messages, status envelope, report extraction
//! - `rsp-server`: Issuer routing, relay handler, report writer, HTTP listener
//! - `rsp-dump`: This facade, the configuration and the `rsp-dump` binary
//!
//! # Usage
//!
//! ```rust,ignore
//! use rsp_dump::config::Config;
//!
//! let config = Config::load("rsp-config.json")?;
//! let relay = config.build_relay()?;
//! config.build_listener(relay).start().await?;
//! ```

pub mod config;

// Re-export core types
pub use rsp_core::{KeyIdentifier, RspError, RspResult, Version};

// Re-export the codec
pub mod bertlv {
    pub use rsp_bertlv::*;
}

// Re-export the ES9+ binding
pub mod es9 {
    pub use rsp_es9::*;
}

// Re-export server API
pub mod server {
    pub use rsp_server::*;
}

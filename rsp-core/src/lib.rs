//! Core types and utilities for the RSP dump relay
//!
//! This crate provides the error type shared by every layer of the stack,
//! plus the small value types (version triples, key identifiers) that the
//! codec, the ES9+ binding and the relay all exchange.

pub mod error;
pub mod key_id;
pub mod version;

pub use error::{RspError, RspResult};
pub use key_id::KeyIdentifier;
pub use version::Version;

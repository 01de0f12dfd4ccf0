//! BER-TLV codec for the GSMA RSP protocol
//!
//! This crate provides the tag and length codecs and a recursive TLV tree
//! used to read and rewrite the ES10b/ES9+ ASN.1 structures exchanged
//! between an eUICC and an SM-DP+.
//!
//! # Overview
//!
//! ```text
//! [Tag 1-3 bytes] [Length 1-3 bytes] [Value: bytes | nested TLVs]
//! ```
//!
//! - [`Tag`]: class, form and number, compared by exact bytes
//! - [`Length`]: short form and the `0x81`/`0x82` long forms (max 65535)
//! - [`Tlv`]: tree node with navigation (`at`, `first`, `find`, `select`)
//!   and BIT STRING feature decoding
//! - [`TlvDecoder`]: decoding with depth and input-size limits
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use rsp_bertlv::{Tag, Tlv};
//!
//! let (info1, _) = Tlv::decode_slice(&data)?;
//! let svn = info1.first(Tag::short(0x82));
//! ```

pub mod decoder;
pub mod json;
pub mod length;
pub mod tag;
pub mod tlv;

pub use decoder::{DecodeLimits, TlvDecoder};
pub use length::{Length, decode_length, encode_length};
pub use tag::{Class, Form, Tag};
pub use tlv::{Content, Tlv};

//! BER-TLV decoder with resource limits
//!
//! Peers of the relay are untrusted network clients, so decoding is bounded
//! both in input size and in nesting depth. Decoding is single-pass and
//! recursive; each constructed node recurses once per nesting level.

use crate::length::{Length, MAX_LENGTH};
use crate::tag::{Tag, MAX_TAG_LENGTH};
use crate::tlv::{Content, Tlv};
use bytes::Bytes;
use rsp_core::{RspError, RspResult};

/// Default maximum nesting depth
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Largest buffer a single TLV can occupy (3-byte tag, 3-byte length, 65535 value bytes)
pub const DEFAULT_MAX_INPUT: usize = MAX_TAG_LENGTH + 3 + MAX_LENGTH;

/// Resource limits applied while decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Deepest nesting level accepted; the root is level 0
    pub max_depth: usize,
    /// Largest input buffer accepted
    pub max_input: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_input: DEFAULT_MAX_INPUT,
        }
    }
}

/// BER-TLV decoder
///
/// Primitive values of the decoded tree are zero-copy slices of the input
/// [`Bytes`]; they keep the input buffer alive for as long as the tree is
/// held.
///
/// # Usage Example
///
/// ```rust,ignore
/// use bytes::Bytes;
/// use rsp_bertlv::{DecodeLimits, TlvDecoder};
///
/// let data = Bytes::from_static(&[0xA0, 0x03, 0x80, 0x01, 0x07]);
/// let decoder = TlvDecoder::new(DecodeLimits { max_depth: 8, ..Default::default() });
/// let (tlv, consumed) = decoder.decode(&data)?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TlvDecoder {
    limits: DecodeLimits,
}

impl TlvDecoder {
    pub fn new(limits: DecodeLimits) -> Self {
        Self { limits }
    }

    /// Decode one TLV from the front of `data`
    ///
    /// # Returns
    /// `(Tlv, bytes_consumed)`. Trailing bytes after the first element are
    /// left untouched; callers decoding a concatenation advance by
    /// `bytes_consumed` themselves.
    pub fn decode(&self, data: &Bytes) -> RspResult<(Tlv, usize)> {
        if data.len() > self.limits.max_input {
            return Err(RspError::InputTooLarge {
                size: data.len(),
                max: self.limits.max_input,
            });
        }
        self.decode_node(data, 0)
    }

    /// Decode one TLV from a borrowed buffer, copying it first
    pub fn decode_slice(&self, data: &[u8]) -> RspResult<(Tlv, usize)> {
        if data.len() > self.limits.max_input {
            return Err(RspError::InputTooLarge {
                size: data.len(),
                max: self.limits.max_input,
            });
        }
        self.decode_node(&Bytes::copy_from_slice(data), 0)
    }

    fn decode_node(&self, data: &Bytes, depth: usize) -> RspResult<(Tlv, usize)> {
        if depth > self.limits.max_depth {
            return Err(RspError::DepthExceeded(self.limits.max_depth));
        }

        let tag = Tag::decode(data)?;
        let mut index = tag.len();
        let (length, length_bytes) = Length::decode(&data[index..])?;
        index += length_bytes;

        let end = index + length.value();
        if end > data.len() {
            return Err(RspError::LengthOutOfBounds {
                tag: tag.to_hex(),
                end,
                available: data.len(),
            });
        }

        let content = if tag.is_constructed() {
            let region = data.slice(index..end);
            let mut children = Vec::new();
            let mut offset = 0;
            while offset < region.len() {
                let (child, consumed) = self
                    .decode_node(&region.slice(offset..), depth + 1)
                    .map_err(|e| e.in_child(tag.to_hex(), offset))?;
                children.push(child);
                offset += consumed;
            }
            Content::Children(children)
        } else {
            Content::Value(data.slice(index..end))
        };

        Ok((Tlv::from_parts(tag, content), end))
    }
}

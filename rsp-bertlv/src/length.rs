//! BER length encoding
//!
//! Only the three forms used by RSP structures are supported:
//!
//! ```text
//! 0LLLLLLL               0..=127
//! 10000001 LLLLLLLL      128..=255
//! 10000010 LLLLLLLL x2   256..=65535 (big-endian)
//! ```
//!
//! Indefinite lengths and lengths with more than two length bytes are
//! rejected.

use rsp_core::{RspError, RspResult};

/// Largest value length the codec can express
pub const MAX_LENGTH: usize = 0xFFFF;

/// BER length in one of its supported forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Length {
    /// Short form: 0-127
    Short(u8),
    /// Long form with one length byte: 128-255
    Long1(u8),
    /// Long form with two length bytes: 256-65535
    Long2(u16),
}

impl Length {
    /// Choose the shortest form for `length`
    ///
    /// # Errors
    /// Returns `ValueTooLarge` if `length` exceeds 65535.
    pub fn new(length: usize) -> RspResult<Self> {
        match length {
            0..=0x7F => Ok(Length::Short(length as u8)),
            0x80..=0xFF => Ok(Length::Long1(length as u8)),
            0x100..=MAX_LENGTH => Ok(Length::Long2(length as u16)),
            _ => Err(RspError::ValueTooLarge(length)),
        }
    }

    /// Get the length value
    pub fn value(&self) -> usize {
        match *self {
            Length::Short(n) | Length::Long1(n) => n as usize,
            Length::Long2(n) => n as usize,
        }
    }

    /// Number of bytes the encoded length occupies
    pub fn encoded_len(&self) -> usize {
        match self {
            Length::Short(_) => 1,
            Length::Long1(_) => 2,
            Length::Long2(_) => 3,
        }
    }

    /// Append the encoded length to `out`
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match *self {
            Length::Short(n) => out.push(n),
            Length::Long1(n) => out.extend_from_slice(&[0x81, n]),
            Length::Long2(n) => {
                out.push(0x82);
                out.extend_from_slice(&n.to_be_bytes());
            }
        }
    }

    /// Encode length to bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out);
        out
    }

    /// Decode a length from the front of `data`
    ///
    /// # Returns
    /// `(Length, bytes_consumed)`
    ///
    /// # Errors
    /// - `TruncatedLength` if the buffer ends before the length does
    /// - `UnsupportedLengthEncoding` for any first byte other than
    ///   `0x00-0x7F`, `0x81` or `0x82`
    pub fn decode(data: &[u8]) -> RspResult<(Self, usize)> {
        let Some(&first) = data.first() else {
            return Err(RspError::TruncatedLength { needed: 1, available: 0 });
        };
        let length = match first {
            0x00..=0x7F => Length::Short(first),
            0x81 => match data.get(1) {
                Some(&n) => Length::Long1(n),
                None => {
                    return Err(RspError::TruncatedLength {
                        needed: 2,
                        available: data.len(),
                    });
                }
            },
            0x82 => match data.get(1..3) {
                Some(&[hi, lo]) => Length::Long2(u16::from_be_bytes([hi, lo])),
                _ => {
                    return Err(RspError::TruncatedLength {
                        needed: 3,
                        available: data.len(),
                    });
                }
            },
            _ => return Err(RspError::UnsupportedLengthEncoding(first)),
        };
        Ok((length, length.encoded_len()))
    }
}

/// Encode a value length, shortest form first
pub fn encode_length(length: usize) -> RspResult<Vec<u8>> {
    Ok(Length::new(length)?.encode())
}

/// Decode a value length; returns `(length, bytes_consumed)`
pub fn decode_length(data: &[u8]) -> RspResult<(usize, usize)> {
    let (length, consumed) = Length::decode(data)?;
    Ok((length.value(), consumed))
}

//! BER tag encoding
//!
//! A tag identifies one TLV element. It is kept as its raw byte form
//! (1 to 3 bytes) because RSP structures are matched by exact tag bytes,
//! e.g. `BF22` for `EUICCInfo2` or `A0` for the first context-specific
//! constructed element.
//!
//! ```text
//! Bits: 8 7 6 5 4 3 2 1
//!       C C F N N N N N     first byte
//!       1 N N N N N N N     continuation byte (more follow)
//!       0 N N N N N N N     last byte
//! ```
//!
//! CC = class, F = form (0 primitive, 1 constructed), NNNNN = tag number
//! (0-30), or 11111 when the number continues in the following bytes.

use rsp_core::{RspError, RspResult};
use std::fmt;

/// Maximum number of bytes in a tag
pub const MAX_TAG_LENGTH: usize = 3;

const NUMBER_ESCAPE: u8 = 0x1F;
const CONTINUATION: u8 = 0x80;

/// BER tag class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Class {
    /// Universal class (00)
    Universal = 0,
    /// Application class (01)
    Application = 1,
    /// Context-specific class (10)
    ContextSpecific = 2,
    /// Private class (11)
    Private = 3,
}

impl Class {
    /// Get tag class from the first tag byte (bits 8-7)
    pub fn from_bits(byte: u8) -> Self {
        match (byte >> 6) & 0x03 {
            0 => Class::Universal,
            1 => Class::Application,
            2 => Class::ContextSpecific,
            _ => Class::Private,
        }
    }

    /// Convert tag class to bits of the first tag byte
    pub fn to_bits(self) -> u8 {
        (self as u8) << 6
    }
}

/// BER encoding form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Form {
    /// The value is a plain byte string
    Primitive = 0,
    /// The value is a sequence of nested TLV elements
    Constructed = 1,
}

impl Form {
    pub fn to_bits(self) -> u8 {
        (self as u8) << 5
    }
}

/// BER tag, stored as its encoded bytes
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    bytes: [u8; MAX_TAG_LENGTH],
    len: u8,
}

impl Tag {
    /// One-byte tag from its encoded byte
    pub const fn short(b0: u8) -> Self {
        Self { bytes: [b0, 0, 0], len: 1 }
    }

    /// Two-byte tag from its encoded bytes, e.g. `Tag::long(0xBF, 0x22)`
    pub const fn long(b0: u8, b1: u8) -> Self {
        Self { bytes: [b0, b1, 0], len: 2 }
    }

    /// Three-byte tag from its encoded bytes
    pub const fn long3(b0: u8, b1: u8, b2: u8) -> Self {
        Self { bytes: [b0, b1, b2], len: 3 }
    }

    /// Build a tag from class, form and number
    ///
    /// Numbers below 31 are packed into the first byte. Larger numbers are
    /// written as big-endian 7-bit groups using the fewest bytes, with the
    /// continuation bit set on every group but the last.
    ///
    /// # Errors
    /// Returns `UnsupportedTagLength` if the number needs more than two
    /// continuation bytes (numbers of 16384 and above).
    pub fn new(class: Class, form: Form, number: u32) -> RspResult<Self> {
        let lead = class.to_bits() | form.to_bits();
        if number < NUMBER_ESCAPE as u32 {
            return Ok(Self::short(lead | number as u8));
        }

        let mut groups = 1;
        while groups < 5 && number >> (7 * groups) != 0 {
            groups += 1;
        }
        if 1 + groups > MAX_TAG_LENGTH {
            return Err(RspError::UnsupportedTagLength(1 + groups));
        }

        let mut bytes = [lead | NUMBER_ESCAPE, 0, 0];
        for index in 0..groups {
            let shift = 7 * (groups - 1 - index);
            let mut byte = ((number >> shift) & 0x7F) as u8;
            if index + 1 < groups {
                byte |= CONTINUATION;
            }
            bytes[1 + index] = byte;
        }
        Ok(Self {
            bytes,
            len: (1 + groups) as u8,
        })
    }

    /// Read one tag from the front of `data`
    ///
    /// Only the bytes belonging to the tag are consumed; use [`Tag::len`]
    /// to advance past it.
    ///
    /// # Errors
    /// - `MalformedTag` if the buffer is empty or announced continuation
    ///   bytes are missing
    /// - `UnsupportedTagLength` if the tag would need more than 3 bytes
    pub fn decode(data: &[u8]) -> RspResult<Self> {
        let Some(&b0) = data.first() else {
            return Err(RspError::MalformedTag("empty buffer".to_string()));
        };
        if b0 & NUMBER_ESCAPE != NUMBER_ESCAPE {
            return Ok(Self::short(b0));
        }
        let Some(&b1) = data.get(1) else {
            return Err(RspError::MalformedTag(format!(
                "{:02X}: indicated tag encoding with more than one byte, but following bytes are missing",
                b0
            )));
        };
        if b1 & CONTINUATION == 0 {
            return Ok(Self::long(b0, b1));
        }
        let Some(&b2) = data.get(2) else {
            return Err(RspError::MalformedTag(format!(
                "{:02X}{:02X}: indicated tag encoding with three bytes, but following bytes are missing",
                b0, b1
            )));
        };
        if b2 & CONTINUATION != 0 {
            return Err(RspError::UnsupportedTagLength(MAX_TAG_LENGTH + 1));
        }
        Ok(Self::long3(b0, b1, b2))
    }

    /// Take `bytes` as a complete tag and validate it
    pub fn from_bytes(bytes: &[u8]) -> RspResult<Self> {
        let tag = match *bytes {
            [] => return Err(RspError::MalformedTag("empty tag".to_string())),
            [b0] => Self::short(b0),
            [b0, b1] => Self::long(b0, b1),
            [b0, b1, b2] => Self::long3(b0, b1, b2),
            _ => return Err(RspError::UnsupportedTagLength(bytes.len())),
        };
        tag.validate()?;
        Ok(tag)
    }

    /// Cross-check the byte count against the continuation-bit pattern
    pub fn validate(&self) -> RspResult<()> {
        let bytes = self.as_bytes();
        let escaped = bytes[0] & NUMBER_ESCAPE == NUMBER_ESCAPE;
        match bytes.len() {
            1 if escaped => Err(RspError::MalformedTag(
                "tag consists of one byte but indicates that more bytes follow".to_string(),
            )),
            1 => Ok(()),
            n if !escaped => Err(RspError::MalformedTag(format!(
                "tag consists of {} bytes but first byte does not indicate that more bytes follow",
                n
            ))),
            2 if bytes[1] & CONTINUATION != 0 => Err(RspError::MalformedTag(
                "tag consists of 2 bytes but indicates that more bytes follow".to_string(),
            )),
            2 => Ok(()),
            _ if bytes[1] & CONTINUATION == 0 => Err(RspError::MalformedTag(
                "tag consists of 3 bytes but second byte does not indicate that more bytes follow".to_string(),
            )),
            _ if bytes[2] & CONTINUATION != 0 => Err(RspError::MalformedTag(
                "tag consists of 3 bytes but last byte indicates that more bytes follow".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Encoded tag bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Encoded tag bytes as upper-case hex, e.g. `"BF22"`
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.as_bytes())
    }

    /// Number of encoded bytes (1-3)
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn class(&self) -> Class {
        Class::from_bits(self.bytes[0])
    }

    pub fn is_primitive(&self) -> bool {
        self.bytes[0] & 0x20 == 0
    }

    pub fn is_constructed(&self) -> bool {
        !self.is_primitive()
    }

    /// Decode the tag number
    pub fn value(&self) -> u32 {
        let low = self.bytes[0] & NUMBER_ESCAPE;
        if low != NUMBER_ESCAPE {
            return low as u32;
        }
        self.as_bytes()[1..]
            .iter()
            .fold(0u32, |number, byte| (number << 7) | (byte & 0x7F) as u32)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.class() {
            Class::Universal => write!(f, "[Universal {}]", self.value()),
            Class::Application => write!(f, "[Application {}]", self.value()),
            Class::ContextSpecific => write!(f, "[{}]", self.value()),
            Class::Private => write!(f, "[Private {}]", self.value()),
        }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tag_short_form() {
        let tag = Tag::new(Class::ContextSpecific, Form::Constructed, 0).unwrap();
        assert_eq!(tag.as_bytes(), &[0xA0]);
        assert!(tag.is_constructed());
        assert_eq!(tag.class(), Class::ContextSpecific);
        assert_eq!(tag.value(), 0);
    }

    #[test]
    fn test_tag_extended_form() {
        // EUICCInfo2 ::= [34]
        let tag = Tag::new(Class::ContextSpecific, Form::Constructed, 34).unwrap();
        assert_eq!(tag, Tag::long(0xBF, 0x22));
        assert_eq!(tag.value(), 34);

        // euiccSignature1 ::= [APPLICATION 55]
        let tag = Tag::new(Class::Application, Form::Primitive, 55).unwrap();
        assert_eq!(tag.as_bytes(), &[0x5F, 0x37]);
    }

    #[test]
    fn test_tag_minimal_bytes() {
        assert_eq!(Tag::new(Class::Universal, Form::Primitive, 31).unwrap().len(), 2);
        assert_eq!(Tag::new(Class::Universal, Form::Primitive, 127).unwrap().len(), 2);
        let tag = Tag::new(Class::Private, Form::Primitive, 128).unwrap();
        assert_eq!(tag.as_bytes(), &[0xDF, 0x81, 0x00]);
        assert_eq!(tag.value(), 128);
    }

    #[test]
    fn test_tag_number_too_large() {
        let err = Tag::new(Class::Universal, Form::Primitive, 0x4000).unwrap_err();
        assert!(matches!(err, RspError::UnsupportedTagLength(4)));
    }

    #[test]
    fn test_tag_decode() {
        assert_eq!(Tag::decode(&[0x80, 0x01]).unwrap(), Tag::short(0x80));
        assert_eq!(Tag::decode(&[0xBF, 0x20, 0x10]).unwrap(), Tag::long(0xBF, 0x20));
        assert_eq!(Tag::decode(&[0x9F, 0x81, 0x01, 0x00]).unwrap(), Tag::long3(0x9F, 0x81, 0x01));
    }

    #[test]
    fn test_tag_decode_missing_bytes() {
        assert!(matches!(Tag::decode(&[]), Err(RspError::MalformedTag(_))));
        assert!(matches!(Tag::decode(&[0xBF]), Err(RspError::MalformedTag(_))));
        assert!(matches!(Tag::decode(&[0xBF, 0x81]), Err(RspError::MalformedTag(_))));
    }

    #[test]
    fn test_tag_decode_too_long() {
        let err = Tag::decode(&[0xBF, 0x81, 0x81, 0x01]).unwrap_err();
        assert!(matches!(err, RspError::UnsupportedTagLength(4)));
    }

    #[test]
    fn test_tag_validate() {
        assert!(Tag::short(0x81).validate().is_ok());
        assert!(Tag::short(0x9F).validate().is_err());
        assert!(Tag::long(0x81, 0x01).validate().is_err());
        assert!(Tag::long(0xBF, 0x81).validate().is_err());
        assert!(Tag::long3(0xBF, 0x01, 0x01).validate().is_err());
        assert!(Tag::long3(0xBF, 0x81, 0x01).validate().is_ok());
        assert!(Tag::from_bytes(&[0xBF, 0x81, 0x81, 0x01]).is_err());
    }

    #[test]
    fn test_tag_display() {
        assert_eq!(Tag::long(0xBF, 0x22).to_string(), "[34]");
        assert_eq!(Tag::short(0x30).to_string(), "[Universal 16]");
        assert_eq!(Tag::long(0x5F, 0x37).to_string(), "[Application 55]");
        assert_eq!(format!("{:?}", Tag::long(0xBF, 0x22)), "Tag(BF22)");
        assert_eq!(Tag::short(0xA0).to_hex(), "A0");
        assert_eq!(Tag::short(0x80).to_hex(), "80");
    }

    proptest! {
        #[test]
        fn prop_tag_number_round_trip(class in 0u8..4, constructed in any::<bool>(), number in 0u32..0x4000) {
            let class = Class::from_bits(class << 6);
            let form = if constructed { Form::Constructed } else { Form::Primitive };
            let tag = Tag::new(class, form, number).unwrap();
            let decoded = Tag::decode(tag.as_bytes()).unwrap();
            prop_assert_eq!(decoded, tag);
            prop_assert_eq!(decoded.value(), number);
            prop_assert_eq!(decoded.class(), class);
            prop_assert_eq!(decoded.is_constructed(), constructed);
            prop_assert!(decoded.validate().is_ok());
            if number < 31 {
                prop_assert_eq!(tag.len(), 1);
            }
        }
    }
}

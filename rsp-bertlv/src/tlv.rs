//! BER-TLV tree
//!
//! A [`Tlv`] owns its tag and either a primitive value or an ordered list of
//! child nodes, never both. Trees are built fresh by every decode or build
//! call and encoded on demand.

use crate::decoder::TlvDecoder;
use crate::length::Length;
use crate::tag::Tag;
use bytes::Bytes;
use rsp_core::RspResult;
use std::borrow::Cow;

/// Content of a TLV node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Value bytes of a primitive node
    Value(Bytes),
    /// Children of a constructed node, in wire order
    Children(Vec<Tlv>),
}

/// One BER-TLV element and everything nested below it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    tag: Tag,
    content: Content,
}

impl Tlv {
    /// Build a primitive node
    pub fn primitive(tag: Tag, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            content: Content::Value(value.into()),
        }
    }

    /// Build a constructed node
    pub fn constructed(tag: Tag, children: Vec<Tlv>) -> Self {
        Self {
            tag,
            content: Content::Children(children),
        }
    }

    pub(crate) fn from_parts(tag: Tag, content: Content) -> Self {
        Self { tag, content }
    }

    /// Decode one TLV from the front of `data` with default limits
    ///
    /// Primitive values are views into `data` (no copy).
    ///
    /// # Returns
    /// `(Tlv, bytes_consumed)`
    pub fn decode(data: &Bytes) -> RspResult<(Self, usize)> {
        TlvDecoder::default().decode(data)
    }

    /// Decode one TLV from a borrowed buffer with default limits
    ///
    /// The buffer is copied once, so the tree does not borrow from `data`.
    pub fn decode_slice(data: &[u8]) -> RspResult<(Self, usize)> {
        TlvDecoder::default().decode_slice(data)
    }

    /// Encode the tree to BER bytes
    ///
    /// # Errors
    /// Returns `ValueTooLarge` if any node's value exceeds 65535 bytes.
    pub fn encode(&self) -> RspResult<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_into(&mut out)?;
        Ok(out)
    }

    /// Append the encoded tree to `out`
    pub fn encode_into(&self, out: &mut Vec<u8>) -> RspResult<()> {
        let value = match &self.content {
            Content::Value(value) => Cow::Borrowed(&value[..]),
            Content::Children(children) => {
                let mut buf = Vec::new();
                for child in children {
                    child.encode_into(&mut buf)?;
                }
                Cow::Owned(buf)
            }
        };
        let length = Length::new(value.len())?;
        out.extend_from_slice(self.tag.as_bytes());
        length.encode_into(out);
        out.extend_from_slice(&value);
        Ok(())
    }

    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Value bytes of a primitive node; empty for constructed nodes
    pub fn value(&self) -> &[u8] {
        match &self.content {
            Content::Value(value) => value,
            Content::Children(_) => &[],
        }
    }

    /// Children of a constructed node; empty for primitive nodes
    pub fn children(&self) -> &[Tlv] {
        match &self.content {
            Content::Value(_) => &[],
            Content::Children(children) => children,
        }
    }

    /// Interpret the value as an unsigned big-endian integer
    ///
    /// Only the last 8 bytes are significant; an empty value reads as 0.
    pub fn as_uint(&self) -> u64 {
        let value = self.value();
        let start = value.len().saturating_sub(8);
        value[start..]
            .iter()
            .fold(0u64, |acc, byte| (acc << 8) | *byte as u64)
    }

    /// nth child by position
    pub fn at(&self, index: usize) -> Option<&Tlv> {
        self.children().get(index)
    }

    /// First direct child whose tag bytes equal `tag`
    pub fn first(&self, tag: Tag) -> Option<&Tlv> {
        self.children().iter().find(|child| child.tag == tag)
    }

    /// All direct children whose tag bytes equal `tag`
    pub fn find(&self, tag: Tag) -> impl Iterator<Item = &Tlv> + '_ {
        self.children().iter().filter(move |child| child.tag == tag)
    }

    /// Follow [`Tlv::first`] through a path of tags
    pub fn select(&self, path: &[Tag]) -> Option<&Tlv> {
        path.iter().try_fold(self, |node, tag| node.first(*tag))
    }

    /// Decode the value as an ASN.1 BIT STRING of named features
    ///
    /// The first value byte is the number of unused bits in the last byte;
    /// the remaining bytes are the bit field, most significant bit first.
    /// Set bit `i` yields `definitions[i]`; bits past the end of
    /// `definitions` are ignored.
    pub fn bit_string_features(&self, definitions: &[&str]) -> Vec<String> {
        let Some((&unused, bits)) = self.value().split_first() else {
            return Vec::new();
        };
        let bit_length = (bits.len() * 8).saturating_sub(unused as usize);
        (0..bit_length.min(definitions.len()))
            .filter(|index| (bits[index / 8] >> (7 - index % 8)) & 1 == 1)
            .map(|index| definitions[index].to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::{Class, Form};
    use proptest::prelude::*;
    use rsp_core::RspError;

    fn sample() -> Tlv {
        Tlv::constructed(
            Tag::long(0xBF, 0x20),
            vec![
                Tlv::primitive(Tag::short(0x82), vec![0x02, 0x02, 0x01]),
                Tlv::constructed(Tag::short(0xA9), vec![Tlv::primitive(Tag::short(0x04), vec![0xAA; 20])]),
                Tlv::constructed(
                    Tag::short(0xAA),
                    vec![
                        Tlv::primitive(Tag::short(0x04), vec![0x01; 20]),
                        Tlv::primitive(Tag::short(0x04), vec![0x02; 20]),
                    ],
                ),
            ],
        )
    }

    #[test]
    fn test_encode_decode() {
        let tree = sample();
        let encoded = tree.encode().unwrap();
        assert_eq!(&encoded[..6], &[0xBF, 0x20, 0x4B, 0x82, 0x03, 0x02]);
        let (decoded, consumed) = Tlv::decode_slice(&encoded).unwrap();
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded, tree);
    }

    #[test]
    fn test_decode_leaves_trailing_bytes() {
        let (tlv, consumed) = Tlv::decode_slice(&[0x80, 0x01, 0x07, 0x81, 0x00]).unwrap();
        assert_eq!(consumed, 3);
        assert_eq!(tlv.value(), &[0x07]);
    }

    #[test]
    fn test_decode_empty_value() {
        let (primitive, _) = Tlv::decode_slice(&[0x80, 0x00]).unwrap();
        assert_eq!(primitive, Tlv::primitive(Tag::short(0x80), Vec::new()));
        let (constructed, _) = Tlv::decode_slice(&[0xA0, 0x00]).unwrap();
        assert_eq!(constructed, Tlv::constructed(Tag::short(0xA0), Vec::new()));
        assert!(constructed.at(0).is_none());
    }

    #[test]
    fn test_decode_out_of_bounds() {
        let err = Tlv::decode_slice(&[0x80, 0x05, 0x01, 0x02]).unwrap_err();
        assert!(matches!(err, RspError::LengthOutOfBounds { end: 7, available: 4, .. }));

        let err = Tlv::decode_slice(&[0x80, 0x82, 0xFF, 0xFF, 0x00]).unwrap_err();
        assert!(matches!(err, RspError::LengthOutOfBounds { .. }));
    }

    #[test]
    fn test_encode_value_too_large() {
        let tlv = Tlv::primitive(Tag::short(0x04), vec![0u8; 0x10000]);
        assert!(matches!(tlv.encode(), Err(RspError::ValueTooLarge(0x10000))));

        let nested = Tlv::constructed(
            Tag::short(0x30),
            vec![
                Tlv::primitive(Tag::short(0x04), vec![0u8; 0x8000]),
                Tlv::primitive(Tag::short(0x04), vec![0u8; 0x8000]),
            ],
        );
        assert!(matches!(nested.encode(), Err(RspError::ValueTooLarge(_))));
    }

    #[test]
    fn test_navigation() {
        let tree = sample();
        assert_eq!(tree.at(0).unwrap().tag(), Tag::short(0x82));
        assert!(tree.at(3).is_none());
        assert_eq!(tree.first(Tag::short(0xAA)).unwrap().children().len(), 2);
        assert!(tree.first(Tag::short(0x83)).is_none());
        assert_eq!(tree.select(&[Tag::short(0xAA), Tag::short(0x04)]).unwrap().value(), &[0x01; 20]);
        assert!(tree.select(&[Tag::short(0xAB), Tag::short(0x04)]).is_none());
        assert_eq!(tree.first(Tag::short(0xAA)).unwrap().find(Tag::short(0x04)).count(), 2);
        assert_eq!(tree.select(&[]), Some(&tree));
    }

    #[test]
    fn test_first_uses_exact_bytes() {
        // [34] in two-byte form differs from a non-minimal three-byte spelling
        let tree = Tlv::constructed(
            Tag::short(0xA0),
            vec![Tlv::primitive(Tag::long3(0x9F, 0x80, 0x22), vec![0x01])],
        );
        assert!(tree.first(Tag::long(0x9F, 0x22)).is_none());
        assert!(tree.first(Tag::long3(0x9F, 0x80, 0x22)).is_some());
    }

    #[test]
    fn test_bit_string_features() {
        let tlv = Tlv::primitive(Tag::short(0x88), vec![0x00, 0b1010_0000]);
        assert_eq!(tlv.bit_string_features(&["A", "B", "C", "D"]), vec!["A", "C"]);
    }

    #[test]
    fn test_bit_string_unused_and_extra_bits() {
        // 9 bits in use, bits 0, 7 and 8 set
        let tlv = Tlv::primitive(Tag::short(0x85), vec![0x07, 0b1000_0001, 0b1111_1111]);
        let definitions = ["b0", "b1", "b2", "b3", "b4", "b5", "b6", "b7", "b8", "b9"];
        assert_eq!(tlv.bit_string_features(&definitions), vec!["b0", "b7", "b8"]);
        assert_eq!(tlv.bit_string_features(&definitions[..2]), vec!["b0"]);
        assert!(Tlv::primitive(Tag::short(0x85), Vec::new()).bit_string_features(&definitions).is_empty());
        assert!(Tlv::primitive(Tag::short(0x85), vec![0x00]).bit_string_features(&definitions).is_empty());
    }

    #[test]
    fn test_as_uint() {
        assert_eq!(Tlv::primitive(Tag::short(0x82), vec![0x01, 0x00]).as_uint(), 256);
        assert_eq!(Tlv::primitive(Tag::short(0x82), Vec::new()).as_uint(), 0);
        assert_eq!(Tlv::constructed(Tag::short(0xA0), Vec::new()).as_uint(), 0);
    }

    fn arb_tlv() -> impl Strategy<Value = Tlv> {
        let leaf = (0u8..4, 0u32..0x4000, prop::collection::vec(any::<u8>(), 0..300)).prop_map(
            |(class, number, value)| {
                let tag = Tag::new(Class::from_bits(class << 6), Form::Primitive, number).unwrap();
                Tlv::primitive(tag, value)
            },
        );
        leaf.prop_recursive(4, 24, 5, |inner| {
            (0u8..4, 0u32..0x4000, prop::collection::vec(inner, 0..5)).prop_map(
                |(class, number, children)| {
                    let tag = Tag::new(Class::from_bits(class << 6), Form::Constructed, number).unwrap();
                    Tlv::constructed(tag, children)
                },
            )
        })
    }

    proptest! {
        #[test]
        fn prop_tree_round_trip(tree in arb_tlv()) {
            let encoded = tree.encode().unwrap();
            let (decoded, consumed) = Tlv::decode_slice(&encoded).unwrap();
            prop_assert_eq!(consumed, encoded.len());
            prop_assert_eq!(&decoded, &tree);
            prop_assert_eq!(decoded.encode().unwrap(), encoded);
        }

        #[test]
        fn prop_decode_never_panics(data in prop::collection::vec(any::<u8>(), 0..64)) {
            if let Ok((tlv, consumed)) = Tlv::decode_slice(&data) {
                prop_assert!(consumed <= data.len());
                let encoded = tlv.encode().unwrap();
                let (again, _) = Tlv::decode_slice(&encoded).unwrap();
                prop_assert_eq!(again.encode().unwrap(), encoded);
            }
        }
    }
}

//! Low-level protobuf wire format reading.
//!
//! This module implements just enough of the protobuf wire format to walk a
//! GTFS-Realtime feed without generated message types.
//!
//! ## Wire Format Overview
//!
//! Each protobuf field is encoded as:
//! - A varint "tag" containing the field number and wire type
//! - The field data (format depends on wire type)
//!
//! Wire types accepted here:
//! - 0: VARINT (int32, int64, uint32, uint64, bool, enum)
//! - 1: I64 (fixed64, sfixed64, double)
//! - 2: LEN (string, bytes, embedded messages, packed repeated fields)
//! - 5: I32 (fixed32, sfixed32, float)
//!
//! The deprecated group wire types (3 and 4) never appear in the feed and
//! are rejected.

use crate::error::{Error, Result};
use std::borrow::Cow;

/// Protobuf wire types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed-width
    I64 = 1,
    /// Length-delimited (strings, bytes, embedded messages)
    Len = 2,
    /// 32-bit fixed-width
    I32 = 5,
}

impl TryFrom<u8> for WireType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            5 => Ok(WireType::I32),
            _ => Err(Error::unsupported_wire_type(0, value)),
        }
    }
}

/// A decoded field key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    /// Field number from the message definition
    pub field_number: u32,
    /// How the field value is encoded
    pub wire_type: WireType,
}

impl Tag {
    /// Returns true if this tag is `field_number` encoded as `wire_type`
    pub fn is(&self, field_number: u32, wire_type: WireType) -> bool {
        self.field_number == field_number && self.wire_type == wire_type
    }
}

/// Longest varint accepted by [`Reader::read_varint`]
const MAX_VARINT_GROUPS: usize = 10;

/// Longest varint accepted by [`Reader::read_varint64`]
const MAX_VARINT64_GROUPS: usize = 12;

/// Sequential cursor over one message slice.
///
/// `base` is the absolute offset of `data` within the snapshot, so errors
/// raised by nested readers still point into the whole buffer.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Reader<'a> {
    /// Creates a reader at the start of a top-level buffer
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
        }
    }

    /// Absolute offset of the cursor within the snapshot
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Absolute offset of the first byte of this reader's slice
    pub fn base(&self) -> usize {
        self.base
    }

    /// Length of this reader's slice
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the slice is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left before the end of the slice
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns true once every byte of the slice has been consumed
    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn need(&self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(Error::truncated(self.offset(), n, self.remaining()));
        }
        Ok(())
    }

    /// Decode a varint of up to 10 groups, keeping the low 32 bits.
    ///
    /// Used for tags, lengths and enums.
    pub fn read_varint(&mut self) -> Result<u32> {
        let start = self.offset();
        let mut result: u64 = 0;

        for group in 0..MAX_VARINT_GROUPS {
            let Some(&byte) = self.data.get(self.pos) else {
                return Err(Error::malformed_varint(start));
            };
            self.pos += 1;

            result |= u64::from(byte & 0x7F) << (7 * group);

            if byte & 0x80 == 0 {
                return Ok(result as u32);
            }
        }

        Err(Error::malformed_varint(start))
    }

    /// Decode a varint of up to 12 groups into the full 64-bit range.
    ///
    /// Payload bits that would land above bit 63 are an overflow.
    pub fn read_varint64(&mut self) -> Result<u64> {
        let start = self.offset();
        let mut result: u64 = 0;

        for group in 0..MAX_VARINT64_GROUPS {
            let Some(&byte) = self.data.get(self.pos) else {
                return Err(Error::malformed_varint(start));
            };
            self.pos += 1;

            let payload = u64::from(byte & 0x7F);
            let shift = 7 * group as u32;
            if (shift >= 64 && payload != 0) || (shift == 63 && payload > 1) {
                return Err(Error::varint_overflow(start));
            }
            if shift < 64 {
                result |= payload << shift;
            }

            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }

        Err(Error::varint_overflow(start))
    }

    /// Decode a field key
    pub fn read_tag(&mut self) -> Result<Tag> {
        let start = self.offset();
        let raw = self.read_varint64()?;

        let wire_type = WireType::try_from((raw & 0x07) as u8)
            .map_err(|_| Error::unsupported_wire_type(start, (raw & 0x07) as u8))?;
        let field_number = u32::try_from(raw >> 3).unwrap_or(u32::MAX);

        // keys wider than 32 bits are never valid
        if field_number == 0 || raw > u64::from(u32::MAX) {
            return Err(Error::InvalidTag {
                offset: start,
                field_number,
            });
        }

        Ok(Tag {
            field_number,
            wire_type,
        })
    }

    /// Length prefix over the full 64-bit range, checked against the bytes left
    fn read_length(&mut self) -> Result<usize> {
        let declared = self.read_varint64()?;
        let len = usize::try_from(declared).unwrap_or(usize::MAX);
        self.need(len)?;
        Ok(len)
    }

    /// Read a varint length prefix and return exactly that many bytes
    pub fn read_length_delimited(&mut self) -> Result<&'a [u8]> {
        let len = self.read_length()?;

        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Read a length-delimited payload as a reader over a submessage
    pub fn read_message(&mut self) -> Result<Reader<'a>> {
        let len = self.read_length()?;

        let nested = Reader {
            data: &self.data[self.pos..self.pos + len],
            pos: 0,
            base: self.offset(),
        };
        self.pos += len;
        Ok(nested)
    }

    /// Read a length-delimited payload as text.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    pub fn read_utf8(&mut self) -> Result<Cow<'a, str>> {
        let bytes = self.read_length_delimited()?;
        Ok(String::from_utf8_lossy(bytes))
    }

    /// Advance past a field value that is not needed
    pub fn skip_field(&mut self, wire_type: WireType) -> Result<()> {
        match wire_type {
            WireType::Varint => {
                self.read_varint64()?;
            }
            WireType::I64 => {
                self.need(8)?;
                self.pos += 8;
            }
            WireType::Len => {
                self.read_length_delimited()?;
            }
            WireType::I32 => {
                self.need(4)?;
                self.pos += 4;
            }
        }
        Ok(())
    }
}

/// What a field handler did with the field it was given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// The handler read the field value
    Consumed,
    /// The walker should skip the field value
    Skip,
    /// Stop walking this message
    Stop,
}

/// How a [`walk`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEnd {
    /// Every field of the message was visited
    Exhausted,
    /// A handler returned [`Visit::Stop`]
    Stopped,
}

/// Visit every field of one message.
///
/// The handler receives each tag together with the reader positioned at
/// the field value. It either consumes the value, asks for it to be
/// skipped, or stops the walk. Any decode error ends the walk and is
/// returned unchanged; nothing after a bad tag or length is trusted.
pub fn walk<'a, F>(mut reader: Reader<'a>, mut visit: F) -> Result<WalkEnd>
where
    F: FnMut(Tag, &mut Reader<'a>) -> Result<Visit>,
{
    while !reader.is_eof() {
        let tag = reader.read_tag()?;
        match visit(tag, &mut reader)? {
            Visit::Consumed => {}
            Visit::Skip => reader.skip_field(tag.wire_type)?,
            Visit::Stop => return Ok(WalkEnd::Stopped),
        }
    }

    Ok(WalkEnd::Exhausted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_varint_single_byte() {
        let mut reader = Reader::new(&[0x08]);
        assert_eq!(reader.read_varint().unwrap(), 8);
        assert!(reader.is_eof());
    }

    #[test]
    fn test_read_varint_multi_byte() {
        let mut reader = Reader::new(&[0xAC, 0x02]); // Value 300
        assert_eq!(reader.read_varint().unwrap(), 300);
        assert_eq!(reader.offset(), 2);
    }

    #[test]
    fn test_read_varint_keeps_low_bits() {
        // -1 as int32 is sign-extended to ten bytes on the wire
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_varint().unwrap(), u32::MAX);
    }

    #[test]
    fn test_read_varint_too_long() {
        let data = [0x80; 11];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_varint(), Err(Error::malformed_varint(0)));
    }

    #[test]
    fn test_read_varint_exhausted() {
        let mut reader = Reader::new(&[0x96]);
        assert_eq!(reader.read_varint(), Err(Error::malformed_varint(0)));
    }

    #[test]
    fn test_read_varint64_timestamp() {
        // 1_700_000_000 needs more than 28 bits
        let data = [0x80, 0xE2, 0xCF, 0xAA, 0x06];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_varint64().unwrap(), 1_700_000_000);
    }

    #[test]
    fn test_read_varint64_max() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_varint64().unwrap(), u64::MAX);
    }

    #[test]
    fn test_read_varint64_zero_padding_accepted() {
        // Redundant continuation groups carrying no payload
        let data = [0x81, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x00];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_varint64().unwrap(), 1);
    }

    #[test]
    fn test_read_varint64_overflow() {
        let too_long = [0x80; 13];
        assert_eq!(
            Reader::new(&too_long).read_varint64(),
            Err(Error::varint_overflow(0))
        );

        let too_wide = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
        assert_eq!(
            Reader::new(&too_wide).read_varint64(),
            Err(Error::varint_overflow(0))
        );
    }

    #[test]
    fn test_read_tag() {
        let mut reader = Reader::new(&[0x12]);
        let tag = reader.read_tag().unwrap();
        assert!(tag.is(2, WireType::Len));
    }

    #[test]
    fn test_read_tag_rejects_groups() {
        // Field 1, wire type 3 (start group)
        let mut reader = Reader::new(&[0x0B]);
        assert_eq!(
            reader.read_tag(),
            Err(Error::unsupported_wire_type(0, 3))
        );
    }

    #[test]
    fn test_read_tag_rejects_field_zero() {
        let mut reader = Reader::new(&[0x02]);
        assert!(matches!(
            reader.read_tag(),
            Err(Error::InvalidTag { field_number: 0, .. })
        ));
    }

    #[test]
    fn test_read_length_delimited() {
        let data = [0x05, b'h', b'e', b'l', b'l', b'o', 0x08];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_length_delimited().unwrap(), b"hello");
        assert_eq!(reader.remaining(), 1);
    }

    #[test]
    fn test_read_length_delimited_truncated() {
        let data = [0x0A, b'a', b'b'];
        let mut reader = Reader::new(&data);
        assert_eq!(
            reader.read_length_delimited(),
            Err(Error::truncated(1, 10, 2))
        );
    }

    #[test]
    fn test_read_length_beyond_u32_truncated() {
        // 2 + 2^32 declared, 2 bytes present
        let data = [0x82, 0x80, 0x80, 0x80, 0x10, 0x08, 0x01];
        let mut reader = Reader::new(&data);
        assert!(matches!(
            reader.read_message(),
            Err(Error::TruncatedMessage {
                offset: 5,
                remaining: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_read_tag_rejects_wide_key() {
        let mut reader = Reader::new(&[0x88, 0x80, 0x80, 0x80, 0x10]);
        assert!(matches!(
            reader.read_tag(),
            Err(Error::InvalidTag { offset: 0, .. })
        ));
    }

    #[test]
    fn test_read_utf8_lossy() {
        let data = [0x03, b'5', 0xFF, b'5'];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_utf8().unwrap(), "5\u{FFFD}5");
    }

    #[test]
    fn test_nested_reader_offsets() {
        // Outer: length 3, then inner bytes [0x08, 0x96] and a dangling 0x80
        let data = [0x2A, 0x03, 0x08, 0x96, 0x80];
        let mut outer = Reader::new(&data);
        outer.read_tag().unwrap();
        let mut inner = outer.read_message().unwrap();
        assert_eq!(inner.base(), 2);
        assert_eq!(inner.len(), 3);
        inner.read_tag().unwrap();
        // The varint value runs off the end of the inner slice
        assert_eq!(inner.read_varint64(), Err(Error::malformed_varint(3)));
    }

    #[test]
    fn test_skip_fields() {
        let data = [
            0x08, 0x96, 0x01, // field 1 varint
            0x11, 1, 2, 3, 4, 5, 6, 7, 8, // field 2 fixed64
            0x1A, 0x02, b'o', b'k', // field 3 len
            0x25, 1, 2, 3, 4, // field 4 fixed32
        ];
        let mut reader = Reader::new(&data);
        while !reader.is_eof() {
            let tag = reader.read_tag().unwrap();
            reader.skip_field(tag.wire_type).unwrap();
        }
        assert_eq!(reader.offset(), data.len());
    }

    #[test]
    fn test_skip_fixed_truncated() {
        let mut reader = Reader::new(&[1, 2, 3]);
        assert_eq!(
            reader.skip_field(WireType::I32),
            Err(Error::truncated(0, 4, 3))
        );
    }

    #[test]
    fn test_walk_visits_and_stops() {
        let data = [0x08, 0x01, 0x10, 0x02, 0x18, 0x03];
        let mut seen = Vec::new();
        let end = walk(Reader::new(&data), |tag, reader| {
            if tag.field_number == 2 {
                return Ok(Visit::Stop);
            }
            seen.push(reader.read_varint()?);
            Ok(Visit::Consumed)
        })
        .unwrap();
        assert_eq!(end, WalkEnd::Stopped);
        assert_eq!(seen, vec![1]);
    }

    #[test]
    fn test_walk_skips_unhandled() {
        let data = [0x0A, 0x01, b'x', 0x10, 0x07];
        let mut value = None;
        let end = walk(Reader::new(&data), |tag, reader| {
            if tag.is(2, WireType::Varint) {
                value = Some(reader.read_varint()?);
                return Ok(Visit::Consumed);
            }
            Ok(Visit::Skip)
        })
        .unwrap();
        assert_eq!(end, WalkEnd::Exhausted);
        assert_eq!(value, Some(7));
    }

    #[test]
    fn test_walk_empty_message() {
        let end = walk(Reader::new(&[]), |_, _| Ok(Visit::Skip)).unwrap();
        assert_eq!(end, WalkEnd::Exhausted);
    }
}

//! Error types for the nextbus-core library.
//!
//! Every decode error carries the absolute byte offset into the snapshot at
//! which the problem was detected. Decode errors are fatal for the
//! submessage that produced them; the scanner decides how far the failure
//! propagates (see [`crate::scanner`]).

use thiserror::Error;

/// Result type alias for nextbus operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all nextbus operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A varint ran past 10 groups or past the end of the buffer
    #[error("malformed varint at offset {offset}")]
    MalformedVarint {
        /// Byte offset where the varint started
        offset: usize,
    },

    /// A 64-bit varint ran past 12 groups or does not fit in 64 bits
    #[error("varint overflow at offset {offset}: value does not fit in 64 bits")]
    VarintOverflow {
        /// Byte offset where the varint started
        offset: usize,
    },

    /// A field declared more bytes than remain in the enclosing slice
    #[error("truncated message at offset {offset}: need {needed} bytes, have {remaining}")]
    TruncatedMessage {
        /// Byte offset of the field payload
        offset: usize,
        /// Bytes the field declared or requires
        needed: usize,
        /// Bytes actually left in the slice
        remaining: usize,
    },

    /// A tag carried a wire type outside {0, 1, 2, 5}
    #[error("unsupported wire type {wire_type} at offset {offset}")]
    UnsupportedWireType {
        /// Byte offset of the tag
        offset: usize,
        /// The raw 3-bit wire type
        wire_type: u8,
    },

    /// A tag decoded to field number zero
    #[error("invalid tag at offset {offset}: field number {field_number}")]
    InvalidTag {
        /// Byte offset of the tag
        offset: usize,
        /// The decoded field number
        field_number: u32,
    },

    /// The route or stop identifier of a query is unusable
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl Error {
    /// Creates a new malformed varint error
    pub fn malformed_varint(offset: usize) -> Self {
        Self::MalformedVarint { offset }
    }

    /// Creates a new varint overflow error
    pub fn varint_overflow(offset: usize) -> Self {
        Self::VarintOverflow { offset }
    }

    /// Creates a new truncated message error
    pub fn truncated(offset: usize, needed: usize, remaining: usize) -> Self {
        Self::TruncatedMessage {
            offset,
            needed,
            remaining,
        }
    }

    /// Creates a new unsupported wire type error
    pub fn unsupported_wire_type(offset: usize, wire_type: u8) -> Self {
        Self::UnsupportedWireType { offset, wire_type }
    }

    /// Creates a new invalid query error
    pub fn invalid_query(msg: impl Into<String>) -> Self {
        Self::InvalidQuery(msg.into())
    }

    /// Returns the byte offset for wire-format errors
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::MalformedVarint { offset }
            | Self::VarintOverflow { offset }
            | Self::TruncatedMessage { offset, .. }
            | Self::UnsupportedWireType { offset, .. }
            | Self::InvalidTag { offset, .. } => Some(*offset),
            Self::InvalidQuery(_) => None,
        }
    }

    /// Returns true if this error came from decoding the wire format
    pub fn is_decode_error(&self) -> bool {
        !matches!(self, Self::InvalidQuery(_))
    }
}

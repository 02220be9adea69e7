//! Bytecode errors

use thiserror::Error;

/// Errors raised while reading raw action bytes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Buffer ended before a field could be read
    #[error("Unexpected end of bytecode at offset {offset}: need {needed} more bytes")]
    UnexpectedEnd {
        /// Absolute offset of the read
        offset: usize,
        /// Bytes missing
        needed: usize,
    },

    /// String field is not terminated
    #[error("Unterminated string at offset {offset}")]
    UnterminatedString {
        /// Absolute offset of the string start
        offset: usize,
    },

    /// String field is not valid UTF-8
    #[error("Invalid UTF-8 string at offset {offset}")]
    InvalidString {
        /// Absolute offset of the string start
        offset: usize,
    },

    /// Push value with an unknown type tag
    #[error("Unknown push value type {tag} at offset {offset}")]
    UnknownPushType {
        /// Type tag byte
        tag: u8,
        /// Absolute offset of the tag
        offset: usize,
    },

    /// Declared body length disagrees with the body layout
    #[error(
        "Body length mismatch for opcode 0x{opcode:02X} at offset {offset}: declared {declared}, consumed {consumed}"
    )]
    BodyLength {
        /// Opcode of the action
        opcode: u8,
        /// Absolute offset of the action
        offset: usize,
        /// Length from the body prefix
        declared: usize,
        /// Bytes the layout consumed
        consumed: usize,
    },
}

impl DecodeError {
    /// Absolute byte offset the error refers to
    pub fn offset(&self) -> usize {
        match self {
            Self::UnexpectedEnd { offset, .. }
            | Self::UnterminatedString { offset }
            | Self::InvalidString { offset }
            | Self::UnknownPushType { offset, .. }
            | Self::BodyLength { offset, .. } => *offset,
        }
    }
}

/// Errors raised while serializing actions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// A value does not fit its fixed-width field
    #[error("{field} value {value} does not fit in {bits} bits")]
    FieldOverflow {
        /// Field description
        field: &'static str,
        /// Value that was too large
        value: usize,
        /// Field width
        bits: u8,
    },

    /// Strings are NUL-terminated and cannot contain NUL
    #[error("String contains an interior NUL byte: {0:?}")]
    InteriorNul(String),
}

impl EncodeError {
    /// Create a field overflow error for a `u16` field
    pub fn u16_overflow(field: &'static str, value: usize) -> Self {
        Self::FieldOverflow {
            field,
            value,
            bits: 16,
        }
    }

    /// Create a field overflow error for a `u8` field
    pub fn u8_overflow(field: &'static str, value: usize) -> Self {
        Self::FieldOverflow {
            field,
            value,
            bits: 8,
        }
    }
}

/// Result type for decoding
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Result type for encoding
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;

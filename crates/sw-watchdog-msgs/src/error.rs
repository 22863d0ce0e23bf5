//! Wire codec errors.

use thiserror::Error;

/// Errors raised while encoding or decoding a wire message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The buffer ended before the field could be read.
    #[error("Unexpected end of data: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd {
        /// Bytes required by the field.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// The message kind byte is not known.
    #[error("Unknown message kind: 0x{0:02x}")]
    UnknownKind(u8),

    /// The message kind byte names a different message.
    #[error("Wrong message kind: expected 0x{expected:02x}, found 0x{found:02x}")]
    WrongKind {
        /// Kind the decoder expected.
        expected: u8,
        /// Kind found in the buffer.
        found: u8,
    },

    /// The wire version is not supported.
    #[error("Unsupported wire version: {0}")]
    UnsupportedVersion(u8),

    /// The frame id does not fit the length prefix.
    #[error("Frame id too long: {0} bytes")]
    FrameIdTooLong(usize),

    /// The frame id is not valid UTF-8.
    #[error("Frame id is not valid UTF-8")]
    InvalidFrameId,

    /// Bytes left over after the message.
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),
}

impl CodecError {
    /// Create an unexpected-end error.
    #[must_use]
    pub fn unexpected_end(needed: usize, remaining: usize) -> Self {
        Self::UnexpectedEnd { needed, remaining }
    }
}

/// A specialized `Result` type for codec operations.
pub type CodecResult<T> = std::result::Result<T, CodecError>;

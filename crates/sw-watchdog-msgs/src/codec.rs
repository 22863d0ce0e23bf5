//! Fixed little-endian wire format.
//!
//! ```text
//! offset size field
//! 0      1    message kind (0x01 Heartbeat, 0x02 Status)
//! 1      1    wire version
//! 2      4    header.stamp.sec      (i32 LE)
//! 6      4    header.stamp.nanosec  (u32 LE)
//! 10     2    frame_id length L     (u16 LE)
//! 12     L    frame_id (UTF-8)
//! 12+L   2    source_id / missed_source_id
//! 14+L   2    sequence_number (Heartbeat only)
//! ```

use crate::error::{CodecError, CodecResult};
use crate::messages::{Header, Heartbeat, Status};
use crate::time::Stamp;

/// Current wire version.
pub const WIRE_VERSION: u8 = 1;

/// Size of the fixed prefix before the frame id bytes.
pub const PREFIX_SIZE: usize = 12;

/// Message kind tag, the first byte of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    /// A [`Heartbeat`].
    Heartbeat = 0x01,
    /// A [`Status`].
    Status = 0x02,
}

impl MessageKind {
    /// Parse a kind byte.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownKind`] for unassigned bytes.
    pub fn from_byte(byte: u8) -> CodecResult<Self> {
        match byte {
            0x01 => Ok(Self::Heartbeat),
            0x02 => Ok(Self::Status),
            other => Err(CodecError::UnknownKind(other)),
        }
    }

    /// The kind byte.
    #[must_use]
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Classify a frame by its kind byte without decoding it.
///
/// # Errors
///
/// Returns an error if the buffer is empty or the kind is unknown.
pub fn peek_kind(bytes: &[u8]) -> CodecResult<MessageKind> {
    let byte = bytes
        .first()
        .copied()
        .ok_or(CodecError::unexpected_end(1, 0))?;
    MessageKind::from_byte(byte)
}

/// A message with a wire representation.
pub trait WireMessage: Sized {
    /// Kind tag written in front of the message.
    const KIND: MessageKind;

    /// Encode the message into a new buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable-length field does not fit its prefix.
    fn encode(&self) -> CodecResult<Vec<u8>>;

    /// Decode a complete frame.
    ///
    /// # Errors
    ///
    /// Returns an error on truncated, foreign, or over-long frames.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;

    /// Encoded size in bytes.
    fn encoded_len(&self) -> usize;
}

/// Append-only little-endian writer.
#[derive(Debug, Default)]
pub struct WireWriter {
    buffer: Vec<u8>,
}

impl WireWriter {
    /// Create a writer with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Write one byte.
    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buffer.push(value);
        self
    }

    /// Write a `u16`.
    pub fn write_u16_le(&mut self, value: u16) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write a `u32`.
    pub fn write_u32_le(&mut self, value: u32) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write an `i32`.
    pub fn write_i32_le(&mut self, value: i32) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(data);
        self
    }

    /// Write the shared prefix: kind, version and header.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::FrameIdTooLong`] if the frame id exceeds `u16::MAX` bytes.
    pub fn write_prefix(&mut self, kind: MessageKind, header: &Header) -> CodecResult<&mut Self> {
        let frame_id = header.frame_id.as_bytes();
        let len = u16::try_from(frame_id.len())
            .map_err(|_overflow| CodecError::FrameIdTooLong(frame_id.len()))?;
        self.write_u8(kind.as_byte())
            .write_u8(WIRE_VERSION)
            .write_i32_le(header.stamp.sec)
            .write_u32_le(header.stamp.nanosec)
            .write_u16_le(len)
            .write_bytes(frame_id);
        Ok(self)
    }

    /// Consume the writer.
    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    /// Bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Bounds-checked little-endian reader over a borrowed frame.
#[derive(Debug)]
pub struct WireReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> WireReader<'a> {
    /// Create a reader positioned at the start of `buffer`.
    #[must_use]
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    fn take<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Read `count` raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnexpectedEnd`] if fewer bytes remain.
    pub fn read_bytes(&mut self, count: usize) -> CodecResult<&'a [u8]> {
        let remaining = self.remaining();
        let end = self
            .position
            .checked_add(count)
            .ok_or(CodecError::unexpected_end(count, remaining))?;
        let bytes = self
            .buffer
            .get(self.position..end)
            .ok_or(CodecError::unexpected_end(count, remaining))?;
        self.position = end;
        Ok(bytes)
    }

    /// Read one byte.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnexpectedEnd`] at the end of the buffer.
    pub fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(u8::from_le_bytes(self.take::<1>()?))
    }

    /// Read a `u16`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnexpectedEnd`] if fewer than 2 bytes remain.
    pub fn read_u16_le(&mut self) -> CodecResult<u16> {
        Ok(u16::from_le_bytes(self.take::<2>()?))
    }

    /// Read a `u32`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnexpectedEnd`] if fewer than 4 bytes remain.
    pub fn read_u32_le(&mut self) -> CodecResult<u32> {
        Ok(u32::from_le_bytes(self.take::<4>()?))
    }

    /// Read an `i32`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnexpectedEnd`] if fewer than 4 bytes remain.
    pub fn read_i32_le(&mut self) -> CodecResult<i32> {
        Ok(i32::from_le_bytes(self.take::<4>()?))
    }

    /// Read and check the shared prefix, returning the header.
    ///
    /// # Errors
    ///
    /// Returns an error on a foreign kind, unsupported version, truncated
    /// header or non UTF-8 frame id.
    pub fn read_prefix(&mut self, expected: MessageKind) -> CodecResult<Header> {
        let kind = MessageKind::from_byte(self.read_u8()?)?;
        if kind != expected {
            return Err(CodecError::WrongKind {
                expected: expected.as_byte(),
                found: kind.as_byte(),
            });
        }
        let version = self.read_u8()?;
        if version != WIRE_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        let sec = self.read_i32_le()?;
        let nanosec = self.read_u32_le()?;
        let len = usize::from(self.read_u16_le()?);
        let frame_id = std::str::from_utf8(self.read_bytes(len)?)
            .map_err(|_utf8| CodecError::InvalidFrameId)?
            .to_owned();
        Ok(Header {
            stamp: Stamp::new(sec, nanosec),
            frame_id,
        })
    }

    /// Fail unless the whole buffer was consumed.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TrailingBytes`] when bytes are left over.
    pub fn finish(self) -> CodecResult<()> {
        match self.remaining() {
            0 => Ok(()),
            extra => Err(CodecError::TrailingBytes(extra)),
        }
    }
}

impl WireMessage for Heartbeat {
    const KIND: MessageKind = MessageKind::Heartbeat;

    fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut writer = WireWriter::with_capacity(self.encoded_len());
        writer
            .write_prefix(Self::KIND, &self.header)?
            .write_u16_le(self.source_id)
            .write_u16_le(self.sequence_number);
        Ok(writer.into_inner())
    }

    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let mut reader = WireReader::new(bytes);
        let header = reader.read_prefix(Self::KIND)?;
        let source_id = reader.read_u16_le()?;
        let sequence_number = reader.read_u16_le()?;
        reader.finish()?;
        Ok(Self {
            header,
            source_id,
            sequence_number,
        })
    }

    fn encoded_len(&self) -> usize {
        PREFIX_SIZE + self.header.frame_id.len() + 4
    }
}

impl WireMessage for Status {
    const KIND: MessageKind = MessageKind::Status;

    fn encode(&self) -> CodecResult<Vec<u8>> {
        let mut writer = WireWriter::with_capacity(self.encoded_len());
        writer
            .write_prefix(Self::KIND, &self.header)?
            .write_u16_le(self.missed_source_id);
        Ok(writer.into_inner())
    }

    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let mut reader = WireReader::new(bytes);
        let header = reader.read_prefix(Self::KIND)?;
        let missed_source_id = reader.read_u16_le()?;
        reader.finish()?;
        Ok(Self {
            header,
            missed_source_id,
        })
    }

    fn encoded_len(&self) -> usize {
        PREFIX_SIZE + self.header.frame_id.len() + 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heartbeat_encode_decode() -> CodecResult<()> {
        let heartbeat = Heartbeat::new(Stamp::new(100, 250), 4, 17).with_frame_id("base_link");
        let bytes = heartbeat.encode()?;
        assert_eq!(bytes.len(), heartbeat.encoded_len());
        assert_eq!(Heartbeat::decode(&bytes)?, heartbeat);
        Ok(())
    }

    #[test]
    fn test_status_encode_decode() -> CodecResult<()> {
        let status = Status::new(Stamp::new(-3, 999_999_999), 65535);
        let bytes = status.encode()?;
        assert_eq!(bytes.len(), status.encoded_len());
        assert_eq!(Status::decode(&bytes)?, status);
        Ok(())
    }

    #[test]
    fn test_peek_kind() -> CodecResult<()> {
        let bytes = Status::default().encode()?;
        assert_eq!(peek_kind(&bytes)?, MessageKind::Status);
        assert_eq!(peek_kind(&[]), Err(CodecError::unexpected_end(1, 0)));
        assert_eq!(peek_kind(&[0x09]), Err(CodecError::UnknownKind(0x09)));
        Ok(())
    }

    #[test]
    fn test_decode_wrong_kind() -> CodecResult<()> {
        let bytes = Status::default().encode()?;
        let result = Heartbeat::decode(&bytes);
        assert_eq!(
            result,
            Err(CodecError::WrongKind {
                expected: 0x01,
                found: 0x02
            })
        );
        Ok(())
    }

    #[test]
    fn test_decode_truncated() -> CodecResult<()> {
        let bytes = Heartbeat::default().encode()?;
        let truncated = bytes.get(..bytes.len() - 1).unwrap_or_default();
        assert!(matches!(
            Heartbeat::decode(truncated),
            Err(CodecError::UnexpectedEnd { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_decode_trailing_bytes() -> CodecResult<()> {
        let mut bytes = Heartbeat::default().encode()?;
        bytes.push(0);
        assert_eq!(Heartbeat::decode(&bytes), Err(CodecError::TrailingBytes(1)));
        Ok(())
    }

    #[test]
    fn test_decode_unsupported_version() -> CodecResult<()> {
        let mut bytes = Heartbeat::default().encode()?;
        if let Some(version) = bytes.get_mut(1) {
            *version = 9;
        }
        assert_eq!(
            Heartbeat::decode(&bytes),
            Err(CodecError::UnsupportedVersion(9))
        );
        Ok(())
    }

    #[test]
    fn test_decode_invalid_frame_id() {
        let bytes = [0x01, 0x01, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0xff, 0, 0, 1, 0];
        assert_eq!(Heartbeat::decode(&bytes), Err(CodecError::InvalidFrameId));
    }

    #[test]
    fn test_frame_id_too_long() {
        let heartbeat = Heartbeat::default().with_frame_id("x".repeat(70_000));
        assert_eq!(heartbeat.encode(), Err(CodecError::FrameIdTooLong(70_000)));
    }
}

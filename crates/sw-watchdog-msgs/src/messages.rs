//! Heartbeat and Status messages.

use serde::{Deserialize, Serialize};

use crate::time::Stamp;

/// Generic message header supplied by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Header {
    /// Time the message was stamped by its sender.
    pub stamp: Stamp,
    /// Free-form frame identifier.
    pub frame_id: String,
}

impl Header {
    /// Create a header with an empty frame id.
    #[must_use]
    pub fn new(stamp: Stamp) -> Self {
        Self {
            stamp,
            frame_id: String::new(),
        }
    }

    /// Set the frame id.
    #[must_use]
    pub fn with_frame_id(mut self, frame_id: impl Into<String>) -> Self {
        self.frame_id = frame_id.into();
        self
    }
}

/// Liveliness signal periodically emitted by a watched entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Heartbeat {
    /// Message header; `header.stamp` is the heartbeat timestamp.
    pub header: Header,
    /// Identifies the emitting entity.
    pub source_id: u16,
    /// Monotonically increasing per source.
    pub sequence_number: u16,
}

impl Heartbeat {
    /// Default source id.
    pub const DEFAULT_SOURCE_ID: u16 = 0;
    /// Default sequence number.
    pub const DEFAULT_SEQUENCE_NUMBER: u16 = 1;

    /// Create a heartbeat stamped at `stamp`.
    #[must_use]
    pub fn new(stamp: Stamp, source_id: u16, sequence_number: u16) -> Self {
        Self {
            header: Header::new(stamp),
            source_id,
            sequence_number,
        }
    }

    /// The heartbeat timestamp.
    #[must_use]
    pub fn stamp(&self) -> Stamp {
        self.header.stamp
    }

    /// Set the frame id.
    #[must_use]
    pub fn with_frame_id(mut self, frame_id: impl Into<String>) -> Self {
        self.header.frame_id = frame_id.into();
        self
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new(
            Stamp::ZERO,
            Self::DEFAULT_SOURCE_ID,
            Self::DEFAULT_SEQUENCE_NUMBER,
        )
    }
}

/// Failure report naming the source believed to have failed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Status {
    /// Message header; `header.stamp` is the detection time.
    pub header: Header,
    /// Source whose lease expired.
    pub missed_source_id: u16,
}

impl Status {
    /// Create a status stamped at `stamp`.
    #[must_use]
    pub fn new(stamp: Stamp, missed_source_id: u16) -> Self {
        Self {
            header: Header::new(stamp),
            missed_source_id,
        }
    }

    /// The detection time.
    #[must_use]
    pub fn stamp(&self) -> Stamp {
        self.header.stamp
    }
}

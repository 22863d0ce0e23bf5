//! Property-based tests for the wire codec and stamp arithmetic.

use proptest::prelude::*;
use sw_watchdog_msgs::{CodecError, Heartbeat, Stamp, Status, WireMessage, peek_kind};

fn stamp_strategy() -> impl Strategy<Value = Stamp> {
    (any::<i32>(), 0u32..1_000_000_000).prop_map(|(sec, nanosec)| Stamp::new(sec, nanosec))
}

proptest! {
    #[test]
    fn test_heartbeat_round_trip(
        stamp in stamp_strategy(),
        frame_id in "[a-z_/]{0,32}",
        source_id in any::<u16>(),
        sequence_number in any::<u16>(),
    ) {
        let heartbeat = Heartbeat::new(stamp, source_id, sequence_number).with_frame_id(frame_id);
        let bytes = heartbeat.encode().map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(bytes.len(), heartbeat.encoded_len());
        let decoded = Heartbeat::decode(&bytes).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(decoded, heartbeat);
    }

    #[test]
    fn test_status_round_trip(
        stamp in stamp_strategy(),
        frame_id in "\\PC{0,16}",
        missed_source_id in any::<u16>(),
    ) {
        let mut status = Status::new(stamp, missed_source_id);
        status.header.frame_id = frame_id;
        let bytes = status.encode().map_err(|e| TestCaseError::fail(e.to_string()))?;
        let decoded = Status::decode(&bytes).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(decoded, status);
    }

    #[test]
    fn test_every_truncation_is_rejected(
        stamp in stamp_strategy(),
        source_id in any::<u16>(),
        cut in 0usize..16,
    ) {
        let bytes = Heartbeat::new(stamp, source_id, 1)
            .encode()
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let cut = cut.min(bytes.len() - 1);
        let truncated = bytes.get(..cut).unwrap_or_default();
        prop_assert!(Heartbeat::decode(truncated).is_err());
    }

    #[test]
    fn test_decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let _heartbeat = Heartbeat::decode(&bytes);
        let _status = Status::decode(&bytes);
        let kind = peek_kind(&bytes);
        if bytes.is_empty() {
            prop_assert_eq!(kind, Err(CodecError::unexpected_end(1, 0)));
        }
    }

    #[test]
    fn test_stamp_nanos_round_trip(stamp in stamp_strategy()) {
        prop_assert_eq!(Stamp::from_nanos(stamp.as_nanos()), stamp);
    }

    #[test]
    fn test_stamp_difference_is_antisymmetric(a in stamp_strategy(), b in stamp_strategy()) {
        prop_assert_eq!(a.nanos_since(b), -b.nanos_since(a));
    }
}

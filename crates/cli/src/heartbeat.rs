//! Periodic heartbeat sender

use anyhow::Context;
use std::net::SocketAddr;
use sw_watchdog_msgs::{Heartbeat, Stamp, WireMessage};
use tokio::net::UdpSocket;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::args::HeartbeatCli;
use crate::error::CliResult;

/// Builds the heartbeats of one source.
#[derive(Debug, Clone)]
pub struct HeartbeatSequence {
    source_id: u16,
    frame_id: String,
    next: u16,
}

impl HeartbeatSequence {
    /// Start a sequence at the default sequence number.
    #[must_use]
    pub fn new(source_id: u16, frame_id: impl Into<String>) -> Self {
        Self {
            source_id,
            frame_id: frame_id.into(),
            next: Heartbeat::DEFAULT_SEQUENCE_NUMBER,
        }
    }

    /// Next heartbeat stamped `stamp`. Sequence numbers wrap at `u16::MAX`.
    pub fn next_heartbeat(&mut self, stamp: Stamp) -> Heartbeat {
        let heartbeat = Heartbeat::new(stamp, self.source_id, self.next)
            .with_frame_id(self.frame_id.clone());
        self.next = self.next.wrapping_add(1);
        heartbeat
    }

    /// Encode the next heartbeat.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame id does not fit the wire format.
    pub fn next_datagram(&mut self, stamp: Stamp) -> CliResult<Vec<u8>> {
        Ok(self.next_heartbeat(stamp).encode()?)
    }
}

/// Send heartbeats to `cli.target` every `cli.period` until interrupted.
///
/// # Errors
///
/// Returns an error if the socket cannot be bound or the frame id is too
/// long to encode.
pub async fn run(cli: HeartbeatCli) -> anyhow::Result<()> {
    let local: SocketAddr = if cli.target.is_ipv4() {
        ([0, 0, 0, 0], 0).into()
    } else {
        ([0u16; 8], 0).into()
    };
    let socket = UdpSocket::bind(local)
        .await
        .context("failed to bind heartbeat socket")?;
    let mut sequence = HeartbeatSequence::new(cli.source_id, cli.frame_id.clone());
    // Reject an unencodable frame id before the first tick.
    sequence
        .clone()
        .next_datagram(Stamp::ZERO)
        .context("invalid frame id")?;

    info!(
        target_addr = %cli.target,
        source_id = cli.source_id,
        period = ?cli.period(),
        "Sending heartbeats"
    );

    let mut ticker = tokio::time::interval(cli.period());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);
    let mut sent = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let datagram = sequence.next_datagram(Stamp::now())?;
                match socket.send_to(&datagram, cli.target).await {
                    Ok(_) => {
                        sent = sent.saturating_add(1);
                        debug!(sent, "Heartbeat sent");
                    }
                    Err(err) => warn!(error = %err, "Failed to send heartbeat"),
                }
            }
            signal = &mut interrupt => {
                signal.context("failed to listen for interrupt")?;
                break;
            }
        }
    }

    info!(sent, "Heartbeat sender stopped");
    Ok(())
}

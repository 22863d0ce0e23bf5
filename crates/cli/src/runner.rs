//! Event loop for the watchdog processes.
//!
//! Heartbeats arrive as UDP datagrams and are published on a [`LocalBus`],
//! which drives lease expiry on every tick. Failure statuses queued by the
//! watchdog are drained after each tick, printed, and optionally forwarded
//! as encoded datagrams. Lifecycle commands are read line by line from stdin.

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use sw_watchdog::{Detector, LifecycleState, LocalBus, Status, Watchdog};
use sw_watchdog_msgs::{Heartbeat, WireMessage};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::args::WatchdogArgs;
use crate::command::Command;
use crate::error::{CliError, CliResult};
use crate::output;

/// Largest datagram accepted on the heartbeat socket.
pub const MAX_DATAGRAM_SIZE: usize = 65_536;

/// Runtime options of the event loop.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Heartbeat socket address.
    pub listen: SocketAddr,
    /// Where encoded statuses are forwarded, if anywhere.
    pub failure_addr: Option<SocketAddr>,
    /// Period of the liveliness check.
    pub tick_period: Duration,
    /// Print JSON lines instead of human-readable text.
    pub json: bool,
}

impl From<&WatchdogArgs> for RunOptions {
    fn from(args: &WatchdogArgs) -> Self {
        Self {
            listen: args.listen,
            failure_addr: args.failure_addr,
            tick_period: args.tick_period(),
            json: args.json,
        }
    }
}

/// Decode a heartbeat datagram received from `peer`.
///
/// # Errors
///
/// Returns [`CliError::MalformedDatagram`] if the datagram is not a
/// well-formed heartbeat.
pub fn decode_heartbeat(datagram: &[u8], peer: SocketAddr) -> CliResult<Heartbeat> {
    Heartbeat::decode(datagram).map_err(|source| CliError::MalformedDatagram { peer, source })
}

/// Apply one line of operator input and return the resulting state.
pub fn handle_command<D: Detector>(
    watchdog: &Watchdog<LocalBus, D>,
    line: &str,
    json: bool,
) -> LifecycleState {
    match line.parse::<Command>() {
        Ok(Command::State) => output::print_state(watchdog.state(), json),
        Ok(Command::Transition(event)) => {
            // Rejections are logged by the watchdog itself.
            if let Ok(state) = watchdog.trigger(event) {
                output::print_state(state, json);
            }
        }
        Err(err) => warn!(error = %err, "Ignoring operator input"),
    }
    watchdog.state()
}

/// Bound sender for forwarded statuses.
struct StatusForwarder {
    socket: UdpSocket,
    target: SocketAddr,
}

impl StatusForwarder {
    async fn bind(target: SocketAddr) -> anyhow::Result<Self> {
        let local: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local)
            .await
            .with_context(|| format!("failed to bind status socket for {target}"))?;
        Ok(Self { socket, target })
    }

    async fn forward(&self, status: &Status) {
        let encoded = match status.encode() {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(error = %err, "Failed to encode status");
                return;
            }
        };
        if let Err(err) = self.socket.send_to(&encoded, self.target).await {
            warn!(target_addr = %self.target, error = %err, "Failed to forward status");
        }
    }
}

/// Drive `future` to completion on a multi-threaded runtime.
///
/// The runtime is dropped without waiting for the blocking stdin reader,
/// which cannot be cancelled once a read is pending.
///
/// # Errors
///
/// Returns an error if the runtime cannot be built.
pub fn block_on<F: Future>(future: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}

/// Run a watchdog until it is shut down from stdin or interrupted.
///
/// # Errors
///
/// Returns an error if a socket cannot be bound, if the start-up
/// transitions fail, or if stdin cannot be read.
pub async fn run<D: Detector>(
    watchdog: Watchdog<LocalBus, D>,
    bus: Arc<LocalBus>,
    options: RunOptions,
) -> anyhow::Result<()> {
    let socket = UdpSocket::bind(options.listen)
        .await
        .with_context(|| format!("failed to bind heartbeat socket on {}", options.listen))?;
    let forwarder = match options.failure_addr {
        Some(target) => Some(StatusForwarder::bind(target).await?),
        None => None,
    };

    let heartbeat_topic = watchdog.config().heartbeat_topic.clone();
    let failure_topic = watchdog.config().failure_topic.clone();
    info!(
        listen = %socket.local_addr()?,
        lease = ?watchdog.config().lease,
        publish = watchdog.config().enable_publisher,
        "Watchdog listening for heartbeats"
    );

    let state = watchdog.start().context("start-up transitions failed")?;
    output::print_state(state, options.json);

    let mut ticker = tokio::time::interval(options.tick_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(interrupt);

    loop {
        tokio::select! {
            received = socket.recv_from(&mut buffer) => {
                let (len, peer) = match received {
                    Ok(received) => received,
                    Err(err) => {
                        warn!(error = %err, "Heartbeat socket receive failed");
                        continue;
                    }
                };
                match decode_heartbeat(buffer.get(..len).unwrap_or_default(), peer) {
                    Ok(heartbeat) => {
                        let delivered = bus.publish_heartbeat(&heartbeat_topic, heartbeat);
                        trace!(%peer, delivered, "Heartbeat received");
                    }
                    Err(err) => warn!(error = %err, "Dropping datagram"),
                }
            }
            _ = ticker.tick() => {
                bus.tick();
                for status in bus.take_statuses(&failure_topic) {
                    output::print_status(&status, options.json);
                    if let Some(forwarder) = &forwarder {
                        forwarder.forward(&status).await;
                    }
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line.context("failed to read stdin")? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => {
                        if handle_command(&watchdog, &line, options.json) == LifecycleState::Finalized {
                            break;
                        }
                    }
                    None => {
                        debug!("stdin closed, lifecycle commands disabled");
                        stdin_open = false;
                    }
                }
            }
            signal = &mut interrupt => {
                signal.context("failed to listen for interrupt")?;
                info!("Interrupt received, shutting down");
                if watchdog.state() != LifecycleState::Finalized {
                    watchdog.shutdown()?;
                }
                break;
            }
        }
    }

    let metrics = watchdog.metrics();
    info!(
        heartbeats = metrics.heartbeats_received,
        liveliness_events = metrics.liveliness_events,
        failures_reported = metrics.failures_reported,
        reports_suppressed = metrics.reports_suppressed,
        "Watchdog stopped"
    );
    Ok(())
}

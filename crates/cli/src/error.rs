//! Error types for the watchdog command-line processes

use sw_watchdog_msgs::CodecError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Malformed datagram from {peer}: {source}")]
    MalformedDatagram {
        peer: std::net::SocketAddr,
        #[source]
        source: CodecError,
    },

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

/// A specialized `Result` type for command-line operations.
pub type CliResult<T> = std::result::Result<T, CliError>;

//! Command-line arguments for the watchdog and heartbeat processes

use clap::{Args, CommandFactory, Parser, error::ErrorKind};
use std::ffi::OsString;
use std::net::SocketAddr;
use std::time::Duration;
use sw_watchdog::{DEFAULT_CACHE_CAPACITY, WatchdogConfig, WatchdogConfigBuilder};

/// Address the watchdogs listen on and the heartbeat process sends to.
pub const DEFAULT_HEARTBEAT_ADDR: &str = "127.0.0.1:7400";

const WATCHDOG_AFTER_HELP: &str = "\
The watchdog starts unconfigured unless --activate is given. Lifecycle
commands are read from stdin, one per line:
  configure | activate | deactivate | cleanup | shutdown | state";

/// Options shared by both watchdog processes.
#[derive(Debug, Clone, Args)]
pub struct WatchdogArgs {
    /// Lease in positive integer milliseconds granted to the watched entity
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub lease: u64,

    /// Configure and activate the watchdog on start-up
    #[arg(long)]
    pub activate: bool,

    /// Publish a status message when the lease expires
    #[arg(long)]
    pub publish: bool,

    /// UDP address to receive heartbeats on
    #[arg(long, env = "SW_WATCHDOG_LISTEN", default_value = DEFAULT_HEARTBEAT_ADDR)]
    pub listen: SocketAddr,

    /// UDP address to forward encoded status messages to
    #[arg(long, env = "SW_WATCHDOG_FAILURE_ADDR")]
    pub failure_addr: Option<SocketAddr>,

    /// Print statuses and states as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl WatchdogArgs {
    /// Lease as a duration.
    #[must_use]
    pub fn lease(&self) -> Duration {
        Duration::from_millis(self.lease)
    }

    /// Configuration builder seeded from the shared options.
    #[must_use]
    pub fn config_builder(&self) -> WatchdogConfigBuilder {
        WatchdogConfig::builder()
            .lease_ms(self.lease)
            .enable_publisher(self.publish)
            .autostart(self.activate)
    }

    /// Period of the liveliness check, a quarter of the lease and never
    /// below one millisecond.
    #[must_use]
    pub fn tick_period(&self) -> Duration {
        (self.lease() / 4).max(Duration::from_millis(1))
    }
}

/// Windowed watchdog attributing a lost lease to one of many sources.
#[derive(Debug, Parser)]
#[command(name = "windowed_watchdog", version, after_help = WATCHDOG_AFTER_HELP)]
pub struct WindowedCli {
    #[command(flatten)]
    pub common: WatchdogArgs,

    /// Number of recent heartbeats kept for attribution
    #[arg(long, default_value_t = DEFAULT_CACHE_CAPACITY)]
    pub cache_size: usize,
}

/// Watchdog for a single heartbeat source.
#[derive(Debug, Parser)]
#[command(name = "simple_watchdog", version, after_help = WATCHDOG_AFTER_HELP)]
pub struct SimpleCli {
    #[command(flatten)]
    pub common: WatchdogArgs,

    /// Source id reported when the lease expires
    #[arg(long, default_value_t = 0)]
    pub source_id: u16,
}

/// Periodic heartbeat sender.
#[derive(Debug, Parser)]
#[command(name = "simple_heartbeat", version)]
pub struct HeartbeatCli {
    /// Heartbeat period in positive integer milliseconds
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    pub period: u64,

    /// Source id carried by every heartbeat
    #[arg(long, default_value_t = 0)]
    pub source_id: u16,

    /// UDP address of the watchdog
    #[arg(long, env = "SW_WATCHDOG_TARGET", default_value = DEFAULT_HEARTBEAT_ADDR)]
    pub target: SocketAddr,

    /// Frame id carried in the heartbeat header
    #[arg(long, default_value = "")]
    pub frame_id: String,

    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl HeartbeatCli {
    /// Heartbeat period as a duration.
    #[must_use]
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period)
    }
}

/// Outcome of parsing the command line.
#[derive(Debug)]
pub enum Parsed<P> {
    /// Arguments are valid.
    Run(P),
    /// Usage text to print before exiting successfully.
    Usage(String),
}

/// Parse the process arguments.
#[must_use]
pub fn parse<P: Parser>() -> Parsed<P> {
    parse_from(std::env::args_os())
}

/// Parse `args`, turning help requests and invalid arguments into usage text.
pub fn parse_from<P, I, T>(args: I) -> Parsed<P>
where
    P: Parser,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match P::try_parse_from(args) {
        Ok(parsed) => Parsed::Run(parsed),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                Parsed::Usage(err.render().to_string())
            }
            ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => Parsed::Usage(usage::<P>()),
            kind => Parsed::Usage(format!("error: {kind}\n\n{}", usage::<P>())),
        },
    }
}

/// Full help text for `P`.
#[must_use]
pub fn usage<P: CommandFactory>() -> String {
    P::command().render_help().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_windowed_defaults() -> TestResult {
        let cli = WindowedCli::try_parse_from(["windowed_watchdog", "300"])?;
        assert_eq!(cli.common.lease, 300);
        assert!(!cli.common.activate);
        assert!(!cli.common.publish);
        assert_eq!(cli.common.listen, DEFAULT_HEARTBEAT_ADDR.parse::<SocketAddr>()?);
        assert_eq!(cli.common.failure_addr, None);
        assert_eq!(cli.cache_size, DEFAULT_CACHE_CAPACITY);
        Ok(())
    }

    #[test]
    fn test_windowed_flags() -> TestResult {
        let cli = WindowedCli::try_parse_from([
            "windowed_watchdog",
            "220",
            "--activate",
            "--publish",
            "--cache-size",
            "40",
            "--failure-addr",
            "127.0.0.1:7500",
            "-vv",
        ])?;
        assert!(cli.common.activate);
        assert!(cli.common.publish);
        assert_eq!(cli.cache_size, 40);
        assert_eq!(cli.common.verbose, 2);
        assert!(cli.common.failure_addr.is_some());

        let config = cli.common.config_builder().cache_capacity(cli.cache_size).build()?;
        assert_eq!(config.lease, Duration::from_millis(220));
        assert!(config.enable_publisher);
        assert!(config.autostart);
        assert_eq!(config.cache_capacity, 40);
        Ok(())
    }

    #[test]
    fn test_zero_lease_rejected() {
        assert!(matches!(
            parse_from::<WindowedCli, _, _>(["windowed_watchdog", "0"]),
            Parsed::Usage(_)
        ));
    }

    #[test]
    fn test_missing_or_garbage_lease_prints_usage() {
        for args in [vec!["simple_watchdog"], vec!["simple_watchdog", "soon"]] {
            let parsed = parse_from::<SimpleCli, _, _>(args);
            assert!(matches!(parsed, Parsed::Usage(ref text) if text.contains("Usage:")));
        }
    }

    #[test]
    fn test_help_is_usage() {
        let parsed = parse_from::<SimpleCli, _, _>(["simple_watchdog", "-h"]);
        assert!(matches!(parsed, Parsed::Usage(ref text) if text.contains("--source-id")));
    }

    #[test]
    fn test_tick_period_floor() -> TestResult {
        let cli = SimpleCli::try_parse_from(["simple_watchdog", "2"])?;
        assert_eq!(cli.common.tick_period(), Duration::from_millis(1));
        let cli = SimpleCli::try_parse_from(["simple_watchdog", "400"])?;
        assert_eq!(cli.common.tick_period(), Duration::from_millis(100));
        Ok(())
    }

    #[test]
    fn test_heartbeat_args() -> TestResult {
        let cli = HeartbeatCli::try_parse_from([
            "simple_heartbeat",
            "100",
            "--source-id",
            "3",
            "--frame-id",
            "base",
        ])?;
        assert_eq!(cli.period(), Duration::from_millis(100));
        assert_eq!(cli.source_id, 3);
        assert_eq!(cli.frame_id, "base");
        Ok(())
    }

    #[test]
    fn test_cli_definitions_are_consistent() {
        WindowedCli::command().debug_assert();
        SimpleCli::command().debug_assert();
        HeartbeatCli::command().debug_assert();
    }
}

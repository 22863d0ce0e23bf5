//! Tracing set-up shared by the command-line processes

use tracing_subscriber::prelude::*;

/// Log level selected by the number of `-v` flags.
#[must_use]
pub fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber, logging to stderr so stdout stays free
/// for status lines. `RUST_LOG` overrides the verbosity flags.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init(verbose: u8) -> anyhow::Result<()> {
    let level = level_for(verbose);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("sw_watchdog={level},sw_watchdog_cli={level},warn").into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert_eq!(level_for(0), "info");
        assert_eq!(level_for(1), "debug");
        assert_eq!(level_for(2), "trace");
        assert_eq!(level_for(9), "trace");
    }
}

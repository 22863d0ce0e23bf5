//! Windowed watchdog process

use std::process::ExitCode;
use std::sync::Arc;
use sw_watchdog::{Clock, LocalBus, SystemClock, Watchdog};
use sw_watchdog_cli::args::{self, Parsed, WindowedCli};
use sw_watchdog_cli::{logging, output, runner};

fn main() -> ExitCode {
    let cli = match args::parse::<WindowedCli>() {
        Parsed::Run(cli) => cli,
        Parsed::Usage(text) => {
            print!("{text}");
            return ExitCode::SUCCESS;
        }
    };

    let config = match cli
        .common
        .config_builder()
        .cache_capacity(cli.cache_size)
        .build()
    {
        Ok(config) => config,
        Err(err) => {
            println!("error: {err}\n\n{}", args::usage::<WindowedCli>());
            return ExitCode::SUCCESS;
        }
    };

    let json = cli.common.json;
    let result = logging::init(cli.common.verbose).and_then(|()| {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let bus = Arc::new(LocalBus::new(Arc::clone(&clock)));
        let watchdog = Watchdog::windowed(config, Arc::clone(&bus), clock)?;
        runner::block_on(runner::run(watchdog, bus, (&cli.common).into()))?
    });

    output::finish(result, json)
}

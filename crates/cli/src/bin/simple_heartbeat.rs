//! Heartbeat sender process

use std::process::ExitCode;
use sw_watchdog_cli::args::{self, HeartbeatCli, Parsed};
use sw_watchdog_cli::{heartbeat, logging, output, runner};

fn main() -> ExitCode {
    let cli = match args::parse::<HeartbeatCli>() {
        Parsed::Run(cli) => cli,
        Parsed::Usage(text) => {
            print!("{text}");
            return ExitCode::SUCCESS;
        }
    };

    let result = logging::init(cli.verbose)
        .and_then(|()| runner::block_on(heartbeat::run(cli))?);

    output::finish(result, false)
}

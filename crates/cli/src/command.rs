//! Lifecycle commands read from stdin

use std::str::FromStr;
use sw_watchdog::Transition;

use crate::error::CliError;

/// One line of operator input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Drive the lifecycle.
    Transition(Transition),
    /// Print the current state.
    State,
}

impl FromStr for Command {
    type Err = CliError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let word = line.trim().to_ascii_lowercase();
        if word == "state" {
            return Ok(Self::State);
        }
        Transition::from_name(&word)
            .map(Self::Transition)
            .ok_or(CliError::UnknownCommand(word))
    }
}

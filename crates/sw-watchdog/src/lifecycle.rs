//! Watchdog lifecycle state machine.
//!
//! [`transition`] is pure: it validates a request against the current state
//! and returns the [`Effect`]s the watchdog must apply. Handles to the
//! subscription and the failure publisher only change through those effects.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{WatchdogConfig, validate_lease};
use crate::error::{WatchdogError, WatchdogResult};

/// Lifecycle state of a watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Created, nothing bound.
    #[default]
    Unconfigured,
    /// Configured, not subscribed.
    Inactive,
    /// Subscribed and reporting.
    Active,
    /// Shut down. Terminal.
    Finalized,
}

impl LifecycleState {
    /// Get the state name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Finalized => "finalized",
        }
    }
}

impl core::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A requested lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transition {
    /// Unconfigured to Inactive.
    Configure,
    /// Inactive to Active.
    Activate,
    /// Active to Inactive.
    Deactivate,
    /// Inactive to Unconfigured.
    Cleanup,
    /// Any non-final state to Finalized.
    Shutdown,
}

impl Transition {
    /// All transitions.
    pub const ALL: [Self; 5] = [
        Self::Configure,
        Self::Activate,
        Self::Deactivate,
        Self::Cleanup,
        Self::Shutdown,
    ];

    /// Get the transition name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configure => "configure",
            Self::Activate => "activate",
            Self::Deactivate => "deactivate",
            Self::Cleanup => "cleanup",
            Self::Shutdown => "shutdown",
        }
    }

    /// Look a transition up by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.as_str() == name)
    }
}

impl core::fmt::Display for Transition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Start routing liveliness events to the detector.
    BindLivelinessHandler,
    /// Stop routing liveliness events.
    UnbindLivelinessHandler,
    /// Create the failure publisher (inactive).
    CreatePublisher,
    /// Activate the failure publisher.
    EnablePublisher,
    /// Deactivate the failure publisher.
    DisablePublisher,
    /// Drop the failure publisher.
    ReleasePublisher,
    /// Subscribe to heartbeats with the given liveliness lease.
    Subscribe {
        /// Lease requested from the transport.
        lease: Duration,
    },
    /// Drop the heartbeat subscription.
    Unsubscribe,
    /// Clear the detector's history.
    ResetDetector,
}

/// An accepted transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// State before the transition.
    pub from: LifecycleState,
    /// State after the transition.
    pub to: LifecycleState,
    /// Effects to apply, in order.
    pub effects: Vec<Effect>,
}

/// Validate `event` in `state` and compute the resulting step.
///
/// # Errors
///
/// Returns [`WatchdogError::InvalidTransition`] for any pair outside the
/// lifecycle table, and [`WatchdogError::InvalidConfiguration`] when
/// configuring or activating with a zero lease.
pub fn transition(
    state: LifecycleState,
    event: Transition,
    config: &WatchdogConfig,
) -> WatchdogResult<Step> {
    use LifecycleState::{Active, Finalized, Inactive, Unconfigured};

    let (to, effects) = match (state, event) {
        (Unconfigured, Transition::Configure) => {
            validate_lease(config.lease)?;
            let mut effects = vec![Effect::BindLivelinessHandler];
            if config.enable_publisher {
                effects.push(Effect::CreatePublisher);
            }
            (Inactive, effects)
        }
        (Inactive, Transition::Activate) => {
            validate_lease(config.lease)?;
            (
                Active,
                vec![
                    Effect::Subscribe {
                        lease: config.lease,
                    },
                    Effect::EnablePublisher,
                ],
            )
        }
        (Active, Transition::Deactivate) => (
            Inactive,
            vec![Effect::Unsubscribe, Effect::DisablePublisher],
        ),
        (Inactive, Transition::Cleanup) => (
            Unconfigured,
            vec![
                Effect::ReleasePublisher,
                Effect::UnbindLivelinessHandler,
                Effect::ResetDetector,
            ],
        ),
        (Unconfigured | Inactive | Active, Transition::Shutdown) => (
            Finalized,
            vec![
                Effect::Unsubscribe,
                Effect::ReleasePublisher,
                Effect::UnbindLivelinessHandler,
            ],
        ),
        (from, event) => return Err(WatchdogError::invalid_transition(from, event)),
    };

    Ok(Step {
        from: state,
        to,
        effects,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WatchdogResult<WatchdogConfig> {
        WatchdogConfig::builder()
            .lease_ms(220)
            .enable_publisher(true)
            .build()
    }

    #[test]
    fn test_configure_creates_publisher_when_enabled() -> WatchdogResult<()> {
        let step = transition(LifecycleState::Unconfigured, Transition::Configure, &config()?)?;
        assert_eq!(step.to, LifecycleState::Inactive);
        assert_eq!(
            step.effects,
            vec![Effect::BindLivelinessHandler, Effect::CreatePublisher]
        );

        let quiet = WatchdogConfig {
            enable_publisher: false,
            ..config()?
        };
        let step = transition(LifecycleState::Unconfigured, Transition::Configure, &quiet)?;
        assert_eq!(step.effects, vec![Effect::BindLivelinessHandler]);
        Ok(())
    }

    #[test]
    fn test_activate_subscribes_with_lease() -> WatchdogResult<()> {
        let step = transition(LifecycleState::Inactive, Transition::Activate, &config()?)?;
        assert_eq!(step.to, LifecycleState::Active);
        assert_eq!(
            step.effects.first(),
            Some(&Effect::Subscribe {
                lease: Duration::from_millis(220)
            })
        );
        Ok(())
    }

    #[test]
    fn test_zero_lease_rejected() -> WatchdogResult<()> {
        let zero = WatchdogConfig {
            lease: Duration::ZERO,
            ..config()?
        };
        for (state, event) in [
            (LifecycleState::Unconfigured, Transition::Configure),
            (LifecycleState::Inactive, Transition::Activate),
        ] {
            assert!(matches!(
                transition(state, event, &zero),
                Err(WatchdogError::InvalidConfiguration(_))
            ));
        }
        Ok(())
    }

    #[test]
    fn test_transition_table() -> Result<(), Box<dyn std::error::Error>> {
        let config = config()?;
        let states = [
            LifecycleState::Unconfigured,
            LifecycleState::Inactive,
            LifecycleState::Active,
            LifecycleState::Finalized,
        ];
        for state in states {
            for event in Transition::ALL {
                let expected = match (state, event) {
                    (LifecycleState::Unconfigured, Transition::Configure)
                    | (LifecycleState::Active, Transition::Deactivate) => {
                        Some(LifecycleState::Inactive)
                    }
                    (LifecycleState::Inactive, Transition::Activate) => Some(LifecycleState::Active),
                    (LifecycleState::Inactive, Transition::Cleanup) => {
                        Some(LifecycleState::Unconfigured)
                    }
                    (_, Transition::Shutdown) if state != LifecycleState::Finalized => {
                        Some(LifecycleState::Finalized)
                    }
                    _ => None,
                };
                match (transition(state, event, &config), expected) {
                    (Ok(step), Some(to)) => {
                        assert_eq!(step.from, state);
                        assert_eq!(step.to, to);
                    }
                    (Err(err), None) => {
                        assert_eq!(err, WatchdogError::invalid_transition(state, event));
                    }
                    (result, expected) => {
                        return Err(format!(
                            "{state} + {event}: got {result:?}, expected {expected:?}"
                        )
                        .into());
                    }
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_names_round_trip() {
        for event in Transition::ALL {
            assert_eq!(Transition::from_name(event.as_str()), Some(event));
        }
        assert_eq!(Transition::from_name("reboot"), None);
        assert_eq!(LifecycleState::Active.to_string(), "active");
    }
}

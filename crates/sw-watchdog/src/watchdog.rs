//! The watchdog node.
//!
//! A [`Watchdog`] owns its lifecycle state, its heartbeat subscription, its
//! failure reporter and its detector behind a single mutex. The transport
//! only holds a weak reference to it, so dropping the watchdog unsubscribes.

use parking_lot::Mutex;
use std::sync::Arc;
use sw_watchdog_msgs::Heartbeat;

use crate::clock::Clock;
use crate::config::WatchdogConfig;
use crate::detector::{Detector, SingleSourceDetector, WindowedDetector};
use crate::error::WatchdogResult;
use crate::lifecycle::{Effect, LifecycleState, Transition, transition};
use crate::metrics::{WatchdogMetrics, bump};
use crate::reporter::FailureReporter;
use crate::transport::{HeartbeatListener, LivelinessChangedInfo, LivelinessQos, Transport};

/// Watchdog attributing losses over a window of heartbeats from many sources.
pub type WindowedWatchdog<T> = Watchdog<T, WindowedDetector>;

/// Watchdog for a channel with a single watched source.
pub type SimpleWatchdog<T> = Watchdog<T, SingleSourceDetector>;

struct Inner<T: Transport, D> {
    state: LifecycleState,
    handler_bound: bool,
    subscription: Option<T::Subscription>,
    reporter: FailureReporter<T::Publisher>,
    detector: D,
    metrics: WatchdogMetrics,
}

struct Shared<T: Transport, D> {
    config: WatchdogConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner<T, D>>,
}

/// Lease-based liveliness watchdog.
///
/// Lifecycle calls, heartbeat delivery and liveliness handling are all
/// serialized on one lock, so a loss is always judged against every
/// heartbeat delivered before it, and no report can be published once
/// `deactivate` or `shutdown` has returned.
pub struct Watchdog<T: Transport, D: Detector> {
    transport: Arc<T>,
    shared: Arc<Shared<T, D>>,
}

impl<T: Transport> Watchdog<T, WindowedDetector> {
    /// Create a windowed watchdog caching `config.cache_capacity` heartbeats.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn windowed(
        config: WatchdogConfig,
        transport: Arc<T>,
        clock: Arc<dyn Clock>,
    ) -> WatchdogResult<Self> {
        let detector = WindowedDetector::new(config.cache_capacity);
        Self::new(config, transport, clock, detector)
    }
}

impl<T: Transport> Watchdog<T, SingleSourceDetector> {
    /// Create a single-source watchdog reporting `config.watched_source_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn simple(
        config: WatchdogConfig,
        transport: Arc<T>,
        clock: Arc<dyn Clock>,
    ) -> WatchdogResult<Self> {
        let detector = SingleSourceDetector::new(config.watched_source_id);
        Self::new(config, transport, clock, detector)
    }
}

impl<T: Transport, D: Detector> Watchdog<T, D> {
    /// Create an unconfigured watchdog.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(
        config: WatchdogConfig,
        transport: Arc<T>,
        clock: Arc<dyn Clock>,
        detector: D,
    ) -> WatchdogResult<Self> {
        config.validate()?;
        let inner = Inner {
            state: LifecycleState::Unconfigured,
            handler_bound: false,
            subscription: None,
            reporter: FailureReporter::default(),
            detector,
            metrics: WatchdogMetrics::default(),
        };
        Ok(Self {
            transport,
            shared: Arc::new(Shared {
                config,
                clock,
                inner: Mutex::new(inner),
            }),
        })
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &WatchdogConfig {
        &self.shared.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.shared.inner.lock().state
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn metrics(&self) -> WatchdogMetrics {
        self.shared.inner.lock().metrics
    }

    /// Whether a heartbeat subscription is held.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.shared.inner.lock().subscription.is_some()
    }

    /// Whether failure reports would currently be published.
    #[must_use]
    pub fn is_reporting(&self) -> bool {
        self.shared.inner.lock().reporter.is_enabled()
    }

    /// Run `f` against the detector.
    pub fn with_detector<R>(&self, f: impl FnOnce(&D) -> R) -> R {
        f(&self.shared.inner.lock().detector)
    }

    /// Configure, then activate when `config.autostart` is set.
    ///
    /// # Errors
    ///
    /// Returns the first failed transition.
    pub fn start(&self) -> WatchdogResult<LifecycleState> {
        if !self.shared.config.autostart {
            return Ok(self.state());
        }
        self.configure()?;
        self.activate()
    }

    /// Unconfigured to Inactive.
    ///
    /// # Errors
    ///
    /// Returns an error if the transition is invalid or an effect fails.
    pub fn configure(&self) -> WatchdogResult<LifecycleState> {
        self.trigger(Transition::Configure)
    }

    /// Inactive to Active.
    ///
    /// # Errors
    ///
    /// Returns an error if the transition is invalid or an effect fails.
    pub fn activate(&self) -> WatchdogResult<LifecycleState> {
        self.trigger(Transition::Activate)
    }

    /// Active to Inactive.
    ///
    /// # Errors
    ///
    /// Returns an error if the transition is invalid.
    pub fn deactivate(&self) -> WatchdogResult<LifecycleState> {
        self.trigger(Transition::Deactivate)
    }

    /// Inactive to Unconfigured.
    ///
    /// # Errors
    ///
    /// Returns an error if the transition is invalid.
    pub fn cleanup(&self) -> WatchdogResult<LifecycleState> {
        self.trigger(Transition::Cleanup)
    }

    /// Any non-final state to Finalized.
    ///
    /// # Errors
    ///
    /// Returns an error if already finalized.
    pub fn shutdown(&self) -> WatchdogResult<LifecycleState> {
        self.trigger(Transition::Shutdown)
    }

    /// Apply a lifecycle transition.
    ///
    /// When an effect fails the state is left unchanged. Effects already
    /// applied stay applied; they are idempotent, so retrying is safe.
    ///
    /// # Errors
    ///
    /// Returns an error if the transition is invalid or an effect fails.
    pub fn trigger(&self, event: Transition) -> WatchdogResult<LifecycleState> {
        let mut inner = self.shared.inner.lock();
        let step = transition(inner.state, event, &self.shared.config).inspect_err(|err| {
            tracing::warn!(state = %inner.state, event = %event, error = %err, "Transition rejected");
        })?;

        for effect in &step.effects {
            self.apply(&mut inner, *effect)?;
        }
        inner.state = step.to;
        bump(&mut inner.metrics.transitions);
        tracing::info!(from = %step.from, to = %step.to, event = %event, "Lifecycle transition");
        Ok(step.to)
    }

    fn apply(&self, inner: &mut Inner<T, D>, effect: Effect) -> WatchdogResult<()> {
        let config = &self.shared.config;
        match effect {
            Effect::BindLivelinessHandler => inner.handler_bound = true,
            Effect::UnbindLivelinessHandler => inner.handler_bound = false,
            Effect::CreatePublisher => inner.reporter.create(|| {
                self.transport
                    .create_publisher(&config.failure_topic, config.failure_queue_depth)
            })?,
            Effect::EnablePublisher => inner.reporter.enable(),
            Effect::DisablePublisher => inner.reporter.disable(),
            Effect::ReleasePublisher => inner.reporter.release(),
            Effect::Subscribe { lease } => {
                if inner.subscription.is_some() {
                    tracing::debug!(topic = %config.heartbeat_topic, "Already subscribed");
                } else {
                    let listener: Arc<dyn HeartbeatListener> = self.shared.clone();
                    let subscription = self.transport.subscribe(
                        &config.heartbeat_topic,
                        LivelinessQos::manual_by_topic(lease),
                        Arc::downgrade(&listener),
                    )?;
                    inner.subscription = Some(subscription);
                }
            }
            Effect::Unsubscribe => {
                if inner.subscription.take().is_none() {
                    tracing::debug!("No subscription to release");
                }
            }
            Effect::ResetDetector => inner.detector.reset(),
        }
        Ok(())
    }
}

impl<T: Transport, D: Detector> std::fmt::Debug for Watchdog<T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watchdog")
            .field("config", &self.shared.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<T: Transport, D: Detector> HeartbeatListener for Shared<T, D> {
    fn on_heartbeat(&self, heartbeat: Heartbeat) {
        let mut inner = self.inner.lock();
        if inner.state != LifecycleState::Active {
            return;
        }
        tracing::debug!(
            source_id = heartbeat.source_id,
            sequence_number = heartbeat.sequence_number,
            stamp = %heartbeat.stamp(),
            "Heartbeat received"
        );
        bump(&mut inner.metrics.heartbeats_received);
        inner.detector.observe(&heartbeat);
    }

    fn on_liveliness_changed(&self, info: LivelinessChangedInfo) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        bump(&mut inner.metrics.liveliness_events);
        if !inner.handler_bound {
            return;
        }
        if !info.is_net_loss() {
            tracing::debug!(
                alive_count = info.alive_count,
                not_alive_count = info.not_alive_count,
                "Liveliness gained"
            );
            return;
        }

        let now = self.clock.now();
        let attribution = match inner.detector.attribute(now, self.config.lease) {
            Ok(attribution) => attribution,
            Err(err) => {
                bump(&mut inner.metrics.detection_errors);
                tracing::info!(
                    error = %err,
                    not_alive_count = info.not_alive_count,
                    "Liveliness lost, no source attributed"
                );
                return;
            }
        };
        tracing::debug!(
            source_id = attribution.source_id(),
            elapsed = ?attribution.elapsed,
            overdue_ratio = ?attribution.overdue_ratio,
            "Liveliness loss attributed"
        );

        match inner.reporter.report(&attribution.heartbeat, now, inner.state) {
            Ok(Some(_)) => {
                bump(&mut inner.metrics.failures_reported);
                inner.detector.mark_failed(attribution.source_id());
            }
            Ok(None) => bump(&mut inner.metrics.reports_suppressed),
            Err(err) => {
                bump(&mut inner.metrics.publish_errors);
                tracing::warn!(
                    source_id = attribution.source_id(),
                    error = %err,
                    "Failed to publish failure report"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::WatchdogError;
    use crate::transport::LocalBus;
    use std::time::Duration;
    use sw_watchdog_msgs::Stamp;

    fn setup(enable_publisher: bool) -> WatchdogResult<(Arc<LocalBus>, WindowedWatchdog<LocalBus>)> {
        let clock = Arc::new(ManualClock::new(Stamp::new(50, 0)));
        let bus = Arc::new(LocalBus::new(clock.clone()));
        let config = WatchdogConfig::builder()
            .lease_ms(300)
            .enable_publisher(enable_publisher)
            .build()?;
        let watchdog = Watchdog::windowed(config, bus.clone(), clock)?;
        Ok((bus, watchdog))
    }

    #[test]
    fn test_effects_follow_state() -> WatchdogResult<()> {
        let (bus, watchdog) = setup(true)?;
        assert_eq!(watchdog.state(), LifecycleState::Unconfigured);

        watchdog.configure()?;
        assert_eq!(bus.publisher_count(), 1);
        assert!(!watchdog.is_subscribed());
        assert!(!watchdog.is_reporting());

        watchdog.activate()?;
        assert!(watchdog.is_subscribed());
        assert!(watchdog.is_reporting());
        assert_eq!(bus.subscription_count(), 1);

        watchdog.deactivate()?;
        assert_eq!(bus.subscription_count(), 0);
        assert!(!watchdog.is_reporting());

        watchdog.cleanup()?;
        assert_eq!(bus.publisher_count(), 0);

        watchdog.shutdown()?;
        assert_eq!(watchdog.state(), LifecycleState::Finalized);
        assert_eq!(watchdog.metrics().transitions, 5);
        Ok(())
    }

    #[test]
    fn test_invalid_transition_keeps_state() -> WatchdogResult<()> {
        let (_bus, watchdog) = setup(false)?;
        assert_eq!(
            watchdog.activate(),
            Err(WatchdogError::invalid_transition(
                LifecycleState::Unconfigured,
                Transition::Activate
            ))
        );
        assert_eq!(watchdog.state(), LifecycleState::Unconfigured);
        Ok(())
    }

    #[test]
    fn test_no_publisher_without_reporting() -> WatchdogResult<()> {
        let (bus, watchdog) = setup(false)?;
        watchdog.configure()?;
        watchdog.activate()?;
        assert_eq!(bus.publishers_created(), 0);
        assert!(!watchdog.is_reporting());
        Ok(())
    }

    #[test]
    fn test_drop_unsubscribes() -> WatchdogResult<()> {
        let (bus, watchdog) = setup(false)?;
        watchdog.configure()?;
        watchdog.activate()?;
        assert_eq!(bus.subscription_count(), 1);
        drop(watchdog);
        assert_eq!(bus.subscription_count(), 0);
        assert_eq!(bus.publish_heartbeat("heartbeat", Heartbeat::default()), 0);
        Ok(())
    }

    #[test]
    fn test_start_respects_autostart() -> WatchdogResult<()> {
        let clock = Arc::new(ManualClock::default());
        let bus = Arc::new(LocalBus::new(clock.clone()));
        let config = WatchdogConfig::builder()
            .lease(Duration::from_millis(100))
            .autostart(true)
            .build()?;
        let watchdog = Watchdog::simple(config.clone(), bus.clone(), clock.clone())?;
        assert_eq!(watchdog.start()?, LifecycleState::Active);

        let manual = WatchdogConfig {
            autostart: false,
            ..config
        };
        let watchdog = Watchdog::simple(manual, bus, clock)?;
        assert_eq!(watchdog.start()?, LifecycleState::Unconfigured);
        Ok(())
    }
}

//! Failure reporting.

use sw_watchdog_msgs::{Heartbeat, Stamp, Status};

use crate::error::WatchdogResult;
use crate::lifecycle::LifecycleState;
use crate::transport::StatusPublisher;

/// Owns the failure publisher and turns blamed heartbeats into [`Status`]
/// reports.
#[derive(Debug)]
pub struct FailureReporter<P> {
    publisher: Option<P>,
}

impl<P> Default for FailureReporter<P> {
    fn default() -> Self {
        Self { publisher: None }
    }
}

impl<P: StatusPublisher> FailureReporter<P> {
    /// Create a reporter without a publisher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a publisher exists.
    #[must_use]
    pub fn has_publisher(&self) -> bool {
        self.publisher.is_some()
    }

    /// Whether reports would currently be published.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.publisher
            .as_ref()
            .is_some_and(StatusPublisher::is_activated)
    }

    /// Create the publisher with `make` unless one exists.
    ///
    /// # Errors
    ///
    /// Returns the error from `make`.
    pub fn create<F>(&mut self, make: F) -> WatchdogResult<()>
    where
        F: FnOnce() -> WatchdogResult<P>,
    {
        if self.publisher.is_some() {
            tracing::debug!("Failure publisher already exists");
            return Ok(());
        }
        self.publisher = Some(make()?);
        Ok(())
    }

    /// Activate the publisher.
    pub fn enable(&mut self) {
        match self.publisher.as_mut() {
            Some(publisher) => publisher.on_activate(),
            None => tracing::debug!("No failure publisher to enable"),
        }
    }

    /// Deactivate the publisher.
    pub fn disable(&mut self) {
        match self.publisher.as_mut() {
            Some(publisher) => publisher.on_deactivate(),
            None => tracing::debug!("No failure publisher to disable"),
        }
    }

    /// Drop the publisher.
    pub fn release(&mut self) {
        if self.publisher.take().is_none() {
            tracing::debug!("No failure publisher to release");
        }
    }

    /// Report `heartbeat`'s source as failed at `now`.
    ///
    /// Returns the published report, or `None` when the watchdog is not
    /// active or the publisher is missing or inactive.
    ///
    /// # Errors
    ///
    /// Returns the publisher's transport error.
    pub fn report(
        &mut self,
        heartbeat: &Heartbeat,
        now: Stamp,
        state: LifecycleState,
    ) -> WatchdogResult<Option<Status>> {
        let publisher = match self.publisher.as_mut() {
            Some(publisher) if state == LifecycleState::Active && publisher.is_activated() => {
                publisher
            }
            _ => {
                tracing::info!(
                    missed_source_id = heartbeat.source_id,
                    detected_at = %now,
                    state = %state,
                    "Failure publisher inactive, report not published"
                );
                return Ok(None);
            }
        };

        let status = Status::new(now, heartbeat.source_id);
        publisher.publish(status.clone())?;
        tracing::warn!(
            missed_source_id = status.missed_source_id,
            last_sequence_number = heartbeat.sequence_number,
            detected_at = %now,
            "Lease expired, failure reported"
        );
        Ok(Some(status))
    }
}

//! The public facade.
//!
//! One [`Locwatch`] wires the permission machine, the acquisition machine,
//! and the subscription hub behind a coordinator task, and exposes the two
//! reactive streams plus the inbound callback bridges the embedding
//! application must feed: host binding, permission results, and
//! resolution results.
//!
//! Most applications use the process-wide instance managed by
//! [`configure`](crate::configure)/[`instance`](crate::instance); embedders
//! and tests can also construct facades directly with [`Locwatch::new`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::acquisition::AcquisitionMachine;
use crate::config::{AccuracyTier, Configuration};
use crate::coordinator::{Command, Coordinator};
use crate::error::LocwatchError;
use crate::host::HostActions;
use crate::permission::PermissionMachine;
use crate::platform::{LocationProvider, PermissionGateway};
use crate::stream::{LocationUpdates, PermissionUpdates, Subject, SubscriptionGuard};

/// The platform implementations a facade is wired against.
pub struct Platform {
    /// Runtime-permission primitives.
    pub permissions: Arc<dyn PermissionGateway>,
    /// Settings-check and fix-streaming primitives.
    pub provider: Arc<dyn LocationProvider>,
}

/// Reactive location tracking for one process.
///
/// Dropping the last handle (or calling [`shutdown`](Self::shutdown))
/// stops the coordinator and cancels any live platform registration.
pub struct Locwatch {
    commands: mpsc::UnboundedSender<Command>,
    permission_subject: Subject<crate::PermissionStatus>,
    location_subject: Subject<crate::LocationStatus>,
    next_subscriber_id: AtomicU64,
    cancellation: CancellationToken,
}

impl Locwatch {
    /// Create a facade and spawn its coordinator task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: Configuration, platform: Platform) -> Self {
        let permission_subject = Subject::new();
        let location_subject = Subject::new();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let cancellation = CancellationToken::new();

        let coordinator = Coordinator::new(
            config,
            platform.permissions,
            platform.provider,
            PermissionMachine::new(permission_subject.clone()),
            AcquisitionMachine::new(location_subject.clone()),
            command_tx.clone(),
            cancellation.clone(),
        );
        tokio::spawn(coordinator.run(command_rx));
        info!("locwatch started");

        Self {
            commands: command_tx,
            permission_subject,
            location_subject,
            next_subscriber_id: AtomicU64::new(1),
            cancellation,
        }
    }

    /// Bind the current foreground host.
    ///
    /// The binding is non-owning: only a weak reference is kept, and host
    /// actions are silently skipped once the host is gone. Call this every
    /// time a new surface comes to the foreground; binding re-evaluates
    /// the permission state.
    pub fn bind_host(&self, host: &Arc<dyn HostActions>) {
        self.send(Command::BindHost(Arc::downgrade(host)));
    }

    /// Deliver the outcome of a platform permission request.
    ///
    /// Results with a request id that is not the pending one are ignored.
    pub fn on_permission_result(&self, request_id: u32, granted: bool) {
        self.send(Command::PermissionResult {
            request_id,
            granted,
        });
    }

    /// Deliver the outcome of the settings-resolution flow.
    ///
    /// `true` re-runs the settings check; `false` marks the enable-location
    /// flow as rejected.
    pub fn on_resolution_result(&self, confirmed: bool) {
        self.send(Command::ResolutionResult { confirmed });
    }

    /// Hot-swap the accuracy tier.
    ///
    /// Re-registers the fix stream with the new tier, cancelling the old
    /// registration first.
    pub fn set_accuracy(&self, accuracy: AccuracyTier) {
        self.send(Command::SetAccuracy(accuracy));
    }

    /// Hot-swap the update interval.
    ///
    /// # Errors
    ///
    /// Returns [`LocwatchError::InvalidInterval`] for a zero interval; the
    /// previous interval and registration are left untouched.
    pub fn set_update_interval(&self, interval_ms: u64) -> Result<(), LocwatchError> {
        if interval_ms == 0 {
            return Err(LocwatchError::InvalidInterval);
        }
        self.send(Command::SetUpdateInterval(interval_ms));
        Ok(())
    }

    /// Subscribe to location status transitions.
    ///
    /// The first live subscription activates acquisition; dropping the
    /// last one cancels the platform registration.
    pub fn location_updates(&self) -> LocationUpdates {
        let id = self.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let guard = SubscriptionGuard::new(id, self.commands.clone());
        let updates = LocationUpdates::new(self.location_subject.clone(), guard);
        self.send(Command::Subscribe { id });
        updates
    }

    /// Subscribe to permission status transitions.
    ///
    /// Observing permissions alone does not activate acquisition.
    pub fn permission_updates(&self) -> PermissionUpdates {
        PermissionUpdates::new(self.permission_subject.clone())
    }

    /// Stop the coordinator and cancel any live platform registration.
    pub fn shutdown(&self) {
        self.cancellation.cancel();
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("command after shutdown, ignoring");
        }
    }
}

impl Drop for Locwatch {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

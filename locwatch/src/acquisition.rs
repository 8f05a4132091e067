//! Location acquisition state machine.
//!
//! Runs only while the location stream has subscribers. Activation checks
//! permission, then device location settings, and only then registers for
//! streamed fixes; every failure along the way degrades to a specific
//! status value instead of an error state. The platform registration is
//! kept at-most-one-alive by always cancelling the previous registration
//! before creating the next, which is also how accuracy and interval
//! hot-swaps take effect.
//!
//! Fixes flow from the platform through a per-registration bridge task
//! into the coordinator command channel, tagged with the registration id.
//! A fix from a cancelled registration, or one arriving after the last
//! subscriber left, is dropped on arrival.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::config::Configuration;
use crate::coordinator::Command;
use crate::host::{HostSlot, RetryHandle};
use crate::platform::{
    LocationFix, LocationProvider, PermissionGateway, RegistrationId, ResolutionToken,
    SettingsCheckError, UpdateRequest, FIX_CHANNEL_CAPACITY,
};
use crate::stream::Subject;

/// Request id used for the settings-resolution flow.
pub const RESOLUTION_REQUEST_ID: u32 = 0x0543;

/// Location acquisition lifecycle state.
///
/// The payload-carrying variants enforce the data invariants directly:
/// `HasLocation` always holds a fix and `NeedToEnableLocation` always
/// holds the token for the pending resolution flow.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationStatus {
    /// Initial state, never observed through the stream.
    Unknown,
    /// The location permission is not granted.
    PermissionRequired,
    /// Device location settings are off, but a resolution flow can ask
    /// the user to change them.
    NeedToEnableLocation(ResolutionToken),
    /// The user declined the resolution flow, or the device does not
    /// permit changing the settings at all.
    RejectedToEnableLocation,
    /// Registered for updates; no fix has arrived yet.
    WaitingForLocation,
    /// A fix is available.
    HasLocation(LocationFix),
}

/// Everything an acquisition step needs from the coordinator.
///
/// Borrowed per call so the machine stays free of long-lived references
/// into the rest of the core.
pub(crate) struct AcquisitionContext<'a> {
    pub provider: &'a Arc<dyn LocationProvider>,
    pub permissions: &'a Arc<dyn PermissionGateway>,
    pub config: &'a Configuration,
    pub host: &'a HostSlot,
    pub commands: &'a mpsc::UnboundedSender<Command>,
    /// Whether any location-stream subscriber is live right now.
    pub active: bool,
}

/// State machine for settings resolution and fix streaming.
pub(crate) struct AcquisitionMachine {
    status: LocationStatus,
    subject: Subject<LocationStatus>,
    registration: Option<RegistrationId>,
}

impl AcquisitionMachine {
    pub(crate) fn new(subject: Subject<LocationStatus>) -> Self {
        Self {
            status: LocationStatus::Unknown,
            subject,
            registration: None,
        }
    }

    /// Current status. `Unknown` until the first activation.
    pub(crate) fn status(&self) -> &LocationStatus {
        &self.status
    }

    /// Currently live registration, if any.
    #[cfg(test)]
    pub(crate) fn registration(&self) -> Option<RegistrationId> {
        self.registration
    }

    /// Run the full acquisition check.
    ///
    /// Called on the 0→1 subscriber transition, on permission grant, on a
    /// confirmed settings resolution, and on a retry from the
    /// enable-location prompt. A no-op without active subscribers.
    pub(crate) async fn activate(&mut self, ctx: &AcquisitionContext<'_>) {
        if !ctx.active {
            return;
        }
        if !ctx.permissions.is_granted(ctx.config.permission_level) {
            self.publish(ctx, LocationStatus::PermissionRequired);
            return;
        }

        match ctx.provider.check_settings(ctx.config.accuracy).await {
            Ok(()) => self.register_for_updates(ctx).await,
            Err(SettingsCheckError::ResolutionRequired(token)) => {
                self.publish(ctx, LocationStatus::NeedToEnableLocation(token));
            }
            Err(SettingsCheckError::ResolutionUnavailable) => {
                self.publish(ctx, LocationStatus::RejectedToEnableLocation);
            }
            Err(SettingsCheckError::Transient(reason)) => {
                warn!(%reason, "settings check failed, keeping last status");
            }
        }
    }

    /// Fetch the last known fix and (re-)register the fix stream.
    ///
    /// Cancels any prior registration first, so at most one is ever live;
    /// this is also the hot-swap path for interval and accuracy changes.
    /// A refused registration is logged and absorbed.
    pub(crate) async fn register_for_updates(&mut self, ctx: &AcquisitionContext<'_>) {
        if !ctx.active {
            return;
        }
        if !ctx.permissions.is_granted(ctx.config.permission_level) {
            self.publish(ctx, LocationStatus::PermissionRequired);
            return;
        }

        match ctx.provider.last_known_fix().await {
            Some(fix) => self.publish(ctx, LocationStatus::HasLocation(fix)),
            None => self.publish(ctx, LocationStatus::WaitingForLocation),
        }

        self.cancel_registration(ctx.provider.as_ref());
        let request = UpdateRequest {
            interval_ms: ctx.config.update_interval_ms,
            accuracy: ctx.config.accuracy,
        };
        let (fix_tx, fix_rx) = mpsc::channel(FIX_CHANNEL_CAPACITY);
        match ctx.provider.request_updates(request, fix_tx) {
            Ok(registration) => {
                debug!(%registration, ?request, "registered for location updates");
                self.registration = Some(registration);
                spawn_fix_bridge(registration, fix_rx, ctx.commands.clone());
            }
            Err(error) => {
                warn!(%error, "cannot request location updates");
            }
        }
    }

    /// Ingest one streamed fix.
    ///
    /// Fixes from a registration that is no longer current, or arriving
    /// while no subscriber is active, are dropped.
    pub(crate) fn ingest_fix(
        &mut self,
        registration: RegistrationId,
        fix: LocationFix,
        active: bool,
    ) {
        if self.registration != Some(registration) {
            trace!(%registration, "dropping fix from cancelled registration");
            return;
        }
        if !active {
            trace!(%registration, "dropping fix, no active subscribers");
            return;
        }
        self.set_status(LocationStatus::HasLocation(fix));
    }

    /// Stop fix streaming. The last status is kept; the next activation
    /// re-runs the settings check from scratch.
    pub(crate) fn deactivate(&mut self, provider: &dyn LocationProvider) {
        self.cancel_registration(provider);
    }

    /// Ingest the outcome of the settings-resolution flow.
    pub(crate) async fn on_resolution_result(
        &mut self,
        ctx: &AcquisitionContext<'_>,
        confirmed: bool,
    ) {
        if confirmed {
            self.activate(ctx).await;
        } else if ctx.active {
            self.publish(ctx, LocationStatus::RejectedToEnableLocation);
        }
    }

    fn cancel_registration(&mut self, provider: &dyn LocationProvider) {
        if let Some(registration) = self.registration.take() {
            provider.cancel_updates(registration);
            debug!(%registration, "cancelled location updates");
        }
    }

    /// Publish a status, firing the automatic host prompt it implies
    /// first. The published value is forwarded unchanged.
    fn publish(&mut self, ctx: &AcquisitionContext<'_>, status: LocationStatus) {
        if ctx.config.auto_location_prompt {
            match &status {
                LocationStatus::NeedToEnableLocation(token) => {
                    let token = token.clone();
                    ctx.host
                        .with_live(move |h| h.launch_resolution(token, RESOLUTION_REQUEST_ID));
                }
                LocationStatus::RejectedToEnableLocation => {
                    let message = ctx.config.settings_message.clone();
                    let retry = RetryHandle::new(ctx.commands.clone());
                    ctx.host
                        .with_live(move |h| h.show_enable_location_message(&message, retry));
                }
                _ => {}
            }
        }
        self.set_status(status);
    }

    fn set_status(&mut self, status: LocationStatus) {
        debug!(status = ?status, "location status");
        self.status = status.clone();
        self.subject.publish(status);
    }
}

/// Forward fixes from one registration into the coordinator, tagged with
/// the registration id so stale deliveries can be recognized.
fn spawn_fix_bridge(
    registration: RegistrationId,
    mut fixes: mpsc::Receiver<LocationFix>,
    commands: mpsc::UnboundedSender<Command>,
) {
    tokio::spawn(async move {
        while let Some(fix) = fixes.recv().await {
            if commands
                .send(Command::FixDelivered { registration, fix })
                .is_err()
            {
                break;
            }
        }
        trace!(%registration, "fix bridge finished");
    });
}

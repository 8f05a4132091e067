//! The designated executor.
//!
//! Every state transition, platform completion, and subscriber-count
//! change is serialized onto one coordinator task consuming a command
//! channel. That single task owns both state machines, the host slot, and
//! the live configuration, so no locks guard any of them. Platform calls
//! that suspend (settings check, last-known-fix) are awaited inline on
//! this task: ordering within the machines is strictly sequential, and a
//! later check supersedes an earlier registration via
//! cancel-before-register.

use std::sync::{Arc, Weak};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::acquisition::{AcquisitionContext, AcquisitionMachine};
use crate::config::{AccuracyTier, Configuration};
use crate::host::{HostActions, HostSlot};
use crate::hub::SubscriptionHub;
use crate::permission::{PermissionMachine, PermissionStatus};
use crate::platform::{LocationFix, LocationProvider, PermissionGateway, RegistrationId};

/// Messages serialized onto the coordinator task.
pub(crate) enum Command {
    /// A new foreground host came to the front.
    BindHost(Weak<dyn HostActions>),
    /// Outcome of a platform permission request.
    PermissionResult { request_id: u32, granted: bool },
    /// Outcome of the settings-resolution flow.
    ResolutionResult { confirmed: bool },
    /// A location-stream observer attached.
    Subscribe { id: u64 },
    /// A location-stream observer detached.
    Unsubscribe { id: u64 },
    /// Hot-swap the accuracy tier.
    SetAccuracy(AccuracyTier),
    /// Hot-swap the update interval. Validated before it is sent.
    SetUpdateInterval(u64),
    /// Re-run the acquisition check (retry affordances).
    Recheck,
    /// One fix delivered by the platform bridge.
    FixDelivered {
        registration: RegistrationId,
        fix: LocationFix,
    },
}

/// Owns all mutable core state and processes commands one at a time.
pub(crate) struct Coordinator {
    config: Configuration,
    permissions: Arc<dyn PermissionGateway>,
    provider: Arc<dyn LocationProvider>,
    host: HostSlot,
    permission: PermissionMachine,
    acquisition: AcquisitionMachine,
    hub: SubscriptionHub,
    commands: mpsc::UnboundedSender<Command>,
    cancellation: CancellationToken,
}

impl Coordinator {
    pub(crate) fn new(
        config: Configuration,
        permissions: Arc<dyn PermissionGateway>,
        provider: Arc<dyn LocationProvider>,
        permission: PermissionMachine,
        acquisition: AcquisitionMachine,
        commands: mpsc::UnboundedSender<Command>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            config,
            permissions,
            provider,
            host: HostSlot::default(),
            permission,
            acquisition,
            hub: SubscriptionHub::default(),
            commands,
            cancellation,
        }
    }

    /// Process commands until cancellation or until every facade handle
    /// and subscription guard is gone.
    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        debug!("location coordinator started");
        let cancellation = self.cancellation.clone();
        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => {
                    debug!("location coordinator cancelled");
                    break;
                }

                command = commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => {
                        debug!("command channel closed");
                        break;
                    }
                },
            }
        }
        // Never leak the platform registration past our own lifetime.
        self.acquisition.deactivate(self.provider.as_ref());
        debug!("location coordinator stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::BindHost(host) => {
                self.host.bind(host);
                self.permission
                    .on_host_bound(self.permissions.as_ref(), &self.host, &self.config);
                self.recheck_if_granted().await;
            }
            Command::PermissionResult {
                request_id,
                granted,
            } => {
                self.permission.on_permission_result(
                    request_id,
                    granted,
                    &self.host,
                    &self.config,
                );
                self.recheck_if_granted().await;
            }
            Command::ResolutionResult { confirmed } => {
                let ctx = Self::context(
                    &self.provider,
                    &self.permissions,
                    &self.config,
                    &self.host,
                    &self.commands,
                    self.hub.is_active(),
                );
                self.acquisition.on_resolution_result(&ctx, confirmed).await;
            }
            Command::Subscribe { id } => {
                if self.hub.subscribe(id) {
                    self.activate().await;
                }
            }
            Command::Unsubscribe { id } => {
                if self.hub.unsubscribe(id) {
                    self.acquisition.deactivate(self.provider.as_ref());
                }
            }
            Command::SetAccuracy(accuracy) => {
                debug!(?accuracy, "accuracy changed");
                self.config.accuracy = accuracy;
                self.reregister().await;
            }
            Command::SetUpdateInterval(interval_ms) => {
                debug!(interval_ms, "update interval changed");
                self.config.update_interval_ms = interval_ms;
                self.reregister().await;
            }
            Command::Recheck => self.activate().await,
            Command::FixDelivered { registration, fix } => {
                self.acquisition
                    .ingest_fix(registration, fix, self.hub.is_active());
            }
        }
    }

    /// Permission emissions ending in a grant re-run the acquisition
    /// check, the coupling between the two machines.
    async fn recheck_if_granted(&mut self) {
        if self.permission.status() == PermissionStatus::PermissionGranted {
            self.activate().await;
        }
    }

    async fn activate(&mut self) {
        let ctx = Self::context(
            &self.provider,
            &self.permissions,
            &self.config,
            &self.host,
            &self.commands,
            self.hub.is_active(),
        );
        self.acquisition.activate(&ctx).await;
    }

    async fn reregister(&mut self) {
        let ctx = Self::context(
            &self.provider,
            &self.permissions,
            &self.config,
            &self.host,
            &self.commands,
            self.hub.is_active(),
        );
        self.acquisition.register_for_updates(&ctx).await;
    }

    fn context<'a>(
        provider: &'a Arc<dyn LocationProvider>,
        permissions: &'a Arc<dyn PermissionGateway>,
        config: &'a Configuration,
        host: &'a HostSlot,
        commands: &'a mpsc::UnboundedSender<Command>,
        active: bool,
    ) -> AcquisitionContext<'a> {
        AcquisitionContext {
            provider,
            permissions,
            config,
            host,
            commands,
            active,
        }
    }
}

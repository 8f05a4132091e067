//! Foreground host binding.
//!
//! The facade never owns the UI host that surfaces permission and
//! settings prompts. The host is advisory: it is bound while a foreground
//! surface exists, replaced whenever a new one comes to the front, and may
//! vanish at any time. [`HostSlot`] models that as a liveness-checked weak
//! handle — every action upgrades first, and a dead host makes the action a
//! silent no-op rather than an error.
//!
//! Errors returned by a host action are caught here at the boundary and
//! logged; they never propagate into the state machines.

use std::fmt;
use std::sync::Weak;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::coordinator::Command;
use crate::platform::ResolutionToken;

/// A host action failed in the embedding UI layer.
#[derive(Debug, Error)]
#[error("host action failed: {reason}")]
pub struct HostActionError {
    reason: String,
}

impl HostActionError {
    /// Create a host action error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Lets a host action re-enter the acquisition check.
///
/// Handed to [`HostActions::show_enable_location_message`] so the "try
/// again" affordance can re-run the settings check once the user claims to
/// have enabled location.
#[derive(Clone)]
pub struct RetryHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl RetryHandle {
    pub(crate) fn new(commands: mpsc::UnboundedSender<Command>) -> Self {
        Self { commands }
    }

    /// Re-run the acquisition check. Safe to call from any thread; the
    /// check is serialized onto the coordinator.
    pub fn retry(&self) {
        if self.commands.send(Command::Recheck).is_err() {
            debug!("retry requested after shutdown, ignoring");
        }
    }
}

impl fmt::Debug for RetryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryHandle").finish_non_exhaustive()
    }
}

/// UI actions the core may ask the current host to perform.
///
/// Implementations render whatever affordance fits the embedding
/// application (dialog, snackbar, console prompt). Failures are reported
/// through the `Result`; the core logs and absorbs them.
pub trait HostActions: Send + Sync {
    /// Explain why the permission is needed before re-requesting it.
    fn show_permission_rationale(&self, message: &str) -> Result<(), HostActionError>;

    /// Start the user-facing settings-resolution flow for `token`.
    ///
    /// The result must come back through
    /// [`Locwatch::on_resolution_result`](crate::Locwatch::on_resolution_result)
    /// with the same `request_id` semantics the platform uses.
    fn launch_resolution(
        &self,
        token: ResolutionToken,
        request_id: u32,
    ) -> Result<(), HostActionError>;

    /// Tell the user location must be enabled, offering `retry` to re-run
    /// the check.
    fn show_enable_location_message(
        &self,
        message: &str,
        retry: RetryHandle,
    ) -> Result<(), HostActionError>;
}

/// The current (at most one) host binding.
///
/// Holds a `Weak` so a departed host is never kept alive by the core.
#[derive(Default)]
pub(crate) struct HostSlot {
    host: Option<Weak<dyn HostActions>>,
}

impl HostSlot {
    /// Replace the current binding.
    pub(crate) fn bind(&mut self, host: Weak<dyn HostActions>) {
        self.host = Some(host);
    }

    /// Run `action` against the bound host if it is still alive.
    ///
    /// Skips silently when no host is bound or the host is gone; logs and
    /// absorbs action errors.
    pub(crate) fn with_live<F>(&self, action: F)
    where
        F: FnOnce(&dyn HostActions) -> Result<(), HostActionError>,
    {
        let Some(weak) = &self.host else {
            debug!("no host bound, skipping host action");
            return;
        };
        let Some(host) = weak.upgrade() else {
            debug!("host no longer alive, skipping host action");
            return;
        };
        if let Err(error) = action(host.as_ref()) {
            warn!(%error, "host action failed");
        }
    }

    /// Whether a live host is currently bound.
    pub(crate) fn is_live(&self) -> bool {
        self.host
            .as_ref()
            .is_some_and(|weak| weak.strong_count() > 0)
    }
}

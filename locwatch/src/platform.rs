//! Platform gateway traits.
//!
//! The core never talks to a device SDK directly. Everything it needs from
//! the platform arrives through the two traits here: [`PermissionGateway`]
//! for runtime-permission primitives and [`LocationProvider`] for
//! settings checks and fix streaming. Implementations adapt whatever SDK the
//! process runs against; tests and the demo binary script them in memory.
//!
//! # Dyn Compatibility
//!
//! Async provider methods use `Pin<Box<dyn Future>>` so the traits stay
//! usable as `Arc<dyn LocationProvider>` trait objects.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::{AccuracyTier, PermissionLevel};

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How many fixes may queue between the platform callback and the
/// coordinator before the producer is backpressured.
pub(crate) const FIX_CHANNEL_CAPACITY: usize = 16;

/// A single reported geographic position.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationFix {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in meters above the reference ellipsoid.
    pub altitude: f64,
    /// When the platform captured this fix.
    pub captured_at: DateTime<Utc>,
}

impl LocationFix {
    /// Create a fix captured now.
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
            captured_at: Utc::now(),
        }
    }

    /// Create a fix with an explicit capture time.
    pub fn with_captured_at(
        latitude: f64,
        longitude: f64,
        altitude: f64,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
            captured_at,
        }
    }
}

impl fmt::Display for LocationFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.6}, {:.6}) alt {:.1}m @ {}",
            self.latitude, self.longitude, self.altitude, self.captured_at
        )
    }
}

/// Opaque handle to a pending settings-resolution flow.
///
/// Created by the provider when a settings check fails with a resolvable
/// condition, carried by
/// [`LocationStatus::NeedToEnableLocation`](crate::LocationStatus::NeedToEnableLocation),
/// and handed to [`HostActions::launch_resolution`](crate::HostActions::launch_resolution)
/// to start the user-facing flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolutionToken(u64);

impl ResolutionToken {
    /// Create a token. Providers mint these; the core only passes them on.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The provider-assigned id behind this token.
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Handle to a live streaming registration. At most one is held at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(u64);

impl RegistrationId {
    /// Create a registration id. Providers mint these.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "registration#{}", self.0)
    }
}

/// Parameters for a streaming registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateRequest {
    /// Interval between fixes, in milliseconds.
    pub interval_ms: u64,
    /// Requested accuracy tier.
    pub accuracy: AccuracyTier,
}

/// Outcome of a failed settings check.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SettingsCheckError {
    /// Location settings are off but the user can be asked to change them.
    /// The token identifies the pending resolution flow.
    #[error("location settings require user resolution")]
    ResolutionRequired(ResolutionToken),

    /// Settings cannot be changed on this device; no flow can fix it.
    #[error("location settings change is unavailable on this device")]
    ResolutionUnavailable,

    /// Any other failure. Logged and absorbed; the machine keeps its last
    /// well-defined state.
    #[error("settings check failed: {0}")]
    Transient(String),
}

/// The platform refused a streaming registration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("location provider rejected the update request: {reason}")]
pub struct ProviderError {
    reason: String,
}

impl ProviderError {
    /// Create a provider error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Runtime-permission primitives.
///
/// All checks are synchronous by contract and must not block. The one
/// asynchronous operation, [`request_permission`](Self::request_permission),
/// is fire-and-forget: the outcome is delivered back through
/// [`Locwatch::on_permission_result`](crate::Locwatch::on_permission_result)
/// by the embedding application.
pub trait PermissionGateway: Send + Sync {
    /// Whether the permission at `level` is currently granted.
    fn is_granted(&self, level: PermissionLevel) -> bool;

    /// Whether the device recorded an explicit denial for `level`.
    fn was_denied(&self, level: PermissionLevel) -> bool;

    /// Whether an explanatory rationale should be shown before
    /// re-requesting.
    fn should_show_rationale(&self, level: PermissionLevel) -> bool;

    /// Start the platform permission request dialog.
    ///
    /// `request_id` must be echoed back with the result; results carrying
    /// any other id are ignored.
    fn request_permission(&self, level: PermissionLevel, request_id: u32);
}

/// Settings-check and fix-streaming primitives.
pub trait LocationProvider: Send + Sync {
    /// Check whether device location settings satisfy `accuracy`.
    fn check_settings(
        &self,
        accuracy: AccuracyTier,
    ) -> BoxFuture<'_, Result<(), SettingsCheckError>>;

    /// The most recent fix the platform already holds, if any.
    fn last_known_fix(&self) -> BoxFuture<'_, Option<LocationFix>>;

    /// Register for streamed fixes.
    ///
    /// The provider delivers each fix through `fixes` until the
    /// registration is cancelled. Dropping the sender on cancellation is
    /// expected; fixes sent after [`cancel_updates`](Self::cancel_updates)
    /// are discarded by the core regardless.
    fn request_updates(
        &self,
        request: UpdateRequest,
        fixes: mpsc::Sender<LocationFix>,
    ) -> Result<RegistrationId, ProviderError>;

    /// Cancel a streaming registration. Unknown ids are a no-op.
    fn cancel_updates(&self, registration: RegistrationId);
}

//! Locwatch - continuous location acquisition behind a reactive value.
//!
//! Locwatch automates the two gating checks every location feature needs —
//! runtime permission and device location settings — and exposes the result
//! as two replay-latest streams: one for permission status, one for
//! location status (which carries fixes once streaming is live). Expensive
//! platform registration starts with the first location-stream subscriber
//! and stops with the last, so an idle process never holds a registration.
//!
//! # Architecture
//!
//! ```text
//! bind_host ──► PermissionMachine ──grant──► AcquisitionMachine ──► statuses
//!                  │ (rationale /                │ (settings check,      │
//!                  │  request prompts)           │  fix registration)    ▼
//!              HostActions ◄── resolution / ─────┘               subscribers
//!                              enable prompts                (replay-latest)
//! ```
//!
//! All transitions are serialized onto one coordinator task; the platform
//! is reached only through the [`PermissionGateway`] and
//! [`LocationProvider`] traits, and UI prompts only through [`HostActions`]
//! bound as a liveness-checked weak handle.
//!
//! # Example
//!
//! ```ignore
//! use locwatch::{AccuracyTier, Configuration, Platform};
//!
//! let config = Configuration::builder()
//!     .accuracy(AccuracyTier::HighAccuracy)
//!     .update_interval_ms(5_000)
//!     .build()?;
//! locwatch::configure(config, Platform { permissions, provider })?;
//!
//! let instance = locwatch::instance()?;
//! instance.bind_host(&host);
//!
//! let mut updates = instance.location_updates();
//! while let Some(status) = updates.recv().await {
//!     println!("{status:?}");
//! }
//! ```

mod acquisition;
mod config;
mod coordinator;
mod error;
mod facade;
mod host;
mod hub;
pub mod logging;
mod permission;
mod platform;
mod registry;
mod stream;

pub use acquisition::{LocationStatus, RESOLUTION_REQUEST_ID};
pub use config::{
    AccuracyTier, Configuration, ConfigurationBuilder, PermissionLevel,
    DEFAULT_UPDATE_INTERVAL_MS,
};
pub use error::LocwatchError;
pub use facade::{Locwatch, Platform};
pub use host::{HostActionError, HostActions, RetryHandle};
pub use permission::PermissionStatus;
pub use platform::{
    BoxFuture, LocationFix, LocationProvider, PermissionGateway, ProviderError, RegistrationId,
    ResolutionToken, SettingsCheckError, UpdateRequest,
};
pub use registry::{configure, instance, reset};
pub use stream::{LocationUpdates, PermissionUpdates};

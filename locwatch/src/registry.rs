//! Process-wide instance registry.
//!
//! One facade per process, held in an explicit slot instead of implicit
//! module state: [`configure`] fills it exactly once, [`instance`] reads
//! it, and [`reset`] tears it down again so tests can isolate themselves.
//! Misuse fails loudly with a descriptive error rather than silently
//! reusing or replacing an instance.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::config::Configuration;
use crate::error::LocwatchError;
use crate::facade::{Locwatch, Platform};

static INSTANCE: RwLock<Option<Arc<Locwatch>>> = RwLock::new(None);

/// Configure the process-wide instance.
///
/// Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns [`LocwatchError::AlreadyConfigured`] on any call after the
/// first successful one; the existing instance is untouched.
pub fn configure(config: Configuration, platform: Platform) -> Result<(), LocwatchError> {
    let mut slot = INSTANCE.write();
    if slot.is_some() {
        return Err(LocwatchError::AlreadyConfigured);
    }
    *slot = Some(Arc::new(Locwatch::new(config, platform)));
    Ok(())
}

/// The process-wide instance.
///
/// # Errors
///
/// Returns [`LocwatchError::NotConfigured`] before the first successful
/// [`configure`] call (and after a [`reset`]).
pub fn instance() -> Result<Arc<Locwatch>, LocwatchError> {
    INSTANCE
        .read()
        .clone()
        .ok_or(LocwatchError::NotConfigured)
}

/// Tear down the process-wide instance.
///
/// Shuts the facade down and empties the slot so [`configure`] can run
/// again. Intended for test isolation; a no-op when nothing is
/// configured.
pub fn reset() {
    if let Some(existing) = INSTANCE.write().take() {
        existing.shutdown();
        info!("locwatch instance reset");
    }
}

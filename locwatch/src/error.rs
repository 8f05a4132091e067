//! Library error types.

use thiserror::Error;

/// Errors surfaced by configuration and the process-wide registry.
///
/// All of these fail fast and synchronously; none of them leave shared
/// state partially mutated. Platform-transient failures (a registration
/// attempt that is refused, a settings check that errors without a known
/// resolution code) are logged and absorbed instead of surfacing here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocwatchError {
    /// The update interval must be strictly positive.
    #[error("update interval must be greater than zero milliseconds")]
    InvalidInterval,

    /// `configure` was called a second time for this process.
    #[error("locwatch is already configured; configure can be called once per process")]
    AlreadyConfigured,

    /// `instance` was accessed before any successful `configure` call.
    #[error("locwatch is not configured; call locwatch::configure first")]
    NotConfigured,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert!(LocwatchError::InvalidInterval
            .to_string()
            .contains("greater than zero"));
        assert!(LocwatchError::AlreadyConfigured
            .to_string()
            .contains("already configured"));
        assert!(LocwatchError::NotConfigured
            .to_string()
            .contains("not configured"));
    }
}

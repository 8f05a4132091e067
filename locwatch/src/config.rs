//! Tracking configuration.
//!
//! `Configuration` is the immutable-after-build set of tunables owned by the
//! facade for its whole lifetime. Two of them — the accuracy tier and the
//! update interval — can be hot-swapped later through
//! [`Locwatch::set_accuracy`](crate::Locwatch::set_accuracy) and
//! [`Locwatch::set_update_interval`](crate::Locwatch::set_update_interval);
//! everything else is fixed once `build()` succeeds.

use crate::error::LocwatchError;

/// Default update interval: 60 seconds.
pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 60 * 1000;

/// Power/precision trade-off requested from the platform location stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccuracyTier {
    /// Most precise fixes, highest power draw.
    HighAccuracy,
    /// Balance between precision and power. The default.
    BalancedPower,
    /// Coarse fixes, low power draw.
    LowPower,
    /// Passive only: no power used to actively obtain fixes.
    NoPower,
}

impl AccuracyTier {
    /// All tiers, in descending precision order.
    pub const ALL: [AccuracyTier; 4] = [
        AccuracyTier::HighAccuracy,
        AccuracyTier::BalancedPower,
        AccuracyTier::LowPower,
        AccuracyTier::NoPower,
    ];
}

/// Granularity of the location permission requested from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionLevel {
    /// Precise location.
    Fine,
    /// Approximate location.
    Coarse,
}

/// Tunables for the location facade.
///
/// Build one via [`Configuration::builder`]:
///
/// ```
/// use locwatch::{AccuracyTier, Configuration};
///
/// let config = Configuration::builder()
///     .accuracy(AccuracyTier::HighAccuracy)
///     .update_interval_ms(5_000)
///     .build()
///     .unwrap();
/// assert_eq!(config.accuracy(), AccuracyTier::HighAccuracy);
/// ```
#[derive(Debug, Clone)]
pub struct Configuration {
    pub(crate) update_interval_ms: u64,
    pub(crate) accuracy: AccuracyTier,
    pub(crate) permission_level: PermissionLevel,
    pub(crate) auto_permission_prompt: bool,
    pub(crate) auto_location_prompt: bool,
    pub(crate) permission_message: String,
    pub(crate) settings_message: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
            accuracy: AccuracyTier::BalancedPower,
            permission_level: PermissionLevel::Fine,
            auto_permission_prompt: true,
            auto_location_prompt: true,
            permission_message: String::from(
                "We need your location permission to provide you accurate results.",
            ),
            settings_message: String::from(
                "You need to enable location for accurate results.",
            ),
        }
    }
}

impl Configuration {
    /// Start building a configuration from the defaults.
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::new()
    }

    /// Interval between requested fixes, in milliseconds.
    pub fn update_interval_ms(&self) -> u64 {
        self.update_interval_ms
    }

    /// Accuracy tier requested from the platform.
    pub fn accuracy(&self) -> AccuracyTier {
        self.accuracy
    }

    /// Permission granularity requested from the user.
    pub fn permission_level(&self) -> PermissionLevel {
        self.permission_level
    }

    /// Whether permission prompts are driven automatically on host bind.
    pub fn auto_permission_prompt(&self) -> bool {
        self.auto_permission_prompt
    }

    /// Whether settings-resolution prompts are driven automatically.
    pub fn auto_location_prompt(&self) -> bool {
        self.auto_location_prompt
    }

    /// Message shown with the permission rationale prompt.
    pub fn permission_message(&self) -> &str {
        &self.permission_message
    }

    /// Message shown when the user must enable location settings.
    pub fn settings_message(&self) -> &str {
        &self.settings_message
    }
}

/// Builder for [`Configuration`].
///
/// Validation happens in [`build`](ConfigurationBuilder::build); an invalid
/// value fails the build without producing a configuration.
#[derive(Debug, Clone)]
pub struct ConfigurationBuilder {
    config: Configuration,
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationBuilder {
    /// Create a builder seeded with the default configuration.
    pub fn new() -> Self {
        Self {
            config: Configuration::default(),
        }
    }

    /// Set the interval between requested fixes, in milliseconds.
    pub fn update_interval_ms(mut self, interval_ms: u64) -> Self {
        self.config.update_interval_ms = interval_ms;
        self
    }

    /// Set the requested accuracy tier.
    pub fn accuracy(mut self, accuracy: AccuracyTier) -> Self {
        self.config.accuracy = accuracy;
        self
    }

    /// Set the requested permission granularity.
    pub fn permission_level(mut self, level: PermissionLevel) -> Self {
        self.config.permission_level = level;
        self
    }

    /// Do not drive permission prompts automatically.
    ///
    /// The embedding application must then observe the permission stream
    /// and surface its own prompts.
    pub fn disable_auto_permission_prompt(mut self) -> Self {
        self.config.auto_permission_prompt = false;
        self
    }

    /// Do not drive settings-resolution prompts automatically.
    pub fn disable_auto_location_prompt(mut self) -> Self {
        self.config.auto_location_prompt = false;
        self
    }

    /// Set the message shown with the permission rationale prompt.
    pub fn permission_message(mut self, message: impl Into<String>) -> Self {
        self.config.permission_message = message.into();
        self
    }

    /// Set the message shown when the user must enable location settings.
    pub fn settings_message(mut self, message: impl Into<String>) -> Self {
        self.config.settings_message = message.into();
        self
    }

    /// Validate and produce the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LocwatchError::InvalidInterval`] if the update interval
    /// is zero.
    pub fn build(self) -> Result<Configuration, LocwatchError> {
        if self.config.update_interval_ms == 0 {
            return Err(LocwatchError::InvalidInterval);
        }
        Ok(self.config)
    }
}

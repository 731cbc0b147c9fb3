use std::time::Duration;

use locbridge_location::{Accuracy, UpdateConfig};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Channel name hosts register the bridge under.
pub const DEFAULT_CHANNEL: &str = "com.example.location_service_app/gps";

/// Bridge settings.
///
/// Every field has a default, so an empty JSON object is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Channel name.
    pub channel: String,
    /// Minimum time between continuous updates, in milliseconds.
    pub update_interval_ms: u64,
    /// Accuracy requested for continuous updates.
    pub accuracy: Accuracy,
    /// Bound on a `getLocation` lookup, in milliseconds.
    pub location_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_owned(),
            update_interval_ms: 2000,
            accuracy: Accuracy::Highest,
            location_timeout_ms: 5000,
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a JSON configuration.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed JSON or unknown fields and
    /// [`ConfigError::Invalid`] for unusable values.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel.is_empty() {
            return Err(ConfigError::Invalid("channel must not be empty".into()));
        }
        if self.update_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "update_interval_ms must be greater than zero".into(),
            ));
        }
        if self.location_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "location_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Subscription settings derived from this configuration.
    #[must_use]
    pub const fn update_config(&self) -> UpdateConfig {
        UpdateConfig {
            accuracy: self.accuracy,
            interval: Duration::from_millis(self.update_interval_ms),
        }
    }

    /// Bound on a `getLocation` lookup.
    #[must_use]
    pub const fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location_timeout_ms)
    }
}

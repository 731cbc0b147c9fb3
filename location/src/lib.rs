//! Location session control.
//!
//! This crate owns the stateful half of locbridge: a [`LocationSession`]
//! that keeps at most one continuous-update subscription alive, mediates
//! permission prompts and answers last-known-position queries. The OS is
//! reached through the [`LocationPlatform`] capability trait, implemented
//! per operating system under [`sys`] and in memory by [`MemoryPlatform`].

#![warn(missing_docs)]

mod memory;
mod platform;
mod session;

/// Platform-specific implementations.
pub mod sys;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use locbridge_permission::{PermissionError, PermissionState};
pub use memory::{MemoryPlatform, MemorySubscription};
pub use platform::LocationPlatform;
pub use session::{
    DEFAULT_LOOKUP_TIMEOUT, DEFAULT_PROMPT_EXPIRY, LocationSession, SessionState, StartOutcome,
};

/// A snapshot of the device position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
    /// Horizontal accuracy radius in meters.
    pub accuracy: f64,
    /// Capture time as Unix epoch milliseconds.
    pub timestamp: i64,
}

/// Requested fix quality for continuous updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accuracy {
    /// Best the device can do, usually satellite positioning.
    #[default]
    Highest,
    /// Network-assisted, roughly block level.
    Balanced,
    /// Coarse, city level.
    Low,
}

/// Configuration applied when a subscription is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateConfig {
    /// Requested accuracy.
    pub accuracy: Accuracy,
    /// Minimum time between updates.
    pub interval: Duration,
}

impl UpdateConfig {
    /// Default minimum update interval.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2000);
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            accuracy: Accuracy::Highest,
            interval: Self::DEFAULT_INTERVAL,
        }
    }
}

/// Errors that can occur when accessing location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    /// Location permission is missing or was revoked.
    #[error("location permission denied")]
    PermissionDenied,
    /// Location services are disabled on the device.
    #[error("location services disabled")]
    ServiceDisabled,
    /// A lookup did not complete in time.
    #[error("location request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    /// The platform reported a failure.
    #[error("{0}")]
    Platform(String),
}

impl From<PermissionError> for LocationError {
    fn from(err: PermissionError) -> Self {
        Self::Platform(err.to_string())
    }
}

/// Result type for location operations.
pub type LocationResult<T> = Result<T, LocationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_highest_accuracy_every_two_seconds() {
        let config = UpdateConfig::default();
        assert_eq!(config.accuracy, Accuracy::Highest);
        assert_eq!(config.interval, Duration::from_millis(2000));
    }

    #[test]
    fn platform_messages_pass_through_unchanged() {
        let err = LocationError::Platform("provider exploded".into());
        assert_eq!(err.to_string(), "provider exploded");

        let err = LocationError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "location request timed out after 5000ms");
    }

    #[test]
    fn position_uses_bridge_field_names() {
        let position = Position {
            latitude: 37.4,
            longitude: -122.1,
            accuracy: 5.0,
            timestamp: 1_700_000_000_000,
        };
        let value = serde_json::to_value(position).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "latitude": 37.4,
                "longitude": -122.1,
                "accuracy": 5.0,
                "timestamp": 1_700_000_000_000_i64,
            })
        );
    }
}

use locbridge_location::LocationError;
use thiserror::Error;

/// Typed errors returned across the bridge.
///
/// All of them are ordinary outcomes the caller is expected to handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// The app lacks the OS permission the command needs.
    #[error("{0}")]
    PermissionDenied(String),
    /// The platform failed to produce a location.
    #[error("{0}")]
    LocationUnavailable(String),
    /// The command name is not one the bridge knows.
    #[error("method not implemented: {0}")]
    NotImplemented(String),
}

impl BridgeError {
    /// Machine-readable code sent to the caller.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::LocationUnavailable(_) => "LOCATION_ERROR",
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
        }
    }
}

impl From<LocationError> for BridgeError {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::PermissionDenied => Self::PermissionDenied(err.to_string()),
            other => Self::LocationUnavailable(other.to_string()),
        }
    }
}

/// Errors raised while loading a [`BridgeConfig`](crate::BridgeConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration is not valid JSON or has unknown fields.
    #[error("failed to parse bridge config: {0}")]
    Parse(#[from] serde_json::Error),
    /// A field has a value the bridge cannot use.
    #[error("invalid bridge config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn permission_failures_keep_their_kind() {
        let err = BridgeError::from(LocationError::PermissionDenied);
        assert_eq!(err.code(), "PERMISSION_DENIED");
    }

    #[test]
    fn other_location_failures_become_location_errors() {
        let err = BridgeError::from(LocationError::Platform("gps chip on fire".into()));
        assert_eq!(
            err,
            BridgeError::LocationUnavailable("gps chip on fire".into())
        );
        assert_eq!(err.code(), "LOCATION_ERROR");

        let err = BridgeError::from(LocationError::Timeout(Duration::from_secs(5)));
        assert_eq!(err.code(), "LOCATION_ERROR");

        let err = BridgeError::from(LocationError::ServiceDisabled);
        assert_eq!(err.code(), "LOCATION_ERROR");
    }
}

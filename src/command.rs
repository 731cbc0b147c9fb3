use std::fmt;
use std::str::FromStr;

use locbridge_location::Position;
use serde::Serialize;

use crate::BridgeError;

/// The six commands the bridge understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Whether the location provider is enabled.
    IsGpsEnabled,
    /// Whether location permission is granted.
    HasPermission,
    /// Prompt for permission unless already granted.
    RequestPermission,
    /// Start continuous updates.
    StartGps,
    /// Stop continuous updates.
    StopGps,
    /// Read the OS cached position.
    GetLocation,
}

impl Command {
    /// Every command, in table order.
    pub const ALL: [Self; 6] = [
        Self::IsGpsEnabled,
        Self::HasPermission,
        Self::RequestPermission,
        Self::StartGps,
        Self::StopGps,
        Self::GetLocation,
    ];

    /// Wire name of the command.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::IsGpsEnabled => "isGpsEnabled",
            Self::HasPermission => "hasPermission",
            Self::RequestPermission => "requestPermission",
            Self::StartGps => "startGps",
            Self::StopGps => "stopGps",
            Self::GetLocation => "getLocation",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = BridgeError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|command| command.name() == name)
            .ok_or_else(|| BridgeError::NotImplemented(name.to_owned()))
    }
}

/// Successful answer to a command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// Answer to every command except `getLocation`.
    Bool(bool),
    /// Answer to `getLocation`; `None` when no fix is cached.
    Position(Option<Position>),
}

/// Outcome of a dispatched command.
pub type CommandResult = Result<Payload, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back_to_commands() {
        for command in Command::ALL {
            assert_eq!(command.name().parse::<Command>(), Ok(command));
        }
    }

    #[test]
    fn unknown_names_are_not_implemented() {
        assert_eq!(
            "getAltitude".parse::<Command>(),
            Err(BridgeError::NotImplemented("getAltitude".into()))
        );
        // Names are case sensitive.
        assert!("startgps".parse::<Command>().is_err());
        assert!("".parse::<Command>().is_err());
    }

    #[test]
    fn payloads_serialize_as_bare_values() {
        assert_eq!(
            serde_json::to_value(Payload::Bool(true)).unwrap(),
            serde_json::json!(true)
        );
        assert_eq!(
            serde_json::to_value(Payload::Position(None)).unwrap(),
            serde_json::Value::Null
        );
    }
}

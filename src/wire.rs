//! JSON shapes exchanged with the application shell.

use locbridge_permission::PermissionState;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{BridgeError, CommandResult, Payload};

/// A command sent by the shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Caller-chosen id echoed in the response.
    pub id: u64,
    /// Command name.
    pub method: String,
    /// Optional arguments. None of the commands take any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Value>,
}

impl Request {
    /// Create a request without arguments.
    pub fn new(id: u64, method: impl Into<String>) -> Self {
        Self {
            id,
            method: method.into(),
            args: None,
        }
    }
}

/// How a command ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Outcome {
    /// The command succeeded.
    Success {
        /// Boolean, position object or `null`.
        value: Payload,
    },
    /// The command failed with a typed error.
    Error {
        /// Machine-readable code.
        code: &'static str,
        /// Human-readable message.
        message: String,
    },
    /// The method name is unknown.
    NotImplemented {
        /// The name that was sent.
        method: String,
    },
}

impl From<CommandResult> for Outcome {
    fn from(result: CommandResult) -> Self {
        match result {
            Ok(value) => Self::Success { value },
            Err(BridgeError::NotImplemented(method)) => Self::NotImplemented { method },
            Err(err) => Self::Error {
                code: err.code(),
                message: err.to_string(),
            },
        }
    }
}

/// Answer to a [`Request`], tagged with its id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// Id of the request this answers.
    pub id: u64,
    /// Result of the command.
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Response {
    /// Wrap a command result.
    #[must_use]
    pub fn new(id: u64, result: CommandResult) -> Self {
        Self {
            id,
            outcome: result.into(),
        }
    }
}

/// Everything the serve loop accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeMessage {
    /// A command from the shell.
    Request(Request),
    /// The user answered a permission prompt.
    PermissionResult(PermissionState),
}

impl From<Request> for BridgeMessage {
    fn from(request: Request) -> Self {
        Self::Request(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use locbridge_location::Position;
    use serde_json::json;

    #[test]
    fn request_args_are_optional() {
        let request: Request = serde_json::from_str(r#"{"id": 3, "method": "stopGps"}"#).unwrap();
        assert_eq!(request, Request::new(3, "stopGps"));

        let request: Request =
            serde_json::from_str(r#"{"id": 4, "method": "startGps", "args": {"x": 1}}"#).unwrap();
        assert_eq!(request.args, Some(json!({"x": 1})));
    }

    #[test]
    fn position_response_shape() {
        let position = Position {
            latitude: 37.4,
            longitude: -122.1,
            accuracy: 5.0,
            timestamp: 1_700_000_000_000,
        };
        let response = Response::new(7, Ok(Payload::Position(Some(position))));

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "id": 7,
                "status": "success",
                "value": {
                    "latitude": 37.4,
                    "longitude": -122.1,
                    "accuracy": 5.0,
                    "timestamp": 1_700_000_000_000_i64,
                },
            })
        );
    }

    #[test]
    fn absent_position_is_null() {
        let response = Response::new(1, Ok(Payload::Position(None)));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"id": 1, "status": "success", "value": null})
        );
    }

    #[test]
    fn errors_carry_code_and_message() {
        let response = Response::new(
            8,
            Err(BridgeError::PermissionDenied(
                "Location permission not granted".into(),
            )),
        );
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "id": 8,
                "status": "error",
                "code": "PERMISSION_DENIED",
                "message": "Location permission not granted",
            })
        );
    }

    #[test]
    fn unknown_method_is_its_own_outcome() {
        let response = Response::new(9, Err(BridgeError::NotImplemented("fly".into())));
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"id": 9, "status": "notImplemented", "method": "fly"})
        );
    }
}

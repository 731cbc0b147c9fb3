//! # locbridge
//!
//! A command bridge between an application shell and the host OS location
//! services.
//!
//! The shell sends one of six named commands over a request/response
//! channel and gets back a boolean, a position (or nothing), or a typed
//! error:
//!
//! | command | answer |
//! |---|---|
//! | `isGpsEnabled` | whether the location provider is on |
//! | `hasPermission` | whether location access is granted |
//! | `requestPermission` | `true` if already granted, else prompts and answers `false` |
//! | `startGps` | `true` once updates run, `false` (and a prompt) without permission |
//! | `stopGps` | `true` |
//! | `getLocation` | the OS cached position, `null`, or `PERMISSION_DENIED` |
//!
//! Anything else is answered as not implemented.
//!
//! The [`Dispatcher`] owns a [`LocationSession`](location::LocationSession)
//! that keeps at most one continuous-update subscription alive. The OS is
//! reached through [`LocationPlatform`](location::LocationPlatform); real
//! adapters live in [`location::sys`] and
//! [`MemoryPlatform`](location::MemoryPlatform) stands in for tests.
//!
//! ## Example
//!
//! ```rust
//! use locbridge::Dispatcher;
//! use locbridge::location::{MemoryPlatform, PermissionState};
//!
//! # futures::executor::block_on(async {
//! let platform = MemoryPlatform::with_permission(PermissionState::GrantedFine);
//! let dispatcher = Dispatcher::new(platform);
//!
//! let started = dispatcher.dispatch("startGps", None).await;
//! assert_eq!(started, Ok(locbridge::Payload::Bool(true)));
//! # });
//! ```

#![warn(missing_docs)]

mod command;
mod config;
mod dispatcher;
mod error;
mod wire;

pub use locbridge_location as location;
pub use locbridge_permission as permission;

pub use command::{Command, CommandResult, Payload};
pub use config::{BridgeConfig, DEFAULT_CHANNEL};
pub use dispatcher::Dispatcher;
pub use error::{BridgeError, ConfigError};
pub use wire::{BridgeMessage, Outcome, Request, Response};

//! Linux permission implementation.
//!
//! Location on Linux goes through the GeoClue2 D-Bus service, which applies
//! its own agent-based authorization when a client starts. There is no
//! runtime prompt an application can trigger, so the app is treated as
//! holding precise access and GeoClue refusals surface later as errors from
//! the client itself.

use crate::PermissionState;

/// Current location permission.
#[must_use]
pub const fn check() -> PermissionState {
    PermissionState::GrantedFine
}

/// Request location permission. A no-op on Linux.
pub fn request() {
    log::debug!("no runtime location prompt on linux");
}

//! Location permission state.
//!
//! The operating system is the only source of truth for permission, so this
//! crate never caches a [`PermissionState`]. Every value is derived from a
//! fresh platform query through the helpers in [`sys`].

#![warn(missing_docs)]

/// Platform-specific permission helpers.
pub mod sys;

use serde::{Deserialize, Serialize};

/// How much location access the OS currently grants the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionState {
    /// No location access.
    Denied,
    /// Approximate location only.
    GrantedCoarse,
    /// Precise location.
    GrantedFine,
}

impl PermissionState {
    /// Whether any level of location access is granted.
    #[must_use]
    pub const fn is_granted(self) -> bool {
        !matches!(self, Self::Denied)
    }

    /// Combine individual fine and coarse grants into a single state.
    ///
    /// A fine grant wins over a coarse one.
    #[must_use]
    pub const fn from_grants(fine: bool, coarse: bool) -> Self {
        match (fine, coarse) {
            (true, _) => Self::GrantedFine,
            (false, true) => Self::GrantedCoarse,
            (false, false) => Self::Denied,
        }
    }
}

/// Errors raised while talking to the platform permission APIs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    /// The platform call failed.
    #[error("permission query failed: {0}")]
    Platform(String),
}

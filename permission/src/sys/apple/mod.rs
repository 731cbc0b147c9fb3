//! Apple platform (iOS/macOS) permission implementation using CoreLocation.

use crate::PermissionState;
use objc2_core_location::{CLAccuracyAuthorization, CLAuthorizationStatus, CLLocationManager};

/// Current location permission as seen by `manager`.
///
/// Reduced accuracy authorization maps to [`PermissionState::GrantedCoarse`].
#[must_use]
pub fn check(manager: &CLLocationManager) -> PermissionState {
    let status = unsafe { manager.authorizationStatus() };
    if status != CLAuthorizationStatus::AuthorizedAlways
        && status != CLAuthorizationStatus::AuthorizedWhenInUse
    {
        return PermissionState::Denied;
    }

    let accuracy = unsafe { manager.accuracyAuthorization() };
    PermissionState::from_grants(
        accuracy == CLAccuracyAuthorization::FullAccuracy,
        true,
    )
}

/// Ask for when-in-use authorization.
///
/// CoreLocation only shows the prompt while the status is still
/// undetermined; later calls are ignored by the OS.
pub fn request(manager: &CLLocationManager) {
    unsafe { manager.requestWhenInUseAuthorization() };
    log::debug!("requested when-in-use location authorization");
}

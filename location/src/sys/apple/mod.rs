//! Apple platform (iOS/macOS) location implementation using CoreLocation.

use objc2::rc::Retained;
use objc2_core_location::{
    CLLocation, CLLocationAccuracy, CLLocationManager, kCLLocationAccuracyBest,
    kCLLocationAccuracyHundredMeters, kCLLocationAccuracyKilometer,
};

use crate::{
    Accuracy, LocationError, LocationPlatform, LocationResult, PermissionState, Position,
    UpdateConfig,
};

fn desired_accuracy(accuracy: Accuracy) -> CLLocationAccuracy {
    unsafe {
        match accuracy {
            Accuracy::Highest => kCLLocationAccuracyBest,
            Accuracy::Balanced => kCLLocationAccuracyHundredMeters,
            Accuracy::Low => kCLLocationAccuracyKilometer,
        }
    }
}

/// Handle for running updates.
///
/// CoreLocation tracks updates per manager, so the handle carries no data.
#[derive(Debug, PartialEq, Eq)]
pub struct AppleSubscription(());

/// Location platform backed by a `CLLocationManager`.
///
/// Must be created and used on the main thread, like the manager itself.
#[derive(Debug)]
pub struct ApplePlatform {
    manager: Retained<CLLocationManager>,
}

impl Default for ApplePlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplePlatform {
    /// Create a platform with its own location manager.
    #[must_use]
    pub fn new() -> Self {
        let manager = unsafe { CLLocationManager::new() };
        unsafe { manager.setDesiredAccuracy(desired_accuracy(Accuracy::Highest)) };
        Self { manager }
    }
}

fn position(location: &CLLocation) -> Option<Position> {
    let accuracy = unsafe { location.horizontalAccuracy() };
    // A negative accuracy marks the coordinate as invalid.
    if accuracy < 0.0 {
        return None;
    }

    let coordinate = unsafe { location.coordinate() };
    let seconds = unsafe { location.timestamp() }.timeIntervalSince1970();

    #[allow(clippy::cast_possible_truncation)]
    Some(Position {
        latitude: coordinate.latitude,
        longitude: coordinate.longitude,
        accuracy,
        timestamp: (seconds * 1000.0) as i64,
    })
}

impl LocationPlatform for ApplePlatform {
    type Subscription = AppleSubscription;

    async fn check_permission(&self) -> LocationResult<PermissionState> {
        Ok(locbridge_permission::sys::apple::check(&self.manager))
    }

    async fn request_permission(&self) -> LocationResult<()> {
        locbridge_permission::sys::apple::request(&self.manager);
        Ok(())
    }

    async fn is_provider_enabled(&self) -> LocationResult<bool> {
        Ok(unsafe { CLLocationManager::locationServicesEnabled_class() })
    }

    async fn start_updates(&self, config: &UpdateConfig) -> LocationResult<AppleSubscription> {
        // CoreLocation accepts the call without authorization and simply
        // never delivers, so the race has to be caught here.
        if !locbridge_permission::sys::apple::check(&self.manager).is_granted() {
            return Err(LocationError::PermissionDenied);
        }

        // CoreLocation has no time throttle; only the accuracy applies.
        unsafe {
            self.manager.setDesiredAccuracy(desired_accuracy(config.accuracy));
            self.manager.startUpdatingLocation();
        }
        Ok(AppleSubscription(()))
    }

    async fn stop_updates(&self, _subscription: &AppleSubscription) -> LocationResult<()> {
        unsafe { self.manager.stopUpdatingLocation() };
        Ok(())
    }

    async fn last_position(&self) -> LocationResult<Option<Position>> {
        let location = unsafe { self.manager.location() };
        Ok(location.as_deref().and_then(position))
    }
}

use std::future::Future;

use crate::{LocationResult, PermissionState, Position, UpdateConfig};

/// Capabilities a host OS must provide to drive a [`LocationSession`].
///
/// Every method is asynchronous because some platforms only expose
/// callback-based APIs. Futures are not required to be `Send`: a session
/// is driven from a single control loop, and several OS location objects
/// must stay on the thread that created them.
///
/// Implementations convert platform exceptions into [`LocationError`]s
/// instead of letting them escape. A permission failure while starting
/// updates must be reported as [`LocationError::PermissionDenied`].
///
/// [`LocationSession`]: crate::LocationSession
/// [`LocationError`]: crate::LocationError
/// [`LocationError::PermissionDenied`]: crate::LocationError::PermissionDenied
pub trait LocationPlatform {
    /// Handle for an active continuous-update request.
    type Subscription;

    /// Query the current permission state.
    fn check_permission(&self) -> impl Future<Output = LocationResult<PermissionState>>;

    /// Trigger the OS permission prompt. Returns once the prompt is shown;
    /// the answer arrives later through the host.
    fn request_permission(&self) -> impl Future<Output = LocationResult<()>>;

    /// Whether the location provider is currently enabled.
    fn is_provider_enabled(&self) -> impl Future<Output = LocationResult<bool>>;

    /// Begin continuous updates.
    fn start_updates(
        &self,
        config: &UpdateConfig,
    ) -> impl Future<Output = LocationResult<Self::Subscription>>;

    /// Release a subscription created by [`start_updates`](Self::start_updates).
    fn stop_updates(
        &self,
        subscription: &Self::Subscription,
    ) -> impl Future<Output = LocationResult<()>>;

    /// The OS cached position, or `None` when no fix is cached yet.
    fn last_position(&self) -> impl Future<Output = LocationResult<Option<Position>>>;
}

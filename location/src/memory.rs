//! In-memory location platform.
//!
//! Behaves like a well-mannered OS location stack: permission, provider
//! status and the cached fix are plain values the owner can change at any
//! time, and every subscription is tracked so callers can check that none
//! leak. Used by the test suites and by hosts running without a real
//! location stack.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use futures::future;
use futures_timer::Delay;

use crate::{
    LocationError, LocationPlatform, LocationResult, PermissionState, Position, UpdateConfig,
};

/// Handle returned by [`MemoryPlatform::start_updates`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemorySubscription(u64);

#[derive(Debug, Clone)]
enum Lookup {
    Cached,
    Delayed(Duration),
    Fail(String),
    Hang,
}

#[derive(Debug)]
struct State {
    permission: PermissionState,
    provider_enabled: bool,
    cached: Option<Position>,
    lookup: Lookup,
    revoke_on_start: bool,
    fail_stops: bool,
    active: BTreeSet<u64>,
    next_id: u64,
    started: usize,
    prompts: usize,
    last_config: Option<UpdateConfig>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            permission: PermissionState::Denied,
            provider_enabled: true,
            cached: None,
            lookup: Lookup::Cached,
            revoke_on_start: false,
            fail_stops: false,
            active: BTreeSet::new(),
            next_id: 1,
            started: 0,
            prompts: 0,
            last_config: None,
        }
    }
}

/// A [`LocationPlatform`] backed by plain in-memory state.
///
/// Starts with permission denied, the provider enabled and nothing cached.
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    state: Mutex<State>,
}

impl MemoryPlatform {
    /// Create a platform with permission denied and an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a platform that already holds `permission`.
    #[must_use]
    pub fn with_permission(permission: PermissionState) -> Self {
        let platform = Self::new();
        platform.set_permission(permission);
        platform
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("memory platform mutex poisoned")
    }

    /// Change the permission the OS reports.
    pub fn set_permission(&self, permission: PermissionState) {
        self.state().permission = permission;
    }

    /// Enable or disable the location provider.
    pub fn set_provider_enabled(&self, enabled: bool) {
        self.state().provider_enabled = enabled;
    }

    /// Replace the cached last-known position.
    pub fn set_cached_position(&self, position: Option<Position>) {
        self.state().cached = position;
    }

    /// Deliver a fix from the positioning hardware.
    ///
    /// Fixes only refresh the cache while a subscription is active, the
    /// same way an OS keeps its last-known position warm only while
    /// something is listening. Returns whether the fix was accepted.
    pub fn deliver_fix(&self, position: Position) -> bool {
        let mut state = self.state();
        if state.active.is_empty() {
            return false;
        }
        state.cached = Some(position);
        true
    }

    /// Make every following lookup fail with `message`.
    pub fn fail_lookups(&self, message: impl Into<String>) {
        self.state().lookup = Lookup::Fail(message.into());
    }

    /// Make every following lookup wait `delay` before answering.
    pub fn delay_lookups(&self, delay: Duration) {
        self.state().lookup = Lookup::Delayed(delay);
    }

    /// Make every following lookup never complete.
    pub fn hang_lookups(&self) {
        self.state().lookup = Lookup::Hang;
    }

    /// Revoke permission the moment updates are started, reproducing a user
    /// flipping the setting between a permission check and the start call.
    pub fn revoke_permission_on_start(&self) {
        self.state().revoke_on_start = true;
    }

    /// Make releasing subscriptions fail until switched off again.
    pub fn fail_stops(&self, fail: bool) {
        self.state().fail_stops = fail;
    }

    /// Number of subscriptions currently alive.
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.state().active.len()
    }

    /// Number of subscriptions ever created.
    #[must_use]
    pub fn subscriptions_created(&self) -> usize {
        self.state().started
    }

    /// Number of permission prompts shown.
    #[must_use]
    pub fn prompts_shown(&self) -> usize {
        self.state().prompts
    }

    /// Configuration passed to the most recent successful start.
    #[must_use]
    pub fn last_config(&self) -> Option<UpdateConfig> {
        self.state().last_config
    }
}

impl LocationPlatform for MemoryPlatform {
    type Subscription = MemorySubscription;

    async fn check_permission(&self) -> LocationResult<PermissionState> {
        Ok(self.state().permission)
    }

    async fn request_permission(&self) -> LocationResult<()> {
        self.state().prompts += 1;
        Ok(())
    }

    async fn is_provider_enabled(&self) -> LocationResult<bool> {
        Ok(self.state().provider_enabled)
    }

    async fn start_updates(&self, config: &UpdateConfig) -> LocationResult<MemorySubscription> {
        let mut state = self.state();
        if state.revoke_on_start {
            state.revoke_on_start = false;
            state.permission = PermissionState::Denied;
        }
        if !state.permission.is_granted() {
            return Err(LocationError::PermissionDenied);
        }

        let id = state.next_id;
        state.next_id += 1;
        state.active.insert(id);
        state.started += 1;
        state.last_config = Some(*config);
        Ok(MemorySubscription(id))
    }

    async fn stop_updates(&self, subscription: &MemorySubscription) -> LocationResult<()> {
        let mut state = self.state();
        if state.fail_stops {
            return Err(LocationError::Platform("removing updates failed".into()));
        }
        if state.active.remove(&subscription.0) {
            Ok(())
        } else {
            Err(LocationError::Platform(format!(
                "unknown subscription {}",
                subscription.0
            )))
        }
    }

    async fn last_position(&self) -> LocationResult<Option<Position>> {
        let lookup = self.state().lookup.clone();
        match lookup {
            Lookup::Cached => Ok(self.state().cached),
            Lookup::Delayed(delay) => {
                Delay::new(delay).await;
                Ok(self.state().cached)
            }
            Lookup::Fail(message) => Err(LocationError::Platform(message)),
            Lookup::Hang => future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix() -> Position {
        Position {
            latitude: 52.52,
            longitude: 13.405,
            accuracy: 12.0,
            timestamp: 1_700_000_000_000,
        }
    }

    #[tokio::test]
    async fn start_requires_permission() {
        let platform = MemoryPlatform::new();
        let result = platform.start_updates(&UpdateConfig::default()).await;
        assert_eq!(result, Err(LocationError::PermissionDenied));
        assert_eq!(platform.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn fixes_only_refresh_cache_while_subscribed() {
        let platform = MemoryPlatform::with_permission(PermissionState::GrantedFine);
        assert!(!platform.deliver_fix(fix()));
        assert_eq!(platform.last_position().await, Ok(None));

        let subscription = platform
            .start_updates(&UpdateConfig::default())
            .await
            .unwrap();
        assert!(platform.deliver_fix(fix()));
        assert_eq!(platform.last_position().await, Ok(Some(fix())));

        platform.stop_updates(&subscription).await.unwrap();
        assert_eq!(platform.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn stopping_twice_reports_unknown_subscription() {
        let platform = MemoryPlatform::with_permission(PermissionState::GrantedCoarse);
        let subscription = platform
            .start_updates(&UpdateConfig::default())
            .await
            .unwrap();

        platform.stop_updates(&subscription).await.unwrap();
        assert!(platform.stop_updates(&subscription).await.is_err());
    }

    #[tokio::test]
    async fn revoke_on_start_fires_once() {
        let platform = MemoryPlatform::with_permission(PermissionState::GrantedFine);
        platform.revoke_permission_on_start();

        let first = platform.start_updates(&UpdateConfig::default()).await;
        assert_eq!(first, Err(LocationError::PermissionDenied));
        assert_eq!(
            platform.check_permission().await,
            Ok(PermissionState::Denied)
        );

        platform.set_permission(PermissionState::GrantedFine);
        assert!(platform.start_updates(&UpdateConfig::default()).await.is_ok());
    }
}

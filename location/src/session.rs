use std::fmt;
use std::sync::{Mutex as SyncMutex, MutexGuard};
use std::time::{Duration, Instant};

use futures::future::{self, Either};
use futures::lock::Mutex;
use futures::pin_mut;
use futures_timer::Delay;
use log::{debug, error, info, warn};

use crate::{
    LocationError, LocationPlatform, LocationResult, PermissionState, Position, UpdateConfig,
};

/// Default bound on a last-known-position lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time after which an unanswered permission prompt no longer
/// blocks a new one.
pub const DEFAULT_PROMPT_EXPIRY: Duration = Duration::from_secs(60);

/// Whether continuous updates are running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No subscription exists.
    Idle,
    /// Exactly one subscription exists.
    Active,
}

/// What [`LocationSession::start`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StartOutcome {
    /// A new subscription was created.
    Started,
    /// A subscription already existed and was reused.
    AlreadyActive,
}

/// Owner of the single continuous-update subscription.
///
/// The session is an `Idle`/`Active` state machine. Starting while active
/// and stopping while idle are both successful no-ops, so there is never
/// more than one subscription, and every successful stop leaves none.
///
/// Hosts tear a session down with [`shutdown`](Self::shutdown). Dropping an
/// active session also releases its subscription, but it does so by blocking
/// the dropping thread on the platform's stop call. A platform whose stop
/// future needs the same single-threaded runtime would deadlock there, so
/// `Drop` is only a last resort.
pub struct LocationSession<P: LocationPlatform> {
    platform: P,
    config: UpdateConfig,
    lookup_timeout: Duration,
    prompt_expiry: Duration,
    subscription: Mutex<Option<P::Subscription>>,
    prompted_at: SyncMutex<Option<Instant>>,
}

impl<P: LocationPlatform> fmt::Debug for LocationSession<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationSession")
            .field("config", &self.config)
            .field("lookup_timeout", &self.lookup_timeout)
            .field("prompt_in_flight", &self.prompt_in_flight())
            .finish_non_exhaustive()
    }
}

impl<P: LocationPlatform> LocationSession<P> {
    /// Create an idle session with the default configuration.
    pub fn new(platform: P) -> Self {
        Self::with_config(platform, UpdateConfig::default(), DEFAULT_LOOKUP_TIMEOUT)
    }

    /// Create an idle session.
    pub fn with_config(platform: P, config: UpdateConfig, lookup_timeout: Duration) -> Self {
        Self {
            platform,
            config,
            lookup_timeout,
            prompt_expiry: DEFAULT_PROMPT_EXPIRY,
            subscription: Mutex::new(None),
            prompted_at: SyncMutex::new(None),
        }
    }

    /// Let an unanswered prompt block new ones for at most `expiry`.
    #[must_use]
    pub fn with_prompt_expiry(mut self, expiry: Duration) -> Self {
        self.prompt_expiry = expiry;
        self
    }

    /// The platform this session drives.
    pub const fn platform(&self) -> &P {
        &self.platform
    }

    /// Configuration used for new subscriptions.
    pub const fn config(&self) -> &UpdateConfig {
        &self.config
    }

    /// Current state.
    pub async fn state(&self) -> SessionState {
        if self.subscription.lock().await.is_some() {
            SessionState::Active
        } else {
            SessionState::Idle
        }
    }

    /// Query permission from the OS.
    ///
    /// A failed query is logged and reported as [`PermissionState::Denied`].
    /// Observing a grant settles any outstanding prompt.
    pub async fn permission(&self) -> PermissionState {
        match self.platform.check_permission().await {
            Ok(state) => {
                if state.is_granted() {
                    self.permission_resolved();
                }
                state
            }
            Err(err) => {
                error!("permission query failed: {err}");
                PermissionState::Denied
            }
        }
    }

    fn prompted_at(&self) -> MutexGuard<'_, Option<Instant>> {
        self.prompted_at.lock().expect("prompt mutex poisoned")
    }

    /// Whether a permission prompt has been shown and not yet answered.
    ///
    /// A prompt older than the expiry no longer counts.
    pub fn prompt_in_flight(&self) -> bool {
        self.prompted_at()
            .is_some_and(|shown| shown.elapsed() < self.prompt_expiry)
    }

    /// Show the OS permission prompt unless one is already in flight.
    ///
    /// Returns `Ok(true)` if a prompt was shown. The answer is not threaded
    /// back here; the host reports it through [`permission_resolved`].
    ///
    /// # Errors
    /// Returns the platform error if the prompt could not be shown.
    ///
    /// [`permission_resolved`]: Self::permission_resolved
    pub async fn request_permission(&self) -> LocationResult<bool> {
        {
            let mut prompted_at = self.prompted_at();
            if prompted_at.is_some_and(|shown| shown.elapsed() < self.prompt_expiry) {
                warn!("permission prompt already in flight, not prompting again");
                return Ok(false);
            }
            *prompted_at = Some(Instant::now());
        }

        if let Err(err) = self.platform.request_permission().await {
            self.permission_resolved();
            return Err(err);
        }

        debug!("permission prompt shown");
        Ok(true)
    }

    /// Record that the user answered the outstanding prompt.
    pub fn permission_resolved(&self) {
        *self.prompted_at() = None;
    }

    /// Whether the location provider is enabled.
    ///
    /// A failed query is logged and reported as disabled.
    pub async fn provider_enabled(&self) -> bool {
        match self.platform.is_provider_enabled().await {
            Ok(enabled) => enabled,
            Err(err) => {
                error!("provider status query failed: {err}");
                false
            }
        }
    }

    /// Start continuous updates, reusing the subscription if one exists.
    ///
    /// # Errors
    /// Returns [`LocationError::PermissionDenied`] if the platform refused for
    /// lack of permission, or the platform error otherwise. The session stays
    /// idle on error.
    pub async fn start(&self) -> LocationResult<StartOutcome> {
        let mut active = self.subscription.lock().await;
        if active.is_some() {
            debug!("location updates already active");
            return Ok(StartOutcome::AlreadyActive);
        }

        let subscription = self
            .platform
            .start_updates(&self.config)
            .await
            .inspect_err(|err| error!("failed to start location updates: {err}"))?;
        *active = Some(subscription);

        info!(
            "location updates started ({:?}, every {}ms)",
            self.config.accuracy,
            self.config.interval.as_millis()
        );
        Ok(StartOutcome::Started)
    }

    /// Stop continuous updates.
    ///
    /// Returns `Ok(false)` when there was nothing to stop.
    ///
    /// # Errors
    /// Returns the platform error if the subscription could not be released.
    /// The session keeps the subscription in that case so the stop can be
    /// retried.
    pub async fn stop(&self) -> LocationResult<bool> {
        let mut active = self.subscription.lock().await;
        let Some(subscription) = active.as_ref() else {
            return Ok(false);
        };

        self.platform
            .stop_updates(subscription)
            .await
            .inspect_err(|err| error!("failed to stop location updates: {err}"))?;
        *active = None;

        info!("location updates stopped");
        Ok(true)
    }

    /// Read the OS cached position.
    ///
    /// Does not require an active session; the cache may have been filled
    /// by other apps.
    ///
    /// # Errors
    /// Returns [`LocationError::Timeout`] if the platform does not answer in
    /// time, or the platform error.
    pub async fn last_position(&self) -> LocationResult<Option<Position>> {
        let lookup = self.platform.last_position();
        pin_mut!(lookup);

        match future::select(lookup, Delay::new(self.lookup_timeout)).await {
            Either::Left((result, _)) => result,
            Either::Right(((), _)) => {
                warn!(
                    "last position lookup timed out after {}ms",
                    self.lookup_timeout.as_millis()
                );
                Err(LocationError::Timeout(self.lookup_timeout))
            }
        }
    }

    /// Tear the session down.
    ///
    /// Always leaves the session idle. If releasing the subscription fails
    /// the error is logged and the handle is dropped anyway.
    pub async fn shutdown(&self) {
        let mut active = self.subscription.lock().await;
        let Some(subscription) = active.take() else {
            return;
        };

        match self.platform.stop_updates(&subscription).await {
            Ok(()) => info!("location updates released on teardown"),
            Err(err) => error!("failed to release location updates on teardown: {err}"),
        }
    }
}

impl<P: LocationPlatform> Drop for LocationSession<P> {
    fn drop(&mut self) {
        let Some(subscription) = self.subscription.get_mut().take() else {
            return;
        };

        warn!("location session dropped while active, releasing updates");
        if let Err(err) = futures::executor::block_on(self.platform.stop_updates(&subscription)) {
            error!("failed to release location updates on drop: {err}");
        }
    }
}

//! Platform-specific location adapters.
//!
//! Each supported OS gets one [`LocationPlatform`](crate::LocationPlatform)
//! implementation, re-exported as `NativePlatform`. Targets without an
//! adapter have no `NativePlatform`; hosts there inject their own platform
//! or use [`MemoryPlatform`](crate::MemoryPlatform).

#[cfg(any(target_os = "ios", target_os = "macos"))]
mod apple;

/// Android platform implementation.
#[cfg(target_os = "android")]
pub mod android;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(any(target_os = "ios", target_os = "macos"))]
pub use apple::{ApplePlatform as NativePlatform, AppleSubscription};

#[cfg(target_os = "android")]
pub use android::{
    AndroidPlatform as NativePlatform, AndroidSubscription, DEFAULT_PERMISSION_REQUEST_CODE,
};

#[cfg(target_os = "linux")]
pub use linux::{GeoCluePlatform as NativePlatform, GeoClueSubscription};
